//! Segmentation, token counting and chunk assembly.

mod assembler;
mod base;
mod pipeline;
mod segmenter;
mod splitter;

pub use assembler::{ChunkAssembler, Chunks};
pub use base::{counter_for, window_ranges, TiktokenCounter, TokenCounter, WordCounter};
pub use pipeline::{chunk_text, ChunkingPipeline};
pub use segmenter::{segmenter_for, ParagraphSegmenter, Segmenter, SentenceSegmenter};
pub use splitter::{AdvisorySplitter, OversizeSplitter, WindowedSplitter};
