//! Embedprep Library
//!
//! Cleans raw text and packs it into token-bounded chunks ready for
//! embedding. Cleaning is profile-driven (scientific, legal, social, ...);
//! chunking packs sentence or paragraph units up to a token budget and
//! splits oversized units with overlapping windows or model-advised
//! boundaries.

pub mod api;
pub mod batch;
pub mod chunkers;
pub mod cleaning;
pub mod model;
pub mod types;

pub use batch::{BatchConfig, BatchProcessor, BatchResult, Document, DocumentChunks};
pub use chunkers::{chunk_text, ChunkingPipeline};
pub use cleaning::{clean_text, TextCleaner};
pub use types::{Chunk, ChunkingConfig, ChunkingError, CleaningProfile, TextUnit};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::batch::*;
    pub use crate::chunkers::*;
    pub use crate::cleaning::{clean_text, TextCleaner};
    pub use crate::model::{SplitAdvisor, TokenEstimator};
    pub use crate::types::*;
}

/// Default maximum chunk size in tokens
pub const DEFAULT_MAX_TOKENS: usize = 512;

/// Default minimum size of a trailing chunk in tokens
pub const DEFAULT_MIN_TOKENS: usize = 50;

/// Default window overlap in tokens
pub const DEFAULT_STRIDE: usize = 50;

pub const DEFAULT_LANGUAGE: &str = "english";
