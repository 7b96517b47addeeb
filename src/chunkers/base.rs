//! Token counting and windowing.

use std::ops::Range;
use std::sync::Arc;

use crate::types::{ChunkingError, Result, TextUnit, TokenizerKind, UnitOrigin};

/// Token counter trait for counting and windowing tokens in text.
///
/// Implementations are local and deterministic. Remote estimation lives
/// behind [`crate::model::TokenEstimator`].
pub trait TokenCounter: Send + Sync {
    /// Get the name of this counter.
    fn name(&self) -> &'static str;

    /// Count the number of tokens in the given text.
    fn count_tokens(&self, text: &str) -> usize;

    /// Cut text into windows of at most `size` tokens, each starting `step`
    /// tokens after the previous one.
    ///
    /// Every token lands in at least one window. Windowing stops as soon as
    /// a window reaches the end of the text, so only the last window can be
    /// shorter than `size`.
    fn windows(&self, text: &str, size: usize, step: usize) -> Vec<TextUnit>;
}

/// Start/end token offsets of each window over `len` tokens.
pub fn window_ranges(len: usize, size: usize, step: usize) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    if len == 0 || size == 0 || step == 0 {
        return ranges;
    }

    let mut start = 0;
    loop {
        let end = (start + size).min(len);
        ranges.push(start..end);
        if end >= len {
            break;
        }
        start += step;
    }
    ranges
}

/// Whitespace-delimited words as a token proxy.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCounter;

impl WordCounter {
    pub fn new() -> Self {
        Self
    }
}

impl TokenCounter for WordCounter {
    fn name(&self) -> &'static str {
        "words"
    }

    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }

    fn windows(&self, text: &str, size: usize, step: usize) -> Vec<TextUnit> {
        let words: Vec<&str> = text.split_whitespace().collect();
        window_ranges(words.len(), size, step)
            .into_iter()
            .map(|range| {
                let count = range.len();
                TextUnit::with_origin(words[range].join(" "), count, UnitOrigin::Window)
            })
            .collect()
    }
}

/// Token counter using tiktoken (cl100k_base encoding).
pub struct TiktokenCounter {
    bpe: tiktoken_rs::CoreBPE,
}

impl TiktokenCounter {
    /// Create a new token counter with the cl100k_base encoding (GPT-4/ChatGPT).
    pub fn new() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| ChunkingError::Tokenizer(e.to_string()))?;
        Ok(Self { bpe })
    }
}

impl TokenCounter for TiktokenCounter {
    fn name(&self) -> &'static str {
        "tiktoken"
    }

    fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    fn windows(&self, text: &str, size: usize, step: usize) -> Vec<TextUnit> {
        self.spanned_windows(text, size, step)
            .into_iter()
            .map(|(count, span)| {
                TextUnit::with_origin(text[span].trim().to_string(), count, UnitOrigin::Window)
            })
            .collect()
    }
}

impl TiktokenCounter {
    /// Byte spans of each window in `text`.
    ///
    /// A token can hold part of a multi-byte character, so each span is
    /// widened outwards to the nearest char boundaries. Neighbouring spans
    /// may then share that character.
    pub fn window_spans(&self, text: &str, size: usize, step: usize) -> Vec<Range<usize>> {
        self.spanned_windows(text, size, step)
            .into_iter()
            .map(|(_, span)| span)
            .collect()
    }

    /// Token count and byte span of each window.
    fn spanned_windows(&self, text: &str, size: usize, step: usize) -> Vec<(usize, Range<usize>)> {
        let tokens = self.bpe.encode_ordinary(text);
        let ranges = window_ranges(tokens.len(), size, step);

        // offsets[i] is the byte where token i starts
        let mut offsets = Vec::with_capacity(tokens.len() + 1);
        let mut end = 0;
        offsets.push(end);
        for bytes in self.bpe._decode_native_and_split(tokens) {
            end += bytes.len();
            offsets.push(end);
        }

        ranges
            .into_iter()
            .map(|range| (range.len(), char_span(text, offsets[range.start]..offsets[range.end])))
            .collect()
    }
}

/// Widen a byte range to enclosing char boundaries of `text`.
fn char_span(text: &str, bytes: Range<usize>) -> Range<usize> {
    let mut start = bytes.start.min(text.len());
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = bytes.end.clamp(start, text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }
    start..end
}

/// Build the local counter selected by configuration.
pub fn counter_for(kind: TokenizerKind) -> Result<Arc<dyn TokenCounter>> {
    Ok(match kind {
        TokenizerKind::Words => Arc::new(WordCounter::new()),
        TokenizerKind::Tiktoken => Arc::new(TiktokenCounter::new()?),
    })
}
