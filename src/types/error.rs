//! Error types for the chunking engine.

use thiserror::Error;

/// Errors raised while building or configuring the chunking engine.
///
/// Everything here is a construction-time failure. Once a pipeline exists,
/// processing a document never fails: external-model problems fall back to
/// deterministic behavior and empty input yields no chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    #[error("max_tokens must be greater than zero")]
    ZeroMaxTokens,

    #[error("stride ({stride}) must be greater than zero and less than max_tokens ({max_tokens})")]
    InvalidStride { stride: usize, max_tokens: usize },

    #[error("min_tokens ({min_tokens}) exceeds max_tokens ({max_tokens})")]
    MinExceedsMax { min_tokens: usize, max_tokens: usize },

    #[error("unknown cleaning profile: {0}")]
    UnknownProfile(String),

    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("tokenizer unavailable: {0}")]
    Tokenizer(String),
}

pub type Result<T> = std::result::Result<T, ChunkingError>;
