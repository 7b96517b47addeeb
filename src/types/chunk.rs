//! Chunk and text unit definitions.

use serde::{Deserialize, Serialize};

/// Where a text unit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitOrigin {
    /// Produced by the segmenter.
    #[default]
    Segment,
    /// A fixed-size token window cut from an oversized unit.
    Window,
    /// A segment returned by the split advisor.
    Advisory,
}

/// A contiguous span of cleaned text with its estimated token count.
///
/// Units only live for the duration of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextUnit {
    pub text: String,
    pub token_count: usize,
    pub origin: UnitOrigin,
}

impl TextUnit {
    /// Create a unit produced by segmentation.
    pub fn new(text: impl Into<String>, token_count: usize) -> Self {
        Self {
            text: text.into(),
            token_count,
            origin: UnitOrigin::Segment,
        }
    }

    /// Create a unit with an explicit origin.
    pub fn with_origin(text: impl Into<String>, token_count: usize, origin: UnitOrigin) -> Self {
        Self {
            text: text.into(),
            token_count,
            origin,
        }
    }
}

/// How the content of a chunk was assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChunkOrigin {
    /// Whole segmenter units packed under the token budget.
    #[default]
    Packed,
    /// Windows of an oversized unit.
    Window,
    /// Advisor-selected segments of an oversized unit.
    Advisory,
}

impl From<UnitOrigin> for ChunkOrigin {
    fn from(origin: UnitOrigin) -> Self {
        match origin {
            UnitOrigin::Segment => ChunkOrigin::Packed,
            UnitOrigin::Window => ChunkOrigin::Window,
            UnitOrigin::Advisory => ChunkOrigin::Advisory,
        }
    }
}

/// Metadata attached to each emitted chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// How the chunk was built
    pub origin: ChunkOrigin,

    /// Number of units joined into this chunk
    pub unit_count: usize,
}

/// A bounded block of cleaned text, ready for embedding.
///
/// Chunks are emitted in source order; `index` is the emission position.
/// Downstream consumers only rely on `index`, `text` and `tokenCount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Order of this chunk within its document (0-indexed)
    pub index: usize,

    /// Space-joined text of the chunk's units
    pub text: String,

    /// Estimated number of tokens (sum of unit counts)
    pub token_count: usize,

    #[serde(default)]
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Create a new chunk.
    pub fn new(index: usize, text: String, token_count: usize, metadata: ChunkMetadata) -> Self {
        Self {
            index,
            text,
            token_count,
            metadata,
        }
    }

    /// Whitespace-delimited words of the chunk text.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.text.split_whitespace()
    }
}
