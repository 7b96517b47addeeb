//! Core types for the chunking engine.

mod chunk;
mod config;
mod error;
mod profile;

pub use chunk::{Chunk, ChunkMetadata, ChunkOrigin, TextUnit, UnitOrigin};
pub use config::{
    ChunkingConfig, ModelConfig, RemainderPolicy, ServiceConfig, SplitStrategy, TokenizerKind,
    UnitKind,
};
pub use error::{ChunkingError, Result};
pub use profile::CleaningProfile;
