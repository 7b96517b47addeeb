//! External language-model capabilities.
//!
//! The chunking engine only ever talks to a model through the traits here:
//! [`LanguageModel`] for raw prompt completion, [`SplitAdvisor`] for split
//! points and [`TokenEstimator`] for token counts. Each has a local,
//! deterministic counterpart so the engine runs fully offline.

mod advisor;
mod breaker;
mod estimator;
mod ollama;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use advisor::{parse_segments, ModelSplitAdvisor, SplitAdvisor, SEGMENT_DELIMITER};
pub use breaker::ModelBreaker;
pub use estimator::{first_integer, LocalEstimator, ModelTokenCounter, TokenEstimator};
pub use ollama::OllamaClient;

/// Errors from a model call. Always recovered by the caller.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model endpoint returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed model response: {0}")]
    Malformed(String),

    #[error("model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("model unavailable: {0}")]
    Unavailable(String),
}

/// Prompt completion against a language model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier, for logging.
    fn name(&self) -> &str;

    /// Send a prompt, returning the raw completion text.
    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;
}
