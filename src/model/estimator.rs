//! Token estimation, local or model-backed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use super::LanguageModel;
use crate::chunkers::{TokenCounter, WordCounter};

lazy_static! {
    static ref INTEGER: Regex = Regex::new(r"\d+").expect("valid integer regex");
}

/// Asynchronous token counting.
///
/// Never fails: an implementation that cannot reach its backend answers
/// with a local count instead.
#[async_trait]
pub trait TokenEstimator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn estimate(&self, text: &str) -> usize;
}

/// Wraps a local [`TokenCounter`].
pub struct LocalEstimator {
    counter: Arc<dyn TokenCounter>,
}

impl LocalEstimator {
    pub fn new(counter: Arc<dyn TokenCounter>) -> Self {
        Self { counter }
    }
}

#[async_trait]
impl TokenEstimator for LocalEstimator {
    fn name(&self) -> &'static str {
        self.counter.name()
    }

    async fn estimate(&self, text: &str) -> usize {
        self.counter.count_tokens(text)
    }
}

/// Asks a language model for a token count, falling back to word count.
pub struct ModelTokenCounter {
    model: Arc<dyn LanguageModel>,
    fallback: WordCounter,
    timeout: Duration,
}

impl ModelTokenCounter {
    pub fn new(model: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self {
            model,
            fallback: WordCounter::new(),
            timeout,
        }
    }
}

#[async_trait]
impl TokenEstimator for ModelTokenCounter {
    fn name(&self) -> &'static str {
        "model"
    }

    async fn estimate(&self, text: &str) -> usize {
        if text.trim().is_empty() {
            return 0;
        }

        let prompt = format!("Estimate token count for this text (number only): {}", text);
        let response = match tokio::time::timeout(self.timeout, self.model.generate(&prompt)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(model = self.model.name(), error = %e, "Token estimate failed, counting words");
                return self.fallback.count_tokens(text);
            }
            Err(_) => {
                warn!(model = self.model.name(), "Token estimate timed out, counting words");
                return self.fallback.count_tokens(text);
            }
        };

        match first_integer(&response) {
            Some(count) => count,
            None => {
                debug!(response = %response, "No integer in token estimate, counting words");
                self.fallback.count_tokens(text)
            }
        }
    }
}

/// First run of ASCII digits in `text`, if it fits a `usize`.
pub fn first_integer(text: &str) -> Option<usize> {
    INTEGER.find(text).and_then(|m| m.as_str().parse().ok())
}
