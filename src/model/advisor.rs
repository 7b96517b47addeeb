//! Model-advised split points for oversized units.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{LanguageModel, ModelError};

/// Separator the model is asked to place between segments.
pub const SEGMENT_DELIMITER: &str = "|||";

/// Proposes split points for a unit that exceeds the token budget.
///
/// The response is raw model text; [`parse_segments`] turns it into
/// segments. Callers treat any error as "no advice".
#[async_trait]
pub trait SplitAdvisor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn advise(&self, text: &str) -> Result<String, ModelError>;
}

/// [`SplitAdvisor`] backed by a [`LanguageModel`] prompt.
pub struct ModelSplitAdvisor {
    model: Arc<dyn LanguageModel>,
}

impl ModelSplitAdvisor {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    fn prompt(text: &str) -> String {
        format!(
            "Split the following text into coherent chunks of roughly 300 to 500 tokens each. \
             Do not cut a paragraph in the middle. Reply with the chunks only, separated by '{}'.\n\n{}",
            SEGMENT_DELIMITER, text
        )
    }
}

#[async_trait]
impl SplitAdvisor for ModelSplitAdvisor {
    fn name(&self) -> &'static str {
        "model"
    }

    async fn advise(&self, text: &str) -> Result<String, ModelError> {
        debug!(model = self.model.name(), chars = text.len(), "Requesting split advice");
        self.model.generate(&Self::prompt(text)).await
    }
}

/// Parse an advisor response into trimmed, non-empty segments.
///
/// Returns `None` when the response has no delimiter or nothing but
/// whitespace between delimiters.
pub fn parse_segments(response: &str) -> Option<Vec<String>> {
    if !response.contains(SEGMENT_DELIMITER) {
        return None;
    }

    let segments: Vec<String> = response
        .split(SEGMENT_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();

    if segments.is_empty() {
        None
    } else {
        Some(segments)
    }
}
