//! Batch chunking of independent documents.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::chunkers::ChunkingPipeline;
use crate::types::{Chunk, CleaningProfile};

/// Configuration for batch processing.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum documents processed concurrently
    pub concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

/// A document submitted for chunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    /// Profile name; the pipeline's configured profile when absent
    #[serde(default)]
    pub profile: Option<String>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            profile: None,
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }
}

/// Chunks for one document, or why there are none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentChunks {
    pub id: String,
    pub profile: Option<CleaningProfile>,
    pub chunks: Vec<Chunk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of batch processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    /// Per-document results, in input order
    pub documents: Vec<DocumentChunks>,
    pub total_documents: usize,
    pub failed_documents: usize,
    pub total_chunks: usize,
}

/// Runs a shared [`ChunkingPipeline`] over many documents.
///
/// Documents are independent: up to `concurrency` run at once and a failure
/// in one is reported in its own result without affecting the others.
pub struct BatchProcessor {
    pipeline: Arc<ChunkingPipeline>,
    config: BatchConfig,
}

impl BatchProcessor {
    pub fn new(pipeline: Arc<ChunkingPipeline>, config: BatchConfig) -> Self {
        Self { pipeline, config }
    }

    pub fn pipeline(&self) -> &Arc<ChunkingPipeline> {
        &self.pipeline
    }

    /// Process a batch, returning results in input order.
    pub async fn process_batch(&self, documents: Vec<Document>) -> BatchResult {
        let total_documents = documents.len();
        info!(total_documents, concurrency = self.config.concurrency, "Starting batch processing");

        let results: Vec<DocumentChunks> = stream::iter(documents)
            .map(|document| self.process_document(document))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let failed_documents = results.iter().filter(|r| r.error.is_some()).count();
        let total_chunks = results.iter().map(|r| r.chunks.len()).sum();

        info!(
            processed = total_documents - failed_documents,
            failed = failed_documents,
            chunks = total_chunks,
            "Batch processing complete"
        );

        BatchResult {
            documents: results,
            total_documents,
            failed_documents,
            total_chunks,
        }
    }

    /// Process a batch, sending each document's result as it completes.
    ///
    /// Results are still sent in input order. Stops early if the receiver
    /// is dropped; returns the number of results sent.
    pub async fn process_batch_streaming(
        &self,
        documents: Vec<Document>,
        sender: mpsc::Sender<DocumentChunks>,
    ) -> usize {
        let mut results = stream::iter(documents)
            .map(|document| self.process_document(document))
            .buffered(self.config.concurrency.max(1));

        let mut sent = 0;
        while let Some(result) = results.next().await {
            if sender.send(result).await.is_err() {
                warn!(sent, "Receiver dropped, stopping batch processing");
                break;
            }
            sent += 1;
        }
        sent
    }

    async fn process_document(&self, document: Document) -> DocumentChunks {
        let profile = match &document.profile {
            Some(name) => self.pipeline.resolve_profile(name),
            None => Ok(self.pipeline.config().profile),
        };

        match profile {
            Ok(profile) => DocumentChunks {
                chunks: self.pipeline.process_async(&document.text, profile).await,
                id: document.id,
                profile: Some(profile),
                error: None,
            },
            Err(e) => {
                warn!(document_id = %document.id, error = %e, "Failed to process document");
                DocumentChunks {
                    id: document.id,
                    profile: None,
                    chunks: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkingConfig;

    fn processor(strict: bool) -> BatchProcessor {
        let mut config = ChunkingConfig::with_tokens(20, 0).with_stride(5);
        config.strict_profiles = strict;
        let pipeline = Arc::new(ChunkingPipeline::new(config).unwrap());
        BatchProcessor::new(pipeline, BatchConfig { concurrency: 3 })
    }

    fn documents() -> Vec<Document> {
        (0..6)
            .map(|i| Document::new(format!("doc-{}", i), format!("Document number {} says hello.", i)))
            .collect()
    }

    #[tokio::test]
    async fn test_results_in_input_order() {
        let result = processor(false).process_batch(documents()).await;
        let ids: Vec<&str> = result.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["doc-0", "doc-1", "doc-2", "doc-3", "doc-4", "doc-5"]);
        assert_eq!(result.total_documents, 6);
        assert_eq!(result.failed_documents, 0);
        assert_eq!(result.total_chunks, 6);
        assert_eq!(result.documents[2].chunks[0].text, "Document number 2 says hello.");
    }

    #[tokio::test]
    async fn test_failure_is_per_document() {
        let mut docs = documents();
        docs[1] = docs[1].clone().with_profile("unknown");
        docs[2] = docs[2].clone().with_profile("legal");

        let result = processor(true).process_batch(docs).await;
        assert_eq!(result.failed_documents, 1);
        assert!(result.documents[1].error.is_some());
        assert!(result.documents[1].chunks.is_empty());
        assert_eq!(result.documents[2].profile, Some(CleaningProfile::Legal));
        assert_eq!(result.total_chunks, 5);
    }

    #[tokio::test]
    async fn test_permissive_profile_fallback() {
        let docs = vec![Document::new("a", "Some text here.").with_profile("unknown")];
        let result = processor(false).process_batch(docs).await;
        assert_eq!(result.documents[0].profile, Some(CleaningProfile::Full));
    }

    #[tokio::test]
    async fn test_streaming_sends_every_document() {
        let (tx, mut rx) = mpsc::channel(2);
        let processor = processor(false);
        let sender = tokio::spawn(async move { processor.process_batch_streaming(documents(), tx).await });

        let mut ids = Vec::new();
        while let Some(result) = rx.recv().await {
            ids.push(result.id);
        }
        assert_eq!(sender.await.unwrap(), 6);
        assert_eq!(ids.len(), 6);
        assert_eq!(ids[5], "doc-5");
    }
}
