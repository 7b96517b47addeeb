//! Ollama-compatible `/api/generate` client.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::debug;

use super::breaker::ModelBreaker;
use super::{LanguageModel, ModelError};
use crate::types::ModelConfig;

/// Request payload for a non-streaming generate call.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Client for a local or remote Ollama endpoint.
///
/// In-flight calls are capped by `max_concurrent_calls` across every
/// document sharing the client, and repeated failures trip a
/// [`ModelBreaker`] so callers fall back without waiting on a dead endpoint.
pub struct OllamaClient {
    client: Client,
    config: ModelConfig,
    permits: Arc<Semaphore>,
    breaker: ModelBreaker,
}

impl OllamaClient {
    pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(config.max_concurrent_calls.max(1))),
            breaker: ModelBreaker::new(config.failure_threshold, config.cooldown()),
            config,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    async fn send(&self, prompt: &str) -> Result<String, ModelError> {
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
            },
        };

        debug!(url = %self.config.base_url, model = %self.config.model, "Model request");

        let response = self
            .client
            .post(&self.config.base_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout(self.config.timeout())
                } else {
                    ModelError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Malformed(e.to_string()))?;
        Ok(body.response)
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        if !self.breaker.allow() {
            return Err(ModelError::Unavailable("circuit open".to_string()));
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ModelError::Unavailable("client shut down".to_string()))?;

        let result = self.send(prompt).await;
        match &result {
            Ok(_) => self.breaker.record_success(),
            Err(_) => self.breaker.record_failure(),
        }
        result
    }
}
