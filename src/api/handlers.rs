//! HTTP request handlers for the chunking service.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::batch::{BatchProcessor, BatchResult, Document};
use crate::chunkers::ChunkingPipeline;
use crate::model::{SplitAdvisor, TokenEstimator};
use crate::types::{Chunk, ChunkingConfig, ChunkingError, CleaningProfile, ServiceConfig};

/// Application state shared across handlers.
pub struct AppState {
    /// Pipeline for requests without their own config
    pub pipeline: Arc<ChunkingPipeline>,
    pub batch: BatchProcessor,
    pub config: ServiceConfig,
    pub advisor: Option<(Arc<dyn SplitAdvisor>, Duration)>,
    pub estimator: Option<Arc<dyn TokenEstimator>>,
}

impl AppState {
    /// Build state for a service configuration with optional model
    /// capabilities.
    pub fn new(
        config: ServiceConfig,
        advisor: Option<(Arc<dyn SplitAdvisor>, Duration)>,
        estimator: Option<Arc<dyn TokenEstimator>>,
    ) -> Result<Self, ChunkingError> {
        let pipeline = Arc::new(Self::build_pipeline(
            config.chunking.clone(),
            &advisor,
            &estimator,
        )?);
        let batch = BatchProcessor::new(
            pipeline.clone(),
            crate::batch::BatchConfig {
                concurrency: config.max_concurrent_documents,
            },
        );

        Ok(Self {
            pipeline,
            batch,
            config,
            advisor,
            estimator,
        })
    }

    /// Pipeline for a per-request configuration, sharing model capabilities.
    pub fn pipeline_for(&self, config: ChunkingConfig) -> Result<ChunkingPipeline, ChunkingError> {
        Self::build_pipeline(config, &self.advisor, &self.estimator)
    }

    fn build_pipeline(
        config: ChunkingConfig,
        advisor: &Option<(Arc<dyn SplitAdvisor>, Duration)>,
        estimator: &Option<Arc<dyn TokenEstimator>>,
    ) -> Result<ChunkingPipeline, ChunkingError> {
        let mut pipeline = ChunkingPipeline::new(config)?;
        if let Some((advisor, timeout)) = advisor {
            pipeline = pipeline.with_split_advisor(advisor.clone(), *timeout);
        }
        if let Some(estimator) = estimator {
            pipeline = pipeline.with_token_estimator(estimator.clone());
        }
        Ok(pipeline)
    }
}

/// Error body returned for rejected requests.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A request-level failure.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<ChunkingError> for ApiError {
    fn from(e: ChunkingError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

/// Health check endpoint.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileInfo {
    name: String,
    description: String,
}

/// List available cleaning profiles.
pub async fn list_profiles() -> Json<Vec<ProfileInfo>> {
    Json(
        CleaningProfile::ALL
            .into_iter()
            .map(|profile| ProfileInfo {
                name: profile.name().to_string(),
                description: profile.description().to_string(),
            })
            .collect(),
    )
}

#[derive(Debug, Deserialize)]
pub struct ChunkRequest {
    pub text: String,
    #[serde(default)]
    pub profile: Option<String>,
    /// Replaces the service's chunking config for this request
    #[serde(default)]
    pub config: Option<ChunkingConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkResponse {
    pub request_id: Uuid,
    pub profile: CleaningProfile,
    pub chunk_count: usize,
    pub chunks: Vec<Chunk>,
    pub generated_at: DateTime<Utc>,
}

/// Chunk a single document.
pub async fn chunk_document(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChunkRequest>,
) -> Result<Json<ChunkResponse>, ApiError> {
    let request_id = Uuid::new_v4();

    let custom;
    let pipeline: &ChunkingPipeline = match request.config {
        Some(config) => {
            custom = state.pipeline_for(config).map_err(|e| {
                warn!(%request_id, error = %e, "Rejected chunking config");
                e
            })?;
            &custom
        }
        None => &state.pipeline,
    };

    let profile = match &request.profile {
        Some(name) => pipeline.resolve_profile(name)?,
        None => pipeline.config().profile,
    };

    info!(
        %request_id,
        profile = %profile,
        chars = request.text.len(),
        "Received chunk request"
    );

    let chunks = pipeline.process_async(&request.text, profile).await;

    Ok(Json(ChunkResponse {
        request_id,
        profile,
        chunk_count: chunks.len(),
        chunks,
        generated_at: Utc::now(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub documents: Vec<Document>,
}

/// Chunk several documents; failures are reported per document.
pub async fn chunk_batch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> Json<BatchResult> {
    info!(documents = request.documents.len(), "Received batch request");
    Json(state.batch.process_batch(request.documents).await)
}
