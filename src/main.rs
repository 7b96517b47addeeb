//! Embedprep Service - Main Entry Point
//!
//! HTTP front end for text cleaning and chunking.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use embedprep::api::{build_router, AppState};
use embedprep::model::{
    LanguageModel, ModelSplitAdvisor, ModelTokenCounter, OllamaClient, SplitAdvisor, TokenEstimator,
};
use embedprep::types::{ModelConfig, ServiceConfig};

type ModelCapabilities = (
    Option<(Arc<dyn SplitAdvisor>, Duration)>,
    Option<Arc<dyn TokenEstimator>>,
);

fn model_capabilities(config: Option<&ModelConfig>) -> Result<ModelCapabilities> {
    let Some(config) = config else {
        return Ok((None, None));
    };

    let client: Arc<dyn LanguageModel> =
        Arc::new(OllamaClient::new(config.clone()).context("failed to build model client")?);
    info!(model = client.name(), url = %config.base_url, "Model endpoint configured");

    let advisor: Arc<dyn SplitAdvisor> = Arc::new(ModelSplitAdvisor::new(client.clone()));
    let estimator = config.estimate_tokens.then(|| {
        Arc::new(ModelTokenCounter::new(client.clone(), config.timeout())) as Arc<dyn TokenEstimator>
    });

    Ok((Some((advisor, config.timeout())), estimator))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "embedprep=info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = ServiceConfig::load().context("failed to load configuration")?;

    info!("Starting Embedprep Service v{}", env!("CARGO_PKG_VERSION"));
    info!(
        max_tokens = config.chunking.max_tokens,
        min_tokens = config.chunking.min_tokens,
        stride = config.chunking.stride,
        profile = %config.chunking.profile,
        "Chunking defaults"
    );

    let (advisor, estimator) = model_capabilities(config.model.as_ref())?;
    let port = config.port;
    let state = Arc::new(AppState::new(config, advisor, estimator)?);
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
