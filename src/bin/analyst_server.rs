use anyhow::Context;
use balance_sheet_analyst::server::{create_router, AppState};
use balance_sheet_analyst::{
    AnalysisOrchestrator, GeminiClient, InMemoryRecordStore, RecordStore, ServiceConfig,
};
use dotenv::dotenv;
use log::{info, warn};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Missing credentials stop the service here rather than failing each request.
    let config = ServiceConfig::from_env().context("invalid service configuration")?;

    let store: Arc<dyn RecordStore> = match &config.data_path {
        Some(path) => Arc::new(
            InMemoryRecordStore::load(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
        ),
        None => {
            warn!("ANALYST_DATA_PATH not set; starting with an empty record store");
            Arc::new(InMemoryRecordStore::new())
        }
    };

    let model = GeminiClient::with_timeout(config.gemini_api_key.clone(), config.request_timeout)?
        .model(config.gemini_model.clone());

    let orchestrator =
        AnalysisOrchestrator::new(store, Arc::new(model), config.orchestrator_config());
    let app = create_router(AppState {
        orchestrator: Arc::new(orchestrator),
    });

    info!("Starting analysis service on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
