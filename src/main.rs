/// API сервер предсказаний

use std::path::PathBuf;

use anyhow::Context;

use house_price_ml::api::{self, AppState};
use house_price_ml::{PipelineConfig, PredictPipeline};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = PipelineConfig::load(config_path.as_deref())?;

    let store = config.artifact_store();
    tracing::info!("Serving predictions from {}", store.dir().display());
    let app = api::router(AppState::new(PredictPipeline::new(store)));

    let listener = tokio::net::TcpListener::bind(config.server.bind.as_str())
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    tracing::info!("Server listening on http://{}", config.server.bind);
    axum::serve(listener, app).await?;
    Ok(())
}
