/// Запуск обучения, отчет печатается в JSON

use std::path::PathBuf;

use anyhow::Context;

use house_price_ml::{training, PipelineConfig};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = PipelineConfig::load(config_path.as_deref())?;

    let report = training::run(&config).context("training run failed")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
