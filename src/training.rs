//! Обучение: преобразование данных, выбор модели, публикация артефактов

use chrono::Utc;

use crate::artifacts::{ModelArtifact, ModelMetadata};
use crate::config::PipelineConfig;
use crate::error::{Result, Stage, StageExt};
use crate::models::Regressor;
use crate::transformation::DataTransformation;
use crate::types::TrainingReport;

pub fn run(config: &PipelineConfig) -> Result<TrainingReport> {
    let store = config.artifact_store();

    tracing::info!(
        "Starting training run: train={}, test={}, artifacts={}",
        config.data.train_path.display(),
        config.data.test_path.display(),
        store.dir().display()
    );

    let transformation = DataTransformation::new(config.preprocessor_builder());
    let data = transformation.fit_transform(&config.data.train_path, &config.data.test_path)?;
    tracing::info!("Data transformation completed");

    let selection = config
        .model_selector()
        .select_best(&data.train, &data.test)
        .stage(Stage::ModelTraining)?;
    tracing::info!("Model selection completed");

    let trained_at = Utc::now();
    let n_features = selection.model.n_features();
    let artifact = ModelArtifact {
        metadata: ModelMetadata {
            family: selection.family.clone(),
            spec: selection.spec,
            test_r2: selection.test_score,
            trained_at,
            preprocessor_sha256: data.encoded_preprocessor.sha256.clone(),
            n_features,
        },
        model: selection.model,
    };
    // Отклоненный запуск сюда не доходит, прежняя пара остается на месте.
    let published = store
        .publish(&data.encoded_preprocessor, &artifact)
        .stage(Stage::ArtifactStore)?;

    Ok(TrainingReport {
        best_family: selection.family,
        test_r2: selection.test_score,
        train_rows: data.train.nrows(),
        test_rows: data.test.nrows(),
        n_features,
        preprocessor_path: published.preprocessor_path,
        model_path: published.model_path,
        trained_at,
        families: selection.report,
    })
}
