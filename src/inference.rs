//! Предсказание по опубликованным артефактам

use ndarray::Array1;

use crate::artifacts::ArtifactStore;
use crate::data::Table;
use crate::error::{PipelineError, Result, Stage, StageExt};
use crate::models::Regressor;
use crate::types::HouseFeatures;

/// Stateless predictor: every call reads the current artifact pair.
#[derive(Debug, Clone)]
pub struct PredictPipeline {
    store: ArtifactStore,
}

impl PredictPipeline {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Predicts one value per row. Rows need every schema feature column;
    /// target and identifier columns are not required.
    pub fn predict(&self, features: &Table) -> Result<Array1<f64>> {
        let bundle = self.store.load_bundle().stage(Stage::ArtifactStore)?;
        let matrix = bundle
            .preprocessor
            .transform(features)
            .stage(Stage::Prediction)?;
        bundle
            .model
            .model
            .predict(matrix.view())
            .stage(Stage::Prediction)
    }

    pub fn predict_one(&self, features: &HouseFeatures) -> Result<f64> {
        let record = features.to_feature_record().stage(Stage::Prediction)?;
        let predictions = self.predict(&record)?;
        predictions
            .first()
            .copied()
            .ok_or_else(|| PipelineError::invalid_input("empty prediction").in_stage(Stage::Prediction))
    }
}
