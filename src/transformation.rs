//! Преобразование сырых CSV (train/test) в матрицы для моделей

use std::path::Path;

use ndarray::{concatenate, Array1, Array2, Axis};

use crate::artifacts::EncodedPreprocessor;
use crate::data::Table;
use crate::error::{PipelineError, Result, Stage, StageExt};
use crate::preprocessing::{DatasetNormalizer, FittedPreprocessor, PreprocessorBuilder};

/// Transformed splits; the last column of each matrix is the target.
#[derive(Debug, Clone)]
pub struct TransformedData {
    pub train: Array2<f64>,
    pub test: Array2<f64>,
    pub preprocessor: FittedPreprocessor,
    /// Serialized form that gets published with the selected model.
    pub encoded_preprocessor: EncodedPreprocessor,
}

pub struct DataTransformation {
    builder: PreprocessorBuilder,
}

impl DataTransformation {
    pub fn new(builder: PreprocessorBuilder) -> Self {
        Self { builder }
    }

    pub fn fit_transform(&self, train_path: &Path, test_path: &Path) -> Result<TransformedData> {
        let train = Table::read_csv(train_path).stage(Stage::Ingestion)?;
        let test = Table::read_csv(test_path).stage(Stage::Ingestion)?;
        self.fit_transform_tables(&train, &test)
    }

    /// Fits the preprocessor on the training split only and applies it to both
    /// splits. Nothing is written to disk.
    pub fn fit_transform_tables(&self, train_raw: &Table, test_raw: &Table) -> Result<TransformedData> {
        let (train_x, train_y) = Self::features_and_target(train_raw).stage(Stage::Transformation)?;
        let (test_x, test_y) = Self::features_and_target(test_raw).stage(Stage::Transformation)?;

        tracing::info!("Applying preprocessing on training and test frames");
        let preprocessor = self.builder.build();
        let (fitted, train_matrix) = preprocessor
            .fit_transform(&train_x)
            .stage(Stage::Transformation)?;
        let test_matrix = fitted.transform(&test_x).stage(Stage::Transformation)?;

        let train = append_target(train_matrix, &train_y).stage(Stage::Transformation)?;
        let test = append_target(test_matrix, &test_y).stage(Stage::Transformation)?;

        let encoded_preprocessor = EncodedPreprocessor::encode(&fitted).stage(Stage::Transformation)?;

        tracing::info!(
            "Transformed train {:?} and test {:?} with {} features",
            train.dim(),
            test.dim(),
            fitted.n_features_out()
        );

        Ok(TransformedData {
            train,
            test,
            preprocessor: fitted,
            encoded_preprocessor,
        })
    }

    fn features_and_target(raw: &Table) -> Result<(Table, Array1<f64>)> {
        let canonical = DatasetNormalizer::normalize(raw)?;
        DatasetNormalizer::split_target(&canonical)
    }
}

fn append_target(features: Array2<f64>, target: &Array1<f64>) -> Result<Array2<f64>> {
    let column = target.view().insert_axis(Axis(1));
    concatenate(Axis(1), &[features.view(), column])
        .map_err(|e| PipelineError::preprocessing(format!("failed to append target: {e}")))
}
