//! Граф преобразования столбцов: числовая, номинальная и порядковая ветки
//!
//! ```text
//! numeric  ── median imputer ──────── standard scaler ─────────────┐
//! nominal  ── most-frequent imputer ─ one-hot ─ scaler (no mean) ─┼─> [numeric | nominal | ordinal]
//! ordinal  ── "Unknown" imputer ───── ordinal ranks ──────────────┘
//! ```

use ndarray::{concatenate, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::encoding::{FittedOneHotEncoder, FittedOrdinalEncoder, OneHotEncoder, OrdinalEncoder};
use super::imputation::{
    CategoricalImputer, CategoricalStrategy, FittedCategoricalImputer, FittedSimpleImputer,
    ImputeStrategy, SimpleImputer,
};
use super::normalization::{FittedStandardScaler, StandardScaler};
use super::{FittedTransformer, OrdinalOrdering, Transformer};
use crate::data::Table;
use crate::error::{PipelineError, Result};
use crate::schema::{ColumnSchema, CONDITION_OF_THE_HOUSE, CONDITION_RANKING};

/// Fill value for missing ordinal categories.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Builds the composite preprocessor from a column partition.
#[derive(Debug, Clone)]
pub struct PreprocessorBuilder {
    schema: ColumnSchema,
    ordering: OrdinalOrdering,
    rankings: Vec<(String, Vec<String>)>,
}

impl PreprocessorBuilder {
    pub fn new(schema: ColumnSchema) -> Self {
        Self {
            schema,
            ordering: OrdinalOrdering::default(),
            rankings: Vec::new(),
        }
    }

    pub fn ordinal_ordering(mut self, ordering: OrdinalOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Severity order for one ordinal column, worst first.
    pub fn ordinal_ranking(mut self, column: impl Into<String>, ranking: &[&str]) -> Self {
        let column = column.into();
        self.rankings.retain(|(name, _)| *name != column);
        self.rankings
            .push((column, ranking.iter().map(|s| s.to_string()).collect()));
        self
    }

    pub fn build(&self) -> Preprocessor {
        tracing::info!("Nominal categorical columns: {:?}", self.schema.nominal);
        tracing::info!("Ordinal categorical columns: {:?}", self.schema.ordinal);
        tracing::info!("Numerical columns: {:?}", self.schema.numeric);

        let ordinal_encoder = match self.ordering {
            OrdinalOrdering::Observed => {
                OrdinalEncoder::observed(self.schema.ordinal.len(), UNKNOWN_CATEGORY)
            }
            OrdinalOrdering::Explicit => {
                let rankings = self
                    .schema
                    .ordinal
                    .iter()
                    .map(|column| {
                        self.rankings
                            .iter()
                            .find(|(name, _)| name == column)
                            .map(|(_, ranking)| ranking.clone())
                    })
                    .collect();
                OrdinalEncoder::explicit(rankings, UNKNOWN_CATEGORY)
            }
        };

        Preprocessor {
            schema: self.schema.clone(),
            numeric: NumericPipeline {
                imputer: SimpleImputer::new(ImputeStrategy::Median),
                scaler: StandardScaler::new(),
            },
            nominal: NominalPipeline {
                imputer: CategoricalImputer::new(CategoricalStrategy::MostFrequent),
                encoder: OneHotEncoder::new(),
                scaler: StandardScaler::without_centering(),
            },
            ordinal: OrdinalPipeline {
                imputer: CategoricalImputer::new(CategoricalStrategy::Constant(
                    UNKNOWN_CATEGORY.to_string(),
                )),
                encoder: ordinal_encoder,
            },
        }
    }
}

impl Default for PreprocessorBuilder {
    /// House-sales partition with house condition ranked by severity.
    fn default() -> Self {
        Self::new(ColumnSchema::house_sales())
            .ordinal_ranking(CONDITION_OF_THE_HOUSE, CONDITION_RANKING)
    }
}

#[derive(Debug, Clone)]
struct NumericPipeline {
    imputer: SimpleImputer,
    scaler: StandardScaler,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedNumericPipeline {
    imputer: FittedSimpleImputer,
    scaler: FittedStandardScaler,
}

impl Transformer for NumericPipeline {
    type Input = Array2<f64>;
    type Output = Array2<f64>;
    type Fitted = FittedNumericPipeline;

    fn fit(&self, data: &Array2<f64>) -> Result<FittedNumericPipeline> {
        let (imputer, imputed) = self.imputer.fit_transform(data)?;
        let scaler = self.scaler.fit(&imputed)?;
        Ok(FittedNumericPipeline { imputer, scaler })
    }
}

impl FittedTransformer for FittedNumericPipeline {
    type Input = Array2<f64>;
    type Output = Array2<f64>;

    fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        self.scaler.transform(&self.imputer.transform(data)?)
    }

    fn n_features_in(&self) -> usize {
        self.imputer.n_features_in()
    }
}

#[derive(Debug, Clone)]
struct NominalPipeline {
    imputer: CategoricalImputer,
    encoder: OneHotEncoder,
    scaler: StandardScaler,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedNominalPipeline {
    imputer: FittedCategoricalImputer,
    encoder: FittedOneHotEncoder,
    scaler: FittedStandardScaler,
}

impl Transformer for NominalPipeline {
    type Input = Array2<Option<String>>;
    type Output = Array2<f64>;
    type Fitted = FittedNominalPipeline;

    fn fit(&self, data: &Array2<Option<String>>) -> Result<FittedNominalPipeline> {
        let (imputer, imputed) = self.imputer.fit_transform(data)?;
        let (encoder, encoded) = self.encoder.fit_transform(&imputed)?;
        let scaler = self.scaler.fit(&encoded)?;
        Ok(FittedNominalPipeline {
            imputer,
            encoder,
            scaler,
        })
    }
}

impl FittedTransformer for FittedNominalPipeline {
    type Input = Array2<Option<String>>;
    type Output = Array2<f64>;

    fn transform(&self, data: &Array2<Option<String>>) -> Result<Array2<f64>> {
        let imputed = self.imputer.transform(data)?;
        self.scaler.transform(&self.encoder.transform(&imputed)?)
    }

    fn n_features_in(&self) -> usize {
        self.imputer.n_features_in()
    }
}

#[derive(Debug, Clone)]
struct OrdinalPipeline {
    imputer: CategoricalImputer,
    encoder: OrdinalEncoder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedOrdinalPipeline {
    imputer: FittedCategoricalImputer,
    encoder: FittedOrdinalEncoder,
}

impl Transformer for OrdinalPipeline {
    type Input = Array2<Option<String>>;
    type Output = Array2<f64>;
    type Fitted = FittedOrdinalPipeline;

    fn fit(&self, data: &Array2<Option<String>>) -> Result<FittedOrdinalPipeline> {
        let (imputer, imputed) = self.imputer.fit_transform(data)?;
        let encoder = self.encoder.fit(&imputed)?;
        Ok(FittedOrdinalPipeline { imputer, encoder })
    }
}

impl FittedTransformer for FittedOrdinalPipeline {
    type Input = Array2<Option<String>>;
    type Output = Array2<f64>;

    fn transform(&self, data: &Array2<Option<String>>) -> Result<Array2<f64>> {
        self.encoder.transform(&self.imputer.transform(data)?)
    }

    fn n_features_in(&self) -> usize {
        self.imputer.n_features_in()
    }
}

/// Unfitted composite transform.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    schema: ColumnSchema,
    numeric: NumericPipeline,
    nominal: NominalPipeline,
    ordinal: OrdinalPipeline,
}

impl Preprocessor {
    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    /// Learns every branch from the training features. Columns outside the
    /// schema are ignored.
    pub fn fit(&self, features: &Table) -> Result<FittedPreprocessor> {
        let numeric = self
            .numeric
            .fit(&numeric_block(features, &self.schema.numeric)?)
            .map_err(|e| tag("numeric", e))?;
        let nominal = self
            .nominal
            .fit(&categorical_block(features, &self.schema.nominal)?)
            .map_err(|e| tag("nominal", e))?;
        let ordinal = self
            .ordinal
            .fit(&categorical_block(features, &self.schema.ordinal)?)
            .map_err(|e| tag("ordinal", e))?;

        Ok(FittedPreprocessor {
            schema: self.schema.clone(),
            numeric,
            nominal,
            ordinal,
        })
    }

    pub fn fit_transform(&self, features: &Table) -> Result<(FittedPreprocessor, Array2<f64>)> {
        let fitted = self.fit(features)?;
        let transformed = fitted.transform(features)?;
        Ok((fitted, transformed))
    }
}

/// Fitted composite transform; produces a fixed-width numeric matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    schema: ColumnSchema,
    numeric: FittedNumericPipeline,
    nominal: FittedNominalPipeline,
    ordinal: FittedOrdinalPipeline,
}

impl FittedPreprocessor {
    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    pub fn transform(&self, features: &Table) -> Result<Array2<f64>> {
        let numeric = self
            .numeric
            .transform(&numeric_block(features, &self.schema.numeric)?)
            .map_err(|e| tag("numeric", e))?;
        let nominal = self
            .nominal
            .transform(&categorical_block(features, &self.schema.nominal)?)
            .map_err(|e| tag("nominal", e))?;
        let ordinal = self
            .ordinal
            .transform(&categorical_block(features, &self.schema.ordinal)?)
            .map_err(|e| tag("ordinal", e))?;

        concatenate(Axis(1), &[numeric.view(), nominal.view(), ordinal.view()])
            .map_err(|e| PipelineError::preprocessing(format!("failed to join blocks: {e}")))
    }

    /// Width of the transformed matrix.
    pub fn n_features_out(&self) -> usize {
        self.schema.numeric.len() + self.nominal.encoder.n_features_out() + self.schema.ordinal.len()
    }

    /// Output column names in matrix order.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = self.schema.numeric.clone();
        names.extend(self.nominal.encoder.feature_names(&self.schema.nominal));
        names.extend(self.schema.ordinal.iter().cloned());
        names
    }
}

fn tag(branch: &str, err: PipelineError) -> PipelineError {
    match err {
        PipelineError::Preprocessing(msg) => {
            PipelineError::Preprocessing(format!("{branch} pipeline: {msg}"))
        }
        other => other,
    }
}

fn numeric_block(features: &Table, columns: &[String]) -> Result<Array2<f64>> {
    let values = columns
        .iter()
        .map(|name| features.numeric_column(name))
        .collect::<Result<Vec<_>>>()?;
    Ok(Array2::from_shape_fn(
        (features.n_rows(), columns.len()),
        |(row, col)| values[col][row],
    ))
}

fn categorical_block(features: &Table, columns: &[String]) -> Result<Array2<Option<String>>> {
    let cells = columns
        .iter()
        .map(|name| features.require(name))
        .collect::<Result<Vec<_>>>()?;
    Ok(Array2::from_shape_fn(
        (features.n_rows(), columns.len()),
        |(row, col)| cells[col][row].to_category(),
    ))
}
