//! Кодирование категорий: one-hot и порядковые номера

use std::collections::BTreeSet;

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use super::{FittedTransformer, Transformer};
use crate::error::{PipelineError, Result};

/// What to do with a category not seen during fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    /// Emit an all-zero indicator block.
    #[default]
    Ignore,
    Error,
}

#[derive(Debug, Clone, Default)]
pub struct OneHotEncoder {
    handle_unknown: HandleUnknown,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handle_unknown(mut self, strategy: HandleUnknown) -> Self {
        self.handle_unknown = strategy;
        self
    }
}

/// Learned categories per input column, sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedOneHotEncoder {
    categories: Vec<Vec<String>>,
    handle_unknown: HandleUnknown,
}

impl FittedOneHotEncoder {
    pub fn categories(&self) -> &[Vec<String>] {
        &self.categories
    }

    pub fn n_features_out(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    /// Output column names as `column=category`.
    pub fn feature_names(&self, columns: &[String]) -> Vec<String> {
        columns
            .iter()
            .zip(&self.categories)
            .flat_map(|(column, cats)| cats.iter().map(move |cat| format!("{column}={cat}")))
            .collect()
    }
}

impl Transformer for OneHotEncoder {
    type Input = Array2<String>;
    type Output = Array2<f64>;
    type Fitted = FittedOneHotEncoder;

    fn fit(&self, data: &Array2<String>) -> Result<FittedOneHotEncoder> {
        if data.nrows() == 0 {
            return Err(PipelineError::preprocessing(
                "cannot fit one-hot encoder on empty data",
            ));
        }

        let categories: Vec<Vec<String>> = data
            .axis_iter(Axis(1))
            .map(|column| {
                column
                    .iter()
                    .cloned()
                    .collect::<BTreeSet<String>>()
                    .into_iter()
                    .collect::<Vec<String>>()
            })
            .collect();

        Ok(FittedOneHotEncoder {
            categories,
            handle_unknown: self.handle_unknown,
        })
    }
}

impl FittedTransformer for FittedOneHotEncoder {
    type Input = Array2<String>;
    type Output = Array2<f64>;

    fn transform(&self, data: &Array2<String>) -> Result<Array2<f64>> {
        if data.ncols() != self.categories.len() {
            return Err(PipelineError::preprocessing(format!(
                "one-hot encoder expects {} columns, got {}",
                self.categories.len(),
                data.ncols()
            )));
        }

        let mut encoded = Array2::zeros((data.nrows(), self.n_features_out()));
        let mut offset = 0;
        for (col, cats) in self.categories.iter().enumerate() {
            for (row, label) in data.column(col).iter().enumerate() {
                match cats.binary_search(label) {
                    Ok(idx) => encoded[[row, offset + idx]] = 1.0,
                    Err(_) if self.handle_unknown == HandleUnknown::Ignore => {}
                    Err(_) => {
                        return Err(PipelineError::preprocessing(format!(
                            "unknown category '{label}' in column {col}"
                        )))
                    }
                }
            }
            offset += cats.len();
        }
        Ok(encoded)
    }

    fn n_features_in(&self) -> usize {
        self.categories.len()
    }
}

/// How ordinal ranks are assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrdinalOrdering {
    /// Ranks follow a configured severity order.
    #[default]
    Explicit,
    /// Ranks follow first-seen order in the training data.
    Observed,
}

/// Maps categories to integer ranks.
///
/// Every column has a fallback category (the imputation sentinel). Labels that
/// were not learned during fit encode to the fallback's rank.
#[derive(Debug, Clone)]
pub struct OrdinalEncoder {
    rankings: Vec<Option<Vec<String>>>,
    fallback: String,
}

impl OrdinalEncoder {
    /// First-seen ranks for `n_columns` columns.
    pub fn observed(n_columns: usize, fallback: impl Into<String>) -> Self {
        Self {
            rankings: vec![None; n_columns],
            fallback: fallback.into(),
        }
    }

    /// Explicit ranks per column; `None` falls back to first-seen order.
    pub fn explicit(rankings: Vec<Option<Vec<String>>>, fallback: impl Into<String>) -> Self {
        Self {
            rankings,
            fallback: fallback.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedOrdinalEncoder {
    categories: Vec<Vec<String>>,
    fallback: String,
}

impl FittedOrdinalEncoder {
    /// Learned categories per column; position is the rank.
    pub fn categories(&self) -> &[Vec<String>] {
        &self.categories
    }

    fn rank(&self, col: usize, label: &str) -> f64 {
        let cats = &self.categories[col];
        cats.iter()
            .position(|c| c == label)
            .or_else(|| cats.iter().position(|c| *c == self.fallback))
            .unwrap_or(0) as f64
    }
}

impl Transformer for OrdinalEncoder {
    type Input = Array2<String>;
    type Output = Array2<f64>;
    type Fitted = FittedOrdinalEncoder;

    fn fit(&self, data: &Array2<String>) -> Result<FittedOrdinalEncoder> {
        if data.ncols() != self.rankings.len() {
            return Err(PipelineError::preprocessing(format!(
                "ordinal encoder configured for {} columns, got {}",
                self.rankings.len(),
                data.ncols()
            )));
        }
        if data.nrows() == 0 {
            return Err(PipelineError::preprocessing(
                "cannot fit ordinal encoder on empty data",
            ));
        }

        let categories: Vec<Vec<String>> = data
            .axis_iter(Axis(1))
            .zip(&self.rankings)
            .enumerate()
            .map(|(col, (column, ranking))| {
                let mut cats: Vec<String> = Vec::new();
                match ranking {
                    Some(ranking) => {
                        cats.push(self.fallback.clone());
                        for label in ranking {
                            if !cats.contains(label) {
                                cats.push(label.clone());
                            }
                        }
                        let unranked: BTreeSet<&String> =
                            column.iter().filter(|label| !cats.contains(*label)).collect();
                        for label in unranked {
                            tracing::warn!(
                                "Ordinal column {} has unranked category '{}', encoding as '{}'",
                                col,
                                label,
                                self.fallback
                            );
                        }
                    }
                    None => {
                        for label in column.iter() {
                            if !cats.contains(label) {
                                cats.push(label.clone());
                            }
                        }
                        if !cats.contains(&self.fallback) {
                            cats.push(self.fallback.clone());
                        }
                    }
                }
                cats
            })
            .collect();

        Ok(FittedOrdinalEncoder {
            categories,
            fallback: self.fallback.clone(),
        })
    }
}

impl FittedTransformer for FittedOrdinalEncoder {
    type Input = Array2<String>;
    type Output = Array2<f64>;

    fn transform(&self, data: &Array2<String>) -> Result<Array2<f64>> {
        if data.ncols() != self.categories.len() {
            return Err(PipelineError::preprocessing(format!(
                "ordinal encoder expects {} columns, got {}",
                self.categories.len(),
                data.ncols()
            )));
        }

        Ok(Array2::from_shape_fn(data.dim(), |(row, col)| {
            self.rank(col, &data[[row, col]])
        }))
    }

    fn n_features_in(&self) -> usize {
        self.categories.len()
    }
}
