//! Заполнение пропусков в числовых и категориальных блоках

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::{FittedTransformer, Transformer};
use crate::error::{PipelineError, Result};

/// Fill strategy for numeric columns. Missing values are NaN.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeStrategy {
    Mean,
    #[default]
    Median,
    Constant(f64),
}

#[derive(Debug, Clone, Default)]
pub struct SimpleImputer {
    strategy: ImputeStrategy,
}

impl SimpleImputer {
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self { strategy }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedSimpleImputer {
    strategy: ImputeStrategy,
    statistics: Array1<f64>,
}

impl FittedSimpleImputer {
    pub fn statistics(&self) -> &Array1<f64> {
        &self.statistics
    }
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

impl Transformer for SimpleImputer {
    type Input = Array2<f64>;
    type Output = Array2<f64>;
    type Fitted = FittedSimpleImputer;

    fn fit(&self, data: &Array2<f64>) -> Result<FittedSimpleImputer> {
        if data.nrows() == 0 {
            return Err(PipelineError::preprocessing(
                "cannot fit imputer on empty data",
            ));
        }

        let statistics = data
            .axis_iter(Axis(1))
            .enumerate()
            .map(|(col, column)| {
                let mut observed: Vec<f64> =
                    column.iter().copied().filter(|v| !v.is_nan()).collect();
                if observed.is_empty() {
                    tracing::warn!("Column {} has no observed values, imputing 0", col);
                    return 0.0;
                }
                match self.strategy {
                    ImputeStrategy::Mean => observed.iter().sum::<f64>() / observed.len() as f64,
                    ImputeStrategy::Median => {
                        observed.sort_by(f64::total_cmp);
                        median(&observed)
                    }
                    ImputeStrategy::Constant(value) => value,
                }
            })
            .collect();

        Ok(FittedSimpleImputer {
            strategy: self.strategy,
            statistics,
        })
    }
}

impl FittedTransformer for FittedSimpleImputer {
    type Input = Array2<f64>;
    type Output = Array2<f64>;

    fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        if data.ncols() != self.statistics.len() {
            return Err(PipelineError::preprocessing(format!(
                "imputer expects {} columns, got {}",
                self.statistics.len(),
                data.ncols()
            )));
        }

        let mut filled = data.clone();
        for mut row in filled.rows_mut() {
            for (value, fill) in row.iter_mut().zip(self.statistics.iter()) {
                if value.is_nan() {
                    *value = *fill;
                }
            }
        }
        Ok(filled)
    }

    fn n_features_in(&self) -> usize {
        self.statistics.len()
    }
}

/// Fill strategy for categorical columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalStrategy {
    /// Most frequent observed label; ties resolve to the smallest label.
    #[default]
    MostFrequent,
    Constant(String),
}

#[derive(Debug, Clone, Default)]
pub struct CategoricalImputer {
    strategy: CategoricalStrategy,
}

impl CategoricalImputer {
    pub fn new(strategy: CategoricalStrategy) -> Self {
        Self { strategy }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedCategoricalImputer {
    fill_values: Vec<String>,
}

impl FittedCategoricalImputer {
    pub fn fill_values(&self) -> &[String] {
        &self.fill_values
    }
}

impl Transformer for CategoricalImputer {
    type Input = Array2<Option<String>>;
    type Output = Array2<String>;
    type Fitted = FittedCategoricalImputer;

    fn fit(&self, data: &Array2<Option<String>>) -> Result<FittedCategoricalImputer> {
        if data.nrows() == 0 {
            return Err(PipelineError::preprocessing(
                "cannot fit imputer on empty data",
            ));
        }

        let fill_values = data
            .axis_iter(Axis(1))
            .enumerate()
            .map(|(col, column)| match &self.strategy {
                CategoricalStrategy::Constant(value) => Ok(value.clone()),
                CategoricalStrategy::MostFrequent => {
                    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
                    for label in column.iter().flatten() {
                        *counts.entry(label.as_str()).or_insert(0) += 1;
                    }
                    let mut best: Option<(&str, usize)> = None;
                    for (label, count) in counts {
                        if best.map_or(true, |(_, top)| count > top) {
                            best = Some((label, count));
                        }
                    }
                    best.map(|(label, _)| label.to_string()).ok_or_else(|| {
                        PipelineError::preprocessing(format!(
                            "column {col} has no observed categories"
                        ))
                    })
                }
            })
            .collect::<Result<Vec<String>>>()?;

        Ok(FittedCategoricalImputer { fill_values })
    }
}

impl FittedTransformer for FittedCategoricalImputer {
    type Input = Array2<Option<String>>;
    type Output = Array2<String>;

    fn transform(&self, data: &Array2<Option<String>>) -> Result<Array2<String>> {
        if data.ncols() != self.fill_values.len() {
            return Err(PipelineError::preprocessing(format!(
                "imputer expects {} columns, got {}",
                self.fill_values.len(),
                data.ncols()
            )));
        }

        Ok(Array2::from_shape_fn(data.dim(), |(row, col)| {
            data[[row, col]]
                .clone()
                .unwrap_or_else(|| self.fill_values[col].clone())
        }))
    }

    fn n_features_in(&self) -> usize {
        self.fill_values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn median_fills_numeric_gaps() {
        let data = array![[1.0, f64::NAN], [f64::NAN, 4.0], [3.0, 8.0], [10.0, 6.0]];
        let (fitted, filled) = SimpleImputer::new(ImputeStrategy::Median)
            .fit_transform(&data)
            .unwrap();

        assert_eq!(fitted.statistics().to_vec(), vec![3.0, 6.0]);
        assert_eq!(filled[[1, 0]], 3.0);
        assert_eq!(filled[[0, 1]], 6.0);
        assert_eq!(filled[[3, 0]], 10.0);
    }

    #[test]
    fn imputer_rejects_wrong_width() {
        let fitted = SimpleImputer::default().fit(&array![[1.0, 2.0]]).unwrap();
        assert!(fitted.transform(&array![[1.0]]).is_err());
    }

    #[test]
    fn most_frequent_breaks_ties_by_label() {
        let data = Array2::from_shape_vec(
            (5, 1),
            vec![
                Some("Yes".to_string()),
                Some("No".to_string()),
                None,
                Some("Yes".to_string()),
                Some("No".to_string()),
            ],
        )
        .unwrap();

        let (fitted, filled) = CategoricalImputer::default().fit_transform(&data).unwrap();
        assert_eq!(fitted.fill_values(), &["No".to_string()]);
        assert_eq!(filled[[2, 0]], "No");
    }

    #[test]
    fn constant_fill_uses_sentinel() {
        let data = Array2::from_shape_vec((2, 1), vec![None, Some("Good".to_string())]).unwrap();
        let imputer = CategoricalImputer::new(CategoricalStrategy::Constant("Unknown".into()));
        let (_, filled) = imputer.fit_transform(&data).unwrap();

        assert_eq!(filled[[0, 0]], "Unknown");
        assert_eq!(filled[[1, 0]], "Good");
    }
}
