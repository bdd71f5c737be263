//! Стандартизация признаков

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::{FittedTransformer, Transformer};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy)]
pub struct StandardScaler {
    with_mean: bool,
    with_std: bool,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self {
            with_mean: true,
            with_std: true,
        }
    }

    /// Scales to unit variance without centering, keeping sparse indicators non-negative.
    pub fn without_centering() -> Self {
        Self {
            with_mean: false,
            with_std: true,
        }
    }
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedStandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl FittedStandardScaler {
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }
}

impl Transformer for StandardScaler {
    type Input = Array2<f64>;
    type Output = Array2<f64>;
    type Fitted = FittedStandardScaler;

    #[allow(non_snake_case)]
    fn fit(&self, X: &Array2<f64>) -> Result<FittedStandardScaler> {
        if X.nrows() == 0 {
            return Err(PipelineError::preprocessing("cannot fit scaler on empty data"));
        }

        let n_features = X.ncols();
        let mean = if self.with_mean {
            X.mean_axis(Axis(0))
                .ok_or_else(|| PipelineError::preprocessing("failed to compute mean"))?
        } else {
            Array1::zeros(n_features)
        };

        // Стандартное отклонение по генеральной совокупности; у константных столбцов масштаб 1.
        let scale = if self.with_std {
            X.std_axis(Axis(0), 0.0)
                .mapv(|std| if std < 1e-10 || !std.is_finite() { 1.0 } else { std })
        } else {
            Array1::ones(n_features)
        };

        Ok(FittedStandardScaler { mean, scale })
    }
}

impl FittedTransformer for FittedStandardScaler {
    type Input = Array2<f64>;
    type Output = Array2<f64>;

    #[allow(non_snake_case)]
    fn transform(&self, X: &Array2<f64>) -> Result<Array2<f64>> {
        if X.ncols() != self.mean.len() {
            return Err(PipelineError::preprocessing(format!(
                "scaler expects {} columns, got {}",
                self.mean.len(),
                X.ncols()
            )));
        }

        let mut normalized = X.clone();
        for mut row in normalized.rows_mut() {
            for (i, val) in row.iter_mut().enumerate() {
                *val = (*val - self.mean[i]) / self.scale[i];
            }
        }
        Ok(normalized)
    }

    fn n_features_in(&self) -> usize {
        self.mean.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn standardizes_to_zero_mean_unit_variance() {
        let data = array![[1.0, 10.0], [2.0, 10.0], [3.0, 10.0]];
        let (_, scaled) = StandardScaler::new().fit_transform(&data).unwrap();

        let mean = scaled.mean_axis(Axis(0)).unwrap();
        assert!(mean.iter().all(|m| m.abs() < 1e-12));
        assert!((scaled.std_axis(Axis(0), 0.0)[0] - 1.0).abs() < 1e-12);
        // константный столбец центрируется, но не масштабируется
        assert_eq!(scaled.column(1).to_vec(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn without_centering_keeps_zeros() {
        let data = array![[0.0], [1.0], [1.0], [0.0]];
        let (fitted, scaled) = StandardScaler::without_centering().fit_transform(&data).unwrap();

        assert_eq!(fitted.mean().to_vec(), vec![0.0]);
        assert_eq!(scaled[[0, 0]], 0.0);
        assert!((scaled[[1, 0]] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn scaler_uses_training_statistics_only() {
        let fitted = StandardScaler::new().fit(&array![[0.0], [2.0]]).unwrap();
        let scaled = fitted.transform(&array![[4.0]]).unwrap();
        assert_eq!(scaled[[0, 0]], 3.0);
    }
}
