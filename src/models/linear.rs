//! Линейная регрессия (МНК)

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::{check_training_data, Regressor};
use crate::error::{PipelineError, Result};

/// Relative pivot size below which a column is treated as linearly dependent.
const PIVOT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    weights: Array1<f64>,
    bias: f64,
}

impl LinearRegression {
    /// Fits `y = X w + b` on centered data via the normal equations.
    ///
    /// Collinear columns (one-hot blocks, constant columns) get a zero weight
    /// instead of failing the factorization.
    pub fn fit(X: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<Self> {
        check_training_data(X, y)?;

        let x_mean = X
            .mean_axis(Axis(0))
            .ok_or_else(|| PipelineError::training("empty design matrix"))?;
        let y_mean = y.mean().unwrap_or(0.0);
        let Xc = &X - &x_mean;
        let yc = &y - y_mean;

        // X^T X и X^T y
        let xtx = Xc.t().dot(&Xc);
        let xty = Xc.t().dot(&yc);

        let weights = Self::solve_normal_equations(&xtx, &xty);
        let bias = y_mean - x_mean.dot(&weights);

        Ok(Self { weights, bias })
    }

    /// Cholesky solve of a positive semi-definite system; dependent columns are skipped.
    fn solve_normal_equations(A: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
        let n = A.nrows();
        let max_diag = A.diag().iter().copied().fold(0.0_f64, f64::max);
        let tolerance = PIVOT_TOLERANCE * max_diag.max(f64::MIN_POSITIVE);

        let mut L: Array2<f64> = Array2::zeros((n, n));
        let mut active = vec![false; n];

        for j in 0..n {
            let mut pivot = A[[j, j]];
            for k in 0..j {
                if active[k] {
                    pivot -= L[[j, k]] * L[[j, k]];
                }
            }
            if pivot <= tolerance {
                continue;
            }

            let diag = pivot.sqrt();
            L[[j, j]] = diag;
            active[j] = true;
            for i in (j + 1)..n {
                let mut sum = A[[i, j]];
                for k in 0..j {
                    if active[k] {
                        sum -= L[[i, k]] * L[[j, k]];
                    }
                }
                L[[i, j]] = sum / diag;
            }
        }

        // Прямой ход: L z = b
        let mut z: Array1<f64> = Array1::zeros(n);
        for i in 0..n {
            if !active[i] {
                continue;
            }
            let mut sum = b[i];
            for k in 0..i {
                if active[k] {
                    sum -= L[[i, k]] * z[k];
                }
            }
            z[i] = sum / L[[i, i]];
        }

        // Обратный ход: L^T w = z
        let mut w: Array1<f64> = Array1::zeros(n);
        for i in (0..n).rev() {
            if !active[i] {
                continue;
            }
            let mut sum = z[i];
            for k in (i + 1)..n {
                if active[k] {
                    sum -= L[[k, i]] * w[k];
                }
            }
            w[i] = sum / L[[i, i]];
        }

        w
    }

    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }
}

impl Regressor for LinearRegression {
    fn n_features(&self) -> usize {
        self.weights.len()
    }

    fn predict_rows(&self, X: ArrayView2<f64>) -> Array1<f64> {
        X.dot(&self.weights) + self.bias
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn recovers_exact_linear_relation() {
        let X = Array2::from_shape_fn((20, 2), |(i, j)| if j == 0 { i as f64 } else { ((i * 7) % 5) as f64 });
        let y = X.column(0).mapv(|v| 3.0 * v) + X.column(1).mapv(|v| -2.0 * v) + 10.0;

        let model = LinearRegression::fit(X.view(), y.view()).unwrap();
        assert!((model.weights()[0] - 3.0).abs() < 1e-8);
        assert!((model.weights()[1] + 2.0).abs() < 1e-8);
        assert!((model.bias() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn tolerates_collinear_columns() {
        // два взаимодополняющих индикатора и их постоянная сумма
        let X = array![
            [1.0, 0.0, 1.0, 0.5],
            [0.0, 1.0, 1.0, 1.5],
            [1.0, 0.0, 1.0, 2.5],
            [0.0, 1.0, 1.0, 3.5]
        ];
        let y = array![2.0, 5.0, 4.0, 7.0];

        let model = LinearRegression::fit(X.view(), y.view()).unwrap();
        let pred = model.predict(X.view()).unwrap();
        assert!(model.weights().iter().all(|w| w.is_finite()));
        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-8);
        }
    }

    #[test]
    fn rejects_wrong_width_at_predict() {
        let model = LinearRegression::fit(array![[1.0], [2.0]].view(), array![1.0, 2.0].view()).unwrap();
        assert!(model.predict(array![[1.0, 2.0]].view()).is_err());
    }
}
