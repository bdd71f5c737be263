//! Бустинг деревьев на квадратичной ошибке: классический градиентный
//! бустинг и вариант второго порядка с L2 регуляризацией листьев.

#![allow(non_snake_case)]

use ndarray::{Array1, ArrayView1, ArrayView2, Zip};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::binning::{BinnedMatrix, MAX_BINS};
use super::tree::{Criterion, Tree, TreeParams};
use super::{check_training_data, Regressor};
use crate::error::{PipelineError, Result};

/// Depth of every gradient boosting stage.
pub const GRADIENT_BOOSTING_DEPTH: usize = 3;
/// Depth of every regularized boosting stage.
pub const REGULARIZED_BOOSTING_DEPTH: usize = 6;
/// L2 penalty on regularized boosting leaves.
pub const REGULARIZED_BOOSTING_LAMBDA: f64 = 1.0;

/// Ensemble shared by both boosting flavours: a constant base score plus
/// learning-rate-scaled trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedTrees {
    n_features: usize,
    base_score: f64,
    learning_rate: f64,
    trees: Vec<Tree>,
}

impl BoostedTrees {
    pub fn n_stages(&self) -> usize {
        self.trees.len()
    }

    pub fn base_score(&self) -> f64 {
        self.base_score
    }
}

impl Regressor for BoostedTrees {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_rows(&self, X: ArrayView2<f64>) -> Array1<f64> {
        let mut pred = Array1::from_elem(X.nrows(), self.base_score);
        for tree in &self.trees {
            pred.scaled_add(self.learning_rate, &tree.predict(X));
        }
        pred
    }
}

fn check_rate(learning_rate: f64, n_estimators: usize) -> Result<()> {
    if !(learning_rate > 0.0 && learning_rate.is_finite()) {
        return Err(PipelineError::training(format!(
            "learning_rate must be positive, got {learning_rate}"
        )));
    }
    if n_estimators == 0 {
        return Err(PipelineError::training("n_estimators must be positive"));
    }
    Ok(())
}

/// Stagewise least-squares boosting with row subsampling.
pub struct GradientBoosting;

impl GradientBoosting {
    pub fn fit(
        X: ArrayView2<f64>,
        y: ArrayView1<f64>,
        learning_rate: f64,
        subsample: f64,
        n_estimators: usize,
        seed: u64,
    ) -> Result<BoostedTrees> {
        check_training_data(X, y)?;
        check_rate(learning_rate, n_estimators)?;
        if !(subsample > 0.0 && subsample <= 1.0) {
            return Err(PipelineError::training(format!(
                "subsample must be in (0, 1], got {subsample}"
            )));
        }

        let n = X.nrows();
        let binned = BinnedMatrix::new(X, MAX_BINS);
        let params = TreeParams {
            criterion: Criterion::FriedmanMse,
            ..TreeParams::default().with_max_depth(GRADIENT_BOOSTING_DEPTH)
        };
        let h = vec![1.0; n];
        let n_sample = ((subsample * n as f64) as usize).clamp(1, n);
        let mut rng = StdRng::seed_from_u64(seed);

        let base_score = y.mean().unwrap_or(0.0);
        let mut F = Array1::from_elem(n, base_score);
        let mut trees = Vec::with_capacity(n_estimators);

        for _ in 0..n_estimators {
            let residuals: Vec<f64> = Zip::from(&y).and(&F).map_collect(|t, f| t - f).to_vec();
            let rows = if n_sample < n {
                let mut rows = rand::seq::index::sample(&mut rng, n, n_sample).into_vec();
                rows.sort_unstable();
                rows
            } else {
                (0..n).collect()
            };

            let tree = Tree::grow(&binned, rows, &residuals, &h, &params);
            F.scaled_add(learning_rate, &tree.predict(X));
            trees.push(tree);
        }

        Ok(BoostedTrees {
            n_features: X.ncols(),
            base_score,
            learning_rate,
            trees,
        })
    }
}

/// Second-order boosting: leaf weight `-G / (H + lambda)`, gain on the same
/// regularized score. Squared loss gives gradient `f - y` and unit hessian.
pub struct RegularizedBoosting;

impl RegularizedBoosting {
    pub fn fit(X: ArrayView2<f64>, y: ArrayView1<f64>, learning_rate: f64, n_estimators: usize) -> Result<BoostedTrees> {
        check_training_data(X, y)?;
        check_rate(learning_rate, n_estimators)?;

        let n = X.nrows();
        let binned = BinnedMatrix::new(X, MAX_BINS);
        let params = TreeParams {
            lambda: REGULARIZED_BOOSTING_LAMBDA,
            ..TreeParams::default().with_max_depth(REGULARIZED_BOOSTING_DEPTH)
        };
        let h = vec![1.0; n];

        let base_score = y.mean().unwrap_or(0.0);
        let mut F = Array1::from_elem(n, base_score);
        let mut trees = Vec::with_capacity(n_estimators);

        for _ in 0..n_estimators {
            // антиградиент, листья получаются как -G / (H + lambda)
            let neg_grad: Vec<f64> = Zip::from(&y).and(&F).map_collect(|t, f| t - f).to_vec();
            let tree = Tree::grow(&binned, (0..n).collect(), &neg_grad, &h, &params);
            F.scaled_add(learning_rate, &tree.predict(X));
            trees.push(tree);
        }

        Ok(BoostedTrees {
            n_features: X.ncols(),
            base_score,
            learning_rate,
            trees,
        })
    }
}
