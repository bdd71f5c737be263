//! AdaBoost.R2 с линейной функцией потерь на неглубоких деревьях

#![allow(non_snake_case)]

use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::binning::{BinnedMatrix, MAX_BINS};
use super::tree::{Tree, TreeParams};
use super::{check_training_data, Regressor};
use crate::error::{PipelineError, Result};

/// Depth of every weak learner.
pub const ADABOOST_DEPTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaBoostRegressor {
    n_features: usize,
    trees: Vec<Tree>,
    estimator_weights: Vec<f64>,
}

impl AdaBoostRegressor {
    pub fn fit(
        X: ArrayView2<f64>,
        y: ArrayView1<f64>,
        learning_rate: f64,
        n_estimators: usize,
        seed: u64,
    ) -> Result<Self> {
        check_training_data(X, y)?;
        if !(learning_rate > 0.0 && learning_rate.is_finite()) || n_estimators == 0 {
            return Err(PipelineError::training(
                "learning_rate and n_estimators must be positive",
            ));
        }

        let n = X.nrows();
        let binned = BinnedMatrix::new(X, MAX_BINS);
        let g = y.to_vec();
        let h = vec![1.0; n];
        let params = TreeParams::default().with_max_depth(ADABOOST_DEPTH);
        let mut rng = StdRng::seed_from_u64(seed);

        let mut sample_weight = vec![1.0 / n as f64; n];
        let mut trees = Vec::with_capacity(n_estimators);
        let mut estimator_weights = Vec::with_capacity(n_estimators);

        for iboost in 0..n_estimators {
            let total: f64 = sample_weight.iter().sum();
            if !(total > 0.0 && total.is_finite()) {
                break;
            }
            sample_weight.iter_mut().for_each(|w| *w /= total);

            // Взвешенный бутстрап вместо обучения с весами.
            let sampler = WeightedIndex::new(&sample_weight)
                .map_err(|e| PipelineError::training(format!("invalid sample weights: {e}")))?;
            let rows: Vec<usize> = (0..n).map(|_| sampler.sample(&mut rng)).collect();
            let tree = Tree::grow(&binned, rows, &g, &h, &params);

            let pred = tree.predict(X);
            let mut error: Vec<f64> = pred.iter().zip(y.iter()).map(|(p, t)| (p - t).abs()).collect();
            let max_error = error.iter().copied().fold(0.0, f64::max);
            if max_error > 0.0 {
                error.iter_mut().for_each(|e| *e /= max_error);
            }

            let estimator_error: f64 = sample_weight.iter().zip(&error).map(|(w, e)| w * e).sum();

            if estimator_error <= 0.0 {
                // идеальное совпадение, бустить нечего
                trees.push(tree);
                estimator_weights.push(1.0);
                break;
            }
            if estimator_error >= 0.5 {
                if trees.is_empty() {
                    trees.push(tree);
                    estimator_weights.push(1.0);
                }
                tracing::debug!(
                    "AdaBoost stopped at iteration {} with estimator error {:.4}",
                    iboost,
                    estimator_error
                );
                break;
            }

            let beta = estimator_error / (1.0 - estimator_error);
            let estimator_weight = learning_rate * (1.0 / beta).ln();
            trees.push(tree);
            estimator_weights.push(estimator_weight);

            if iboost + 1 < n_estimators {
                for (w, e) in sample_weight.iter_mut().zip(&error) {
                    *w *= beta.powf((1.0 - e) * learning_rate);
                }
            }
        }

        if trees.is_empty() {
            return Err(PipelineError::training("AdaBoost produced no estimators"));
        }

        Ok(Self {
            n_features: X.ncols(),
            trees,
            estimator_weights,
        })
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    /// Weighted median of the estimator predictions for one sample.
    fn weighted_median(&self, sample: ArrayView1<f64>) -> f64 {
        let mut votes: Vec<(f64, f64)> = self
            .trees
            .iter()
            .zip(&self.estimator_weights)
            .map(|(tree, &w)| (tree.predict_row(sample), w))
            .collect();
        votes.sort_by(|a, b| a.0.total_cmp(&b.0));

        let half = 0.5 * votes.iter().map(|(_, w)| w).sum::<f64>();
        let mut cumulative = 0.0;
        for &(prediction, weight) in &votes {
            cumulative += weight;
            if cumulative >= half {
                return prediction;
            }
        }
        votes[votes.len() - 1].0
    }
}

impl Regressor for AdaBoostRegressor {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_rows(&self, X: ArrayView2<f64>) -> Array1<f64> {
        X.rows().into_iter().map(|row| self.weighted_median(row)).collect()
    }
}
