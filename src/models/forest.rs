//! Случайный лес (бэггинг деревьев)

#![allow(non_snake_case)]

use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::binning::{BinnedMatrix, MAX_BINS};
use super::tree::{Tree, TreeParams};
use super::{check_training_data, Regressor};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    n_features: usize,
    trees: Vec<Tree>,
}

impl RandomForestRegressor {
    /// Fits `n_estimators` fully grown trees, each on a bootstrap sample.
    pub fn fit(X: ArrayView2<f64>, y: ArrayView1<f64>, n_estimators: usize, seed: u64) -> Result<Self> {
        check_training_data(X, y)?;
        if n_estimators == 0 {
            return Err(PipelineError::training("n_estimators must be positive"));
        }

        let n = X.nrows();
        let binned = BinnedMatrix::new(X, MAX_BINS);
        let g = y.to_vec();
        let h = vec![1.0; n];
        let params = TreeParams::default();
        let mut rng = StdRng::seed_from_u64(seed);

        let trees = (0..n_estimators)
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                Tree::grow(&binned, sample, &g, &h, &params)
            })
            .collect();

        Ok(Self {
            n_features: X.ncols(),
            trees,
        })
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for RandomForestRegressor {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_rows(&self, X: ArrayView2<f64>) -> Array1<f64> {
        let mut sum = Array1::zeros(X.nrows());
        for tree in &self.trees {
            sum += &tree.predict(X);
        }
        sum / self.trees.len() as f64
    }
}
