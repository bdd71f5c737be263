//! Регрессия k ближайших соседей (полный перебор, евклидово расстояние)

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::{check_training_data, Regressor};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    #[default]
    Uniform,
    /// Inverse distance; exact matches take all the weight.
    Distance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KNeighborsRegressor {
    n_neighbors: usize,
    weights: Weighting,
    X: Array2<f64>,
    y: Array1<f64>,
}

impl KNeighborsRegressor {
    pub fn fit(X: ArrayView2<f64>, y: ArrayView1<f64>, n_neighbors: usize, weights: Weighting) -> Result<Self> {
        check_training_data(X, y)?;
        if n_neighbors == 0 {
            return Err(PipelineError::training("n_neighbors must be positive"));
        }
        if n_neighbors > X.nrows() {
            tracing::debug!(
                "n_neighbors={} exceeds {} training rows, using all rows",
                n_neighbors,
                X.nrows()
            );
        }

        Ok(Self {
            n_neighbors,
            weights,
            X: X.to_owned(),
            y: y.to_owned(),
        })
    }

    fn predict_one(&self, sample: ArrayView1<f64>) -> f64 {
        let mut distances: Vec<(f64, usize)> = self
            .X
            .rows()
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                let d2: f64 = row.iter().zip(sample.iter()).map(|(a, b)| (a - b) * (a - b)).sum();
                (d2.sqrt(), i)
            })
            .collect();
        distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        let neighbors = &distances[..self.n_neighbors.min(distances.len())];

        match self.weights {
            Weighting::Uniform => {
                neighbors.iter().map(|&(_, i)| self.y[i]).sum::<f64>() / neighbors.len() as f64
            }
            Weighting::Distance => {
                let exact: Vec<usize> = neighbors
                    .iter()
                    .filter(|(d, _)| *d == 0.0)
                    .map(|&(_, i)| i)
                    .collect();
                if !exact.is_empty() {
                    return exact.iter().map(|&i| self.y[i]).sum::<f64>() / exact.len() as f64;
                }
                let (weighted, total) = neighbors
                    .iter()
                    .fold((0.0, 0.0), |(acc, norm), &(d, i)| (acc + self.y[i] / d, norm + 1.0 / d));
                weighted / total
            }
        }
    }
}

impl Regressor for KNeighborsRegressor {
    fn n_features(&self) -> usize {
        self.X.ncols()
    }

    fn predict_rows(&self, X: ArrayView2<f64>) -> Array1<f64> {
        X.rows().into_iter().map(|row| self.predict_one(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn line() -> (Array2<f64>, Array1<f64>) {
        (array![[0.0], [1.0], [2.0], [3.0], [10.0]], array![0.0, 10.0, 20.0, 30.0, 100.0])
    }

    #[test]
    fn uniform_averages_nearest_targets() {
        let (X, y) = line();
        let model = KNeighborsRegressor::fit(X.view(), y.view(), 3, Weighting::Uniform).unwrap();
        let pred = model.predict(array![[1.1]].view()).unwrap();
        assert!((pred[0] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn distance_weighting_favours_closer_rows() {
        let (X, y) = line();
        let model = KNeighborsRegressor::fit(X.view(), y.view(), 2, Weighting::Distance).unwrap();
        let pred = model.predict(array![[0.25]].view()).unwrap();
        // веса 4 и 4/3 для целей 0 и 10
        assert!((pred[0] - 2.5).abs() < 1e-12);
    }

    #[test]
    fn exact_match_takes_all_weight() {
        let (X, y) = line();
        let model = KNeighborsRegressor::fit(X.view(), y.view(), 3, Weighting::Distance).unwrap();
        assert_eq!(model.predict(array![[2.0]].view()).unwrap()[0], 20.0);
    }

    #[test]
    fn k_larger_than_training_set_uses_all_rows() {
        let (X, y) = line();
        let model = KNeighborsRegressor::fit(X.view(), y.view(), 9, Weighting::Uniform).unwrap();
        assert!((model.predict(array![[0.0]].view()).unwrap()[0] - 32.0).abs() < 1e-12);
    }
}
