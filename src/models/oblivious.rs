//! Бустинг на симметричных (oblivious) деревьях: все узлы одного уровня
//! используют одну проверку `(feature, threshold)`, поэтому дерево это
//! список разбиений и таблица листьев по результатам проверок.

#![allow(non_snake_case)]

use ndarray::{Array1, ArrayView1, ArrayView2, Zip};
use serde::{Deserialize, Serialize};

use super::binning::BinnedMatrix;
use super::{check_training_data, Regressor};
use crate::error::{PipelineError, Result};

/// L2 penalty on leaf values.
pub const L2_LEAF_REG: f64 = 3.0;
/// Quantization borders per feature.
pub const BORDER_COUNT: usize = 254;
/// Deepest supported tree; leaf tables hold `2^depth` values.
pub const MAX_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObliviousTree {
    /// Level tests, root first; level `k` contributes bit `k` of the leaf index.
    splits: Vec<(usize, f64)>,
    leaf_values: Vec<f64>,
}

impl ObliviousTree {
    fn leaf_index(&self, sample: ArrayView1<f64>) -> usize {
        self.splits
            .iter()
            .enumerate()
            .fold(0, |idx, (level, &(feature, threshold))| {
                if sample[feature] > threshold {
                    idx | (1 << level)
                } else {
                    idx
                }
            })
    }

    pub fn depth(&self) -> usize {
        self.splits.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObliviousBoosting {
    n_features: usize,
    base_score: f64,
    trees: Vec<ObliviousTree>,
}

impl ObliviousBoosting {
    pub fn fit(
        X: ArrayView2<f64>,
        y: ArrayView1<f64>,
        depth: usize,
        learning_rate: f64,
        iterations: usize,
    ) -> Result<Self> {
        check_training_data(X, y)?;
        if depth == 0 || depth > MAX_DEPTH {
            return Err(PipelineError::training(format!(
                "depth must be in 1..={MAX_DEPTH}, got {depth}"
            )));
        }
        if !(learning_rate > 0.0 && learning_rate.is_finite()) || iterations == 0 {
            return Err(PipelineError::training(
                "learning_rate and iterations must be positive",
            ));
        }

        let n = X.nrows();
        let binned = BinnedMatrix::new(X, BORDER_COUNT + 1);
        let orders: Vec<Vec<usize>> = (0..binned.n_features()).map(|f| binned.rows_by_bin(f)).collect();

        let base_score = y.mean().unwrap_or(0.0);
        let mut F = Array1::from_elem(n, base_score);
        let mut trees = Vec::with_capacity(iterations);

        for _ in 0..iterations {
            let residuals: Vec<f64> = Zip::from(&y).and(&F).map_collect(|t, f| t - f).to_vec();
            let tree = Self::grow(&binned, &orders, &residuals, depth, learning_rate);
            for (i, row) in X.rows().into_iter().enumerate() {
                F[i] += tree.leaf_values[tree.leaf_index(row)];
            }
            trees.push(tree);
        }

        Ok(Self {
            n_features: X.ncols(),
            base_score,
            trees,
        })
    }

    fn grow(binned: &BinnedMatrix, orders: &[Vec<usize>], r: &[f64], depth: usize, learning_rate: f64) -> ObliviousTree {
        let n = r.len();
        let mut leaf_of = vec![0usize; n];
        let mut splits = Vec::with_capacity(depth);

        for level in 0..depth {
            let n_leaves = 1usize << level;
            let mut total_sum = vec![0.0; n_leaves];
            let mut total_cnt = vec![0.0; n_leaves];
            for row in 0..n {
                total_sum[leaf_of[row]] += r[row];
                total_cnt[leaf_of[row]] += 1.0;
            }
            let score = |s: f64, c: f64| s * s / (c + L2_LEAF_REG);

            let mut best: Option<(usize, usize, f64)> = None;
            for (feature, order) in orders.iter().enumerate() {
                let n_bins = binned.n_bins(feature);
                if n_bins < 2 {
                    continue;
                }

                // Проходим границы слева направо, переносим строки из правого потомка
                // в левый и обновляем оценку уровня.
                let mut left_sum = vec![0.0; n_leaves];
                let mut left_cnt = vec![0.0; n_leaves];
                let mut current: f64 = (0..n_leaves).map(|l| score(total_sum[l], total_cnt[l])).sum();
                let mut cursor = 0;

                for border in 0..n_bins - 1 {
                    while cursor < n && binned.bin(order[cursor], feature) <= border {
                        let row = order[cursor];
                        let l = leaf_of[row];
                        current -= score(left_sum[l], left_cnt[l])
                            + score(total_sum[l] - left_sum[l], total_cnt[l] - left_cnt[l]);
                        left_sum[l] += r[row];
                        left_cnt[l] += 1.0;
                        current += score(left_sum[l], left_cnt[l])
                            + score(total_sum[l] - left_sum[l], total_cnt[l] - left_cnt[l]);
                        cursor += 1;
                    }
                    if best.map_or(true, |(_, _, s)| current > s) {
                        best = Some((feature, border, current));
                    }
                }
            }

            let Some((feature, border, _)) = best else {
                break;
            };
            for (row, leaf) in leaf_of.iter_mut().enumerate() {
                if binned.bin(row, feature) > border {
                    *leaf |= 1 << level;
                }
            }
            splits.push((feature, binned.threshold(feature, border)));
        }

        let n_leaves = 1usize << splits.len();
        let mut sums = vec![0.0; n_leaves];
        let mut counts = vec![0.0; n_leaves];
        for row in 0..n {
            sums[leaf_of[row]] += r[row];
            counts[leaf_of[row]] += 1.0;
        }
        let leaf_values = sums
            .iter()
            .zip(&counts)
            .map(|(s, c)| learning_rate * s / (c + L2_LEAF_REG))
            .collect();

        ObliviousTree { splits, leaf_values }
    }

    pub fn trees(&self) -> &[ObliviousTree] {
        &self.trees
    }
}

impl Regressor for ObliviousBoosting {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_rows(&self, X: ArrayView2<f64>) -> Array1<f64> {
        X.rows()
            .into_iter()
            .map(|row| {
                self.trees
                    .iter()
                    .fold(self.base_score, |acc, tree| acc + tree.leaf_values[tree.leaf_index(row)])
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn symmetric_trees_fit_monotone_signal() {
        let X = Array2::from_shape_fn((64, 2), |(i, j)| if j == 0 { i as f64 } else { (i % 5) as f64 });
        let y = X.column(0).mapv(|v| 10.0 * v);

        let model = ObliviousBoosting::fit(X.view(), y.view(), 6, 0.3, 100).unwrap();
        let pred = model.predict(X.view()).unwrap();
        let mae = (&pred - &y).mapv(f64::abs).mean().unwrap();
        let baseline = (&y - y.mean().unwrap()).mapv(f64::abs).mean().unwrap();

        assert!(mae < baseline * 0.25, "mae {mae} baseline {baseline}");
        assert!(model.trees().iter().all(|t| t.depth() == 6));
    }

    #[test]
    fn depth_stops_when_no_feature_can_split() {
        let X = Array2::from_elem((10, 1), 1.0);
        let y = Array1::from_iter((0..10).map(|v| v as f64));
        let model = ObliviousBoosting::fit(X.view(), y.view(), 4, 0.1, 3).unwrap();

        assert_eq!(model.trees()[0].depth(), 0);
        let pred = model.predict(X.view()).unwrap();
        assert!((pred[0] - 4.5).abs() < 1e-12);
    }

    #[test]
    fn rejects_out_of_range_depth() {
        let X = Array2::from_elem((4, 1), 1.0);
        let y = Array1::zeros(4);
        assert!(ObliviousBoosting::fit(X.view(), y.view(), 0, 0.1, 3).is_err());
        assert!(ObliviousBoosting::fit(X.view(), y.view(), MAX_DEPTH + 1, 0.1, 3).is_err());
    }
}
