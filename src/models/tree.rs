//! Деревья регрессии на квантованных признаках

#![allow(non_snake_case)]

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::binning::{BinnedMatrix, MAX_BINS};
use super::{check_training_data, Regressor};
use crate::error::{PipelineError, Result};

/// Split quality measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Reduction of the sum of squared errors.
    #[default]
    SquaredError,
    /// Friedman's improvement score, `n_l * n_r / n * (mean_l - mean_r)^2`.
    FriedmanMse,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub criterion: Criterion,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// L2 penalty added to the hessian sum of every node.
    pub lambda: f64,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            criterion: Criterion::SquaredError,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            lambda: 0.0,
        }
    }
}

impl TreeParams {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Flat binary tree; node 0 is the root, samples with `x <= threshold` go left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Stats {
    g: f64,
    h: f64,
    count: usize,
}

impl Stats {
    fn add(&mut self, g: f64, h: f64) {
        self.g += g;
        self.h += h;
        self.count += 1;
    }

    fn minus(&self, other: &Stats) -> Stats {
        Stats {
            g: self.g - other.g,
            h: self.h - other.h,
            count: self.count - other.count,
        }
    }

    fn score(&self, lambda: f64) -> f64 {
        self.g * self.g / (self.h + lambda)
    }
}

struct SplitCandidate {
    feature: usize,
    border: usize,
    gain: f64,
}

impl Tree {
    /// Grows a tree over `rows` (duplicates allowed) fitting leaf values
    /// `sum(g) / (sum(h) + lambda)`.
    ///
    /// With `h = 1` and `lambda = 0` the leaves are plain means of `g`.
    pub fn grow(binned: &BinnedMatrix, rows: Vec<usize>, g: &[f64], h: &[f64], params: &TreeParams) -> Tree {
        let mut nodes = vec![Node::Leaf { value: 0.0 }];
        let mut stack = vec![(0usize, rows, 0usize)];

        while let Some((slot, rows, depth)) = stack.pop() {
            let mut total = Stats::default();
            for &row in &rows {
                total.add(g[row], h[row]);
            }
            nodes[slot] = Node::Leaf {
                value: total.g / (total.h + params.lambda),
            };

            let depth_reached = params.max_depth.map_or(false, |max| depth >= max);
            if depth_reached
                || rows.len() < params.min_samples_split
                || rows.len() < 2 * params.min_samples_leaf
            {
                continue;
            }

            let Some(best) = Self::best_split(binned, &rows, g, h, &total, params) else {
                continue;
            };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .iter()
                .partition(|&&row| binned.bin(row, best.feature) <= best.border);

            let left = nodes.len();
            nodes.push(Node::Leaf { value: 0.0 });
            nodes.push(Node::Leaf { value: 0.0 });
            nodes[slot] = Node::Split {
                feature: best.feature,
                threshold: binned.threshold(best.feature, best.border),
                left,
                right: left + 1,
            };
            stack.push((left + 1, right_rows, depth + 1));
            stack.push((left, left_rows, depth + 1));
        }

        Tree { nodes }
    }

    fn best_split(
        binned: &BinnedMatrix,
        rows: &[usize],
        g: &[f64],
        h: &[f64],
        total: &Stats,
        params: &TreeParams,
    ) -> Option<SplitCandidate> {
        // Выигрыш ниже шума округления узла разбиением не считается.
        let magnitude: f64 = rows.iter().map(|&row| g[row] * g[row]).sum();
        let min_gain = 1e-12 * magnitude;
        let parent = total.score(params.lambda);
        let mut best: Option<SplitCandidate> = None;
        let mut hist = vec![Stats::default(); MAX_BINS];

        for feature in 0..binned.n_features() {
            let n_bins = binned.n_bins(feature);
            if n_bins < 2 {
                continue;
            }
            hist[..n_bins].fill(Stats::default());
            for &row in rows {
                hist[binned.bin(row, feature)].add(g[row], h[row]);
            }

            let mut left = Stats::default();
            for (border, bin) in hist[..n_bins - 1].iter().enumerate() {
                left.g += bin.g;
                left.h += bin.h;
                left.count += bin.count;
                let right = total.minus(&left);
                if left.count < params.min_samples_leaf || right.count < params.min_samples_leaf {
                    continue;
                }

                let gain = match params.criterion {
                    Criterion::SquaredError => {
                        left.score(params.lambda) + right.score(params.lambda) - parent
                    }
                    Criterion::FriedmanMse => {
                        let diff = left.g / left.h - right.g / right.h;
                        left.h * right.h / total.h * diff * diff
                    }
                };

                if gain > min_gain && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        border,
                        gain,
                    });
                }
            }
        }

        best
    }

    #[inline]
    pub fn predict_row(&self, sample: ArrayView1<f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if sample[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn predict(&self, X: ArrayView2<f64>) -> Array1<f64> {
        X.rows().into_iter().map(|row| self.predict_row(row)).collect()
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let Node::Split { left, right, .. } = self.nodes[idx] {
                stack.push((left, depth + 1));
                stack.push((right, depth + 1));
            }
        }
        deepest
    }
}

/// Single CART regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    n_features: usize,
    tree: Tree,
}

impl DecisionTreeRegressor {
    pub fn fit(X: ArrayView2<f64>, y: ArrayView1<f64>, params: &TreeParams) -> Result<Self> {
        check_training_data(X, y)?;
        if params.min_samples_split < 2 || params.min_samples_leaf < 1 {
            return Err(PipelineError::training(
                "min_samples_split must be >= 2 and min_samples_leaf >= 1",
            ));
        }

        let binned = BinnedMatrix::new(X, MAX_BINS);
        let g = y.to_vec();
        let h = vec![1.0; g.len()];
        let tree = Tree::grow(&binned, (0..X.nrows()).collect(), &g, &h, params);

        Ok(Self {
            n_features: X.ncols(),
            tree,
        })
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }
}

impl Regressor for DecisionTreeRegressor {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_rows(&self, X: ArrayView2<f64>) -> Array1<f64> {
        self.tree.predict(X)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn step_data() -> (Array2<f64>, Array1<f64>) {
        let X = Array2::from_shape_fn((40, 2), |(i, j)| if j == 0 { i as f64 } else { (i % 3) as f64 });
        let y = X.column(0).mapv(|v| if v < 20.0 { 1.0 } else { 5.0 });
        (X, y)
    }

    #[test]
    fn single_split_recovers_step() {
        let (X, y) = step_data();
        let params = TreeParams::default().with_max_depth(1);
        let model = DecisionTreeRegressor::fit(X.view(), y.view(), &params).unwrap();

        assert_eq!(model.tree().n_nodes(), 3);
        assert_eq!(model.predict(X.view()).unwrap(), y);
        assert_eq!(model.predict(array![[19.4, 0.0]].view()).unwrap()[0], 1.0);
        assert_eq!(model.predict(array![[19.6, 0.0]].view()).unwrap()[0], 5.0);
    }

    #[test]
    fn pure_node_is_not_split() {
        let X = array![[1.0], [2.0], [3.0]];
        let y = array![4.0, 4.0, 4.0];
        let model = DecisionTreeRegressor::fit(X.view(), y.view(), &TreeParams::default()).unwrap();
        assert_eq!(model.tree().n_nodes(), 1);
    }

    #[test]
    fn unbounded_tree_interpolates_training_rows() {
        let X = Array2::from_shape_fn((30, 1), |(i, _)| i as f64);
        let y = X.column(0).mapv(|v| (v * 0.7).sin());
        let model = DecisionTreeRegressor::fit(X.view(), y.view(), &TreeParams::default()).unwrap();
        let pred = model.predict(X.view()).unwrap();
        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-12);
        }
    }

    #[test]
    fn depth_and_split_limits_are_respected() {
        let X = Array2::from_shape_fn((64, 1), |(i, _)| i as f64);
        let y = X.column(0).mapv(|v| v * v);

        let shallow = TreeParams::default().with_max_depth(3);
        let model = DecisionTreeRegressor::fit(X.view(), y.view(), &shallow).unwrap();
        assert!(model.tree().depth() <= 3);

        let coarse = TreeParams {
            min_samples_split: 65,
            ..TreeParams::default()
        };
        let model = DecisionTreeRegressor::fit(X.view(), y.view(), &coarse).unwrap();
        assert_eq!(model.tree().depth(), 0);
    }

    #[test]
    fn friedman_criterion_finds_same_step() {
        let (X, y) = step_data();
        let params = TreeParams {
            criterion: Criterion::FriedmanMse,
            ..TreeParams::default().with_max_depth(2)
        };
        let model = DecisionTreeRegressor::fit(X.view(), y.view(), &params).unwrap();
        assert_eq!(model.predict(X.view()).unwrap(), y);
    }

    #[test]
    fn lambda_shrinks_leaf_values() {
        let X = array![[0.0], [1.0]];
        let y = array![2.0, 2.0];
        let binned = BinnedMatrix::new(X.view(), MAX_BINS);
        let params = TreeParams {
            lambda: 1.0,
            ..TreeParams::default()
        };
        let tree = Tree::grow(&binned, vec![0, 1], y.as_slice().unwrap(), &[1.0, 1.0], &params);
        assert!((tree.predict(X.view())[0] - 4.0 / 3.0).abs() < 1e-12);
    }
}
