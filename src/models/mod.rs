/// ML модели: семейства регрессоров, сетки гиперпараметров и список кандидатов

pub mod adaboost;
pub mod binning;
pub mod boosting;
pub mod forest;
pub mod linear;
pub mod neighbors;
pub mod oblivious;
pub mod tree;

pub use adaboost::AdaBoostRegressor;
pub use boosting::{BoostedTrees, GradientBoosting, RegularizedBoosting};
pub use forest::RandomForestRegressor;
pub use linear::LinearRegression;
pub use neighbors::{KNeighborsRegressor, Weighting};
pub use oblivious::ObliviousBoosting;
pub use tree::{Criterion, DecisionTreeRegressor, TreeParams};

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// A fitted estimator that maps feature rows to predictions.
pub trait Regressor {
    /// Width of the matrix seen during fit.
    fn n_features(&self) -> usize;

    /// Predicts without validating the input width.
    fn predict_rows(&self, x: ArrayView2<f64>) -> Array1<f64>;

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.n_features() {
            return Err(PipelineError::invalid_input(format!(
                "model expects {} features, got {}",
                self.n_features(),
                x.ncols()
            )));
        }
        Ok(self.predict_rows(x))
    }
}

pub(crate) fn check_training_data(x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<()> {
    if x.nrows() == 0 {
        return Err(PipelineError::training("cannot fit on an empty matrix"));
    }
    if x.nrows() != y.len() {
        return Err(PipelineError::training(format!(
            "feature rows ({}) and targets ({}) differ",
            x.nrows(),
            y.len()
        )));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(PipelineError::training("training data contains non-finite values"));
    }
    Ok(())
}

/// One concrete hyperparameter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    RandomForest {
        n_estimators: usize,
    },
    DecisionTree {
        criterion: Criterion,
        max_depth: Option<usize>,
        min_samples_split: usize,
    },
    Knn {
        n_neighbors: usize,
        weights: Weighting,
    },
    GradientBoosting {
        learning_rate: f64,
        n_estimators: usize,
        subsample: f64,
    },
    LinearRegression,
    RegularizedBoosting {
        learning_rate: f64,
        n_estimators: usize,
    },
    ObliviousBoosting {
        depth: usize,
        iterations: usize,
        learning_rate: f64,
    },
    AdaBoost {
        learning_rate: f64,
        n_estimators: usize,
    },
}

impl ModelSpec {
    /// Fits this configuration; `seed` drives every random draw.
    pub fn fit(&self, x: ArrayView2<f64>, y: ArrayView1<f64>, seed: u64) -> Result<FittedModel> {
        let model = match *self {
            ModelSpec::RandomForest { n_estimators } => {
                FittedModel::RandomForest(RandomForestRegressor::fit(x, y, n_estimators, seed)?)
            }
            ModelSpec::DecisionTree {
                criterion,
                max_depth,
                min_samples_split,
            } => {
                let params = TreeParams {
                    criterion,
                    max_depth,
                    min_samples_split,
                    ..TreeParams::default()
                };
                FittedModel::DecisionTree(DecisionTreeRegressor::fit(x, y, &params)?)
            }
            ModelSpec::Knn {
                n_neighbors,
                weights,
            } => FittedModel::Knn(KNeighborsRegressor::fit(x, y, n_neighbors, weights)?),
            ModelSpec::GradientBoosting {
                learning_rate,
                n_estimators,
                subsample,
            } => FittedModel::GradientBoosting(GradientBoosting::fit(
                x,
                y,
                learning_rate,
                subsample,
                n_estimators,
                seed,
            )?),
            ModelSpec::LinearRegression => FittedModel::LinearRegression(LinearRegression::fit(x, y)?),
            ModelSpec::RegularizedBoosting {
                learning_rate,
                n_estimators,
            } => FittedModel::RegularizedBoosting(RegularizedBoosting::fit(
                x,
                y,
                learning_rate,
                n_estimators,
            )?),
            ModelSpec::ObliviousBoosting {
                depth,
                iterations,
                learning_rate,
            } => FittedModel::ObliviousBoosting(ObliviousBoosting::fit(
                x,
                y,
                depth,
                learning_rate,
                iterations,
            )?),
            ModelSpec::AdaBoost {
                learning_rate,
                n_estimators,
            } => FittedModel::AdaBoost(AdaBoostRegressor::fit(x, y, learning_rate, n_estimators, seed)?),
        };
        Ok(model)
    }
}

/// A trained estimator of any family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FittedModel {
    RandomForest(RandomForestRegressor),
    DecisionTree(DecisionTreeRegressor),
    Knn(KNeighborsRegressor),
    GradientBoosting(BoostedTrees),
    LinearRegression(LinearRegression),
    RegularizedBoosting(BoostedTrees),
    ObliviousBoosting(ObliviousBoosting),
    AdaBoost(AdaBoostRegressor),
}

impl FittedModel {
    fn inner(&self) -> &dyn Regressor {
        match self {
            FittedModel::RandomForest(m) => m,
            FittedModel::DecisionTree(m) => m,
            FittedModel::Knn(m) => m,
            FittedModel::GradientBoosting(m) => m,
            FittedModel::LinearRegression(m) => m,
            FittedModel::RegularizedBoosting(m) => m,
            FittedModel::ObliviousBoosting(m) => m,
            FittedModel::AdaBoost(m) => m,
        }
    }
}

impl Regressor for FittedModel {
    fn n_features(&self) -> usize {
        self.inner().n_features()
    }

    fn predict_rows(&self, x: ArrayView2<f64>) -> Array1<f64> {
        self.inner().predict_rows(x)
    }
}

/// Hyperparameter axes of one family; candidates are the cartesian product,
/// axes taken in alphabetical order with the last axis varying fastest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FamilyGrid {
    RandomForest {
        n_estimators: Vec<usize>,
    },
    DecisionTree {
        criterion: Vec<Criterion>,
        max_depth: Vec<Option<usize>>,
        min_samples_split: Vec<usize>,
    },
    Knn {
        n_neighbors: Vec<usize>,
        weights: Vec<Weighting>,
    },
    GradientBoosting {
        learning_rate: Vec<f64>,
        n_estimators: Vec<usize>,
        subsample: Vec<f64>,
    },
    LinearRegression,
    RegularizedBoosting {
        learning_rate: Vec<f64>,
        n_estimators: Vec<usize>,
    },
    ObliviousBoosting {
        depth: Vec<usize>,
        iterations: Vec<usize>,
        learning_rate: Vec<f64>,
    },
    AdaBoost {
        learning_rate: Vec<f64>,
        n_estimators: Vec<usize>,
    },
}

impl FamilyGrid {
    pub fn candidates(&self) -> Vec<ModelSpec> {
        let mut specs = Vec::new();
        match self {
            FamilyGrid::RandomForest { n_estimators } => {
                for &n_estimators in n_estimators {
                    specs.push(ModelSpec::RandomForest { n_estimators });
                }
            }
            FamilyGrid::DecisionTree {
                criterion,
                max_depth,
                min_samples_split,
            } => {
                for &criterion in criterion {
                    for &max_depth in max_depth {
                        for &min_samples_split in min_samples_split {
                            specs.push(ModelSpec::DecisionTree {
                                criterion,
                                max_depth,
                                min_samples_split,
                            });
                        }
                    }
                }
            }
            FamilyGrid::Knn {
                n_neighbors,
                weights,
            } => {
                for &n_neighbors in n_neighbors {
                    for &weights in weights {
                        specs.push(ModelSpec::Knn {
                            n_neighbors,
                            weights,
                        });
                    }
                }
            }
            FamilyGrid::GradientBoosting {
                learning_rate,
                n_estimators,
                subsample,
            } => {
                for &learning_rate in learning_rate {
                    for &n_estimators in n_estimators {
                        for &subsample in subsample {
                            specs.push(ModelSpec::GradientBoosting {
                                learning_rate,
                                n_estimators,
                                subsample,
                            });
                        }
                    }
                }
            }
            FamilyGrid::LinearRegression => specs.push(ModelSpec::LinearRegression),
            FamilyGrid::RegularizedBoosting {
                learning_rate,
                n_estimators,
            } => {
                for &learning_rate in learning_rate {
                    for &n_estimators in n_estimators {
                        specs.push(ModelSpec::RegularizedBoosting {
                            learning_rate,
                            n_estimators,
                        });
                    }
                }
            }
            FamilyGrid::ObliviousBoosting {
                depth,
                iterations,
                learning_rate,
            } => {
                for &depth in depth {
                    for &iterations in iterations {
                        for &learning_rate in learning_rate {
                            specs.push(ModelSpec::ObliviousBoosting {
                                depth,
                                iterations,
                                learning_rate,
                            });
                        }
                    }
                }
            }
            FamilyGrid::AdaBoost {
                learning_rate,
                n_estimators,
            } => {
                for &learning_rate in learning_rate {
                    for &n_estimators in n_estimators {
                        specs.push(ModelSpec::AdaBoost {
                            learning_rate,
                            n_estimators,
                        });
                    }
                }
            }
        }
        specs
    }
}

/// A named family and its grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFamily {
    pub name: String,
    pub grid: FamilyGrid,
}

impl ModelFamily {
    pub fn new(name: impl Into<String>, grid: FamilyGrid) -> Self {
        Self {
            name: name.into(),
            grid,
        }
    }
}

/// Ordered candidate families; earlier entries win ties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster {
    families: Vec<ModelFamily>,
}

impl Roster {
    pub fn new(families: Vec<ModelFamily>) -> Self {
        Self { families }
    }

    pub fn families(&self) -> &[ModelFamily] {
        &self.families
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::new(vec![
            ModelFamily::new(
                "Random Forest",
                FamilyGrid::RandomForest {
                    n_estimators: vec![10, 50, 100],
                },
            ),
            ModelFamily::new(
                "Decision Tree",
                FamilyGrid::DecisionTree {
                    criterion: vec![Criterion::SquaredError, Criterion::FriedmanMse],
                    max_depth: vec![Some(3), Some(5), Some(10), None],
                    min_samples_split: vec![2, 5, 10],
                },
            ),
            ModelFamily::new(
                "K-Neighbors Regressor",
                FamilyGrid::Knn {
                    n_neighbors: vec![3, 5, 7, 9],
                    weights: vec![Weighting::Uniform, Weighting::Distance],
                },
            ),
            ModelFamily::new(
                "Gradient Boosting",
                FamilyGrid::GradientBoosting {
                    learning_rate: vec![0.1, 0.05],
                    n_estimators: vec![10, 50, 100],
                    subsample: vec![0.6, 0.8],
                },
            ),
            ModelFamily::new("Linear Regression", FamilyGrid::LinearRegression),
            ModelFamily::new(
                "Regularized Boosting",
                FamilyGrid::RegularizedBoosting {
                    learning_rate: vec![0.1, 0.05],
                    n_estimators: vec![10, 50, 100],
                },
            ),
            ModelFamily::new(
                "Oblivious Boosting",
                FamilyGrid::ObliviousBoosting {
                    depth: vec![6, 8, 10],
                    iterations: vec![30, 50],
                    learning_rate: vec![0.05, 0.1],
                },
            ),
            ModelFamily::new(
                "AdaBoost Regressor",
                FamilyGrid::AdaBoost {
                    learning_rate: vec![0.1, 0.05],
                    n_estimators: vec![10, 50, 100],
                },
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn monotone() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((60, 3), |(i, j)| match j {
            0 => i as f64,
            1 => (i % 7) as f64,
            _ => if i % 2 == 0 { 1.0 } else { 0.0 },
        });
        let y = x.column(0).mapv(|v| 4000.0 * v + 200_000.0);
        (x, y)
    }

    fn r2(pred: &Array1<f64>, y: &Array1<f64>) -> f64 {
        let mean = y.mean().unwrap();
        let ss_res: f64 = pred.iter().zip(y).map(|(p, t)| (t - p).powi(2)).sum();
        let ss_tot: f64 = y.iter().map(|t| (t - mean).powi(2)).sum();
        1.0 - ss_res / ss_tot
    }

    #[test]
    fn default_roster_sizes() {
        let roster = Roster::default();
        let sizes: Vec<usize> = roster.families().iter().map(|f| f.grid.candidates().len()).collect();
        assert_eq!(sizes, vec![3, 24, 8, 12, 1, 6, 12, 6]);
        assert_eq!(roster.families()[0].name, "Random Forest");
    }

    #[test]
    fn grid_varies_last_axis_fastest() {
        let grid = FamilyGrid::Knn {
            n_neighbors: vec![3, 5],
            weights: vec![Weighting::Uniform, Weighting::Distance],
        };
        assert_eq!(
            grid.candidates()[1],
            ModelSpec::Knn {
                n_neighbors: 3,
                weights: Weighting::Distance
            }
        );
    }

    #[test]
    fn every_family_fits_a_monotone_signal() {
        let (x, y) = monotone();
        for family in Roster::default().families() {
            let candidates = family.grid.candidates();
            let spec = candidates.last().unwrap();
            let model = spec.fit(x.view(), y.view(), 42).unwrap();
            let score = r2(&model.predict(x.view()).unwrap(), &y);
            assert!(score > 0.8, "{} scored {score}", family.name);
        }
    }

    #[test]
    fn fitted_model_survives_json() {
        let (x, y) = monotone();
        let spec = ModelSpec::GradientBoosting {
            learning_rate: 0.1,
            n_estimators: 10,
            subsample: 0.8,
        };
        let model = spec.fit(x.view(), y.view(), 1).unwrap();
        let restored: FittedModel = serde_json::from_str(&serde_json::to_string(&model).unwrap()).unwrap();
        assert_eq!(restored, model);
        assert_eq!(
            restored.predict(x.view()).unwrap(),
            model.predict(x.view()).unwrap()
        );
    }

    #[test]
    fn predict_rejects_wrong_width() {
        let (x, y) = monotone();
        let model = ModelSpec::LinearRegression.fit(x.view(), y.view(), 0).unwrap();
        let narrow = x.slice(ndarray::s![.., ..2]).to_owned();
        assert!(matches!(
            model.predict(narrow.view()),
            Err(PipelineError::InvalidInput(_))
        ));
    }

    #[test]
    fn non_finite_training_data_is_rejected() {
        let (mut x, y) = monotone();
        x[[0, 0]] = f64::NAN;
        assert!(ModelSpec::LinearRegression.fit(x.view(), y.view(), 0).is_err());
    }
}
