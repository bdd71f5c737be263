//! Выбор модели: поиск по сетке для каждого семейства (k-fold R² на train),
//! переобучение лучшей конфигурации и R² на отложенной выборке.

use linfa::prelude::*;
use linfa::Dataset;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis, Ix1};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::models::{FittedModel, ModelSpec, Regressor, Roster};

pub const DEFAULT_CV_FOLDS: usize = 3;
pub const DEFAULT_QUALITY_FLOOR: f64 = 0.6;
pub const DEFAULT_SEED: u64 = 42;

/// Outcome of one family's search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyScore {
    pub family: String,
    pub spec: ModelSpec,
    /// Mean cross-validated R² of the chosen configuration.
    pub cv_score: f64,
    /// R² of the refit model on the test matrix.
    pub test_score: f64,
}

/// The winning model plus every family's score.
#[derive(Debug, Clone)]
pub struct Selection {
    pub family: String,
    pub spec: ModelSpec,
    pub model: FittedModel,
    pub test_score: f64,
    pub report: Vec<FamilyScore>,
}

#[derive(Debug, Clone)]
pub struct ModelSelector {
    roster: Roster,
    cv_folds: usize,
    quality_floor: f64,
    seed: u64,
}

impl Default for ModelSelector {
    fn default() -> Self {
        Self::new(Roster::default())
    }
}

/// Splits a matrix by the positional contract: last column is the target.
pub fn split_target_column(matrix: &Array2<f64>) -> Result<Dataset<f64, f64, Ix1>> {
    if matrix.ncols() < 2 {
        return Err(PipelineError::training(format!(
            "matrix needs at least one feature and a target column, got {} columns",
            matrix.ncols()
        )));
    }
    let last = matrix.ncols() - 1;
    let records = matrix.slice(s![.., ..last]).to_owned();
    let targets = matrix.column(last).to_owned();
    Ok(Dataset::new(records, targets))
}

fn r2_score(prediction: &Array1<f64>, truth: ArrayView1<f64>) -> Result<f64> {
    prediction
        .r2(&truth)
        .map_err(|e| PipelineError::training(format!("failed to score predictions: {e}")))
}

impl ModelSelector {
    pub fn new(roster: Roster) -> Self {
        Self {
            roster,
            cv_folds: DEFAULT_CV_FOLDS,
            quality_floor: DEFAULT_QUALITY_FLOOR,
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_cv_folds(mut self, cv_folds: usize) -> Self {
        self.cv_folds = cv_folds;
        self
    }

    pub fn with_quality_floor(mut self, quality_floor: f64) -> Self {
        self.quality_floor = quality_floor;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn quality_floor(&self) -> f64 {
        self.quality_floor
    }

    /// Searches every family and returns the one with the best held-out R².
    ///
    /// Ties and NaN scores resolve to the earlier roster entry. Fails with
    /// [`PipelineError::BelowQualityFloor`] when even the best family scores
    /// under the floor. A family with no fittable configuration fails the run;
    /// individual failing configurations are skipped.
    pub fn select_best(&self, train: &Array2<f64>, test: &Array2<f64>) -> Result<Selection> {
        let train = split_target_column(train)?;
        let test = split_target_column(test)?;

        if self.roster.is_empty() {
            return Err(PipelineError::training("model roster is empty"));
        }
        if self.cv_folds < 2 {
            return Err(PipelineError::training("cross-validation needs at least 2 folds"));
        }
        if train.records().nrows() < self.cv_folds {
            return Err(PipelineError::training(format!(
                "{} training rows cannot form {} folds",
                train.records().nrows(),
                self.cv_folds
            )));
        }
        if test.records().nrows() == 0 {
            return Err(PipelineError::training("test matrix is empty"));
        }
        if train.records().ncols() != test.records().ncols() {
            return Err(PipelineError::training(format!(
                "train has {} features, test has {}",
                train.records().ncols(),
                test.records().ncols()
            )));
        }

        tracing::info!(
            "Selecting among {} model families on {} training and {} test rows",
            self.roster.len(),
            train.records().nrows(),
            test.records().nrows()
        );

        let mut report = Vec::with_capacity(self.roster.len());
        let mut best: Option<(usize, f64, ModelSpec, FittedModel)> = None;

        for family in self.roster.families() {
            let outcome = self
                .search_family(&family.grid.candidates(), &train)
                .and_then(|(spec, cv_score)| {
                    let model = spec.fit(train.records().view(), train.targets().view(), self.seed)?;
                    let test_pred = model.predict(test.records().view())?;
                    let test_score = r2_score(&test_pred, test.targets().view())?;
                    Ok((spec, cv_score, model, test_score))
                });

            let (spec, cv_score, model, test_score) = outcome.map_err(|err| {
                PipelineError::training(format!("model family '{}' failed: {}", family.name, err))
            })?;
            tracing::info!(
                "{}: cv R² {:.4}, test R² {:.4} with {:?}",
                family.name,
                cv_score,
                test_score,
                spec
            );
            let improves = match &best {
                None => !test_score.is_nan(),
                Some((_, top, ..)) => test_score > *top,
            };
            if improves {
                best = Some((report.len(), test_score, spec.clone(), model));
            }
            report.push(FamilyScore {
                family: family.name.clone(),
                spec,
                cv_score,
                test_score,
            });
        }

        let (idx, test_score, spec, model) =
            best.ok_or_else(|| PipelineError::training("no model family produced a usable score"))?;
        let family = report[idx].family.clone();

        tracing::info!("Best model: {} with test R² {:.4}", family, test_score);

        if test_score < self.quality_floor {
            return Err(PipelineError::BelowQualityFloor {
                family,
                score: test_score,
                floor: self.quality_floor,
            });
        }

        Ok(Selection {
            family,
            spec,
            model,
            test_score,
            report,
        })
    }

    /// Best configuration of one grid by mean k-fold R²; first seen wins ties.
    fn search_family(&self, candidates: &[ModelSpec], train: &Dataset<f64, f64, Ix1>) -> Result<(ModelSpec, f64)> {
        let mut best: Option<(&ModelSpec, f64)> = None;
        let mut last_error = None;

        for spec in candidates {
            match self.cross_validate(spec, train.records().view(), train.targets()) {
                Ok(score) => {
                    tracing::debug!("  {:?}: cv R² {:.4}", spec, score);
                    let improves = match best {
                        None => !score.is_nan(),
                        Some((_, top)) => score > top,
                    };
                    if improves {
                        best = Some((spec, score));
                    }
                }
                Err(err) => {
                    tracing::debug!("  {:?}: failed: {}", spec, err);
                    last_error = Some(err);
                }
            }
        }

        match (best, last_error) {
            (Some((spec, score)), _) => Ok((spec.clone(), score)),
            (None, Some(err)) => Err(err),
            (None, None) => Err(PipelineError::training("grid produced no scorable candidate")),
        }
    }

    /// Mean R² over contiguous folds; the first `n % k` folds take one extra row.
    fn cross_validate(&self, spec: &ModelSpec, x: ArrayView2<f64>, y: &Array1<f64>) -> Result<f64> {
        let n = x.nrows();
        let k = self.cv_folds;
        let mut start = 0;
        let mut total = 0.0;

        for fold in 0..k {
            let size = n / k + usize::from(fold < n % k);
            let end = start + size;
            let train_rows: Vec<usize> = (0..start).chain(end..n).collect();

            let x_fit = x.select(Axis(0), &train_rows);
            let y_fit = y.select(Axis(0), &train_rows);
            let model = spec.fit(x_fit.view(), y_fit.view(), self.seed)?;

            let pred = model.predict(x.slice(s![start..end, ..]))?;
            total += r2_score(&pred, y.slice(s![start..end]))?;
            start = end;
        }

        Ok(total / k as f64)
    }
}
