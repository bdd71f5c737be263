//! Конфигурация пайплайна (JSON файл)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::artifacts::ArtifactStore;
use crate::error::{PipelineError, Result};
use crate::models::Roster;
use crate::preprocessing::{OrdinalOrdering, PreprocessorBuilder};
use crate::schema::{ColumnSchema, CONDITION_OF_THE_HOUSE, CONDITION_RANKING};
use crate::selection::{ModelSelector, DEFAULT_CV_FOLDS, DEFAULT_QUALITY_FLOOR, DEFAULT_SEED};

/// Environment variable naming the config file when no path is given.
pub const CONFIG_ENV: &str = "HOUSE_PRICE_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub preprocessing: PreprocessingConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Raw input splits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_train_path")]
    pub train_path: PathBuf,
    #[serde(default = "default_test_path")]
    pub test_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            train_path: default_train_path(),
            test_path: default_test_path(),
        }
    }
}

fn default_train_path() -> PathBuf {
    PathBuf::from("data/train.csv")
}

fn default_test_path() -> PathBuf {
    PathBuf::from("data/test.csv")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    #[serde(default = "default_artifacts_dir")]
    pub dir: PathBuf,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: default_artifacts_dir(),
        }
    }
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    #[serde(default)]
    pub schema: ColumnSchema,
    #[serde(default)]
    pub ordinal_ordering: OrdinalOrdering,
    /// Severity order per ordinal column, worst first.
    #[serde(default = "default_ordinal_rankings")]
    pub ordinal_rankings: Vec<OrdinalRanking>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdinalRanking {
    pub column: String,
    pub categories: Vec<String>,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            schema: ColumnSchema::default(),
            ordinal_ordering: OrdinalOrdering::default(),
            ordinal_rankings: default_ordinal_rankings(),
        }
    }
}

fn default_ordinal_rankings() -> Vec<OrdinalRanking> {
    vec![OrdinalRanking {
        column: CONDITION_OF_THE_HOUSE.to_string(),
        categories: CONDITION_RANKING.iter().map(|c| c.to_string()).collect(),
    }]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_cv_folds")]
    pub cv_folds: usize,
    /// Minimum held-out R² a model needs to be published.
    #[serde(default = "default_quality_floor")]
    pub quality_floor: f64,
    #[serde(default)]
    pub roster: Roster,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            cv_folds: default_cv_folds(),
            quality_floor: default_quality_floor(),
            roster: Roster::default(),
        }
    }
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_cv_folds() -> usize {
    DEFAULT_CV_FOLDS
}

fn default_quality_floor() -> f64 {
    DEFAULT_QUALITY_FLOOR
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| PipelineError::Config(format!("invalid config {}: {e}", path.display())))
    }

    /// Explicit path, then `HOUSE_PRICE_CONFIG`, then built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(env_path) => Self::from_file(Path::new(&env_path)),
            None => {
                tracing::info!("No config file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn preprocessor_builder(&self) -> PreprocessorBuilder {
        let preprocessing = &self.preprocessing;
        let mut builder = PreprocessorBuilder::new(preprocessing.schema.clone())
            .ordinal_ordering(preprocessing.ordinal_ordering);
        for ranking in &preprocessing.ordinal_rankings {
            let categories: Vec<&str> = ranking.categories.iter().map(String::as_str).collect();
            builder = builder.ordinal_ranking(ranking.column.clone(), &categories);
        }
        builder
    }

    pub fn model_selector(&self) -> ModelSelector {
        ModelSelector::new(self.training.roster.clone())
            .with_cv_folds(self.training.cv_folds)
            .with_quality_floor(self.training.quality_floor)
            .with_seed(self.training.seed)
    }

    pub fn artifact_store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.artifacts.dir)
    }
}
