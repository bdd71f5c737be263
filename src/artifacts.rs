//! Хранилище артефактов: обученный препроцессор и выбранная модель

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{PipelineError, Result};
use crate::models::{FittedModel, ModelSpec, Regressor};
use crate::preprocessing::FittedPreprocessor;

pub const PREPROCESSOR_FILE: &str = "preprocessor.json";
pub const MODEL_FILE: &str = "model.json";

/// Provenance stored next to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub family: String,
    pub spec: ModelSpec,
    pub test_r2: f64,
    pub trained_at: DateTime<Utc>,
    /// SHA-256 of the `preprocessor.json` this model was trained against.
    pub preprocessor_sha256: String,
    pub n_features: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub metadata: ModelMetadata,
    pub model: FittedModel,
}

/// A preprocessor and model verified to belong together.
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    pub preprocessor: FittedPreprocessor,
    pub model: ModelArtifact,
}

pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Serialized preprocessor and its fingerprint, ready to publish.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedPreprocessor {
    pub bytes: Vec<u8>,
    pub sha256: String,
}

impl EncodedPreprocessor {
    pub fn encode(preprocessor: &FittedPreprocessor) -> Result<Self> {
        let bytes = serde_json::to_vec_pretty(preprocessor)?;
        let sha256 = fingerprint(&bytes);
        Ok(Self { bytes, sha256 })
    }
}

/// Paths of a published artifact pair.
#[derive(Debug, Clone)]
pub struct PublishedPair {
    pub preprocessor_path: PathBuf,
    pub model_path: PathBuf,
}

fn staging_path(path: &Path) -> PathBuf {
    path.with_extension("json.tmp")
}

fn stage_file(path: &Path, data: &[u8]) -> io::Result<PathBuf> {
    let tmp = staging_path(path);
    fs::write(&tmp, data)?;
    Ok(tmp)
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn preprocessor_path(&self) -> PathBuf {
        self.dir.join(PREPROCESSOR_FILE)
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    fn read(path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => PipelineError::MissingArtifact(path.to_path_buf()),
            _ => PipelineError::Io(e),
        })
    }

    pub fn load_preprocessor(&self) -> Result<FittedPreprocessor> {
        let bytes = Self::read(&self.preprocessor_path())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Fingerprint of the preprocessor currently on disk.
    pub fn preprocessor_fingerprint(&self) -> Result<String> {
        Ok(fingerprint(&Self::read(&self.preprocessor_path())?))
    }

    /// Replaces both artifacts. Nothing is renamed into place until both files
    /// are fully written; the preprocessor is renamed first, then the model.
    pub fn publish(&self, preprocessor: &EncodedPreprocessor, model: &ModelArtifact) -> Result<PublishedPair> {
        if model.metadata.preprocessor_sha256 != preprocessor.sha256 {
            return Err(PipelineError::artifact(format!(
                "model was trained against preprocessor {}, publishing {}",
                model.metadata.preprocessor_sha256, preprocessor.sha256
            )));
        }
        let model_bytes = serde_json::to_vec_pretty(model)?;

        fs::create_dir_all(&self.dir)?;
        let preprocessor_path = self.preprocessor_path();
        let model_path = self.model_path();
        let staged_preprocessor = stage_file(&preprocessor_path, &preprocessor.bytes)?;
        let staged_model = match stage_file(&model_path, &model_bytes) {
            Ok(tmp) => tmp,
            Err(e) => {
                let _ = fs::remove_file(&staged_preprocessor);
                return Err(e.into());
            }
        };
        fs::rename(&staged_preprocessor, &preprocessor_path)?;
        fs::rename(&staged_model, &model_path)?;

        tracing::info!(
            "Published {} model to {} with preprocessor {} ({}, test R² {:.4})",
            model.metadata.family,
            model_path.display(),
            preprocessor_path.display(),
            &preprocessor.sha256[..12],
            model.metadata.test_r2
        );
        Ok(PublishedPair {
            preprocessor_path,
            model_path,
        })
    }

    pub fn load_model(&self) -> Result<ModelArtifact> {
        let bytes = Self::read(&self.model_path())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Loads both artifacts and checks they were produced by the same run.
    pub fn load_bundle(&self) -> Result<ArtifactBundle> {
        let preprocessor_bytes = Self::read(&self.preprocessor_path())?;
        let digest = fingerprint(&preprocessor_bytes);
        let preprocessor: FittedPreprocessor = serde_json::from_slice(&preprocessor_bytes)?;
        let model = self.load_model()?;

        if model.metadata.preprocessor_sha256 != digest {
            return Err(PipelineError::artifact(format!(
                "model was trained against preprocessor {}, found {}",
                model.metadata.preprocessor_sha256, digest
            )));
        }
        if model.model.n_features() != preprocessor.n_features_out() {
            return Err(PipelineError::artifact(format!(
                "model expects {} features, preprocessor produces {}",
                model.model.n_features(),
                preprocessor.n_features_out()
            )));
        }

        Ok(ArtifactBundle { preprocessor, model })
    }
}
