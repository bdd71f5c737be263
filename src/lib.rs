//! House Price ML - предобработка, выбор модели и сервис предсказаний

pub mod api;
pub mod artifacts;
pub mod config;
pub mod data;
pub mod error;
pub mod inference;
pub mod models;
pub mod preprocessing;
pub mod schema;
pub mod selection;
pub mod training;
pub mod transformation;
pub mod types;

pub use artifacts::{ArtifactBundle, ArtifactStore, EncodedPreprocessor, ModelArtifact, ModelMetadata, PublishedPair};
pub use config::PipelineConfig;
pub use data::{Cell, Table};
pub use error::{PipelineError, Result, Stage};
pub use inference::PredictPipeline;
pub use models::{FamilyGrid, FittedModel, ModelFamily, ModelSpec, Regressor, Roster};
pub use preprocessing::{FittedPreprocessor, PreprocessorBuilder};
pub use schema::ColumnSchema;
pub use selection::{FamilyScore, ModelSelector, Selection};
pub use transformation::{DataTransformation, TransformedData};
pub use types::*;
