/// Модуль предобработки данных

pub mod column_transformer;
pub mod encoding;
pub mod feature_engineering;
pub mod imputation;
pub mod normalization;

pub use column_transformer::{FittedPreprocessor, Preprocessor, PreprocessorBuilder};
pub use encoding::{
    FittedOneHotEncoder, FittedOrdinalEncoder, HandleUnknown, OneHotEncoder, OrdinalEncoder,
    OrdinalOrdering,
};
pub use feature_engineering::DatasetNormalizer;
pub use imputation::{
    CategoricalImputer, CategoricalStrategy, FittedCategoricalImputer, FittedSimpleImputer,
    ImputeStrategy, SimpleImputer,
};
pub use normalization::{FittedStandardScaler, StandardScaler};

use crate::error::Result;

/// Unfitted transform step: learns its parameters from training data.
pub trait Transformer {
    type Input;
    type Output;
    type Fitted: FittedTransformer<Input = Self::Input, Output = Self::Output>;

    fn fit(&self, data: &Self::Input) -> Result<Self::Fitted>;

    fn fit_transform(&self, data: &Self::Input) -> Result<(Self::Fitted, Self::Output)> {
        let fitted = self.fit(data)?;
        let output = fitted.transform(data)?;
        Ok((fitted, output))
    }
}

/// Fitted transform step. Never mutates its input.
pub trait FittedTransformer {
    type Input;
    type Output;

    fn transform(&self, data: &Self::Input) -> Result<Self::Output>;

    /// Number of input columns seen during fit.
    fn n_features_in(&self) -> usize;
}
