mod common;

use house_price_ml::artifacts::EncodedPreprocessor;
use house_price_ml::{
    training, ArtifactStore, DataTransformation, PipelineError, PredictPipeline, Stage,
};

#[test]
fn fit_transform_shapes() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::config(dir.path());

    let transformation = DataTransformation::new(config.preprocessor_builder());
    let data = transformation
        .fit_transform(&config.data.train_path, &config.data.test_path)
        .unwrap();

    // 45 train rows minus the one without a price
    assert_eq!(data.train.nrows(), 44);
    assert_eq!(data.test.nrows(), 15);

    // 15 numeric + 2 (Waterfront) + 2 (Ever_Renovated) + 1 ordinal + target
    assert_eq!(data.preprocessor.n_features_out(), 20);
    assert_eq!(data.train.ncols(), 21);
    assert_eq!(data.test.ncols(), 21);
    // published only together with a model
    assert!(!config.artifact_store().preprocessor_path().exists());
}

#[test]
fn trained_model_recovers_training_prices() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::config(dir.path());

    let report = training::run(&config).unwrap();
    assert!(report.test_r2 >= 0.6);
    assert_eq!(report.families.len(), 2);
    assert!(report.model_path.exists());

    let pipeline = PredictPipeline::new(config.artifact_store());
    for (row, expected) in [(10, 400_000.0), (30, 600_000.0)] {
        assert_eq!(common::price(row), expected);
        let predicted = pipeline.predict_one(&common::house(row)).unwrap();
        assert!(
            (predicted - expected).abs() < 0.01 * expected,
            "row {row}: predicted {predicted}, expected {expected}"
        );
    }
}

#[test]
fn record_missing_a_field_is_schema_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::config(dir.path());
    training::run(&config).unwrap();

    let record = common::house(10)
        .to_feature_record()
        .unwrap()
        .drop_columns(&["Zipcode"]);
    let err = PredictPipeline::new(config.artifact_store())
        .predict(&record)
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Prediction));
    assert!(matches!(err.root(), PipelineError::SchemaMismatch(_)));
}

#[test]
fn nothing_is_published_below_the_floor() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::config(dir.path());
    config.training.quality_floor = 1.5;

    let err = training::run(&config).unwrap_err();
    assert_eq!(err.stage(), Some(Stage::ModelTraining));
    assert!(matches!(err.root(), PipelineError::BelowQualityFloor { .. }));
    assert!(!config.artifact_store().model_path().exists());
}

#[test]
fn rejected_retrain_keeps_serving_previous_pair() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::config(dir.path());
    training::run(&config).unwrap();

    let pipeline = PredictPipeline::new(config.artifact_store());
    let before = pipeline.predict_one(&common::house(10)).unwrap();

    // retrain on different rows with an unreachable floor
    let mut retrain = config.clone();
    retrain.data.train_path = config.data.test_path.clone();
    retrain.training.quality_floor = 1.5;
    let err = training::run(&retrain).unwrap_err();
    assert!(matches!(err.root(), PipelineError::BelowQualityFloor { .. }));

    assert_eq!(pipeline.predict_one(&common::house(10)).unwrap(), before);
}

#[test]
fn replaced_preprocessor_invalidates_the_pair() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::config(dir.path());
    training::run(&config).unwrap();

    // a preprocessor fitted on other rows, written without its model
    let transformation = DataTransformation::new(config.preprocessor_builder());
    let other = transformation
        .fit_transform(&config.data.test_path, &config.data.test_path)
        .unwrap();
    assert_eq!(
        other.encoded_preprocessor,
        EncodedPreprocessor::encode(&other.preprocessor).unwrap()
    );
    std::fs::write(
        config.artifact_store().preprocessor_path(),
        &other.encoded_preprocessor.bytes,
    )
    .unwrap();

    let err = PredictPipeline::new(config.artifact_store())
        .predict_one(&common::house(10))
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::ArtifactStore));
    assert!(matches!(err.root(), PipelineError::Artifact(_)));
}

#[test]
fn prediction_without_artifacts_fails() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = PredictPipeline::new(ArtifactStore::new(dir.path().join("empty")));

    let err = pipeline.predict_one(&common::house(3)).unwrap_err();
    assert!(matches!(err.root(), PipelineError::MissingArtifact(_)));
}
