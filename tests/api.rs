mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use house_price_ml::api::{self, AppState};
use house_price_ml::{training, ArtifactStore, PredictPipeline};

fn app(store: ArtifactStore) -> Router {
    api::router(AppState::new(PredictPipeline::new(store)))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn json_request(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn form_body(skip: Option<&str>) -> String {
    let features = serde_json::to_value(common::house(30)).unwrap();
    features
        .as_object()
        .unwrap()
        .iter()
        .filter(|(name, _)| Some(name.as_str()) != skip)
        .map(|(name, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{name}={value}")
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn form_request(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predictdata")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn health_and_info() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(ArtifactStore::new(dir.path()));

    let (status, body) = send(app.clone(), Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(app, Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn missing_artifacts_are_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(ArtifactStore::new(dir.path().join("artifacts")));

    let features = serde_json::to_value(common::house(10)).unwrap();
    let (status, body) = send(app, json_request("/api/predict", &features)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn json_and_form_predictions_agree() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::config(dir.path());
    training::run(&config).unwrap();
    let app = app(config.artifact_store());

    let features = serde_json::to_value(common::house(30)).unwrap();
    let (status, json) = send(app.clone(), json_request("/api/predict", &features)).await;
    assert_eq!(status, StatusCode::OK);
    let from_json = json["prediction"].as_f64().unwrap();
    assert!((from_json - 600_000.0).abs() < 6_000.0);

    let (status, form) = send(app, form_request(form_body(None))).await;
    assert_eq!(status, StatusCode::OK);
    assert!((form["prediction"].as_f64().unwrap() - from_json).abs() < 1e-6);
}

#[tokio::test]
async fn form_missing_a_field_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::config(dir.path());
    training::run(&config).unwrap();

    let (status, body) = send(app(config.artifact_store()), form_request(form_body(Some("Zipcode")))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("Zipcode"));
}

#[tokio::test]
async fn json_missing_a_field_is_schema_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::config(dir.path());
    training::run(&config).unwrap();

    let mut features = serde_json::to_value(common::house(30)).unwrap();
    features.as_object_mut().unwrap().remove("Zipcode");

    let (status, body) = send(app(config.artifact_store()), json_request("/api/predict", &features)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let error = body["error"].as_str().unwrap();
    assert!(error.starts_with("Schema mismatch"), "{error}");
    assert!(error.contains("Zipcode"), "{error}");
}

#[tokio::test]
async fn malformed_json_is_rejected_with_error_body() {
    let dir = tempfile::tempdir().unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/api/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(app(ArtifactStore::new(dir.path())), request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid input"));
}
