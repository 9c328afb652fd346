//! Test helpers for driving the router in-process

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use orchestrator::{
    app_state::AppState,
    build_router,
    services::{queue::JobQueue, steps::StepRegistry},
};
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;

/// Router over a fresh queue with the built-in steps.
pub fn test_app() -> Router {
    app_with_registry(StepRegistry::builtin())
}

pub fn app_with_registry(registry: StepRegistry) -> Router {
    let state = AppState::new(JobQueue::new(), registry, Duration::from_secs(5));
    build_router(state)
}

/// Send a request and return the status plus the JSON body.
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("Content-Type", "application/json");
    }
    let request = builder
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Submit a job and return its id.
pub async fn submit(app: &Router, payload: &str) -> String {
    let (status, body) = send(app, "POST", "/jobs", Some(payload)).await;
    assert_eq!(status, StatusCode::ACCEPTED, "submit failed: {}", body);
    body["id"].as_str().unwrap().to_string()
}

/// Run a job and return the finished record.
pub async fn run(app: &Router, id: &str) -> Value {
    let (status, body) = send(app, "POST", &format!("/jobs/{}/run", id), None).await;
    assert_eq!(status, StatusCode::OK, "run failed: {}", body);
    body
}

pub async fn list(app: &Router) -> Vec<Value> {
    let (status, body) = send(app, "GET", "/jobs", None).await;
    assert_eq!(status, StatusCode::OK);
    body["items"].as_array().unwrap().clone()
}
