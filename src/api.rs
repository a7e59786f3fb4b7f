//! # HTTP API layer
//! `POST /classify`, `POST /refactor`, `GET /status`, `GET /operations`,
//! built on a `Router` closed over an `AppState`, permissive CORS, JSON
//! in/out.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::error::ApiError;
use crate::registry::Registry;
use crate::topic::Operation;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
}

pub fn create_router(registry: Arc<Registry>) -> Router {
    let state = AppState { registry };

    Router::new()
        .route("/classify", post(classify))
        .route("/refactor", post(refactor))
        .route("/status", get(status))
        .route("/operations", get(operations))
        .layer(CorsLayer::permissive())
        .with_state(state)
        .fallback(not_found)
}

#[derive(Debug, Default, Deserialize)]
struct ClassifyRequest {
    #[serde(default)]
    text: String,
    #[serde(default)]
    anchors: Vec<String>,
    #[serde(default)]
    pinned: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ClassifyResponse {
    topic: String,
    #[serde(rename = "topicKey")]
    topic_key: String,
    provider: &'static str,
    anchors: Vec<String>,
    pinned: Vec<String>,
    count: u64,
}

async fn classify(
    State(state): State<AppState>,
    body: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Result<Json<ClassifyResponse>, ApiError> {
    let Json(req) = body.map_err(|_| ApiError::InvalidBody)?;
    let outcome = state.registry.classify(&req.text, req.anchors, req.pinned);

    Ok(Json(ClassifyResponse {
        topic: outcome.topic.label,
        topic_key: outcome.topic.key,
        provider: "topic-gardener",
        anchors: outcome.anchors,
        pinned: outcome.pinned,
        count: outcome.topic.count,
    }))
}

#[derive(Debug, Serialize)]
struct RefactorResponse {
    operations: Vec<Operation>,
    count: usize,
}

async fn refactor(State(state): State<AppState>) -> Json<RefactorResponse> {
    let ops = state.registry.refactor();
    Json(RefactorResponse {
        count: ops.len(),
        operations: ops,
    })
}

async fn status(State(state): State<AppState>) -> Json<crate::registry::RegistrySnapshot> {
    Json(state.registry.snapshot())
}

#[derive(Debug, Serialize)]
struct OperationsResponse {
    operations: Vec<Operation>,
}

async fn operations(State(state): State<AppState>) -> Json<OperationsResponse> {
    Json(OperationsResponse {
        operations: state.registry.get_operations(),
    })
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> Router {
        create_router(Arc::new(Registry::new(&Config::default())))
    }

    #[tokio::test]
    async fn classify_returns_topic_and_count() {
        let response = app()
            .oneshot(
                Request::post("/classify")
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from(r#"{"text":"new climate plan"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["topic"], serde_json::json!("climate"));
        assert_eq!(json["count"], serde_json::json!(1));
        assert_eq!(json["provider"], serde_json::json!("topic-gardener"));
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let response = app()
            .oneshot(
                Request::post("/classify")
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let response = app()
            .oneshot(Request::get("/nope").body(axum::body::Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn status_reports_topic_count() {
        let router = app();
        router
            .clone()
            .oneshot(
                Request::post("/classify")
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from(r#"{"text":"new climate plan"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        let response = router
            .oneshot(Request::get("/status").body(axum::body::Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        // One classified topic plus the five default anchors.
        assert_eq!(json["topicCount"], serde_json::json!(6));
    }

    #[tokio::test]
    async fn refactor_endpoint_runs_synchronously() {
        let response = app()
            .oneshot(Request::post("/refactor").body(axum::body::Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["count"], serde_json::json!(0));
    }
}
