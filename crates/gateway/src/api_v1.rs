//! HTTP API v1 — JSON access to the pipeline and its memory.
//!
//! Endpoints:
//!
//! - `POST   /v1/process`                          — Run one message through the pipeline
//! - `GET    /v1/status`                           — Agent name, provider, model, memory backend
//! - `GET    /v1/memory/{server_id}/recent`        — Recent records (`?user_id=&limit=`)
//! - `DELETE /v1/memory/{server_id}/recent`        — Clear a server's rolling log
//! - `GET    /v1/memory/{server_id}/people/{user}` — One person profile
//! - `DELETE /v1/memory/{server_id}/people/{user}` — Forget a person profile

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use vera_core::memory::{MemoryRecord, PersonMemory};
use vera_core::pipeline::{PipelineRequest, PipelineResponse};
use vera_memory::store::{DEFAULT_RECENT_LIMIT, MAX_RECORDS};

use crate::SharedState;

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/process", post(process_handler))
        .route("/status", get(status_handler))
        .route(
            "/memory/{server_id}/recent",
            get(recent_handler).delete(clear_recent_handler),
        )
        .route(
            "/memory/{server_id}/people/{user_id}",
            get(profile_handler).delete(forget_profile_handler),
        )
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

#[derive(Serialize, Deserialize)]
struct StatusResponse {
    agent_name: String,
    provider: String,
    model: String,
    memory_backend: String,
    version: String,
}

#[derive(Deserialize)]
struct RecentQuery {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Serialize, Deserialize)]
struct RecentResponse {
    records: Vec<MemoryRecord>,
    count: usize,
}

#[derive(Serialize, Deserialize)]
struct DeleteResponse {
    deleted: bool,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn process_handler(
    State(state): State<SharedState>,
    Json(request): Json<PipelineRequest>,
) -> Result<Json<PipelineResponse>, ApiError> {
    info!(
        message_len = request.message_text.len(),
        server = %request.server_id,
        "v1/process request"
    );

    state.pipeline.process(&request).await.map(Json).map_err(|e| {
        error!(error = %e, "Pipeline processing failed");
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            crate::PROCESSING_FAILED,
        )
    })
}

async fn status_handler(State(state): State<SharedState>) -> Json<StatusResponse> {
    let generator = state.pipeline.generator();
    Json(StatusResponse {
        agent_name: state.agent_name.clone(),
        provider: generator.provider_name().to_string(),
        model: generator.model().to_string(),
        memory_backend: state.pipeline.memory().backend().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn recent_handler(
    State(state): State<SharedState>,
    Path(server_id): Path<String>,
    Query(query): Query<RecentQuery>,
) -> Json<RecentResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT).min(MAX_RECORDS);
    let records = state
        .pipeline
        .memory()
        .recent(&server_id, query.user_id.as_deref(), limit)
        .await;
    let count = records.len();
    Json(RecentResponse { records, count })
}

async fn clear_recent_handler(
    State(state): State<SharedState>,
    Path(server_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state
        .pipeline
        .memory()
        .clear_recent(&server_id)
        .await
        .map(|deleted| Json(DeleteResponse { deleted }))
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

async fn profile_handler(
    State(state): State<SharedState>,
    Path((server_id, user_id)): Path<(String, String)>,
) -> Result<Json<PersonMemory>, ApiError> {
    state
        .pipeline
        .memory()
        .get_profile(&server_id, &user_id)
        .await
        .map(Json)
        .ok_or_else(|| {
            api_error(
                StatusCode::NOT_FOUND,
                format!("No profile for '{user_id}' on '{server_id}'"),
            )
        })
}

async fn forget_profile_handler(
    State(state): State<SharedState>,
    Path((server_id, user_id)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state
        .pipeline
        .memory()
        .forget_profile(&server_id, &user_id)
        .await
        .map(|deleted| Json(DeleteResponse { deleted }))
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockProvider, state};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn json_body<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn process_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/process")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn process_returns_sections() {
        let app = v1_router(state(MockProvider::replying("Hi there!")));

        let response = app
            .oneshot(process_request(r#"{"messageText":"hello","userId":"u1","serverId":"s1"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let resp: PipelineResponse = json_body(response).await;
        assert_eq!(resp.sections, vec!["Hi there!"]);
        assert_eq!(resp.general_response, "Hi there!");
        assert!(resp.knowledge_triples.is_empty());
    }

    #[tokio::test]
    async fn process_failure_is_500_with_generic_message() {
        let app = v1_router(state(MockProvider::failing()));

        let response = app
            .oneshot(process_request(r#"{"messageText":"hello"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err: ErrorResponse = json_body(response).await;
        assert_eq!(err.error, crate::PROCESSING_FAILED);
        assert!(!err.error.contains("mock outage"));
    }

    #[tokio::test]
    async fn process_rejects_missing_message() {
        let app = v1_router(state(MockProvider::replying("hi")));
        let response = app.oneshot(process_request(r#"{"userId":"u1"}"#)).await.unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn status_reports_wiring() {
        let app = v1_router(state(MockProvider::replying("hi")));
        let req = Request::builder().uri("/status").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let status: StatusResponse = json_body(response).await;
        assert_eq!(status.agent_name, "Vera");
        assert_eq!(status.provider, "gateway_mock");
        assert_eq!(status.model, "mock-model");
        assert_eq!(status.memory_backend, "in_memory");
    }

    #[tokio::test]
    async fn memory_endpoints_follow_processing() {
        let shared = state(MockProvider::replying("Hi there!"));
        let app = v1_router(shared.clone());

        app.clone()
            .oneshot(process_request(
                r#"{"messageText":"hello","userId":"u1","userName":"alice","serverId":"s1"}"#,
            ))
            .await
            .unwrap();

        let req = Request::builder()
            .uri("/memory/s1/recent?user_id=u1")
            .body(Body::empty())
            .unwrap();
        let recent: RecentResponse = json_body(app.clone().oneshot(req).await.unwrap()).await;
        assert_eq!(recent.count, 1);
        assert_eq!(recent.records[0].message, "hello");

        let req = Request::builder()
            .uri("/memory/s1/people/u1")
            .body(Body::empty())
            .unwrap();
        let profile: PersonMemory = json_body(app.clone().oneshot(req).await.unwrap()).await;
        assert_eq!(profile.user_name, "alice");

        let req = Request::builder()
            .method("DELETE")
            .uri("/memory/s1/people/u1")
            .body(Body::empty())
            .unwrap();
        let deleted: DeleteResponse = json_body(app.clone().oneshot(req).await.unwrap()).await;
        assert!(deleted.deleted);

        let req = Request::builder()
            .uri("/memory/s1/people/u1")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let req = Request::builder()
            .method("DELETE")
            .uri("/memory/s1/recent")
            .body(Body::empty())
            .unwrap();
        let cleared: DeleteResponse = json_body(app.oneshot(req).await.unwrap()).await;
        assert!(cleared.deleted);
        assert!(shared.pipeline.memory().recent("s1", None, 5).await.is_empty());
    }
}
