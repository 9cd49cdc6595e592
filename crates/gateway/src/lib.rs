//! HTTP gateway for Vera.
//!
//! Exposes the inbound webhook used by chat integrations, the Discord
//! message-event route, a health check, the welcome text, and the v1 JSON
//! API.
//!
//! Built on Axum.

pub mod api_v1;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Query};
use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use vera_agent::Pipeline;
use vera_agent::welcome::{Welcome, welcome};
use vera_channels::{DiscordWebhook, SignatureVerifier, WebhookMetadata};
use vera_core::channel::ChannelMessage;

/// Answer when the webhook is called without a Discord destination.
pub const DISCORD_NOT_CONFIGURED: &str =
    "Please set DISCORD_WEBHOOK_URL in your environment or config file";

/// Answer when the pipeline fails; details stay in the logs.
pub const PROCESSING_FAILED: &str = "Sorry, there was an error processing your request.";

/// Header carrying the inbound HMAC signature.
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// 1 MB
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub pipeline: Pipeline,
    pub discord: Option<DiscordWebhook>,
    pub verifier: SignatureVerifier,
    pub agent_name: String,
    /// The bot's own Discord user id, for mention detection
    pub bot_user_id: Option<String>,
}

impl GatewayState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            discord: None,
            verifier: SignatureVerifier::default(),
            agent_name: "Vera".to_string(),
            bot_user_id: None,
        }
    }

    pub fn with_discord(mut self, discord: DiscordWebhook) -> Self {
        self.discord = Some(discord);
        self
    }

    pub fn with_verifier(mut self, verifier: SignatureVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn with_bot_user_id(mut self, bot_user_id: impl Into<String>) -> Self {
        self.bot_user_id = Some(bot_user_id.into());
        self
    }

    /// Build every subsystem once from configuration.
    ///
    /// Fails when no generation credential is available.
    pub fn from_config(config: &vera_config::AppConfig) -> vera_core::Result<Self> {
        let mut state = Self::new(Pipeline::from_config(config)?)
            .with_verifier(SignatureVerifier::new(config.gateway.webhook_secret.clone()));
        state.discord = DiscordWebhook::from_config(config);
        state.agent_name = config.agent_name.clone();
        state.bot_user_id = config.discord.bot_user_id.clone();
        Ok(state)
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/welcome", get(welcome_handler))
        .route("/webhook", post(webhook_handler))
        .route("/discord/events", post(discord_event_handler))
        .with_state(state.clone())
        .nest("/v1", api_v1::v1_router(state))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: vera_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let state = GatewayState::from_config(&config)?;
    if state.discord.is_none() {
        warn!("No Discord webhook URL configured; /webhook will only report the missing setting");
    }
    if state.verifier.is_enabled() {
        info!("Webhook signature validation enabled");
    }

    let app = build_router(Arc::new(state));

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn welcome_handler() -> Json<Welcome> {
    Json(welcome())
}

fn is_json_body(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"))
}

/// Reject the call when a secret is configured and the body signature does
/// not match.
fn check_signature(state: &GatewayState, headers: &HeaderMap, body: &[u8]) -> Result<(), StatusCode> {
    if !state.verifier.is_enabled() {
        return Ok(());
    }
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if state.verifier.validate_signature(body, signature) {
        Ok(())
    } else {
        warn!("Rejected webhook with missing or invalid signature");
        Err(StatusCode::UNAUTHORIZED)
    }
}

/// Inbound webhook: normalize, enrich, forward to Discord.
///
/// Always answers plain text; the Discord post is a side effect.
async fn webhook_handler(
    State(state): State<SharedState>,
    Query(metadata): Query<WebhookMetadata>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<String, StatusCode> {
    check_signature(&state, &headers, &body)?;

    let Some(discord) = state.discord.as_ref() else {
        return Ok(DISCORD_NOT_CONFIGURED.to_string());
    };

    let raw_body = String::from_utf8_lossy(&body);
    let inbound = vera_channels::normalize(&metadata, is_json_body(&headers), &raw_body);

    info!(
        message_len = inbound.request.message_text.len(),
        server = %inbound.request.server_id,
        "Webhook message received"
    );

    match state.pipeline.process(&inbound.request).await {
        Ok(response) => {
            discord
                .notify(
                    &response,
                    inbound.thread_id.as_deref(),
                    inbound.thread_name.as_deref(),
                )
                .await;
            Ok(response.render_text())
        }
        Err(e) => {
            error!(error = %e, "Pipeline processing failed");
            Ok(PROCESSING_FAILED.to_string())
        }
    }
}

/// Reply for a relayed Discord message event.
#[derive(Debug, Serialize, Deserialize)]
pub struct DiscordReply {
    pub reply: String,
}

/// Discord message event relayed from a gateway connection.
///
/// Answers `{reply}` with the text to post back, or 204 when nothing should
/// be sent: bot authors, an empty response, or a pipeline failure.
async fn discord_event_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, StatusCode> {
    check_signature(&state, &headers, &body)?;

    let message: ChannelMessage = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Malformed Discord message event");
        StatusCode::BAD_REQUEST
    })?;

    let Some(request) =
        vera_channels::request_from_message(&message, state.bot_user_id.as_deref())
    else {
        debug!(sender = %message.sender_id, "Ignoring bot-authored message");
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    info!(
        message_len = request.message_text.len(),
        server = %request.server_id,
        mentioned = request.is_mentioned,
        "Discord message received"
    );

    match state.pipeline.process(&request).await {
        Ok(response) => Ok(match vera_channels::render_reply(&response) {
            Some(reply) => Json(DiscordReply { reply }).into_response(),
            None => StatusCode::NO_CONTENT.into_response(),
        }),
        Err(e) => {
            error!(error = %e, "Pipeline processing failed");
            Ok(StatusCode::NO_CONTENT.into_response())
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::sync::Mutex;
    use tower::ServiceExt;

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn post_webhook(uri: &str, content_type: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    type Captured = Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>;

    /// A local Discord stand-in recording `(thread_id, payload)` pairs.
    async fn discord_stub() -> (String, Captured) {
        use axum::extract::Query as AxQuery;
        use std::collections::HashMap;

        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let sink = captured.clone();
        let app = Router::new().route(
            "/hook",
            post(
                move |AxQuery(q): AxQuery<HashMap<String, String>>,
                      Json(body): Json<serde_json::Value>| {
                    let sink = sink.clone();
                    async move {
                        sink.lock().unwrap().push((q.get("thread_id").cloned(), body));
                        StatusCode::NO_CONTENT
                    }
                },
            ),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/hook"), captured)
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = build_router(state(MockProvider::replying("hi")));

        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn welcome_endpoint() {
        let app = build_router(state(MockProvider::replying("hi")));

        let req = Request::builder().uri("/welcome").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["prompts"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn webhook_without_discord_asks_for_config() {
        let app = build_router(state(MockProvider::replying("hi")));

        let response = app
            .oneshot(post_webhook("/webhook", "text/plain", "hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, DISCORD_NOT_CONFIGURED);
    }

    #[tokio::test]
    async fn webhook_processes_and_notifies_discord() {
        let (hook_url, captured) = discord_stub().await;
        let gateway = GatewayState::new(pipeline(MockProvider::replying("Hello from Vera")))
            .with_discord(DiscordWebhook::new(hook_url, "Vera"));
        let app = build_router(Arc::new(gateway));

        let body = r#"{"content":"hello","author":{"id":"u1","username":"alice"},"thread_name":"Chat"}"#;
        let response = app
            .oneshot(post_webhook(
                "/webhook?serverId=s1&threadId=42",
                "application/json",
                body,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "Hello from Vera");

        let posts = captured.lock().unwrap().clone();
        assert_eq!(posts.len(), 1);
        let (thread_id, payload) = &posts[0];
        assert_eq!(thread_id.as_deref(), Some("42"));
        assert_eq!(payload["username"], "Vera");
        assert_eq!(payload["content"], "Hello from Vera");
        assert_eq!(payload["thread_name"], "Chat");
    }

    #[tokio::test]
    async fn webhook_pipeline_failure_is_generic() {
        let (hook_url, captured) = discord_stub().await;
        let gateway = GatewayState::new(pipeline(MockProvider::failing()))
            .with_discord(DiscordWebhook::new(hook_url, "Vera"));
        let app = build_router(Arc::new(gateway));

        let response = app
            .oneshot(post_webhook("/webhook", "text/plain", "hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, PROCESSING_FAILED);
        assert!(captured.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn webhook_rejects_bad_signature() {
        let gateway = GatewayState::new(pipeline(MockProvider::replying("hi")))
            .with_verifier(SignatureVerifier::new(Some("s3cret".into())));
        let app = build_router(Arc::new(gateway));

        let mut req = post_webhook("/webhook", "text/plain", "hello");
        req.headers_mut()
            .insert(SIGNATURE_HEADER, "sha256=00ff".parse().unwrap());
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(post_webhook("/webhook", "text/plain", "hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    fn discord_event(metadata: serde_json::Value, content: &str) -> Request<Body> {
        let event = serde_json::json!({
            "channel_id": "discord",
            "sender_id": "u1",
            "sender_name": "alice",
            "content": content,
            "chat_id": "c1",
            "metadata": metadata,
        });
        post_webhook("/discord/events", "application/json", &event.to_string())
    }

    #[tokio::test]
    async fn discord_event_replies_and_remembers() {
        let shared = Arc::new(
            GatewayState::new(pipeline(MockProvider::replying("Hey alice!")))
                .with_bot_user_id("bot-1"),
        );
        let app = build_router(shared.clone());

        let response = app
            .oneshot(discord_event(
                serde_json::json!({"guild_id": "g1", "guild_name": "Crabs", "mentions": ["bot-1"]}),
                "hello https://example.com",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let reply: DiscordReply = serde_json::from_str(&body_text(response).await).unwrap();
        // Mentioned, so a reply is generated even though the message has a link
        assert!(reply.reply.ends_with("Hey alice!"));

        let profile = shared.pipeline.memory().get_profile("g1", "u1").await.unwrap();
        assert_eq!(profile.user_name, "alice");
    }

    #[tokio::test]
    async fn discord_direct_message_uses_dm_server() {
        let shared = state(MockProvider::replying("hi"));
        let app = build_router(shared.clone());

        let response = app
            .oneshot(discord_event(serde_json::json!({}), "hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(shared.pipeline.memory().get_profile("dm", "u1").await.is_some());
    }

    #[tokio::test]
    async fn discord_bot_authors_and_failures_get_no_reply() {
        let shared = state(MockProvider::replying("hi"));
        let response = build_router(shared.clone())
            .oneshot(discord_event(serde_json::json!({"is_bot": true}), "hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(shared.pipeline.memory().get_profile("dm", "u1").await.is_none());

        let response = build_router(state(MockProvider::failing()))
            .oneshot(discord_event(serde_json::json!({}), "hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn discord_event_rejects_malformed_body() {
        let response = build_router(state(MockProvider::replying("hi")))
            .oneshot(post_webhook("/discord/events", "application/json", "{not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let app = build_router(state(MockProvider::replying("hi")));
        let big = "x".repeat(MAX_BODY_BYTES + 1);

        let response = app
            .oneshot(post_webhook("/webhook", "text/plain", &big))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
