//! Inbound webhook normalization.
//!
//! Turns an arbitrary HTTP POST (plain text or JSON, with optional query
//! metadata) into a [`PipelineRequest`], and optionally validates an
//! HMAC-SHA256 signature over the raw body.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;
use vera_core::pipeline::{
    DEFAULT_SERVER_ID, DEFAULT_SERVER_NAME, DEFAULT_USER_ID, DEFAULT_USER_NAME, PipelineRequest,
};

/// Metadata supplied alongside the body (query parameters).
/// Non-empty values win over anything found in the body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookMetadata {
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub server_id: Option<String>,
    pub server_name: Option<String>,
    pub thread_id: Option<String>,
    pub thread_name: Option<String>,
    pub mentioned: Option<String>,
}

/// A normalized inbound webhook call.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundWebhook {
    pub request: PipelineRequest,
    pub thread_id: Option<String>,
    pub thread_name: Option<String>,
}

/// Parse a JSON body, logging and returning `None` when malformed.
pub fn parse_json_body(raw_body: &str) -> Option<Value> {
    match serde_json::from_str(raw_body) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "Failed to parse JSON body");
            None
        }
    }
}

/// The message text of a webhook call.
///
/// A JSON string payload is the text itself; an object yields the first
/// present string among `content`, `text`, `message`, `data.content`,
/// `body` if it is non-empty. Anything else falls back to the raw body.
pub fn derive_message_text(payload: Option<&Value>, raw_body: &str) -> String {
    match payload {
        Some(Value::String(s)) => s.clone(),
        Some(obj @ Value::Object(_)) => {
            let candidate = ["content", "text", "message"]
                .iter()
                .map(|k| obj.get(*k))
                .chain([obj.pointer("/data/content"), obj.get("body")])
                .flatten()
                .find(|v| !v.is_null());

            match candidate.and_then(Value::as_str) {
                Some(text) if !text.is_empty() => text.to_string(),
                _ => raw_body.to_string(),
            }
        }
        _ => raw_body.to_string(),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(String::from)
}

fn body_str<'a>(payload: Option<&'a Value>, pointer: &str) -> Option<&'a str> {
    payload.and_then(|p| p.pointer(pointer)).and_then(Value::as_str)
}

fn is_truthy(flag: &str) -> bool {
    matches!(flag.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

/// Normalize one webhook call.
///
/// The body is parsed as JSON only when `is_json` is set. Identity fields
/// resolve metadata first, then body fields (`author.id`,
/// `author.username` / `author.name`, `server.id`, `server.name`,
/// `thread_id`, `thread_name`), then the defaults.
pub fn normalize(metadata: &WebhookMetadata, is_json: bool, raw_body: &str) -> InboundWebhook {
    let payload = if is_json { parse_json_body(raw_body) } else { None };
    let payload = payload.as_ref();

    let pick = |meta: &Option<String>, body: Option<&str>| {
        non_empty(meta.as_deref()).or_else(|| non_empty(body))
    };

    let user_id = pick(&metadata.user_id, body_str(payload, "/author/id"))
        .unwrap_or_else(|| DEFAULT_USER_ID.to_string());
    let user_name = pick(
        &metadata.user_name,
        body_str(payload, "/author/username").or_else(|| body_str(payload, "/author/name")),
    )
    .unwrap_or_else(|| DEFAULT_USER_NAME.to_string());
    let server_id = pick(&metadata.server_id, body_str(payload, "/server/id"))
        .unwrap_or_else(|| DEFAULT_SERVER_ID.to_string());
    let server_name = pick(&metadata.server_name, body_str(payload, "/server/name"))
        .unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string());

    let is_mentioned = metadata.mentioned.as_deref().is_some_and(is_truthy)
        || payload
            .and_then(|p| p.get("mentioned"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

    InboundWebhook {
        request: PipelineRequest::new(derive_message_text(payload, raw_body))
            .with_user(user_id, user_name)
            .with_server(server_id, server_name)
            .mentioned(is_mentioned),
        thread_id: pick(&metadata.thread_id, body_str(payload, "/thread_id")),
        thread_name: pick(&metadata.thread_name, body_str(payload, "/thread_name")),
    }
}

/// Validates inbound webhook signatures against a shared secret.
#[derive(Debug, Clone, Default)]
pub struct SignatureVerifier {
    shared_secret: Option<String>,
}

impl SignatureVerifier {
    /// `None` or an empty secret disables validation.
    pub fn new(shared_secret: Option<String>) -> Self {
        Self { shared_secret }
    }

    pub fn is_enabled(&self) -> bool {
        self.shared_secret.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Validate an HMAC-SHA256 signature against the shared secret.
    ///
    /// The expected format is a hex-encoded HMAC-SHA256 digest, e.g.:
    /// `sha256=<hex_digest>` or just `<hex_digest>`.
    ///
    /// Uses constant-time comparison to prevent timing attacks.
    pub fn validate_signature(&self, payload: &[u8], signature: &str) -> bool {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        type HmacSha256 = Hmac<Sha256>;

        match &self.shared_secret {
            None => true, // No secret configured = no validation
            Some(secret) if secret.is_empty() => true,
            Some(secret) => {
                let sig_hex = signature.strip_prefix("sha256=").unwrap_or(signature);

                let Ok(provided_bytes) = hex::decode(sig_hex) else {
                    return false;
                };

                let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
                    return false;
                };
                mac.update(payload);

                mac.verify_slice(&provided_bytes).is_ok()
            }
        }
    }
}
