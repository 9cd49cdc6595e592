//! Google Gemini native provider implementation.
//!
//! Uses the `generateContent` REST endpoint directly.
//!
//! Features:
//! - `x-goog-api-key` header authentication
//! - System prompt as top-level `systemInstruction`
//! - Sampling settings in `generationConfig`
//! - Finish reason passed through verbatim ("STOP", "MAX_TOKENS", "SAFETY", ...)

use async_trait::async_trait;
use vera_core::error::ProviderError;
use vera_core::message::{Message, Role};
use vera_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini `generateContent` provider.
pub struct GeminiProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a new Gemini provider.
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            name: "gemini".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Split system messages out; Gemini takes them as `systemInstruction`.
    fn to_api_contents(messages: &[Message]) -> (Option<GeminiContent>, Vec<GeminiContent>) {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => system_parts.push(GeminiPart {
                    text: msg.content.clone(),
                }),
                Role::User => contents.push(GeminiContent {
                    role: Some("user".into()),
                    parts: vec![GeminiPart {
                        text: msg.content.clone(),
                    }],
                }),
                Role::Assistant => contents.push(GeminiContent {
                    role: Some("model".into()),
                    parts: vec![GeminiPart {
                        text: msg.content.clone(),
                    }],
                }),
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: system_parts,
            })
        };

        (system, contents)
    }

    fn build_body(request: &ProviderRequest) -> GenerateRequest {
        let (system_instruction, contents) = Self::to_api_contents(&request.messages);
        GenerateRequest {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                temperature: request.temperature,
                top_p: request.top_p,
                max_output_tokens: request.max_tokens,
                stop_sequences: request.stop.clone(),
            },
        }
    }

    /// Turn a parsed API response into our response type.
    fn parse_response(api: GenerateResponse, requested_model: &str) -> ProviderResponse {
        let (text, finish_reason) = match api.candidates.into_iter().next() {
            Some(candidate) => {
                let text = candidate
                    .content
                    .map(|c| {
                        c.parts
                            .into_iter()
                            .map(|p| p.text)
                            .collect::<Vec<_>>()
                            .join("")
                    })
                    .unwrap_or_default();
                (text, candidate.finish_reason)
            }
            // A blocked prompt yields no candidates, only feedback
            None => (
                String::new(),
                api.prompt_feedback.and_then(|f| f.block_reason),
            ),
        };

        let usage = api.usage_metadata.map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        });

        ProviderResponse {
            message: Message::assistant(text),
            finish_reason,
            usage,
            model: api
                .model_version
                .unwrap_or_else(|| requested_model.to_string()),
        }
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "no API key for gemini".into(),
            ));
        }

        let url = format!("{}/models/{}:generateContent", self.base_url, request.model);
        let body = Self::build_body(&request);

        debug!(provider = %self.name, model = %request.model, "Sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Gemini returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: GenerateResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        Ok(Self::parse_response(api_response, &request.model))
    }
}

// --- Gemini API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop_sequences: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}
