//! Single-prompt text generation with fixed sampling settings.

use std::sync::Arc;

use tracing::{debug, warn};
use vera_core::error::{Error, ProviderError};
use vera_core::message::Message;
use vera_core::provider::{Provider, ProviderRequest};

/// Returned when the backend produced no text.
pub const EMPTY_COMPLETION: &str = "I could not craft a response just now.";

/// Text returned when generation ended for a reason other than a normal stop.
pub fn unfinished_completion(reason: &str) -> String {
    format!("I could not craft a response (finish reason: {reason}).")
}

/// Turns prompts into text through one provider.
#[derive(Clone)]
pub struct Generator {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

impl Generator {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.8,
            top_p: 0.9,
            max_output_tokens: 512,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, top_p: f32, max_output_tokens: u32) -> Self {
        self.temperature = temperature;
        self.top_p = top_p;
        self.max_output_tokens = max_output_tokens;
        self
    }

    /// Build the configured provider. Fails when no API key is available for it.
    pub fn from_config(config: &vera_config::AppConfig) -> Result<Self, Error> {
        if !config.has_api_key() {
            return Err(Error::Config {
                message: format!(
                    "no API key for provider '{}' (set api_key in config.toml or VERA_API_KEY / GOOGLE_API_KEY)",
                    config.default_provider
                ),
            });
        }

        let provider = vera_providers::build_from_config(config)
            .default()
            .ok_or_else(|| Error::Config {
                message: format!("provider '{}' could not be built", config.default_provider),
            })?;

        Ok(Self::new(provider, &config.default_model).with_sampling(
            config.temperature,
            config.top_p,
            config.max_output_tokens,
        ))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Generate text for one prompt.
    ///
    /// A non-stop finish reason or an empty completion is replaced with a
    /// placeholder sentence; transport and API errors are returned.
    pub async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![Message::user(prompt)],
            temperature: self.temperature,
            top_p: Some(self.top_p),
            max_tokens: Some(self.max_output_tokens),
            stop: Vec::new(),
        };

        let response = self.provider.complete(request).await?;

        if !response.finished_normally() {
            let reason = response.finish_reason.as_deref().unwrap_or("unknown");
            warn!(provider = self.provider.name(), reason, "Generation did not finish normally");
            return Ok(unfinished_completion(reason));
        }

        if response.message.content.trim().is_empty() {
            debug!(provider = self.provider.name(), "Generation returned no text");
            return Ok(EMPTY_COMPLETION.to_string());
        }

        Ok(response.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ScriptedProvider, finished, text};

    #[tokio::test]
    async fn normal_stop_returns_text() {
        let provider = Arc::new(ScriptedProvider::new(vec![text("hi there")]));
        let generator = Generator::new(provider.clone(), "m");
        assert_eq!(generator.generate("hello").await.unwrap(), "hi there");

        let request = &provider.requests()[0];
        assert_eq!(request.max_tokens, Some(512));
        assert_eq!(request.top_p, Some(0.9));
        assert_eq!(request.messages[0].content, "hello");
    }

    #[tokio::test]
    async fn other_finish_reason_is_reported() {
        let provider = Arc::new(ScriptedProvider::new(vec![finished("partial", "MAX_TOKENS")]));
        let out = Generator::new(provider, "m").generate("x").await.unwrap();
        assert_eq!(out, "I could not craft a response (finish reason: MAX_TOKENS).");
    }

    #[tokio::test]
    async fn empty_completion_is_replaced() {
        let provider = Arc::new(ScriptedProvider::new(vec![text("")]));
        let out = Generator::new(provider, "m").generate("x").await.unwrap();
        assert_eq!(out, EMPTY_COMPLETION);
    }

    #[tokio::test]
    async fn provider_errors_propagate() {
        let provider = Arc::new(ScriptedProvider::failing());
        let err = Generator::new(provider, "m").generate("x").await.unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
    }

    #[test]
    fn from_config_requires_key() {
        let config = vera_config::AppConfig::default();
        assert!(matches!(Generator::from_config(&config), Err(Error::Config { .. })));

        let config = vera_config::AppConfig {
            api_key: Some("k".into()),
            ..vera_config::AppConfig::default()
        };
        let generator = Generator::from_config(&config).unwrap();
        assert_eq!(generator.provider_name(), "gemini");
        assert_eq!(generator.model(), "gemini-2.0-flash");
    }
}
