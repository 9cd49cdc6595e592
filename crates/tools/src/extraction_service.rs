//! Client for a LangExtract-compatible structured-extraction service.
//!
//! The service receives `{"text", "options"}` and answers with either one
//! annotated document or a list of them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use vera_core::error::ExtractionError;
use vera_core::knowledge::{AnnotatedDocument, ExtractOptions, KnowledgeLibrary};

/// HTTP-backed [`KnowledgeLibrary`].
pub struct HttpExtractionService {
    endpoint: String,
    default_model: Option<String>,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ExtractRequest<'a> {
    text: &'a str,
    options: &'a ExtractOptions,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExtractResponse {
    Many(Vec<AnnotatedDocument>),
    One(AnnotatedDocument),
}

impl HttpExtractionService {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            endpoint: endpoint.into(),
            default_model: None,
            client,
        }
    }

    /// Model sent when the caller's options name none.
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Build the service if `knowledge.library_url` is configured.
    pub fn from_config(config: &vera_config::AppConfig) -> Option<Self> {
        let url = config.knowledge.library_url.as_deref()?;
        let model = config
            .knowledge
            .library_model
            .clone()
            .unwrap_or_else(|| config.default_model.clone());
        Some(Self::new(url).with_default_model(model))
    }
}

#[async_trait]
impl KnowledgeLibrary for HttpExtractionService {
    fn name(&self) -> &str {
        "langextract"
    }

    async fn extract(
        &self,
        text: &str,
        options: &ExtractOptions,
    ) -> Result<Vec<AnnotatedDocument>, ExtractionError> {
        let mut options = options.clone();
        if options.model_id.is_none() {
            options.model_id = self.default_model.clone();
        }

        let response = self
            .client
            .post(&self.endpoint)
            .json(&ExtractRequest {
                text,
                options: &options,
            })
            .send()
            .await
            .map_err(|e| ExtractionError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::Failed(format!(
                "extraction service returned status {}",
                status.as_u16()
            )));
        }

        let parsed: ExtractResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::Failed(format!("malformed extraction response: {e}")))?;

        let documents = match parsed {
            ExtractResponse::Many(docs) => docs,
            ExtractResponse::One(doc) => vec![doc],
        };
        debug!(documents = documents.len(), "Extraction service answered");
        Ok(documents)
    }
}
