//! Shared test doubles for pipeline stages.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use vera_core::error::{ExtractionError, ProviderError};
use vera_core::fetch::ContentFetcher;
use vera_core::knowledge::{AnnotatedDocument, ExtractOptions, KnowledgeLibrary};
use vera_core::message::Message;
use vera_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};

/// A provider answering from a script.
///
/// Routed answers (prompt contains a needle) win over the sequential queue.
/// When both are exhausted it answers `"ok"`.
pub struct ScriptedProvider {
    routes: Vec<(String, ProviderResponse)>,
    queue: Mutex<VecDeque<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
    fail: bool,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            routes: Vec::new(),
            queue: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A provider whose every call fails with a network error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    /// Answer `response` to any prompt containing `needle`.
    pub fn route(mut self, needle: &str, response: ProviderResponse) -> Self {
        self.routes.push((needle.to_string(), response));
        self
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Prompts seen so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| r.messages.iter().map(|m| m.content.as_str()).collect::<Vec<_>>().join("\n"))
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let prompt: String = request.messages.iter().map(|m| m.content.as_str()).collect();
        self.requests.lock().unwrap().push(request);

        if self.fail {
            return Err(ProviderError::Network("scripted failure".into()));
        }

        if let Some((_, response)) = self.routes.iter().find(|(needle, _)| prompt.contains(needle)) {
            return Ok(response.clone());
        }

        Ok(self
            .queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| text("ok")))
    }
}

/// A normal-stop response carrying `content`.
pub fn text(content: &str) -> ProviderResponse {
    finished(content, "STOP")
}

/// A response with an explicit finish reason.
pub fn finished(content: &str, reason: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(content),
        finish_reason: Some(reason.to_string()),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A fetcher serving canned bodies; unknown URLs are absent.
#[derive(Default)]
pub struct MockFetcher {
    pages: HashMap<String, String>,
    requested: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Option<String> {
        self.requested.lock().unwrap().push(url.to_string());
        self.pages.get(url).cloned()
    }
}

/// An extraction library answering from a fixed result.
pub struct StaticLibrary {
    result: Result<Vec<AnnotatedDocument>, String>,
    calls: Mutex<usize>,
}

impl StaticLibrary {
    pub fn documents(docs: Vec<AnnotatedDocument>) -> Self {
        Self {
            result: Ok(docs),
            calls: Mutex::new(0),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            result: Err(reason.to_string()),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl KnowledgeLibrary for StaticLibrary {
    fn name(&self) -> &str {
        "static"
    }

    async fn extract(
        &self,
        _text: &str,
        _options: &ExtractOptions,
    ) -> Result<Vec<AnnotatedDocument>, ExtractionError> {
        *self.calls.lock().unwrap() += 1;
        self.result
            .clone()
            .map_err(ExtractionError::Unavailable)
    }
}
