//! Link fetcher — a single GET per URL, body returned as truncated text.

use async_trait::async_trait;
use tracing::{debug, warn};
use vera_core::error::FetchError;
use vera_core::fetch::ContentFetcher;
use vera_core::text::truncate_content;

/// Fetches linked pages over HTTP with a fixed `User-Agent`.
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            user_agent: user_agent.into(),
        }
    }

    pub fn from_config(config: &vera_config::AppConfig) -> Self {
        Self::new(&config.fetch.user_agent)
    }

    async fn try_fetch(&self, url: &str) -> Result<String, FetchError> {
        let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;

        let response = self
            .client
            .get(parsed)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| FetchError::Network {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(truncate_content(&body))
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Option<String> {
        match self.try_fetch(url).await {
            Ok(body) => {
                debug!(url, chars = body.chars().count(), "Fetched content");
                Some(body)
            }
            Err(e) => {
                warn!(url, error = %e, "Failed to fetch content");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, http::{HeaderMap, StatusCode}, routing::get};
    use vera_core::text::MAX_CONTENT_CHARS;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn returns_body_and_sends_user_agent() {
        let app = Router::new().route(
            "/page",
            get(|headers: HeaderMap| async move {
                let ua = headers
                    .get("user-agent")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                format!("agent={ua}")
            }),
        );
        let base = serve(app).await;

        let fetcher = HttpFetcher::new("vera-test/1.0");
        let body = fetcher.fetch(&format!("{base}/page")).await.unwrap();
        assert_eq!(body, "agent=vera-test/1.0");
    }

    #[tokio::test]
    async fn long_bodies_are_truncated() {
        let app = Router::new().route("/big", get(|| async { "q".repeat(MAX_CONTENT_CHARS * 2) }));
        let base = serve(app).await;

        let body = HttpFetcher::new("ua").fetch(&format!("{base}/big")).await.unwrap();
        assert_eq!(body.chars().count(), MAX_CONTENT_CHARS);
    }

    #[tokio::test]
    async fn error_status_is_absent() {
        let app = Router::new().route("/gone", get(|| async { (StatusCode::NOT_FOUND, "nope") }));
        let base = serve(app).await;

        assert!(HttpFetcher::new("ua").fetch(&format!("{base}/gone")).await.is_none());
    }

    #[tokio::test]
    async fn invalid_url_is_absent() {
        assert!(HttpFetcher::new("ua").fetch("not a url").await.is_none());
    }

    #[tokio::test]
    async fn unreachable_host_is_absent() {
        // Bind and immediately drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        assert!(HttpFetcher::new("ua").fetch(&format!("http://{addr}/")).await.is_none());
    }
}
