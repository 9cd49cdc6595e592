//! Content fetching — retrieval of linked pages as text.

use async_trait::async_trait;

/// Retrieves remote text for a URL.
///
/// The contract never fails: any status or transport problem is logged by
/// the implementation and reported as `None`.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Option<String>;
}
