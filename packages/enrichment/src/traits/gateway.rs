//! Retrieval gateway: web search and direct page fetch.

use async_trait::async_trait;

use crate::error::GatewayResult;
use crate::types::retrieval::{RetrievalResult, ScrapedPage, SearchOptions};

/// Search and direct-fetch of web content.
///
/// Implementations are stateless and reusable across rows.
///
/// # Implementations
///
/// - `FirecrawlGateway` - Firecrawl search and scrape API
/// - `RetryingGateway` - Wrapper that retries transient HTTP statuses
/// - `MockGateway` - For testing
#[async_trait]
pub trait RetrievalGateway: Send + Sync {
    /// Search the web for `query`.
    ///
    /// With `options.scrape_content`, hits carry page markdown.
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> GatewayResult<Vec<RetrievalResult>>;

    /// Fetch a single URL directly.
    async fn scrape_url(&self, url: &str) -> GatewayResult<ScrapedPage>;

    /// Get the gateway name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}
