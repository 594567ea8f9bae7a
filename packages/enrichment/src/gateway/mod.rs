//! `RetrievalGateway` implementations.
//!
//! - [`FirecrawlGateway`] - Firecrawl search and scrape API (requires `firecrawl` feature)
//! - [`RetryingGateway`] - Bounded retry with backoff around any gateway

#[cfg(feature = "firecrawl")]
pub mod firecrawl;
pub mod retry;

#[cfg(feature = "firecrawl")]
pub use firecrawl::FirecrawlGateway;
pub use retry::{GatewayExt, RetryPolicy, RetryingGateway};
