//! Firecrawl-backed retrieval gateway.
//!
//! Uses Firecrawl's `/v1/search` (with optional content scraping) and
//! `/v1/scrape` endpoints. Rendering and anti-bot handling happen on
//! Firecrawl's side.
//!
//! Requires the `firecrawl` feature to be enabled.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{GatewayResult, RetrievalError};
use crate::security::ServiceCredentials;
use crate::traits::gateway::RetrievalGateway;
use crate::types::retrieval::{RetrievalResult, ScrapedPage, SearchOptions};

const FIRECRAWL_API_URL: &str = "https://api.firecrawl.dev";

/// Search and scrape through the Firecrawl API.
///
/// Transient statuses surface as `RetrievalError::Status`; wrap with
/// `GatewayExt::with_retry` to retry them.
///
/// # Example
///
/// ```rust,ignore
/// use enrichment::gateway::{FirecrawlGateway, GatewayExt, RetryPolicy};
///
/// let gateway = FirecrawlGateway::from_env()?.with_retry(RetryPolicy::default());
/// let page = gateway.scrape_url("https://acme.io").await?;
/// ```
pub struct FirecrawlGateway {
    client: Client,
    credentials: ServiceCredentials,
}

// Request/Response types for the Firecrawl API

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    limit: usize,
    #[serde(rename = "scrapeOptions", skip_serializing_if = "Option::is_none")]
    scrape_options: Option<ScrapeOptions>,
}

impl<'a> SearchRequest<'a> {
    fn new(query: &'a str, options: &SearchOptions) -> Self {
        Self {
            query,
            limit: options.limit,
            scrape_options: options.scrape_content.then(|| ScrapeOptions {
                formats: vec!["markdown"],
            }),
        }
    }
}

#[derive(Serialize)]
struct ScrapeOptions {
    formats: Vec<&'static str>,
}

#[derive(Serialize)]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: Vec<&'static str>,
}

#[derive(Deserialize)]
struct SearchResponse {
    success: bool,
    #[serde(default)]
    data: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    markdown: Option<String>,
    html: Option<String>,
    metadata: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Deserialize)]
struct ScrapeResponse {
    success: bool,
    data: Option<ScrapeData>,
}

#[derive(Deserialize)]
struct ScrapeData {
    markdown: Option<String>,
    html: Option<String>,
    metadata: Option<PageMetadata>,
}

#[derive(Deserialize)]
struct PageMetadata {
    title: Option<String>,
}

impl FirecrawlGateway {
    /// Create a gateway with the given credentials.
    pub fn new(credentials: ServiceCredentials) -> GatewayResult<Self> {
        if credentials.api_key.is_empty() {
            return Err(RetrievalError::Config("Firecrawl API key is empty".into()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| RetrievalError::Http(Box::new(e)))?;

        Ok(Self {
            client,
            credentials,
        })
    }

    /// Create from environment variable `FIRECRAWL_API_KEY`.
    pub fn from_env() -> GatewayResult<Self> {
        let api_key = std::env::var("FIRECRAWL_API_KEY").map_err(|_| {
            RetrievalError::Config("FIRECRAWL_API_KEY environment variable not set".into())
        })?;
        Self::new(ServiceCredentials::new(api_key))
    }

    async fn post<T: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        subject: &str,
        body: &T,
    ) -> GatewayResult<R> {
        let url = format!(
            "{}{}",
            self.credentials.base_url_or(FIRECRAWL_API_URL),
            endpoint
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.credentials.api_key.expose())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RetrievalError::Timeout {
                        url: subject.to_string(),
                    }
                } else {
                    RetrievalError::Http(Box::new(e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::debug!(
                status = status.as_u16(),
                endpoint,
                body = %text,
                "Firecrawl error response"
            );
            return Err(RetrievalError::Status {
                status: status.as_u16(),
                url: subject.to_string(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| RetrievalError::Http(Box::new(e)))
    }
}

#[async_trait]
impl RetrievalGateway for FirecrawlGateway {
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> GatewayResult<Vec<RetrievalResult>> {
        let request = SearchRequest::new(query, options);

        let response: SearchResponse = self.post("/v1/search", query, &request).await?;
        if !response.success {
            return Err(RetrievalError::EmptyContent {
                url: format!("search:{}", query),
            });
        }

        let results = response
            .data
            .into_iter()
            .map(|hit| RetrievalResult {
                url: hit.url,
                title: hit.title.unwrap_or_default(),
                description: hit.description.unwrap_or_default(),
                markdown: hit.markdown,
                html: hit.html,
                metadata: hit.metadata.map(flatten_metadata),
            })
            .collect::<Vec<_>>();

        tracing::debug!(query, results = results.len(), "Firecrawl search");
        Ok(results)
    }

    async fn scrape_url(&self, url: &str) -> GatewayResult<ScrapedPage> {
        url::Url::parse(url).map_err(|_| RetrievalError::InvalidUrl {
            url: url.to_string(),
        })?;

        let request = ScrapeRequest {
            url,
            formats: vec!["markdown", "html"],
        };
        let response: ScrapeResponse = self.post("/v1/scrape", url, &request).await?;

        let data = response
            .data
            .filter(|_| response.success)
            .ok_or_else(|| RetrievalError::EmptyContent {
                url: url.to_string(),
            })?;

        if data.markdown.is_none() && data.html.is_none() {
            return Err(RetrievalError::EmptyContent {
                url: url.to_string(),
            });
        }

        Ok(ScrapedPage {
            url: url.to_string(),
            markdown: data.markdown,
            html: data.html,
            title: data.metadata.and_then(|m| m.title),
        })
    }

    fn name(&self) -> &str {
        "firecrawl"
    }
}

fn flatten_metadata(metadata: HashMap<String, serde_json::Value>) -> HashMap<String, String> {
    metadata
        .into_iter()
        .filter_map(|(key, value)| match value {
            serde_json::Value::String(s) => Some((key, s)),
            serde_json::Value::Number(n) => Some((key, n.to_string())),
            serde_json::Value::Bool(b) => Some((key, b.to_string())),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_is_rejected() {
        let result = FirecrawlGateway::new(ServiceCredentials::new(""));
        assert!(matches!(result, Err(RetrievalError::Config(_))));
    }

    #[test]
    fn test_search_request_shape() {
        let options = SearchOptions::new(5);
        let request = SearchRequest::new("\"acme.io\" company", &options);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["limit"], 5);
        assert_eq!(json["scrapeOptions"]["formats"][0], "markdown");

        let options = SearchOptions::new(3).without_content();
        let json = serde_json::to_value(SearchRequest::new("acme", &options)).unwrap();
        assert_eq!(json["limit"], 3);
        assert!(json.get("scrapeOptions").is_none());
    }

    #[test]
    fn test_search_response_parses_partial_hits() {
        let response: SearchResponse = serde_json::from_str(
            r#"{"success": true, "data": [
                {"url": "https://acme.io", "title": "Acme",
                 "metadata": {"statusCode": 200, "ogSiteName": "Acme"}},
                {"url": "https://acme.io/about"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(response.data.len(), 2);
        let metadata = flatten_metadata(response.data[0].metadata.clone().unwrap());
        assert_eq!(metadata.get("statusCode").map(String::as_str), Some("200"));
        assert_eq!(metadata.get("ogSiteName").map(String::as_str), Some("Acme"));
    }
}
