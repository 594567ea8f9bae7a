//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the enrichment library
//! without making real retrieval or extraction calls.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use crate::error::{EnrichmentError, GatewayResult, Result, RetrievalError};
use crate::traits::extractor::{ExtractionContext, ExtractionService};
use crate::traits::gateway::RetrievalGateway;
use crate::types::field::EnrichmentField;
use crate::types::result::{Corroboration, EnrichmentResult, Evidence, FieldResults};
use crate::types::retrieval::{RetrievalResult, ScrapedPage, SearchOptions};

/// A mock retrieval gateway for testing.
///
/// Cheap to clone; clones share configuration and call history, so a test
/// can hand one clone to the code under test and assert on the other.
#[derive(Clone, Default)]
pub struct MockGateway {
    /// Predefined hits by exact query
    results: Arc<RwLock<HashMap<String, Vec<RetrievalResult>>>>,

    /// Hits for any query without an exact entry
    default_results: Arc<RwLock<Vec<RetrievalResult>>>,

    /// Predefined pages by URL
    pages: Arc<RwLock<HashMap<String, ScrapedPage>>>,

    /// Statuses returned by successive scrapes of a URL before it succeeds
    scrape_failures: Arc<RwLock<HashMap<String, VecDeque<u16>>>>,

    /// Queries that fail with the given status
    search_failures: Arc<RwLock<HashMap<String, u16>>>,

    panics: bool,

    /// Call tracking
    calls: Arc<RwLock<Vec<MockGatewayCall>>>,
}

/// Record of a call made to the mock gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum MockGatewayCall {
    Search { query: String, limit: usize },
    Scrape { url: String },
}

impl MockGateway {
    /// Create a new mock gateway that knows nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add predefined hits for a query.
    pub fn with_search_results(
        self,
        query: impl Into<String>,
        results: Vec<RetrievalResult>,
    ) -> Self {
        self.results.write().unwrap().insert(query.into(), results);
        self
    }

    /// Hits returned for any query without its own entry.
    pub fn with_default_results(self, results: Vec<RetrievalResult>) -> Self {
        *self.default_results.write().unwrap() = results;
        self
    }

    /// Add a predefined page with the given HTML.
    pub fn with_page(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.with_scraped_page(ScrapedPage::new(url).with_html(html))
    }

    /// Add a fully specified page.
    pub fn with_scraped_page(self, page: ScrapedPage) -> Self {
        self.pages.write().unwrap().insert(page.url.clone(), page);
        self
    }

    /// Fail successive scrapes of `url` with these statuses, in order.
    pub fn with_scrape_failures(
        self,
        url: impl Into<String>,
        statuses: impl IntoIterator<Item = u16>,
    ) -> Self {
        self.scrape_failures
            .write()
            .unwrap()
            .entry(url.into())
            .or_default()
            .extend(statuses);
        self
    }

    /// Fail every search for `query` with `status`.
    pub fn with_search_failure(self, query: impl Into<String>, status: u16) -> Self {
        self.search_failures.write().unwrap().insert(query.into(), status);
        self
    }

    /// Panic on every call, for exercising row isolation.
    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockGatewayCall> {
        self.calls.read().unwrap().clone()
    }

    /// Queries searched, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MockGatewayCall::Search { query, .. } => Some(query),
                MockGatewayCall::Scrape { .. } => None,
            })
            .collect()
    }

    pub fn search_calls(&self) -> usize {
        self.queries().len()
    }

    pub fn scrape_calls(&self) -> usize {
        self.total_calls() - self.search_calls()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl RetrievalGateway for MockGateway {
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> GatewayResult<Vec<RetrievalResult>> {
        self.calls.write().unwrap().push(MockGatewayCall::Search {
            query: query.to_string(),
            limit: options.limit,
        });
        if self.panics {
            panic!("mock gateway panic on search");
        }

        if let Some(status) = self.search_failures.read().unwrap().get(query) {
            return Err(RetrievalError::Status {
                status: *status,
                url: query.to_string(),
            });
        }

        let results = self
            .results
            .read()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_else(|| self.default_results.read().unwrap().clone());

        Ok(results.into_iter().take(options.limit).collect())
    }

    async fn scrape_url(&self, url: &str) -> GatewayResult<ScrapedPage> {
        self.calls
            .write()
            .unwrap()
            .push(MockGatewayCall::Scrape { url: url.to_string() });
        if self.panics {
            panic!("mock gateway panic on scrape");
        }

        let failure = self
            .scrape_failures
            .write()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front);
        if let Some(status) = failure {
            return Err(RetrievalError::Status {
                status,
                url: url.to_string(),
            });
        }

        self.pages
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| RetrievalError::Status {
                status: 404,
                url: url.to_string(),
            })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A mock extraction service for testing.
///
/// Answers every request with the predefined results for the requested
/// fields, ignoring the content. Corroborated calls attach one evidence
/// entry per source the result carries.
#[derive(Clone, Default)]
pub struct MockExtractor {
    /// Predefined results by field name
    results: Arc<RwLock<HashMap<String, EnrichmentResult>>>,

    fail_corroboration: bool,
    fail_flat: bool,

    /// Call tracking
    calls: Arc<RwLock<Vec<MockExtractorCall>>>,
}

/// Record of a call made to the mock extractor.
#[derive(Debug, Clone)]
pub enum MockExtractorCall {
    Flat {
        fields: Vec<String>,
        context: ExtractionContext,
        content_len: usize,
    },
    Corroborated {
        fields: Vec<String>,
        context: ExtractionContext,
        content_len: usize,
    },
}

impl MockExtractorCall {
    pub fn context(&self) -> &ExtractionContext {
        match self {
            Self::Flat { context, .. } | Self::Corroborated { context, .. } => context,
        }
    }
}

impl MockExtractor {
    /// Create a new mock extractor that finds nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predefined result, keyed by its field name.
    pub fn with_result(self, result: EnrichmentResult) -> Self {
        self.results
            .write()
            .unwrap()
            .insert(result.field.clone(), result);
        self
    }

    /// Make corroborated extraction fail.
    pub fn failing_corroboration(mut self) -> Self {
        self.fail_corroboration = true;
        self
    }

    /// Make flat extraction fail.
    pub fn failing_flat(mut self) -> Self {
        self.fail_flat = true;
        self
    }

    /// Get all calls made to this mock.
    pub fn calls_log(&self) -> Vec<MockExtractorCall> {
        self.calls.read().unwrap().clone()
    }

    /// Contexts passed in, in call order.
    pub fn contexts(&self) -> Vec<ExtractionContext> {
        self.calls_log().iter().map(|c| c.context().clone()).collect()
    }

    pub fn calls(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    pub fn flat_calls(&self) -> usize {
        self.calls_log()
            .iter()
            .filter(|c| matches!(c, MockExtractorCall::Flat { .. }))
            .count()
    }

    pub fn corroborated_calls(&self) -> usize {
        self.calls() - self.flat_calls()
    }

    fn answer(&self, fields: &[EnrichmentField]) -> FieldResults {
        let results = self.results.read().unwrap();
        fields
            .iter()
            .filter_map(|f| results.get(&f.name).map(|r| (f.name.clone(), r.clone())))
            .collect()
    }
}

fn mock_failure(mode: &str) -> EnrichmentError {
    EnrichmentError::Extraction(format!("mock {} extraction failure", mode).into())
}

#[async_trait]
impl ExtractionService for MockExtractor {
    async fn extract(
        &self,
        content: &str,
        fields: &[EnrichmentField],
        context: &ExtractionContext,
    ) -> Result<FieldResults> {
        self.calls.write().unwrap().push(MockExtractorCall::Flat {
            fields: fields.iter().map(|f| f.name.clone()).collect(),
            context: context.clone(),
            content_len: content.len(),
        });
        if self.fail_flat {
            return Err(mock_failure("flat"));
        }
        Ok(self.answer(fields))
    }

    async fn extract_with_corroboration(
        &self,
        content: &str,
        fields: &[EnrichmentField],
        context: &ExtractionContext,
    ) -> Result<FieldResults> {
        self.calls.write().unwrap().push(MockExtractorCall::Corroborated {
            fields: fields.iter().map(|f| f.name.clone()).collect(),
            context: context.clone(),
            content_len: content.len(),
        });
        if self.fail_corroboration {
            return Err(mock_failure("corroborated"));
        }

        Ok(self
            .answer(fields)
            .into_iter()
            .map(|(name, result)| {
                let evidence = result
                    .source_context
                    .iter()
                    .map(|s| Evidence {
                        value: result.value.clone(),
                        source_url: s.url.clone(),
                        exact_text: s.snippet.clone(),
                        confidence: result.confidence,
                    })
                    .collect();
                let result = result.with_corroboration(Corroboration {
                    evidence,
                    sources_agree: true,
                });
                (name, result)
            })
            .collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::field::{FieldType, FieldValue};
    use crate::types::phase::Phase;

    #[tokio::test]
    async fn test_mock_gateway_fallbacks() {
        let gateway = MockGateway::new()
            .with_search_results("acme", vec![RetrievalResult::new("https://acme.io")])
            .with_default_results(vec![RetrievalResult::new("https://other.io")]);

        let hits = gateway.search("acme", &SearchOptions::default()).await.unwrap();
        assert_eq!(hits[0].url, "https://acme.io");
        let hits = gateway.search("anything", &SearchOptions::default()).await.unwrap();
        assert_eq!(hits[0].url, "https://other.io");

        let err = gateway.scrape_url("https://missing.io").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(gateway.queries(), vec!["acme", "anything"]);
        assert_eq!(gateway.scrape_calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_extractor_answers_requested_fields_only() {
        let extractor = MockExtractor::new()
            .with_result(
                EnrichmentResult::new("industry", FieldValue::String("Aerospace".into()), 0.8)
                    .with_source("https://acme.io", "Aerospace"),
            )
            .with_result(EnrichmentResult::new("revenue", FieldValue::Number(1.0), 0.8));
        let fields = vec![EnrichmentField::new("industry", FieldType::String)];
        let ctx = ExtractionContext::new(Phase::Profile);

        let flat = extractor.extract("", &fields, &ctx).await.unwrap();
        assert_eq!(flat.len(), 1);
        assert!(flat["industry"].corroboration.is_none());

        let corroborated = extractor.extract_with_corroboration("", &fields, &ctx).await.unwrap();
        let corroboration = corroborated["industry"].corroboration.as_ref().unwrap();
        assert_eq!(corroboration.evidence[0].source_url, "https://acme.io");
        assert_eq!(extractor.flat_calls(), 1);
        assert_eq!(extractor.corroborated_calls(), 1);
        assert_eq!(extractor.contexts()[0].phase, Some(Phase::Profile));
    }
}
