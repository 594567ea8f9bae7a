//! Phase runners and the state they share for one row.
//!
//! Discovery and TechStack have their own runners; Profile, Metrics,
//! Funding and General use the generic template. Every runner degrades to
//! an empty result set instead of failing the row.

pub mod discovery;
pub mod generic;
pub mod tech_stack;

use std::collections::HashSet;

use super::attribution::attribute_sources;
use super::content::{clean_results, normalize_url, trim_content};
use super::email::domain_token;
use super::sanity::apply_sanity_checks;
use crate::traits::extractor::{ExtractionContext, ExtractionService};
use crate::traits::gateway::RetrievalGateway;
use crate::types::config::EnrichmentConfig;
use crate::types::email::EmailContext;
use crate::types::field::{split_identifier, EnrichmentField};
use crate::types::phase::Phase;
use crate::types::result::FieldResults;
use crate::types::retrieval::{RetrievalResult, ScrapedPage, SearchOptions};

/// Mutable accumulator threaded through the phases of one row.
///
/// Dropped when the row completes; nothing carries over between rows.
#[derive(Debug, Clone)]
pub struct PhaseContext {
    pub row_index: usize,
    pub email: String,
    pub email_context: EmailContext,

    /// Accepted results so far, first writer wins
    pub discovered: FieldResults,

    /// Company name confirmed by Discovery
    pub company_name: Option<String>,

    /// Homepage fetched by Discovery, reused by later phases
    pub homepage: Option<ScrapedPage>,
}

impl PhaseContext {
    pub fn new(row_index: usize, email_context: EmailContext) -> Self {
        Self {
            row_index,
            email: email_context.email.clone(),
            email_context,
            discovered: FieldResults::new(),
            company_name: None,
            homepage: None,
        }
    }

    /// Company domain, if the email belongs to one.
    pub fn domain(&self) -> Option<&str> {
        self.email_context.research_domain()
    }

    /// Confirmed company name, else the guess from the email domain.
    pub fn company_name(&self) -> Option<&str> {
        self.company_name
            .as_deref()
            .or(self.email_context.company_name_guess.as_deref())
    }

    /// Whether there is anything to research.
    pub fn has_target(&self) -> bool {
        self.domain().is_some() || self.company_name().is_some()
    }

    pub fn extraction_context(&self, phase: Phase) -> ExtractionContext {
        ExtractionContext::new(phase).with_company(
            self.company_name().map(str::to_string),
            self.domain().map(str::to_string),
        )
    }

    /// Merge phase results without overwriting earlier ones.
    ///
    /// Returns the names of fields that were newly added.
    pub fn merge(&mut self, results: FieldResults) -> Vec<String> {
        let mut added = Vec::new();
        for (name, result) in results {
            if !self.discovered.contains_key(&name) {
                added.push(name.clone());
                self.discovered.insert(name, result);
            }
        }
        added
    }
}

/// Collaborators and settings available to every phase.
pub struct PhaseServices<'a> {
    pub gateway: &'a dyn RetrievalGateway,
    pub extractor: &'a dyn ExtractionService,
    pub config: &'a EnrichmentConfig,
    pub current_year: i32,
}

// =============================================================================
// Shared steps
// =============================================================================

const QUERY_STOPWORDS: &[&str] = &[
    "company", "companys", "their", "they", "what", "which", "with", "from", "this", "that",
    "does", "have", "number", "name", "current", "main", "total", "about",
];

/// Up to three significant words from a field's name and description.
pub fn field_terms(field: &EnrichmentField) -> Vec<String> {
    let mut seen = HashSet::new();
    split_identifier(&field.name)
        .split_whitespace()
        .chain(field.description.split_whitespace())
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| w.chars().count() > 3 && !QUERY_STOPWORDS.contains(&w.as_str()))
        .filter(|w| seen.insert(w.clone()))
        .take(3)
        .collect()
}

/// Ranked queries: domain-qualified, then quoted company name, then one
/// term query per field. Duplicates are removed, order kept.
pub fn build_queries(
    phase_terms: &str,
    fields: &[EnrichmentField],
    company: Option<&str>,
    domain: Option<&str>,
) -> Vec<String> {
    let mut queries = Vec::new();
    if let Some(domain) = domain {
        queries.push(format!("\"{}\" {}", domain, phase_terms));
    }
    if let Some(company) = company {
        queries.push(format!("\"{}\" {}", company, phase_terms));
    }

    let anchor = company
        .map(str::to_string)
        .or_else(|| domain.and_then(domain_token));
    if let Some(anchor) = anchor {
        for field in fields {
            let terms = field_terms(field);
            if !terms.is_empty() {
                queries.push(format!("\"{}\" {}", anchor, terms.join(" ")));
            }
        }
    }

    let mut seen = HashSet::new();
    queries.retain(|q| seen.insert(q.to_lowercase()));
    queries
}

/// Issue `queries` in order until `max_results_per_phase` unique URLs are
/// collected, then drop duplicates and parked pages.
///
/// Failed queries are logged and skipped.
pub async fn gather_results(
    services: &PhaseServices<'_>,
    phase: Phase,
    queries: &[String],
) -> Vec<RetrievalResult> {
    let cap = services.config.max_results_per_phase;
    let options = SearchOptions::new(services.config.results_per_query);
    let mut seen = HashSet::new();
    let mut collected = Vec::new();

    for query in queries {
        if seen.len() >= cap {
            break;
        }
        match services.gateway.search(query, &options).await {
            Ok(hits) => {
                tracing::debug!(%phase, query = %query, hits = hits.len(), "Search complete");
                for hit in hits {
                    if seen.len() >= cap {
                        break;
                    }
                    if seen.insert(normalize_url(&hit.url)) {
                        collected.push(hit);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(%phase, query = %query, error = %e, "Search failed, continuing");
            }
        }
    }

    clean_results(collected)
}

/// Run extraction, corroborated first when configured, flat on failure.
///
/// Any remaining failure yields an empty result set.
pub async fn extract_with_fallback(
    services: &PhaseServices<'_>,
    phase: Phase,
    content: &str,
    fields: &[EnrichmentField],
    context: &ExtractionContext,
) -> FieldResults {
    if services.config.prefer_corroboration {
        match services
            .extractor
            .extract_with_corroboration(content, fields, context)
            .await
        {
            Ok(results) => return results,
            Err(e) => {
                tracing::warn!(
                    %phase,
                    error = %e,
                    "Corroborated extraction failed, falling back to flat"
                );
            }
        }
    }

    match services.extractor.extract(content, fields, context).await {
        Ok(results) => results,
        Err(e) => {
            tracing::warn!(%phase, error = %e, "Extraction failed, phase yields nothing");
            FieldResults::new()
        }
    }
}

/// Trim `pages` to the content budget and extract `fields` from them.
pub async fn extract_from_pages(
    services: &PhaseServices<'_>,
    phase: Phase,
    pages: &[RetrievalResult],
    fields: &[EnrichmentField],
    context: &ExtractionContext,
) -> FieldResults {
    if pages.is_empty() || fields.is_empty() {
        return FieldResults::new();
    }
    let content = trim_content(
        pages,
        services.config.content_budget_chars,
        services.config.min_chars_per_source,
    );
    extract_with_fallback(services, phase, &content, fields, context).await
}

/// Sanity checks, threshold and source attribution, in requested order.
///
/// Only requested fields survive; the threshold is checked again after
/// attribution since an unsupported value loses confidence.
pub fn finalize_results(
    services: &PhaseServices<'_>,
    phase: Phase,
    fields: &[EnrichmentField],
    mut results: FieldResults,
    pages: &[RetrievalResult],
) -> FieldResults {
    let config = services.config;
    let mut accepted = FieldResults::new();

    for field in fields {
        let Some(mut result) = results.shift_remove(&field.name) else {
            continue;
        };
        result.field = field.name.clone();

        apply_sanity_checks(field, &mut result, services.current_year);
        if !config.accepts(result.confidence) {
            tracing::debug!(
                %phase,
                field = %field.name,
                confidence = result.confidence,
                "Below threshold"
            );
            continue;
        }

        let dropped = attribute_sources(&mut result, pages, config.max_sources_per_field);
        if dropped > 0 {
            tracing::debug!(%phase, field = %field.name, dropped, "Dropped unverifiable sources");
        }
        if !config.accepts(result.confidence) {
            continue;
        }

        accepted.insert(field.name.clone(), result);
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::email::extract_email_context;
    use crate::testing::{MockExtractor, MockGateway};
    use crate::types::field::{FieldType, FieldValue};
    use crate::types::result::EnrichmentResult;

    #[test]
    fn test_field_terms() {
        let field = EnrichmentField::new("employeeCount", FieldType::Number)
            .with_description("Total number of full-time employees");
        assert_eq!(field_terms(&field), vec!["employee", "count", "full-time"]);
    }

    #[test]
    fn test_build_queries_order() {
        let fields = vec![EnrichmentField::new("fundingStage", FieldType::String)];
        let queries =
            build_queries("funding raised investors", &fields, Some("Acme"), Some("acme.io"));
        assert_eq!(
            queries,
            vec![
                "\"acme.io\" funding raised investors",
                "\"Acme\" funding raised investors",
                "\"Acme\" funding stage",
            ]
        );
    }

    #[tokio::test]
    async fn test_gather_skips_failed_query_and_caps_urls() {
        let gateway = MockGateway::new()
            .with_search_failure("first", 500)
            .with_search_results(
                "second",
                vec![
                    RetrievalResult::new("https://acme.io/a").with_markdown("Acme A"),
                    RetrievalResult::new("https://www.acme.io/a/").with_markdown("Acme A again"),
                    RetrievalResult::new("https://acme.io/b").with_markdown("Acme B"),
                ],
            )
            .with_default_results(vec![RetrievalResult::new("https://acme.io/c")]);
        let extractor = MockExtractor::new();
        let config = EnrichmentConfig::default().with_max_results_per_phase(2);
        let services = PhaseServices {
            gateway: &gateway,
            extractor: &extractor,
            config: &config,
            current_year: 2026,
        };
        let queries = vec!["first".to_string(), "second".to_string(), "third".to_string()];

        let results = gather_results(&services, Phase::General, &queries).await;

        let urls: Vec<&str> = results.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://acme.io/a", "https://acme.io/b"]);
        assert_eq!(gateway.queries(), vec!["first", "second"]);
    }

    #[test]
    fn test_merge_never_overwrites() {
        let mut ctx = PhaseContext::new(0, extract_email_context("jane@acme.io").unwrap());
        let mut first = FieldResults::new();
        first.insert(
            "companyName".into(),
            EnrichmentResult::new("companyName", FieldValue::String("Acme".into()), 0.9),
        );
        assert_eq!(ctx.merge(first), vec!["companyName"]);

        let mut second = FieldResults::new();
        second.insert(
            "companyName".into(),
            EnrichmentResult::new("companyName", FieldValue::String("Other".into()), 0.99),
        );
        assert!(ctx.merge(second).is_empty());
        assert_eq!(
            ctx.discovered["companyName"].value,
            FieldValue::String("Acme".into())
        );
    }

    #[test]
    fn test_company_name_prefers_confirmed() {
        let mut ctx = PhaseContext::new(0, extract_email_context("jane@acme-labs.io").unwrap());
        assert_eq!(ctx.company_name(), Some("Acme Labs"));
        ctx.company_name = Some("ACME Laboratories".into());
        assert_eq!(ctx.company_name(), Some("ACME Laboratories"));
    }

    #[test]
    fn test_personal_email_has_no_target() {
        let ctx = PhaseContext::new(0, extract_email_context("jane@gmail.com").unwrap());
        assert!(!ctx.has_target());
    }
}
