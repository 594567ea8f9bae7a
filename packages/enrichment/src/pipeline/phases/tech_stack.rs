//! TechStack: heuristic detection plus LLM extraction with a GitHub
//! whitelist.
//!
//! The homepage HTML is scanned for framework and vendor signatures before
//! any LLM call, and the findings are passed to extraction as trusted
//! facts. A GitHub-scoped search runs on its own; afterwards any GitHub URL
//! the model cites that this search did not return is stripped.

use std::collections::{BTreeSet, HashSet};

use super::generic::{phase_instructions, phase_terms};
use super::{build_queries, extract_from_pages, finalize_results, gather_results};
use super::{PhaseContext, PhaseServices};
use crate::pipeline::content::{clean_results, host_of, normalize_url};
use crate::pipeline::email::domain_token;
use crate::pipeline::tech_detect::{detect_technologies, filter_generic_terms};
use crate::types::field::{EnrichmentField, FieldType, FieldValue};
use crate::types::phase::Phase;
use crate::types::result::{EnrichmentResult, FieldResults};
use crate::types::retrieval::{RetrievalResult, ScrapedPage, SearchOptions};

/// Confidence for a value backed only by signature detection.
pub const HEURISTIC_CONFIDENCE: f32 = 0.6;

pub async fn run(
    fields: &[EnrichmentField],
    ctx: &PhaseContext,
    services: &PhaseServices<'_>,
) -> FieldResults {
    if !ctx.has_target() {
        tracing::debug!(
            row_index = ctx.row_index,
            "No company or domain known, skipping tech stack"
        );
        return FieldResults::new();
    }

    let homepage = fetch_homepage(ctx, services).await;
    let detected = homepage
        .as_ref()
        .and_then(|page| page.html.as_deref())
        .map(detect_technologies)
        .unwrap_or_default();
    if !detected.is_empty() {
        tracing::debug!(
            row_index = ctx.row_index,
            technologies = ?detected,
            "Detected from homepage markup"
        );
    }

    let github = github_search(ctx, services).await;
    let whitelist: HashSet<String> = github.iter().map(|r| normalize_url(&r.url)).collect();

    let queries = build_queries(
        phase_terms(Phase::TechStack),
        fields,
        ctx.company_name(),
        ctx.domain(),
    );
    let mut pages: Vec<RetrievalResult> = homepage
        .iter()
        .map(|page| page.clone().into_retrieval_result())
        .collect();
    pages.extend(gather_results(services, Phase::TechStack, &queries).await);
    pages.extend(github);
    let pages = clean_results(pages);

    let context = ctx
        .extraction_context(Phase::TechStack)
        .with_instructions(phase_instructions(Phase::TechStack))
        .with_trusted_facts(detected.iter().map(|t| format!("The website uses {}", t)));

    let mut raw = extract_from_pages(services, Phase::TechStack, &pages, fields, &context).await;
    for result in raw.values_mut() {
        strip_unlisted_github_sources(result, &whitelist);
        if let FieldValue::StringArray(items) = &result.value {
            result.value = FieldValue::StringArray(filter_generic_terms(items.clone()));
        }
    }
    raw.retain(|_, r| !r.value.is_empty());

    let mut results = finalize_results(services, Phase::TechStack, fields, raw, &pages);

    if let Some(page) = homepage.as_ref().filter(|_| !detected.is_empty()) {
        for field in fields.iter().filter(|f| is_stack_field(f)) {
            if !results.contains_key(&field.name) {
                results.insert(field.name.clone(), heuristic_result(field, &detected, page));
            }
        }
    }

    results
}

/// Homepage from Discovery, or a fresh fetch when Discovery did not run.
async fn fetch_homepage(
    ctx: &PhaseContext,
    services: &PhaseServices<'_>,
) -> Option<ScrapedPage> {
    if let Some(page) = &ctx.homepage {
        return Some(page.clone());
    }
    let url = format!("https://{}", ctx.domain()?);
    match services.gateway.scrape_url(&url).await {
        Ok(page) => Some(page),
        Err(e) => {
            tracing::warn!(
                row_index = ctx.row_index,
                url = %url,
                error = %e,
                "Homepage fetch for tech detection failed"
            );
            None
        }
    }
}

async fn github_search(
    ctx: &PhaseContext,
    services: &PhaseServices<'_>,
) -> Vec<RetrievalResult> {
    let Some(anchor) = ctx
        .company_name()
        .map(str::to_string)
        .or_else(|| ctx.domain().and_then(domain_token))
    else {
        return Vec::new();
    };

    let query = format!("\"{}\" site:github.com", anchor);
    let options = SearchOptions::new(services.config.results_per_query);
    match services.gateway.search(&query, &options).await {
        Ok(hits) => hits.into_iter().filter(|h| is_github(&h.url)).collect(),
        Err(e) => {
            tracing::warn!(
                row_index = ctx.row_index,
                query = %query,
                error = %e,
                "GitHub search failed"
            );
            Vec::new()
        }
    }
}

pub fn is_github(url: &str) -> bool {
    host_of(url).is_some_and(|h| {
        h == "github.com" || h.ends_with(".github.com") || h.ends_with(".github.io")
    })
}

/// Remove GitHub sources and evidence not returned by the GitHub search.
pub fn strip_unlisted_github_sources(
    result: &mut EnrichmentResult,
    whitelist: &HashSet<String>,
) {
    let listed = |url: &str| !is_github(url) || whitelist.contains(&normalize_url(url));

    let before = result.source_context.len();
    let kept: Vec<_> = result
        .source_context
        .drain(..)
        .filter(|s| listed(&s.url))
        .collect();
    if kept.len() < before {
        tracing::debug!(
            field = %result.field,
            stripped = before - kept.len(),
            "Stripped unlisted GitHub sources"
        );
    }
    result.set_sources(kept);

    if let Some(corroboration) = result.corroboration.as_mut() {
        corroboration.evidence.retain(|e| listed(&e.source_url));
    }
}

/// Fields that describe the technology stack as a whole.
pub fn is_stack_field(field: &EnrichmentField) -> bool {
    let text = field.search_text();
    ["stack", "technolog", "framework", "tools"]
        .iter()
        .any(|k| text.contains(k))
}

fn heuristic_result(
    field: &EnrichmentField,
    detected: &BTreeSet<String>,
    page: &ScrapedPage,
) -> EnrichmentResult {
    let items: Vec<String> = detected.iter().cloned().collect();
    let value = match field.field_type {
        FieldType::StringArray => FieldValue::StringArray(items.clone()),
        _ => FieldValue::String(items.join(", ")),
    };
    EnrichmentResult::new(&field.name, value, HEURISTIC_CONFIDENCE).with_source(
        &page.url,
        format!("Detected in page markup: {}", items.join(", ")),
    )
}
