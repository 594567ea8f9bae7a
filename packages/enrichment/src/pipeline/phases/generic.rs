//! Generic phase template used by Profile, Metrics, Funding and General.

use super::{build_queries, extract_from_pages, finalize_results, gather_results};
use super::{PhaseContext, PhaseServices};
use crate::types::field::EnrichmentField;
use crate::types::phase::Phase;
use crate::types::result::FieldResults;

/// Search terms appended to domain and company-name queries.
pub fn phase_terms(phase: Phase) -> &'static str {
    match phase {
        Phase::Discovery => "company official website",
        Phase::Profile => "company profile industry headquarters founded",
        Phase::Metrics => "employees revenue company size",
        Phase::Funding => "funding round raised investors",
        Phase::TechStack => "tech stack engineering technologies",
        Phase::General => "company",
    }
}

/// Extraction guidance specific to each phase.
pub fn phase_instructions(phase: Phase) -> &'static str {
    match phase {
        Phase::Discovery => {
            "The company name is the organization's official name as it presents itself. \
             The description is one or two sentences on what the company does."
        }
        Phase::Profile => {
            "Industry is a short category such as \"Fintech\" or \"Logistics\". \
             Location means headquarters city and country. Founding year is a four-digit year."
        }
        Phase::Metrics => {
            "Employee counts and revenue must be figures stated in the content. \
             Prefer the most recent figure. \
             Do not estimate from ranges unless a range is the stated value."
        }
        Phase::Funding => {
            "Funding stage is the latest announced round (Pre-seed, Seed, Series A-E+, IPO, \
             Acquired, Bootstrapped). Amounts are totals raised as stated."
        }
        Phase::TechStack => {
            "List only technologies the company itself uses to build or run its product. \
             Do not list generic categories like \"software\" or \"cloud\"."
        }
        Phase::General => "Answer each field only from the content.",
    }
}

/// Run the generic template for `fields`.
///
/// Returns nothing when neither a company name nor a domain is known.
pub async fn run(
    phase: Phase,
    fields: &[EnrichmentField],
    ctx: &PhaseContext,
    services: &PhaseServices<'_>,
) -> FieldResults {
    if !ctx.has_target() {
        tracing::debug!(
            row_index = ctx.row_index,
            %phase,
            "No company or domain known, skipping phase"
        );
        return FieldResults::new();
    }

    let queries = build_queries(phase_terms(phase), fields, ctx.company_name(), ctx.domain());
    let pages = gather_results(services, phase, &queries).await;
    if pages.is_empty() {
        tracing::info!(row_index = ctx.row_index, %phase, "No usable search results");
        return FieldResults::new();
    }

    let context = ctx
        .extraction_context(phase)
        .with_instructions(phase_instructions(phase));
    let raw = extract_from_pages(services, phase, &pages, fields, &context).await;
    finalize_results(services, phase, fields, raw, &pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::email::extract_email_context;
    use crate::testing::{MockExtractor, MockGateway};
    use crate::types::config::EnrichmentConfig;
    use crate::types::field::{FieldType, FieldValue};
    use crate::types::result::EnrichmentResult;
    use crate::types::retrieval::RetrievalResult;

    fn services<'a>(
        gateway: &'a MockGateway,
        extractor: &'a MockExtractor,
        config: &'a EnrichmentConfig,
    ) -> PhaseServices<'a> {
        PhaseServices {
            gateway,
            extractor,
            config,
            current_year: 2026,
        }
    }

    #[tokio::test]
    async fn test_generic_phase_attributes_and_filters() {
        let gateway = MockGateway::new().with_search_results(
            "\"acme.io\" employees revenue company size",
            vec![RetrievalResult::new("https://acme.io/about")
                .with_title("About Acme")
                .with_markdown("Acme has 250 employees and $12M in revenue.")],
        );
        let extractor = MockExtractor::new()
            .with_result(
                EnrichmentResult::new("employeeCount", FieldValue::Number(250.0), 0.8)
                    .with_source("https://acme.io/about", "250 employees"),
            )
            .with_result(
                EnrichmentResult::new("revenue", FieldValue::Number(12_000_000.0), 0.25)
                    .with_source("https://acme.io/about", "$12M in revenue"),
            );
        let config = EnrichmentConfig::default();
        let fields = vec![
            EnrichmentField::new("employeeCount", FieldType::Number),
            EnrichmentField::new("revenue", FieldType::Number),
        ];
        let ctx = PhaseContext::new(0, extract_email_context("jane@acme.io").unwrap());

        let services = services(&gateway, &extractor, &config);
        let results = run(Phase::Metrics, &fields, &ctx, &services).await;

        assert_eq!(results.len(), 1);
        let employees = &results["employeeCount"];
        assert_eq!(employees.source_urls(), vec!["https://acme.io/about"]);
        assert!(gateway.search_calls() >= 1);
    }

    #[tokio::test]
    async fn test_no_target_means_no_calls() {
        let gateway = MockGateway::new();
        let extractor = MockExtractor::new();
        let config = EnrichmentConfig::default();
        let fields = vec![EnrichmentField::new("industry", FieldType::String)];
        let ctx = PhaseContext::new(0, extract_email_context("jane@gmail.com").unwrap());

        let services = services(&gateway, &extractor, &config);
        let results = run(Phase::Profile, &fields, &ctx, &services).await;
        assert!(results.is_empty());
        assert_eq!(gateway.search_calls(), 0);
        assert_eq!(extractor.calls(), 0);
    }

    #[tokio::test]
    async fn test_corroborated_failure_falls_back_to_flat() {
        let gateway = MockGateway::new().with_default_results(vec![RetrievalResult::new(
            "https://news.io/acme",
        )
        .with_markdown("Acme raised a Series A last spring.")]);
        let extractor = MockExtractor::new()
            .failing_corroboration()
            .with_result(
                EnrichmentResult::new("fundingStage", FieldValue::String("Series A".into()), 0.7)
                    .with_source("https://news.io/acme", "raised a Series A"),
            );
        let config = EnrichmentConfig::default();
        let fields = vec![EnrichmentField::new("fundingStage", FieldType::String)];
        let ctx = PhaseContext::new(0, extract_email_context("jane@acme.io").unwrap());

        let services = services(&gateway, &extractor, &config);
        let results = run(Phase::Funding, &fields, &ctx, &services).await;
        assert_eq!(results["fundingStage"].value, FieldValue::String("Series A".into()));
        assert_eq!(extractor.corroborated_calls(), 1);
        assert_eq!(extractor.flat_calls(), 1);
    }

    #[tokio::test]
    async fn test_both_extraction_modes_failing_yields_nothing() {
        let gateway = MockGateway::new().with_default_results(vec![RetrievalResult::new(
            "https://news.io/acme",
        )
        .with_markdown("Acme is headquartered in Duluth.")]);
        let extractor = MockExtractor::new()
            .failing_corroboration()
            .failing_flat()
            .with_result(
                EnrichmentResult::new("location", FieldValue::String("Duluth".into()), 0.9)
                    .with_source("https://news.io/acme", "headquartered in Duluth"),
            );
        let config = EnrichmentConfig::default();
        let fields = vec![EnrichmentField::new("location", FieldType::String)];
        let ctx = PhaseContext::new(0, extract_email_context("jane@acme.io").unwrap());

        let services = services(&gateway, &extractor, &config);
        let results = run(Phase::Profile, &fields, &ctx, &services).await;
        assert!(results.is_empty());
        assert_eq!(extractor.corroborated_calls(), 1);
        assert_eq!(extractor.flat_calls(), 1);
    }
}
