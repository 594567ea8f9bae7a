//! Discovery: establish the company's identity.
//!
//! Tries the homepage first and reads identity straight from it. When the
//! homepage is unreachable or not a real company site, falls back to a
//! search waterfall, and finally to values inferred from the domain alone.

use regex::Regex;
use std::sync::LazyLock;

use super::generic::phase_instructions;
use super::{extract_from_pages, finalize_results, gather_results, PhaseContext, PhaseServices};
use crate::pipeline::attribution::find_occurrence;
use crate::pipeline::content::is_parked;
use crate::pipeline::email::{company_name_from_domain, domain_token};
use crate::pipeline::html::HtmlDocument;
use crate::types::field::{split_identifier, EnrichmentField, FieldType, FieldValue};
use crate::types::phase::Phase;
use crate::types::result::{EnrichmentResult, FieldResults};
use crate::types::retrieval::ScrapedPage;

/// Shortest homepage text accepted as a real site.
pub const HOMEPAGE_MIN_CHARS: usize = 200;

/// A real company site mentions at least one of these.
pub const LEGITIMACY_MARKERS: &[&str] = &[
    "about", "product", "service", "contact", "team", "company", "we ", "our ",
];

pub const PAGE_NAME_CONFIDENCE: f32 = 0.9;
pub const DOMAIN_NAME_CONFIDENCE: f32 = 0.5;
pub const WEBSITE_CONFIDENCE: f32 = 0.95;
pub const META_DESCRIPTION_CONFIDENCE: f32 = 0.85;
pub const ABOUT_DESCRIPTION_CONFIDENCE: f32 = 0.75;

pub const INFERRED_NAME_CONFIDENCE: f32 = 0.35;
pub const INFERRED_WEBSITE_CONFIDENCE: f32 = 0.7;
pub const INFERRED_DESCRIPTION_CONFIDENCE: f32 = 0.25;

/// Title segments that never name a company.
const GENERIC_TITLE_SEGMENTS: &[&str] = &[
    "home",
    "homepage",
    "home page",
    "official website",
    "official site",
    "welcome",
];

const LEGAL_SUFFIXES: &[&str] = &[" Inc", " LLC", " Ltd", " GmbH", " Limited"];

/// Fields naming one of these describe a profile elsewhere, not the company site.
const OTHER_PLATFORMS: &[&str] = &[
    "github",
    "linkedin",
    "twitter",
    "facebook",
    "instagram",
    "youtube",
    "tiktok",
    "crunchbase",
    "x",
];

/// Words that may accompany "name" in a company-name field.
const NAME_QUALIFIERS: &[&str] = &[
    "company",
    "organization",
    "org",
    "business",
    "brand",
    "legal",
    "official",
    "trading",
    "name",
];

/// Words that may accompany "url" in a website field.
const URL_QUALIFIERS: &[&str] = &["company", "official", "main", "primary", "web", "url"];

const OG_SITE_NAME: &str = r#"meta[property="og:site_name"]"#;
const META_DESCRIPTION: &str =
    r#"meta[name="description"], meta[property="og:description"]"#;

// =============================================================================
// Patterns
// =============================================================================

const NAME_WORD: &str = r"\p{Lu}[\p{L}\d&'\-]*";

static RE_WELCOME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i:welcome to)\s+({w}(?:\s+{w}){{0,3}})", w = NAME_WORD)).unwrap()
});

static RE_COPYRIGHT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        concat!(
            r"(?:©|\([cC]\)|(?i:copyright))\s*(?:(?i:copyright)\s*)?",
            r"(?:\d{{4}}(?:\s*[-–]\s*\d{{4}})?\s*,?\s*)?",
            r"({w}(?:\s+{w}){{0,3}})",
        ),
        w = NAME_WORD
    ))
    .unwrap()
});

static RE_IS_VERB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?m)(?:^|[.!?]\s+)({w}(?:\s+{w}){{0,2}})\s+(?:is|offers|provides|helps|builds|makes)\b",
        w = NAME_WORD
    ))
    .unwrap()
});

static RE_ABOUT_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^#{0,3}\s*",
        r"(?:about(?:\s+us)?|our\s+mission|mission|who\s+we\s+are|our\s+story)",
        r"\s*:?\s*$",
    ))
    .unwrap()
});

// =============================================================================
// Field slots
// =============================================================================

/// Identity fields Discovery can fill without the LLM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySlot {
    Name,
    Website,
    Description,
}

/// Slot a field fills, judged by its name alone.
///
/// Only string fields qualify, and fields about another platform's profile
/// (`githubUrl`, `linkedinName`) never do.
pub fn slot_for(field: &EnrichmentField) -> Option<IdentitySlot> {
    if field.field_type != FieldType::String {
        return None;
    }
    let name = split_identifier(&field.name);
    let words: Vec<&str> = name.split_whitespace().collect();
    let has = |w: &str| words.contains(&w);
    let only = |allowed: &[&str]| words.iter().all(|w| allowed.contains(w));

    if OTHER_PLATFORMS.iter().any(|&p| has(p)) {
        None
    } else if has("website")
        || has("homepage")
        || has("domain")
        || (has("url") && only(URL_QUALIFIERS))
    {
        Some(IdentitySlot::Website)
    } else if ["description", "overview", "about", "summary"].iter().any(|&k| has(k)) {
        Some(IdentitySlot::Description)
    } else if has("name") && only(NAME_QUALIFIERS) {
        Some(IdentitySlot::Name)
    } else {
        None
    }
}

// =============================================================================
// Runner
// =============================================================================

/// Run Discovery for `fields`, recording the resolved identity in `ctx`.
pub async fn run(
    fields: &[EnrichmentField],
    ctx: &mut PhaseContext,
    services: &PhaseServices<'_>,
) -> FieldResults {
    let Some(domain) = ctx.domain().map(str::to_string) else {
        tracing::debug!(row_index = ctx.row_index, "No company domain, skipping discovery");
        return FieldResults::new();
    };

    let homepage_url = format!("https://{}", domain);
    match services.gateway.scrape_url(&homepage_url).await {
        Ok(page) if is_valid_homepage(&page) => {
            tracing::info!(row_index = ctx.row_index, url = %homepage_url, "Homepage accepted");
            let results = from_homepage(fields, &domain, &page, ctx, services).await;
            ctx.homepage = Some(page);
            return results;
        }
        Ok(_) => {
            tracing::info!(
                row_index = ctx.row_index,
                url = %homepage_url,
                "Homepage rejected as placeholder"
            );
        }
        Err(e) => {
            tracing::warn!(
                row_index = ctx.row_index,
                url = %homepage_url,
                error = %e,
                "Homepage fetch failed"
            );
        }
    }

    from_search(fields, &domain, ctx, services).await
}

/// Whether a fetched homepage looks like a real company site.
pub fn is_valid_homepage(page: &ScrapedPage) -> bool {
    let text = page.text();
    if text.chars().count() < HOMEPAGE_MIN_CHARS {
        return false;
    }
    let title = page_title(page).unwrap_or_default();
    if is_parked(&title, &text) {
        return false;
    }
    let lower = text.to_lowercase();
    LEGITIMACY_MARKERS.iter().any(|marker| lower.contains(marker))
}

async fn from_homepage(
    fields: &[EnrichmentField],
    domain: &str,
    page: &ScrapedPage,
    ctx: &mut PhaseContext,
    services: &PhaseServices<'_>,
) -> FieldResults {
    let text = page.text();
    let name = extract_company_name(page, domain);
    if let Some(name) = &name {
        ctx.company_name = Some(name.value.clone());
    }
    let description = extract_description(page);

    let mut results = FieldResults::new();
    let mut remaining = Vec::new();
    for field in fields {
        let found = match slot_for(field) {
            Some(IdentitySlot::Name) => name.as_ref(),
            Some(IdentitySlot::Description) => description.as_ref(),
            Some(IdentitySlot::Website) => {
                let website = format!("https://{}", domain);
                let result = EnrichmentResult::new(
                    &field.name,
                    FieldValue::String(website.clone()),
                    WEBSITE_CONFIDENCE,
                )
                .with_source(&page.url, website);
                results.insert(field.name.clone(), result);
                continue;
            }
            None => None,
        };

        match found {
            Some(candidate) => {
                results.insert(field.name.clone(), candidate.to_result(&field.name, page, &text));
            }
            None => remaining.push(field.clone()),
        }
    }

    if !remaining.is_empty() {
        let pages = vec![page.clone().into_retrieval_result()];
        let context = ctx
            .extraction_context(Phase::Discovery)
            .with_instructions(phase_instructions(Phase::Discovery));
        let raw =
            extract_from_pages(services, Phase::Discovery, &pages, &remaining, &context).await;
        results.extend(finalize_results(
            services,
            Phase::Discovery,
            &remaining,
            raw,
            &pages,
        ));
    }

    results
}

/// Query waterfall used when the homepage is unusable.
pub fn waterfall_queries(domain: &str, company_guess: Option<&str>) -> Vec<String> {
    let token = domain_token(domain).unwrap_or_else(|| domain.to_string());
    let mut queries = vec![
        format!("\"{}\" company official website", domain),
        format!("site:{} about", domain),
    ];
    if let Some(guess) = company_guess {
        queries.push(format!("\"{}\"", guess));
    }
    queries.push(format!("{} company website about", token));
    queries.push(format!("email domain {} company information", domain));
    queries
}

async fn from_search(
    fields: &[EnrichmentField],
    domain: &str,
    ctx: &mut PhaseContext,
    services: &PhaseServices<'_>,
) -> FieldResults {
    let queries = waterfall_queries(domain, ctx.email_context.company_name_guess.as_deref());
    let pages = gather_results(services, Phase::Discovery, &queries).await;

    let mut results = if pages.is_empty() {
        FieldResults::new()
    } else {
        let context = ctx
            .extraction_context(Phase::Discovery)
            .with_instructions(phase_instructions(Phase::Discovery));
        let raw = extract_from_pages(services, Phase::Discovery, &pages, fields, &context).await;
        finalize_results(services, Phase::Discovery, fields, raw, &pages)
    };

    if results.is_empty() {
        tracing::info!(row_index = ctx.row_index, domain, "Nothing found, inferring from domain");
        return infer_from_domain(fields, domain);
    }

    for field in fields {
        match slot_for(field) {
            Some(IdentitySlot::Name) => {
                if let Some(name) = results.get(&field.name).and_then(|r| r.value.as_str()) {
                    ctx.company_name = Some(name.to_string());
                }
            }
            Some(IdentitySlot::Website) if !results.contains_key(&field.name) => {
                results.insert(
                    field.name.clone(),
                    EnrichmentResult::new(
                        &field.name,
                        FieldValue::String(format!("https://{}", domain)),
                        INFERRED_WEBSITE_CONFIDENCE,
                    ),
                );
            }
            _ => {}
        }
    }
    results
}

/// Low-confidence identity derived from the domain alone.
///
/// The website is structurally certain; name and description are guesses.
/// Inferred values carry no sources.
pub fn infer_from_domain(fields: &[EnrichmentField], domain: &str) -> FieldResults {
    let name = company_name_from_domain(domain).unwrap_or_else(|| domain.to_string());
    let mut results = FieldResults::new();
    for field in fields {
        let (value, confidence) = match slot_for(field) {
            Some(IdentitySlot::Name) => (name.clone(), INFERRED_NAME_CONFIDENCE),
            Some(IdentitySlot::Website) => {
                (format!("https://{}", domain), INFERRED_WEBSITE_CONFIDENCE)
            }
            Some(IdentitySlot::Description) => (
                format!("{} is the organization operating {}.", name, domain),
                INFERRED_DESCRIPTION_CONFIDENCE,
            ),
            None => continue,
        };
        results.insert(
            field.name.clone(),
            EnrichmentResult::new(&field.name, FieldValue::String(value), confidence),
        );
    }
    results
}

// =============================================================================
// Identity heuristics
// =============================================================================

/// A value read from the page plus the text it came from.
///
/// Values derived from the domain rather than the page carry no evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub value: String,
    pub evidence: Option<String>,
    pub confidence: f32,
}

impl Candidate {
    fn new(value: impl Into<String>, evidence: impl Into<String>, confidence: f32) -> Self {
        Self {
            value: value.into(),
            evidence: Some(evidence.into()),
            confidence,
        }
    }

    fn inferred(value: impl Into<String>, confidence: f32) -> Self {
        Self {
            value: value.into(),
            evidence: None,
            confidence,
        }
    }

    /// Result for `field`, citing `page` only when the page supports it.
    fn to_result(&self, field: &str, page: &ScrapedPage, text: &str) -> EnrichmentResult {
        let value = FieldValue::String(self.value.clone());
        let result = EnrichmentResult::new(field, value.clone(), self.confidence);
        let Some(evidence) = &self.evidence else {
            return result;
        };
        let snippet = find_occurrence(text, &value).unwrap_or_else(|| evidence.clone());
        result.with_source(&page.url, snippet)
    }
}

/// Company name cascade: `og:site_name`, then text patterns, then the
/// `<title>`, then the domain token.
///
/// Pattern and title candidates must share a prefix with the domain.
pub fn extract_company_name(page: &ScrapedPage, domain: &str) -> Option<Candidate> {
    let site_name = page
        .html
        .as_deref()
        .and_then(|html| HtmlDocument::parse(html).meta_content(OG_SITE_NAME))
        .map(|name| clean_name(&name))
        .filter(|name| !name.is_empty());
    if let Some(site_name) = site_name {
        let evidence = format!("og:site_name {}", site_name);
        return Some(Candidate::new(site_name, evidence, PAGE_NAME_CONFIDENCE));
    }

    let text = page.text();
    for pattern in [&*RE_WELCOME, &*RE_COPYRIGHT, &*RE_IS_VERB] {
        for caps in pattern.captures_iter(&text) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let name = clean_name(name.as_str());
            if shares_domain_prefix(&name, domain) {
                return Some(Candidate::new(name, whole.as_str(), PAGE_NAME_CONFIDENCE));
            }
        }
    }

    if let Some(title) = page_title(page) {
        if let Some(name) = name_from_title(&title, domain) {
            return Some(Candidate::new(name, title, PAGE_NAME_CONFIDENCE));
        }
    }

    company_name_from_domain(domain).map(|name| Candidate::inferred(name, DOMAIN_NAME_CONFIDENCE))
}

/// Meta description, else the paragraph under an About/Mission heading.
pub fn extract_description(page: &ScrapedPage) -> Option<Candidate> {
    let meta = page
        .html
        .as_deref()
        .and_then(|html| HtmlDocument::parse(html).meta_content(META_DESCRIPTION))
        .filter(|description| description.chars().count() >= 20);
    if let Some(description) = meta {
        return Some(Candidate::new(
            description.clone(),
            description,
            META_DESCRIPTION_CONFIDENCE,
        ));
    }

    let text = page.text();
    let mut lines = text.lines().map(str::trim);
    while let Some(line) = lines.next() {
        if !RE_ABOUT_HEADING.is_match(line) {
            continue;
        }
        if let Some(paragraph) = lines.by_ref().find(|l| !l.is_empty()) {
            if paragraph.chars().count() >= 40 && !paragraph.starts_with('#') {
                return Some(Candidate::new(paragraph, paragraph, ABOUT_DESCRIPTION_CONFIDENCE));
            }
        }
    }
    None
}

/// Title reported by the gateway, else the document's `<title>`.
fn page_title(page: &ScrapedPage) -> Option<String> {
    page.title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .or_else(|| HtmlDocument::parse(page.html.as_deref()?).title())
}

/// Best title segment naming the company, e.g. `Acme | Rockets` -> `Acme`.
pub fn name_from_title(title: &str, domain: &str) -> Option<String> {
    title
        .split(['|', '–', '—', '·', ':'])
        .flat_map(|segment| segment.split(" - "))
        .map(|segment| {
            let segment = segment.trim();
            let segment = segment
                .strip_prefix("Welcome to ")
                .or_else(|| segment.strip_prefix("welcome to "))
                .unwrap_or(segment);
            clean_name(segment)
        })
        .filter(|segment| !segment.is_empty())
        .filter(|segment| !GENERIC_TITLE_SEGMENTS.contains(&segment.to_lowercase().as_str()))
        .find(|segment| shares_domain_prefix(segment, domain))
}

fn clean_name(raw: &str) -> String {
    let mut name = raw
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | '!' | '-'))
        .to_string();
    for suffix in LEGAL_SUFFIXES {
        if let Some(stripped) = name.strip_suffix(suffix) {
            name = stripped.trim_end_matches(',').trim().to_string();
        }
    }
    name
}

/// Whether `candidate` starts like the domain's brand token.
///
/// Compares up to three leading alphanumeric characters, case-insensitive.
pub fn shares_domain_prefix(candidate: &str, domain: &str) -> bool {
    let Some(token) = domain_token(domain) else {
        return false;
    };
    let normalize = |s: &str| -> Vec<char> {
        s.chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect()
    };
    let candidate = normalize(candidate);
    let token = normalize(&token);
    let n = candidate.len().min(token.len()).min(3);
    n > 0 && candidate[..n] == token[..n]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::email::extract_email_context;
    use crate::testing::{MockExtractor, MockGateway};
    use crate::types::config::EnrichmentConfig;
    use crate::types::retrieval::RetrievalResult;

    fn homepage(html: &str) -> ScrapedPage {
        ScrapedPage::new("https://acme.io").with_html(html)
    }

    fn string_field(name: &str) -> EnrichmentField {
        EnrichmentField::new(name, FieldType::String)
    }

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

    const BODY: &str = "<p>Acme builds reusable rockets for small satellite operators. \
        Our team of engineers designs, tests and flies launch vehicles from our own pad. \
        Learn about our products and services, or contact us to book a launch window.</p>";

    #[test]
    fn test_name_from_og_site_name() {
        let page = homepage(&format!(
            r#"<html><head><meta property="og:site_name" content="Acme Rockets">
            <title>Home</title></head><body>{}</body></html>"#,
            BODY
        ));
        let name = extract_company_name(&page, "acme.io").unwrap();
        assert_eq!(name.value, "Acme Rockets");
        assert_eq!(name.confidence, PAGE_NAME_CONFIDENCE);
    }

    #[test]
    fn test_og_site_name_keeps_apostrophe() {
        let page = ScrapedPage::new("https://joespizza.com").with_html(
            r#"<meta content="Joe's Pizza" property="og:site_name"><p>Best slices in town.</p>"#,
        );
        let name = extract_company_name(&page, "joespizza.com").unwrap();
        assert_eq!(name.value, "Joe's Pizza");
    }

    #[test]
    fn test_name_from_patterns_requires_domain_prefix() {
        let page =
            homepage("<p>Welcome to Globex! © 2024 Acme Labs, Inc. All rights reserved.</p>");
        let name = extract_company_name(&page, "acme-labs.io").unwrap();
        assert_eq!(name.value, "Acme Labs");
    }

    #[test]
    fn test_name_from_title_then_domain() {
        assert_eq!(
            name_from_title("Home | Acme - Rockets for everyone", "acme.io").as_deref(),
            Some("Acme")
        );
        assert_eq!(name_from_title("Official Website", "acme.io"), None);

        let page = homepage("<html><head><title>Rockets</title></head><body>nothing</body></html>");
        let name = extract_company_name(&page, "acme.io").unwrap();
        assert_eq!(name.value, "Acme");
        assert_eq!(name.confidence, DOMAIN_NAME_CONFIDENCE);
        assert_eq!(name.evidence, None);
    }

    #[test]
    fn test_description_sources() {
        let page = homepage(
            r#"<meta name="description"
                content="Acme builds reusable rockets for small satellites.">"#,
        );
        let description = extract_description(&page).unwrap();
        assert_eq!(description.value, "Acme builds reusable rockets for small satellites.");

        let page = ScrapedPage::new("https://acme.io").with_markdown(
            "# Acme\n\n## About us\n\n\
             We design and fly reusable rockets for small satellite operators.",
        );
        let description = extract_description(&page).unwrap();
        assert!(description.value.starts_with("We design and fly"));
        assert_eq!(description.confidence, ABOUT_DESCRIPTION_CONFIDENCE);
    }

    #[test]
    fn test_homepage_validation() {
        assert!(is_valid_homepage(&homepage(&format!("<title>Acme</title>{}", BODY))));
        assert!(!is_valid_homepage(&homepage("<p>Acme</p>")));
        assert!(!is_valid_homepage(&homepage(&format!(
            "<title>acme.io is for sale</title>{} This domain is for sale.",
            BODY
        ))));
    }

    #[test]
    fn test_slot_uses_field_name_and_type() {
        let name = string_field("companyName")
            .with_description("Official company name as shown on their website");
        let employees = EnrichmentField::new("employeeCount", FieldType::Number)
            .with_description("Employees listed on the company website");

        assert_eq!(slot_for(&name), Some(IdentitySlot::Name));
        assert_eq!(slot_for(&employees), None);
        assert_eq!(slot_for(&string_field("githubUrl")), None);
        assert_eq!(slot_for(&string_field("linkedinName")), None);
        assert_eq!(slot_for(&string_field("logoUrl")), None);
        assert_eq!(slot_for(&string_field("ceoName")), None);
        assert_eq!(slot_for(&string_field("companyUrl")), Some(IdentitySlot::Website));
        assert_eq!(slot_for(&string_field("website")), Some(IdentitySlot::Website));
        assert_eq!(slot_for(&string_field("shortDescription")), Some(IdentitySlot::Description));
    }

    #[tokio::test]
    async fn test_homepage_fills_only_matching_slots() {
        let gateway = MockGateway::new().with_page(
            "https://acme.io",
            format!(
                r#"<head><meta property="og:site_name" content="Acme"></head><body>{}</body>"#,
                BODY
            ),
        );
        let extractor = MockExtractor::new();
        let config = EnrichmentConfig::default();
        let fields = vec![
            string_field("companyName")
                .with_description("Official company name as shown on their website"),
            EnrichmentField::new("employeeCount", FieldType::Number)
                .with_description("Employees listed on the company website"),
        ];
        let mut ctx = PhaseContext::new(0, extract_email_context("jane@acme.io").unwrap());

        let results = run(&fields, &mut ctx, &services(&gateway, &extractor, &config)).await;

        assert_eq!(results["companyName"].value, FieldValue::String("Acme".into()));
        assert!(!results.contains_key("employeeCount"));
        assert_eq!(extractor.calls(), 1);
        assert_eq!(gateway.search_calls(), 0);
    }

    #[tokio::test]
    async fn test_domain_derived_name_cites_nothing() {
        let body = "<title>Rockets</title><p>we make reusable rockets for small satellite \
            operators. our team of engineers designs, tests and flies launch vehicles from our \
            own pad. learn about our products and services, or contact us to book a launch window \
            for your next small satellite mission.</p>";
        let gateway = MockGateway::new().with_page("https://acme-labs.io", body);
        let extractor = MockExtractor::new();
        let config = EnrichmentConfig::default();
        let fields = vec![string_field("companyName"), string_field("website")];
        let mut ctx = PhaseContext::new(0, extract_email_context("jane@acme-labs.io").unwrap());

        let results = run(&fields, &mut ctx, &services(&gateway, &extractor, &config)).await;

        let name = &results["companyName"];
        assert_eq!(name.value, FieldValue::String("Acme Labs".into()));
        assert_eq!(name.confidence, DOMAIN_NAME_CONFIDENCE);
        assert!(name.source_context.is_empty());
        assert_eq!(results["website"].source_urls(), vec!["https://acme-labs.io"]);
    }

    #[tokio::test]
    async fn test_search_fallback_promotes_name_and_fills_website() {
        let gateway = MockGateway::new().with_default_results(vec![RetrievalResult::new(
            "https://news.io/acme-labs",
        )
        .with_title("Acme Labs raises seed")
        .with_markdown("Acme Labs builds reusable rockets for small satellites.")]);
        let extractor = MockExtractor::new().with_result(
            EnrichmentResult::new("companyName", FieldValue::String("Acme Labs".into()), 0.8)
                .with_source("https://news.io/acme-labs", "Acme Labs builds reusable rockets"),
        );
        let config = EnrichmentConfig::default();
        let fields = vec![string_field("companyName"), string_field("website")];
        let mut ctx = PhaseContext::new(0, extract_email_context("jane@acme.io").unwrap());

        let results = run(&fields, &mut ctx, &services(&gateway, &extractor, &config)).await;

        assert_eq!(ctx.company_name.as_deref(), Some("Acme Labs"));
        assert_eq!(results["companyName"].source_urls(), vec!["https://news.io/acme-labs"]);
        let website = &results["website"];
        assert_eq!(website.value, FieldValue::String("https://acme.io".into()));
        assert_eq!(website.confidence, INFERRED_WEBSITE_CONFIDENCE);
        assert!(website.source_context.is_empty());
        assert_eq!(gateway.scrape_calls(), 1);
    }

    #[test]
    fn test_infer_from_domain() {
        let fields = vec![
            string_field("companyName"),
            string_field("website"),
            string_field("description"),
        ];
        let results = infer_from_domain(&fields, "acme-labs.io");
        assert_eq!(results["companyName"].value, FieldValue::String("Acme Labs".into()));
        assert_eq!(results["companyName"].confidence, INFERRED_NAME_CONFIDENCE);
        assert_eq!(results["website"].value, FieldValue::String("https://acme-labs.io".into()));
        assert!(results["description"].confidence < 0.3);
        assert!(results.values().all(|r| r.source_context.is_empty()));
    }

    #[test]
    fn test_waterfall_order() {
        let queries = waterfall_queries("acme.io", Some("Acme"));
        assert_eq!(queries.len(), 5);
        assert_eq!(queries[0], "\"acme.io\" company official website");
        assert_eq!(queries[1], "site:acme.io about");
        assert_eq!(queries[2], "\"Acme\"");
    }
}
