//! Post-extraction sanity checks.
//!
//! Extraction is trusted for provenance, not plausibility. These checks
//! demote implausible numbers and map funding stages onto a closed
//! vocabulary.

use regex::Regex;
use std::sync::LazyLock;

use super::categorize::contains_word;
use crate::types::field::{split_identifier, EnrichmentField, FieldType, FieldValue};
use crate::types::result::EnrichmentResult;

/// Confidence ceiling for values that fail a check.
pub const IMPLAUSIBLE_CAP: f32 = 0.3;

pub const MAX_EMPLOYEES: f64 = 1_000_000.0;
pub const MIN_FOUNDING_YEAR: i32 = 1800;

/// The closed funding-stage vocabulary.
pub const FUNDING_STAGES: &[&str] = &[
    "Pre-seed",
    "Seed",
    "Series A",
    "Series B",
    "Series C",
    "Series D",
    "Series E+",
    "IPO",
    "Acquired",
    "Bootstrapped",
    "Unknown",
];

static RE_SERIES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bseries\s+([a-z])\b").unwrap());

static RE_IPO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(ipo|publicly traded|public company|went public|nasdaq|nyse)\b").unwrap()
});

/// What kind of plausibility rule applies to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanityRule {
    EmployeeCount,
    FoundingYear,
    FundingStage,
}

/// Rule for `field`, if any.
///
/// Keywords match at word starts. The founding-year rule needs `year` in
/// the field name or a numeric field about founding; the funding-stage rule
/// needs a whole `stage` or `round` word in a string field.
pub fn rule_for(field: &EnrichmentField) -> Option<SanityRule> {
    let text = field.search_text();
    let has = |kw: &str| contains_word(&text, kw);
    let words: Vec<&str> = text.split_whitespace().collect();
    let name = split_identifier(&field.name);

    if has("employee") || has("headcount") || has("staff count") || has("staff size") {
        Some(SanityRule::EmployeeCount)
    } else if name.split_whitespace().any(|w| w == "year")
        || (field.field_type == FieldType::Number
            && (has("founded") || has("founding") || has("established")))
    {
        Some(SanityRule::FoundingYear)
    } else if field.field_type == FieldType::String
        && words
            .iter()
            .any(|w| matches!(w.trim_matches(|c: char| !c.is_alphanumeric()), "stage" | "round"))
    {
        Some(SanityRule::FundingStage)
    } else {
        None
    }
}

/// Apply the rule for `field` to `result` in place.
pub fn apply_sanity_checks(
    field: &EnrichmentField,
    result: &mut EnrichmentResult,
    current_year: i32,
) {
    match rule_for(field) {
        Some(SanityRule::EmployeeCount) => {
            if result.value.as_number().is_some_and(|n| n > MAX_EMPLOYEES) {
                tracing::debug!(
                    field = %field.name,
                    value = %result.value,
                    "Implausible employee count"
                );
                result.cap_confidence(IMPLAUSIBLE_CAP);
            }
        }
        Some(SanityRule::FoundingYear) => {
            let in_range = result.value.as_number().is_some_and(|year| {
                year >= MIN_FOUNDING_YEAR as f64 && year <= current_year as f64
            });
            if !in_range {
                tracing::debug!(
                    field = %field.name,
                    value = %result.value,
                    "Implausible founding year"
                );
                result.cap_confidence(IMPLAUSIBLE_CAP);
            }
        }
        Some(SanityRule::FundingStage) => {
            let Some(raw) = result.value.as_str() else {
                return;
            };
            let stage = normalize_funding_stage(raw);
            if stage == "Unknown" {
                result.cap_confidence(IMPLAUSIBLE_CAP);
            }
            result.value = FieldValue::String(stage.to_string());
        }
        None => {}
    }
}

/// Map free text onto [`FUNDING_STAGES`].
pub fn normalize_funding_stage(raw: &str) -> &'static str {
    let lower = raw.trim().to_lowercase();

    if lower.contains("acquired") || lower.contains("acquisition") {
        return "Acquired";
    }
    if RE_IPO.is_match(&lower) {
        return "IPO";
    }
    if let Some(caps) = RE_SERIES.captures(&lower) {
        return match caps.get(1).map(|m| m.as_str()) {
            Some("a") => "Series A",
            Some("b") => "Series B",
            Some("c") => "Series C",
            Some("d") => "Series D",
            _ => "Series E+",
        };
    }
    if lower.contains("pre-seed")
        || lower.contains("pre seed")
        || lower.contains("preseed")
        || lower.contains("angel")
    {
        return "Pre-seed";
    }
    if lower.contains("seed") {
        return "Seed";
    }
    if lower.contains("bootstrap") || lower.contains("self-funded") || lower.contains("self funded")
    {
        return "Bootstrapped";
    }
    "Unknown"
}
