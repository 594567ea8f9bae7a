//! Field categorization: which phase researches which field.
//!
//! A priority-ordered rule table over each field's lower-cased
//! `name description` text. The first rule with a matching keyword wins;
//! fields no rule claims go to `General`.

use std::collections::BTreeMap;

use crate::types::{field::EnrichmentField, phase::Phase};

/// One categorization rule.
#[derive(Debug)]
pub struct CategoryRule {
    pub phase: Phase,
    pub keywords: &'static [&'static str],
}

/// Rules in priority order.
pub const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        phase: Phase::Discovery,
        keywords: &[
            "company name",
            "organization name",
            "business name",
            "website",
            "homepage",
            "company url",
            "description",
            "overview",
            "about",
        ],
    },
    CategoryRule {
        phase: Phase::Profile,
        keywords: &[
            "industry",
            "sector",
            "vertical",
            "location",
            "headquarter",
            "hq",
            "city",
            "country",
            "address",
            "founded",
            "founding",
            "established",
            "year",
        ],
    },
    CategoryRule {
        phase: Phase::Metrics,
        keywords: &[
            "employee",
            "headcount",
            "staff",
            "revenue",
            "arr",
            "company size",
            "team size",
            "size",
        ],
    },
    CategoryRule {
        phase: Phase::Funding,
        keywords: &[
            "funding",
            "invest",
            "valuation",
            "raised",
            "series",
            "round",
            "stage",
        ],
    },
    CategoryRule {
        phase: Phase::TechStack,
        keywords: &[
            "tech stack",
            "technology",
            "technologies",
            "framework",
            "programming language",
            "language",
            "github",
            "tools",
        ],
    },
];

/// Phase for a single field.
pub fn categorize_field(field: &EnrichmentField) -> Phase {
    let text = field.search_text();
    CATEGORY_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|kw| contains_word(&text, kw)))
        .map(|rule| rule.phase)
        .unwrap_or(Phase::General)
}

/// Partition `fields` into phase buckets, preserving field order within a
/// bucket. Only non-empty buckets are present.
pub fn categorize_fields(fields: &[EnrichmentField]) -> BTreeMap<Phase, Vec<EnrichmentField>> {
    let mut buckets: BTreeMap<Phase, Vec<EnrichmentField>> = BTreeMap::new();
    for field in fields {
        buckets
            .entry(categorize_field(field))
            .or_default()
            .push(field.clone());
    }
    buckets
}

/// Keyword match on word starts, so "arr" does not fire on "carrier" but
/// "employee" still matches "employees".
pub(crate) fn contains_word(text: &str, keyword: &str) -> bool {
    text.match_indices(keyword).any(|(idx, _)| {
        idx == 0
            || !text[..idx]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric())
    })
}
