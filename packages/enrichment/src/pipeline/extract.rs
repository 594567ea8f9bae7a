//! Extraction module - parse AI responses into field results.
//!
//! Flat responses map one-to-one onto `EnrichmentResult`s. Corroborated
//! responses carry per-source evidence; consensus is resolved here rather
//! than trusted from the model.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{EnrichmentError, Result};
use crate::types::field::{EnrichmentField, FieldValue};
use crate::types::result::{Corroboration, EnrichmentResult, Evidence, FieldResults, SourceContext};

/// Boost applied when independent URLs agree on the consensus value.
pub const AGREEMENT_BOOST: f32 = 0.1;

/// Ceiling for a boosted confidence.
pub const AGREEMENT_CAP: f32 = 0.95;

/// Multiplier applied when sources disagree.
pub const DISAGREEMENT_PENALTY: f32 = 0.8;

/// One field in a flat response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AIFlatField {
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub sources: Vec<AIQuote>,
}

/// A cited source in a flat response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AIQuote {
    pub url: String,
    #[serde(default)]
    pub quote: String,
}

/// One field in a corroborated response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AICorroboratedField {
    #[serde(default)]
    pub evidence: Vec<AIEvidence>,
    #[serde(default)]
    pub consensus_value: serde_json::Value,
}

/// One source's claim in a corroborated response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AIEvidence {
    #[serde(default)]
    pub value: serde_json::Value,
    pub source_url: String,
    #[serde(default)]
    pub exact_text: String,
    #[serde(default)]
    pub confidence: f32,
}

pub type AIFlatResponse = IndexMap<String, AIFlatField>;
pub type AICorroboratedResponse = IndexMap<String, AICorroboratedField>;

/// Parse a flat response body.
pub fn parse_flat_response(raw: &str) -> Result<AIFlatResponse> {
    parse_json(raw)
}

/// Parse a corroborated response body.
pub fn parse_corroborated_response(raw: &str) -> Result<AICorroboratedResponse> {
    parse_json(raw)
}

fn parse_json<T: for<'de> Deserialize<'de>>(raw: &str) -> Result<T> {
    let body = strip_code_fence(raw);
    serde_json::from_str(body).map_err(|e| EnrichmentError::Schema(e.to_string()))
}

/// Some models wrap JSON in a markdown fence even in structured mode.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// Turn a flat response into results, in requested-field order.
///
/// Fields the response omits, or whose value is null or cannot be coerced
/// to the field's type, are absent.
pub fn transform_flat_response(
    response: &AIFlatResponse,
    fields: &[EnrichmentField],
) -> FieldResults {
    let mut results = FieldResults::new();
    for field in fields {
        let Some(entry) = response.get(&field.name) else {
            continue;
        };
        let Some(value) = FieldValue::coerce(&entry.value, field.field_type) else {
            continue;
        };

        let mut result = EnrichmentResult::new(&field.name, value, entry.confidence);
        result.set_sources(
            entry
                .sources
                .iter()
                .filter(|s| !s.url.trim().is_empty())
                .map(|s| SourceContext {
                    url: s.url.trim().to_string(),
                    snippet: s.quote.clone(),
                })
                .collect(),
        );
        results.insert(field.name.clone(), result);
    }
    results
}

/// Turn a corroborated response into results, resolving consensus.
///
/// Evidence is grouped by [`FieldValue::agreement_key`]. The winning group
/// has the highest summed confidence (first appearance breaks ties). Its
/// best confidence is boosted when two or more distinct URLs back it and
/// penalized when any other group exists.
pub fn transform_corroborated_response(
    response: &AICorroboratedResponse,
    fields: &[EnrichmentField],
) -> FieldResults {
    let mut results = FieldResults::new();
    for field in fields {
        let Some(entry) = response.get(&field.name) else {
            continue;
        };

        let evidence: Vec<Evidence> = entry
            .evidence
            .iter()
            .filter(|e| !e.source_url.trim().is_empty())
            .filter_map(|e| {
                Some(Evidence {
                    value: FieldValue::coerce(&e.value, field.field_type)?,
                    source_url: e.source_url.trim().to_string(),
                    exact_text: e.exact_text.clone(),
                    confidence: e.confidence.clamp(0.0, 1.0),
                })
            })
            .collect();

        if let Some(result) = resolve_consensus(&field.name, evidence) {
            results.insert(field.name.clone(), result);
        }
    }
    results
}

/// Pick the consensus value from per-source evidence.
pub fn resolve_consensus(field: &str, evidence: Vec<Evidence>) -> Option<EnrichmentResult> {
    let mut groups: IndexMap<String, Vec<&Evidence>> = IndexMap::new();
    for e in &evidence {
        groups.entry(e.value.agreement_key()).or_default().push(e);
    }

    let mut winner: Option<(&Vec<&Evidence>, f32)> = None;
    for group in groups.values() {
        let score: f32 = group.iter().map(|e| e.confidence).sum();
        if winner.map_or(true, |(_, best)| score > best) {
            winner = Some((group, score));
        }
    }
    let (group, _) = winner?;

    let sources_agree = groups.len() == 1;
    let distinct_urls: HashSet<&str> = group.iter().map(|e| e.source_url.as_str()).collect();

    let mut confidence = group.iter().map(|e| e.confidence).fold(0.0_f32, f32::max);
    if distinct_urls.len() >= 2 && confidence < AGREEMENT_CAP {
        confidence = (confidence + AGREEMENT_BOOST).min(AGREEMENT_CAP);
    }
    if !sources_agree {
        confidence *= DISAGREEMENT_PENALTY;
    }

    let mut seen = HashSet::new();
    let sources = group
        .iter()
        .filter(|e| seen.insert(e.source_url.as_str()))
        .map(|e| SourceContext {
            url: e.source_url.clone(),
            snippet: e.exact_text.clone(),
        })
        .collect();

    let mut result = EnrichmentResult::new(field, group[0].value.clone(), confidence);
    result.set_sources(sources);
    Some(result.with_corroboration(Corroboration {
        evidence: evidence.clone(),
        sources_agree,
    }))
}
