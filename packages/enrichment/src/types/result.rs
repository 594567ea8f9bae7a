//! Enrichment outputs: per-field results and per-row results.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::field::FieldValue;

/// A retrieved URL plus the text in it that supports a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceContext {
    pub url: String,
    pub snippet: String,
}

/// One source's claim about a field, before consensus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub value: FieldValue,
    pub source_url: String,
    pub exact_text: String,
    pub confidence: f32,
}

/// Cross-source view of a field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Corroboration {
    pub evidence: Vec<Evidence>,
    pub sources_agree: bool,
}

/// Accepted value for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentResult {
    pub field: String,
    pub value: FieldValue,

    /// Confidence in [0, 1]
    pub confidence: f32,

    /// Comma-joined source URLs, kept for older consumers
    pub source: String,

    pub source_context: Vec<SourceContext>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corroboration: Option<Corroboration>,
}

impl EnrichmentResult {
    /// Create a result with no attached sources.
    pub fn new(field: impl Into<String>, value: FieldValue, confidence: f32) -> Self {
        Self {
            field: field.into(),
            value,
            confidence: confidence.clamp(0.0, 1.0),
            source: String::new(),
            source_context: Vec::new(),
            corroboration: None,
        }
    }

    /// Attach a source (builder pattern).
    pub fn with_source(mut self, url: impl Into<String>, snippet: impl Into<String>) -> Self {
        self.source_context.push(SourceContext {
            url: url.into(),
            snippet: snippet.into(),
        });
        self.sync_source();
        self
    }

    /// Attach corroboration data (builder pattern).
    pub fn with_corroboration(mut self, corroboration: Corroboration) -> Self {
        self.corroboration = Some(corroboration);
        self
    }

    /// Replace the source list and refresh the legacy `source` string.
    pub fn set_sources(&mut self, sources: Vec<SourceContext>) {
        self.source_context = sources;
        self.sync_source();
    }

    /// Lower the confidence to at most `cap`.
    pub fn cap_confidence(&mut self, cap: f32) {
        self.confidence = self.confidence.min(cap);
    }

    /// Source URLs in attachment order.
    pub fn source_urls(&self) -> Vec<&str> {
        self.source_context.iter().map(|s| s.url.as_str()).collect()
    }

    fn sync_source(&mut self) {
        self.source = self
            .source_context
            .iter()
            .map(|s| s.url.as_str())
            .collect::<Vec<_>>()
            .join(", ");
    }
}

/// Map of field name to accepted result, in requested-field order.
pub type FieldResults = IndexMap<String, EnrichmentResult>;

/// Lifecycle status of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    #[default]
    Pending,
    Skipped,
    Completed,
    Error,
}

/// An input row: its position plus the caller's original column values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub index: usize,
    pub data: IndexMap<String, String>,
}

impl Row {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            data: IndexMap::new(),
        }
    }

    /// Add a column value (builder pattern).
    pub fn with_column(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(column.into(), value.into());
        self
    }

    /// Non-empty value of `column`, trimmed.
    pub fn value(&self, column: &str) -> Option<&str> {
        self.data
            .get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Outcome of enriching one row.
///
/// Fields with no accepted value are absent from `enrichments`; callers
/// read absence as "not found".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowResult {
    pub row_index: usize,
    pub original_data: IndexMap<String, String>,
    pub enrichments: FieldResults,
    pub status: RowStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RowResult {
    /// A pending result for `row`.
    pub fn pending(row: &Row) -> Self {
        Self {
            row_index: row.index,
            original_data: row.data.clone(),
            enrichments: IndexMap::new(),
            status: RowStatus::Pending,
            error: None,
        }
    }

    pub fn completed(mut self, enrichments: FieldResults) -> Self {
        self.enrichments = enrichments;
        self.status = RowStatus::Completed;
        self
    }

    pub fn skipped(mut self, reason: impl Into<String>) -> Self {
        self.status = RowStatus::Skipped;
        self.error = Some(reason.into());
        self
    }

    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.status = RowStatus::Error;
        self.error = Some(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_source_updates_legacy_string() {
        let result = EnrichmentResult::new("companyName", FieldValue::String("Acme".into()), 0.9)
            .with_source("https://acme.io", "Welcome to Acme")
            .with_source("https://acme.io/about", "Acme builds rockets");

        assert_eq!(result.source, "https://acme.io, https://acme.io/about");
        assert_eq!(result.source_urls().len(), 2);
    }

    #[test]
    fn test_confidence_is_clamped_and_capped() {
        let mut result = EnrichmentResult::new("x", FieldValue::Number(1.0), 1.7);
        assert_eq!(result.confidence, 1.0);
        result.cap_confidence(0.3);
        assert_eq!(result.confidence, 0.3);
    }

    #[test]
    fn test_row_value_ignores_blank() {
        let row = Row::new(0)
            .with_column("email", "  jane@acme.io ")
            .with_column("note", "   ");
        assert_eq!(row.value("email"), Some("jane@acme.io"));
        assert_eq!(row.value("note"), None);
        assert_eq!(row.value("missing"), None);
    }

    #[test]
    fn test_row_result_serializes_camel_case() {
        let row = Row::new(3).with_column("email", "jane@acme.io");
        let result = RowResult::pending(&row).skipped("on skip list");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["rowIndex"], 3);
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["error"], "on skip list");
    }
}
