//! Configuration for the enrichment pipeline.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning knobs for phase execution and row sequencing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Unique URLs a phase accumulates before it stops issuing queries.
    ///
    /// Default: 5.
    pub max_results_per_phase: usize,

    /// Hits requested from the gateway per query.
    ///
    /// Default: 5.
    pub results_per_query: usize,

    /// Character budget for the combined content sent to extraction,
    /// approximating a model context window.
    ///
    /// Default: 400,000.
    pub content_budget_chars: usize,

    /// Floor share each source keeps when content is trimmed.
    ///
    /// Default: 2,000.
    pub min_chars_per_source: usize,

    /// Results at or below this confidence are suppressed.
    ///
    /// Default: 0.3.
    pub confidence_threshold: f32,

    /// Try corroborated extraction first, falling back to flat.
    ///
    /// Default: true.
    pub prefer_corroboration: bool,

    /// Delay between rows in a batch (milliseconds).
    ///
    /// Default: 1,000.
    pub row_delay_ms: u64,

    /// Maximum `sourceContext` entries kept per field.
    ///
    /// Default: 3.
    pub max_sources_per_field: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_results_per_phase: 5,
            results_per_query: 5,
            content_budget_chars: 400_000,
            min_chars_per_source: 2_000,
            confidence_threshold: 0.3,
            prefer_corroboration: true,
            row_delay_ms: 1_000,
            max_sources_per_field: 3,
        }
    }
}

impl EnrichmentConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-phase unique URL cap.
    pub fn with_max_results_per_phase(mut self, max: usize) -> Self {
        self.max_results_per_phase = max;
        self
    }

    /// Set hits requested per query.
    pub fn with_results_per_query(mut self, limit: usize) -> Self {
        self.results_per_query = limit;
        self
    }

    /// Set the content budget and per-source floor.
    pub fn with_content_budget(mut self, budget: usize, min_per_source: usize) -> Self {
        self.content_budget_chars = budget;
        self.min_chars_per_source = min_per_source;
        self
    }

    /// Set the confidence threshold.
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Choose between corroborated-first and flat-only extraction.
    pub fn with_corroboration(mut self, prefer: bool) -> Self {
        self.prefer_corroboration = prefer;
        self
    }

    /// Set the delay between rows (milliseconds).
    pub fn with_row_delay_ms(mut self, ms: u64) -> Self {
        self.row_delay_ms = ms;
        self
    }

    /// Set the per-field source cap.
    pub fn with_max_sources_per_field(mut self, max: usize) -> Self {
        self.max_sources_per_field = max;
        self
    }

    pub fn row_delay(&self) -> Duration {
        Duration::from_millis(self.row_delay_ms)
    }

    /// Whether a confidence clears the threshold (strictly greater).
    pub fn accepts(&self, confidence: f32) -> bool {
        confidence > self.confidence_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EnrichmentConfig::default();
        assert_eq!(config.max_results_per_phase, 5);
        assert_eq!(config.content_budget_chars, 400_000);
        assert!(config.prefer_corroboration);
        assert_eq!(config.row_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_threshold_is_strict() {
        let config = EnrichmentConfig::default();
        assert!(!config.accepts(0.3));
        assert!(config.accepts(0.31));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EnrichmentConfig =
            serde_json::from_str(r#"{"row_delay_ms": 0, "prefer_corroboration": false}"#).unwrap();
        assert_eq!(config.row_delay_ms, 0);
        assert!(!config.prefer_corroboration);
        assert_eq!(config.results_per_query, 5);
    }
}
