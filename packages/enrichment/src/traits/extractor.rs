//! Extraction service: LLM-backed structured extraction against a field list.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::types::{field::EnrichmentField, phase::Phase, result::FieldResults};

/// What the extraction is about and how the phase wants it done.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionContext {
    /// Company the content should be about
    pub company_name: Option<String>,

    /// Company domain the content should be about
    pub domain: Option<String>,

    /// Phase issuing the request (None outside the phase pipeline)
    pub phase: Option<Phase>,

    /// Phase-specific instructions appended to the prompt
    pub instructions: String,

    /// Facts established without the LLM, presented as ground truth
    pub trusted_facts: Vec<String>,
}

impl ExtractionContext {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase: Some(phase),
            ..Default::default()
        }
    }

    pub fn with_company(mut self, company_name: Option<String>, domain: Option<String>) -> Self {
        self.company_name = company_name;
        self.domain = domain;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_trusted_facts(
        mut self,
        facts: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.trusted_facts = facts.into_iter().map(Into::into).collect();
        self
    }

    /// Name to present as the target: company name, else domain.
    pub fn target(&self) -> Option<&str> {
        self.company_name.as_deref().or(self.domain.as_deref())
    }
}

/// LLM-backed structured extraction.
///
/// # Contract
///
/// - Never invent a value absent from the provided content: return no
///   entry for that field instead.
/// - Results carry the URLs and quotes the model cited; the caller
///   validates them against what was actually retrieved.
/// - Post-hoc sanity checks (ranges, vocabularies) are applied by the caller.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    /// Flat mode: one value, confidence and cited sources per field.
    async fn extract(
        &self,
        content: &str,
        fields: &[EnrichmentField],
        context: &ExtractionContext,
    ) -> Result<FieldResults>;

    /// Corroborated mode: per-source evidence with a consensus value.
    ///
    /// Results carry `corroboration`.
    async fn extract_with_corroboration(
        &self,
        content: &str,
        fields: &[EnrichmentField],
        context: &ExtractionContext,
    ) -> Result<FieldResults>;

    /// Get the service name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}
