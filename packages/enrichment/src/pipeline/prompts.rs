//! LLM prompts for field extraction.
//!
//! Both modes share one system prompt whose rules target fabrication:
//! values must come from the supplied text and be backed by an exact quote.

use crate::traits::extractor::ExtractionContext;
use crate::types::field::{EnrichmentField, FieldType};

/// System prompt shared by flat and corroborated extraction.
pub const SYSTEM_PROMPT: &str = r###"You extract facts about one company from web content.

Rules:
1. Use ONLY the provided content. Never use prior knowledge.
2. If a field's value is not stated in the content, return null for it. Never guess.
3. For every value, quote the exact source text that states it, and give the URL of the
   "## Source:" section the quote comes from. Quotes must be verbatim.
4. Only use URLs that appear in "## Source:" headers.
5. Ignore content about other companies with similar names.
6. Confidence: 0.9+ when stated explicitly on the company's own site, 0.6-0.8 when stated
   by a reputable third party, below 0.5 when the statement is indirect or dated."###;

/// User prompt for flat extraction.
pub const EXTRACT_PROMPT: &str = r###"Target company: {target}

{instructions_section}{facts_section}Fields to extract:
{fields}

For each field return its value, your confidence (0.0 to 1.0) and the sources that state it.

Content:
{content}"###;

/// User prompt for corroborated extraction.
pub const CORROBORATE_PROMPT: &str = r###"Target company: {target}

{instructions_section}{facts_section}Fields to extract:
{fields}

For each field, list one evidence entry per source that states a value: the value, the
source URL, the exact text, and your confidence in that source. Then give the value most
sources support as consensus_value. Sources that disagree must each get their own entry.

Content:
{content}"###;

/// Format the flat extraction prompt.
pub fn format_extract_prompt(
    content: &str,
    fields: &[EnrichmentField],
    context: &ExtractionContext,
) -> String {
    fill(EXTRACT_PROMPT, content, fields, context)
}

/// Format the corroborated extraction prompt.
pub fn format_corroborate_prompt(
    content: &str,
    fields: &[EnrichmentField],
    context: &ExtractionContext,
) -> String {
    fill(CORROBORATE_PROMPT, content, fields, context)
}

fn fill(
    template: &str,
    content: &str,
    fields: &[EnrichmentField],
    context: &ExtractionContext,
) -> String {
    let target = match (&context.company_name, &context.domain) {
        (Some(name), Some(domain)) => format!("{} ({})", name, domain),
        (Some(name), None) => name.clone(),
        (None, Some(domain)) => domain.clone(),
        (None, None) => "unknown".to_string(),
    };

    let instructions_section = if context.instructions.is_empty() {
        String::new()
    } else {
        format!("Instructions:\n{}\n\n", context.instructions)
    };

    let facts_section = if context.trusted_facts.is_empty() {
        String::new()
    } else {
        format!(
            "Verified facts (treat as ground truth):\n{}\n\n",
            context
                .trusted_facts
                .iter()
                .map(|f| format!("- {}", f))
                .collect::<Vec<_>>()
                .join("\n")
        )
    };

    template
        .replace("{target}", &target)
        .replace("{instructions_section}", &instructions_section)
        .replace("{facts_section}", &facts_section)
        .replace("{fields}", &format_fields(fields))
        .replace("{content}", content)
}

fn format_fields(fields: &[EnrichmentField]) -> String {
    fields
        .iter()
        .map(|f| {
            let kind = match f.field_type {
                FieldType::String => "text",
                FieldType::Number => "number",
                FieldType::Boolean => "true/false",
                FieldType::StringArray => "list of text",
            };
            if f.description.is_empty() {
                format!("- {} ({}): {}", f.name, kind, f.display_name)
            } else {
                format!("- {} ({}): {}", f.name, kind, f.description)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
