//! Enrichment pipeline - the core of the library.
//!
//! The pipeline orchestrates, per row:
//! - Email context (company domain vs. personal mailbox)
//! - Field categorization into phases
//! - Retrieval, cleaning and content trimming
//! - Extraction, corroborated first with a flat fallback
//! - Sanity checks and source attribution
//! - Result formatting

pub mod attribution;
pub mod categorize;
pub mod content;
pub mod email;
pub mod extract;
pub mod formatter;
pub mod html;
pub mod orchestrator;
pub mod phases;
pub mod progress;
pub mod prompts;
pub mod sanity;
pub mod schema;
pub mod tech_detect;

pub use attribution::{attribute_sources, find_occurrence, value_matches};
pub use categorize::{categorize_field, categorize_fields, CategoryRule, CATEGORY_RULES};
pub use content::{clean_results, is_blocked_platform, is_parked, normalize_url, trim_content};
pub use email::{company_name_from_domain, extract_email_context, is_personal_domain};
pub use extract::{
    parse_corroborated_response, parse_flat_response, resolve_consensus,
    transform_corroborated_response, transform_flat_response, AICorroboratedResponse,
    AIFlatResponse,
};
pub use formatter::format_results;
pub use orchestrator::Orchestrator;
pub use phases::{PhaseContext, PhaseServices};
pub use progress::{ProgressEvent, ProgressHandler};
pub use prompts::{
    format_corroborate_prompt, format_extract_prompt, CORROBORATE_PROMPT, EXTRACT_PROMPT,
    SYSTEM_PROMPT,
};
pub use sanity::{apply_sanity_checks, normalize_funding_stage};
pub use schema::{corroborated_response_schema, flat_response_schema};
pub use tech_detect::{detect_technologies, filter_generic_terms};
