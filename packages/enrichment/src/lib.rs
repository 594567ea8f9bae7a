//! Row-oriented company enrichment.
//!
//! Given rows that each carry an email address and a list of requested
//! fields, the library finds the company behind the email, searches the
//! web for each field, extracts values with an LLM, checks them, and
//! attaches the sources that support them.
//!
//! # Design Philosophy
//!
//! - A missing value beats a wrong one: anything that cannot be traced
//!   to retrieved content is downgraded or dropped
//! - Every row completes; collaborator failures degrade to fewer fields
//! - Retrieval and extraction sit behind traits so they can be swapped
//!
//! # Usage
//!
//! ```rust,ignore
//! use enrichment::{EnrichmentField, FieldType, Orchestrator, Row};
//! use enrichment::ai::OpenAIExtractor;
//! use enrichment::gateway::{FirecrawlGateway, GatewayExt, RetryPolicy};
//!
//! let gateway = FirecrawlGateway::from_env()?.with_retry(RetryPolicy::default());
//! let orchestrator = Orchestrator::new(gateway, OpenAIExtractor::from_env()?);
//!
//! let row = Row::new(0).with_column("email", "jane@acme.io");
//! let fields = vec![
//!     EnrichmentField::new("companyName", FieldType::String),
//!     EnrichmentField::new("employeeCount", FieldType::Number),
//! ];
//! let result = orchestrator.enrich_row(&row, &fields, "email", None).await;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator contracts (RetrievalGateway, ExtractionService, SkipList)
//! - [`types`] - Rows, fields, results and configuration
//! - [`pipeline`] - Phases, attribution, sanity checks and the orchestrator
//! - [`gateway`] - Retrieval gateway implementations and retry
//! - [`security`] - Credential handling
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod gateway;
pub mod pipeline;
pub mod security;
pub mod testing;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod ai;

// Re-export core types at crate root
pub use error::{EnrichmentError, RetrievalError};
pub use pipeline::{Orchestrator, ProgressEvent, ProgressHandler};
pub use traits::{
    extractor::{ExtractionContext, ExtractionService},
    gateway::RetrievalGateway,
    skip_list::{LazySkipList, MemorySkipList, SkipList},
};
pub use types::{
    config::EnrichmentConfig,
    email::EmailContext,
    field::{EnrichmentField, FieldType, FieldValue},
    phase::Phase,
    result::{
        Corroboration, EnrichmentResult, Evidence, FieldResults, Row, RowResult, RowStatus,
        SourceContext,
    },
    retrieval::{RetrievalResult, ScrapedPage, SearchOptions},
};
