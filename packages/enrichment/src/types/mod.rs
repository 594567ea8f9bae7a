//! Data model for enrichment rows, fields, retrieval and results.

pub mod config;
pub mod email;
pub mod field;
pub mod phase;
pub mod result;
pub mod retrieval;
