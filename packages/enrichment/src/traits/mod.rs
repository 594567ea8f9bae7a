//! Collaborator contracts the enrichment pipeline depends on.
//!
//! Applications provide retrieval, extraction and skip-list behavior by
//! implementing these traits; the `testing` module ships deterministic mocks.

pub mod extractor;
pub mod gateway;
pub mod skip_list;
