//! Extraction service implementations.
//!
//! Reference implementations of the `ExtractionService` trait. Applications
//! can use these directly or bring their own.

#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "openai")]
pub use openai::OpenAIExtractor;
