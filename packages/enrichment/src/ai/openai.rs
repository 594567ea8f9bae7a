//! OpenAI implementation of the `ExtractionService` trait.
//!
//! Both extraction modes use chat completions with a strict `json_schema`
//! response format generated from the requested fields, so the model can
//! only answer with the declared keys and value types.
//!
//! # Example
//!
//! ```rust,ignore
//! use enrichment::ai::OpenAIExtractor;
//!
//! let extractor = OpenAIExtractor::from_env()?.with_model("gpt-4o");
//! let orchestrator = Orchestrator::new(gateway, extractor);
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{EnrichmentError, Result};
use crate::pipeline::extract::{
    parse_corroborated_response, parse_flat_response, transform_corroborated_response,
    transform_flat_response,
};
use crate::pipeline::prompts::{format_corroborate_prompt, format_extract_prompt, SYSTEM_PROMPT};
use crate::pipeline::schema::{corroborated_response_schema, flat_response_schema};
use crate::security::ServiceCredentials;
use crate::traits::extractor::{ExtractionContext, ExtractionService};
use crate::types::field::EnrichmentField;
use crate::types::result::FieldResults;

const OPENAI_API_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";

/// OpenAI-backed extraction.
#[derive(Clone)]
pub struct OpenAIExtractor {
    client: Client,
    credentials: ServiceCredentials,
    model: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct StructuredRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaFormat,
}

#[derive(Serialize)]
struct JsonSchemaFormat {
    name: &'static str,
    strict: bool,
    schema: serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

impl OpenAIExtractor {
    /// Create an extractor with the given credentials.
    pub fn new(credentials: ServiceCredentials) -> Result<Self> {
        if credentials.api_key.is_empty() {
            return Err(EnrichmentError::Config("OpenAI API key is empty".into()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| EnrichmentError::Extraction(Box::new(e)))?;

        Ok(Self {
            client,
            credentials,
            model: DEFAULT_MODEL.to_string(),
        })
    }

    /// Create from `OPENAI_API_KEY`, with optional `OPENAI_MODEL` and
    /// `OPENAI_BASE_URL` overrides.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| EnrichmentError::Config("OPENAI_API_KEY not set".into()))?;

        let mut credentials = ServiceCredentials::new(api_key);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            credentials = credentials.with_base_url(base_url);
        }

        let extractor = Self::new(credentials)?;
        Ok(match std::env::var("OPENAI_MODEL") {
            Ok(model) if !model.trim().is_empty() => extractor.with_model(model),
            _ => extractor,
        })
    }

    /// Set the chat model (default: gpt-4o).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Structured output with JSON schema (OpenAI's json_schema response_format).
    async fn generate_structured(
        &self,
        user: &str,
        schema_name: &'static str,
        schema: serde_json::Value,
    ) -> Result<String> {
        let request = StructuredRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.0,
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: schema_name,
                    strict: true,
                    schema,
                },
            },
        };

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.credentials.base_url_or(OPENAI_API_URL)
            ))
            .bearer_auth(self.credentials.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| EnrichmentError::Extraction(Box::new(e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EnrichmentError::Extraction(
                format!("OpenAI structured output error ({}): {}", status, error_text).into(),
            ));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| EnrichmentError::Extraction(Box::new(e)))?;

        let message = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| EnrichmentError::Extraction("No response from OpenAI".into()))?;

        if let Some(refusal) = message.refusal {
            return Err(EnrichmentError::Extraction(
                format!("OpenAI refused: {}", refusal).into(),
            ));
        }
        message
            .content
            .ok_or_else(|| EnrichmentError::Extraction("Empty response from OpenAI".into()))
    }
}

#[async_trait]
impl ExtractionService for OpenAIExtractor {
    async fn extract(
        &self,
        content: &str,
        fields: &[EnrichmentField],
        context: &ExtractionContext,
    ) -> Result<FieldResults> {
        if fields.is_empty() {
            return Ok(FieldResults::new());
        }

        let prompt = format_extract_prompt(content, fields, context);
        let raw = self
            .generate_structured(&prompt, "enrichment_fields", flat_response_schema(fields))
            .await?;
        let response = parse_flat_response(&raw)?;
        let results = transform_flat_response(&response, fields);

        tracing::debug!(
            phase = ?context.phase,
            requested = fields.len(),
            returned = results.len(),
            "Flat extraction complete"
        );
        Ok(results)
    }

    async fn extract_with_corroboration(
        &self,
        content: &str,
        fields: &[EnrichmentField],
        context: &ExtractionContext,
    ) -> Result<FieldResults> {
        if fields.is_empty() {
            return Ok(FieldResults::new());
        }

        let prompt = format_corroborate_prompt(content, fields, context);
        let raw = self
            .generate_structured(
                &prompt,
                "enrichment_evidence",
                corroborated_response_schema(fields),
            )
            .await?;
        let response = parse_corroborated_response(&raw)?;
        let results = transform_corroborated_response(&response, fields);

        tracing::debug!(
            phase = ?context.phase,
            requested = fields.len(),
            returned = results.len(),
            "Corroborated extraction complete"
        );
        Ok(results)
    }

    fn name(&self) -> &str {
        "openai"
    }
}
