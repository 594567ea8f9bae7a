use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

use enrichment::security::{SecretString, ServiceCredentials};

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub firecrawl_api_key: SecretString,
    pub openai_api_key: SecretString,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub row_delay_ms: Option<u64>,
    pub skip_list: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            firecrawl_api_key: env::var("FIRECRAWL_API_KEY")
                .context("FIRECRAWL_API_KEY must be set")?
                .into(),
            openai_api_key: env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY must be set")?
                .into(),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_base_url: env::var("OPENAI_BASE_URL").ok().filter(|v| !v.trim().is_empty()),
            row_delay_ms: env::var("ENRICH_ROW_DELAY_MS")
                .ok()
                .map(|v| v.parse())
                .transpose()
                .context("ENRICH_ROW_DELAY_MS must be a valid number")?,
            skip_list: env::var("ENRICH_SKIP_LIST")
                .map(|v| parse_list(&v))
                .unwrap_or_default(),
        })
    }

    pub fn firecrawl_credentials(&self) -> ServiceCredentials {
        ServiceCredentials::new(self.firecrawl_api_key.expose())
    }

    pub fn openai_credentials(&self) -> ServiceCredentials {
        let credentials = ServiceCredentials::new(self.openai_api_key.expose());
        match &self.openai_base_url {
            Some(url) => credentials.with_base_url(url),
            None => credentials,
        }
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect()
}
