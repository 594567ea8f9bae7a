//! `enrich`: enrich emails from the command line.
//!
//! Builds one row per `--email`, runs the batch, and prints one JSON
//! `RowResult` per line on stdout. Logs go to stderr.

mod config;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use enrichment::ai::OpenAIExtractor;
use enrichment::gateway::{FirecrawlGateway, GatewayExt, RetryPolicy};
use enrichment::{
    EnrichmentConfig, EnrichmentField, FieldType, MemorySkipList, Orchestrator, ProgressEvent,
    ProgressHandler, Row,
};

const EMAIL_COLUMN: &str = "email";

#[derive(Parser)]
#[command(name = "enrich")]
#[command(about = "Enrich company data from email addresses")]
struct Cli {
    /// Email address to enrich (repeatable)
    #[arg(long = "email", required = true)]
    emails: Vec<String>,

    /// Field to enrich as name:type[:description], type one of
    /// string, number, boolean, string_array (repeatable)
    #[arg(long = "field", required = true, value_parser = parse_field)]
    fields: Vec<EnrichmentField>,

    /// Flat extraction only, skipping the corroborated pass
    #[arg(long)]
    no_corroboration: bool,

    /// Print progress events to stderr as JSON
    #[arg(long)]
    progress: bool,
}

fn parse_field(raw: &str) -> Result<EnrichmentField> {
    let mut parts = raw.splitn(3, ':');
    let name = parts.next().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        bail!("field name is empty in '{}'", raw);
    }
    let field_type = match parts.next().map(|t| t.trim().to_lowercase()).as_deref() {
        None | Some("") | Some("string") => FieldType::String,
        Some("number") => FieldType::Number,
        Some("boolean") | Some("bool") => FieldType::Boolean,
        Some("string_array") | Some("array") | Some("list") => FieldType::StringArray,
        Some(other) => bail!("unknown field type '{}'", other),
    };

    let field = EnrichmentField::new(name, field_type);
    Ok(match parts.next().map(str::trim).filter(|d| !d.is_empty()) {
        Some(description) => field.with_description(description),
        None => field,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,enrichment=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let gateway = FirecrawlGateway::new(config.firecrawl_credentials())
        .context("Failed to create Firecrawl gateway")?
        .with_retry(RetryPolicy::default());
    let extractor = OpenAIExtractor::new(config.openai_credentials())
        .context("Failed to create OpenAI extractor")?
        .with_model(&config.openai_model);

    let mut enrichment_config =
        EnrichmentConfig::default().with_corroboration(!cli.no_corroboration);
    if let Some(ms) = config.row_delay_ms {
        enrichment_config = enrichment_config.with_row_delay_ms(ms);
    }

    let mut orchestrator = Orchestrator::new(gateway, extractor).with_config(enrichment_config);
    if !config.skip_list.is_empty() {
        tracing::info!(entries = config.skip_list.len(), "Skip list configured");
        orchestrator = orchestrator
            .with_skip_list(Arc::new(MemorySkipList::from_entries(&config.skip_list)));
    }

    let rows: Vec<Row> = cli
        .emails
        .iter()
        .enumerate()
        .map(|(index, email)| Row::new(index).with_column(EMAIL_COLUMN, email))
        .collect();

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing current row");
            on_ctrl_c.cancel();
        }
    });

    tracing::info!(rows = rows.len(), fields = cli.fields.len(), "Starting enrichment");

    let print_progress = |event: &ProgressEvent| {
        if let Ok(line) = serde_json::to_string(event) {
            eprintln!("{}", line);
        }
    };
    let progress: Option<&dyn ProgressHandler> = if cli.progress {
        Some(&print_progress)
    } else {
        None
    };

    let results = orchestrator
        .enrich_rows(&rows, &cli.fields, EMAIL_COLUMN, progress, &cancel)
        .await;

    for result in &results {
        println!(
            "{}",
            serde_json::to_string(result).context("Failed to serialize row result")?
        );
    }

    if results.len() < rows.len() {
        tracing::warn!(processed = results.len(), total = rows.len(), "Run cancelled");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field() {
        let field = parse_field("employeeCount:number:Total number of employees").unwrap();
        assert_eq!(field.name, "employeeCount");
        assert_eq!(field.field_type, FieldType::Number);
        assert_eq!(field.description, "Total number of employees");

        let field = parse_field("companyName").unwrap();
        assert_eq!(field.field_type, FieldType::String);
        assert!(field.description.is_empty());

        assert!(parse_field("x:decimal").is_err());
        assert!(parse_field(":string").is_err());
    }
}
