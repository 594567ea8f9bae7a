//! Row orchestrator: email context, skip list, phases, formatting.
//!
//! Rows are independent. The only state shared across rows is the
//! read-only skip list and the stateless collaborators.

use chrono::Datelike;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::categorize::categorize_fields;
use super::email::extract_email_context;
use super::formatter::format_results;
use super::phases::{self, PhaseContext, PhaseServices};
use super::progress::{ProgressEvent, ProgressHandler};
use crate::error::EnrichmentError;
use crate::traits::extractor::ExtractionService;
use crate::traits::gateway::RetrievalGateway;
use crate::traits::skip_list::SkipList;
use crate::types::config::EnrichmentConfig;
use crate::types::email::EmailContext;
use crate::types::field::EnrichmentField;
use crate::types::phase::Phase;
use crate::types::result::{FieldResults, Row, RowResult};

/// Drives the enrichment phases for rows.
///
/// # Example
///
/// ```rust,ignore
/// use enrichment::{Orchestrator, EnrichmentField, FieldType, Row};
/// use enrichment::testing::{MockExtractor, MockGateway};
///
/// let orchestrator = Orchestrator::new(MockGateway::new(), MockExtractor::new());
/// let row = Row::new(0).with_column("email", "jane@acme.io");
/// let fields = vec![EnrichmentField::new("companyName", FieldType::String)];
/// let result = orchestrator.enrich_row(&row, &fields, "email", None).await;
/// ```
pub struct Orchestrator<G: RetrievalGateway, E: ExtractionService> {
    gateway: G,
    extractor: E,
    skip_list: Option<Arc<dyn SkipList>>,
    config: EnrichmentConfig,
}

impl<G: RetrievalGateway, E: ExtractionService> Orchestrator<G, E> {
    pub fn new(gateway: G, extractor: E) -> Self {
        Self {
            gateway,
            extractor,
            skip_list: None,
            config: EnrichmentConfig::default(),
        }
    }

    /// Check every row against `skip_list` before any retrieval.
    pub fn with_skip_list(mut self, skip_list: Arc<dyn SkipList>) -> Self {
        self.skip_list = Some(skip_list);
        self
    }

    pub fn with_config(mut self, config: EnrichmentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EnrichmentConfig {
        &self.config
    }

    /// Enrich one row.
    ///
    /// Always returns a `RowResult`. Status is `error` when the email is
    /// missing or malformed or a collaborator panics, `skipped` when the
    /// skip list matches, and `completed` otherwise, even when no field
    /// was found.
    pub async fn enrich_row(
        &self,
        row: &Row,
        fields: &[EnrichmentField],
        email_column: &str,
        progress: Option<&dyn ProgressHandler>,
    ) -> RowResult {
        let pending = RowResult::pending(row);

        let Some(email) = row.value(email_column) else {
            tracing::warn!(row_index = row.index, email_column, "Row has no email");
            return pending.failed(format!("no email in column '{}'", email_column));
        };

        if let Some(skip_list) = &self.skip_list {
            if skip_list.should_skip(email).await {
                let reason = skip_list.reason(email).await;
                tracing::info!(row_index = row.index, reason = %reason, "Row skipped");
                return pending.skipped(reason);
            }
        }

        let Some(email_context) = extract_email_context(email) else {
            let err = EnrichmentError::InvalidEmail {
                email: email.to_string(),
            };
            tracing::warn!(row_index = row.index, error = %err, "Row failed");
            return pending.failed(err.to_string());
        };

        tracing::info!(
            row_index = row.index,
            domain = %email_context.domain,
            personal = email_context.is_personal_email,
            "Enriching row"
        );

        let run = self.run_phases(row.index, email_context, fields, progress);
        match AssertUnwindSafe(run).catch_unwind().await {
            Ok(enrichments) => {
                tracing::info!(
                    row_index = row.index,
                    fields_found = enrichments.len(),
                    "Row completed"
                );
                pending.completed(enrichments)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(row_index = row.index, error = %message, "Row panicked");
                pending.failed(format!("enrichment failed: {}", message))
            }
        }
    }

    /// Enrich `rows` in order, pausing `row_delay_ms` between rows.
    ///
    /// `cancel` is checked before each row and during the pause. A row
    /// that has started always finishes; results for rows processed
    /// before cancellation are returned.
    pub async fn enrich_rows(
        &self,
        rows: &[Row],
        fields: &[EnrichmentField],
        email_column: &str,
        progress: Option<&dyn ProgressHandler>,
        cancel: &CancellationToken,
    ) -> Vec<RowResult> {
        let delay = self.config.row_delay();
        let mut results = Vec::with_capacity(rows.len());

        for (i, row) in rows.iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            if cancel.is_cancelled() {
                tracing::info!(
                    processed = results.len(),
                    remaining = rows.len() - i,
                    "Batch cancelled"
                );
                break;
            }
            results.push(self.enrich_row(row, fields, email_column, progress).await);
        }

        results
    }

    async fn run_phases(
        &self,
        row_index: usize,
        email_context: EmailContext,
        fields: &[EnrichmentField],
        progress: Option<&dyn ProgressHandler>,
    ) -> FieldResults {
        let services = PhaseServices {
            gateway: &self.gateway,
            extractor: &self.extractor,
            config: &self.config,
            current_year: chrono::Utc::now().year(),
        };
        let mut ctx = PhaseContext::new(row_index, email_context);
        let emit = |event: ProgressEvent| {
            if let Some(handler) = progress {
                handler.on_event(&event);
            }
        };

        for (phase, bucket) in categorize_fields(fields) {
            tracing::info!(row_index, %phase, fields = bucket.len(), "Phase started");
            emit(ProgressEvent::PhaseStarted {
                row_index,
                phase,
                fields: bucket.iter().map(|f| f.name.clone()).collect(),
            });

            let results = match phase {
                Phase::Discovery => phases::discovery::run(&bucket, &mut ctx, &services).await,
                Phase::TechStack => phases::tech_stack::run(&bucket, &ctx, &services).await,
                _ => phases::generic::run(phase, &bucket, &ctx, &services).await,
            };

            let added = ctx.merge(results);
            for name in &added {
                if let Some(result) = ctx.discovered.get(name) {
                    emit(ProgressEvent::FieldEnriched {
                        row_index,
                        field: name.clone(),
                        result: result.clone(),
                    });
                }
            }

            tracing::info!(row_index, %phase, fields_found = added.len(), "Phase completed");
            emit(ProgressEvent::PhaseCompleted {
                row_index,
                phase,
                fields_found: added.len(),
            });
        }

        format_results(fields, &ctx.discovered, &self.config)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
