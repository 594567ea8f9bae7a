//! Progress events for streaming row and phase updates to a caller.

use serde::Serialize;

use crate::types::phase::Phase;
use crate::types::result::EnrichmentResult;

/// A progress update emitted while a row is enriched.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    PhaseStarted {
        row_index: usize,
        phase: Phase,
        fields: Vec<String>,
    },
    PhaseCompleted {
        row_index: usize,
        phase: Phase,
        fields_found: usize,
    },
    FieldEnriched {
        row_index: usize,
        field: String,
        result: EnrichmentResult,
    },
}

/// Receives progress events. Must not block.
pub trait ProgressHandler: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);
}

impl<F> ProgressHandler for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_event(&self, event: &ProgressEvent) {
        self(event)
    }
}
