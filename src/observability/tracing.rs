//! Run correlation.
//!
//! Every CLI invocation executes inside a `run` span carrying a UUID v4
//! `run_id`, so log lines from one deployment can be grouped together.

use tracing::Span;
use uuid::Uuid;

/// Generate a fresh run identifier.
pub fn new_run_id() -> Uuid {
    Uuid::new_v4()
}

/// Span wrapping one CLI invocation.
pub fn run_span(run_id: Uuid, command: &'static str) -> Span {
    tracing::info_span!("run", run_id = %run_id, command = command)
}
