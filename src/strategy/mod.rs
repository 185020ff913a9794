//! Drain strategies for queued batch files
//!
//! In production, batches arrive one per queue delivery. The CLI stands in
//! for that consumer by draining a set of batch files through the import
//! service, either sequentially or concurrently. Either way, per-file
//! failures are logged and counted rather than aborting the drain, the
//! local equivalent of dead-lettering one delivery and moving on.

pub mod r#async;
pub mod sync;

pub use r#async::{run_concurrent, ConcurrencyConfig};
pub use sync::run_sequential;

use crate::types::ImportError;

/// Outcome of draining a set of batch files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    /// Files whose import completed (including recognized redeliveries)
    pub imported: usize,

    /// Files that errored (unreadable, malformed, duplicate, whole-batch
    /// conflict) and were left for the operator
    pub failed: usize,
}

impl DrainReport {
    /// Fold one file's outcome into the report, logging failures
    pub(crate) fn absorb(
        &mut self,
        path_display: &str,
        result: Result<crate::core::ImportSummary, ImportError>,
    ) {
        match result {
            Ok(summary) => {
                self.imported += 1;
                if summary.redelivered {
                    tracing::info!(file = %path_display, "batch was a redelivery; skipped");
                }
            }
            Err(error) => {
                self.failed += 1;
                tracing::error!(file = %path_display, %error, "batch import failed");
            }
        }
    }
}
