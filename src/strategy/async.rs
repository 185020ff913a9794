//! Concurrent drain strategy
//!
//! Processes batch files concurrently on a tokio multi-threaded runtime,
//! the way independent queue deliveries would land on a real consumer.
//! Correctness under concurrency needs no coordination here: the donor
//! store's transaction gate plus the timestamp compare rule make whichever
//! interleaving happens converge to the last-writer-wins state.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::traits::{
    MessagingClient, NotificationSender, TypingValidator, ValidationFailureSink,
};
use crate::core::DonorImportService;
use crate::io::read_batch_async;
use crate::strategy::DrainReport;
use crate::types::ImportError;

/// Configuration for the concurrent drain
#[derive(Clone, Debug)]
pub struct ConcurrencyConfig {
    /// Maximum number of batch files in flight at once
    pub max_concurrent_files: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_files: num_cpus::get(),
        }
    }
}

impl ConcurrencyConfig {
    /// Create a config, falling back to the default for a zero value
    pub fn new(max_concurrent_files: usize) -> Self {
        if max_concurrent_files == 0 {
            let default = Self::default();
            tracing::warn!(
                fallback = default.max_concurrent_files,
                "invalid max_concurrent_files (0), using default"
            );
            return default;
        }
        Self {
            max_concurrent_files,
        }
    }
}

/// Drain batch files through the service with bounded concurrency
///
/// Builds its own tokio runtime, as callers are synchronous. Each file is
/// read and imported in its own spawned task; per-file failures are counted
/// in the report, not propagated.
pub fn run_concurrent<V, N, M, F>(
    service: Arc<DonorImportService<V, N, M, F>>,
    paths: Vec<PathBuf>,
    config: &ConcurrencyConfig,
) -> Result<DrainReport, ImportError>
where
    V: TypingValidator + Send + Sync + 'static,
    N: NotificationSender + Send + Sync + 'static,
    M: MessagingClient + Send + Sync + 'static,
    F: ValidationFailureSink + Send + Sync + 'static,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.max_concurrent_files)
        .enable_all()
        .build()
        .map_err(|error| ImportError::Io {
            message: format!("failed to create tokio runtime: {error}"),
        })?;

    let max_concurrent = config.max_concurrent_files;
    let report = runtime.block_on(async move {
        let outcomes = stream::iter(paths)
            .map(|path| {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    let display = path.display().to_string();
                    let result = match read_batch_async(&path).await {
                        Ok(batch) => service.import_donor_file(&batch, Utc::now()),
                        Err(error) => Err(error),
                    };
                    (display, result)
                })
            })
            .buffer_unordered(max_concurrent)
            .collect::<Vec<_>>()
            .await;

        let mut report = DrainReport::default();
        for outcome in outcomes {
            match outcome {
                Ok((display, result)) => report.absorb(&display, result),
                Err(join_error) => {
                    report.failed += 1;
                    tracing::error!(%join_error, "batch import task panicked");
                }
            }
        }
        report
    });

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DonorStore, FileHistoryTracker, RequiredTypingValidator};
    use crate::io::{FailureLog, LogMessagingClient, LogNotificationSender};
    use std::io::Write;
    use tempfile::TempDir;

    fn service() -> Arc<
        DonorImportService<
            RequiredTypingValidator,
            LogNotificationSender,
            LogMessagingClient,
            FailureLog,
        >,
    > {
        Arc::new(DonorImportService::new(
            Arc::new(DonorStore::new()),
            Arc::new(FileHistoryTracker::new()),
            RequiredTypingValidator::default(),
            LogNotificationSender,
            LogMessagingClient,
            FailureLog::to_sink(Box::new(std::io::sink())),
        ))
    }

    fn write_batch(dir: &TempDir, name: &str, file_location: &str, day: u8, code: &str) -> PathBuf {
        let content = format!(
            r#"{{
                "fileLocation": "{file_location}",
                "uploadTimestamp": "2024-03-0{day}T00:00:00Z",
                "messageId": "msg-{file_location}",
                "updateMode": "Differential",
                "commands": [{{
                    "recordId": "{code}",
                    "changeType": "Upsert",
                    "hla": {{
                        "A": {{ "positionOne": "*01:0{day}", "positionTwo": "*02:01" }},
                        "B": {{ "positionOne": "*07:02", "positionTwo": "*08:01" }},
                        "DRB1": {{ "positionOne": "*15:01", "positionTwo": "*16:01" }}
                    }}
                }}]
            }}"#
        );
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).expect("Failed to create batch file");
        file.write_all(content.as_bytes())
            .expect("Failed to write batch file");
        path
    }

    #[test]
    fn test_concurrent_drain_imports_all_files() {
        let dir = TempDir::new().unwrap();
        let paths: Vec<PathBuf> = (1..=4)
            .map(|n| {
                write_batch(
                    &dir,
                    &format!("batch-{n}.json"),
                    &format!("registry/{n}.json"),
                    n,
                    &format!("D{:04}", n),
                )
            })
            .collect();
        let service = service();

        let report = run_concurrent(Arc::clone(&service), paths, &ConcurrencyConfig::new(2))
            .unwrap();

        assert_eq!(report, DrainReport { imported: 4, failed: 0 });
        assert_eq!(service.store().len(), 4);
    }

    #[test]
    fn test_concurrent_upserts_on_one_code_converge_to_latest_timestamp() {
        let dir = TempDir::new().unwrap();
        // Four files, all targeting D0001 with upload days 1..=4 in
        // scrambled submission order.
        let paths: Vec<PathBuf> = [3u8, 1, 4, 2]
            .iter()
            .map(|day| {
                write_batch(
                    &dir,
                    &format!("batch-{day}.json"),
                    &format!("registry/{day}.json"),
                    *day,
                    "D0001",
                )
            })
            .collect();
        let service = service();

        let report =
            run_concurrent(Arc::clone(&service), paths, &ConcurrencyConfig::default()).unwrap();

        // Losers of the race are rejected as stale, not failed.
        assert_eq!(report.failed, 0);
        let record = service.store().get("D0001").unwrap();
        assert_eq!(
            record.last_applied_timestamp,
            chrono::DateTime::parse_from_rfc3339("2024-03-04T00:00:00Z").unwrap()
        );
    }

    #[test]
    fn test_missing_file_is_counted_not_fatal() {
        let service = service();

        let report = run_concurrent(
            service,
            vec![PathBuf::from("no/such/batch.json")],
            &ConcurrencyConfig::default(),
        )
        .unwrap();

        assert_eq!(report, DrainReport { imported: 0, failed: 1 });
    }

    #[test]
    fn test_zero_concurrency_falls_back_to_default() {
        let config = ConcurrencyConfig::new(0);
        assert_eq!(
            config.max_concurrent_files,
            ConcurrencyConfig::default().max_concurrent_files
        );
    }
}
