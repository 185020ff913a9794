//! Donor Import Engine CLI
//!
//! Command-line front end for importing donor-registry change files.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- batches/*.json
//! cargo run -- --strategy sequential batches/*.json
//! cargo run -- --strategy concurrent --max-concurrent 8 batches/*.json
//! cargo run -- --failure-log failures.csv batches/*.json
//! ```
//!
//! Each batch file is one delivered import unit. The program drains the
//! given files through the import service using the selected strategy,
//! logging summaries, rejection alerts, and would-be downstream publishes
//! as structured events. Structurally invalid records go to the failure log.
//!
//! # Exit Codes
//!
//! - 0: All files imported (including recognized redeliveries)
//! - 1: At least one file failed (unreadable, malformed, duplicate, or a
//!   whole-batch conflict)

use donor_import_engine::core::{
    DonorImportService, DonorStore, FileHistoryTracker, RequiredTypingValidator,
};
use donor_import_engine::io::{FailureLog, LogMessagingClient, LogNotificationSender};
use donor_import_engine::{cli, strategy};
use std::process;
use std::sync::Arc;
use tracing::{error, info};

fn main() {
    let args = cli::parse_args();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let failure_log = match &args.failure_log {
        Some(path) => match FailureLog::to_path(path) {
            Ok(log) => log,
            Err(log_error) => {
                error!(path = %path.display(), %log_error, "cannot open failure log");
                process::exit(1);
            }
        },
        None => FailureLog::to_stderr(),
    };

    let service = Arc::new(DonorImportService::new(
        Arc::new(DonorStore::new()),
        Arc::new(FileHistoryTracker::new()),
        RequiredTypingValidator::default(),
        LogNotificationSender,
        LogMessagingClient,
        failure_log,
    ));

    let report = match args.strategy {
        cli::StrategyType::Sequential => strategy::run_sequential(&service, &args.batch_files),
        cli::StrategyType::Concurrent => {
            let config = args.to_concurrency_config();
            match strategy::run_concurrent(Arc::clone(&service), args.batch_files.clone(), &config)
            {
                Ok(report) => report,
                Err(drain_error) => {
                    error!(%drain_error, "concurrent drain could not start");
                    process::exit(1);
                }
            }
        }
    };

    info!(
        imported = report.imported,
        failed = report.failed,
        donors = service.store().len(),
        "drain finished"
    );

    if report.failed > 0 {
        process::exit(1);
    }
}
