//! Sequential drain strategy
//!
//! Processes batch files one at a time in the order given. The simplest way
//! to replay a backlog; ordering still comes entirely from the declared
//! upload timestamps, not from file order.

use chrono::Utc;
use std::path::PathBuf;

use crate::core::traits::{
    MessagingClient, NotificationSender, TypingValidator, ValidationFailureSink,
};
use crate::core::DonorImportService;
use crate::io::read_batch;
use crate::strategy::DrainReport;

/// Drain batch files through the service, one at a time
pub fn run_sequential<V, N, M, F>(
    service: &DonorImportService<V, N, M, F>,
    paths: &[PathBuf],
) -> DrainReport
where
    V: TypingValidator,
    N: NotificationSender,
    M: MessagingClient,
    F: ValidationFailureSink,
{
    let mut report = DrainReport::default();
    for path in paths {
        let result = read_batch(path)
            .and_then(|batch| service.import_donor_file(&batch, Utc::now()));
        report.absorb(&path.display().to_string(), result);
    }
    report
}
