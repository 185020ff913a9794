//! Validation failure log
//!
//! Structurally invalid commands are excluded from ordering and recorded
//! here as CSV rows keyed by `(fileLocation, recordId, reason)`. The log is
//! an operator artifact for feeding defects back to the originating
//! registry; it is neither an alert channel nor an error path.

use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::core::traits::ValidationFailureSink;
use crate::types::ImportError;

/// One failure log row
#[derive(Debug, Clone, Serialize)]
struct FailureRow<'a> {
    file_location: &'a str,
    record_id: &'a str,
    reason: &'a str,
}

/// CSV-backed validation failure log
///
/// Rows are flushed as they are written so the log is usable while an import
/// is still running. The writer is mutex-guarded: concurrent batch handlers
/// share one log.
pub struct FailureLog {
    writer: Mutex<csv::Writer<Box<dyn Write + Send>>>,
}

impl FailureLog {
    /// Log writing to an arbitrary sink
    pub fn to_sink(sink: Box<dyn Write + Send>) -> Self {
        FailureLog {
            writer: Mutex::new(csv::Writer::from_writer(sink)),
        }
    }

    /// Log writing to a file at `path`, truncating any previous log
    pub fn to_path(path: &Path) -> Result<Self, ImportError> {
        let file = File::create(path)?;
        Ok(Self::to_sink(Box::new(file)))
    }

    /// Log writing to stderr
    pub fn to_stderr() -> Self {
        Self::to_sink(Box::new(std::io::stderr()))
    }
}

impl ValidationFailureSink for FailureLog {
    fn record(
        &self,
        file_location: &str,
        record_id: &str,
        reason: &str,
    ) -> Result<(), ImportError> {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writer.serialize(FailureRow {
            file_location,
            record_id,
            reason,
        })?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Shared in-memory sink so tests can inspect what the log wrote
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_rows_are_written_with_header() {
        let buffer = SharedBuffer::default();
        let log = FailureLog::to_sink(Box::new(buffer.clone()));

        log.record("registry/a.json", "D0001", "missing or incomplete DRB1 typing")
            .unwrap();
        log.record("registry/a.json", "D0002", "missing or incomplete A typing")
            .unwrap();

        let written = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "file_location,record_id,reason");
        assert_eq!(
            lines[1],
            "registry/a.json,D0001,missing or incomplete DRB1 typing"
        );
        assert!(lines[2].contains("D0002"));
    }

    #[test]
    fn test_log_writes_to_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failures.csv");
        let log = FailureLog::to_path(&path).unwrap();

        log.record("registry/a.json", "D0001", "missing or incomplete B typing")
            .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("registry/a.json,D0001"));
    }
}
