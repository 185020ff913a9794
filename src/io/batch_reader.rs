//! Batch file reading
//!
//! Parses one delivered batch file (JSON) into an [`ImportBatch`]. Both a
//! synchronous reader and a tokio-based asynchronous reader are provided;
//! the sequential and concurrent drain strategies pick whichever fits.

use std::path::Path;

use crate::types::{ImportBatch, ImportError};

/// Read and parse one batch file
pub fn read_batch(path: &Path) -> Result<ImportBatch, ImportError> {
    let contents = std::fs::read_to_string(path).map_err(|error| map_read_error(path, error))?;
    let batch = serde_json::from_str(&contents)?;
    Ok(batch)
}

/// Read and parse one batch file without blocking the runtime
pub async fn read_batch_async(path: &Path) -> Result<ImportBatch, ImportError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|error| map_read_error(path, error))?;
    let batch = serde_json::from_str(&contents)?;
    Ok(batch)
}

fn map_read_error(path: &Path, error: std::io::Error) -> ImportError {
    if error.kind() == std::io::ErrorKind::NotFound {
        ImportError::file_not_found(&path.display().to_string())
    } else {
        error.into()
    }
}
