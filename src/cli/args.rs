use crate::strategy::ConcurrencyConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Import donor-registry change files with differential ordering
#[derive(Parser, Debug)]
#[command(name = "donor-import")]
#[command(about = "Import donor-registry change files with differential ordering", long_about = None)]
pub struct CliArgs {
    /// Batch JSON files to drain, in submission order
    #[arg(value_name = "BATCH_FILE", required = true)]
    pub batch_files: Vec<PathBuf>,

    /// Drain strategy for the given files
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "concurrent",
        help = "Drain strategy: 'sequential' for one file at a time or 'concurrent' for parallel handlers"
    )]
    pub strategy: StrategyType,

    /// Maximum number of files importing concurrently (concurrent mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum number of batch files importing concurrently (default: CPU cores)"
    )]
    pub max_concurrent_files: Option<usize>,

    /// Where to write the validation failure log (defaults to stderr)
    #[arg(
        long = "failure-log",
        value_name = "PATH",
        help = "CSV file for structurally invalid records (default: stderr)"
    )]
    pub failure_log: Option<PathBuf>,
}

/// Available drain strategies for queued batch files
#[derive(Clone, Debug, ValueEnum)]
pub enum StrategyType {
    Sequential,
    Concurrent,
}

impl CliArgs {
    /// Create a ConcurrencyConfig from CLI arguments
    ///
    /// Falls back to the default (CPU core count) when no value was given;
    /// zero values fall back with a logged warning.
    pub fn to_concurrency_config(&self) -> ConcurrencyConfig {
        match self.max_concurrent_files {
            Some(count) => ConcurrencyConfig::new(count),
            None => ConcurrencyConfig::default(),
        }
    }
}
