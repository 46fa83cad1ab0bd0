use polars::error::PolarsError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error types for the sweep orchestrator
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Unsupported benchmark mode: {0} (expected 'train' or 'inference')")]
    UnsupportedMode(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigError(String),

    #[error("Failed to launch benchmark: {0}")]
    LaunchError(String),

    #[error("Benchmark output not found at {} (child exit code: {})", .path.display(), display_code(.exit_code))]
    MissingOutput {
        path: PathBuf,
        exit_code: Option<i32>,
    },

    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("DataFrame error: {0}")]
    DataFrameError(String),

    #[error("Environment error: {0}")]
    EnvironmentError(String),
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "unknown".to_string(),
    }
}

/// Result type for benchmark operations
pub type BenchResult<T> = Result<T, BenchError>;

/// Utility functions for working with BenchError
pub mod util {
    use super::*;
    use std::path::Path;

    /// Check that a benchmark output file exists, returning a MissingOutput error if it doesn't
    pub fn ensure_output_exists<P: AsRef<Path>>(path: P, exit_code: Option<i32>) -> BenchResult<()> {
        let path_ref = path.as_ref();
        if !path_ref.is_file() {
            return Err(BenchError::MissingOutput {
                path: path_ref.to_path_buf(),
                exit_code,
            });
        }
        Ok(())
    }
}

impl From<PolarsError> for BenchError {
    fn from(err: PolarsError) -> Self {
        BenchError::DataFrameError(err.to_string())
    }
}

impl From<config::ConfigError> for BenchError {
    fn from(err: config::ConfigError) -> Self {
        BenchError::ConfigError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_output_reports_exit_code() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.csv");

        let err = util::ensure_output_exists(&path, Some(137)).unwrap_err();
        assert!(matches!(err, BenchError::MissingOutput { exit_code: Some(137), .. }));
        assert!(err.to_string().contains("child exit code: 137"));

        let err = util::ensure_output_exists(&path, None).unwrap_err();
        assert!(err.to_string().contains("child exit code: unknown"));
    }

    #[test]
    fn test_directory_is_not_an_output_file() {
        let dir = TempDir::new().unwrap();
        assert!(util::ensure_output_exists(dir.path(), Some(0)).is_err());
    }
}
