use crate::errors::{util::ensure_output_exists, BenchError, BenchResult};
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Columns every collaborator CSV must provide, in summary order.
pub const RESULT_COLUMNS: [&str; 5] = [
    "model",
    "batch_size",
    "sequence_length",
    "latency",
    "memory",
];

fn column_dtype(name: &str) -> DataType {
    match name {
        "model" => DataType::Utf8,
        "batch_size" | "sequence_length" => DataType::Int64,
        _ => DataType::Float64,
    }
}

/// Handles DataFrame operations for benchmark results processing
pub struct DataFrameHandler;

impl DataFrameHandler {
    /// An empty frame with the five result columns.
    pub fn empty_results() -> BenchResult<DataFrame> {
        let series: Vec<Series> = RESULT_COLUMNS
            .iter()
            .map(|name| Series::new_empty(name, &column_dtype(name)))
            .collect();
        DataFrame::new(series)
            .map_err(|e| BenchError::DataFrameError(format!("Failed to create DataFrame: {}", e)))
    }

    /// Read a collaborator CSV and project it onto the result columns.
    /// Extra columns are dropped; a missing result column is an error.
    pub fn read_task_csv(path: &Path, exit_code: Option<i32>) -> BenchResult<DataFrame> {
        ensure_output_exists(path, exit_code)?;

        let raw = CsvReader::from_path(path)
            .map_err(|e| {
                BenchError::DataFrameError(format!(
                    "Failed to open CSV file {}: {}",
                    path.display(),
                    e
                ))
            })?
            .has_header(true)
            .finish()
            .map_err(|e| {
                BenchError::DataFrameError(format!("Failed to read {}: {}", path.display(), e))
            })?;

        Self::normalize(&raw).map_err(|e| match e {
            BenchError::DataFrameError(msg) => {
                BenchError::DataFrameError(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    fn normalize(raw: &DataFrame) -> BenchResult<DataFrame> {
        let mut series_vec = Vec::with_capacity(RESULT_COLUMNS.len());
        for name in RESULT_COLUMNS {
            let column = raw.column(name).map_err(|_| {
                BenchError::DataFrameError(format!("missing required column '{}'", name))
            })?;
            let cast = column.cast(&column_dtype(name)).map_err(|e| {
                BenchError::DataFrameError(format!("column '{}' has wrong type: {}", name, e))
            })?;
            series_vec.push(cast);
        }
        Ok(DataFrame::new(series_vec)?)
    }

    /// Write the frame as CSV through a temporary file renamed into place.
    pub fn write_csv_atomic(df: &mut DataFrame, file_path: &Path) -> BenchResult<()> {
        let temp_path: PathBuf = file_path.with_extension("csv.tmp");
        let file = fs::File::create(&temp_path)?;

        CsvWriter::new(&file)
            .include_header(true)
            .with_separator(b',')
            .finish(df)
            .map_err(|e| BenchError::DataFrameError(format!("Failed to write CSV: {}", e)))?;
        file.sync_all()?;

        fs::rename(&temp_path, file_path)?;
        debug!(rows = df.height(), path = %file_path.display(), "wrote csv");
        Ok(())
    }
}

/// Growable table of result rows, appended in task order.
pub struct ResultsTable {
    df: DataFrame,
}

impl ResultsTable {
    pub fn new() -> BenchResult<Self> {
        Ok(Self {
            df: DataFrameHandler::empty_results()?,
        })
    }

    /// Append rows; returns how many were added.
    pub fn append(&mut self, rows: &DataFrame) -> BenchResult<usize> {
        self.df.vstack_mut(rows).map_err(|e| {
            BenchError::DataFrameError(format!("Failed to append results: {}", e))
        })?;
        Ok(rows.height())
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Overwrite `path` with the full table.
    pub fn write_summary(&mut self, path: &Path) -> BenchResult<()> {
        self.df.as_single_chunk();
        DataFrameHandler::write_csv_atomic(&mut self.df, path)
    }
}
