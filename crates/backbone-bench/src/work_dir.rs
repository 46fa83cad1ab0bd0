use crate::catalog::Workload;
use crate::errors::BenchResult;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Output directory holding one CSV per (model, workload) task.
pub struct WorkDir {
    pub path: PathBuf,
}

impl WorkDir {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        WorkDir { path: path.into() }
    }

    /// Create the directory (and parents). An existing directory is reused.
    pub fn create<P: Into<PathBuf>>(path: P) -> BenchResult<WorkDir> {
        let work_dir = WorkDir::new(path);
        fs::create_dir_all(&work_dir.path)?;
        Ok(work_dir)
    }

    pub fn task_file_name(model: &str, workload: &Workload) -> String {
        format!(
            "{}_{}_{}.csv",
            model, workload.batch_size, workload.sequence_length
        )
    }

    pub fn task_output_path(&self, model: &str, workload: &Workload) -> PathBuf {
        self.path.join(Self::task_file_name(model, workload))
    }

    /// Remove a task CSV left over from an earlier sweep. A missing file is fine.
    pub fn clear_task_output(path: &Path) -> BenchResult<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
