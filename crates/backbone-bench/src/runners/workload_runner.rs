use crate::bench_config::{CollaboratorSettings, SweepConfig};
use crate::catalog::{InstanceType, Mode, Workload};
use crate::errors::BenchResult;
use crate::utilities::{await_process_exit, spawn_bench_cmd};
use std::path::PathBuf;
use tracing::info;

/// Everything the collaborator needs to benchmark one (model, workload) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadTask {
    pub workload: Workload,
    pub model: String,
    pub output_path: PathBuf,
    pub mode: Mode,
    pub use_tvm: bool,
    pub instance_type: InstanceType,
    pub use_fp16: bool,
}

impl WorkloadTask {
    pub fn new(config: &SweepConfig, model: &str, workload: Workload, output_path: PathBuf) -> Self {
        WorkloadTask {
            workload,
            model: model.to_string(),
            output_path,
            mode: config.mode,
            use_tvm: config.effective_use_tvm(),
            instance_type: config.instance_type,
            use_fp16: config.precision.is_fp16(),
        }
    }

    /// Flags appended to the collaborator command line.
    pub fn cli_args(&self) -> Vec<String> {
        let mut args = vec![
            "--workload".to_string(),
            self.workload.to_string(),
            "--model".to_string(),
            self.model.clone(),
            "--output".to_string(),
            self.output_path.to_string_lossy().to_string(),
            "--mode".to_string(),
            self.mode.to_string(),
        ];
        if self.use_tvm {
            args.push("--use-tvm".to_string());
        }
        args.push("--instance-type".to_string());
        args.push(self.instance_type.to_string());
        if self.use_fp16 {
            args.push("--use-fp16".to_string());
        }
        args
    }
}

/// What an isolated task reported back. `exit_code` is `None` when the child
/// was killed by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskOutcome {
    pub exit_code: Option<i32>,
}

impl TaskOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs one task in isolation and blocks until it is done.
pub trait WorkloadLauncher {
    fn launch(&mut self, task: &WorkloadTask) -> BenchResult<TaskOutcome>;
}

/// Launches the collaborator as a fresh OS process per task.
pub struct ProcessLauncher {
    settings: CollaboratorSettings,
    envs: Vec<(String, String)>,
}

impl ProcessLauncher {
    pub fn new(settings: CollaboratorSettings) -> BenchResult<Self> {
        let envs = settings.child_environment()?;
        Ok(Self { settings, envs })
    }

    pub fn command_line(&self, task: &WorkloadTask) -> Vec<String> {
        let mut args = self.settings.args.clone();
        args.extend(task.cli_args());
        args
    }
}

impl WorkloadLauncher for ProcessLauncher {
    fn launch(&mut self, task: &WorkloadTask) -> BenchResult<TaskOutcome> {
        let args = self.command_line(task);
        let mut child = spawn_bench_cmd(&self.settings.program, &args, &self.envs)?;
        info!(
            pid = child.id(),
            model = %task.model,
            workload = %task.workload,
            "launched benchmark"
        );
        let status = await_process_exit(&mut child)?;
        Ok(TaskOutcome {
            exit_code: status.code(),
        })
    }
}
