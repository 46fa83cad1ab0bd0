use crate::bench_config::{CheckpointPolicy, SweepConfig};
use crate::catalog::Workload;
use crate::dataframe_handler::{DataFrameHandler, ResultsTable};
use crate::errors::BenchResult;
use crate::runners::workload_runner::{WorkloadLauncher, WorkloadTask};
use crate::work_dir::WorkDir;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// Totals for a completed sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub tasks_run: usize,
    pub rows_collected: usize,
    pub checkpoints_written: usize,
    pub output_dir: PathBuf,
    pub summary_path: PathBuf,
}

/// Drives every (model, workload) pair through the launcher, strictly one at a time.
pub struct SweepRunner<L: WorkloadLauncher> {
    config: SweepConfig,
    launcher: L,
}

impl<L: WorkloadLauncher> SweepRunner<L> {
    pub fn new(config: SweepConfig, launcher: L) -> Self {
        Self { config, launcher }
    }

    /// Model outer, workload inner. Output files are ordered by this plan.
    pub fn plan(&self) -> Vec<(&'static str, Workload)> {
        let workloads = self.config.workloads();
        self.config
            .models()
            .into_iter()
            .flat_map(|model| workloads.iter().map(move |workload| (model, *workload)))
            .collect()
    }

    pub fn run(&mut self) -> BenchResult<SweepReport> {
        let work_dir = WorkDir::create(self.config.output_dir())?;
        let summary_path = self.config.summary_path();
        let plan = self.plan();
        info!(
            "Running {} benchmark tasks ({}) into {}",
            plan.len(),
            self.config,
            work_dir.path().display()
        );

        let mut table = ResultsTable::new()?;
        let mut checkpoints_written = 0;

        for (idx, (model, workload)) in plan.iter().enumerate() {
            let output_path = work_dir.task_output_path(model, workload);
            let task = WorkloadTask::new(&self.config, model, *workload, output_path);
            info!(
                "[{}/{}] {} batch_size={} sequence_length={}",
                idx + 1,
                plan.len(),
                model,
                workload.batch_size,
                workload.sequence_length
            );

            WorkDir::clear_task_output(&task.output_path)?;
            let outcome = self.launcher.launch(&task)?;
            if !outcome.success() {
                warn!(
                    model = %model,
                    workload = %workload,
                    "benchmark exited with code {:?}",
                    outcome.exit_code
                );
            }

            let rows = DataFrameHandler::read_task_csv(&task.output_path, outcome.exit_code)?;
            let added = table.append(&rows)?;
            info!("Collected {} rows from {}", added, task.output_path.display());

            if self.config.checkpoint == CheckpointPolicy::EveryTask {
                table.write_summary(&summary_path)?;
                checkpoints_written += 1;
                info!(
                    "Checkpointed {} rows to {}",
                    table.height(),
                    summary_path.display()
                );
            }
        }

        if self.config.checkpoint == CheckpointPolicy::EndOfSweep {
            table.write_summary(&summary_path)?;
            checkpoints_written += 1;
            info!("Wrote {} rows to {}", table.height(), summary_path.display());
        }

        Ok(SweepReport {
            tasks_run: plan.len(),
            rows_collected: table.height(),
            checkpoints_written,
            output_dir: work_dir.path,
            summary_path,
        })
    }
}
