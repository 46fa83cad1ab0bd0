pub mod sweep_runner;
pub mod workload_runner;

// Re-export for easier usage
pub use sweep_runner::{SweepReport, SweepRunner};
pub use workload_runner::{ProcessLauncher, TaskOutcome, WorkloadLauncher, WorkloadTask};
