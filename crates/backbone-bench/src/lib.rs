pub mod bench_config;
pub mod catalog;
pub mod dataframe_handler;
pub mod errors;
pub mod runners;
pub mod utilities;
pub mod work_dir;

// Re-export main components for easier use
pub use bench_config::{CheckpointPolicy, CollaboratorSettings, SweepArgs, SweepConfig};
pub use dataframe_handler::{DataFrameHandler, ResultsTable};
pub use errors::{BenchError, BenchResult};
pub use runners::{ProcessLauncher, SweepReport, SweepRunner, WorkloadLauncher};
