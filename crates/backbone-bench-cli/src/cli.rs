use anyhow::Result;
use backbone_bench::catalog::InstanceType;
use backbone_bench::{CheckpointPolicy, SweepArgs};
use clap::builder::PossibleValuesParser;
use clap::Parser;
use std::path::PathBuf;

use crate::commands::sweep::{list_models, print_plan, run_sweep};
use crate::logging::setup_logging;

#[derive(Parser, Debug)]
#[command(
    name = "backbone-bench",
    author,
    version,
    about = "Sweep NLP backbone benchmarks over a fixed workload grid",
    long_about = None
)]
pub struct Cli {
    #[arg(
        long,
        value_name = "LAYOUT",
        default_value = "NT",
        help = "The layout of the computation"
    )]
    layout: String,

    #[arg(
        long = "compute_layout",
        alias = "compute-layout",
        value_name = "LAYOUT",
        help = "The compute layout of the computation",
        long_help = "The compute layout of the computation. Defaults to --layout. BART models are skipped when it differs from --layout."
    )]
    compute_layout: Option<String>,

    #[arg(
        long = "use_tvm",
        alias = "use-tvm",
        help = "Whether to use TVM for inference",
        action = clap::ArgAction::SetTrue
    )]
    use_tvm: bool,

    #[arg(
        long = "instance_type",
        alias = "instance-type",
        value_name = "TYPE",
        default_value = "g4",
        value_parser = PossibleValuesParser::new(InstanceType::VARIANTS),
        help = "The instance type that the profiling will be run on"
    )]
    instance_type: String,

    #[arg(
        long = "use_fp16",
        alias = "use-fp16",
        help = "Profile in float16 instead of float32",
        action = clap::ArgAction::SetTrue
    )]
    use_fp16: bool,

    #[arg(
        long,
        value_name = "MODE",
        default_value = "train",
        help = "Benchmark mode (train, inference)"
    )]
    mode: String,

    #[arg(
        long = "output-root",
        value_name = "DIR",
        default_value = ".",
        help = "Directory receiving the per-task directory and the summary CSV"
    )]
    output_root: PathBuf,

    #[arg(
        long,
        value_name = "POLICY",
        default_value = "every",
        help = "When to write the summary CSV (every, end)",
        long_help = "'every' overwrites the summary after each task so a crash keeps partial results; 'end' writes it once after the last task."
    )]
    checkpoint: String,

    #[arg(
        long = "collaborator-config",
        value_name = "FILE",
        help = "TOML file describing how to launch the backbone benchmark"
    )]
    collaborator_config: Option<PathBuf>,

    #[arg(long = "log-file", value_name = "FILE", help = "Also write logs to this file")]
    log_file: Option<PathBuf>,

    #[arg(
        long = "dry-run",
        help = "Print the planned tasks without running anything",
        action = clap::ArgAction::SetTrue
    )]
    dry_run: bool,

    #[arg(
        long = "list-models",
        help = "List the models that would be profiled and exit",
        action = clap::ArgAction::SetTrue
    )]
    list_models: bool,

    #[arg(
        long = "format",
        value_name = "FORMAT",
        help = "Report format (text, json)",
        default_value = "text",
        value_parser = PossibleValuesParser::new(["text", "json"])
    )]
    format: String,

    #[arg(short, long, help = "Enable debug logging", action = clap::ArgAction::SetTrue)]
    verbose: bool,
}

impl Cli {
    pub fn sweep_args(&self) -> Result<SweepArgs> {
        let checkpoint: CheckpointPolicy = self.checkpoint.parse()?;
        Ok(SweepArgs {
            layout: self.layout.clone(),
            compute_layout: self.compute_layout.clone(),
            use_tvm: self.use_tvm,
            instance_type: self.instance_type.clone(),
            use_fp16: self.use_fp16,
            mode: self.mode.clone(),
            output_root: self.output_root.clone(),
            checkpoint,
        })
    }
}

pub fn cli() -> Result<()> {
    let cli = Cli::parse();
    let _guard = setup_logging(cli.verbose, cli.log_file.as_deref())?;

    let args = cli.sweep_args()?;
    if cli.list_models {
        return list_models(args);
    }
    if cli.dry_run {
        return print_plan(args);
    }
    run_sweep(args, cli.collaborator_config.as_deref(), &cli.format)
}
