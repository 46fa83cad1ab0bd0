use anyhow::{Context, Result};
use backbone_bench::{
    CollaboratorSettings, ProcessLauncher, SweepArgs, SweepConfig, SweepReport, SweepRunner,
};
use console::style;
use std::path::Path;
use tracing::info;

pub fn list_models(args: SweepArgs) -> Result<()> {
    let config = SweepConfig::resolve(args)?;
    print!("{}", render_models(&config));
    Ok(())
}

/// Show what a sweep would do without creating directories or launching anything.
pub fn print_plan(args: SweepArgs) -> Result<()> {
    let config = SweepConfig::resolve(args)?;
    println!("{}", style(config.to_string()).dim());
    print!("{}", render_plan(&config));
    Ok(())
}

fn render_models(config: &SweepConfig) -> String {
    config
        .models()
        .into_iter()
        .map(|model| format!("{}\n", model))
        .collect()
}

fn render_plan(config: &SweepConfig) -> String {
    let mut out = format!(
        "output dir: {}\nsummary:    {}\n{} tasks:\n",
        config.output_dir().display(),
        config.summary_path().display(),
        config.total_tasks()
    );
    for model in config.models() {
        for workload in config.workloads() {
            out.push_str(&format!(
                "  {} batch_size={} sequence_length={}\n",
                model, workload.batch_size, workload.sequence_length
            ));
        }
    }
    out
}

pub fn run_sweep(args: SweepArgs, collaborator_config: Option<&Path>, format: &str) -> Result<()> {
    let config = SweepConfig::resolve(args)?;
    let settings = CollaboratorSettings::load(collaborator_config)
        .context("Failed to load collaborator settings")?;
    info!(program = %settings.program, "using backbone benchmark");

    let launcher = ProcessLauncher::new(settings)?;
    let mut runner = SweepRunner::new(config, launcher);
    let report = runner.run()?;

    let output = match format {
        "json" => serde_json::to_string_pretty(&report)?,
        _ => render_report(&report),
    };
    println!("{}", output);
    Ok(())
}

fn render_report(report: &SweepReport) -> String {
    format!(
        "{} {} tasks, {} rows, {} checkpoints\n  results: {}\n  summary: {}",
        style("Sweep complete:").green().bold(),
        report.tasks_run,
        report.rows_collected,
        report.checkpoints_written,
        report.output_dir.display(),
        report.summary_path.display()
    )
}
