use crate::errors::{BenchError, BenchResult};
use std::process::{Child, Command, ExitStatus};
use tracing::{debug, warn};

/// Spawn `program args...` with extra environment variables.
pub fn spawn_bench_cmd(
    program: &str,
    args: &[String],
    envs: &[(String, String)],
) -> BenchResult<Child> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    for (key, value) in envs {
        cmd.env(key, value);
    }
    debug!("spawning {} {}", program, args.join(" "));

    cmd.spawn()
        .map_err(|e| BenchError::LaunchError(format!("Failed to spawn {}: {}", program, e)))
}

/// Block until the child exits. There is no timeout.
pub fn await_process_exit(child: &mut Child) -> BenchResult<ExitStatus> {
    let status = child.wait()?;
    if !status.success() {
        warn!(pid = child.id(), "child exited with status: {}", status);
    } else {
        debug!(pid = child.id(), "child exited with status: {}", status);
    }
    Ok(status)
}
