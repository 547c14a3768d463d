use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::error::{InstallError, InstallResult};

const LOG_TAIL_LINES: usize = 20;

/// Run an installer to completion from an argument vector (no shell).
///
/// The child is killed when the run is cancelled or exceeds `timeout`.
pub async fn run_installer(
    program: &Path,
    args: &[OsString],
    working_dir: &Path,
    timeout: Duration,
    cancel: &CancellationToken,
) -> InstallResult<()> {
    let program_name = program.display().to_string();
    info!("Running {} {:?} in {:?}", program_name, args, working_dir);

    let child = Command::new(program)
        .args(args)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| InstallError::ProcessSpawn {
            program: program_name.clone(),
            source,
        })?;

    // Dropping the wait future drops the child, which kills it.
    let output = tokio::select! {
        output = child.wait_with_output() => {
            output.map_err(|e| InstallError::io(working_dir, e))?
        }
        _ = cancel.cancelled() => {
            warn!("{} cancelled, killing installer", program_name);
            return Err(InstallError::Cancelled);
        }
        _ = tokio::time::sleep(timeout) => {
            warn!("{} exceeded {:?}, killing installer", program_name, timeout);
            return Err(InstallError::TimedOut(program_name));
        }
    };

    log_tail("stdout", &output.stdout);
    log_tail("stderr", &output.stderr);

    if !output.status.success() {
        return Err(InstallError::ExternalProcessFailed {
            program: program_name,
            code: output.status.code(),
        });
    }

    info!("{} finished successfully", program_name);
    Ok(())
}

fn log_tail(stream: &str, bytes: &[u8]) {
    let text = String::from_utf8_lossy(bytes);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(LOG_TAIL_LINES);
    for line in &lines[start..] {
        debug!("installer {}: {}", stream, line);
    }
}
