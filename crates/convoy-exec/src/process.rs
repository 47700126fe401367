//! Bounded external process execution

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::error::{ExecError, Result};

/// Captured result of one external process invocation.
///
/// Ephemeral: consumed immediately by the caller, never persisted.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit code; -1 when the process was terminated by a signal
    pub exit_code: i32,
    /// Captured standard output, possibly partial after a kill
    pub stdout: String,
    /// Captured standard error, possibly partial after a kill
    pub stderr: String,
}

impl ProcessOutput {
    /// Whether the process exited with code zero
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs one external command with a two-stage bounded wait.
///
/// The runner waits up to the grace window, warns and waits up to the
/// extension window, then attempts forced termination. A timeout never
/// surfaces as an error; the caller always gets a [`ProcessOutput`].
#[derive(Debug, Clone, Copy)]
pub struct ProcessRunner {
    grace: Duration,
    extension: Duration,
}

impl ProcessRunner {
    /// Create a runner with explicit wait windows
    pub fn new(grace: Duration, extension: Duration) -> Self {
        Self { grace, extension }
    }

    /// Run `program` with `args` in `working_dir`, capturing output.
    ///
    /// The only error is a failure to start or wait on the process.
    pub async fn run(&self, working_dir: &Path, program: &str, args: &[&str]) -> Result<ProcessOutput> {
        info!("Running `{} {}` in {}", program, args.join(" "), working_dir.display());

        let mut child = Command::new(program)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExecError::Spawn { program: program.to_string(), source })?;

        // Drain the pipes concurrently with the wait; a full pipe must not
        // block the child.
        let stdout_pipe = child.stdout.take().expect("stdout is piped");
        let stderr_pipe = child.stderr.take().expect("stderr is piped");
        let stdout_task = tokio::spawn(drain(stdout_pipe));
        let stderr_task = tokio::spawn(drain(stderr_pipe));

        let status = match timeout(self.grace, child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                warn!(
                    "`{program}` still running after {:?}, waiting up to {:?} more",
                    self.grace, self.extension
                );
                match timeout(self.extension, child.wait()).await {
                    Ok(status) => status,
                    Err(_) => {
                        error!(
                            "`{program}` did not exit within {:?}, forcing termination",
                            self.grace + self.extension
                        );
                        // Attempt the kill and ignore its outcome; the
                        // process may already be gone.
                        let _ = child.start_kill();
                        child.wait().await
                    }
                }
            }
        }
        .map_err(|source| ExecError::Wait { program: program.to_string(), source })?;

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();
        let exit_code = status.code().unwrap_or(-1);

        if exit_code != 0 {
            if !stdout.is_empty() {
                error!("`{program}` stdout:\n{}", stdout.trim_end());
            }
            if !stderr.is_empty() {
                error!("`{program}` stderr:\n{}", stderr.trim_end());
            }
            error!("`{program}` exited with code {exit_code}");
        } else {
            if !stdout.is_empty() {
                info!("`{program}` stdout:\n{}", stdout.trim_end());
            }
            if !stderr.is_empty() {
                info!("`{program}` stderr:\n{}", stderr.trim_end());
            }
        }

        Ok(ProcessOutput { exit_code, stdout, stderr })
    }
}

async fn drain(mut pipe: impl AsyncReadExt + Unpin) -> String {
    let mut buf = Vec::new();
    // A read error after a kill leaves whatever arrived before it
    let _ = pipe.read_to_end(&mut buf).await;
    String::from_utf8_lossy(&buf).into_owned()
}
