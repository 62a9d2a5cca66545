//! Batch scorer runner.
//!
//! Runs the external scoring program that maintains the snapshot CSV. The
//! run is bounded by a timeout and a cancellation token; on either, the
//! child process is killed. The runner never touches the snapshot itself,
//! so a failed run leaves the previous snapshot intact.

use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use fra_common::config::ScorerCommand;
use fra_common::{Error, Result};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct ScorerRunner {
    command: ScorerCommand,
}

impl ScorerRunner {
    pub fn new(command: ScorerCommand) -> Self {
        Self { command }
    }

    /// Run the scorer to completion, or kill it on timeout/cancel.
    pub async fn run(&self, timeout: Duration, cancel: &CancellationToken) -> Result<()> {
        info!(
            command = %self.command.command,
            args = ?self.command.args,
            working_dir = %self.command.working_dir.display(),
            "Running batch scorer"
        );
        let started = Instant::now();

        let mut child = Command::new(&self.command.command)
            .args(&self.command.args)
            .current_dir(&self.command.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::ExternalProcess(format!(
                    "Failed to start scorer '{}': {}",
                    self.command.command, e
                ))
            })?;

        // Drain stderr concurrently so a chatty scorer cannot fill the pipe
        // and stall.
        let stderr_pipe = child.stderr.take();
        let stderr_reader = tokio::spawn(async move {
            let mut text = String::new();
            if let Some(mut pipe) = stderr_pipe {
                let _ = pipe.read_to_string(&mut text).await;
            }
            text
        });

        enum Waited {
            Exited(ExitStatus),
            TimedOut,
            Cancelled,
        }

        let waited = tokio::select! {
            status = child.wait() => match status {
                Ok(status) => Waited::Exited(status),
                Err(e) => {
                    return Err(Error::ExternalProcess(format!(
                        "Failed to wait for scorer: {e}"
                    )));
                }
            },
            _ = sleep(timeout) => Waited::TimedOut,
            _ = cancel.cancelled() => Waited::Cancelled,
        };

        match waited {
            Waited::Exited(status) if status.success() => {
                debug!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Batch scorer finished"
                );
                Ok(())
            }
            Waited::Exited(status) => {
                let stderr_text = stderr_reader.await.unwrap_or_default();
                Err(Error::ExternalProcess(format!(
                    "Scorer exited with {}: {}",
                    status,
                    stderr_text.trim()
                )))
            }
            Waited::TimedOut => {
                let _ = child.kill().await;
                Err(Error::ExternalProcess(format!(
                    "Scorer timed out after {}s",
                    timeout.as_secs_f64()
                )))
            }
            Waited::Cancelled => {
                let _ = child.kill().await;
                Err(Error::ExternalProcess("Scorer run cancelled".to_string()))
            }
        }
    }
}
