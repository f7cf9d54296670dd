//! Subprocess execution shared by the bash, python and git tools.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

/// Output of a finished child process.
#[derive(Debug, Clone)]
pub struct Captured {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Captured {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// stdout, followed by a marked stderr section when stderr is non-empty.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        if !self.stderr.is_empty() {
            out.push_str("\n--- STDERR ---\n");
            out.push_str(&self.stderr);
        }
        out
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("timed out after {0} seconds")]
    TimedOut(u64),

    #[error("failed to spawn: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Run `command` to completion, killing it if `timeout` elapses first.
pub async fn run_captured(mut command: Command, timeout: Duration) -> Result<Captured, RunError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(?command, "Spawning subprocess");
    let child = command.spawn()?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => {
            let output = output?;
            Ok(Captured {
                code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
        Err(_) => {
            // Dropping the wait future drops the child, which kills it.
            warn!(secs = timeout.as_secs(), "Subprocess timed out");
            Err(RunError::TimedOut(timeout.as_secs()))
        }
    }
}

/// Render a script run the way the model expects to read it.
///
/// `what` names the failing thing in the non-zero exit message, e.g.
/// `Command` or `Python script`.
pub fn render_script_outcome(what: &str, captured: &Captured) -> String {
    let output = captured.combined();
    if !captured.success() {
        return format!(
            "[ERROR] {what} failed with return code {}.\nOutput: {output}",
            captured.code
        );
    }

    let trimmed = output.trim();
    if trimmed.is_empty() {
        "[SUCCESS] (No output returned)".to_string()
    } else {
        trimmed.to_string()
    }
}
