//! Bash tool: execute shell commands.
//!
//! The payload is passed verbatim to `sh -c`, bounded by a timeout.

use std::time::Duration;

use async_trait::async_trait;
use ironjudge_core::error::ToolError;
use ironjudge_core::tool::Tool;
use tokio::process::Command;
use tracing::debug;

use crate::process::{RunError, render_script_outcome, run_captured};

pub struct BashTool {
    timeout: Duration,
}

impl BashTool {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for BashTool {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        "bash"
    }

    fn description(&self) -> &str {
        "Payload: The raw shell command string.\n   - Use: System operations, git, file commands, installing packages."
    }

    async fn invoke(&self, payload: &str) -> Result<String, ToolError> {
        debug!(command = %payload, "Executing shell command");

        let command = if cfg!(target_os = "windows") {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", payload]);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", payload]);
            cmd
        };

        match run_captured(command, self.timeout).await {
            Ok(captured) => Ok(render_script_outcome("Command", &captured)),
            Err(RunError::TimedOut(secs)) => Ok(format!(
                "[ERROR] Bash command timed out after {secs} seconds."
            )),
            Err(RunError::Spawn(e)) => Err(ToolError::ExecutionFailed {
                tool_name: "bash".into(),
                reason: e.to_string(),
            }),
        }
    }
}
