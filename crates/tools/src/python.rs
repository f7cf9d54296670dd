//! Python tool: run a code block with the configured interpreter.
//!
//! The code is written to a temporary `.py` file that is removed when the
//! invocation ends, whether it succeeded, failed or timed out.

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use ironjudge_core::error::ToolError;
use ironjudge_core::tool::Tool;
use tokio::process::Command;
use tracing::debug;

use crate::process::{RunError, render_script_outcome, run_captured};

pub struct PythonTool {
    interpreter: String,
    timeout: Duration,
}

impl PythonTool {
    pub fn new(interpreter: impl Into<String>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout,
        }
    }

    fn failed(&self, reason: impl ToString) -> ToolError {
        ToolError::ExecutionFailed {
            tool_name: "python".into(),
            reason: reason.to_string(),
        }
    }
}

impl Default for PythonTool {
    fn default() -> Self {
        Self::new("python3", Duration::from_secs(30))
    }
}

#[async_trait]
impl Tool for PythonTool {
    fn name(&self) -> &str {
        "python"
    }

    fn description(&self) -> &str {
        "Payload: The raw Python code string.\n   - Use: Executing logic, testing isolated scripts."
    }

    async fn invoke(&self, payload: &str) -> Result<String, ToolError> {
        let mut script = tempfile::Builder::new()
            .prefix("ironjudge_")
            .suffix(".py")
            .tempfile()
            .map_err(|e| self.failed(e))?;
        script
            .write_all(payload.as_bytes())
            .and_then(|()| script.flush())
            .map_err(|e| self.failed(e))?;

        debug!(script = %script.path().display(), "Executing python script");

        let mut command = Command::new(&self.interpreter);
        command.arg(script.path());

        match run_captured(command, self.timeout).await {
            Ok(captured) => Ok(render_script_outcome("Python script", &captured)),
            Err(RunError::TimedOut(secs)) => Ok(format!(
                "[ERROR] Python execution timed out after {secs} seconds."
            )),
            Err(RunError::Spawn(e)) => Err(self.failed(format!(
                "could not start '{}': {e}",
                self.interpreter
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_interpreter_is_error() {
        let tool = PythonTool::new("no-such-python-xyz", Duration::from_secs(5));
        let err = tool.invoke("print(1)").await.unwrap_err();
        assert!(err.to_string().contains("no-such-python-xyz"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn script_reaches_interpreter() {
        // `cat` stands in for the interpreter: it echoes the script back,
        // which proves the payload reached the temp file intact.
        let tool = PythonTool::new("cat", Duration::from_secs(5));
        let out = tool.invoke("print('a | b')\n").await.unwrap();
        assert_eq!(out, "print('a | b')");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_uses_script_wording() {
        let tool = PythonTool::new("false", Duration::from_secs(5));
        let out = tool.invoke("").await.unwrap();
        assert!(out.starts_with("[ERROR] Python script failed with return code 1."), "{out}");
    }
}
