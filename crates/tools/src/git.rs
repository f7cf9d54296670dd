//! Git tool: repository orchestration without going through a shell.
//!
//! Every git invocation is an argument vector, so branch names and commit
//! messages are never interpreted by a shell.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use ironjudge_core::error::ToolError;
use ironjudge_core::tool::Tool;
use tokio::process::Command;
use tracing::debug;

use crate::payload::{GitPayload, ToolPayload};
use crate::process::{Captured, run_captured};

const DEFAULT_COMMIT_MESSAGE: &str = "Autonomous IronJudge commit";

pub struct GitTool {
    timeout: Duration,
}

impl GitTool {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn git(&self, cwd: Option<&Path>, args: &[&str]) -> Result<Captured, String> {
        let mut command = Command::new("git");
        command.args(args);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }
        debug!(?args, cwd = ?cwd, "Running git");
        run_captured(command, self.timeout)
            .await
            .map_err(|e| format!("git {}: {e}", args.first().unwrap_or(&"")))
    }

    /// Run git and fail on a non-zero exit with its stderr.
    async fn git_ok(&self, cwd: Option<&Path>, args: &[&str]) -> Result<String, String> {
        let captured = self.git(cwd, args).await?;
        if captured.success() {
            Ok(captured.stdout.trim().to_string())
        } else {
            let stderr = captured.stderr.trim();
            Err(if stderr.is_empty() {
                "Unknown Git Error".to_string()
            } else {
                stderr.to_string()
            })
        }
    }

    async fn run(&self, p: &GitPayload) -> Result<Option<String>, String> {
        let repo = Path::new(&p.repo);
        let out = match p.action.as_str() {
            "status" => self.git_ok(Some(repo), &["status"]).await?,
            "init" => self.git_ok(None, &["init", &p.repo]).await?,
            "clone" if !p.branch.is_empty() => {
                // The remote URL travels in the branch slot.
                self.git_ok(None, &["clone", &p.branch, &p.repo]).await?
            }
            "checkout" if !p.branch.is_empty() => {
                match self.git_ok(Some(repo), &["checkout", "-b", &p.branch]).await {
                    Ok(out) => out,
                    Err(_) => self.git_ok(Some(repo), &["checkout", &p.branch]).await?,
                }
            }
            "commit" => {
                self.git_ok(Some(repo), &["add", "-A"]).await?;
                let message = if p.message.is_empty() {
                    DEFAULT_COMMIT_MESSAGE
                } else {
                    p.message.as_str()
                };
                self.git_ok(Some(repo), &["commit", "-m", message]).await?
            }
            "push" => self.git_ok(Some(repo), &["push", "origin", "main"]).await?,
            _ => return Ok(None),
        };
        Ok(Some(out))
    }
}

impl Default for GitTool {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl Tool for GitTool {
    fn name(&self) -> &str {
        "git_action"
    }

    fn description(&self) -> &str {
        "Payload: repo_path|action|[branch]|[message]\n   - Actions: init, clone, commit, push, checkout, status\n   - Use: Safe repository orchestration without raw bash errors."
    }

    async fn invoke(&self, payload: &str) -> Result<String, ToolError> {
        let request = GitPayload::parse(payload)?;

        match self.run(&request).await {
            Ok(Some(out)) if out.is_empty() => Ok(format!("[SUCCESS] git {} completed.", request.action)),
            Ok(Some(out)) => Ok(out),
            Ok(None) => Ok(format!(
                "[ERROR] Invalid or unsupported git_action: {}",
                request.action
            )),
            Err(e) => Ok(format!("[ERROR] Git Action Failed: {e}")),
        }
    }
}
