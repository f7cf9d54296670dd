//! Browser tool: drive a headless browser through the `agent-browser` CLI.
//!
//! Each invocation opens the URL in its own named session and closes that
//! session when done, including on error and cancellation.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use ironjudge_core::error::ToolError;
use ironjudge_core::tool::Tool;
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use crate::payload::{BrowserPayload, ToolPayload};
use crate::process::run_captured;

/// Characters of page HTML returned by `extract_html` without a selector.
const HTML_PREVIEW_CHARS: usize = 3000;

/// Response from agent-browser --json commands
#[derive(Debug, Deserialize)]
struct AgentBrowserResponse {
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// What the model asked the browser to do after navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BrowserStep {
    Screenshot,
    ExtractHtml { selector: Option<String> },
    Click { selector: String },
    Type { selector: String, value: String },
    /// Unknown or incomplete action: navigate only.
    NavigateOnly,
}

impl BrowserStep {
    fn from_payload(p: &BrowserPayload) -> Self {
        match p.action.as_str() {
            "goto_and_screenshot" => Self::Screenshot,
            "extract_html" => Self::ExtractHtml {
                selector: (!p.selector.is_empty()).then(|| p.selector.clone()),
            },
            "click" if !p.selector.is_empty() => Self::Click {
                selector: p.selector.clone(),
            },
            "type" if !p.selector.is_empty() && !p.value.is_empty() => Self::Type {
                selector: p.selector.clone(),
                value: p.value.clone(),
            },
            _ => Self::NavigateOnly,
        }
    }
}

/// Closes the browser session when dropped.
struct SessionGuard {
    bin: String,
    session: String,
    closed: bool,
}

impl SessionGuard {
    async fn close(mut self) {
        self.closed = true;
        let _ = Command::new(&self.bin)
            .args(["--session", &self.session, "close"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        // Cancelled or failed mid-flight: close in the background.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let bin = self.bin.clone();
            let session = self.session.clone();
            handle.spawn(async move {
                let _ = Command::new(bin)
                    .args(["--session", &session, "close"])
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()
                    .await;
            });
        }
    }
}

pub struct BrowserTool {
    bin: String,
    timeout: Duration,
}

impl BrowserTool {
    pub fn new(bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }

    /// Execute an agent-browser command in `session`.
    async fn run_command(&self, session: &str, args: &[&str]) -> Result<Value, String> {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("--session").arg(session).args(args).arg("--json");

        debug!("Running: {} --session {session} {} --json", self.bin, args.join(" "));

        let captured = run_captured(cmd, self.timeout)
            .await
            .map_err(|e| format!("{}: {e}", self.bin))?;

        if let Ok(resp) = serde_json::from_str::<AgentBrowserResponse>(&captured.stdout) {
            return if resp.success {
                Ok(resp.data.unwrap_or(Value::Null))
            } else {
                Err(resp.error.unwrap_or_else(|| "agent-browser reported failure".into()))
            };
        }

        // Fallback for non-JSON output
        if captured.success() {
            Ok(Value::String(captured.stdout.trim().to_string()))
        } else {
            Err(captured.stderr.trim().to_string())
        }
    }

    async fn perform(&self, session: &str, url: &str, step: &BrowserStep) -> Result<String, String> {
        self.run_command(session, &["open", url]).await?;

        match step {
            BrowserStep::Screenshot => {
                let shot = format!("screenshot_{}.png", &uuid::Uuid::new_v4().simple().to_string()[..8]);
                self.run_command(session, &["screenshot", &shot, "--full"]).await?;
                Ok(format!("Screenshot saved at {shot}"))
            }
            BrowserStep::ExtractHtml { selector: Some(selector) } => {
                let data = self.run_command(session, &["get", "html", selector]).await?;
                Ok(value_text(&data))
            }
            BrowserStep::ExtractHtml { selector: None } => {
                let data = self.run_command(session, &["get", "html", "html"]).await?;
                Ok(value_text(&data).chars().take(HTML_PREVIEW_CHARS).collect())
            }
            BrowserStep::Click { selector } => {
                self.run_command(session, &["click", selector]).await?;
                Ok(format!("Clicked {selector} successfully."))
            }
            BrowserStep::Type { selector, value } => {
                self.run_command(session, &["fill", selector, value]).await?;
                Ok(format!("Typed '{value}' into {selector}."))
            }
            BrowserStep::NavigateOnly => Ok("[SUCCESS] Browser Action Triggered".into()),
        }
    }
}

fn validate_url(url: &str) -> Result<(), String> {
    if url.starts_with("file://") {
        return Err("file:// URLs are blocked".into());
    }
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err("Only http:// and https:// URLs are allowed".into());
    }
    Ok(())
}

/// Pull the interesting text out of an agent-browser `data` value.
fn value_text(data: &Value) -> String {
    match data {
        Value::String(s) => s.clone(),
        Value::Object(map) => ["html", "text", "output", "result"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| data.to_string()),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl Default for BrowserTool {
    fn default() -> Self {
        Self::new("agent-browser", Duration::from_secs(30))
    }
}

#[async_trait]
impl Tool for BrowserTool {
    fn name(&self) -> &str {
        "browser_action"
    }

    fn description(&self) -> &str {
        "Payload: url|action|[selector]|[value]\n   - Actions: goto_and_screenshot, extract_html, click, type\n   - Use: Physically controlling a headless Chrome browser to test SPAs, log in, or scrape dynamic DOMs."
    }

    async fn invoke(&self, payload: &str) -> Result<String, ToolError> {
        let request = BrowserPayload::parse(payload)?;
        if let Err(e) = validate_url(&request.url) {
            return Ok(format!("[ERROR] Browser Automation Failed: {e}"));
        }

        let step = BrowserStep::from_payload(&request);
        let guard = SessionGuard {
            bin: self.bin.clone(),
            session: format!("ironjudge-{}", uuid::Uuid::new_v4().simple()),
            closed: false,
        };

        let result = self.perform(&guard.session, &request.url, &step).await;
        guard.close().await;

        Ok(match result {
            Ok(out) => out,
            Err(e) => format!("[ERROR] Browser Automation Failed: {e}"),
        })
    }
}
