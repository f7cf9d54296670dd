//! Ledger: the bounded, append-only history of a single run.
//!
//! Records what the agent did, what went wrong and what the tools said, and
//! renders a window of that history back into every prompt so the model
//! neither repeats failures nor forgets observations. The ledger is:
//!
//! - **Run-scoped**: created per run, never persisted
//! - **Append-only**: entries never change once recorded
//! - **Bounded on render**: only the most recent entries reach the prompt

use chrono::{DateTime, Utc};
use ironjudge_config::LedgerConfig;
use serde::{Deserialize, Serialize};

const TRUNCATION_MARKER: &str = "... [TRUNCATED]";

// ── Data Structures ───────────────────────────────────────────────────────

/// How much of the ledger each prompt sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerWindows {
    pub actions: usize,
    pub failures: usize,
    pub tool_outputs: usize,
    /// Characters kept per tool output.
    pub output_cap: usize,
}

impl Default for LedgerWindows {
    fn default() -> Self {
        Self {
            actions: 10,
            failures: 5,
            tool_outputs: 5,
            output_cap: 1000,
        }
    }
}

impl From<&LedgerConfig> for LedgerWindows {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            actions: config.action_window,
            failures: config.failure_window,
            tool_outputs: config.tool_output_window,
            output_cap: config.output_cap,
        }
    }
}

/// A single ledger record, stamped with the iteration it happened in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEntry {
    Action {
        iteration: u32,
        description: String,
        at: DateTime<Utc>,
    },
    Failure {
        iteration: u32,
        reason: String,
        at: DateTime<Utc>,
    },
    ToolOutput {
        iteration: u32,
        tool: String,
        output: String,
        at: DateTime<Utc>,
    },
}

impl LedgerEntry {
    pub fn iteration(&self) -> u32 {
        match self {
            Self::Action { iteration, .. }
            | Self::Failure { iteration, .. }
            | Self::ToolOutput { iteration, .. } => *iteration,
        }
    }
}

/// The run's history: three ordered sequences and the iteration counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    actions: Vec<LedgerEntry>,
    failures: Vec<LedgerEntry>,
    tool_outputs: Vec<LedgerEntry>,
    iteration: u32,
    windows: LedgerWindows,
}

// ── Implementation ────────────────────────────────────────────────────────

impl Default for Ledger {
    fn default() -> Self {
        Self::new(LedgerWindows::default())
    }
}

impl Ledger {
    pub fn new(windows: LedgerWindows) -> Self {
        Self {
            actions: Vec::new(),
            failures: Vec::new(),
            tool_outputs: Vec::new(),
            iteration: 0,
            windows,
        }
    }

    /// The current iteration; 0 before the first pass.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Start the next loop pass. Called once per pass, before any record.
    pub fn advance_iteration(&mut self) -> u32 {
        self.iteration += 1;
        self.iteration
    }

    // ── Recording ──

    pub fn record_action(&mut self, description: impl Into<String>) {
        self.actions.push(LedgerEntry::Action {
            iteration: self.iteration,
            description: description.into(),
            at: Utc::now(),
        });
    }

    pub fn record_failure(&mut self, reason: impl Into<String>) {
        self.failures.push(LedgerEntry::Failure {
            iteration: self.iteration,
            reason: reason.into(),
            at: Utc::now(),
        });
    }

    pub fn record_tool_output(&mut self, tool: impl Into<String>, output: impl Into<String>) {
        self.tool_outputs.push(LedgerEntry::ToolOutput {
            iteration: self.iteration,
            tool: tool.into(),
            output: output.into(),
            at: Utc::now(),
        });
    }

    // ── Accessors ──

    pub fn actions(&self) -> &[LedgerEntry] {
        &self.actions
    }

    pub fn failures(&self) -> &[LedgerEntry] {
        &self.failures
    }

    pub fn tool_outputs(&self) -> &[LedgerEntry] {
        &self.tool_outputs
    }

    pub fn windows(&self) -> LedgerWindows {
        self.windows
    }

    // ── Rendering ──

    /// Render the windowed history for injection into the system prompt.
    pub fn render_for_prompt(&self) -> String {
        let mut out = String::from("=== RUNTIME STATE MEMORY ===\n\n");
        out.push_str(&format!("Current Iteration: {}\n\n", self.iteration));

        out.push_str("--- History of Actions ---\n");
        if self.actions.is_empty() {
            out.push_str("(No actions taken yet)\n");
        }
        for entry in tail(&self.actions, self.windows.actions) {
            if let LedgerEntry::Action {
                iteration,
                description,
                ..
            } = entry
            {
                out.push_str(&format!("- [Iter {iteration}] {description}\n"));
            }
        }

        out.push_str("\n--- Known Failures (DO NOT REPEAT) ---\n");
        if self.failures.is_empty() {
            out.push_str("(No recorded failures)\n");
        }
        for entry in tail(&self.failures, self.windows.failures) {
            if let LedgerEntry::Failure {
                iteration, reason, ..
            } = entry
            {
                out.push_str(&format!("- [Iter {iteration}] FAIL: {reason}\n"));
            }
        }

        out.push_str("\n--- Recent Tool Logs ---\n");
        if self.tool_outputs.is_empty() {
            out.push_str("(No tools executed yet)\n");
        }
        for entry in tail(&self.tool_outputs, self.windows.tool_outputs) {
            if let LedgerEntry::ToolOutput {
                iteration,
                tool,
                output,
                ..
            } = entry
            {
                out.push_str(&format!("[{tool} Output | Iter {iteration}]:\n"));
                out.push_str(&truncate(output, self.windows.output_cap));
                out.push('\n');
            }
        }

        out.push_str("============================\n");
        out
    }
}

fn tail(entries: &[LedgerEntry], window: usize) -> &[LedgerEntry] {
    &entries[entries.len().saturating_sub(window)..]
}

/// Keep the first `cap` characters, marking the cut.
fn truncate(output: &str, cap: usize) -> String {
    match output.char_indices().nth(cap) {
        Some((byte, _)) => format!("{}{TRUNCATION_MARKER}", &output[..byte]),
        None => output.to_string(),
    }
}
