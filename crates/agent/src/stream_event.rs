//! Telemetry events emitted by the engine.
//!
//! One event per loop transition, in order. The gateway forwards them as
//! SSE frames and the CLI renders or prints them as JSON lines.
//!
//! Wire shape: a flat JSON object discriminated by `event`
//! (`"AGENT_START"`, `"ITERATION_START"`, …) with snake_case fields.

use serde::{Deserialize, Serialize};

use crate::parser::Enforcement;

/// Maximum characters of a tool's output carried in `TOOL_RESULT`.
pub const OUTPUT_SNIPPET_CHARS: usize = 200;

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HaltReason {
    /// The iteration budget ran out.
    MaxIterations,
    /// The completion service failed fatally.
    ApiDisruption,
    /// The model issued `[ENFORCE: TERMINATE]`.
    TerminateAchieved,
}

impl HaltReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaxIterations => "MAX_ITERATIONS",
            Self::ApiDisruption => "API_DISRUPTION",
            Self::TerminateAchieved => "TERMINATE_ACHIEVED",
        }
    }
}

impl std::fmt::Display for HaltReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TelemetryEvent {
    /// The run has started.
    AgentStart {
        message: String,
        registered_tools: Vec<String>,
    },

    IterationStart { iteration: u32 },

    /// About to call the completion service.
    LlmInferenceStart { iteration: u32 },

    /// The model's parsed reasoning for this iteration.
    ThoughtProcess {
        iteration: u32,
        state_memory: Option<String>,
        logical_extern: Option<String>,
        verdict: Option<String>,
        enforcement: Enforcement,
    },

    /// A registered tool is about to run.
    ToolTriggered {
        tool: String,
        payload: Option<String>,
    },

    /// A tool finished; `output_snippet` is truncated.
    ToolResult { tool: String, output_snippet: String },

    /// The model asked for a tool that is not registered.
    ToolError { message: String },

    NoToolRequested { message: String },

    /// The response could not be parsed; the run continues.
    FormatViolation { error: String },

    /// The completion service failed; a halt follows.
    ApiError { message: String },

    /// A non-fatal inference failure; the run continues.
    CriticalError { message: String },

    /// Always the last event of a run that was not cancelled.
    EngineHalt {
        reason: HaltReason,
        iterations: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        final_logic: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state_dump: Option<String>,
    },
}

impl TelemetryEvent {
    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AgentStart { .. } => "AGENT_START",
            Self::IterationStart { .. } => "ITERATION_START",
            Self::LlmInferenceStart { .. } => "LLM_INFERENCE_START",
            Self::ThoughtProcess { .. } => "THOUGHT_PROCESS",
            Self::ToolTriggered { .. } => "TOOL_TRIGGERED",
            Self::ToolResult { .. } => "TOOL_RESULT",
            Self::ToolError { .. } => "TOOL_ERROR",
            Self::NoToolRequested { .. } => "NO_TOOL_REQUESTED",
            Self::FormatViolation { .. } => "FORMAT_VIOLATION",
            Self::ApiError { .. } => "API_ERROR",
            Self::CriticalError { .. } => "CRITICAL_ERROR",
            Self::EngineHalt { .. } => "ENGINE_HALT",
        }
    }

    pub fn is_halt(&self) -> bool {
        matches!(self, Self::EngineHalt { .. })
    }

    /// Build a `TOOL_RESULT`, cutting the output to a snippet.
    pub fn tool_result(tool: impl Into<String>, output: &str) -> Self {
        Self::ToolResult {
            tool: tool.into(),
            output_snippet: snippet(output, OUTPUT_SNIPPET_CHARS),
        }
    }
}

fn snippet(output: &str, limit: usize) -> String {
    match output.char_indices().nth(limit) {
        Some((byte, _)) => format!("{}...", &output[..byte]),
        None => output.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_start_wire_shape() {
        let event = TelemetryEvent::AgentStart {
            message: "Booting".into(),
            registered_tools: vec!["bash".into()],
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "event": "AGENT_START",
                "message": "Booting",
                "registered_tools": ["bash"]
            })
        );
    }

    #[test]
    fn thought_process_keeps_missing_fields_as_null() {
        let event = TelemetryEvent::ThoughtProcess {
            iteration: 2,
            state_memory: Some("s".into()),
            logical_extern: None,
            verdict: Some("v".into()),
            enforcement: Enforcement::Proceed,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "THOUGHT_PROCESS");
        assert_eq!(value["logical_extern"], serde_json::Value::Null);
        assert_eq!(value["enforcement"], "PROCEED");
        assert_eq!(value["iteration"], 2);
    }

    #[test]
    fn engine_halt_omits_absent_extras() {
        let json = serde_json::to_string(&TelemetryEvent::EngineHalt {
            reason: HaltReason::ApiDisruption,
            iterations: 1,
            final_logic: None,
            state_dump: None,
        })
        .unwrap();
        assert_eq!(json, r#"{"event":"ENGINE_HALT","reason":"API_DISRUPTION","iterations":1}"#);

        let json = serde_json::to_string(&TelemetryEvent::EngineHalt {
            reason: HaltReason::TerminateAchieved,
            iterations: 3,
            final_logic: Some("done".into()),
            state_dump: None,
        })
        .unwrap();
        assert!(json.contains(r#""final_logic":"done""#));
        assert!(!json.contains("state_dump"));
    }

    #[test]
    fn tool_result_snippet() {
        match TelemetryEvent::tool_result("bash", &"a".repeat(250)) {
            TelemetryEvent::ToolResult { output_snippet, .. } => {
                assert_eq!(output_snippet, format!("{}...", "a".repeat(200)));
            }
            other => panic!("Expected ToolResult, got {other:?}"),
        }
        match TelemetryEvent::tool_result("bash", &"a".repeat(200)) {
            TelemetryEvent::ToolResult { output_snippet, .. } => {
                assert_eq!(output_snippet, "a".repeat(200));
            }
            other => panic!("Expected ToolResult, got {other:?}"),
        }
    }

    #[test]
    fn event_type_matches_wire_tag() {
        let events = vec![
            TelemetryEvent::IterationStart { iteration: 1 },
            TelemetryEvent::LlmInferenceStart { iteration: 1 },
            TelemetryEvent::ToolTriggered {
                tool: "bash".into(),
                payload: None,
            },
            TelemetryEvent::ToolError {
                message: "x".into(),
            },
            TelemetryEvent::NoToolRequested {
                message: "x".into(),
            },
            TelemetryEvent::FormatViolation { error: "x".into() },
            TelemetryEvent::ApiError {
                message: "x".into(),
            },
            TelemetryEvent::CriticalError {
                message: "x".into(),
            },
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["event"], event.event_type());
            assert!(!event.is_halt());
        }
    }

    #[test]
    fn event_deserialization() {
        let json = r#"{"event":"ENGINE_HALT","reason":"MAX_ITERATIONS","iterations":3,"state_dump":"L"}"#;
        let event: TelemetryEvent = serde_json::from_str(json).unwrap();
        assert!(event.is_halt());
        match event {
            TelemetryEvent::EngineHalt {
                reason, state_dump, ..
            } => {
                assert_eq!(reason, HaltReason::MaxIterations);
                assert_eq!(state_dump.as_deref(), Some("L"));
            }
            _ => panic!("Wrong variant"),
        }
    }
}
