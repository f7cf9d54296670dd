//! `ironjudge run`: drive the engine toward an objective in the terminal.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use ironjudge_agent::{Engine, HaltReason, TelemetryEvent};
use ironjudge_config::AppConfig;
use ironjudge_core::memory::VectorMemory;
use ironjudge_core::provider::Provider;
use ironjudge_memory::InMemoryVectorStore;
use ironjudge_providers::OpenAiCompatProvider;
use tracing::warn;

/// Where the final ledger goes when the budget runs out.
const FAILED_STATE_LOG: &str = "failed_state.log";

pub async fn run(
    config_path: Option<&Path>,
    objective: Option<String>,
    json: bool,
    max_iterations: Option<u32>,
) -> anyhow::Result<()> {
    let mut config = super::load_config(config_path)?;
    if let Some(max) = max_iterations {
        config.engine.max_iterations = max;
        config.validate().context("Invalid --max-iterations")?;
    }

    // Fail before prompting when no key is configured.
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    OPENAI_API_KEY     = 'sk-...'");
        eprintln!("    IRONJUDGE_API_KEY  = 'sk-...'   (any OpenAI-compatible service)");
        eprintln!();
        eprintln!("  Or add api_key to your config file:");
        eprintln!("    {}", AppConfig::config_path().display());
        eprintln!();
        bail!("No API key found. See above for setup instructions.");
    }

    let objective = match objective {
        Some(objective) => objective,
        None => prompt_objective()?,
    };
    let objective = objective.trim().to_string();
    if objective.is_empty() {
        bail!("The objective must not be empty");
    }

    let provider: Arc<dyn Provider> = Arc::new(OpenAiCompatProvider::from_config(&config)?);
    let memory: Arc<dyn VectorMemory> = Arc::new(InMemoryVectorStore::new(config.memory.dimensions));
    let engine = Arc::new(Engine::from_config(&config, provider, memory)?);

    let mut rx = engine.stream(objective);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut stdout = std::io::stdout();
    loop {
        let event = tokio::select! {
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
            _ = &mut ctrl_c => {
                eprintln!("\n  Interrupted; stopping the run.");
                break;
            }
        };

        if json {
            writeln!(stdout, "{}", serde_json::to_string(&event)?)?;
        } else {
            write!(stdout, "{}", render_event(&event))?;
        }
        stdout.flush()?;

        if let TelemetryEvent::EngineHalt {
            reason: HaltReason::MaxIterations,
            state_dump: Some(dump),
            ..
        } = &event
        {
            match std::fs::write(FAILED_STATE_LOG, dump) {
                Ok(()) if !json => println!("  Final state saved to {FAILED_STATE_LOG}"),
                Ok(()) => {}
                Err(e) => warn!(error = %e, "Could not write {FAILED_STATE_LOG}"),
            }
        }
    }

    Ok(())
}

fn prompt_objective() -> anyhow::Result<String> {
    print!("Enter the objective for IronJudge: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read objective from stdin")?;
    Ok(line)
}

/// Human-readable rendering of one event.
pub fn render_event(event: &TelemetryEvent) -> String {
    match event {
        TelemetryEvent::AgentStart {
            message,
            registered_tools,
        } => format!(
            "⚖️  {message}\n   Tools: {}\n",
            registered_tools.join(", ")
        ),
        TelemetryEvent::IterationStart { iteration } => {
            format!("\n======== ITERATION {iteration} ========\n")
        }
        TelemetryEvent::LlmInferenceStart { .. } => "   >>> Awaiting inference...\n".into(),
        TelemetryEvent::ThoughtProcess {
            state_memory,
            logical_extern,
            verdict,
            enforcement,
            ..
        } => format!(
            "   ┌ State Memory:\n{}   ├ Logical Extern:\n{}   └ Verdict: {}  [ENFORCE: {enforcement}]\n",
            indent(state_memory.as_deref().unwrap_or("-")),
            indent(logical_extern.as_deref().unwrap_or("-")),
            verdict.as_deref().unwrap_or("-"),
        ),
        TelemetryEvent::ToolTriggered { tool, payload } => format!(
            "   ⚙️  {tool} <- {}\n",
            one_line(payload.as_deref().unwrap_or(""))
        ),
        TelemetryEvent::ToolResult {
            tool,
            output_snippet,
        } => format!("   ✅ {tool} -> {}\n", one_line(output_snippet)),
        TelemetryEvent::ToolError { message } => format!("   ❌ {message}\n"),
        TelemetryEvent::NoToolRequested { message } => format!("   ·  {message}\n"),
        TelemetryEvent::FormatViolation { error } => {
            format!("   ⚠️  FORMAT VIOLATION: {error}\n   Self-healing engaged.\n")
        }
        TelemetryEvent::ApiError { message } => format!("   ❌ {message}\n"),
        TelemetryEvent::CriticalError { message } => format!("   ❌ CRITICAL: {message}\n"),
        TelemetryEvent::EngineHalt {
            reason,
            iterations,
            final_logic,
            ..
        } => {
            let headline = match reason {
                HaltReason::TerminateAchieved => "🏁 Objective terminated",
                HaltReason::MaxIterations => "🛑 Max iterations reached, force halt",
                HaltReason::ApiDisruption => "🛑 Halted by completion service disruption",
            };
            let mut out = format!("\n{headline} after {iterations} iteration(s) [{reason}]\n");
            if let Some(logic) = final_logic {
                out.push_str(&indent(logic));
            }
            out
        }
    }
}

fn indent(text: &str) -> String {
    text.lines().map(|l| format!("   │ {l}\n")).collect()
}

fn one_line(text: &str) -> String {
    text.replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironjudge_agent::Enforcement;

    #[test]
    fn renders_thought_process() {
        let out = render_event(&TelemetryEvent::ThoughtProcess {
            iteration: 1,
            state_memory: Some("a\nb".into()),
            logical_extern: None,
            verdict: Some("go".into()),
            enforcement: Enforcement::Proceed,
        });
        assert!(out.contains("   │ a\n   │ b\n"));
        assert!(out.contains("   │ -\n"));
        assert!(out.contains("Verdict: go  [ENFORCE: PROCEED]"));
    }

    #[test]
    fn renders_halt_with_final_logic() {
        let out = render_event(&TelemetryEvent::EngineHalt {
            reason: HaltReason::TerminateAchieved,
            iterations: 2,
            final_logic: Some("All done".into()),
            state_dump: None,
        });
        assert!(out.contains("after 2 iteration(s) [TERMINATE_ACHIEVED]"));
        assert!(out.contains("   │ All done\n"));
    }

    #[test]
    fn tool_output_is_single_line() {
        let out = render_event(&TelemetryEvent::ToolResult {
            tool: "bash".into(),
            output_snippet: "x\ny".into(),
        });
        assert_eq!(out, "   ✅ bash -> x y\n");
    }
}
