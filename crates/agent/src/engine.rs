//! The execution engine: a bounded think → act → observe loop.
//!
//! Each iteration renders the ledger into the prompt, asks the completion
//! service for the next directive, then parses it and acts on the enforcement
//! tag. Every transition is reported as a [`TelemetryEvent`].
//!
//! # Termination
//!
//! A run ends with exactly one `ENGINE_HALT`:
//! - `TERMINATE_ACHIEVED` when the model issues `[ENFORCE: TERMINATE]`
//! - `API_DISRUPTION` when the completion service fails fatally
//! - `MAX_ITERATIONS` when the budget is spent
//!
//! Malformed responses, empty completions and tool failures are recorded in
//! the ledger and the loop carries on; they never end a run by themselves.
//!
//! # Streaming
//!
//! [`Engine::stream`] runs the loop on a spawned task and hands back the
//! receiving end of the event channel. The channel holds a single event,
//! so the loop only advances as fast as the consumer pulls. Dropping the
//! receiver cancels the run at its next event.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use ironjudge_config::AppConfig;
use ironjudge_core::error::{Error, ToolError};
use ironjudge_core::memory::VectorMemory;
use ironjudge_core::provider::{API_ERROR_MARKER, Provider, ProviderRequest};
use ironjudge_core::tool::{Tool, ToolRegistry, registry_miss_message};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::ledger::{Ledger, LedgerWindows};
use crate::parser::{self, FormatViolation, ParsedDirective};
use crate::prompt::{self, Blueprint};
use crate::stream_event::{HaltReason, TelemetryEvent};

/// One pending event; each emit waits for the consumer.
const EVENT_BUFFER: usize = 1;

const NO_TOOL_MESSAGE: &str = "Enforcement tag received but no physical tool was designated.";

/// The corrective instruction recorded after a malformed response.
pub fn self_heal_message(violation: &FormatViolation) -> String {
    format!(
        "SYSTEM OVERRIDE: Invalid output format. {violation} You MUST output the <judge_process> \
         XML block containing <state_memory>, <logical_extern>, <verdict>, and optionally \
         <tool_required>, <tool_payload>. End your response with an [ENFORCE: ACTION] tag. \
         Fix immediately."
    )
}

/// The autonomous execution engine.
pub struct Engine {
    /// Completion service.
    provider: Arc<dyn Provider>,
    /// Model name.
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    /// Shared read-only by every run; cloned on write.
    tools: Arc<ToolRegistry>,
    /// Loop budget per run.
    max_iterations: u32,
    windows: LedgerWindows,
    blueprint: Blueprint,
}

/// The outcome of a run driven by [`Engine::execute`].
#[derive(Debug, Clone)]
pub struct RunReport {
    pub halt_reason: HaltReason,
    pub iterations: u32,
    /// The final ledger.
    pub ledger: Ledger,
    /// Every event emitted, in order.
    pub events: Vec<TelemetryEvent>,
}

impl RunReport {
    /// `final_logic` of the halt event, if the model terminated.
    pub fn final_logic(&self) -> Option<&str> {
        self.events.iter().rev().find_map(|e| match e {
            TelemetryEvent::EngineHalt { final_logic, .. } => final_logic.as_deref(),
            _ => None,
        })
    }
}

/// The consumer went away; stop the run.
#[derive(Debug)]
struct Cancelled;

/// Where a run's events go. `Stop` is why delivery can end a run early.
trait EventSink: Send {
    type Stop: Send;

    fn emit(&mut self, event: TelemetryEvent) -> impl Future<Output = Result<(), Self::Stop>> + Send;
}

/// Streams to a consumer that may go away.
struct ChannelSink(mpsc::Sender<TelemetryEvent>);

impl EventSink for ChannelSink {
    type Stop = Cancelled;

    async fn emit(&mut self, event: TelemetryEvent) -> Result<(), Cancelled> {
        self.0.send(event).await.map_err(|_| Cancelled)
    }
}

/// Collects into memory; never stops a run.
struct CollectSink(Vec<TelemetryEvent>);

impl EventSink for CollectSink {
    type Stop = Infallible;

    async fn emit(&mut self, event: TelemetryEvent) -> Result<(), Infallible> {
        self.0.push(event);
        Ok(())
    }
}

struct LoopOutcome {
    reason: HaltReason,
    ledger: Ledger,
}

impl Engine {
    /// Create an engine over `tools` with default limits.
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, tools: ToolRegistry) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
            tools: Arc::new(tools),
            max_iterations: 25,
            windows: LedgerWindows::default(),
            blueprint: Blueprint::default(),
        }
    }

    /// Build an engine with the built-in tools, wired from configuration.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        memory: Arc<dyn VectorMemory>,
    ) -> Result<Self, Error> {
        let tools = ironjudge_tools::default_registry(config, Some(provider.clone()), memory);
        let blueprint = Blueprint::load(config.engine.blueprint_path.as_deref())?;

        Ok(Self::new(provider, &config.model, tools)
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens)
            .with_max_iterations(config.engine.max_iterations)
            .with_windows(LedgerWindows::from(&config.ledger))
            .with_blueprint(blueprint))
    }

    /// Set max iterations. A budget of zero is raised to one.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        if max == 0 {
            warn!("max_iterations must be positive; using 1");
        }
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_windows(mut self, windows: LedgerWindows) -> Self {
        self.windows = windows;
        self
    }

    pub fn with_blueprint(mut self, blueprint: Blueprint) -> Self {
        self.blueprint = blueprint;
        self
    }

    /// Bound every tool dispatch.
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        let tools = Arc::unwrap_or_clone(self.tools);
        self.tools = Arc::new(tools.with_timeout(timeout));
        self
    }

    // ── Bring your own tool ──

    /// Register a tool. Replaces any tool with the same name in place.
    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) {
        info!(tool = %tool.name(), "Registering tool");
        Arc::make_mut(&mut self.tools).register(tool);
    }

    /// Register a closure as a tool.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, description: impl Into<String>, invoke: F)
    where
        F: Fn(&str) -> Result<String, ToolError> + Send + Sync + 'static,
    {
        let name = name.into();
        info!(tool = %name, "Registering tool");
        Arc::make_mut(&mut self.tools).register_fn(name, description, invoke);
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    // ── Running ──

    /// Run to completion and collect every event.
    pub async fn execute(&self, objective: &str) -> RunReport {
        let mut sink = CollectSink(Vec::new());
        let LoopOutcome { reason, ledger } = match self.run_loop(objective, &mut sink).await {
            Ok(outcome) => outcome,
            Err(never) => match never {},
        };

        RunReport {
            halt_reason: reason,
            iterations: ledger.iteration(),
            ledger,
            events: sink.0,
        }
    }

    /// Run on a background task, streaming events as they happen.
    ///
    /// The channel closes after `ENGINE_HALT`. Dropping the receiver stops
    /// the run at its next event.
    pub fn stream(self: &Arc<Self>, objective: impl Into<String>) -> mpsc::Receiver<TelemetryEvent> {
        let (tx, rx) = mpsc::channel::<TelemetryEvent>(EVENT_BUFFER);
        let engine = Arc::clone(self);
        let objective = objective.into();

        tokio::spawn(async move {
            let mut sink = ChannelSink(tx);
            match engine.run_loop(&objective, &mut sink).await {
                Ok(outcome) => debug!(reason = %outcome.reason, "Stream finished"),
                Err(Cancelled) => info!("Event consumer went away; run cancelled"),
            }
        });

        rx
    }

    async fn run_loop<S: EventSink>(&self, objective: &str, sink: &mut S) -> Result<LoopOutcome, S::Stop> {
        let mut ledger = Ledger::new(self.windows);
        let catalog = self.tools.describe_all();
        let user = prompt::user_message(objective);

        info!(
            model = %self.model,
            tools = catalog.len(),
            max_iterations = self.max_iterations,
            "Run started"
        );
        sink.emit(TelemetryEvent::AgentStart {
            message: format!("Booting IronJudge Engine. Objective: {objective}"),
            registered_tools: self.tools.names(),
        })
        .await?;

        loop {
            if ledger.iteration() >= self.max_iterations {
                warn!(iterations = ledger.iteration(), "Iteration budget exhausted");
                let state_dump = ledger.render_for_prompt();
                return halt(sink, ledger, HaltReason::MaxIterations, None, Some(state_dump)).await;
            }

            let iteration = ledger.advance_iteration();
            debug!(iteration, "Iteration started");
            sink.emit(TelemetryEvent::IterationStart { iteration }).await?;

            let system = self
                .blueprint
                .build_system_prompt(&catalog, &ledger.render_for_prompt());
            let request = ProviderRequest::new(&self.model, system, user.clone())
                .with_temperature(self.temperature)
                .with_max_tokens(self.max_tokens);

            sink.emit(TelemetryEvent::LlmInferenceStart { iteration }).await?;

            let raw = match self.provider.complete(request).await {
                Ok(response) if response.content.contains(API_ERROR_MARKER) => {
                    warn!(iteration, "Completion carried the API error marker");
                    sink.emit(TelemetryEvent::ApiError {
                        message: response.content,
                    })
                    .await?;
                    return halt(sink, ledger, HaltReason::ApiDisruption, None, None).await;
                }
                Ok(response) => response.content,
                Err(e) if e.is_fatal() => {
                    warn!(iteration, error = %e, "Completion service failed");
                    sink.emit(TelemetryEvent::ApiError {
                        message: format!("{API_ERROR_MARKER} {e}"),
                    })
                    .await?;
                    return halt(sink, ledger, HaltReason::ApiDisruption, None, None).await;
                }
                Err(e) => {
                    warn!(iteration, error = %e, "Inference failed; continuing");
                    let message = e.to_string();
                    sink.emit(TelemetryEvent::CriticalError {
                        message: message.clone(),
                    })
                    .await?;
                    ledger.record_failure(message);
                    continue;
                }
            };

            match parser::parse(&raw) {
                Ok(directive) => {
                    sink.emit(TelemetryEvent::ThoughtProcess {
                        iteration,
                        state_memory: directive.state_memory.clone(),
                        logical_extern: directive.logical_extern.clone(),
                        verdict: directive.verdict.clone(),
                        enforcement: directive.enforcement,
                    })
                    .await?;

                    if directive.enforcement.is_terminal() {
                        info!(iteration, "Model terminated the run");
                        let final_logic = directive.logical_extern;
                        return halt(sink, ledger, HaltReason::TerminateAchieved, final_logic, None)
                            .await;
                    }

                    self.act(sink, &mut ledger, directive).await?;
                }
                Err(violation) => {
                    warn!(iteration, error = %violation, "Format violation; asking the model to correct");
                    sink.emit(TelemetryEvent::FormatViolation {
                        error: violation.to_string(),
                    })
                    .await?;
                    ledger.record_failure(self_heal_message(&violation));
                }
            }
        }
    }

    /// Handle a PROCEED, PURGE or PIVOT directive.
    async fn act<S: EventSink>(
        &self,
        sink: &mut S,
        ledger: &mut Ledger,
        directive: ParsedDirective,
    ) -> Result<(), S::Stop> {
        ledger.record_action(format!("Agent Action: {}", directive.enforcement));

        let tool = directive.tool_required.filter(|t| !t.is_empty());
        match tool {
            Some(tool) if self.tools.contains(&tool) => {
                sink.emit(TelemetryEvent::ToolTriggered {
                    tool: tool.clone(),
                    payload: directive.tool_payload.clone(),
                })
                .await?;

                let payload = directive.tool_payload.as_deref().unwrap_or_default();
                debug!(tool = %tool, payload_len = payload.len(), "Dispatching tool");
                let output = self.tools.dispatch(&tool, payload).await;

                let event = TelemetryEvent::tool_result(tool.clone(), &output);
                ledger.record_tool_output(tool, output);
                sink.emit(event).await
            }
            Some(tool) => {
                warn!(tool = %tool, "Model requested an unregistered tool");
                let message = registry_miss_message(&tool);
                ledger.record_tool_output(tool, message.clone());
                sink.emit(TelemetryEvent::ToolError { message }).await
            }
            None => {
                sink.emit(TelemetryEvent::NoToolRequested {
                    message: NO_TOOL_MESSAGE.into(),
                })
                .await
            }
        }
    }
}

async fn halt<S: EventSink>(
    sink: &mut S,
    ledger: Ledger,
    reason: HaltReason,
    final_logic: Option<String>,
    state_dump: Option<String>,
) -> Result<LoopOutcome, S::Stop> {
    let iterations = ledger.iteration();
    info!(reason = %reason, iterations, "Engine halted");
    sink.emit(TelemetryEvent::EngineHalt {
        reason,
        iterations,
        final_logic,
        state_dump,
    })
    .await?;
    Ok(LoopOutcome { reason, ledger })
}
