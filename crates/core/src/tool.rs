//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what give the engine the ability to act in the world:
//! execute shell commands, read/write files, search the web, etc.
//! Every tool takes a raw string payload (as written by the model inside
//! `<tool_payload>`) and returns a string observation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ToolError;

/// The core Tool trait.
///
/// Each built-in (bash, read_file, git_action, ...) and every host-supplied
/// tool implements this trait and is registered in the [`ToolRegistry`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "bash", "read_file").
    fn name(&self) -> &str;

    /// Usage text injected into the prompt's tool catalog.
    fn description(&self) -> &str;

    /// Execute the tool with the given payload.
    async fn invoke(&self, payload: &str) -> Result<String, ToolError>;
}

/// Name and usage text of a registered tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
}

/// The observation recorded when the model names a tool nobody registered.
pub fn registry_miss_message(name: &str) -> String {
    format!("[ERROR] Tool '{name}' requested but is not registered in the BYOT registry.")
}

/// The observation recorded when a registered tool fails.
pub fn tool_failure_message(cause: impl std::fmt::Display) -> String {
    format!("[ERROR] Tool failed: {cause}")
}

/// The observation recorded when a tool rejects its payload.
pub fn invalid_payload_message(cause: impl std::fmt::Display) -> String {
    format!("[ERROR] {cause}")
}

type BlockingInvoke = dyn Fn(&str) -> Result<String, ToolError> + Send + Sync;

/// Adapter turning a plain closure into a [`Tool`].
///
/// The closure runs on the blocking pool, so it may call synchronous
/// subprocess or database APIs without stalling the runtime.
pub struct FnTool {
    name: String,
    description: String,
    invoke: Arc<BlockingInvoke>,
}

impl FnTool {
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, invoke: F) -> Self
    where
        F: Fn(&str) -> Result<String, ToolError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            invoke: Arc::new(invoke),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn invoke(&self, payload: &str) -> Result<String, ToolError> {
        let invoke = self.invoke.clone();
        let payload = payload.to_string();
        match tokio::task::spawn_blocking(move || invoke(&payload)).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(ToolError::Panicked(panic_message(e.into_panic()))),
            Err(e) => Err(ToolError::ExecutionFailed {
                tool_name: self.name.clone(),
                reason: e.to_string(),
            }),
        }
    }
}

/// A registry of available tools, kept in registration order.
///
/// The engine uses this to:
/// 1. Render the tool catalog injected into the prompt
/// 2. Dispatch the tool the model asked for
///
/// Registering a name twice replaces the earlier tool in place.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
    timeout: Option<Duration>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every dispatch by `timeout`, on top of the tools' own limits.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&slot) => {
                debug!(tool = %name, "Replacing registered tool");
                self.tools[slot] = tool;
            }
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Register a closure as a tool.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, description: impl Into<String>, invoke: F)
    where
        F: Fn(&str) -> Result<String, ToolError> + Send + Sync + 'static,
    {
        self.register(Arc::new(FnTool::new(name, description, invoke)));
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&slot| &self.tools[slot])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All registered tools in registration order.
    pub fn describe_all(&self) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .map(|t| ToolDescriptor {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect()
    }

    /// List all registered tool names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke `name` with `payload` and return its observation.
    ///
    /// Never fails: a missing tool yields [`registry_miss_message`], and any
    /// error, panic or timeout inside the tool yields [`tool_failure_message`].
    pub async fn dispatch(&self, name: &str, payload: &str) -> String {
        let Some(tool) = self.get(name).cloned() else {
            warn!(tool = %name, "Dispatch to unregistered tool");
            return registry_miss_message(name);
        };

        let owned_payload = payload.to_string();
        let mut task = tokio::spawn(async move { tool.invoke(&owned_payload).await });

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    task.abort();
                    warn!(tool = %name, secs = limit.as_secs(), "Tool dispatch timed out");
                    return tool_failure_message(ToolError::Timeout {
                        tool_name: name.to_string(),
                        timeout_secs: limit.as_secs(),
                    });
                }
            },
            None => task.await,
        };

        match joined {
            Ok(Ok(output)) => output,
            Ok(Err(e @ ToolError::InvalidPayload(_))) => {
                warn!(tool = %name, error = %e, "Tool rejected its payload");
                invalid_payload_message(e)
            }
            Ok(Err(e)) => {
                warn!(tool = %name, error = %e, "Tool invocation failed");
                tool_failure_message(e)
            }
            Err(e) if e.is_panic() => {
                let cause = ToolError::Panicked(panic_message(e.into_panic()));
                warn!(tool = %name, error = %cause, "Tool invocation panicked");
                tool_failure_message(cause)
            }
            Err(e) => tool_failure_message(e),
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the payload"
        }
        async fn invoke(&self, payload: &str) -> Result<String, ToolError> {
            Ok(payload.to_string())
        }
    }

    struct SleepyTool;

    #[async_trait]
    impl Tool for SleepyTool {
        fn name(&self) -> &str {
            "sleepy"
        }
        fn description(&self) -> &str {
            "Never finishes in time"
        }
        async fn invoke(&self, _payload: &str) -> Result<String, ToolError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".into())
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert!(registry.contains("echo"));
    }

    #[test]
    fn describe_all_keeps_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register_fn("zeta", "last alphabetically", |_| Ok(String::new()));
        registry.register_fn("alpha", "first alphabetically", |_| Ok(String::new()));
        registry.register(Arc::new(EchoTool));

        let names: Vec<_> = registry.describe_all().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "echo"]);
    }

    #[tokio::test]
    async fn overwrite_replaces_in_place() {
        let mut registry = ToolRegistry::new();
        registry.register_fn("a", "first", |_| Ok("one".into()));
        registry.register_fn("b", "second", |_| Ok("two".into()));
        registry.register_fn("a", "replaced", |_| Ok("uno".into()));

        assert_eq!(registry.len(), 2);
        let catalog = registry.describe_all();
        assert_eq!(catalog[0].name, "a");
        assert_eq!(catalog[0].description, "replaced");
        assert_eq!(registry.dispatch("a", "").await, "uno");
    }

    #[tokio::test]
    async fn dispatch_invokes_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        assert_eq!(registry.dispatch("echo", "hello world").await, "hello world");
    }

    #[tokio::test]
    async fn dispatch_missing_tool_returns_sentinel() {
        let registry = ToolRegistry::new();
        let out = registry.dispatch("nonexistent", "x").await;
        assert_eq!(out, registry_miss_message("nonexistent"));
        assert!(out.starts_with("[ERROR]"));
    }

    #[tokio::test]
    async fn dispatch_contains_errors() {
        let mut registry = ToolRegistry::new();
        registry.register_fn("broken", "always fails", |_| {
            Err(ToolError::ExecutionFailed {
                tool_name: "broken".into(),
                reason: "disk full".into(),
            })
        });
        let out = registry.dispatch("broken", "x").await;
        assert_eq!(out, "[ERROR] Tool failed: broken execution failed: disk full");
    }

    #[tokio::test]
    async fn dispatch_reports_rejected_payload_without_failure_prefix() {
        let mut registry = ToolRegistry::new();
        registry.register_fn("pair", "needs a|b", |_| {
            Err(ToolError::InvalidPayload(
                "Invalid payload for pair. Expected: a|b".into(),
            ))
        });
        let out = registry.dispatch("pair", "x").await;
        assert_eq!(out, "[ERROR] Invalid payload for pair. Expected: a|b");
    }

    #[tokio::test]
    async fn dispatch_contains_panics() {
        let mut registry = ToolRegistry::new();
        registry.register_fn("boom", "panics", |_| panic!("kaboom"));
        let out = registry.dispatch("boom", "x").await;
        assert!(out.starts_with("[ERROR] Tool failed:"), "{out}");
        assert!(out.contains("kaboom"), "{out}");
    }

    #[tokio::test(start_paused = true)]
    async fn dispatch_times_out() {
        let mut registry = ToolRegistry::new().with_timeout(Duration::from_secs(5));
        registry.register(Arc::new(SleepyTool));
        let out = registry.dispatch("sleepy", "").await;
        assert_eq!(out, "[ERROR] Tool failed: sleepy timed out after 5 seconds");
    }
}
