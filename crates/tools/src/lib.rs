//! Built-in tool implementations for IronJudge.
//!
//! Tools give the engine the ability to interact with the world:
//! run shell commands and Python, read/write files, search the web,
//! inspect images, drive git and a headless browser, and use vector memory.

pub mod analyze_image;
pub mod bash;
pub mod browser;
pub mod file_read;
pub mod file_write;
pub mod git;
pub mod memory;
pub mod path_guard;
pub mod payload;
pub mod process;
pub mod python;
pub mod web_search;

use std::sync::Arc;
use std::time::Duration;

use ironjudge_config::AppConfig;
use ironjudge_core::memory::VectorMemory;
use ironjudge_core::provider::Provider;
use ironjudge_core::tool::ToolRegistry;

pub use path_guard::PathGuard;

/// Create a tool registry with all ten built-in tools, in catalog order.
///
/// `provider` backs `analyze_image`; without one that tool reports vision
/// as unavailable. `memory` backs `memory_store` and `memory_query`.
pub fn default_registry(
    config: &AppConfig,
    provider: Option<Arc<dyn Provider>>,
    memory: Arc<dyn VectorMemory>,
) -> ToolRegistry {
    let tools = &config.tools;
    let command_timeout = Duration::from_secs(tools.command_timeout_secs);
    let guard = PathGuard::from_config(tools);

    let mut registry =
        ToolRegistry::new().with_timeout(Duration::from_secs(config.engine.tool_timeout_secs));
    registry.register(Arc::new(bash::BashTool::new(command_timeout)));
    registry.register(Arc::new(python::PythonTool::new(&tools.python_bin, command_timeout)));
    registry.register(Arc::new(file_read::FileReadTool::with_guard(guard.clone())));
    registry.register(Arc::new(file_write::FileWriteTool::with_guard(guard.clone())));
    registry.register(Arc::new(web_search::WebSearchTool::new(
        &tools.search_endpoint,
        command_timeout,
    )));
    registry.register(Arc::new(analyze_image::AnalyzeImageTool::new(
        provider,
        &config.model,
        guard,
    )));
    registry.register(Arc::new(git::GitTool::new(command_timeout)));
    registry.register(Arc::new(browser::BrowserTool::new(&tools.browser_bin, command_timeout)));
    registry.register(Arc::new(memory::MemoryStoreTool::new(memory.clone())));
    registry.register(Arc::new(memory::MemoryQueryTool::new(memory)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironjudge_memory::InMemoryVectorStore;

    #[test]
    fn registers_ten_builtins_in_order() {
        let registry = default_registry(
            &AppConfig::default(),
            None,
            Arc::new(InMemoryVectorStore::default()),
        );
        assert_eq!(
            registry.names(),
            vec![
                "bash",
                "python",
                "read_file",
                "write_file",
                "web_search",
                "analyze_image",
                "git_action",
                "browser_action",
                "memory_store",
                "memory_query",
            ]
        );
        assert!(
            registry
                .describe_all()
                .iter()
                .all(|d| d.description.starts_with("Payload:"))
        );
    }

    #[tokio::test]
    async fn write_then_read_through_registry() {
        let registry = default_registry(
            &AppConfig::default(),
            None,
            Arc::new(InMemoryVectorStore::default()),
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.txt");
        let path = path.to_str().unwrap();

        let out = registry
            .dispatch("write_file", &format!("{path}|IRONJUDGE_TEST_OK"))
            .await;
        assert!(out.starts_with("[SUCCESS]"), "{out}");
        assert_eq!(registry.dispatch("read_file", path).await, "IRONJUDGE_TEST_OK");
    }

    #[tokio::test]
    async fn malformed_payload_uses_legacy_wording() {
        let registry = default_registry(
            &AppConfig::default(),
            None,
            Arc::new(InMemoryVectorStore::default()),
        );
        let out = registry.dispatch("write_file", "missing-separator").await;
        assert_eq!(
            out,
            "[ERROR] Invalid payload for write_file. Expected format: filepath|content"
        );

        let out = registry.dispatch("git_action", "only-a-path").await;
        assert_eq!(
            out,
            "[ERROR] Invalid payload for git_action. Expected: repo_path|action|[branch]|[message]"
        );
    }
}
