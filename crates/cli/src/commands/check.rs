//! `ironjudge check`: exercise the local tools through the registry.

use std::path::Path;
use std::sync::Arc;

use anyhow::bail;
use ironjudge_core::tool::ToolRegistry;
use ironjudge_memory::InMemoryVectorStore;
use ironjudge_tools::default_registry;

const FILE_CONTENT: &str = "File I/O is working perfectly.";

/// One probe: the tool, its payload and the text its output must contain.
struct Probe {
    label: &'static str,
    tool: &'static str,
    payload: String,
    expect: String,
}

pub struct CheckOutcome {
    pub label: &'static str,
    pub passed: bool,
    pub output: String,
}

pub async fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let registry = default_registry(
        &config,
        None,
        Arc::new(InMemoryVectorStore::new(config.memory.dimensions)),
    );
    let scratch = tempfile::tempdir()?;

    println!("=== IronJudge tool check ===");
    let outcomes = run_checks(&registry, scratch.path()).await;

    let mut failed = 0;
    for (i, outcome) in outcomes.iter().enumerate() {
        let mark = if outcome.passed { "✅" } else { "❌" };
        println!("\n[{}] {mark} {}", i + 1, outcome.label);
        println!("    {}", outcome.output.trim());
        if !outcome.passed {
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{failed} tool check(s) failed");
    }
    println!("\nAll local tools are operational.");
    Ok(())
}

/// Dispatch each probe in order, stopping at the first failure.
pub async fn run_checks(registry: &ToolRegistry, scratch: &Path) -> Vec<CheckOutcome> {
    let file = scratch.join("sanity_check.txt");
    let file = file.display();
    let probes = [
        Probe {
            label: "bash",
            tool: "bash",
            payload: r#"echo "Bash tool is working""#.into(),
            expect: "Bash tool is working".into(),
        },
        Probe {
            label: "python",
            tool: "python",
            payload: r#"print("Python tool is working")"#.into(),
            expect: "Python tool is working".into(),
        },
        Probe {
            label: "write_file",
            tool: "write_file",
            payload: format!("{file}|{FILE_CONTENT}"),
            expect: "[SUCCESS]".into(),
        },
        Probe {
            label: "read_file",
            tool: "read_file",
            payload: file.to_string(),
            expect: FILE_CONTENT.into(),
        },
    ];

    let mut outcomes = Vec::with_capacity(probes.len());
    for probe in probes {
        let output = registry.dispatch(probe.tool, &probe.payload).await;
        let passed = output.contains(&probe.expect);
        outcomes.push(CheckOutcome {
            label: probe.label,
            passed,
            output,
        });
        if !passed {
            break;
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stops_at_first_failure() {
        let mut registry = ToolRegistry::new();
        registry.register_fn("bash", "", |_| Ok("Bash tool is working".into()));
        registry.register_fn("python", "", |_| Ok("Traceback".into()));

        let dir = tempfile::tempdir().unwrap();
        let outcomes = run_checks(&registry, dir.path()).await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].passed);
        assert!(!outcomes[1].passed);
    }

    #[tokio::test]
    async fn missing_tool_fails_the_probe() {
        let registry = ToolRegistry::new();
        let dir = tempfile::tempdir().unwrap();
        let outcomes = run_checks(&registry, dir.path()).await;

        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].passed);
        assert!(outcomes[0].output.contains("bash"));
    }
}
