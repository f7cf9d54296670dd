//! Prompt construction.
//!
//! The system message is the blueprint with the tool catalog spliced in,
//! followed by the rendered ledger. The user message restates the objective.

use std::path::Path;

use ironjudge_core::tool::ToolDescriptor;
use tracing::{debug, warn};

/// Marker in the blueprint replaced by the tool catalog.
pub const TOOL_REGISTRY_PLACEHOLDER: &str = "{{TOOL_REGISTRY_PLACEHOLDER}}";

const DEFAULT_BLUEPRINT: &str = include_str!("blueprint.md");

/// The operating instructions given to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blueprint {
    template: String,
}

impl Default for Blueprint {
    fn default() -> Self {
        Self {
            template: DEFAULT_BLUEPRINT.to_string(),
        }
    }
}

impl Blueprint {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Load a blueprint from `path`.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let template = std::fs::read_to_string(path)?;
        if !template.contains(TOOL_REGISTRY_PLACEHOLDER) {
            warn!(
                path = %path.display(),
                "Blueprint has no {TOOL_REGISTRY_PLACEHOLDER}; the model will not see the tool catalog"
            );
        }
        debug!(path = %path.display(), bytes = template.len(), "Loaded blueprint");
        Ok(Self { template })
    }

    /// Load `path` when given, else the built-in blueprint.
    pub fn load(path: Option<&Path>) -> std::io::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// The full system message for one iteration.
    pub fn build_system_prompt(&self, tools: &[ToolDescriptor], ledger: &str) -> String {
        let rendered = self
            .template
            .replace(TOOL_REGISTRY_PLACEHOLDER, &render_catalog(tools));
        format!("{rendered}\n\n{ledger}")
    }
}

/// Numbered tool catalog, one entry per registered tool.
pub fn render_catalog(tools: &[ToolDescriptor]) -> String {
    tools
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}. **{}**\n   - {}\n", i + 1, t.name, t.description))
        .collect()
}

pub fn user_message(objective: &str) -> String {
    format!("USER OBJECTIVE: {objective}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, description: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.into(),
            description: description.into(),
        }
    }

    #[test]
    fn catalog_format() {
        let tools = vec![
            descriptor("bash", "Payload: cmd"),
            descriptor("echo", "Echoes"),
        ];
        assert_eq!(
            render_catalog(&tools),
            "1. **bash**\n   - Payload: cmd\n2. **echo**\n   - Echoes\n"
        );
        assert_eq!(render_catalog(&[]), "");
    }

    #[test]
    fn system_prompt_splices_catalog_then_ledger() {
        let blueprint = Blueprint::new("RULES\n{{TOOL_REGISTRY_PLACEHOLDER}}END");
        let prompt = blueprint.build_system_prompt(&[descriptor("a", "b")], "LEDGER");
        assert_eq!(prompt, "RULES\n1. **a**\n   - b\nEND\n\nLEDGER");
    }

    #[test]
    fn default_blueprint_has_placeholder() {
        let blueprint = Blueprint::default();
        assert!(blueprint.template().contains(TOOL_REGISTRY_PLACEHOLDER));
        assert!(blueprint.template().contains("<judge_process>"));
        let prompt = blueprint.build_system_prompt(&[descriptor("bash", "x")], "L");
        assert!(!prompt.contains(TOOL_REGISTRY_PLACEHOLDER));
        assert!(prompt.contains("1. **bash**"));
    }

    #[test]
    fn loads_blueprint_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.md");
        std::fs::write(&path, "CUSTOM {{TOOL_REGISTRY_PLACEHOLDER}}").unwrap();

        let blueprint = Blueprint::load(Some(&path)).unwrap();
        assert_eq!(blueprint.template(), "CUSTOM {{TOOL_REGISTRY_PLACEHOLDER}}");
        assert!(Blueprint::load(Some(&dir.path().join("missing.md"))).is_err());
        assert_eq!(Blueprint::load(None).unwrap(), Blueprint::default());
    }

    #[test]
    fn user_message_format() {
        assert_eq!(user_message("list files"), "USER OBJECTIVE: list files");
    }
}
