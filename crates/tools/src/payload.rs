//! Typed payloads for the multi-field built-in tools.
//!
//! A payload arrives as the raw text of `<tool_payload>`. Two shapes are
//! accepted:
//! - a JSON object whose keys match the record's fields, and
//! - the `|`-delimited form (`path|content`), split into at most
//!   [`ToolPayload::MAX_FIELDS`] pieces so the last field may contain `|`.

use ironjudge_core::error::ToolError;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// A tool payload record decodable from JSON or from `|`-separated fields.
pub trait ToolPayload: DeserializeOwned + Sized {
    /// Tool name used in error messages.
    const TOOL: &'static str;

    /// Human-readable `|` format, e.g. `filepath|content`.
    const FORMAT: &'static str;

    /// Lead-in before [`Self::FORMAT`] in the rejection message.
    const EXPECTED: &'static str = "Expected";

    /// The observation returned for a payload that does not decode.
    fn rejection() -> String {
        format!(
            "Invalid payload for {}. {}: {}",
            Self::TOOL,
            Self::EXPECTED,
            Self::FORMAT
        )
    }

    const MAX_FIELDS: usize;

    /// Build from the split fields; `None` when required fields are missing.
    fn from_fields(fields: &[&str]) -> Option<Self>;

    fn parse(raw: &str) -> Result<Self, ToolError> {
        let trimmed = raw.trim();
        if trimmed.starts_with('{') {
            return serde_json::from_str(trimmed).map_err(|e| {
                ToolError::InvalidPayload(format!("{} (JSON object rejected: {e})", Self::rejection()))
            });
        }

        let fields: Vec<&str> = raw.splitn(Self::MAX_FIELDS, '|').collect();
        Self::from_fields(&fields).ok_or_else(|| ToolError::InvalidPayload(Self::rejection()))
    }
}

/// Trimmed field `i`, empty when absent.
fn field(fields: &[&str], i: usize) -> String {
    fields.get(i).map(|f| f.trim().to_string()).unwrap_or_default()
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WriteFilePayload {
    pub path: String,
    pub content: String,
}

impl ToolPayload for WriteFilePayload {
    const TOOL: &'static str = "write_file";
    const FORMAT: &'static str = "filepath|content";
    const EXPECTED: &'static str = "Expected format";
    const MAX_FIELDS: usize = 2;

    fn from_fields(fields: &[&str]) -> Option<Self> {
        let [path, content] = fields else {
            return None;
        };
        // Content is written verbatim.
        Some(Self {
            path: non_empty(path.trim().to_string())?,
            content: (*content).to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnalyzeImagePayload {
    pub path: String,
    pub question: String,
}

impl ToolPayload for AnalyzeImagePayload {
    const TOOL: &'static str = "analyze_image";
    const FORMAT: &'static str = "filepath|question";
    const EXPECTED: &'static str = "Expected format";
    const MAX_FIELDS: usize = 2;

    fn from_fields(fields: &[&str]) -> Option<Self> {
        if fields.len() != 2 {
            return None;
        }
        Some(Self {
            path: non_empty(field(fields, 0))?,
            question: field(fields, 1),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitPayload {
    pub repo: String,
    pub action: String,
    /// Branch name, or the remote URL for `clone`
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub message: String,
}

impl ToolPayload for GitPayload {
    const TOOL: &'static str = "git_action";
    const FORMAT: &'static str = "repo_path|action|[branch]|[message]";
    const MAX_FIELDS: usize = 4;

    fn from_fields(fields: &[&str]) -> Option<Self> {
        if fields.len() < 2 {
            return None;
        }
        Some(Self {
            repo: non_empty(field(fields, 0))?,
            action: non_empty(field(fields, 1))?,
            branch: field(fields, 2),
            message: field(fields, 3),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BrowserPayload {
    pub url: String,
    pub action: String,
    #[serde(default)]
    pub selector: String,
    #[serde(default)]
    pub value: String,
}

impl ToolPayload for BrowserPayload {
    const TOOL: &'static str = "browser_action";
    const FORMAT: &'static str = "url|action|[selector]|[value]";
    const MAX_FIELDS: usize = 4;

    fn from_fields(fields: &[&str]) -> Option<Self> {
        if fields.len() < 2 {
            return None;
        }
        Some(Self {
            url: non_empty(field(fields, 0))?,
            action: non_empty(field(fields, 1))?,
            selector: field(fields, 2),
            value: field(fields, 3),
        })
    }
}

fn default_kind() -> String {
    "general".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MemoryStorePayload {
    pub text: String,
    #[serde(default = "default_kind", rename = "type")]
    pub kind: String,
}

impl ToolPayload for MemoryStorePayload {
    const TOOL: &'static str = "memory_store";
    const FORMAT: &'static str = "document|[type]";
    const MAX_FIELDS: usize = 2;

    fn from_fields(fields: &[&str]) -> Option<Self> {
        Some(Self {
            text: non_empty(field(fields, 0))?,
            kind: non_empty(field(fields, 1)).unwrap_or_else(default_kind),
        })
    }
}

fn default_count() -> usize {
    3
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MemoryQueryPayload {
    pub query: String,
    #[serde(default = "default_count")]
    pub count: usize,
}

impl ToolPayload for MemoryQueryPayload {
    const TOOL: &'static str = "memory_query";
    const FORMAT: &'static str = "query|[count]";
    const MAX_FIELDS: usize = 2;

    fn from_fields(fields: &[&str]) -> Option<Self> {
        let count = match non_empty(field(fields, 1)) {
            Some(raw) => raw.parse().ok()?,
            None => default_count(),
        };
        Some(Self {
            query: non_empty(field(fields, 0))?,
            count,
        })
    }
}
