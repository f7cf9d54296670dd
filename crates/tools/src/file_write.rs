//! File write tool: write or create files with path validation.

use async_trait::async_trait;
use ironjudge_core::error::ToolError;
use ironjudge_core::tool::Tool;
use tracing::debug;

use crate::path_guard::PathGuard;
use crate::payload::{ToolPayload, WriteFilePayload};

pub struct FileWriteTool {
    guard: PathGuard,
}

impl FileWriteTool {
    /// Create a file write tool with no path restrictions.
    pub fn new() -> Self {
        Self::with_guard(PathGuard::permissive())
    }

    pub fn with_guard(guard: PathGuard) -> Self {
        Self { guard }
    }
}

impl Default for FileWriteTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FileWriteTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Payload: filepath|content \n   - Use: Writing or overwriting a file with the provided content."
    }

    async fn invoke(&self, payload: &str) -> Result<String, ToolError> {
        let WriteFilePayload { path, content } = WriteFilePayload::parse(payload)?;

        let resolved = self
            .guard
            .check(&path)
            .map_err(|e| ToolError::PermissionDenied {
                tool_name: "write_file".into(),
                reason: e.to_string(),
            })?;

        if let Some(parent) = resolved.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return Ok(format!("[ERROR] Failed to write to {path}: {e}"));
        }

        match tokio::fs::write(&resolved, content.as_bytes()).await {
            Ok(()) => {
                debug!(path = %resolved.display(), bytes = content.len(), "Wrote file");
                Ok(format!("[SUCCESS] Wrote to {path} successfully."))
            }
            Err(e) => Ok(format!("[ERROR] Failed to write to {path}: {e}")),
        }
    }
}
