//! File read tool: read file contents with path validation.

use async_trait::async_trait;
use ironjudge_core::error::ToolError;
use ironjudge_core::tool::Tool;

use crate::path_guard::PathGuard;

pub struct FileReadTool {
    guard: PathGuard,
}

impl FileReadTool {
    /// Create a file read tool with no path restrictions.
    pub fn new() -> Self {
        Self::with_guard(PathGuard::permissive())
    }

    pub fn with_guard(guard: PathGuard) -> Self {
        Self { guard }
    }
}

impl Default for FileReadTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FileReadTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Payload: Absolute or relative filepath.\n   - Use: Reading the contents of a file into your logical extern."
    }

    async fn invoke(&self, payload: &str) -> Result<String, ToolError> {
        let path = payload.trim();
        let resolved = self
            .guard
            .check(path)
            .map_err(|e| ToolError::PermissionDenied {
                tool_name: "read_file".into(),
                reason: e.to_string(),
            })?;

        match tokio::fs::read_to_string(&resolved).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(format!("[ERROR] File not found: {path}"))
            }
            Err(e) => Ok(format!("[ERROR] Failed to read {path}: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn read_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("test.txt");
        let mut f = std::fs::File::create(&file_path).unwrap();
        writeln!(f, "Hello, world!").unwrap();

        let tool = FileReadTool::new();
        let out = tool.invoke(file_path.to_str().unwrap()).await.unwrap();
        assert_eq!(out, "Hello, world!\n");
    }

    #[tokio::test]
    async fn payload_whitespace_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("padded.txt");
        std::fs::write(&file_path, "x").unwrap();

        let tool = FileReadTool::new();
        let payload = format!("  {}\n", file_path.display());
        assert_eq!(tool.invoke(&payload).await.unwrap(), "x");
    }

    #[tokio::test]
    async fn read_nonexistent_file() {
        let tool = FileReadTool::new();
        let out = tool.invoke("/nonexistent/file.txt").await.unwrap();
        assert_eq!(out, "[ERROR] File not found: /nonexistent/file.txt");
    }

    #[tokio::test]
    async fn read_directory_fails_descriptively() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FileReadTool::new();
        let out = tool.invoke(dir.path().to_str().unwrap()).await.unwrap();
        assert!(out.starts_with("[ERROR] Failed to read"), "{out}");
    }

    #[tokio::test]
    async fn forbidden_path_blocked() {
        let dir = tempfile::tempdir().unwrap();
        let secret = dir.path().join("id_rsa");
        std::fs::write(&secret, "KEY").unwrap();

        let guard = PathGuard::new(&[], &[dir.path().to_string_lossy().into_owned()]);
        let tool = FileReadTool::with_guard(guard);
        let result = tool.invoke(secret.to_str().unwrap()).await;
        assert!(matches!(result, Err(ToolError::PermissionDenied { .. })));
    }
}
