//! Error types for the IronJudge domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the engine decides which of
//! them are fatal and which are absorbed into the ledger.

use thiserror::Error;

/// The top-level error type for IronJudge operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- I/O ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures reported by a completion service.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    /// The service answered but the answer carried no usable text.
    #[error("Completion returned no content: {0}")]
    EmptyResponse(String),
}

impl ProviderError {
    /// Whether this failure must halt the run.
    ///
    /// Transport, auth and protocol-level failures are fatal. An empty
    /// completion is not: the engine records it and asks again.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ProviderError::EmptyResponse(_))
    }
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Memory id already exists: {0}")]
    Duplicate(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("{tool_name} execution failed: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("{tool_name} timed out after {timeout_secs} seconds")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Permission denied: {tool_name}: {reason}")]
    PermissionDenied { tool_name: String, reason: String },

    /// Carries the full observation text, e.g.
    /// `Invalid payload for write_file. Expected format: filepath|content`.
    #[error("{0}")]
    InvalidPayload(String),

    #[error("Tool panicked: {0}")]
    Panicked(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 500,
            message: "upstream exploded".into(),
        });
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("upstream exploded"));
    }

    #[test]
    fn only_empty_response_is_recoverable() {
        assert!(!ProviderError::EmptyResponse("no choices".into()).is_fatal());
        assert!(ProviderError::Network("reset".into()).is_fatal());
        assert!(ProviderError::AuthenticationFailed("bad key".into()).is_fatal());
        assert!(ProviderError::RateLimited { retry_after_secs: 5 }.is_fatal());
    }

    #[test]
    fn tool_timeout_displays_seconds() {
        let err = ToolError::Timeout {
            tool_name: "bash".into(),
            timeout_secs: 30,
        };
        assert_eq!(err.to_string(), "bash timed out after 30 seconds");
    }
}
