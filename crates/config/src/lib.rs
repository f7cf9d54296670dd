//! Configuration loading and validation for IronJudge.
//!
//! Loads configuration from `~/.ironjudge/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.ironjudge/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the completion service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model used for reasoning and vision
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per completion; unset lets the service decide
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_temperature() -> f32 {
    0.0
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("engine", &self.engine)
            .field("ledger", &self.ledger)
            .field("tools", &self.tools)
            .field("memory", &self.memory)
            .field("gateway", &self.gateway)
            .finish()
    }
}

/// Loop budget and prompt settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hard cap on think/act/observe cycles per run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Replace the built-in blueprint with this file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blueprint_path: Option<PathBuf>,

    /// Upper bound on any single tool dispatch
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

fn default_max_iterations() -> u32 {
    25
}
fn default_tool_timeout_secs() -> u64 {
    120
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            blueprint_path: None,
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

/// How much history is re-injected into each prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_action_window")]
    pub action_window: usize,

    #[serde(default = "default_failure_window")]
    pub failure_window: usize,

    #[serde(default = "default_tool_output_window")]
    pub tool_output_window: usize,

    /// Characters kept per tool output before truncation
    #[serde(default = "default_output_cap")]
    pub output_cap: usize,
}

fn default_action_window() -> usize {
    10
}
fn default_failure_window() -> usize {
    5
}
fn default_tool_output_window() -> usize {
    5
}
fn default_output_cap() -> usize {
    1000
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            action_window: default_action_window(),
            failure_window: default_failure_window(),
            tool_output_window: default_tool_output_window(),
            output_cap: default_output_cap(),
        }
    }
}

/// Settings shared by the built-in tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Timeout for bash / python / git / browser subprocesses
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    #[serde(default = "default_python_bin")]
    pub python_bin: String,

    /// When non-empty, file tools only touch paths under these roots
    #[serde(default)]
    pub allowed_roots: Vec<PathBuf>,

    /// Paths the file tools always refuse
    #[serde(default = "default_forbidden_paths")]
    pub forbidden_paths: Vec<String>,

    #[serde(default = "default_search_endpoint")]
    pub search_endpoint: String,

    #[serde(default = "default_browser_bin")]
    pub browser_bin: String,
}

fn default_command_timeout_secs() -> u64 {
    30
}
fn default_python_bin() -> String {
    "python3".into()
}
fn default_forbidden_paths() -> Vec<String> {
    vec![
        "/etc/shadow".into(),
        "/etc/sudoers".into(),
        "~/.ssh".into(),
        "~/.gnupg".into(),
        "~/.aws/credentials".into(),
    ]
}
fn default_search_endpoint() -> String {
    "https://api.duckduckgo.com/".into()
}
fn default_browser_bin() -> String {
    "agent-browser".into()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: default_command_timeout_secs(),
            python_bin: default_python_bin(),
            allowed_roots: vec![],
            forbidden_paths: default_forbidden_paths(),
            search_endpoint: default_search_endpoint(),
            browser_bin: default_browser_bin(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Embedding width of the in-process vector store
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

fn default_dimensions() -> usize {
    256
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            dimensions: default_dimensions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.ironjudge/config.toml).
    ///
    /// Environment overrides:
    /// - `IRONJUDGE_API_KEY`, then `OPENAI_API_KEY` (when no key is configured)
    /// - `IRONJUDGE_MODEL`
    /// - `IRONJUDGE_API_URL`
    /// - `IRONJUDGE_MAX_ITERATIONS`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file path, then apply environment
    /// overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply overrides from `lookup` (the process environment in production).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.api_key.is_none() {
            self.api_key = lookup("IRONJUDGE_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(model) = lookup("IRONJUDGE_MODEL") {
            self.model = model;
        }

        if let Some(url) = lookup("IRONJUDGE_API_URL") {
            self.api_url = url;
        }

        if let Some(raw) = lookup("IRONJUDGE_MAX_ITERATIONS") {
            self.engine.max_iterations = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "IRONJUDGE_MAX_ITERATIONS must be a positive integer, got '{raw}'"
                ))
            })?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".ironjudge")
    }

    /// Path of the default config file.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "engine.max_iterations must be greater than 0".into(),
            ));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        let ledger = &self.ledger;
        if ledger.action_window == 0
            || ledger.failure_window == 0
            || ledger.tool_output_window == 0
            || ledger.output_cap == 0
        {
            return Err(ConfigError::ValidationError(
                "ledger windows and output_cap must be greater than 0".into(),
            ));
        }

        if self.memory.dimensions == 0 {
            return Err(ConfigError::ValidationError(
                "memory.dimensions must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
            engine: EngineConfig::default(),
            ledger: LedgerConfig::default(),
            tools: ToolsConfig::default(),
            memory: MemoryConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
