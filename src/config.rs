//! # Configuration for the Dana Runtime
//!
//! This module collects runtime-wide configuration that would otherwise be
//! scattered through call sites: loop step caps, history limits, conversation
//! memory limits, and the built-in LLM resource's connection settings.
//!
//! ## Environment Variables
//!
//! - `DANA_MOCK_LLM`: when truthy, forces the `"llm"` resource to a
//!   deterministic mock instead of talking to a real server.
//! - `LOG_LEVEL`: sets the default log level (`DEBUG|INFO|WARN|ERROR`).
//! - `DANA_BASE_URL`, `DANA_MODEL`, `DANA_API_KEY`: configure the built-in
//!   OpenAI-compatible HTTP LLM resource.
//!
//! ## Examples
//!
//! ```rust
//! use dana::DanaConfig;
//!
//! let config = DanaConfig::builder()
//!     .base_url("http://localhost:1234/v1")
//!     .model("qwen2.5-32b-instruct")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.max_loop_steps(), 100_000);
//! ```

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{DanaError, Result};

/// Default cap on `while`-loop iterations per top-level submission.
pub const DEFAULT_MAX_LOOP_STEPS: u64 = 100_000;

/// Default cap on the number of entries kept in the REPL history file.
pub const DEFAULT_HISTORY_CAP: usize = 1000;

/// Default cap on turns kept per agent's conversation memory.
pub const DEFAULT_MAX_TURNS: usize = 20;

/// Log levels recognised by `log.<level>(...)` and the `LOG_LEVEL` environment variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err(format!("unknown log level: {s}")),
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

/// Resolve the process's preferred log level from `LOG_LEVEL`, defaulting to `Info`.
pub fn log_level_from_env() -> LogLevel {
    env::var("LOG_LEVEL")
        .ok()
        .and_then(|v| LogLevel::from_str(&v).ok())
        .unwrap_or_default()
}

/// Whether `DANA_MOCK_LLM` is set to a truthy value.
pub fn mock_llm_requested() -> bool {
    match env::var("DANA_MOCK_LLM") {
        Ok(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => false,
    }
}

/// Runtime-wide configuration for the Dana interpreter, REPL, and built-in LLM resource.
#[derive(Debug, Clone)]
pub struct DanaConfig {
    base_url: String,
    model: String,
    api_key: String,
    timeout_secs: u64,
    max_loop_steps: u64,
    history_cap: usize,
    history_path: PathBuf,
    conversation_max_turns: usize,
    conversation_dir: PathBuf,
    log_level: LogLevel,
    mock_llm: bool,
}

impl DanaConfig {
    pub fn builder() -> DanaConfigBuilder {
        DanaConfigBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    pub fn max_loop_steps(&self) -> u64 {
        self.max_loop_steps
    }

    pub fn history_cap(&self) -> usize {
        self.history_cap
    }

    pub fn history_path(&self) -> &PathBuf {
        &self.history_path
    }

    pub fn conversation_max_turns(&self) -> usize {
        self.conversation_max_turns
    }

    pub fn conversation_dir(&self) -> &PathBuf {
        &self.conversation_dir
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn mock_llm(&self) -> bool {
        self.mock_llm
    }
}

impl Default for DanaConfig {
    fn default() -> Self {
        DanaConfigBuilder::default()
            .build()
            .expect("default configuration must be valid")
    }
}

/// Builder for [`DanaConfig`], following the same "optional fields defaulted,
/// required fields validated at `build()`" shape as the rest of the runtime's
/// configuration objects.
#[derive(Debug, Default)]
pub struct DanaConfigBuilder {
    base_url: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
    max_loop_steps: Option<u64>,
    history_cap: Option<usize>,
    history_path: Option<PathBuf>,
    conversation_max_turns: Option<usize>,
    conversation_dir: Option<PathBuf>,
    log_level: Option<LogLevel>,
    mock_llm: Option<bool>,
}

impl DanaConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn max_loop_steps(mut self, steps: u64) -> Self {
        self.max_loop_steps = Some(steps);
        self
    }

    pub fn history_cap(mut self, cap: usize) -> Self {
        self.history_cap = Some(cap);
        self
    }

    pub fn history_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.history_path = Some(path.into());
        self
    }

    pub fn conversation_max_turns(mut self, turns: usize) -> Self {
        self.conversation_max_turns = Some(turns);
        self
    }

    pub fn conversation_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.conversation_dir = Some(dir.into());
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn mock_llm(mut self, mock: bool) -> Self {
        self.mock_llm = Some(mock);
        self
    }

    /// Build the configuration, reading environment overrides for fields left unset.
    pub fn build(self) -> Result<DanaConfig> {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));

        let base_url = self
            .base_url
            .or_else(|| env::var("DANA_BASE_URL").ok())
            .unwrap_or_else(|| "http://localhost:1234/v1".to_string());

        let model = self
            .model
            .or_else(|| env::var("DANA_MODEL").ok())
            .unwrap_or_else(|| "qwen2.5-32b-instruct".to_string());

        if base_url.trim().is_empty() {
            return Err(DanaError::validation("base_url cannot be empty"));
        }
        if model.trim().is_empty() {
            return Err(DanaError::validation("model cannot be empty"));
        }

        Ok(DanaConfig {
            base_url,
            model,
            api_key: self
                .api_key
                .or_else(|| env::var("DANA_API_KEY").ok())
                .unwrap_or_else(|| "not-needed".to_string()),
            timeout_secs: self.timeout_secs.unwrap_or(60),
            max_loop_steps: self.max_loop_steps.unwrap_or(DEFAULT_MAX_LOOP_STEPS),
            history_cap: self.history_cap.unwrap_or(DEFAULT_HISTORY_CAP),
            history_path: self
                .history_path
                .unwrap_or_else(|| home.join(".dana_history")),
            conversation_max_turns: self.conversation_max_turns.unwrap_or(DEFAULT_MAX_TURNS),
            conversation_dir: self
                .conversation_dir
                .unwrap_or_else(|| home.join(".dana").join("chats")),
            log_level: self.log_level.unwrap_or_else(log_level_from_env),
            mock_llm: self.mock_llm.unwrap_or_else(mock_llm_requested),
        })
    }
}
