//! Error types shared across umcp crates.

use thiserror::Error;

/// Errors from tool registration and execution.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool '{name}' not found")]
    UnknownTool { name: String },

    #[error("Tool '{name}' is already registered")]
    DuplicateTool { name: String },

    #[error("Invalid input for tool '{tool}': {message}")]
    InvalidInput { tool: String, message: String },

    #[error("{0}")]
    ExecutionFailed(String),

    #[error("User service returned {status}: {message}")]
    Service { status: u16, message: String },
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file parse error at {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Missing required configuration: {key}")]
    MissingKey { key: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}
