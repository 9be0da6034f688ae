use thiserror::Error;

/// Errors raised while reading simulation settings
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(String),

    #[error("Setting {key} must be {expected}")]
    InvalidType { key: String, expected: &'static str },

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Invalid distribution spec: {0}")]
    InvalidDistribution(String),

    #[error("Unknown class: {0}")]
    UnknownClass(String),

    #[error("Unknown name: {0}")]
    UnknownName(String),

    #[error("{child} cannot extend {parent} because {parent} is missing")]
    UnknownParent { child: String, parent: String },

    #[error("{0} has an extending loop")]
    ExtendsCycle(String),

    #[error("Inconsistent settings: {0}")]
    Inconsistent(String),

    #[error("Setting {key} is no longer supported; use {replacement}")]
    Deprecated { key: String, replacement: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
