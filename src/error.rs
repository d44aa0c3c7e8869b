//! Error types for the bridge

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised before or around a bridge operation.
///
/// Ordinary command failure is not represented here: a command that exits
/// non-zero comes back as an [`ExecutionResult`](crate::wsl::ExecutionResult).
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Client input rejected before any subprocess was started
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Key name outside the native key map
    #[error("unsupported key: {0}")]
    UnsupportedKey(String),

    /// Missing or wrong access token
    #[error("unauthorized")]
    Unauthorized,

    /// Native input injection failed
    #[error("input injection failed: {0}")]
    Injection(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BridgeError {
    /// Machine-readable code for structured error payloads
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::UnsupportedKey(_) => "unsupported_key",
            Self::Unauthorized => "unauthorized",
            Self::Injection(_) => "injection_failed",
            Self::Config(_) => "config_error",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
        }
    }

    /// Whether the error was caused by client input rather than the host
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_) | Self::UnsupportedKey(_) | Self::Unauthorized
        )
    }
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// Config file could not be read
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),

    /// TOML parse error
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Semantically invalid value
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
