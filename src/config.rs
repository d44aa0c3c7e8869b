//! Process-wide configuration, built once at startup and shared read-only

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::access::{AuthConfig, ModeDefaults};
use crate::error::ConfigError;
use crate::wsl::RetryPolicy;

/// Top-level bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Explicit path (or bare name) of the WSL entry executable
    pub entry_executable: String,
    pub auth: AuthConfig,
    pub retry: RetrySettings,
    pub stream: StreamSettings,
    pub modes: ModeDefaults,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            entry_executable: "wsl".to_string(),
            auth: AuthConfig::default(),
            retry: RetrySettings::default(),
            stream: StreamSettings::default(),
            modes: ModeDefaults::default(),
        }
    }
}

/// Retry settings for the spurious interrupted-exit quirk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 500,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.delay_ms))
    }
}

/// Update stream sampling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    pub interval_ms: u64,
    /// Scrollback lines captured per pane for progress inference
    pub capture_lines: u32,
    /// Quiet ticks between heartbeat events
    pub heartbeat_ticks: u32,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            capture_lines: 40,
            heartbeat_ticks: 15,
        }
    }
}

impl StreamSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl BridgeConfig {
    /// Reject values that would make the bridge misbehave at runtime
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entry_executable.trim().is_empty() {
            return Err(ConfigError::Invalid("entry_executable is empty".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".into()));
        }
        if self.stream.interval_ms == 0 {
            return Err(ConfigError::Invalid("stream.interval_ms must be positive".into()));
        }
        if self.auth.required && self.auth.token.is_empty() {
            return Err(ConfigError::Invalid(
                "auth.required is set but auth.token is empty".into(),
            ));
        }
        Ok(())
    }
}

/// Default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wsl-bridge")
}

/// Default configuration file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Load and validate configuration from a TOML file
pub fn load_config(path: &Path) -> Result<BridgeConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    let config: BridgeConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}
