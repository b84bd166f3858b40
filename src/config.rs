// ABOUTME: Lamp selection preferences, discovery/command timeouts, and the broadcast address
// ABOUTME: Supports builder overrides, environment variables, and an optional TOML file
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::env;
use std::num::ParseIntError;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::LampError;

/// Display name the selector prefers (as configured in the vendor app)
pub const DEFAULT_PREFERRED_NAME: &str = "MCP Lamp";

/// Model the selector falls back to when no name matches
pub const DEFAULT_PREFERRED_MODEL: &str = "KL110";

/// How long a discovery probe waits for replies (6 seconds)
const DEFAULT_DISCOVERY_TIMEOUT_SECS: u64 = 6;

/// Upper bound on a single refresh or command (mirrors the discovery timeout)
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 6;

/// Limited broadcast on the Kasa local port
pub const DEFAULT_BROADCAST_ADDR: &str = "255.255.255.255:9999";

/// Configuration for lamp acquisition and control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LampConfig {
    /// Exact display name to prefer during selection
    pub preferred_name: Option<String>,
    /// Exact model identifier to prefer when no name matches
    pub preferred_model: Option<String>,
    /// Maximum time to wait for discovery replies
    #[serde(with = "duration_secs")]
    pub discovery_timeout: Duration,
    /// Maximum time to wait for a single device refresh or command
    #[serde(with = "duration_secs")]
    pub command_timeout: Duration,
    /// Address discovery probes are sent to
    pub broadcast_addr: String,
}

impl Default for LampConfig {
    fn default() -> Self {
        Self {
            preferred_name: Some(DEFAULT_PREFERRED_NAME.to_owned()),
            preferred_model: Some(DEFAULT_PREFERRED_MODEL.to_owned()),
            discovery_timeout: Duration::from_secs(DEFAULT_DISCOVERY_TIMEOUT_SECS),
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
            broadcast_addr: DEFAULT_BROADCAST_ADDR.to_owned(),
        }
    }
}

impl LampConfig {
    /// Set the preferred display name
    #[must_use]
    pub fn with_preferred_name(mut self, name: impl Into<String>) -> Self {
        self.preferred_name = Some(name.into());
        self
    }

    /// Set the preferred model identifier
    #[must_use]
    pub fn with_preferred_model(mut self, model: impl Into<String>) -> Self {
        self.preferred_model = Some(model.into());
        self
    }

    /// Set the discovery timeout
    #[must_use]
    pub const fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Set the per-command timeout
    #[must_use]
    pub const fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the discovery broadcast address
    #[must_use]
    pub fn with_broadcast_addr(mut self, addr: impl Into<String>) -> Self {
        self.broadcast_addr = addr.into();
        self
    }

    /// Apply `LAMP_*` environment overrides on top of the defaults
    ///
    /// # Errors
    ///
    /// Returns `LampError` if a timeout variable is not a whole number of seconds.
    pub fn from_env() -> Result<Self, LampError> {
        Self::default().apply_env(|key| env::var(key).ok())
    }

    /// Apply overrides read through `lookup` (split out so tests avoid the process env)
    fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LampError> {
        if let Some(name) = lookup("LAMP_PREFERRED_NAME") {
            self.preferred_name = non_empty(name);
        }
        if let Some(model) = lookup("LAMP_PREFERRED_MODEL") {
            self.preferred_model = non_empty(model);
        }
        if let Some(raw) = lookup("LAMP_DISCOVERY_TIMEOUT") {
            self.discovery_timeout = parse_timeout(&raw).map_err(|e| {
                LampError::config(format!("Invalid LAMP_DISCOVERY_TIMEOUT '{raw}': {e}"))
            })?;
        }
        if let Some(raw) = lookup("LAMP_COMMAND_TIMEOUT") {
            self.command_timeout = parse_timeout(&raw).map_err(|e| {
                LampError::config(format!("Invalid LAMP_COMMAND_TIMEOUT '{raw}': {e}"))
            })?;
        }
        if let Some(addr) = lookup("LAMP_BROADCAST_ADDR") {
            self.broadcast_addr = addr;
        }
        if self.command_timeout.is_zero() {
            warn!("Command timeout of zero makes every device call fail");
        }
        Ok(self)
    }
}

/// Treat an empty override as "no preference"
fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Parse a timeout value from a string (in seconds)
///
/// # Errors
///
/// Returns an error if the string cannot be parsed as a `u64`.
pub fn parse_timeout(input: &str) -> Result<Duration, ParseIntError> {
    input.trim().parse::<u64>().map(Duration::from_secs)
}

/// Load configuration from a TOML file, falling back to defaults for missing keys
///
/// # Errors
///
/// Returns `LampError` if the file cannot be read or is not valid TOML.
#[cfg(feature = "config-file")]
pub fn load_config_file(path: &std::path::Path) -> Result<LampConfig, LampError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| LampError::config(format!("Failed to read {}: {e}", path.display())))?;
    toml::from_str(&raw)
        .map_err(|e| LampError::config(format!("Invalid config {}: {e}", path.display())))
}

/// Default config file location: `$CONFIG_DIR/lampctl/config.toml`
#[cfg(feature = "config-file")]
pub fn default_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lampctl").join("config.toml"))
}

/// Serialize durations as whole seconds
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
