//! # Handshake Configuration
//!
//! Defaults: a 20 second timeout and the `nonce` transfer label.
//!
//! # Config File Format
//!
//! ```toml
//! [handshake]
//! timeout_secs = 20
//! nonce_label = "nonce"
//! require_success_for_fast_path = false
//! gate_inbound_requests = true
//! ```

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default handshake timeout in seconds.
pub const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 20;

/// Default scratch-dir and transfer label.
pub const DEFAULT_NONCE_LABEL: &str = "nonce";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML was malformed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A zero timeout would fail every handshake instantly.
    #[error("timeout_secs must be greater than zero")]
    ZeroTimeout,

    /// The transfer label names the scratch directory and cannot be empty.
    #[error("nonce_label must not be empty")]
    EmptyNonceLabel,
}

/// Resource handshake configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HandshakeConfig {
    /// One-shot timeout armed when a handshake starts.
    pub timeout_secs: u64,
    /// Label for the scratch directory and transfers.
    pub nonce_label: String,
    /// Only fast-path requests to peers whose handshake succeeded.
    ///
    /// When `false`, any existing record fast-paths.
    pub require_success_for_fast_path: bool,
    /// Deliver incoming task requests only from verified peers.
    pub gate_inbound_requests: bool,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_HANDSHAKE_TIMEOUT_SECS,
            nonce_label: DEFAULT_NONCE_LABEL.to_string(),
            require_success_for_fast_path: false,
            gate_inbound_requests: true,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    handshake: HandshakeConfig,
}

impl HandshakeConfig {
    /// Timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parse the `[handshake]` table of a TOML document and validate it.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        file.handshake.validate()?;
        Ok(file.handshake)
    }

    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Reject values that would make the protocol unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.nonce_label.is_empty() {
            return Err(ConfigError::EmptyNonceLabel);
        }
        Ok(())
    }

    /// Short timeout for tests.
    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            timeout_secs: 2,
            ..Self::default()
        }
    }
}
