//! Coordinator configuration.

use serde::{Deserialize, Serialize};

use crate::Error;

/// Tuning for heartbeat, polling and liveness.
///
/// All durations are milliseconds so the struct round-trips through JSON
/// config files unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Medium key holding the registry blob.
    pub registry_key: String,
    /// Re-publish an unchanged descriptor this often to stay alive.
    pub heartbeat_interval_ms: u64,
    /// Peers silent for longer than this are dropped.
    pub liveness_timeout_ms: u64,
    /// Re-read the medium at least this often even without notifications.
    pub poll_interval_ms: u64,
    /// Attempts at finding an unused id before registering anyway.
    pub max_identity_attempts: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            registry_key: "windows".to_string(),
            heartbeat_interval_ms: 1_000,
            liveness_timeout_ms: 5_000,
            poll_interval_ms: 500,
            max_identity_attempts: 8,
        }
    }
}

impl RegistryConfig {
    pub fn validate(&self) -> Result<(), Error> {
        crate::traits::validate_key(&self.registry_key)?;

        if self.heartbeat_interval_ms == 0 {
            return Err(Error::InvalidConfig {
                message: "heartbeat_interval_ms must be positive".to_string(),
            });
        }

        // A peer must get more than one heartbeat in before it can be reaped.
        if self.liveness_timeout_ms <= self.heartbeat_interval_ms {
            return Err(Error::InvalidConfig {
                message: format!(
                    "liveness_timeout_ms ({}) must exceed heartbeat_interval_ms ({})",
                    self.liveness_timeout_ms, self.heartbeat_interval_ms
                ),
            });
        }

        if self.max_identity_attempts == 0 {
            return Err(Error::InvalidConfig {
                message: "max_identity_attempts must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}
