//! Engine configuration
//!
//! Loaded from the environment with defaults for anything unset:
//! - `FLOWLINE_PARTITION_ID`: partition encoded into generated keys (default: 1)
//! - `FLOWLINE_MAX_STEPS_PER_COMMAND`: element activations allowed while
//!   processing one command (default: 10000)

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Highest partition id that fits into the upper bits of a key
pub const MAX_PARTITION_ID: u16 = 4095;

const PARTITION_ID_VAR: &str = "FLOWLINE_PARTITION_ID";
const MAX_STEPS_VAR: &str = "FLOWLINE_MAX_STEPS_PER_COMMAND";

/// Errors from validating a configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("partition id {0} exceeds the maximum of 4095")]
    PartitionIdOutOfRange(u16),

    #[error("max_steps_per_command must be at least 1")]
    ZeroStepLimit,
}

/// Configuration of one partition engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Partition this engine processes; encoded into every generated key
    pub partition_id: u16,

    /// Upper bound on element activations per inbound command
    pub max_steps_per_command: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            partition_id: 1,
            max_steps_per_command: 10_000,
        }
    }
}

impl EngineConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create configuration from any variable source
    ///
    /// Values that do not parse are ignored with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            partition_id: parse_or(&lookup, PARTITION_ID_VAR, defaults.partition_id),
            max_steps_per_command: parse_or(&lookup, MAX_STEPS_VAR, defaults.max_steps_per_command),
        }
    }

    pub fn with_partition_id(mut self, partition_id: u16) -> Self {
        self.partition_id = partition_id;
        self
    }

    pub fn with_max_steps_per_command(mut self, max_steps: usize) -> Self {
        self.max_steps_per_command = max_steps;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.partition_id > MAX_PARTITION_ID {
            return Err(ConfigError::PartitionIdOutOfRange(self.partition_id));
        }
        if self.max_steps_per_command == 0 {
            return Err(ConfigError::ZeroStepLimit);
        }
        Ok(())
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T
where
    T: std::str::FromStr + Copy + std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(variable = name, value = %raw, %default, "invalid value, using default");
            default
        }),
        None => default,
    }
}
