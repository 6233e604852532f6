//! Engine configuration options.

use crate::config::{ConfigError, Environment, ProtocolConfig};
use serde::{Deserialize, Serialize};

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    /// Oracle, slippage and rebalance parameters shared by every pool.
    pub protocol: ProtocolConfig,
}

impl EngineConfig {
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            protocol: environment.config(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.protocol.validate()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            protocol: ProtocolConfig::default(),
        }
    }
}
