// 7.0 config.rs: protocol-wide settings. oracle freshness, rebalance band, slippage.
// 7.1 presets per environment. pool parameters are per pool and live in pool/.

use serde::{Deserialize, Serialize};

use crate::types::{Bps, Leverage};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    // Oracle rounds older than this fail every NAV-sensitive call
    pub max_oracle_age_secs: u64,
    // Leverage within this many bps of target counts as converged
    pub rebalance_tolerance: Bps,
    // Minimum swap output is the oracle-implied amount less this much
    pub max_slippage: Bps,
    // Upper bound accepted for a pool's target leverage
    pub max_target_leverage: Leverage,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_oracle_age_secs: 3600,
            rebalance_tolerance: Bps::new(100), // 0.01x
            max_slippage: Bps::new(100),        // 1%
            max_target_leverage: Leverage::from_bps(40_000),
        }
    }
}

impl ProtocolConfig {
    // Testnet: loose oracle window, wide band
    pub fn testnet() -> Self {
        Self {
            max_oracle_age_secs: 86_400,
            rebalance_tolerance: Bps::new(500),
            max_slippage: Bps::new(300),
            ..Self::default()
        }
    }

    // Mainnet: fresh prices, tight slippage, lower leverage ceiling
    pub fn mainnet_conservative() -> Self {
        Self {
            max_oracle_age_secs: 900,
            rebalance_tolerance: Bps::new(50),
            max_slippage: Bps::new(50),
            max_target_leverage: Leverage::from_bps(30_000),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_oracle_age_secs == 0 {
            return Err(ConfigError::InvalidOracle {
                reason: "Max oracle age must be positive".to_string(),
            });
        }

        // a slippage floor of 100% would accept any swap
        if self.max_slippage.value() == 0 || self.max_slippage.value() >= 10_000 {
            return Err(ConfigError::InvalidRebalance {
                reason: "Max slippage must be between 0 and 10000 bps".to_string(),
            });
        }

        if self.rebalance_tolerance.value() >= Leverage::SCALE {
            return Err(ConfigError::InvalidRebalance {
                reason: "Tolerance band must be below 1.0x".to_string(),
            });
        }

        if self.max_target_leverage < Leverage::ONE {
            return Err(ConfigError::InvalidLeverage {
                reason: "Max target leverage must be at least 1.0x".to_string(),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid oracle config: {reason}")]
    InvalidOracle { reason: String },

    #[error("invalid rebalance config: {reason}")]
    InvalidRebalance { reason: String },

    #[error("invalid leverage config: {reason}")]
    InvalidLeverage { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testnet,
    Mainnet,
}

impl Environment {
    pub fn config(&self) -> ProtocolConfig {
        match self {
            Environment::Development => ProtocolConfig::default(),
            Environment::Testnet => ProtocolConfig::testnet(),
            Environment::Mainnet => ProtocolConfig::mainnet_conservative(),
        }
    }
}
