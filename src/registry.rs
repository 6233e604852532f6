// 6.0 registry.rs: name -> address lookup with a single writer.
// consulted once when a pool is built. never on the per-call paths.
//
// keys are colon separated: "<Protocol>:<Role>" or "<Protocol>:<Role>:<Mode>:<Asset>".

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::types::Address;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("registry key '{0}' not found")]
    NotFound(String),

    #[error("{caller} is not the registry owner")]
    Unauthorized { caller: Address },

    #[error("invalid registry key '{0}'")]
    InvalidKey(String),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegistryKey(String);

impl RegistryKey {
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        let invalid = || RegistryError::InvalidKey(raw.to_string());
        if raw.is_empty() || raw.chars().any(char::is_whitespace) {
            return Err(invalid());
        }
        if raw.split(':').any(str::is_empty) {
            return Err(invalid());
        }
        Ok(Self(raw.to_string()))
    }

    fn join(parts: &[&str]) -> Result<Self, RegistryError> {
        Self::parse(&parts.join(":"))
    }

    /// `Aave:LendingPool`
    pub fn protocol_role(protocol: &str, role: &str) -> Result<Self, RegistryError> {
        Self::join(&[protocol, role])
    }

    /// `Uniswap:Router`
    pub fn router(protocol: &str) -> Result<Self, RegistryError> {
        Self::join(&[protocol, "Router"])
    }

    /// `Aave:interest_bearing:USDC`
    pub fn interest_bearing(protocol: &str, asset: &str) -> Result<Self, RegistryError> {
        Self::join(&[protocol, "interest_bearing", asset])
    }

    /// `Aave:debt_bearing:stable:WETH`
    pub fn debt_bearing(protocol: &str, mode: &str, asset: &str) -> Result<Self, RegistryError> {
        Self::join(&[protocol, "debt_bearing", mode, asset])
    }

    /// `PriceFeed:<ShareSymbol>`
    pub fn price_feed(share_symbol: &str) -> Result<Self, RegistryError> {
        Self::join(&["PriceFeed", share_symbol])
    }

    /// Bare asset symbol, e.g. `USDC`.
    pub fn asset(symbol: &str) -> Result<Self, RegistryError> {
        Self::parse(symbol)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(':')
    }
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    owner: Address,
    entries: BTreeMap<RegistryKey, Address>,
}

impl Registry {
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            entries: BTreeMap::new(),
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    // returns the previous value, if any
    pub fn set_address(
        &mut self,
        caller: Address,
        key: RegistryKey,
        value: Address,
    ) -> Result<Option<Address>, RegistryError> {
        self.ensure_owner(caller)?;
        Ok(self.entries.insert(key, value))
    }

    pub fn get_address(&self, key: &RegistryKey) -> Result<Address, RegistryError> {
        self.entries
            .get(key)
            .copied()
            .ok_or_else(|| RegistryError::NotFound(key.to_string()))
    }

    pub fn remove(&mut self, caller: Address, key: &RegistryKey) -> Result<Address, RegistryError> {
        self.ensure_owner(caller)?;
        self.entries
            .remove(key)
            .ok_or_else(|| RegistryError::NotFound(key.to_string()))
    }

    pub fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<(), RegistryError> {
        self.ensure_owner(caller)?;
        self.owner = new_owner;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RegistryKey, &Address)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn ensure_owner(&self, caller: Address) -> Result<(), RegistryError> {
        if caller != self.owner {
            return Err(RegistryError::Unauthorized { caller });
        }
        Ok(())
    }
}
