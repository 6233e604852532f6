// 8.1 pool/shares.rs: share <-> asset conversions at the pool's current NAV.
// every conversion rounds in the pool's favor: mints and payouts floor,
// charges and burns ceil.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PoolError;
use crate::math::{self, Rounding};
use crate::types::Price;

/// The numbers a share conversion depends on, captured from a fresh pool state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareBasis {
    /// Outstanding shares.
    pub supply: Decimal,
    /// Net asset value in asset0 units.
    pub net_value: Decimal,
    /// asset0 per share while no shares exist.
    pub initial_rate: Price,
    pub asset_decimals: u32,
    pub share_decimals: u32,
}

impl ShareBasis {
    pub fn is_genesis(&self) -> bool {
        self.supply.is_zero()
    }

    // outstanding shares backed by nothing: minting or paying out would misprice
    fn ensure_solvent(&self) -> Result<(), PoolError> {
        if !self.is_genesis() && self.net_value <= Decimal::ZERO {
            return Err(PoolError::Insolvent {
                net_value: self.net_value,
            });
        }
        Ok(())
    }

    fn ensure_outstanding(&self) -> Result<(), PoolError> {
        if self.is_genesis() {
            return Err(PoolError::NoSharesOutstanding);
        }
        self.ensure_solvent()
    }

    /// asset0 per share, unrounded.
    pub fn share_price(&self) -> Result<Decimal, PoolError> {
        if self.is_genesis() {
            return Ok(self.initial_rate.value());
        }
        self.ensure_solvent()?;
        Ok(self.net_value / self.supply)
    }

    /// Shares minted for depositing `amount` asset0. Floors.
    pub fn shares_for_deposit(&self, amount: Decimal) -> Result<Decimal, PoolError> {
        self.ensure_solvent()?;
        let shares = if self.is_genesis() {
            math::mul_div(
                amount,
                Decimal::ONE,
                self.initial_rate.value(),
                self.share_decimals,
                Rounding::Down,
            )?
        } else {
            math::mul_div(
                amount,
                self.supply,
                self.net_value,
                self.share_decimals,
                Rounding::Down,
            )?
        };
        Ok(shares)
    }

    /// asset0 charged for minting exactly `shares`. Ceils.
    pub fn cost_of_shares(&self, shares: Decimal) -> Result<Decimal, PoolError> {
        self.ensure_solvent()?;
        let cost = if self.is_genesis() {
            math::round_to(
                math::mul(shares, self.initial_rate.value())?,
                self.asset_decimals,
                Rounding::Up,
            )
        } else {
            math::mul_div(
                shares,
                self.net_value,
                self.supply,
                self.asset_decimals,
                Rounding::Up,
            )?
        };
        Ok(cost)
    }

    /// Shares burned to withdraw exactly `amount` asset0. Ceils.
    pub fn shares_for_withdrawal(&self, amount: Decimal) -> Result<Decimal, PoolError> {
        self.ensure_outstanding()?;
        Ok(math::mul_div(
            amount,
            self.supply,
            self.net_value,
            self.share_decimals,
            Rounding::Up,
        )?)
    }

    /// asset0 paid for redeeming exactly `shares`. Floors.
    pub fn assets_for_redemption(&self, shares: Decimal) -> Result<Decimal, PoolError> {
        self.ensure_outstanding()?;
        Ok(math::mul_div(
            shares,
            self.net_value,
            self.supply,
            self.asset_decimals,
            Rounding::Down,
        )?)
    }
}
