// 9.3 strategy/state.rs: the pool's financial state, recomputed from raw balances every time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{StrategyAdapter, StrategyError};
use crate::chain::Chain;
use crate::config::ProtocolConfig;
use crate::math::{self, MathError, Rounding};
use crate::oracle::PriceOracle;
use crate::pool::{Pool, PoolParameters};
use crate::types::{Leverage, Price};

/// Read model for monitoring and keepers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    /// Idle asset0 held by the pool.
    pub balance0: Decimal,
    /// Idle asset1 held by the pool.
    pub balance1: Decimal,
    /// asset0 supplied to the lending market.
    pub supplied: Decimal,
    /// asset1 owed to the lending market.
    pub debt: Decimal,
    /// supplied + balance0, asset0 units.
    pub deposited: Decimal,
    /// debt valued in asset0 units, rounded up.
    pub borrowed: Decimal,
    /// deposited + value(balance1) - borrowed, asset0 units.
    pub net_value: Decimal,
    /// deposited / net_value. None when net value is not positive.
    pub leverage: Option<Leverage>,
    pub price: Price,
    pub parameters: PoolParameters,
}

impl PoolState {
    pub fn is_solvent(&self) -> bool {
        self.net_value > Decimal::ZERO
    }

    /// True when nothing has been deposited yet (or everything was redeemed).
    pub fn is_empty(&self) -> bool {
        self.deposited.is_zero() && self.balance1.is_zero() && self.debt.is_zero()
    }

    /// borrowed / deposited, zero for an unlevered or empty pool.
    pub fn ltv(&self) -> Decimal {
        if self.deposited.is_zero() {
            return Decimal::ZERO;
        }
        self.borrowed / self.deposited
    }
}

pub(super) fn compute<S: StrategyAdapter + ?Sized>(
    adapter: &S,
    chain: &Chain,
    pool: &Pool,
    config: &ProtocolConfig,
) -> Result<PoolState, StrategyError> {
    let params = pool.parameters();
    let price = chain
        .oracles
        .latest_price(pool.price_feed(), chain.now(), config.max_oracle_age_secs)?;

    let market = chain.market(params.lending_market)?;
    let decimals0 = chain.tokens.decimals(params.asset0)?;

    let balance0 = chain.tokens.balance_of(params.asset0, pool.address());
    let balance1 = chain.tokens.balance_of(params.asset1, pool.address());
    let supplied = market.current_collateral(pool.address(), params.asset0);
    let debt = market.current_debt(pool.address(), params.asset1);

    // liabilities round up, idle assets round down
    let deposited = supplied + balance0;
    let borrowed = math::round_to(adapter.debt_to_base(debt, price)?, decimals0, Rounding::Up);
    let idle1 = math::round_to(adapter.debt_to_base(balance1, price)?, decimals0, Rounding::Down);
    let net_value = deposited + idle1 - borrowed;

    let leverage = if net_value > Decimal::ZERO {
        let ratio = deposited
            .checked_div(net_value)
            .ok_or(MathError::Overflow)?;
        Some(Leverage::from_ratio(ratio))
    } else {
        None
    };

    Ok(PoolState {
        balance0,
        balance1,
        supplied,
        debt,
        deposited,
        borrowed,
        net_value,
        leverage,
        price,
        parameters: params.clone(),
    })
}
