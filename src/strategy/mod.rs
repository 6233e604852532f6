// 9.0 strategy/: leverage mechanics. the pool owns shares, the strategy owns the position.
// long and short differ only in which leg is volatile. everything else (state, sweep,
// lever up, lever down) is shared and lives in the provided trait methods.
//
// price convention: the pool's feed always answers stable per volatile.
// all pool-level amounts (deposited, borrowed, net value) are in asset0 units.

mod long;
mod rebalance;
mod short;
mod state;

pub use long::LongStrategy;
pub use rebalance::{RebalanceAction, RebalanceHints, RebalanceReport, SweepReport};
pub use short::ShortStrategy;
pub use state::PoolState;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::chain::Chain;
use crate::config::ProtocolConfig;
use crate::exchange::ExchangeError;
use crate::lending::LendingError;
use crate::math::MathError;
use crate::oracle::OracleError;
use crate::pool::Pool;
use crate::token::TokenError;
use crate::types::{Address, Price};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrategyError {
    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("lending market error: {0}")]
    Lending(#[from] LendingError),

    #[error("exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("token error: {0}")]
    Token(#[from] TokenError),

    #[error("math error: {0}")]
    Math(#[from] MathError),

    #[error("pool is insolvent: net value {net_value}")]
    Insolvent { net_value: Decimal },

    #[error("over-levered but no collateral can be withdrawn from the lending market")]
    NoWithdrawableCollateral,

    #[error("pool cannot free {requested} of asset0, only {available} held")]
    InsufficientLiquidity { available: Decimal, requested: Decimal },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Volatile collateral, stable debt.
    Long,
    /// Stable collateral, volatile debt.
    Short,
}

/// The operation set every strategy variant carries.
///
/// Implementors supply the unit conversions between the two legs. The state
/// read, the rebalance algorithm and liquidity release are shared.
pub trait StrategyAdapter {
    fn kind(&self) -> StrategyKind;

    fn address(&self) -> Address;

    /// Value of `amount1` units of asset1 expressed in asset0 units. Unrounded.
    fn debt_to_base(&self, amount1: Decimal, price: Price) -> Result<Decimal, MathError>;

    /// Value of `amount0` units of asset0 expressed in asset1 units. Unrounded.
    fn base_to_debt(&self, amount0: Decimal, price: Price) -> Result<Decimal, MathError>;

    /// Live state: idle balances, position at the lending market, oracle price.
    fn pool_state(
        &self,
        chain: &Chain,
        pool: &Pool,
        config: &ProtocolConfig,
    ) -> Result<PoolState, StrategyError> {
        state::compute(self, chain, pool, config)
    }

    /// One rebalance step toward the pool's target leverage.
    fn rebalance(
        &self,
        chain: &mut Chain,
        pool: &Pool,
        hints: RebalanceHints,
        config: &ProtocolConfig,
    ) -> Result<RebalanceReport, StrategyError> {
        rebalance::run(self, chain, pool, hints, config)
    }

    /// Makes sure the pool holds at least `amount0` idle asset0, pulling the
    /// shortfall out of the lending market. Returns the amount withdrawn.
    fn release_liquidity(
        &self,
        chain: &mut Chain,
        pool: &Pool,
        amount0: Decimal,
    ) -> Result<Decimal, StrategyError> {
        rebalance::release(chain, pool, amount0)
    }
}

/// Strategy chosen at pool construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    Long(LongStrategy),
    Short(ShortStrategy),
}

impl Strategy {
    pub fn new(kind: StrategyKind, address: Address) -> Self {
        match kind {
            StrategyKind::Long => Strategy::Long(LongStrategy::new(address)),
            StrategyKind::Short => Strategy::Short(ShortStrategy::new(address)),
        }
    }

    pub fn kind(&self) -> StrategyKind {
        self.as_adapter().kind()
    }

    pub fn as_adapter(&self) -> &dyn StrategyAdapter {
        match self {
            Strategy::Long(s) => s,
            Strategy::Short(s) => s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_variant_dispatch() {
        let long = Strategy::new(StrategyKind::Long, Address(7));
        let short = Strategy::new(StrategyKind::Short, Address(8));
        assert_eq!(long.kind(), StrategyKind::Long);
        assert_eq!(short.kind(), StrategyKind::Short);
        assert_eq!(short.as_adapter().address(), Address(8));
    }

    #[test]
    fn test_conversions_are_mirrored() {
        let price = Price::new(dec!(2000)).unwrap();
        let long = Strategy::new(StrategyKind::Long, Address(7));
        let short = Strategy::new(StrategyKind::Short, Address(8));

        // long: asset0 = WETH, asset1 = USDC
        assert_eq!(long.as_adapter().debt_to_base(dec!(4000), price).unwrap(), dec!(2));
        assert_eq!(long.as_adapter().base_to_debt(dec!(2), price).unwrap(), dec!(4000));

        // short: asset0 = USDC, asset1 = WETH
        assert_eq!(short.as_adapter().debt_to_base(dec!(2), price).unwrap(), dec!(4000));
        assert_eq!(short.as_adapter().base_to_debt(dec!(4000), price).unwrap(), dec!(2));
    }

    #[test]
    fn test_conversions_overflow_is_an_error() {
        let price = Price::new(dec!(2000)).unwrap();
        let long = Strategy::new(StrategyKind::Long, Address(7));
        let short = Strategy::new(StrategyKind::Short, Address(8));

        assert_eq!(
            long.as_adapter().base_to_debt(Decimal::MAX, price),
            Err(MathError::Overflow)
        );
        assert_eq!(
            short.as_adapter().debt_to_base(Decimal::MAX, price),
            Err(MathError::Overflow)
        );
        let tiny = Price::new(dec!(0.0000001)).unwrap();
        assert_eq!(
            long.as_adapter().debt_to_base(Decimal::MAX, tiny),
            Err(MathError::Overflow)
        );
    }
}
