// 9.4 strategy/rebalance.rs: one rebalance step.
//
// 1. sweep idle balances: repay debt with idle asset1, sell any asset1 left over,
//    supply every idle asset0
// 2. recompute state from scratch
// 3. inside the tolerance band: stop
// 4. under target: borrow asset1, swap to asset0, supply
// 5. over target: withdraw asset0, swap to asset1, repay
//
// every size is capped by what the market reports right before the call and by the
// caller's hints. a step never aims past target, so repeated calls converge from one side.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{PoolState, StrategyAdapter, StrategyError};
use crate::chain::Chain;
use crate::config::ProtocolConfig;
use crate::math::{self, Rounding};
use crate::pool::Pool;
use crate::types::{Address, Price};

/// Per-call caps. None means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceHints {
    /// Cap on collateral (asset0) withdrawn while levering down.
    pub max_collateral: Option<Decimal>,
    /// Cap on debt (asset1) borrowed while levering up.
    pub max_debt: Option<Decimal>,
}

impl RebalanceHints {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_max_collateral(mut self, amount: Decimal) -> Self {
        self.max_collateral = Some(amount);
        self
    }

    pub fn with_max_debt(mut self, amount: Decimal) -> Self {
        self.max_debt = Some(amount);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub supplied0: Decimal,
    pub repaid1: Decimal,
    pub swapped1: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RebalanceAction {
    None,
    LeverUp {
        borrowed: Decimal,
        received: Decimal,
    },
    LeverDown {
        withdrawn: Decimal,
        received: Decimal,
        repaid: Decimal,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceReport {
    pub before: PoolState,
    pub after: PoolState,
    pub sweep: SweepReport,
    pub action: RebalanceAction,
}

pub(super) fn run<S: StrategyAdapter + ?Sized>(
    adapter: &S,
    chain: &mut Chain,
    pool: &Pool,
    hints: RebalanceHints,
    config: &ProtocolConfig,
) -> Result<RebalanceReport, StrategyError> {
    let before = adapter.pool_state(chain, pool, config)?;
    if before.is_empty() {
        return Ok(RebalanceReport {
            after: before.clone(),
            before,
            sweep: SweepReport::default(),
            action: RebalanceAction::None,
        });
    }

    let sweep = sweep(adapter, chain, pool, &before, config)?;

    // adapters were called, nothing read above is trusted any more
    let state = adapter.pool_state(chain, pool, config)?;
    let leverage = state.leverage.ok_or(StrategyError::Insolvent {
        net_value: state.net_value,
    })?;
    let target = state.parameters.target_leverage;

    let action = if leverage.distance(target) <= config.rebalance_tolerance.value() {
        debug!(pool = %pool.address(), %leverage, %target, "within tolerance band");
        RebalanceAction::None
    } else if leverage < target {
        lever_up(adapter, chain, pool, &state, hints, config)?
    } else {
        lever_down(adapter, chain, pool, &state, hints, config)?
    };

    let after = adapter.pool_state(chain, pool, config)?;
    Ok(RebalanceReport {
        before,
        after,
        sweep,
        action,
    })
}

fn sweep<S: StrategyAdapter + ?Sized>(
    adapter: &S,
    chain: &mut Chain,
    pool: &Pool,
    state: &PoolState,
    config: &ProtocolConfig,
) -> Result<SweepReport, StrategyError> {
    let params = pool.parameters();
    let mut report = SweepReport::default();

    if state.balance1 > Decimal::ZERO && state.debt > Decimal::ZERO {
        let amount = state.balance1.min(state.debt);
        report.repaid1 = repay(chain, pool, amount)?;
    }

    let left1 = chain.tokens.balance_of(params.asset1, pool.address());
    if left1 > Decimal::ZERO {
        let quoted = chain.quote_exact_input(params.exchange, params.asset1, params.asset0, left1)?;
        // dust that rounds to nothing stays where it is
        if quoted > Decimal::ZERO {
            swap(adapter, chain, pool, params.asset1, left1, state.price, config)?;
            report.swapped1 = left1;
        }
    }

    let idle0 = chain.tokens.balance_of(params.asset0, pool.address());
    if idle0 > Decimal::ZERO {
        supply(chain, pool, idle0)?;
        report.supplied0 = idle0;
    }

    if report != SweepReport::default() {
        debug!(
            pool = %pool.address(),
            supplied0 = %report.supplied0,
            repaid1 = %report.repaid1,
            swapped1 = %report.swapped1,
            "swept idle balances"
        );
    }
    Ok(report)
}

fn lever_up<S: StrategyAdapter + ?Sized>(
    adapter: &S,
    chain: &mut Chain,
    pool: &Pool,
    state: &PoolState,
    hints: RebalanceHints,
    config: &ProtocolConfig,
) -> Result<RebalanceAction, StrategyError> {
    let params = pool.parameters();
    let decimals1 = chain.tokens.decimals(params.asset1)?;

    // N * (T - L): the extra collateral that takes leverage exactly to target
    let wanted0 = math::mul(state.net_value, params.target_leverage.as_ratio())? - state.deposited;
    let wanted1 = adapter.base_to_debt(wanted0, state.price)?;

    let available = chain.available_borrows(params.lending_market, pool.address(), params.asset1)?;
    let mut amount = wanted1.min(available);
    if let Some(cap) = hints.max_debt {
        amount = amount.min(cap);
    }
    let amount = math::round_to(amount, decimals1, Rounding::Down);
    if amount <= Decimal::ZERO {
        debug!(pool = %pool.address(), %available, "no borrow capacity, leaving leverage as is");
        return Ok(RebalanceAction::None);
    }

    chain.with_market(params.lending_market, |market, ctx| {
        market.borrow(ctx, pool.address(), params.asset1, amount)
    })?;
    let received = swap(adapter, chain, pool, params.asset1, amount, state.price, config)?;
    supply(chain, pool, received)?;

    debug!(pool = %pool.address(), borrowed = %amount, %received, "levered up");
    Ok(RebalanceAction::LeverUp {
        borrowed: amount,
        received,
    })
}

fn lever_down<S: StrategyAdapter + ?Sized>(
    adapter: &S,
    chain: &mut Chain,
    pool: &Pool,
    state: &PoolState,
    hints: RebalanceHints,
    config: &ProtocolConfig,
) -> Result<RebalanceAction, StrategyError> {
    let params = pool.parameters();
    let decimals0 = chain.tokens.decimals(params.asset0)?;

    // N * (L - T): the collateral that takes leverage exactly to target
    let excess0 = state.deposited - math::mul(state.net_value, params.target_leverage.as_ratio())?;

    let withdrawable = chain.max_withdrawable(params.lending_market, pool.address(), params.asset0)?;
    if withdrawable <= Decimal::ZERO {
        return Err(StrategyError::NoWithdrawableCollateral);
    }
    let mut amount = excess0.min(withdrawable);
    if let Some(cap) = hints.max_collateral {
        amount = amount.min(cap);
    }
    let amount = math::round_to(amount, decimals0, Rounding::Down);
    if amount <= Decimal::ZERO {
        return Ok(RebalanceAction::None);
    }

    chain.with_market(params.lending_market, |market, ctx| {
        market.withdraw(ctx, pool.address(), params.asset0, amount)
    })?;
    let received = swap(adapter, chain, pool, params.asset0, amount, state.price, config)?;
    let debt = chain
        .market(params.lending_market)?
        .current_debt(pool.address(), params.asset1);
    let repaid = if received > Decimal::ZERO && debt > Decimal::ZERO {
        repay(chain, pool, received.min(debt))?
    } else {
        Decimal::ZERO
    };

    debug!(pool = %pool.address(), withdrawn = %amount, %received, %repaid, "levered down");
    Ok(RebalanceAction::LeverDown {
        withdrawn: amount,
        received,
        repaid,
    })
}

// swaps between the two legs with an oracle-derived minimum out
fn swap<S: StrategyAdapter + ?Sized>(
    adapter: &S,
    chain: &mut Chain,
    pool: &Pool,
    asset_in: Address,
    amount_in: Decimal,
    price: Price,
    config: &ProtocolConfig,
) -> Result<Decimal, StrategyError> {
    let params = pool.parameters();
    let (asset_out, expected) = if asset_in == params.asset1 {
        (params.asset0, adapter.debt_to_base(amount_in, price)?)
    } else {
        (params.asset1, adapter.base_to_debt(amount_in, price)?)
    };
    let decimals_out = chain.tokens.decimals(asset_out)?;
    let min_out = math::round_to(
        math::mul(expected, config.max_slippage.complement())?,
        decimals_out,
        Rounding::Down,
    );

    chain
        .tokens
        .approve(asset_in, pool.address(), params.exchange, amount_in)?;
    let received = chain.with_exchange(params.exchange, |exchange, ctx| {
        exchange.swap_exact_input(ctx, pool.address(), asset_in, asset_out, amount_in, min_out)
    })?;
    Ok(received)
}

fn supply(chain: &mut Chain, pool: &Pool, amount0: Decimal) -> Result<(), StrategyError> {
    let params = pool.parameters();
    chain
        .tokens
        .approve(params.asset0, pool.address(), params.lending_market, amount0)?;
    chain.with_market(params.lending_market, |market, ctx| {
        market.supply(ctx, pool.address(), params.asset0, amount0)
    })?;
    Ok(())
}

fn repay(chain: &mut Chain, pool: &Pool, amount1: Decimal) -> Result<Decimal, StrategyError> {
    let params = pool.parameters();
    chain
        .tokens
        .approve(params.asset1, pool.address(), params.lending_market, amount1)?;
    let repaid = chain.with_market(params.lending_market, |market, ctx| {
        market.repay(ctx, pool.address(), params.asset1, amount1)
    })?;
    Ok(repaid)
}

pub(super) fn release(chain: &mut Chain, pool: &Pool, amount0: Decimal) -> Result<Decimal, StrategyError> {
    let params = pool.parameters();
    let idle = chain.tokens.balance_of(params.asset0, pool.address());
    if idle >= amount0 {
        return Ok(Decimal::ZERO);
    }

    let shortfall = amount0 - idle;
    let supplied = chain
        .market(params.lending_market)?
        .current_collateral(pool.address(), params.asset0);
    if supplied < shortfall {
        return Err(StrategyError::InsufficientLiquidity {
            available: idle + supplied,
            requested: amount0,
        });
    }

    chain.with_market(params.lending_market, |market, ctx| {
        market.withdraw(ctx, pool.address(), params.asset0, shortfall)
    })?;
    debug!(pool = %pool.address(), %shortfall, "released collateral");
    Ok(shortfall)
}
