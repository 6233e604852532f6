// 8.0 pool/: the share ledger. owns share accounting and NAV, delegates leverage to the strategy.
// every entry point reads the pool state fresh. nothing is cached across adapter calls.

mod shares;

pub use shares::ShareBasis;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::chain::Chain;
use crate::config::ProtocolConfig;
use crate::lending::LendingError;
use crate::math::{self, MathError, Rounding};
use crate::oracle::{OracleError, PriceOracle};
use crate::strategy::{PoolState, RebalanceHints, RebalanceReport, Strategy, StrategyError, StrategyKind};
use crate::token::TokenError;
use crate::types::{Address, Leverage, Price};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("insufficient shares: {available} < {requested}")]
    InsufficientShares { available: Decimal, requested: Decimal },

    #[error("withdrawal of {requested} exceeds max withdrawal {max}")]
    ExceedsMaxWithdrawal { max: Decimal, requested: Decimal },

    #[error("pool is insolvent: net value {net_value}")]
    Insolvent { net_value: Decimal },

    #[error("deposit of {amount} mints no shares")]
    DepositTooSmall { amount: Decimal },

    #[error("redeeming {shares} shares pays nothing")]
    RedemptionTooSmall { shares: Decimal },

    #[error("no shares outstanding")]
    NoSharesOutstanding,

    #[error("zero amount")]
    ZeroAmount,

    #[error("pool {pool} does not accept native currency")]
    NativeTransferRejected { pool: Address },

    #[error("token error: {0}")]
    Token(#[from] TokenError),

    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("lending market error: {0}")]
    Lending(#[from] LendingError),

    #[error("math error: {0}")]
    Math(#[from] MathError),
}

/// Fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolParameters {
    pub strategy: StrategyKind,
    /// Collateral asset. Deposits, withdrawals and NAV are in this asset.
    pub asset0: Address,
    /// Borrowed asset.
    pub asset1: Address,
    pub target_leverage: Leverage,
    /// asset0 per share at genesis.
    pub initial_rate: Price,
    pub lending_market: Address,
    pub exchange: Address,
    pub share_name: String,
    pub share_symbol: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositOutcome {
    pub shares: Decimal,
    /// asset0 actually pulled. Never more than the amount offered.
    pub cost: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalOutcome {
    pub shares_burned: Decimal,
    pub amount: Decimal,
    /// asset0 pulled out of the lending market to pay this out.
    pub released: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    address: Address,
    share_token: Address,
    price_feed: Address,
    parameters: PoolParameters,
    strategy: Strategy,
}

impl Pool {
    pub fn new(
        address: Address,
        share_token: Address,
        price_feed: Address,
        parameters: PoolParameters,
        strategy: Strategy,
    ) -> Self {
        Self {
            address,
            share_token,
            price_feed,
            parameters,
            strategy,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn share_token(&self) -> Address {
        self.share_token
    }

    pub fn price_feed(&self) -> Address {
        self.price_feed
    }

    pub fn parameters(&self) -> &PoolParameters {
        &self.parameters
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    // 8.2: reads

    pub fn state(&self, chain: &Chain, config: &ProtocolConfig) -> Result<PoolState, PoolError> {
        Ok(self.strategy.as_adapter().pool_state(chain, self, config)?)
    }

    pub fn latest_pair_price(&self, chain: &Chain, config: &ProtocolConfig) -> Result<Price, PoolError> {
        Ok(chain
            .oracles
            .latest_price(self.price_feed, chain.now(), config.max_oracle_age_secs)?)
    }

    pub fn ltv(&self, chain: &Chain, config: &ProtocolConfig) -> Result<Decimal, PoolError> {
        Ok(self.state(chain, config)?.ltv())
    }

    pub fn total_shares(&self, chain: &Chain) -> Decimal {
        chain.tokens.total_supply(self.share_token)
    }

    pub fn shares_of(&self, chain: &Chain, holder: Address) -> Decimal {
        chain.tokens.balance_of(self.share_token, holder)
    }

    pub fn share_price(&self, chain: &Chain, config: &ProtocolConfig) -> Result<Decimal, PoolError> {
        let state = self.state(chain, config)?;
        self.basis(chain, &state)?.share_price()
    }

    /// deposited - borrowed / max LTV, floored at zero.
    pub fn calculate_max_withdrawal(&self, chain: &Chain, config: &ProtocolConfig) -> Result<Decimal, PoolError> {
        let state = self.state(chain, config)?;
        self.max_withdrawal_for(chain, &state)
    }

    pub fn preview_deposit(
        &self,
        chain: &Chain,
        config: &ProtocolConfig,
        amount: Decimal,
    ) -> Result<DepositOutcome, PoolError> {
        let state = self.state(chain, config)?;
        let basis = self.basis(chain, &state)?;
        let shares = basis.shares_for_deposit(amount)?;
        let cost = basis.cost_of_shares(shares)?;
        Ok(DepositOutcome { shares, cost })
    }

    pub fn preview_withdraw(
        &self,
        chain: &Chain,
        config: &ProtocolConfig,
        amount: Decimal,
    ) -> Result<Decimal, PoolError> {
        let state = self.state(chain, config)?;
        self.basis(chain, &state)?.shares_for_withdrawal(amount)
    }

    pub fn preview_redeem(
        &self,
        chain: &Chain,
        config: &ProtocolConfig,
        shares: Decimal,
    ) -> Result<Decimal, PoolError> {
        let state = self.state(chain, config)?;
        self.basis(chain, &state)?.assets_for_redemption(shares)
    }

    // 8.3: writes

    /// Pulls asset0 from `payer` (allowance to the pool) and mints shares to `receiver`
    /// at the pre-deposit NAV. Only the cost of the whole shares minted is pulled.
    pub fn deposit(
        &self,
        chain: &mut Chain,
        config: &ProtocolConfig,
        payer: Address,
        receiver: Address,
        amount: Decimal,
    ) -> Result<DepositOutcome, PoolError> {
        if amount <= Decimal::ZERO {
            return Err(PoolError::ZeroAmount);
        }

        let state = self.state(chain, config)?;
        let basis = self.basis(chain, &state)?;
        let shares = basis.shares_for_deposit(amount)?;
        if shares.is_zero() {
            return Err(PoolError::DepositTooSmall { amount });
        }
        let cost = basis.cost_of_shares(shares)?;

        chain
            .tokens
            .transfer_from(self.parameters.asset0, self.address, payer, self.address, cost)?;
        chain
            .tokens
            .mint(self.address, self.share_token, receiver, shares)?;

        info!(pool = %self.address, %receiver, %shares, %cost, "deposit");
        Ok(DepositOutcome { shares, cost })
    }

    /// Burns the shares worth exactly `amount` asset0 (rounded up) and pays `amount`.
    pub fn withdraw(
        &self,
        chain: &mut Chain,
        config: &ProtocolConfig,
        owner: Address,
        amount: Decimal,
    ) -> Result<WithdrawalOutcome, PoolError> {
        if amount <= Decimal::ZERO {
            return Err(PoolError::ZeroAmount);
        }

        let state = self.state(chain, config)?;
        let basis = self.basis(chain, &state)?;
        let shares = basis.shares_for_withdrawal(amount)?;
        let held = self.shares_of(chain, owner);
        if held < shares {
            return Err(PoolError::InsufficientShares {
                available: held,
                requested: shares,
            });
        }
        let max = self.max_withdrawal_for(chain, &state)?;
        if amount > max {
            return Err(PoolError::ExceedsMaxWithdrawal {
                max,
                requested: amount,
            });
        }

        let released = self.pay_out(chain, owner, shares, amount)?;
        info!(pool = %self.address, %owner, %shares, %amount, "withdraw");
        Ok(WithdrawalOutcome {
            shares_burned: shares,
            amount,
            released,
        })
    }

    /// Burns exactly `shares` and pays their NAV in asset0 (rounded down).
    /// A payout beyond the immediate withdrawal capacity reverts.
    pub fn redeem(
        &self,
        chain: &mut Chain,
        config: &ProtocolConfig,
        owner: Address,
        shares: Decimal,
    ) -> Result<WithdrawalOutcome, PoolError> {
        if shares <= Decimal::ZERO {
            return Err(PoolError::ZeroAmount);
        }
        let held = self.shares_of(chain, owner);
        if held < shares {
            return Err(PoolError::InsufficientShares {
                available: held,
                requested: shares,
            });
        }

        let state = self.state(chain, config)?;
        let basis = self.basis(chain, &state)?;
        let amount = basis.assets_for_redemption(shares)?;
        if amount.is_zero() {
            return Err(PoolError::RedemptionTooSmall { shares });
        }
        let max = self.max_withdrawal_for(chain, &state)?;
        if amount > max {
            return Err(PoolError::ExceedsMaxWithdrawal {
                max,
                requested: amount,
            });
        }

        let released = self.pay_out(chain, owner, shares, amount)?;
        info!(pool = %self.address, %owner, %shares, %amount, "redeem");
        Ok(WithdrawalOutcome {
            shares_burned: shares,
            amount,
            released,
        })
    }

    pub fn rebalance(
        &self,
        chain: &mut Chain,
        config: &ProtocolConfig,
        hints: RebalanceHints,
    ) -> Result<RebalanceReport, PoolError> {
        Ok(self
            .strategy
            .as_adapter()
            .rebalance(chain, self, hints, config)?)
    }

    /// There is no payable fallback. Value enters through `deposit` only.
    pub fn receive_native(&self, _from: Address, _amount: Decimal) -> Result<(), PoolError> {
        Err(PoolError::NativeTransferRejected { pool: self.address })
    }

    // burn first, then free liquidity, then pay
    fn pay_out(
        &self,
        chain: &mut Chain,
        owner: Address,
        shares: Decimal,
        amount: Decimal,
    ) -> Result<Decimal, PoolError> {
        chain
            .tokens
            .burn(self.address, self.share_token, owner, shares)?;
        let released = self
            .strategy
            .as_adapter()
            .release_liquidity(chain, self, amount)?;
        chain
            .tokens
            .transfer(self.parameters.asset0, self.address, owner, amount)?;
        if !released.is_zero() {
            debug!(pool = %self.address, %released, "collateral released for payout");
        }
        Ok(released)
    }

    fn basis(&self, chain: &Chain, state: &PoolState) -> Result<ShareBasis, PoolError> {
        Ok(ShareBasis {
            supply: self.total_shares(chain),
            net_value: state.net_value,
            initial_rate: self.parameters.initial_rate,
            asset_decimals: chain.tokens.decimals(self.parameters.asset0)?,
            share_decimals: chain.tokens.decimals(self.share_token)?,
        })
    }

    fn max_withdrawal_for(&self, chain: &Chain, state: &PoolState) -> Result<Decimal, PoolError> {
        if state.deposited.is_zero() {
            return Ok(Decimal::ZERO);
        }
        let max_ltv = chain
            .market(self.parameters.lending_market)?
            .max_ltv(self.parameters.asset0)?;
        let locked = if state.borrowed.is_zero() {
            Decimal::ZERO
        } else if max_ltv.is_zero() {
            state.deposited
        } else {
            math::div(state.borrowed, max_ltv)?
        };
        let decimals = chain.tokens.decimals(self.parameters.asset0)?;
        let max = math::round_to(state.deposited - locked, decimals, Rounding::Down);
        Ok(max.max(Decimal::ZERO))
    }
}
