//! Pool deployment, share entry points and pool reads.

use super::core::Engine;
use super::results::{EngineError, PoolSnapshot};
use crate::events::{
    DepositEvent, EventPayload, Operation, PoolDeployedEvent, RedemptionEvent, WithdrawalEvent,
};
use crate::factory::DeployRequest;
use crate::pool::{DepositOutcome, WithdrawalOutcome};
use crate::strategy::PoolState;
use crate::types::{Address, Price};
use rust_decimal::Decimal;

impl Engine {
    /// Deploy a pool. The caller must have approved `initial_deposit` of asset0 to the factory.
    /// Returns the new pool's address.
    pub fn deploy_pool(&mut self, caller: Address, request: DeployRequest) -> Result<Address, EngineError> {
        let result = self.atomically(|engine| {
            Ok(engine.factory.deploy(
                &mut engine.chain,
                &engine.registry,
                &engine.strategies,
                &engine.config.protocol,
                caller,
                request,
            )?)
        });

        let deployment = match result {
            Ok(deployment) => deployment,
            Err(e) => {
                self.reject(Operation::DeployPool, caller, None, &e);
                return Err(e);
            }
        };

        let pool = deployment.pool;
        let address = pool.address();
        let params = pool.parameters();
        self.emit_event(EventPayload::PoolDeployed(PoolDeployedEvent {
            pool: address,
            deployer: caller,
            share_token: pool.share_token(),
            strategy: params.strategy,
            asset0: params.asset0,
            asset1: params.asset1,
            target_leverage: params.target_leverage,
            initial_shares: deployment.seed.shares,
        }));
        self.emit_event(EventPayload::Deposit(DepositEvent {
            pool: address,
            account: caller,
            amount: deployment.seed.cost,
            shares: deployment.seed.shares,
        }));
        self.pools.insert(address, pool);
        Ok(address)
    }

    /// Deposit asset0 (allowance to the pool) and receive shares at the current NAV.
    pub fn deposit(&mut self, caller: Address, pool: Address, amount: Decimal) -> Result<DepositOutcome, EngineError> {
        let outcome = self.execute(Operation::Deposit, caller, pool, |p, chain, config| {
            p.deposit(chain, config, caller, caller, amount)
        })?;
        self.emit_event(EventPayload::Deposit(DepositEvent {
            pool,
            account: caller,
            amount: outcome.cost,
            shares: outcome.shares,
        }));
        Ok(outcome)
    }

    /// Withdraw exactly `amount` asset0, burning the shares it is worth (rounded up).
    pub fn withdraw(
        &mut self,
        caller: Address,
        pool: Address,
        amount: Decimal,
    ) -> Result<WithdrawalOutcome, EngineError> {
        let outcome = self.execute(Operation::Withdraw, caller, pool, |p, chain, config| {
            p.withdraw(chain, config, caller, amount)
        })?;
        self.emit_event(EventPayload::Withdrawal(WithdrawalEvent {
            pool,
            account: caller,
            amount: outcome.amount,
            shares: outcome.shares_burned,
        }));
        Ok(outcome)
    }

    /// Redeem exactly `shares` for their asset0 value (rounded down).
    pub fn redeem(
        &mut self,
        caller: Address,
        pool: Address,
        shares: Decimal,
    ) -> Result<WithdrawalOutcome, EngineError> {
        let outcome = self.execute(Operation::Redeem, caller, pool, |p, chain, config| {
            p.redeem(chain, config, caller, shares)
        })?;
        self.emit_event(EventPayload::Redemption(RedemptionEvent {
            pool,
            account: caller,
            shares: outcome.shares_burned,
            amount: outcome.amount,
        }));
        Ok(outcome)
    }

    /// A bare native-currency transfer to a pool. Always rejected.
    pub fn send_native(&mut self, from: Address, pool: Address, amount: Decimal) -> Result<(), EngineError> {
        self.execute(Operation::NativeTransfer, from, pool, |p, _, _| {
            p.receive_native(from, amount)
        })
    }

    // reads

    pub fn pool_state(&self, pool: Address) -> Result<PoolState, EngineError> {
        Ok(self.pool(pool)?.state(&self.chain, &self.config.protocol)?)
    }

    pub fn latest_pair_price(&self, pool: Address) -> Result<Price, EngineError> {
        Ok(self
            .pool(pool)?
            .latest_pair_price(&self.chain, &self.config.protocol)?)
    }

    pub fn ltv(&self, pool: Address) -> Result<Decimal, EngineError> {
        Ok(self.pool(pool)?.ltv(&self.chain, &self.config.protocol)?)
    }

    pub fn calculate_max_withdrawal(&self, pool: Address) -> Result<Decimal, EngineError> {
        Ok(self
            .pool(pool)?
            .calculate_max_withdrawal(&self.chain, &self.config.protocol)?)
    }

    pub fn share_balance(&self, pool: Address, holder: Address) -> Result<Decimal, EngineError> {
        Ok(self.pool(pool)?.shares_of(&self.chain, holder))
    }

    pub fn total_shares(&self, pool: Address) -> Result<Decimal, EngineError> {
        Ok(self.pool(pool)?.total_shares(&self.chain))
    }

    pub fn share_price(&self, pool: Address) -> Result<Decimal, EngineError> {
        Ok(self.pool(pool)?.share_price(&self.chain, &self.config.protocol)?)
    }

    pub fn preview_deposit(&self, pool: Address, amount: Decimal) -> Result<DepositOutcome, EngineError> {
        Ok(self
            .pool(pool)?
            .preview_deposit(&self.chain, &self.config.protocol, amount)?)
    }

    pub fn preview_withdraw(&self, pool: Address, amount: Decimal) -> Result<Decimal, EngineError> {
        Ok(self
            .pool(pool)?
            .preview_withdraw(&self.chain, &self.config.protocol, amount)?)
    }

    pub fn preview_redeem(&self, pool: Address, shares: Decimal) -> Result<Decimal, EngineError> {
        Ok(self
            .pool(pool)?
            .preview_redeem(&self.chain, &self.config.protocol, shares)?)
    }

    pub fn snapshot(&self, pool: Address) -> Result<PoolSnapshot, EngineError> {
        let target = self.pool(pool)?;
        let state = target.state(&self.chain, &self.config.protocol)?;
        Ok(PoolSnapshot {
            pool,
            ltv: state.ltv(),
            total_shares: target.total_shares(&self.chain),
            share_price: target.share_price(&self.chain, &self.config.protocol)?,
            max_withdrawal: target.calculate_max_withdrawal(&self.chain, &self.config.protocol)?,
            state,
        })
    }
}
