// 10.0 factory.rs: builds pools. validates the construction parameters, resolves the
// price feed from the registry once, takes over the share token's minter role and seeds
// the first share batch from the deployer's initial deposit.
// the pool address is allocated and returned in the same call. nothing is predicted.

use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::info;

use crate::chain::Chain;
use crate::config::ProtocolConfig;
use crate::exchange::ExchangeError;
use crate::lending::LendingError;
use crate::oracle::OracleError;
use crate::pool::{DepositOutcome, Pool, PoolError, PoolParameters};
use crate::registry::{Registry, RegistryError, RegistryKey};
use crate::strategy::Strategy;
use crate::token::TokenError;
use crate::types::{Address, Leverage, Price};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FactoryError {
    #[error("{field} must not be the zero address")]
    ZeroAddress { field: &'static str },

    #[error("asset0 and asset1 must differ")]
    SameAsset,

    #[error("target leverage {0} is below 1.0x")]
    LeverageBelowOne(Leverage),

    #[error("target leverage {target} exceeds the configured maximum {max}")]
    LeverageAboveMax { target: Leverage, max: Leverage },

    #[error("target leverage {target} is unreachable at max LTV {max_ltv}")]
    LeverageUnreachable { target: Leverage, max_ltv: Decimal },

    #[error("initial deposit must be positive")]
    ZeroDeposit,

    #[error("strategy {0} not installed")]
    UnknownStrategy(Address),

    #[error("share token {0} already has supply")]
    ShareTokenInUse(Address),

    #[error("factory is not the minter of share token {0}")]
    ShareTokenNotOwned(Address),

    #[error("registry maps '{key}' to {registered}, request names {supplied}")]
    RegistryMismatch {
        key: String,
        registered: Address,
        supplied: Address,
    },

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("token error: {0}")]
    Token(#[from] TokenError),

    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("lending market error: {0}")]
    Lending(#[from] LendingError),

    #[error("exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("pool error: {0}")]
    Pool(#[from] PoolError),
}

/// Pool construction parameters, in construction order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    pub strategy: Address,
    pub share_token: Address,
    pub asset0: Address,
    pub asset1: Address,
    pub target_leverage: Leverage,
    pub initial_rate: Price,
    pub lending_market: Address,
    pub exchange: Address,
    pub initial_deposit: Decimal,
}

#[derive(Debug, Clone)]
pub struct Deployment {
    pub pool: Pool,
    pub seed: DepositOutcome,
}

#[derive(Debug, Clone)]
pub struct PoolFactory {
    address: Address,
    deployed: Vec<Address>,
}

impl PoolFactory {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            deployed: Vec::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn deployed(&self) -> &[Address] {
        &self.deployed
    }

    /// Pulls `initial_deposit` of asset0 from `deployer` (allowance to the factory).
    #[allow(clippy::too_many_arguments)]
    pub fn deploy(
        &mut self,
        chain: &mut Chain,
        registry: &Registry,
        strategies: &HashMap<Address, Strategy>,
        config: &ProtocolConfig,
        deployer: Address,
        request: DeployRequest,
    ) -> Result<Deployment, FactoryError> {
        Self::validate(&request, config)?;

        let strategy = *strategies
            .get(&request.strategy)
            .ok_or(FactoryError::UnknownStrategy(request.strategy))?;

        let asset0 = chain.tokens.asset(request.asset0)?;
        let asset1 = chain.tokens.asset(request.asset1)?;
        let share = chain.tokens.asset(request.share_token)?.clone();
        if !chain.tokens.total_supply(request.share_token).is_zero() {
            return Err(FactoryError::ShareTokenInUse(request.share_token));
        }
        if share.minter != Some(self.address) {
            return Err(FactoryError::ShareTokenNotOwned(request.share_token));
        }

        // both legs listed, and the target is below 1 / (1 - max LTV)
        let market = chain.market(request.lending_market)?;
        let max_ltv = market.max_ltv(request.asset0)?;
        market.max_ltv(request.asset1)?;
        if request.target_leverage.is_levered()
            && request.target_leverage.as_ratio() * (Decimal::ONE - max_ltv) >= Decimal::ONE
        {
            return Err(FactoryError::LeverageUnreachable {
                target: request.target_leverage,
                max_ltv,
            });
        }
        let exchange = chain.exchange(request.exchange)?;

        // venues and legs must be the ones the registry names
        let expected = [
            (RegistryKey::protocol_role(market.name(), "LendingPool")?, request.lending_market),
            (RegistryKey::router(exchange.name())?, request.exchange),
            (RegistryKey::asset(&asset0.symbol)?, request.asset0),
            (RegistryKey::asset(&asset1.symbol)?, request.asset1),
        ];
        for (key, supplied) in expected {
            Self::ensure_registered(registry, &key, supplied)?;
        }

        // resolved once, here. pools never consult the registry again.
        let feed_key = RegistryKey::price_feed(&share.symbol)?;
        let price_feed = registry.get_address(&feed_key)?;
        chain.oracles.feed(price_feed)?;

        let address = chain.allocate_address();
        let parameters = PoolParameters {
            strategy: strategy.kind(),
            asset0: request.asset0,
            asset1: request.asset1,
            target_leverage: request.target_leverage,
            initial_rate: request.initial_rate,
            lending_market: request.lending_market,
            exchange: request.exchange,
            share_name: share.name.clone(),
            share_symbol: share.symbol.clone(),
        };
        let pool = Pool::new(address, request.share_token, price_feed, parameters, strategy);
        chain
            .tokens
            .set_minter(self.address, request.share_token, address)?;

        let seed = self.seed(chain, config, &pool, deployer, request.initial_deposit)?;
        self.deployed.push(address);

        info!(
            pool = %address,
            symbol = %share.symbol,
            kind = ?strategy.kind(),
            target = %request.target_leverage,
            shares = %seed.shares,
            "pool deployed"
        );
        Ok(Deployment { pool, seed })
    }

    fn validate(request: &DeployRequest, config: &ProtocolConfig) -> Result<(), FactoryError> {
        let addresses = [
            ("strategy", request.strategy),
            ("share_token", request.share_token),
            ("asset0", request.asset0),
            ("asset1", request.asset1),
            ("lending_market", request.lending_market),
            ("exchange", request.exchange),
        ];
        for (field, address) in addresses {
            if address == Address::SYSTEM {
                return Err(FactoryError::ZeroAddress { field });
            }
        }
        if request.asset0 == request.asset1 {
            return Err(FactoryError::SameAsset);
        }
        if request.target_leverage < Leverage::ONE {
            return Err(FactoryError::LeverageBelowOne(request.target_leverage));
        }
        if request.target_leverage > config.max_target_leverage {
            return Err(FactoryError::LeverageAboveMax {
                target: request.target_leverage,
                max: config.max_target_leverage,
            });
        }
        if request.initial_deposit <= Decimal::ZERO {
            return Err(FactoryError::ZeroDeposit);
        }
        Ok(())
    }

    fn ensure_registered(registry: &Registry, key: &RegistryKey, supplied: Address) -> Result<(), FactoryError> {
        let registered = registry.get_address(key)?;
        if registered != supplied {
            return Err(FactoryError::RegistryMismatch {
                key: key.to_string(),
                registered,
                supplied,
            });
        }
        Ok(())
    }

    // routes the initial deposit through the pool so genesis uses the same share math
    fn seed(
        &self,
        chain: &mut Chain,
        config: &ProtocolConfig,
        pool: &Pool,
        deployer: Address,
        amount: Decimal,
    ) -> Result<DepositOutcome, FactoryError> {
        let asset0 = pool.parameters().asset0;
        chain
            .tokens
            .transfer_from(asset0, self.address, deployer, self.address, amount)?;
        chain
            .tokens
            .approve(asset0, self.address, pool.address(), amount)?;

        let seed = pool.deposit(chain, config, self.address, deployer, amount)?;

        let refund = amount - seed.cost;
        if refund > Decimal::ZERO {
            chain.tokens.transfer(asset0, self.address, deployer, refund)?;
        }
        chain
            .tokens
            .approve(asset0, self.address, pool.address(), Decimal::ZERO)?;
        Ok(seed)
    }
}
