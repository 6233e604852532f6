// 8.0 engine/core.rs: main engine. holds the chain, registry, factory, pools and the event log.
// every mutating entry point runs against a snapshot of the chain and restores it on error,
// so a failed call leaves balances, positions and share supplies untouched.

use super::config::EngineConfig;
use super::results::EngineError;
use crate::chain::Chain;
use crate::config::ProtocolConfig;
use crate::events::{
    Event, EventId, EventPayload, Operation, OperationRejectedEvent, PriceUpdatedEvent, RegistryUpdatedEvent,
};
use crate::exchange::Exchange;
use crate::factory::PoolFactory;
use crate::lending::LendingMarket;
use crate::oracle::{OracleRound, PriceFeed};
use crate::pool::{Pool, PoolError};
use crate::registry::{Registry, RegistryKey};
use crate::strategy::{Strategy, StrategyKind};
use crate::token::Asset;
use crate::types::{Address, Timestamp};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{info, warn};

/** 8.1: main engine struct. all state lives here */
#[derive(Debug)]
pub struct Engine {
    pub(super) config: EngineConfig,
    pub(super) admin: Address,
    pub(super) chain: Chain,
    pub(super) registry: Registry,
    pub(super) factory: PoolFactory,
    pub(super) strategies: HashMap<Address, Strategy>,
    pub(super) pools: HashMap<Address, Pool>,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
}

impl Engine {
    /// Engine administered by `Address::SYSTEM`.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_admin(config, Address::SYSTEM)
    }

    /// `admin` owns the registry and mints faucet assets.
    pub fn with_admin(config: EngineConfig, admin: Address) -> Self {
        let mut chain = Chain::new(Timestamp::from_millis(0));
        let factory = PoolFactory::new(chain.allocate_address());
        Self {
            config,
            admin,
            chain,
            registry: Registry::new(admin),
            factory,
            strategies: HashMap::new(),
            pools: HashMap::new(),
            events: Vec::new(),
            next_event_id: 1,
        }
    }

    pub fn try_new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn protocol(&self) -> &ProtocolConfig {
        &self.config.protocol
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn factory(&self) -> &PoolFactory {
        &self.factory
    }

    // 8.1.1: time

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.chain.set_time(timestamp);
    }

    pub fn time(&self) -> Timestamp {
        self.chain.now()
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.chain.advance_time(millis);
    }

    // 8.1.2: accounts and assets

    /// Fresh address for a user, keeper or venue.
    pub fn allocate_address(&mut self) -> Address {
        self.chain.allocate_address()
    }

    /// Registers a plain asset. The admin is its minter so tests can fund accounts.
    pub fn register_asset(&mut self, symbol: &str, name: &str, decimals: u32) -> Result<Address, EngineError> {
        let address = self.chain.allocate_address();
        let asset = Asset::new(address, symbol, name, decimals).with_minter(self.admin);
        self.chain.tokens.register_asset(asset)?;
        Ok(address)
    }

    /// Registers a share token whose minter is the factory, ready for `deploy_pool`.
    pub fn create_share_token(&mut self, symbol: &str, name: &str, decimals: u32) -> Result<Address, EngineError> {
        let address = self.chain.allocate_address();
        let asset = Asset::new(address, symbol, name, decimals).with_minter(self.factory.address());
        self.chain.tokens.register_asset(asset)?;
        Ok(address)
    }

    pub fn mint(&mut self, asset: Address, to: Address, amount: Decimal) -> Result<(), EngineError> {
        self.chain.tokens.mint(self.admin, asset, to, amount)?;
        Ok(())
    }

    pub fn approve(
        &mut self,
        owner: Address,
        asset: Address,
        spender: Address,
        amount: Decimal,
    ) -> Result<(), EngineError> {
        self.chain.tokens.approve(asset, owner, spender, amount)?;
        Ok(())
    }

    pub fn transfer(
        &mut self,
        asset: Address,
        from: Address,
        to: Address,
        amount: Decimal,
    ) -> Result<(), EngineError> {
        self.chain.tokens.transfer(asset, from, to, amount)?;
        Ok(())
    }

    pub fn balance_of(&self, asset: Address, holder: Address) -> Decimal {
        self.chain.tokens.balance_of(asset, holder)
    }

    // 8.1.3: price feeds

    pub fn add_price_feed(&mut self, description: &str, decimals: u32) -> Address {
        let address = self.chain.allocate_address();
        self.chain.oracles.add_feed(PriceFeed::new(address, description, decimals));
        address
    }

    /// Publishes a fresh round at the current time.
    pub fn push_price(&mut self, feed: Address, price: Decimal) -> Result<u64, EngineError> {
        let now = self.chain.now();
        let round_id = self.chain.oracles.feed_mut(feed)?.push_price(price, now)?;
        self.emit_event(EventPayload::PriceUpdated(PriceUpdatedEvent {
            feed,
            round_id,
            price,
        }));
        Ok(round_id)
    }

    /// Publishes a raw round as given, malformed or not.
    pub fn push_round(&mut self, feed: Address, round: OracleRound) -> Result<(), EngineError> {
        self.chain.oracles.feed_mut(feed)?.push_round(round);
        Ok(())
    }

    // 8.1.4: venues and strategies

    pub fn install_lending_market(&mut self, market: Box<dyn LendingMarket>) -> Address {
        let address = self.chain.install_market(market);
        info!(market = %address, "lending market installed");
        address
    }

    pub fn install_exchange(&mut self, exchange: Box<dyn Exchange>) -> Address {
        let address = self.chain.install_exchange(exchange);
        info!(exchange = %address, "exchange installed");
        address
    }

    pub fn set_market_paused(&mut self, market: Address, paused: bool) -> Result<(), EngineError> {
        self.chain.market_mut(market)?.set_paused(paused);
        Ok(())
    }

    pub fn install_strategy(&mut self, kind: StrategyKind) -> Address {
        let address = self.chain.allocate_address();
        self.strategies.insert(address, Strategy::new(kind, address));
        address
    }

    // 8.1.5: registry

    pub fn set_registry_address(
        &mut self,
        caller: Address,
        key: &str,
        value: Address,
    ) -> Result<Option<Address>, EngineError> {
        let key = RegistryKey::parse(key)?;
        let previous = self.registry.set_address(caller, key.clone(), value)?;
        self.emit_event(EventPayload::RegistryUpdated(RegistryUpdatedEvent {
            key: key.as_str().to_string(),
            value,
            previous,
        }));
        Ok(previous)
    }

    pub fn registry_address(&self, key: &str) -> Result<Address, EngineError> {
        Ok(self.registry.get_address(&RegistryKey::parse(key)?)?)
    }

    // 8.1.6: pools

    pub fn pool(&self, pool: Address) -> Result<&Pool, EngineError> {
        self.pools.get(&pool).ok_or(EngineError::PoolNotFound(pool))
    }

    pub fn pools_iter(&self) -> impl Iterator<Item = (&Address, &Pool)> {
        self.pools.iter()
    }

    // 8.1.7: events

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    // runs `f` against the chain, rolling every balance and position back if it fails
    pub(super) fn atomically<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, EngineError>,
    ) -> Result<R, EngineError> {
        let snapshot = self.chain.clone();
        let result = f(self);
        if result.is_err() {
            self.chain = snapshot;
        }
        result
    }

    // atomic pool call with an audit record on failure
    pub(super) fn execute<R>(
        &mut self,
        operation: Operation,
        caller: Address,
        pool: Address,
        f: impl FnOnce(&Pool, &mut Chain, &ProtocolConfig) -> Result<R, PoolError>,
    ) -> Result<R, EngineError> {
        let result = self.atomically(|engine| {
            let target = engine.pools.get(&pool).ok_or(EngineError::PoolNotFound(pool))?;
            Ok(f(target, &mut engine.chain, &engine.config.protocol)?)
        });
        if let Err(e) = &result {
            self.reject(operation, caller, Some(pool), e);
        }
        result
    }

    pub(super) fn reject(&mut self, operation: Operation, caller: Address, pool: Option<Address>, error: &EngineError) {
        warn!(?operation, %caller, kind = ?error.kind(), %error, "operation rejected");
        self.emit_event(EventPayload::OperationRejected(OperationRejectedEvent {
            operation,
            caller,
            pool,
            reason: error.to_string(),
        }));
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.chain.now(), payload);
        self.next_event_id += 1;

        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }
}
