// 7.5 chain.rs: the execution environment. token ledger, oracle book, installed venues,
// address allocator and clock. adapters get borrowed slices of it through ChainCtx/ChainView.
// Chain is Clone so the engine can snapshot it before a call and restore on failure.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::exchange::{Exchange, ExchangeError};
use crate::lending::{LendingError, LendingMarket};
use crate::oracle::OracleBook;
use crate::token::TokenLedger;
use crate::types::{Address, Timestamp};

/// Mutable access handed to an adapter for one call.
pub struct ChainCtx<'a> {
    pub tokens: &'a mut TokenLedger,
    pub oracles: &'a OracleBook,
    pub now: Timestamp,
}

impl ChainCtx<'_> {
    pub fn view(&self) -> ChainView<'_> {
        ChainView {
            tokens: &*self.tokens,
            oracles: self.oracles,
            now: self.now,
        }
    }
}

/// Read-only access for queries.
#[derive(Clone, Copy)]
pub struct ChainView<'a> {
    pub tokens: &'a TokenLedger,
    pub oracles: &'a OracleBook,
    pub now: Timestamp,
}

pub struct Chain {
    pub tokens: TokenLedger,
    pub oracles: OracleBook,
    markets: HashMap<Address, Box<dyn LendingMarket>>,
    exchanges: HashMap<Address, Box<dyn Exchange>>,
    next_address: u64,
    now: Timestamp,
}

impl Chain {
    // low addresses are reserved for SYSTEM and the native asset
    const FIRST_ADDRESS: u64 = 0x100;

    pub fn new(now: Timestamp) -> Self {
        Self {
            tokens: TokenLedger::new(),
            oracles: OracleBook::new(),
            markets: HashMap::new(),
            exchanges: HashMap::new(),
            next_address: Self::FIRST_ADDRESS,
            now,
        }
    }

    pub fn allocate_address(&mut self) -> Address {
        let address = Address(self.next_address);
        self.next_address += 1;
        address
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    // moves the clock and lets every market accrue interest up to the new time
    pub fn advance_time(&mut self, millis: i64) {
        self.set_time(self.now.plus_millis(millis));
    }

    pub fn set_time(&mut self, now: Timestamp) {
        if now < self.now {
            return;
        }
        self.now = now;
        for market in self.markets.values_mut() {
            market.accrue(now);
        }
    }

    pub fn view(&self) -> ChainView<'_> {
        ChainView {
            tokens: &self.tokens,
            oracles: &self.oracles,
            now: self.now,
        }
    }

    pub fn install_market(&mut self, mut market: Box<dyn LendingMarket>) -> Address {
        let address = market.address();
        market.accrue(self.now);
        self.markets.insert(address, market);
        address
    }

    pub fn install_exchange(&mut self, exchange: Box<dyn Exchange>) -> Address {
        let address = exchange.address();
        self.exchanges.insert(address, exchange);
        address
    }

    pub fn has_market(&self, market: Address) -> bool {
        self.markets.contains_key(&market)
    }

    pub fn has_exchange(&self, exchange: Address) -> bool {
        self.exchanges.contains_key(&exchange)
    }

    pub fn market(&self, market: Address) -> Result<&dyn LendingMarket, LendingError> {
        self.markets
            .get(&market)
            .map(|m| m.as_ref())
            .ok_or(LendingError::MarketNotFound { market })
    }

    pub fn market_mut(&mut self, market: Address) -> Result<&mut dyn LendingMarket, LendingError> {
        match self.markets.get_mut(&market) {
            Some(m) => Ok(m.as_mut()),
            None => Err(LendingError::MarketNotFound { market }),
        }
    }

    pub fn exchange(&self, exchange: Address) -> Result<&dyn Exchange, ExchangeError> {
        self.exchanges
            .get(&exchange)
            .map(|e| e.as_ref())
            .ok_or(ExchangeError::VenueNotFound { exchange })
    }

    // 7.6: routed adapter calls. split borrows so the adapter can touch the ledger.

    pub fn with_market<R>(
        &mut self,
        market: Address,
        f: impl FnOnce(&mut dyn LendingMarket, &mut ChainCtx<'_>) -> Result<R, LendingError>,
    ) -> Result<R, LendingError> {
        let Chain {
            tokens,
            oracles,
            markets,
            now,
            ..
        } = self;
        let venue = markets
            .get_mut(&market)
            .ok_or(LendingError::MarketNotFound { market })?;
        let mut ctx = ChainCtx {
            tokens,
            oracles,
            now: *now,
        };
        f(venue.as_mut(), &mut ctx)
    }

    pub fn with_exchange<R>(
        &mut self,
        exchange: Address,
        f: impl FnOnce(&mut dyn Exchange, &mut ChainCtx<'_>) -> Result<R, ExchangeError>,
    ) -> Result<R, ExchangeError> {
        let Chain {
            tokens,
            oracles,
            exchanges,
            now,
            ..
        } = self;
        let venue = exchanges
            .get_mut(&exchange)
            .ok_or(ExchangeError::VenueNotFound { exchange })?;
        let mut ctx = ChainCtx {
            tokens,
            oracles,
            now: *now,
        };
        f(venue.as_mut(), &mut ctx)
    }

    pub fn available_borrows(
        &self,
        market: Address,
        position: Address,
        asset: Address,
    ) -> Result<Decimal, LendingError> {
        self.market(market)?
            .available_borrows(&self.view(), position, asset)
    }

    pub fn max_withdrawable(
        &self,
        market: Address,
        position: Address,
        asset: Address,
    ) -> Result<Decimal, LendingError> {
        self.market(market)?
            .max_withdrawable(&self.view(), position, asset)
    }

    pub fn quote_exact_input(
        &self,
        exchange: Address,
        asset_in: Address,
        asset_out: Address,
        amount_in: Decimal,
    ) -> Result<Decimal, ExchangeError> {
        self.exchange(exchange)?
            .quote_exact_input(&self.view(), asset_in, asset_out, amount_in)
    }
}

impl Clone for Chain {
    fn clone(&self) -> Self {
        Self {
            tokens: self.tokens.clone(),
            oracles: self.oracles.clone(),
            markets: self
                .markets
                .iter()
                .map(|(k, v)| (*k, v.clone_box()))
                .collect(),
            exchanges: self
                .exchanges
                .iter()
                .map(|(k, v)| (*k, v.clone_box()))
                .collect(),
            next_address: self.next_address,
            now: self.now,
        }
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("now", &self.now)
            .field("markets", &self.markets.len())
            .field("exchanges", &self.exchanges.len())
            .field("next_address", &self.next_address)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lending::{PriceSource, ReserveConfig, SimLendingMarket};
    use crate::token::Asset;
    use rust_decimal_macros::dec;

    #[test]
    fn test_addresses_are_unique() {
        let mut chain = Chain::new(Timestamp::from_secs(0));
        let a = chain.allocate_address();
        let b = chain.allocate_address();
        assert_ne!(a, b);
        assert!(a.0 >= 0x100);
    }

    #[test]
    fn test_clone_is_a_snapshot() {
        let mut chain = Chain::new(Timestamp::from_secs(0));
        let usdc = chain.allocate_address();
        let user = chain.allocate_address();
        chain
            .tokens
            .register_asset(Asset::new(usdc, "USDC", "USD Coin", 6).with_minter(Address::SYSTEM))
            .unwrap();
        chain.tokens.mint(Address::SYSTEM, usdc, user, dec!(10)).unwrap();

        let snapshot = chain.clone();
        chain.tokens.mint(Address::SYSTEM, usdc, user, dec!(5)).unwrap();
        chain = snapshot;
        assert_eq!(chain.tokens.balance_of(usdc, user), dec!(10));
    }

    #[test]
    fn test_missing_venues() {
        let mut chain = Chain::new(Timestamp::from_secs(0));
        let nowhere = Address(0xdead);
        let result = chain.with_market(nowhere, |_, _| Ok(()));
        assert!(matches!(result, Err(LendingError::MarketNotFound { .. })));
        assert!(matches!(
            chain.exchange(nowhere),
            Err(ExchangeError::VenueNotFound { .. })
        ));
    }

    #[test]
    fn test_time_only_moves_forward() {
        let mut chain = Chain::new(Timestamp::from_secs(10));
        let market = chain.allocate_address();
        let usdc = chain.allocate_address();
        let mut sim = SimLendingMarket::new(market, "sim");
        sim.list_reserve(
            usdc,
            ReserveConfig::new(6, dec!(0.8), PriceSource::Fixed(dec!(1))),
        );
        chain.install_market(Box::new(sim));

        chain.advance_time(5_000);
        assert_eq!(chain.now(), Timestamp::from_secs(15));
        chain.set_time(Timestamp::from_secs(1));
        assert_eq!(chain.now(), Timestamp::from_secs(15));
    }
}
