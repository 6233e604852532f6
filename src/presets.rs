// 14.0 presets.rs: a ready-made WETH/USDC environment.
// one feed (USD per WETH, 8 decimals), an Aave-like market listing both assets
// (80% max LTV, 85% liquidation threshold),
// a Uniswap-like router priced off the same feed, and both strategy variants installed.
// used by the integration tests and handy for exploring the engine.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::engine::{Engine, EngineConfig, EngineError};
use crate::exchange::{SimExchange, SwapRoute};
use crate::factory::DeployRequest;
use crate::lending::{PriceSource, ReserveConfig, SimLendingMarket};
use crate::registry::RegistryKey;
use crate::strategy::StrategyKind;
use crate::types::{Address, Bps, Leverage, Price, Timestamp};

#[derive(Debug, Clone)]
pub struct FixtureOptions {
    pub engine: EngineConfig,
    pub start: Timestamp,
    pub weth_price: Decimal,
    /// Max LTV for both reserves.
    pub max_ltv: Decimal,
    /// Liquidation threshold for both reserves. Withdrawals stop here, borrowing stops at `max_ltv`.
    pub liquidation_threshold: Decimal,
    pub usdc_borrow_apr: Decimal,
    pub weth_borrow_apr: Decimal,
    pub swap_fee: Bps,
    /// Exchange depth in USDC. None means no price impact.
    pub swap_depth: Option<Decimal>,
    pub market_usdc: Decimal,
    pub market_weth: Decimal,
    pub exchange_usdc: Decimal,
    pub exchange_weth: Decimal,
}

impl Default for FixtureOptions {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            start: Timestamp::from_secs(1_700_000_000),
            weth_price: dec!(2000),
            max_ltv: dec!(0.8),
            liquidation_threshold: dec!(0.85),
            usdc_borrow_apr: Decimal::ZERO,
            weth_borrow_apr: Decimal::ZERO,
            swap_fee: Bps::new(30),
            swap_depth: None,
            market_usdc: dec!(10_000_000),
            market_weth: dec!(5_000),
            exchange_usdc: dec!(10_000_000),
            exchange_weth: dec!(5_000),
        }
    }
}

/// How to deploy one pool inside a fixture.
#[derive(Debug, Clone)]
pub struct PoolSetup {
    pub kind: StrategyKind,
    pub symbol: String,
    pub share_decimals: u32,
    pub target_leverage: Leverage,
    pub initial_rate: Price,
    pub initial_deposit: Decimal,
}

impl PoolSetup {
    /// Long WETH: 10 WETH seed, 1 WETH per share.
    pub fn long(symbol: &str, target_leverage: Leverage) -> Self {
        Self {
            kind: StrategyKind::Long,
            symbol: symbol.to_string(),
            share_decimals: 18,
            target_leverage,
            initial_rate: Price::new_unchecked(Decimal::ONE),
            initial_deposit: dec!(10),
        }
    }

    /// Short WETH: 20,000 USDC seed, 100 USDC per share.
    pub fn short(symbol: &str, target_leverage: Leverage) -> Self {
        Self {
            kind: StrategyKind::Short,
            symbol: symbol.to_string(),
            share_decimals: 18,
            target_leverage,
            initial_rate: Price::new_unchecked(dec!(100)),
            initial_deposit: dec!(20_000),
        }
    }

    pub fn with_share_decimals(mut self, decimals: u32) -> Self {
        self.share_decimals = decimals;
        self
    }

    pub fn with_initial_rate(mut self, rate: Price) -> Self {
        self.initial_rate = rate;
        self
    }

    pub fn with_initial_deposit(mut self, amount: Decimal) -> Self {
        self.initial_deposit = amount;
        self
    }
}

#[derive(Debug)]
pub struct Fixture {
    pub engine: Engine,
    pub weth: Address,
    pub usdc: Address,
    pub weth_feed: Address,
    pub lending_market: Address,
    pub exchange: Address,
    pub long_strategy: Address,
    pub short_strategy: Address,
}

impl Fixture {
    pub fn weth_usdc() -> Result<Self, EngineError> {
        Self::with_options(FixtureOptions::default())
    }

    pub fn with_options(options: FixtureOptions) -> Result<Self, EngineError> {
        let mut engine = Engine::try_new(options.engine.clone())?;
        engine.set_time(options.start);
        let admin = engine.admin();
        let max_age = engine.protocol().max_oracle_age_secs;

        let weth = engine.register_asset("WETH", "Wrapped Ether", 18)?;
        let usdc = engine.register_asset("USDC", "USD Coin", 6)?;
        let weth_feed = engine.add_price_feed("WETH / USD", 8);
        engine.push_price(weth_feed, options.weth_price)?;

        let market_address = engine.allocate_address();
        let mut market = SimLendingMarket::new(market_address, "Aave").with_max_price_age(max_age);
        market.list_reserve(
            weth,
            ReserveConfig::new(18, options.max_ltv, PriceSource::Feed(weth_feed))
                .with_liquidation_threshold(options.liquidation_threshold)
                .with_borrow_rate(options.weth_borrow_apr),
        );
        market.list_reserve(
            usdc,
            ReserveConfig::new(6, options.max_ltv, PriceSource::Fixed(Decimal::ONE))
                .with_liquidation_threshold(options.liquidation_threshold)
                .with_borrow_rate(options.usdc_borrow_apr),
        );
        let lending_market = engine.install_lending_market(Box::new(market));
        engine.mint(usdc, lending_market, options.market_usdc)?;
        engine.mint(weth, lending_market, options.market_weth)?;

        let exchange_address = engine.allocate_address();
        let mut route = SwapRoute::new(weth, usdc, weth_feed).with_fee(options.swap_fee);
        if let Some(depth) = options.swap_depth {
            route = route.with_depth(depth);
        }
        let mut router = SimExchange::new(exchange_address, "Uniswap").with_max_price_age(max_age);
        router.add_route(route);
        let exchange = engine.install_exchange(Box::new(router));
        engine.mint(usdc, exchange, options.exchange_usdc)?;
        engine.mint(weth, exchange, options.exchange_weth)?;

        engine.set_registry_address(admin, RegistryKey::protocol_role("Aave", "LendingPool")?.as_str(), lending_market)?;
        engine.set_registry_address(admin, RegistryKey::router("Uniswap")?.as_str(), exchange)?;
        engine.set_registry_address(admin, RegistryKey::asset("WETH")?.as_str(), weth)?;
        engine.set_registry_address(admin, RegistryKey::asset("USDC")?.as_str(), usdc)?;

        let long_strategy = engine.install_strategy(StrategyKind::Long);
        let short_strategy = engine.install_strategy(StrategyKind::Short);

        Ok(Self {
            engine,
            weth,
            usdc,
            weth_feed,
            lending_market,
            exchange,
            long_strategy,
            short_strategy,
        })
    }

    pub fn new_user(&mut self) -> Address {
        self.engine.allocate_address()
    }

    /// Mints `amount` to `to` and approves `spender` for it.
    pub fn fund(&mut self, asset: Address, to: Address, spender: Address, amount: Decimal) -> Result<(), EngineError> {
        self.engine.mint(asset, to, amount)?;
        let allowance = self.engine.chain().tokens.allowance(asset, to, spender);
        self.engine.approve(to, asset, spender, allowance + amount)
    }

    pub fn set_weth_price(&mut self, price: Decimal) -> Result<u64, EngineError> {
        self.engine.push_price(self.weth_feed, price)
    }

    /// The legs a strategy kind trades in this environment: (asset0, asset1).
    pub fn legs(&self, kind: StrategyKind) -> (Address, Address) {
        match kind {
            StrategyKind::Long => (self.weth, self.usdc),
            StrategyKind::Short => (self.usdc, self.weth),
        }
    }

    pub fn request(&self, setup: &PoolSetup, share_token: Address) -> DeployRequest {
        let (asset0, asset1) = self.legs(setup.kind);
        let strategy = match setup.kind {
            StrategyKind::Long => self.long_strategy,
            StrategyKind::Short => self.short_strategy,
        };
        DeployRequest {
            strategy,
            share_token,
            asset0,
            asset1,
            target_leverage: setup.target_leverage,
            initial_rate: setup.initial_rate,
            lending_market: self.lending_market,
            exchange: self.exchange,
            initial_deposit: setup.initial_deposit,
        }
    }

    /// Creates the share token, wires its price feed key, funds `deployer` with the
    /// seed deposit and deploys the pool.
    pub fn deploy(&mut self, deployer: Address, setup: &PoolSetup) -> Result<Address, EngineError> {
        let name = format!("{} Leveraged Share", setup.symbol);
        let share_token = self
            .engine
            .create_share_token(&setup.symbol, &name, setup.share_decimals)?;
        let admin = self.engine.admin();
        let key = RegistryKey::price_feed(&setup.symbol)?;
        self.engine
            .set_registry_address(admin, key.as_str(), self.weth_feed)?;

        let (asset0, _) = self.legs(setup.kind);
        let factory = self.engine.factory().address();
        self.fund(asset0, deployer, factory, setup.initial_deposit)?;

        let request = self.request(setup, share_token);
        self.engine.deploy_pool(deployer, request)
    }
}
