// 4.0 lending.rs: lending market capability surface plus an in-memory reference market.
// positions are keyed by the caller's address. collateral is valued through each
// reserve's price source. borrowing is capped by the reserve's max loan-to-value,
// withdrawals by its liquidation threshold, which is never below max LTV.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::chain::{ChainCtx, ChainView};
use crate::math::{self, MathError, Rounding};
use crate::oracle::{OracleError, PriceOracle};
use crate::token::TokenError;
use crate::types::{Address, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LendingError {
    #[error("insufficient collateral: {available} withdrawable, {requested} requested")]
    InsufficientCollateral { available: Decimal, requested: Decimal },

    #[error("borrow exceeds capacity: {available} available, {requested} requested")]
    ExceedsBorrowCapacity { available: Decimal, requested: Decimal },

    #[error("lending market {market} is paused")]
    MarketPaused { market: Address },

    #[error("asset {asset} is not listed")]
    UnsupportedAsset { asset: Address },

    #[error("insufficient market liquidity: {available} < {requested}")]
    InsufficientLiquidity { available: Decimal, requested: Decimal },

    #[error("borrowing disabled for {asset}")]
    BorrowingDisabled { asset: Address },

    #[error("lending market {market} not found")]
    MarketNotFound { market: Address },

    #[error("zero amount")]
    ZeroAmount,

    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("token error: {0}")]
    Token(#[from] TokenError),

    #[error("math error: {0}")]
    Math(#[from] MathError),
}

/// Uniform surface over a lending market. Every mutating call acts on the
/// caller's own position.
pub trait LendingMarket: fmt::Debug {
    fn address(&self) -> Address;

    /// Protocol name the registry files this market under, e.g. `Aave`.
    fn name(&self) -> &str;

    /// Pulls `amount` from the caller (allowance to the market) and credits collateral.
    fn supply(
        &mut self,
        ctx: &mut ChainCtx<'_>,
        caller: Address,
        asset: Address,
        amount: Decimal,
    ) -> Result<(), LendingError>;

    /// Returns collateral to the caller, refusing anything that would push the
    /// position past its liquidation threshold.
    fn withdraw(
        &mut self,
        ctx: &mut ChainCtx<'_>,
        caller: Address,
        asset: Address,
        amount: Decimal,
    ) -> Result<(), LendingError>;

    fn borrow(
        &mut self,
        ctx: &mut ChainCtx<'_>,
        caller: Address,
        asset: Address,
        amount: Decimal,
    ) -> Result<(), LendingError>;

    /// Repays up to `amount` of debt (allowance to the market). Returns the amount actually repaid.
    fn repay(
        &mut self,
        ctx: &mut ChainCtx<'_>,
        caller: Address,
        asset: Address,
        amount: Decimal,
    ) -> Result<Decimal, LendingError>;

    fn available_borrows(
        &self,
        view: &ChainView<'_>,
        position: Address,
        asset: Address,
    ) -> Result<Decimal, LendingError>;

    fn current_debt(&self, position: Address, asset: Address) -> Decimal;

    fn current_collateral(&self, position: Address, asset: Address) -> Decimal;

    fn max_ltv(&self, asset: Address) -> Result<Decimal, LendingError>;

    /// Collateral that can leave the position without crossing the liquidation threshold.
    fn max_withdrawable(
        &self,
        view: &ChainView<'_>,
        position: Address,
        asset: Address,
    ) -> Result<Decimal, LendingError>;

    fn accrue(&mut self, now: Timestamp);

    fn is_paused(&self) -> bool;

    fn set_paused(&mut self, paused: bool);

    fn clone_box(&self) -> Box<dyn LendingMarket>;
}

// 4.1: reserve configuration

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceSource {
    // constant value in the market's unit of account
    Fixed(Decimal),
    Feed(Address),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveConfig {
    pub decimals: u32,
    // fraction of collateral value that can be borrowed against, e.g. 0.8
    pub max_ltv: Decimal,
    // debt / collateral value past which withdrawals stop, e.g. 0.85
    pub liquidation_threshold: Decimal,
    pub price_source: PriceSource,
    pub borrowing_enabled: bool,
    // simple interest, applied on accrue
    pub borrow_rate_apr: Decimal,
}

impl ReserveConfig {
    pub fn new(decimals: u32, max_ltv: Decimal, price_source: PriceSource) -> Self {
        Self {
            decimals,
            max_ltv,
            liquidation_threshold: max_ltv,
            price_source,
            borrowing_enabled: true,
            borrow_rate_apr: Decimal::ZERO,
        }
    }

    // clamped so it never sits below max LTV
    pub fn with_liquidation_threshold(mut self, threshold: Decimal) -> Self {
        self.liquidation_threshold = threshold.max(self.max_ltv);
        self
    }

    pub fn with_borrow_rate(mut self, apr: Decimal) -> Self {
        self.borrow_rate_apr = apr;
        self
    }

    pub fn without_borrowing(mut self) -> Self {
        self.borrowing_enabled = false;
        self
    }
}

// 4.2: reference market

#[derive(Debug, Clone, Copy, Default)]
struct AccountData {
    // collateral value weighted by max LTV
    borrow_capacity: Decimal,
    // collateral value weighted by liquidation threshold
    withdraw_capacity: Decimal,
    debt_value: Decimal,
}

impl AccountData {
    fn borrow_headroom(&self) -> Decimal {
        (self.borrow_capacity - self.debt_value).max(Decimal::ZERO)
    }

    fn withdraw_headroom(&self) -> Decimal {
        (self.withdraw_capacity - self.debt_value).max(Decimal::ZERO)
    }
}

#[derive(Debug, Clone)]
pub struct SimLendingMarket {
    address: Address,
    name: String,
    reserves: HashMap<Address, ReserveConfig>,
    // (position, asset) -> amount
    collateral: HashMap<(Address, Address), Decimal>,
    debt: HashMap<(Address, Address), Decimal>,
    paused: bool,
    max_price_age_secs: u64,
    last_accrual: Option<Timestamp>,
}

impl SimLendingMarket {
    pub fn new(address: Address, name: &str) -> Self {
        Self {
            address,
            name: name.to_string(),
            reserves: HashMap::new(),
            collateral: HashMap::new(),
            debt: HashMap::new(),
            paused: false,
            max_price_age_secs: 3600,
            last_accrual: None,
        }
    }

    pub fn with_max_price_age(mut self, secs: u64) -> Self {
        self.max_price_age_secs = secs;
        self
    }

    pub fn list_reserve(&mut self, asset: Address, config: ReserveConfig) {
        self.reserves.insert(asset, config);
    }

    fn reserve(&self, asset: Address) -> Result<&ReserveConfig, LendingError> {
        self.reserves
            .get(&asset)
            .ok_or(LendingError::UnsupportedAsset { asset })
    }

    fn ensure_active(&self) -> Result<(), LendingError> {
        if self.paused {
            return Err(LendingError::MarketPaused {
                market: self.address,
            });
        }
        Ok(())
    }

    fn price_of(&self, view: &ChainView<'_>, asset: Address) -> Result<Decimal, LendingError> {
        match self.reserve(asset)?.price_source {
            PriceSource::Fixed(value) => Ok(value),
            PriceSource::Feed(feed) => Ok(view
                .oracles
                .latest_price(feed, view.now, self.max_price_age_secs)?
                .value()),
        }
    }

    fn account_data(
        &self,
        view: &ChainView<'_>,
        position: Address,
    ) -> Result<AccountData, LendingError> {
        let mut data = AccountData::default();
        for (&(holder, asset), &amount) in &self.collateral {
            if holder != position || amount.is_zero() {
                continue;
            }
            let reserve = self.reserve(asset)?;
            let value = math::mul(amount, self.price_of(view, asset)?)?;
            data.borrow_capacity += math::mul(value, reserve.max_ltv)?;
            data.withdraw_capacity += math::mul(value, reserve.liquidation_threshold)?;
        }
        for (&(holder, asset), &amount) in &self.debt {
            if holder != position || amount.is_zero() {
                continue;
            }
            data.debt_value += math::mul(amount, self.price_of(view, asset)?)?;
        }
        Ok(data)
    }

    fn liquidity(&self, view: &ChainView<'_>, asset: Address) -> Decimal {
        view.tokens.balance_of(asset, self.address)
    }

    // collateral that can leave without crossing the liquidation threshold, ignoring market liquidity
    fn threshold_bound_withdrawable(
        &self,
        view: &ChainView<'_>,
        position: Address,
        asset: Address,
    ) -> Result<Decimal, LendingError> {
        let reserve = self.reserve(asset)?;
        let supplied = self.current_collateral(position, asset);
        let data = self.account_data(view, position)?;
        if data.debt_value.is_zero() || reserve.liquidation_threshold.is_zero() {
            return Ok(supplied);
        }
        let per_unit = math::mul(self.price_of(view, asset)?, reserve.liquidation_threshold)?;
        let bound = math::round_to(
            math::div(data.withdraw_headroom(), per_unit)?,
            reserve.decimals,
            Rounding::Down,
        );
        Ok(bound.min(supplied))
    }

    // borrow capacity left on the position, ignoring market liquidity
    fn capacity_bound_borrow(
        &self,
        view: &ChainView<'_>,
        position: Address,
        asset: Address,
    ) -> Result<Decimal, LendingError> {
        let reserve = self.reserve(asset)?;
        if !reserve.borrowing_enabled {
            return Ok(Decimal::ZERO);
        }
        let data = self.account_data(view, position)?;
        let price = self.price_of(view, asset)?;
        Ok(math::round_to(
            math::div(data.borrow_headroom(), price)?,
            reserve.decimals,
            Rounding::Down,
        ))
    }
}

impl LendingMarket for SimLendingMarket {
    fn address(&self) -> Address {
        self.address
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn supply(
        &mut self,
        ctx: &mut ChainCtx<'_>,
        caller: Address,
        asset: Address,
        amount: Decimal,
    ) -> Result<(), LendingError> {
        self.ensure_active()?;
        self.reserve(asset)?;
        if amount <= Decimal::ZERO {
            return Err(LendingError::ZeroAmount);
        }

        ctx.tokens
            .transfer_from(asset, self.address, caller, self.address, amount)?;
        *self.collateral.entry((caller, asset)).or_insert(Decimal::ZERO) += amount;

        debug!(market = %self.address, %caller, %asset, %amount, "supply");
        Ok(())
    }

    fn withdraw(
        &mut self,
        ctx: &mut ChainCtx<'_>,
        caller: Address,
        asset: Address,
        amount: Decimal,
    ) -> Result<(), LendingError> {
        self.ensure_active()?;
        if amount <= Decimal::ZERO {
            return Err(LendingError::ZeroAmount);
        }

        let view = ctx.view();
        let allowed = self.threshold_bound_withdrawable(&view, caller, asset)?;
        if amount > allowed {
            return Err(LendingError::InsufficientCollateral {
                available: allowed,
                requested: amount,
            });
        }
        let liquidity = self.liquidity(&view, asset);
        if amount > liquidity {
            return Err(LendingError::InsufficientLiquidity {
                available: liquidity,
                requested: amount,
            });
        }

        ctx.tokens.transfer(asset, self.address, caller, amount)?;
        *self.collateral.entry((caller, asset)).or_insert(Decimal::ZERO) -= amount;

        debug!(market = %self.address, %caller, %asset, %amount, "withdraw");
        Ok(())
    }

    fn borrow(
        &mut self,
        ctx: &mut ChainCtx<'_>,
        caller: Address,
        asset: Address,
        amount: Decimal,
    ) -> Result<(), LendingError> {
        self.ensure_active()?;
        if !self.reserve(asset)?.borrowing_enabled {
            return Err(LendingError::BorrowingDisabled { asset });
        }
        if amount <= Decimal::ZERO {
            return Err(LendingError::ZeroAmount);
        }

        let view = ctx.view();
        let capacity = self.capacity_bound_borrow(&view, caller, asset)?;
        if amount > capacity {
            return Err(LendingError::ExceedsBorrowCapacity {
                available: capacity,
                requested: amount,
            });
        }
        let liquidity = self.liquidity(&view, asset);
        if amount > liquidity {
            return Err(LendingError::InsufficientLiquidity {
                available: liquidity,
                requested: amount,
            });
        }

        ctx.tokens.transfer(asset, self.address, caller, amount)?;
        *self.debt.entry((caller, asset)).or_insert(Decimal::ZERO) += amount;

        debug!(market = %self.address, %caller, %asset, %amount, "borrow");
        Ok(())
    }

    fn repay(
        &mut self,
        ctx: &mut ChainCtx<'_>,
        caller: Address,
        asset: Address,
        amount: Decimal,
    ) -> Result<Decimal, LendingError> {
        self.ensure_active()?;
        self.reserve(asset)?;
        if amount <= Decimal::ZERO {
            return Err(LendingError::ZeroAmount);
        }

        let outstanding = self.current_debt(caller, asset);
        let repaid = amount.min(outstanding);
        if repaid.is_zero() {
            return Ok(Decimal::ZERO);
        }

        ctx.tokens
            .transfer_from(asset, self.address, caller, self.address, repaid)?;
        self.debt.insert((caller, asset), outstanding - repaid);

        debug!(market = %self.address, %caller, %asset, %repaid, "repay");
        Ok(repaid)
    }

    fn available_borrows(
        &self,
        view: &ChainView<'_>,
        position: Address,
        asset: Address,
    ) -> Result<Decimal, LendingError> {
        let capacity = self.capacity_bound_borrow(view, position, asset)?;
        Ok(capacity.min(self.liquidity(view, asset)))
    }

    fn current_debt(&self, position: Address, asset: Address) -> Decimal {
        self.debt
            .get(&(position, asset))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    fn current_collateral(&self, position: Address, asset: Address) -> Decimal {
        self.collateral
            .get(&(position, asset))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    fn max_ltv(&self, asset: Address) -> Result<Decimal, LendingError> {
        Ok(self.reserve(asset)?.max_ltv)
    }

    fn max_withdrawable(
        &self,
        view: &ChainView<'_>,
        position: Address,
        asset: Address,
    ) -> Result<Decimal, LendingError> {
        let bound = self.threshold_bound_withdrawable(view, position, asset)?;
        Ok(bound.min(self.liquidity(view, asset)))
    }

    fn accrue(&mut self, now: Timestamp) {
        let Some(last) = self.last_accrual else {
            self.last_accrual = Some(now);
            return;
        };
        if now <= last {
            return;
        }
        let years = last.elapsed_years(&now);
        for (&(_, asset), amount) in self.debt.iter_mut() {
            let Some(reserve) = self.reserves.get(&asset) else {
                continue;
            };
            if reserve.borrow_rate_apr.is_zero() || amount.is_zero() {
                continue;
            }
            let grown = reserve
                .borrow_rate_apr
                .checked_mul(years)
                .and_then(|rate| rate.checked_add(Decimal::ONE))
                .and_then(|factor| amount.checked_mul(factor));
            let Some(grown) = grown else {
                debug!(market = %self.address, %asset, "interest overflow, debt left as is");
                continue;
            };
            *amount = math::round_to(grown, reserve.decimals, Rounding::Up);
        }
        self.last_accrual = Some(now);
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    fn clone_box(&self) -> Box<dyn LendingMarket> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{OracleBook, PriceFeed};
    use crate::token::{Asset, TokenLedger};
    use rust_decimal_macros::dec;

    const MARKET: Address = Address(0x200);
    const WETH: Address = Address(0x201);
    const USDC: Address = Address(0x202);
    const FEED: Address = Address(0x203);
    const POOL: Address = Address(0x300);

    struct Setup {
        tokens: TokenLedger,
        oracles: OracleBook,
        market: SimLendingMarket,
        now: Timestamp,
    }

    impl Setup {
        fn ctx(&mut self) -> (ChainCtx<'_>, &mut SimLendingMarket) {
            (
                ChainCtx {
                    tokens: &mut self.tokens,
                    oracles: &self.oracles,
                    now: self.now,
                },
                &mut self.market,
            )
        }

        fn view(&self) -> ChainView<'_> {
            ChainView {
                tokens: &self.tokens,
                oracles: &self.oracles,
                now: self.now,
            }
        }
    }

    // WETH at 2000 USDC, 80% max LTV, 1M USDC liquidity, pool holds 10 WETH
    fn setup() -> Setup {
        let now = Timestamp::from_secs(1_000);
        let mut tokens = TokenLedger::new();
        tokens
            .register_asset(Asset::new(WETH, "WETH", "Wrapped Ether", 18).with_minter(Address::SYSTEM))
            .unwrap();
        tokens
            .register_asset(Asset::new(USDC, "USDC", "USD Coin", 6).with_minter(Address::SYSTEM))
            .unwrap();
        tokens.mint(Address::SYSTEM, USDC, MARKET, dec!(1_000_000)).unwrap();
        tokens.mint(Address::SYSTEM, WETH, POOL, dec!(10)).unwrap();
        tokens.approve(WETH, POOL, MARKET, dec!(1000)).unwrap();
        tokens.approve(USDC, POOL, MARKET, dec!(1_000_000)).unwrap();

        let mut oracles = OracleBook::new();
        let mut feed = PriceFeed::new(FEED, "WETH / USD", 8);
        feed.push_price(dec!(2000), now).unwrap();
        oracles.add_feed(feed);

        let mut market = SimLendingMarket::new(MARKET, "sim");
        market.list_reserve(WETH, ReserveConfig::new(18, dec!(0.8), PriceSource::Feed(FEED)));
        market.list_reserve(
            USDC,
            ReserveConfig::new(6, dec!(0.8), PriceSource::Fixed(dec!(1))).with_borrow_rate(dec!(0.1)),
        );
        market.accrue(now);

        Setup {
            tokens,
            oracles,
            market,
            now,
        }
    }

    #[test]
    fn test_supply_and_borrow_capacity() {
        let mut s = setup();
        let (mut ctx, market) = s.ctx();
        market.supply(&mut ctx, POOL, WETH, dec!(10)).unwrap();

        assert_eq!(s.market.current_collateral(POOL, WETH), dec!(10));
        // 10 * 2000 * 0.8
        assert_eq!(
            s.market.available_borrows(&s.view(), POOL, USDC).unwrap(),
            dec!(16000)
        );
    }

    #[test]
    fn test_borrow_beyond_capacity_rejected() {
        let mut s = setup();
        let (mut ctx, market) = s.ctx();
        market.supply(&mut ctx, POOL, WETH, dec!(10)).unwrap();
        let result = market.borrow(&mut ctx, POOL, USDC, dec!(16000.000001));
        assert!(matches!(result, Err(LendingError::ExceedsBorrowCapacity { .. })));

        market.borrow(&mut ctx, POOL, USDC, dec!(16000)).unwrap();
        assert_eq!(s.market.current_debt(POOL, USDC), dec!(16000));
        assert_eq!(s.tokens.balance_of(USDC, POOL), dec!(16000));
    }

    #[test]
    fn test_withdraw_respects_ltv() {
        let mut s = setup();
        let (mut ctx, market) = s.ctx();
        market.supply(&mut ctx, POOL, WETH, dec!(10)).unwrap();
        market.borrow(&mut ctx, POOL, USDC, dec!(8000)).unwrap();

        // headroom 16000 - 8000 = 8000 USD -> 8000 / (2000 * 0.8) = 5 WETH
        assert_eq!(s.market.max_withdrawable(&s.view(), POOL, WETH).unwrap(), dec!(5));

        let (mut ctx, market) = s.ctx();
        let result = market.withdraw(&mut ctx, POOL, WETH, dec!(5.1));
        assert!(matches!(result, Err(LendingError::InsufficientCollateral { .. })));
        market.withdraw(&mut ctx, POOL, WETH, dec!(5)).unwrap();
        assert_eq!(s.market.max_withdrawable(&s.view(), POOL, WETH).unwrap(), dec!(0));
    }

    #[test]
    fn test_withdraw_bound_uses_liquidation_threshold() {
        let mut s = setup();
        s.market.list_reserve(
            WETH,
            ReserveConfig::new(18, dec!(0.8), PriceSource::Feed(FEED)).with_liquidation_threshold(dec!(0.85)),
        );
        let (mut ctx, market) = s.ctx();
        market.supply(&mut ctx, POOL, WETH, dec!(10)).unwrap();
        market.borrow(&mut ctx, POOL, USDC, dec!(16000)).unwrap();

        // at max LTV nothing more can be borrowed, but 17000 - 16000 = 1000 USD
        // of threshold headroom frees 1000 / (2000 * 0.85) WETH
        assert_eq!(s.market.available_borrows(&s.view(), POOL, USDC).unwrap(), dec!(0));
        assert_eq!(
            s.market.max_withdrawable(&s.view(), POOL, WETH).unwrap(),
            dec!(0.588235294117647058)
        );

        let (mut ctx, market) = s.ctx();
        market.withdraw(&mut ctx, POOL, WETH, dec!(0.5)).unwrap();
        assert_eq!(s.market.current_collateral(POOL, WETH), dec!(9.5));
    }

    #[test]
    fn test_threshold_never_below_max_ltv() {
        let config = ReserveConfig::new(18, dec!(0.8), PriceSource::Feed(FEED)).with_liquidation_threshold(dec!(0.5));
        assert_eq!(config.liquidation_threshold, dec!(0.8));
    }

    #[test]
    fn test_valuation_overflow_is_an_error() {
        let mut s = setup();
        s.market.list_reserve(WETH, ReserveConfig::new(18, dec!(0.8), PriceSource::Fixed(Decimal::MAX)));
        let (mut ctx, market) = s.ctx();
        market.supply(&mut ctx, POOL, WETH, dec!(10)).unwrap();
        let result = s.market.available_borrows(&s.view(), POOL, USDC);
        assert_eq!(result, Err(LendingError::Math(MathError::Overflow)));
    }

    #[test]
    fn test_repay_caps_at_debt() {
        let mut s = setup();
        let (mut ctx, market) = s.ctx();
        market.supply(&mut ctx, POOL, WETH, dec!(10)).unwrap();
        market.borrow(&mut ctx, POOL, USDC, dec!(1000)).unwrap();
        let repaid = market.repay(&mut ctx, POOL, USDC, dec!(5000)).unwrap();
        assert_eq!(repaid, dec!(1000));
        assert_eq!(s.market.current_debt(POOL, USDC), dec!(0));
        assert_eq!(s.tokens.balance_of(USDC, POOL), dec!(0));
    }

    #[test]
    fn test_paused_market_rejects() {
        let mut s = setup();
        s.market.set_paused(true);
        let (mut ctx, market) = s.ctx();
        let result = market.supply(&mut ctx, POOL, WETH, dec!(1));
        assert!(matches!(result, Err(LendingError::MarketPaused { .. })));
    }

    #[test]
    fn test_unlisted_and_disabled_assets() {
        let mut s = setup();
        s.market.list_reserve(
            WETH,
            ReserveConfig::new(18, dec!(0.8), PriceSource::Feed(FEED)).without_borrowing(),
        );
        let (mut ctx, market) = s.ctx();
        let result = market.supply(&mut ctx, POOL, Address(0x999), dec!(1));
        assert!(matches!(result, Err(LendingError::UnsupportedAsset { .. })));
        let result = market.borrow(&mut ctx, POOL, WETH, dec!(1));
        assert!(matches!(result, Err(LendingError::BorrowingDisabled { .. })));
    }

    #[test]
    fn test_interest_accrues_on_debt() {
        let mut s = setup();
        let (mut ctx, market) = s.ctx();
        market.supply(&mut ctx, POOL, WETH, dec!(10)).unwrap();
        market.borrow(&mut ctx, POOL, USDC, dec!(1000)).unwrap();

        // half a year at 10% simple
        let later = s.now.plus_millis(15_768_000_000);
        s.market.accrue(later);
        assert_eq!(s.market.current_debt(POOL, USDC), dec!(1050));
    }

    #[test]
    fn test_stale_feed_blocks_valuation() {
        let mut s = setup();
        let (mut ctx, market) = s.ctx();
        market.supply(&mut ctx, POOL, WETH, dec!(10)).unwrap();
        s.now = s.now.plus_millis(3_601_000);
        let result = s.market.available_borrows(&s.view(), POOL, USDC);
        assert!(matches!(result, Err(LendingError::Oracle(OracleError::Stale { .. }))));
    }
}
