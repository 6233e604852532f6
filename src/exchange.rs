// 5.0 exchange.rs: swap venue surface plus an oracle-priced reference router.
// the reference router quotes off a feed, takes a fee and charges a quadratic
// price impact that grows with trade size relative to route depth.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::chain::{ChainCtx, ChainView};
use crate::math::{self, MathError, Rounding};
use crate::oracle::{OracleError, PriceOracle};
use crate::token::TokenError;
use crate::types::{Address, Bps};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    #[error("slippage exceeded: expected at least {expected_min}, got {actual}")]
    SlippageExceeded { expected_min: Decimal, actual: Decimal },

    #[error("no route from {asset_in} to {asset_out}")]
    UnsupportedPair { asset_in: Address, asset_out: Address },

    #[error("insufficient venue liquidity: {available} < {requested}")]
    InsufficientLiquidity { available: Decimal, requested: Decimal },

    #[error("exchange {exchange} not found")]
    VenueNotFound { exchange: Address },

    #[error("zero amount")]
    ZeroAmount,

    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("token error: {0}")]
    Token(#[from] TokenError),

    #[error("math error: {0}")]
    Math(#[from] MathError),
}

pub trait Exchange: fmt::Debug {
    fn address(&self) -> Address;

    /// Protocol name the registry files this venue under, e.g. `Uniswap`.
    fn name(&self) -> &str;

    fn quote_exact_input(
        &self,
        view: &ChainView<'_>,
        asset_in: Address,
        asset_out: Address,
        amount_in: Decimal,
    ) -> Result<Decimal, ExchangeError>;

    /// Pulls `amount_in` from the caller (allowance to the venue) and pays out the
    /// proceeds. Fails without moving anything if the output is below `min_amount_out`.
    fn swap_exact_input(
        &mut self,
        ctx: &mut ChainCtx<'_>,
        caller: Address,
        asset_in: Address,
        asset_out: Address,
        amount_in: Decimal,
        min_amount_out: Decimal,
    ) -> Result<Decimal, ExchangeError>;

    fn clone_box(&self) -> Box<dyn Exchange>;
}

// 5.1: a tradable pair. feed answers quote per base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRoute {
    pub base: Address,
    pub quote: Address,
    pub feed: Address,
    pub fee: Bps,
    // notional, in quote units, at which price impact reaches 1%. None = no impact.
    pub depth: Option<Decimal>,
    // multiplier applied to the feed price. 1 = venue tracks the oracle.
    pub skew: Decimal,
}

impl SwapRoute {
    pub fn new(base: Address, quote: Address, feed: Address) -> Self {
        Self {
            base,
            quote,
            feed,
            fee: Bps::new(30),
            depth: None,
            skew: Decimal::ONE,
        }
    }

    pub fn with_fee(mut self, fee: Bps) -> Self {
        self.fee = fee;
        self
    }

    pub fn with_depth(mut self, depth: Decimal) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn with_skew(mut self, skew: Decimal) -> Self {
        self.skew = skew;
        self
    }

    fn serves(&self, asset_in: Address, asset_out: Address) -> bool {
        (self.base == asset_in && self.quote == asset_out)
            || (self.quote == asset_in && self.base == asset_out)
    }

    // 1% at full depth, quadratic below it
    fn price_impact(&self, notional: Decimal) -> Result<Decimal, MathError> {
        let Some(depth) = self.depth else {
            return Ok(Decimal::ZERO);
        };
        if depth <= Decimal::ZERO {
            return Ok(Decimal::ONE);
        }
        let utilization = math::div(notional, depth)?;
        math::mul(Decimal::new(1, 2), math::mul(utilization, utilization)?)
    }
}

#[derive(Debug, Clone)]
pub struct SimExchange {
    address: Address,
    name: String,
    routes: Vec<SwapRoute>,
    max_price_age_secs: u64,
}

impl SimExchange {
    pub fn new(address: Address, name: &str) -> Self {
        Self {
            address,
            name: name.to_string(),
            routes: Vec::new(),
            max_price_age_secs: 3600,
        }
    }

    pub fn with_max_price_age(mut self, secs: u64) -> Self {
        self.max_price_age_secs = secs;
        self
    }

    pub fn add_route(&mut self, route: SwapRoute) {
        self.routes
            .retain(|r| !(r.base == route.base && r.quote == route.quote));
        self.routes.push(route);
    }

    fn route(&self, asset_in: Address, asset_out: Address) -> Result<&SwapRoute, ExchangeError> {
        self.routes
            .iter()
            .find(|r| r.serves(asset_in, asset_out))
            .ok_or(ExchangeError::UnsupportedPair {
                asset_in,
                asset_out,
            })
    }
}

impl Exchange for SimExchange {
    fn address(&self) -> Address {
        self.address
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn quote_exact_input(
        &self,
        view: &ChainView<'_>,
        asset_in: Address,
        asset_out: Address,
        amount_in: Decimal,
    ) -> Result<Decimal, ExchangeError> {
        let route = self.route(asset_in, asset_out)?;
        let price = math::mul(
            view.oracles
                .latest_price(route.feed, view.now, self.max_price_age_secs)?
                .value(),
            route.skew,
        )?;

        // notional is measured in quote units either way
        let (gross, notional) = if asset_in == route.base {
            let out = math::mul(amount_in, price)?;
            (out, out)
        } else {
            (math::div(amount_in, price)?, amount_in)
        };

        let impact = route.price_impact(notional)?;
        if impact >= Decimal::ONE {
            return Err(ExchangeError::InsufficientLiquidity {
                available: route.depth.unwrap_or(Decimal::ZERO),
                requested: notional,
            });
        }

        let net = math::mul(math::mul(gross, route.fee.complement())?, Decimal::ONE - impact)?;
        let decimals = view.tokens.decimals(asset_out)?;
        Ok(math::round_to(net, decimals, Rounding::Down))
    }

    fn swap_exact_input(
        &mut self,
        ctx: &mut ChainCtx<'_>,
        caller: Address,
        asset_in: Address,
        asset_out: Address,
        amount_in: Decimal,
        min_amount_out: Decimal,
    ) -> Result<Decimal, ExchangeError> {
        if amount_in <= Decimal::ZERO {
            return Err(ExchangeError::ZeroAmount);
        }

        let view = ctx.view();
        let amount_out = self.quote_exact_input(&view, asset_in, asset_out, amount_in)?;
        if amount_out < min_amount_out {
            return Err(ExchangeError::SlippageExceeded {
                expected_min: min_amount_out,
                actual: amount_out,
            });
        }
        let available = view.tokens.balance_of(asset_out, self.address);
        if amount_out > available {
            return Err(ExchangeError::InsufficientLiquidity {
                available,
                requested: amount_out,
            });
        }

        ctx.tokens
            .transfer_from(asset_in, self.address, caller, self.address, amount_in)?;
        ctx.tokens
            .transfer(asset_out, self.address, caller, amount_out)?;

        debug!(
            exchange = %self.address,
            %caller,
            %asset_in,
            %asset_out,
            %amount_in,
            %amount_out,
            "swap"
        );
        Ok(amount_out)
    }

    fn clone_box(&self) -> Box<dyn Exchange> {
        Box::new(self.clone())
    }
}
