// 1.0: all the primitives live here. nothing in the engine works without these types.
// addresses, prices, leverage, basis points, timestamps. each is a newtype so the compiler catches mixups.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

// every actor has one: users, pools, tokens, feeds, lending markets, exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub u64);

impl Address {
    // genesis authority. owns the native currency mint.
    pub const SYSTEM: Address = Address(0);
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

// 1.1: price in quote units per unit of base. must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn new_unchecked(value: Decimal) -> Self {
        debug_assert!(value > Decimal::ZERO);
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    // quote per base -> base per quote
    pub fn inverse(&self) -> Self {
        Self(Decimal::ONE / self.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.2: leverage as a fixed point ratio with 4 implied decimals. 10_000 = 1.0x.
// the only convention used anywhere in the crate, parameters and read models alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Leverage(u32);

impl Leverage {
    pub const SCALE: u32 = 10_000;
    pub const ONE: Leverage = Leverage(Self::SCALE);

    pub fn from_bps(bps: u32) -> Self {
        Self(bps)
    }

    // floors to the nearest bp, saturating on absurd ratios
    pub fn from_ratio(ratio: Decimal) -> Self {
        let scaled = (ratio * Decimal::from(Self::SCALE)).floor();
        if scaled <= Decimal::ZERO {
            return Self(0);
        }
        Self(scaled.to_u32().unwrap_or(u32::MAX))
    }

    pub fn bps(&self) -> u32 {
        self.0
    }

    pub fn as_ratio(&self) -> Decimal {
        Decimal::new(self.0 as i64, 4)
    }

    pub fn is_levered(&self) -> bool {
        self.0 > Self::SCALE
    }

    // absolute distance in bps
    pub fn distance(&self, other: Leverage) -> u32 {
        self.0.abs_diff(other.0)
    }
}

impl fmt::Display for Leverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.as_ratio())
    }
}

// 1.3: basis points. 100 bps = 1%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Bps(u32);

impl Bps {
    pub fn new(bps: u32) -> Self {
        Self(bps)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn as_fraction(&self) -> Decimal {
        Decimal::new(self.0 as i64, 4)
    }

    // 1 - fraction, used for slippage floors
    pub fn complement(&self) -> Decimal {
        Decimal::ONE - self.as_fraction()
    }
}

// 1.4: millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn from_secs(secs: i64) -> Self {
        Self(secs * 1000)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn plus_millis(&self, ms: i64) -> Self {
        Self(self.0 + ms)
    }

    // whole seconds from self to later, zero if later is in the past
    pub fn elapsed_secs(&self, later: &Timestamp) -> u64 {
        if later.0 <= self.0 {
            return 0;
        }
        ((later.0 - self.0) / 1000) as u64
    }

    pub fn elapsed_years(&self, later: &Timestamp) -> Decimal {
        let diff_ms = (later.0 - self.0).max(0);
        Decimal::from(diff_ms) / dec!(31_536_000_000)
    }
}
