//! Rounding helpers for token amounts.
//!
//! Every amount that crosses a transfer boundary is quantized to the asset's
//! decimals. The direction always favors the pool: payouts round down, charges
//! round up.

use rust_decimal::{Decimal, RoundingStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Toward zero. Used for anything paid out or minted to a user.
    Down,
    /// Away from zero. Used for anything charged to or burned from a user.
    Up,
}

impl Rounding {
    fn strategy(self) -> RoundingStrategy {
        match self {
            Rounding::Down => RoundingStrategy::ToZero,
            Rounding::Up => RoundingStrategy::AwayFromZero,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    #[error("arithmetic overflow")]
    Overflow,

    #[error("division by zero")]
    DivisionByZero,
}

/// Quantize `value` to `decimals` fractional digits.
pub fn round_to(value: Decimal, decimals: u32, rounding: Rounding) -> Decimal {
    value.round_dp_with_strategy(decimals, rounding.strategy())
}

/// `a * b / c` quantized to `decimals`. Multiplies first so exact ratios stay exact.
pub fn mul_div(
    a: Decimal,
    b: Decimal,
    c: Decimal,
    decimals: u32,
    rounding: Rounding,
) -> Result<Decimal, MathError> {
    if c.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let product = a.checked_mul(b).ok_or(MathError::Overflow)?;
    let quotient = product.checked_div(c).ok_or(MathError::Overflow)?;
    Ok(round_to(quotient, decimals, rounding))
}

pub fn mul(a: Decimal, b: Decimal) -> Result<Decimal, MathError> {
    a.checked_mul(b).ok_or(MathError::Overflow)
}

pub fn div(a: Decimal, b: Decimal) -> Result<Decimal, MathError> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    a.checked_div(b).ok_or(MathError::Overflow)
}

/// Smallest representable amount for an asset with `decimals`.
pub fn unit(decimals: u32) -> Decimal {
    Decimal::new(1, decimals)
}

/// True when `value` carries no more than `decimals` fractional digits.
pub fn fits_decimals(value: Decimal, decimals: u32) -> bool {
    value.normalize().scale() <= decimals
}
