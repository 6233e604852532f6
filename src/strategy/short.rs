// 9.2 strategy/short.rs: leveraged short. supply the stable asset, borrow the volatile one
// and sell it. value rises as the volatile asset falls.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{StrategyAdapter, StrategyKind};
use crate::math::{self, MathError};
use crate::types::{Address, Price};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortStrategy {
    address: Address,
}

impl ShortStrategy {
    pub fn new(address: Address) -> Self {
        Self { address }
    }
}

impl StrategyAdapter for ShortStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Short
    }

    fn address(&self) -> Address {
        self.address
    }

    // volatile debt -> stable units
    fn debt_to_base(&self, amount1: Decimal, price: Price) -> Result<Decimal, MathError> {
        math::mul(amount1, price.value())
    }

    fn base_to_debt(&self, amount0: Decimal, price: Price) -> Result<Decimal, MathError> {
        math::div(amount0, price.value())
    }
}
