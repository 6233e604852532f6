// 9.1 strategy/long.rs: leveraged long. supply the volatile asset, borrow the stable one.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{StrategyAdapter, StrategyKind};
use crate::math::{self, MathError};
use crate::types::{Address, Price};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongStrategy {
    address: Address,
}

impl LongStrategy {
    pub fn new(address: Address) -> Self {
        Self { address }
    }
}

impl StrategyAdapter for LongStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Long
    }

    fn address(&self) -> Address {
        self.address
    }

    // stable debt -> volatile units
    fn debt_to_base(&self, amount1: Decimal, price: Price) -> Result<Decimal, MathError> {
        math::div(amount1, price.value())
    }

    fn base_to_debt(&self, amount0: Decimal, price: Price) -> Result<Decimal, MathError> {
        math::mul(amount0, price.value())
    }
}
