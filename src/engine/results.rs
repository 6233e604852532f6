// 8.0.2: result types and errors for engine operations.
// every failure maps onto one ErrorKind so callers can react without matching
// through the nested adapter errors.

use crate::config::ConfigError;
use crate::exchange::ExchangeError;
use crate::factory::FactoryError;
use crate::lending::LendingError;
use crate::oracle::OracleError;
use crate::pool::PoolError;
use crate::registry::RegistryError;
use crate::strategy::{PoolState, StrategyError};
use crate::token::TokenError;
use crate::types::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Everything a keeper or UI needs about a pool, read in one go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub pool: Address,
    pub state: PoolState,
    pub total_shares: Decimal,
    pub share_price: Decimal,
    pub max_withdrawal: Decimal,
    pub ltv: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed input: zero amounts, bad parameters, dust that mints nothing.
    Validation,
    /// Caller lacks balance, allowance or shares.
    InsufficientFunds,
    /// Request exceeds what the pool or an adapter can serve right now.
    CapacityExceeded,
    /// The price feed is stale or malformed.
    StaleOracle,
    /// An external lending or exchange call failed.
    AdapterFailure,
    /// Net value is not positive while shares are outstanding.
    Insolvent,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Pool {0} not found")]
    PoolNotFound(Address),

    #[error("Invalid engine config: {0}")]
    Config(#[from] ConfigError),

    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Factory error: {0}")]
    Factory(#[from] FactoryError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Lending market error: {0}")]
    Lending(#[from] LendingError),

    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::PoolNotFound(_) => ErrorKind::NotFound,
            EngineError::Config(_) => ErrorKind::Validation,
            EngineError::Pool(e) => pool_kind(e),
            EngineError::Factory(e) => factory_kind(e),
            EngineError::Registry(e) => registry_kind(e),
            EngineError::Token(e) => token_kind(e),
            EngineError::Oracle(e) => oracle_kind(e),
            EngineError::Lending(e) => lending_kind(e),
            EngineError::Exchange(e) => exchange_kind(e),
        }
    }
}

fn pool_kind(e: &PoolError) -> ErrorKind {
    match e {
        PoolError::InsufficientShares { .. } => ErrorKind::InsufficientFunds,
        PoolError::ExceedsMaxWithdrawal { .. } => ErrorKind::CapacityExceeded,
        PoolError::Insolvent { .. } => ErrorKind::Insolvent,
        PoolError::DepositTooSmall { .. }
        | PoolError::RedemptionTooSmall { .. }
        | PoolError::NoSharesOutstanding
        | PoolError::ZeroAmount
        | PoolError::NativeTransferRejected { .. }
        | PoolError::Math(_) => ErrorKind::Validation,
        PoolError::Token(e) => token_kind(e),
        PoolError::Strategy(e) => strategy_kind(e),
        PoolError::Oracle(e) => oracle_kind(e),
        PoolError::Lending(e) => lending_kind(e),
    }
}

fn strategy_kind(e: &StrategyError) -> ErrorKind {
    match e {
        StrategyError::Oracle(e) => oracle_kind(e),
        StrategyError::Lending(e) => lending_kind(e),
        StrategyError::Exchange(e) => exchange_kind(e),
        StrategyError::Token(e) => token_kind(e),
        StrategyError::Math(_) => ErrorKind::Validation,
        StrategyError::Insolvent { .. } => ErrorKind::Insolvent,
        StrategyError::NoWithdrawableCollateral | StrategyError::InsufficientLiquidity { .. } => {
            ErrorKind::CapacityExceeded
        }
    }
}

fn factory_kind(e: &FactoryError) -> ErrorKind {
    match e {
        FactoryError::ZeroAddress { .. }
        | FactoryError::SameAsset
        | FactoryError::LeverageBelowOne(_)
        | FactoryError::LeverageAboveMax { .. }
        | FactoryError::LeverageUnreachable { .. }
        | FactoryError::ZeroDeposit
        | FactoryError::ShareTokenInUse(_)
        | FactoryError::ShareTokenNotOwned(_)
        | FactoryError::RegistryMismatch { .. } => ErrorKind::Validation,
        FactoryError::UnknownStrategy(_) => ErrorKind::NotFound,
        FactoryError::Registry(e) => registry_kind(e),
        FactoryError::Token(e) => token_kind(e),
        FactoryError::Oracle(e) => oracle_kind(e),
        FactoryError::Lending(e) => lending_kind(e),
        FactoryError::Exchange(e) => exchange_kind(e),
        FactoryError::Pool(e) => pool_kind(e),
    }
}

fn registry_kind(e: &RegistryError) -> ErrorKind {
    match e {
        RegistryError::NotFound(_) => ErrorKind::NotFound,
        RegistryError::Unauthorized { .. } | RegistryError::InvalidKey(_) => ErrorKind::Validation,
    }
}

fn token_kind(e: &TokenError) -> ErrorKind {
    match e {
        TokenError::InsufficientBalance { .. } | TokenError::InsufficientAllowance { .. } => {
            ErrorKind::InsufficientFunds
        }
        TokenError::UnknownAsset { .. } => ErrorKind::NotFound,
        TokenError::AlreadyRegistered { .. }
        | TokenError::Unauthorized { .. }
        | TokenError::InvalidAmount { .. } => ErrorKind::Validation,
    }
}

fn oracle_kind(e: &OracleError) -> ErrorKind {
    match e {
        OracleError::FeedNotFound { .. } => ErrorKind::NotFound,
        OracleError::Unrepresentable { .. } => ErrorKind::Validation,
        OracleError::NoData { .. }
        | OracleError::InvalidAnswer { .. }
        | OracleError::IncompleteRound { .. }
        | OracleError::Stale { .. } => ErrorKind::StaleOracle,
    }
}

fn lending_kind(e: &LendingError) -> ErrorKind {
    match e {
        LendingError::InsufficientCollateral { .. }
        | LendingError::ExceedsBorrowCapacity { .. }
        | LendingError::InsufficientLiquidity { .. } => ErrorKind::CapacityExceeded,
        LendingError::MarketNotFound { .. } => ErrorKind::NotFound,
        LendingError::MarketPaused { .. }
        | LendingError::UnsupportedAsset { .. }
        | LendingError::BorrowingDisabled { .. }
        | LendingError::ZeroAmount => ErrorKind::AdapterFailure,
        LendingError::Math(_) => ErrorKind::Validation,
        LendingError::Oracle(e) => oracle_kind(e),
        LendingError::Token(e) => token_kind(e),
    }
}

fn exchange_kind(e: &ExchangeError) -> ErrorKind {
    match e {
        ExchangeError::SlippageExceeded { .. } | ExchangeError::InsufficientLiquidity { .. } => {
            ErrorKind::CapacityExceeded
        }
        ExchangeError::VenueNotFound { .. } => ErrorKind::NotFound,
        ExchangeError::UnsupportedPair { .. } | ExchangeError::ZeroAmount => ErrorKind::AdapterFailure,
        ExchangeError::Math(_) => ErrorKind::Validation,
        ExchangeError::Oracle(e) => oracle_kind(e),
        ExchangeError::Token(e) => token_kind(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_nested_errors_classify_by_root_cause() {
        let stale = OracleError::Stale {
            feed: Address(9),
            age_secs: 7200,
            max_age_secs: 3600,
        };
        let err = EngineError::Pool(PoolError::Strategy(StrategyError::Oracle(stale)));
        assert_eq!(err.kind(), ErrorKind::StaleOracle);

        let slippage = ExchangeError::SlippageExceeded {
            expected_min: dec!(10),
            actual: dec!(9),
        };
        let err = EngineError::Pool(PoolError::Strategy(StrategyError::Exchange(slippage)));
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);

        let paused = LendingError::MarketPaused { market: Address(3) };
        assert_eq!(EngineError::Lending(paused).kind(), ErrorKind::AdapterFailure);
    }

    #[test]
    fn test_funds_and_validation() {
        let err = EngineError::Pool(PoolError::Token(TokenError::InsufficientAllowance {
            available: dec!(0),
            requested: dec!(1),
        }));
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
        assert_eq!(
            EngineError::Factory(FactoryError::SameAsset).kind(),
            ErrorKind::Validation
        );
        assert_eq!(EngineError::PoolNotFound(Address(1)).kind(), ErrorKind::NotFound);
    }
}
