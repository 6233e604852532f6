// leverage-vault: leveraged exposure vault engine.
// share accounting first: every share mint, burn and payout rounds in the pool's favor.
// leverage is maintained by a strategy that borrows, swaps and supplies through adapters.
// all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Address, Price, Leverage, Bps, Timestamp
//   1.5  math.rs: directed rounding, checked mul-div
//   2.x  token.rs: fungible asset ledger: balances, allowances, minter roles
//   3.x  oracle.rs: round-based price feeds, staleness checks
//   4.x  lending.rs: lending market trait + simulated Aave-like market
//   5.x  exchange.rs: exchange trait + simulated router with fee and impact
//   6.x  registry.rs: keyed address registry
//   7.x  config.rs: oracle, slippage, rebalance params, env presets
//   7.5  chain.rs: execution environment, adapter routing, snapshots
//   8.x  engine/: entry points, atomic execution, reads
//   8.x  pool/: share ledger, NAV, deposit/withdraw/redeem
//   9.x  strategy/: long/short variants, pool state, rebalancing
//   10.x factory.rs: pool construction and seeding
//   11.x events.rs: state transition events for audit
//   14.x presets.rs: WETH/USDC fixture

// core accounting modules
pub mod engine;
pub mod events;
pub mod factory;
pub mod math;
pub mod pool;
pub mod strategy;
pub mod types;

// environment and adapters
pub mod chain;
pub mod exchange;
pub mod lending;
pub mod oracle;
pub mod registry;
pub mod token;

// configuration and fixtures
pub mod config;
pub mod presets;

// re exports for convenience
pub use chain::{Chain, ChainCtx, ChainView};
pub use config::{ConfigError, Environment, ProtocolConfig};
pub use engine::*;
pub use events::*;
pub use exchange::{Exchange, ExchangeError, SimExchange, SwapRoute};
pub use factory::{DeployRequest, FactoryError, PoolFactory};
pub use lending::{LendingError, LendingMarket, PriceSource, ReserveConfig, SimLendingMarket};
pub use math::{MathError, Rounding};
pub use oracle::{OracleBook, OracleError, OracleReading, OracleRound, PriceFeed, PriceOracle};
pub use pool::{DepositOutcome, Pool, PoolError, PoolParameters, ShareBasis, WithdrawalOutcome};
pub use presets::{Fixture, FixtureOptions, PoolSetup};
pub use registry::{Registry, RegistryError, RegistryKey};
pub use strategy::*;
pub use token::{Asset, TokenError, TokenLedger};
pub use types::*;
