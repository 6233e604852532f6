// 8.0: vault engine. coordinates pool deployment, share deposits and withdrawals,
// price updates and rebalancing against the simulated chain.
// deterministic and event-driven with no external I/O.

mod config;
mod core;
mod pools;
mod rebalance;
mod results;

pub use config::EngineConfig;
pub use core::Engine;
pub use results::{EngineError, ErrorKind, PoolSnapshot};
