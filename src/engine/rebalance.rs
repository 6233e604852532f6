//! Keeper-facing rebalancing.

use super::core::Engine;
use super::results::EngineError;
use crate::events::{EventPayload, Operation, RebalancedEvent};
use crate::strategy::{RebalanceAction, RebalanceHints, RebalanceReport};
use crate::types::Address;
use tracing::info;

impl Engine {
    /// One rebalance step toward the pool's target leverage. Anyone may call it.
    /// A failing adapter call aborts the whole step.
    pub fn rebalance(
        &mut self,
        keeper: Address,
        pool: Address,
        hints: RebalanceHints,
    ) -> Result<RebalanceReport, EngineError> {
        let report = self.execute(Operation::Rebalance, keeper, pool, |p, chain, config| {
            p.rebalance(chain, config, hints)
        })?;

        if report.action != RebalanceAction::None {
            info!(
                pool = %pool,
                before = ?report.before.leverage,
                after = ?report.after.leverage,
                "rebalanced"
            );
        }
        self.emit_event(EventPayload::Rebalanced(RebalancedEvent {
            pool,
            keeper,
            leverage_before: report.before.leverage,
            leverage_after: report.after.leverage,
            net_value_after: report.after.net_value,
            action: report.action,
        }));
        Ok(report)
    }

    /// Rebalance every pool once with unbounded hints. Returns the failures, if any.
    pub fn rebalance_all(&mut self, keeper: Address) -> Vec<(Address, EngineError)> {
        let mut pools: Vec<Address> = self.pools.keys().copied().collect();
        pools.sort();
        pools
            .into_iter()
            .filter_map(|pool| {
                self.rebalance(keeper, pool, RebalanceHints::unbounded())
                    .err()
                    .map(|e| (pool, e))
            })
            .collect()
    }
}
