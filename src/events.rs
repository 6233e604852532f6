// 11.0: every state change produces an event. used for audit trails and for notifying
// keepers and indexers. the EventPayload enum lists all event types.
// rejected operations are logged too, even though their state changes were rolled back.

use crate::strategy::{RebalanceAction, StrategyKind};
use crate::types::{Address, Leverage, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Pool lifecycle
    PoolDeployed(PoolDeployedEvent),
    Rebalanced(RebalancedEvent),

    // Share events
    Deposit(DepositEvent),
    Withdrawal(WithdrawalEvent),
    Redemption(RedemptionEvent),

    // Environment events
    PriceUpdated(PriceUpdatedEvent),
    RegistryUpdated(RegistryUpdatedEvent),

    // Audit
    OperationRejected(OperationRejectedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolDeployedEvent {
    pub pool: Address,
    pub deployer: Address,
    pub share_token: Address,
    pub strategy: StrategyKind,
    pub asset0: Address,
    pub asset1: Address,
    pub target_leverage: Leverage,
    pub initial_shares: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositEvent {
    pub pool: Address,
    pub account: Address,
    pub amount: Decimal,
    pub shares: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalEvent {
    pub pool: Address,
    pub account: Address,
    pub amount: Decimal,
    pub shares: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionEvent {
    pub pool: Address,
    pub account: Address,
    pub shares: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalancedEvent {
    pub pool: Address,
    pub keeper: Address,
    pub leverage_before: Option<Leverage>,
    pub leverage_after: Option<Leverage>,
    pub net_value_after: Decimal,
    pub action: RebalanceAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceUpdatedEvent {
    pub feed: Address,
    pub round_id: u64,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryUpdatedEvent {
    pub key: String,
    pub value: Address,
    pub previous: Option<Address>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    DeployPool,
    Deposit,
    Withdraw,
    Redeem,
    Rebalance,
    NativeTransfer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRejectedEvent {
    pub operation: Operation,
    pub caller: Address,
    pub pool: Option<Address>,
    pub reason: String,
}
