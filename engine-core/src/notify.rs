use async_trait::async_trait;
use decimal::FixedDecimal;
use serde::Serialize;

use crate::types::{MarketId, OrderId, PositionId, UserId};

/// Events the engine hands to the metric/event collaborator. The source
/// system emits these as loosely-typed channel/topic pairs; here they are a
/// closed enum so every call site is checked at compile time.
#[derive(Debug, Clone, Serialize)]
pub enum EngineEvent {
    PositionOpened {
        position_id: PositionId,
        user_id: UserId,
    },
    PositionUpdated {
        position_id: PositionId,
        user_id: UserId,
    },
    PositionClosed {
        position_id: PositionId,
        user_id: UserId,
        realized_pnl: FixedDecimal,
    },
    PositionLiquidated {
        position_id: PositionId,
        user_id: UserId,
    },
    BorrowingFeeCharged {
        position_id: PositionId,
        amount: FixedDecimal,
    },
    FundingFeeCharged {
        position_id: PositionId,
        amount: FixedDecimal,
    },
    LimitOrderFilled {
        order_id: OrderId,
        position_id: PositionId,
    },
    LimitOrderCancelled {
        order_id: OrderId,
    },
    MarketPaused {
        market_id: MarketId,
        reason: String,
    },
}

#[async_trait]
pub trait Notify: Send + Sync {
    async fn notify(&self, event: EngineEvent);
}

/// Fallback sink used wherever no real metrics/eventing collaborator is
/// wired up: logs at info level and drops the event.
pub struct LoggingNotifier;

#[async_trait]
impl Notify for LoggingNotifier {
    async fn notify(&self, event: EngineEvent) {
        log::info!("event: {:?}", event);
    }
}
