use chrono::{DateTime, Utc};
use decimal::FixedDecimal;
use serde::{Deserialize, Serialize};

use crate::types::{MarketId, PositionId, Side, TradeId, UserId};

/// Immutable ledger row: one per open and per (partial or full) close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub position_id: PositionId,
    pub user_id: UserId,
    pub market_id: MarketId,
    pub side: Side,
    pub size: FixedDecimal,
    pub price: FixedDecimal,
    pub leverage: FixedDecimal,
    pub realized_pnl: Option<FixedDecimal>,
    pub fee: FixedDecimal,
    pub created_at: DateTime<Utc>,
    pub is_partial_close: Option<bool>,
}
