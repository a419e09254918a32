use chrono::{DateTime, Utc};
use decimal::FixedDecimal;
use serde::{Deserialize, Serialize};

use crate::types::{CollateralAsset, MarketId, PositionId, PositionStatus, Side, UserId};

/// One row per active (or historical) user exposure against a market's vAMM.
///
/// Invariants: `size / margin <= market.max_leverage`; exactly one of
/// `locked_margin_c1` / `locked_margin_c2` is non-zero at open time, though
/// both may become non-zero after `editMargin`; `stop_loss_price` sits below
/// `entry_price` for LONG (above for SHORT), symmetric for `take_profit_price`;
/// a terminal `status` implies `closing_price`/`closed_at` are set and all
/// locked margin has been released.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub user_id: UserId,
    pub market_id: MarketId,
    pub symbol: String,
    pub side: Side,

    pub size: FixedDecimal,
    pub entry_price: FixedDecimal,
    pub leverage: FixedDecimal,
    pub margin: FixedDecimal,
    pub token: CollateralAsset,

    pub locked_margin_c1: FixedDecimal,
    pub locked_margin_c2: FixedDecimal,

    pub stop_loss_price: Option<FixedDecimal>,
    pub take_profit_price: Option<FixedDecimal>,

    pub accumulated_funding: FixedDecimal,
    pub accumulated_borrowing: FixedDecimal,
    pub last_funding_update: i64,
    pub last_borrowing_fee_update: i64,

    pub status: PositionStatus,
    pub closed_at: Option<DateTime<Utc>>,
    pub closing_price: Option<FixedDecimal>,
    pub realized_pnl: Option<FixedDecimal>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    pub fn is_open(&self) -> bool {
        matches!(self.status, PositionStatus::Open)
    }

    /// Fraction of the original notional a `size_delta` close represents.
    pub fn close_fraction(&self, size_delta: &FixedDecimal) -> Result<FixedDecimal, decimal::DecimalError> {
        size_delta.div(&self.size)
    }
}
