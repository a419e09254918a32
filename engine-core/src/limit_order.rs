use chrono::{DateTime, Utc};
use decimal::FixedDecimal;
use serde::{Deserialize, Serialize};

use crate::types::{CollateralAsset, MarketId, OrderId, OrderStatus, Side, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitOrder {
    pub id: OrderId,
    pub user_id: UserId,
    pub market_id: MarketId,
    pub symbol: String,
    pub side: Side,
    pub size: FixedDecimal,
    /// Trigger price: LONG fills when the virtual price falls to or below
    /// this, SHORT fills when it rises to or above it.
    pub price: FixedDecimal,
    pub leverage: FixedDecimal,
    pub token: CollateralAsset,
    pub required_margin: FixedDecimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LimitOrder {
    pub fn should_fill(&self, current_price: &FixedDecimal) -> bool {
        match self.side {
            Side::Long => current_price.compare(&self.price) != std::cmp::Ordering::Greater,
            Side::Short => current_price.compare(&self.price) != std::cmp::Ordering::Less,
        }
    }
}
