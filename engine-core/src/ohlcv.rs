use decimal::FixedDecimal;
use serde::{Deserialize, Serialize};

use crate::types::{MarketId, Timeframe};

/// Primary key is the `(market_id, timeframe, timestamp)` triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OhlcvCandle {
    pub market_id: MarketId,
    pub timeframe: Timeframe,
    pub timestamp: i64,
    pub open: FixedDecimal,
    pub high: FixedDecimal,
    pub low: FixedDecimal,
    pub close: FixedDecimal,
    pub volume: FixedDecimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MarketStats {
    pub market_id: Option<MarketId>,
    pub all_time_volume: FixedDecimal,
    pub volume_24h: FixedDecimal,
    pub last_updated_timestamp: i64,
}
