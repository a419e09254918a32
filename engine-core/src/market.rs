use chrono::{DateTime, Utc};
use decimal::FixedDecimal;
use serde::{Deserialize, Serialize};

use crate::types::{MarketId, MarketStatus};

/// One tradable asset's vAMM + risk-parameter state.
///
/// Invariants (enforced by `market-engine`, never by this struct alone):
/// `virtual_k == virtual_base_reserve * virtual_quote_reserve` at rest,
/// `long_open_interest + short_open_interest <= available_liquidity`,
/// funding fields always within `[-max_funding_rate, max_funding_rate]`,
/// both reserves strictly positive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub symbol: String,
    pub token_address: String,

    pub max_leverage: FixedDecimal,
    pub maintenance_margin: FixedDecimal,

    pub borrowing_rate: FixedDecimal,

    pub funding_rate: FixedDecimal,
    pub funding_rate_velocity: FixedDecimal,
    pub max_funding_rate: FixedDecimal,
    pub max_funding_velocity: FixedDecimal,

    pub long_open_interest: FixedDecimal,
    pub short_open_interest: FixedDecimal,
    pub available_liquidity: FixedDecimal,

    /// Integer-valued, scaled by `BASE_UNIT` (10^9).
    pub virtual_base_reserve: i128,
    /// Integer-valued, scaled by `QUOTE_UNIT` (10^6).
    pub virtual_quote_reserve: i128,
    pub virtual_k: i128,

    pub cumulative_fees_c1: FixedDecimal,
    pub cumulative_fees_c2: FixedDecimal,
    pub unclaimed_fees_c1: FixedDecimal,
    pub unclaimed_fees_c2: FixedDecimal,

    pub status: MarketStatus,
    pub last_updated_timestamp: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Market {
    pub fn is_active(&self) -> bool {
        matches!(self.status, MarketStatus::Active)
    }
}
