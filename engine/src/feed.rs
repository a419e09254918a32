//! The oracle is an external collaborator; this is the bundled feed the
//! binary runs against absent a real venue adapter. A market's
//! price is not addressable by symbol at creation time (`MarketEngine`
//! draws its id before the market exists), so a seed price is queued in
//! config order and pinned to whichever id claims it first; every lookup
//! after that is by id and never touches the queue again.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;
use decimal::FixedDecimal;
use engine_core::{CollateralAsset, MarketId};
use price_oracle::OracleFeed;

#[derive(Default)]
pub struct StaticFeed {
    market_prices: DashMap<MarketId, FixedDecimal>,
    pending_seed_prices: Mutex<VecDeque<FixedDecimal>>,
    asset_prices: DashMap<CollateralAsset, FixedDecimal>,
}

impl StaticFeed {
    pub fn new() -> Self {
        let feed = Self::default();
        feed.asset_prices.insert(CollateralAsset::C2, FixedDecimal::ONE);
        feed
    }

    /// Queues `price` to be claimed by the next market created with no
    /// price of its own yet. Call once per configured market, in the same
    /// order those markets are created in.
    pub fn queue_seed_price(&self, price: FixedDecimal) {
        self.pending_seed_prices.lock().unwrap().push_back(price);
    }

    pub fn set_market_price(&self, market_id: MarketId, price: FixedDecimal) {
        self.market_prices.insert(market_id, price);
    }

    pub fn set_asset_price(&self, asset: CollateralAsset, price: FixedDecimal) {
        self.asset_prices.insert(asset, price);
    }
}

#[async_trait]
impl OracleFeed for StaticFeed {
    async fn oracle_price(&self, market_id: MarketId) -> anyhow::Result<FixedDecimal> {
        if let Some(price) = self.market_prices.get(&market_id).map(|p| *p) {
            return Ok(price);
        }
        let Some(price) = self.pending_seed_prices.lock().unwrap().pop_front() else {
            return Err(anyhow::anyhow!("no price seeded for market {market_id}"));
        };
        self.market_prices.insert(market_id, price);
        Ok(price)
    }

    async fn price_of(&self, asset: CollateralAsset) -> anyhow::Result<FixedDecimal> {
        self.asset_prices
            .get(&asset)
            .map(|p| *p)
            .ok_or_else(|| anyhow::anyhow!("no price seeded for asset {asset}"))
    }
}
