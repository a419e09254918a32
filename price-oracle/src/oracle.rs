use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use decimal::FixedDecimal;
use engine_core::{CollateralAsset, EngineError, EngineResult, MarketId, STALE_PRICE_BUDGET_MS};

use crate::feed::OracleFeed;

/// Number of attempts made against the feed before falling back to the
/// last-known price. Matches the short retry windows used elsewhere against
/// flaky upstream collaborators.
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(100);

#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn oracle_price(&self, market_id: MarketId) -> EngineResult<FixedDecimal>;
    async fn price_of(&self, asset: CollateralAsset) -> EngineResult<FixedDecimal>;
}

#[derive(Clone, Copy)]
struct LastKnown {
    price: FixedDecimal,
    at_ms: i64,
}

/// Wraps a raw [`OracleFeed`] with retry and last-known-price fallback,
/// bounded by `STALE_PRICE_BUDGET_MS`. Once a cached price ages past the
/// budget it is no longer eligible as a fallback and callers receive
/// `OracleUnavailable` instead of a silently stale number.
pub struct ResilientOracle<F: OracleFeed> {
    feed: Arc<F>,
    market_cache: engine_core::TtlCache<MarketId, LastKnown>,
    asset_cache: engine_core::TtlCache<CollateralAsset, LastKnown>,
}

impl<F: OracleFeed> ResilientOracle<F> {
    pub fn new(feed: Arc<F>) -> Self {
        let ttl_secs = (STALE_PRICE_BUDGET_MS / 1000).max(1) as u64;
        Self {
            feed,
            market_cache: engine_core::TtlCache::new(ttl_secs),
            asset_cache: engine_core::TtlCache::new(ttl_secs),
        }
    }

    async fn fetch_with_retry<T, Fut>(
        &self,
        mut attempt: impl FnMut() -> Fut,
    ) -> Option<T>
    where
        Fut: std::future::Future<Output = anyhow::Result<T>>,
    {
        for i in 0..MAX_ATTEMPTS {
            match attempt().await {
                Ok(value) => return Some(value),
                Err(err) => {
                    log::warn!("oracle feed attempt {} failed: {err:#}", i + 1);
                    if i + 1 < MAX_ATTEMPTS {
                        tokio::time::sleep(RETRY_BACKOFF).await;
                    }
                }
            }
        }
        None
    }
}

#[async_trait]
impl<F: OracleFeed> PriceOracle for ResilientOracle<F> {
    async fn oracle_price(&self, market_id: MarketId) -> EngineResult<FixedDecimal> {
        let feed = &self.feed;
        if let Some(price) = self
            .fetch_with_retry(|| feed.oracle_price(market_id))
            .await
        {
            self.market_cache.put(
                market_id,
                LastKnown {
                    price,
                    at_ms: Utc::now().timestamp_millis(),
                },
            );
            return Ok(price);
        }

        match self.market_cache.get(&market_id) {
            Some(last) if Utc::now().timestamp_millis() - last.at_ms <= STALE_PRICE_BUDGET_MS => {
                log::warn!("serving last-known oracle price for market {market_id}");
                Ok(last.price)
            }
            _ => Err(EngineError::OracleUnavailable(format!(
                "no fresh or within-budget price for market {market_id}"
            ))),
        }
    }

    async fn price_of(&self, asset: CollateralAsset) -> EngineResult<FixedDecimal> {
        let feed = &self.feed;
        if let Some(price) = self.fetch_with_retry(|| feed.price_of(asset)).await {
            self.asset_cache.put(
                asset,
                LastKnown {
                    price,
                    at_ms: Utc::now().timestamp_millis(),
                },
            );
            return Ok(price);
        }

        match self.asset_cache.get(&asset) {
            Some(last) if Utc::now().timestamp_millis() - last.at_ms <= STALE_PRICE_BUDGET_MS => {
                log::warn!("serving last-known price for collateral asset {asset}");
                Ok(last.price)
            }
            _ => Err(EngineError::OracleUnavailable(format!(
                "no fresh or within-budget price for asset {asset}"
            ))),
        }
    }
}
