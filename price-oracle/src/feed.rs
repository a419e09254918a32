use async_trait::async_trait;
use decimal::FixedDecimal;
use engine_core::{CollateralAsset, MarketId};

/// The external price oracle feed. The engine only ever talks to it through
/// this trait, never directly, so a devnet/testnet mock and a production
/// feed are interchangeable.
#[async_trait]
pub trait OracleFeed: Send + Sync {
    async fn oracle_price(&self, market_id: MarketId) -> anyhow::Result<FixedDecimal>;
    async fn price_of(&self, asset: CollateralAsset) -> anyhow::Result<FixedDecimal>;
}
