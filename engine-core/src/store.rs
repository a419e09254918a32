//! Persistence is an external collaborator in the source system: an
//! abstract key/row store exposing `select`/`insert`/`update`/`upsert`.
//! The generic `select<T>(table, predicate)` shape from the design notes
//! collapses here into one typed repository trait per aggregate — the
//! idiomatic Rust rendition of "a typed row interface per table."

use async_trait::async_trait;

use crate::error::EngineResult;
use crate::limit_order::LimitOrder;
use crate::market::Market;
use crate::ohlcv::{MarketStats, OhlcvCandle};
use crate::position::Position;
use crate::trade::Trade;
use crate::types::{MarketId, OrderId, PositionId, Timeframe};

#[async_trait]
pub trait MarketStore: Send + Sync {
    async fn insert_market(&self, market: Market) -> EngineResult<Market>;
    async fn update_market(&self, market: Market) -> EngineResult<Market>;
    async fn market_by_id(&self, id: MarketId) -> EngineResult<Option<Market>>;
    async fn market_by_symbol(&self, symbol: &str) -> EngineResult<Option<Market>>;
    async fn all_markets(&self) -> EngineResult<Vec<Market>>;
}

#[async_trait]
pub trait PositionStore: Send + Sync {
    async fn insert_position(&self, position: Position) -> EngineResult<Position>;
    async fn update_position(&self, position: Position) -> EngineResult<Position>;
    async fn position_by_id(&self, id: PositionId) -> EngineResult<Option<Position>>;
    async fn positions_by_user(&self, user_id: &str) -> EngineResult<Vec<Position>>;
    async fn open_positions(&self) -> EngineResult<Vec<Position>>;
    async fn open_positions_with_triggers(&self) -> EngineResult<Vec<Position>>;
}

#[async_trait]
pub trait TradeStore: Send + Sync {
    async fn insert_trade(&self, trade: Trade) -> EngineResult<Trade>;
    async fn trades_by_user(&self, user_id: &str) -> EngineResult<Vec<Trade>>;
    async fn trades_by_position(&self, position_id: PositionId) -> EngineResult<Vec<Trade>>;
}

#[async_trait]
pub trait LimitOrderStore: Send + Sync {
    async fn insert_order(&self, order: LimitOrder) -> EngineResult<LimitOrder>;
    async fn update_order(&self, order: LimitOrder) -> EngineResult<LimitOrder>;
    async fn order_by_id(&self, id: OrderId) -> EngineResult<Option<LimitOrder>>;
    async fn orders_by_user(&self, user_id: &str) -> EngineResult<Vec<LimitOrder>>;
    async fn open_orders_by_market(&self, market_id: MarketId) -> EngineResult<Vec<LimitOrder>>;
    async fn all_open_orders(&self) -> EngineResult<Vec<LimitOrder>>;
}

#[async_trait]
pub trait OhlcvStore: Send + Sync {
    async fn upsert_candle(&self, candle: OhlcvCandle) -> EngineResult<OhlcvCandle>;
    async fn candles(
        &self,
        market_id: MarketId,
        timeframe: Timeframe,
        start_time: i64,
        end_time: i64,
        limit: usize,
    ) -> EngineResult<Vec<OhlcvCandle>>;
    async fn upsert_stats(&self, stats: MarketStats) -> EngineResult<MarketStats>;
    async fn stats_by_market(&self, market_id: MarketId) -> EngineResult<Option<MarketStats>>;
}

/// The aggregate persistence collaborator every component is handed.
pub trait Store: MarketStore + PositionStore + TradeStore + LimitOrderStore + OhlcvStore {}

impl<T> Store for T where T: MarketStore + PositionStore + TradeStore + LimitOrderStore + OhlcvStore {}
