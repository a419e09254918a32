//! In-process fakes shared by the component crates' integration tests:
//! an `InMemoryStore` implementing every aggregate store trait (mirroring
//! `engine::store::InMemoryStore`, which a binary crate can't export as a
//! library dependency) and a `FixedOracle` with settable per-market/asset
//! prices for driving deterministic end-to-end scenarios.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use decimal::FixedDecimal;
use engine_core::{
    CollateralAsset, EngineError, EngineResult, LimitOrder, LimitOrderStore, Market, MarketId, MarketStats,
    MarketStore, OhlcvCandle, OhlcvStore, OrderId, OrderStatus, Position, PositionId, PositionStore, Timeframe,
    Trade, TradeStore,
};
use price_oracle::PriceOracle;

#[derive(Default)]
pub struct InMemoryStore {
    markets: DashMap<MarketId, Market>,
    market_symbols: DashMap<String, MarketId>,
    positions: DashMap<PositionId, Position>,
    trades: DashMap<uuid::Uuid, Trade>,
    orders: DashMap<OrderId, LimitOrder>,
    candles: DashMap<(MarketId, Timeframe, i64), OhlcvCandle>,
    stats: DashMap<MarketId, MarketStats>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MarketStore for InMemoryStore {
    async fn insert_market(&self, market: Market) -> EngineResult<Market> {
        self.market_symbols.insert(market.symbol.clone(), market.id);
        self.markets.insert(market.id, market.clone());
        Ok(market)
    }

    async fn update_market(&self, market: Market) -> EngineResult<Market> {
        self.markets.insert(market.id, market.clone());
        Ok(market)
    }

    async fn market_by_id(&self, id: MarketId) -> EngineResult<Option<Market>> {
        Ok(self.markets.get(&id).map(|m| m.clone()))
    }

    async fn market_by_symbol(&self, symbol: &str) -> EngineResult<Option<Market>> {
        let Some(id) = self.market_symbols.get(symbol).map(|e| *e) else {
            return Ok(None);
        };
        self.market_by_id(id).await
    }

    async fn all_markets(&self) -> EngineResult<Vec<Market>> {
        Ok(self.markets.iter().map(|e| e.value().clone()).collect())
    }
}

#[async_trait]
impl PositionStore for InMemoryStore {
    async fn insert_position(&self, position: Position) -> EngineResult<Position> {
        self.positions.insert(position.id, position.clone());
        Ok(position)
    }

    async fn update_position(&self, position: Position) -> EngineResult<Position> {
        self.positions.insert(position.id, position.clone());
        Ok(position)
    }

    async fn position_by_id(&self, id: PositionId) -> EngineResult<Option<Position>> {
        Ok(self.positions.get(&id).map(|p| p.clone()))
    }

    async fn positions_by_user(&self, user_id: &str) -> EngineResult<Vec<Position>> {
        Ok(self
            .positions
            .iter()
            .filter(|e| e.value().user_id == user_id)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn open_positions(&self) -> EngineResult<Vec<Position>> {
        Ok(self
            .positions
            .iter()
            .filter(|e| e.value().is_open())
            .map(|e| e.value().clone())
            .collect())
    }

    async fn open_positions_with_triggers(&self) -> EngineResult<Vec<Position>> {
        Ok(self
            .positions
            .iter()
            .filter(|e| {
                let p = e.value();
                p.is_open() && (p.stop_loss_price.is_some() || p.take_profit_price.is_some())
            })
            .map(|e| e.value().clone())
            .collect())
    }
}

#[async_trait]
impl TradeStore for InMemoryStore {
    async fn insert_trade(&self, trade: Trade) -> EngineResult<Trade> {
        self.trades.insert(trade.id, trade.clone());
        Ok(trade)
    }

    async fn trades_by_user(&self, user_id: &str) -> EngineResult<Vec<Trade>> {
        Ok(self
            .trades
            .iter()
            .filter(|e| e.value().user_id == user_id)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn trades_by_position(&self, position_id: PositionId) -> EngineResult<Vec<Trade>> {
        Ok(self
            .trades
            .iter()
            .filter(|e| e.value().position_id == position_id)
            .map(|e| e.value().clone())
            .collect())
    }
}

#[async_trait]
impl LimitOrderStore for InMemoryStore {
    async fn insert_order(&self, order: LimitOrder) -> EngineResult<LimitOrder> {
        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn update_order(&self, order: LimitOrder) -> EngineResult<LimitOrder> {
        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn order_by_id(&self, id: OrderId) -> EngineResult<Option<LimitOrder>> {
        Ok(self.orders.get(&id).map(|o| o.clone()))
    }

    async fn orders_by_user(&self, user_id: &str) -> EngineResult<Vec<LimitOrder>> {
        Ok(self
            .orders
            .iter()
            .filter(|e| e.value().user_id == user_id)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn open_orders_by_market(&self, market_id: MarketId) -> EngineResult<Vec<LimitOrder>> {
        Ok(self
            .orders
            .iter()
            .filter(|e| e.value().market_id == market_id && e.value().status == OrderStatus::Open)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn all_open_orders(&self) -> EngineResult<Vec<LimitOrder>> {
        Ok(self
            .orders
            .iter()
            .filter(|e| e.value().status == OrderStatus::Open)
            .map(|e| e.value().clone())
            .collect())
    }
}

#[async_trait]
impl OhlcvStore for InMemoryStore {
    async fn upsert_candle(&self, candle: OhlcvCandle) -> EngineResult<OhlcvCandle> {
        self.candles
            .insert((candle.market_id, candle.timeframe, candle.timestamp), candle.clone());
        Ok(candle)
    }

    async fn candles(
        &self,
        market_id: MarketId,
        timeframe: Timeframe,
        start_time: i64,
        end_time: i64,
        limit: usize,
    ) -> EngineResult<Vec<OhlcvCandle>> {
        let mut matched: Vec<OhlcvCandle> = self
            .candles
            .iter()
            .filter(|e| {
                let (m, tf, ts) = *e.key();
                m == market_id && tf == timeframe && ts >= start_time && ts <= end_time
            })
            .map(|e| e.value().clone())
            .collect();
        matched.sort_by_key(|c| c.timestamp);
        matched.truncate(limit);
        Ok(matched)
    }

    async fn upsert_stats(&self, stats: MarketStats) -> EngineResult<MarketStats> {
        if let Some(market_id) = stats.market_id {
            self.stats.insert(market_id, stats.clone());
        }
        Ok(stats)
    }

    async fn stats_by_market(&self, market_id: MarketId) -> EngineResult<Option<MarketStats>> {
        Ok(self.stats.get(&market_id).map(|s| s.clone()))
    }
}

/// A directly-settable oracle for driving literal test scenarios: no retry
/// or staleness fallback, since those are `price-oracle`'s own concern
/// (exercised there). `market_prices` seeds per-market-id prices; `c1_price`
/// is looked up for `CollateralAsset::C1`, and `CollateralAsset::C2` is
/// always exactly $1 per the peg.
#[derive(Default)]
pub struct FixedOracle {
    market_prices: DashMap<MarketId, FixedDecimal>,
    default_market_price: DashMap<(), FixedDecimal>,
    c1_price: DashMap<(), FixedDecimal>,
    unavailable: AtomicBool,
}

impl FixedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_market_price(&self, market_id: MarketId, price: FixedDecimal) {
        self.market_prices.insert(market_id, price);
    }

    /// Price returned for any market id with no per-id price seeded.
    /// `create_market` mints its market id internally, so tests that only
    /// care about a known oracle price at seed time use this instead of
    /// guessing the id in advance.
    pub fn set_default_market_price(&self, price: FixedDecimal) {
        self.default_market_price.insert((), price);
    }

    pub fn set_c1_price(&self, price: FixedDecimal) {
        self.c1_price.insert((), price);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl PriceOracle for FixedOracle {
    async fn oracle_price(&self, market_id: MarketId) -> EngineResult<FixedDecimal> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(EngineError::OracleUnavailable("fixed oracle set unavailable".to_string()));
        }
        if let Some(p) = self.market_prices.get(&market_id) {
            return Ok(*p);
        }
        self.default_market_price
            .get(&())
            .map(|p| *p)
            .ok_or_else(|| EngineError::OracleUnavailable(format!("no seeded price for market {market_id}")))
    }

    async fn price_of(&self, asset: CollateralAsset) -> EngineResult<FixedDecimal> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(EngineError::OracleUnavailable("fixed oracle set unavailable".to_string()));
        }
        match asset {
            CollateralAsset::C2 => Ok(FixedDecimal::ONE),
            CollateralAsset::C1 => self
                .c1_price
                .get(&())
                .map(|p| *p)
                .ok_or_else(|| EngineError::OracleUnavailable("no seeded C1 price".to_string())),
        }
    }
}
