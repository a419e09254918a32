use std::sync::Arc;

use chrono::Utc;
use decimal::FixedDecimal;
use engine_core::{
    CollateralAsset, EngineError, EngineEvent, EngineResult, LimitOrder, LimitOrderStore, MarketStore, Notify,
    OhlcvStore, OrderStatus, PositionStore, TradeStore,
};
use margin_ledger::MarginLedger;
use market_engine::MarketEngine;
use price_oracle::PriceOracle;
use trade_engine::{OpenPositionRequest, TradeEngine};

use crate::request::CreateLimitOrderRequest;

/// No slippage bound applies to a trigger-gated limit fill: the order's own
/// price trigger is the protection, so execution is allowed regardless of
/// the preview's price impact.
const UNBOUNDED_SLIPPAGE: &str = "1";

pub struct LimitOrderEngine<Sto, MStore, Ora, Ledger, Not>
where
    Sto: LimitOrderStore + PositionStore + TradeStore + OhlcvStore,
    MStore: MarketStore,
    Ora: PriceOracle,
    Ledger: MarginLedger,
    Not: Notify,
{
    store: Arc<Sto>,
    market_engine: Arc<MarketEngine<MStore, Ora>>,
    trade_engine: Arc<TradeEngine<Sto, MStore, Ora, Ledger, Not>>,
    ledger: Arc<Ledger>,
    oracle: Arc<Ora>,
    notifier: Arc<Not>,
}

impl<Sto, MStore, Ora, Ledger, Not> LimitOrderEngine<Sto, MStore, Ora, Ledger, Not>
where
    Sto: LimitOrderStore + PositionStore + TradeStore + OhlcvStore,
    MStore: MarketStore,
    Ora: PriceOracle,
    Ledger: MarginLedger,
    Not: Notify,
{
    pub fn new(
        store: Arc<Sto>,
        market_engine: Arc<MarketEngine<MStore, Ora>>,
        trade_engine: Arc<TradeEngine<Sto, MStore, Ora, Ledger, Not>>,
        ledger: Arc<Ledger>,
        oracle: Arc<Ora>,
        notifier: Arc<Not>,
    ) -> Self {
        Self {
            store,
            market_engine,
            trade_engine,
            ledger,
            oracle,
            notifier,
        }
    }

    async fn price_of(&self, asset: CollateralAsset) -> EngineResult<FixedDecimal> {
        match asset {
            CollateralAsset::C2 => Ok(FixedDecimal::ONE),
            CollateralAsset::C1 => self.oracle.price_of(CollateralAsset::C1).await,
        }
    }

    pub async fn create_order(&self, req: CreateLimitOrderRequest) -> EngineResult<LimitOrder> {
        if !req.size.is_positive() {
            return Err(EngineError::InvalidParams("size must be positive".to_string()));
        }
        if !req.leverage.is_positive() {
            return Err(EngineError::InvalidParams("leverage must be positive".to_string()));
        }
        let market = self.market_engine.market_by_symbol(&req.symbol).await?;

        let required_margin_usd = req.size.div(&req.leverage)?;
        let price_token = self.price_of(req.token).await?;
        let balance = self.ledger.balance(&req.user_id, req.token).await?;
        let available_usd = match req.token {
            CollateralAsset::C2 => balance.available,
            CollateralAsset::C1 => balance.available.mul(&price_token),
        };
        if available_usd.compare(&required_margin_usd) == std::cmp::Ordering::Less {
            return Err(EngineError::InsufficientMargin);
        }

        let now = Utc::now();
        let order = LimitOrder {
            id: uuid::Uuid::new_v4(),
            user_id: req.user_id,
            market_id: market.id,
            symbol: market.symbol,
            side: req.side,
            size: req.size,
            price: req.price,
            leverage: req.leverage,
            token: req.token,
            required_margin: required_margin_usd,
            status: OrderStatus::Open,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_order(order).await
    }

    pub async fn cancel_order(&self, order_id: engine_core::OrderId, user_id: &str) -> EngineResult<LimitOrder> {
        let mut order = self
            .store
            .order_by_id(order_id)
            .await?
            .ok_or_else(|| EngineError::OrderNotFound(order_id.to_string()))?;
        if order.user_id != user_id {
            return Err(EngineError::NotPositionOwner);
        }
        if order.status != OrderStatus::Open {
            return Err(EngineError::OrderNotCancellable(order_id.to_string()));
        }
        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        let order = self.store.update_order(order).await?;
        self.notifier
            .notify(EngineEvent::LimitOrderCancelled { order_id: order.id })
            .await;
        Ok(order)
    }

    /// Scans every resting order once. Per-item failures are logged, not
    /// propagated, matching the shared background-loop tolerance.
    pub async fn tick(&self) -> EngineResult<usize> {
        let orders = self.store.all_open_orders().await?;
        let mut filled = 0;
        for order in orders {
            let id = order.id;
            match self.check_and_fill(order).await {
                Ok(true) => filled += 1,
                Ok(false) => {}
                Err(err) => log::warn!("limit order scan failed for order {id}: {err}"),
            }
        }
        Ok(filled)
    }

    async fn check_and_fill(&self, mut order: LimitOrder) -> EngineResult<bool> {
        let market = self.market_engine.market_by_id(order.market_id).await?;
        let current_price = self.market_engine.virtual_price(&market)?;
        if !order.should_fill(&current_price) {
            return Ok(false);
        }

        let required_margin_usd = order.size.div(&order.leverage)?;
        let price_token = self.price_of(order.token).await?;
        let balance = self.ledger.balance(&order.user_id, order.token).await?;
        let available_usd = match order.token {
            CollateralAsset::C2 => balance.available,
            CollateralAsset::C1 => balance.available.mul(&price_token),
        };
        if available_usd.compare(&required_margin_usd) == std::cmp::Ordering::Less {
            order.status = OrderStatus::Cancelled;
            order.updated_at = Utc::now();
            self.store.update_order(order.clone()).await?;
            self.notifier
                .notify(EngineEvent::LimitOrderCancelled { order_id: order.id })
                .await;
            return Ok(false);
        }

        let position = self
            .trade_engine
            .open_position(OpenPositionRequest {
                user_id: order.user_id.clone(),
                market_id: order.market_id,
                side: order.side,
                size: order.size,
                leverage: order.leverage,
                token: order.token,
                max_slippage: FixedDecimal::parse_from_string(UNBOUNDED_SLIPPAGE)
                    .expect("valid unbounded slippage constant"),
                stop_loss_price: None,
                take_profit_price: None,
            })
            .await?;

        order.status = OrderStatus::Filled;
        order.updated_at = Utc::now();
        let order = self.store.update_order(order).await?;
        self.notifier
            .notify(EngineEvent::LimitOrderFilled {
                order_id: order.id,
                position_id: position.id,
            })
            .await;
        Ok(true)
    }
}
