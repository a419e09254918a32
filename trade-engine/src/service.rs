use std::sync::Arc;

use chrono::Utc;
use decimal::FixedDecimal;
use engine_core::{
    CollateralAsset, EngineError, EngineResult, MarketStore, Notify, OhlcvStore, Position, PositionId,
    PositionStatus, PositionStore, Side, Trade, TradeStore, TRADING_FEE,
};
use margin_ledger::MarginLedger;
use market_engine::MarketEngine;
use price_oracle::PriceOracle;

use crate::collateral_split;
use crate::pnl;
use crate::request::{ClosePositionRequest, OpenPositionRequest};

pub struct TradeEngine<Sto, MStore, Ora, Ledger, Not>
where
    Sto: PositionStore + TradeStore + OhlcvStore,
    MStore: MarketStore,
    Ora: PriceOracle,
    Ledger: MarginLedger,
    Not: Notify,
{
    store: Arc<Sto>,
    market_engine: Arc<MarketEngine<MStore, Ora>>,
    ledger: Arc<Ledger>,
    oracle: Arc<Ora>,
    notifier: Arc<Not>,
}

impl<Sto, MStore, Ora, Ledger, Not> TradeEngine<Sto, MStore, Ora, Ledger, Not>
where
    Sto: PositionStore + TradeStore + OhlcvStore,
    MStore: MarketStore,
    Ora: PriceOracle,
    Ledger: MarginLedger,
    Not: Notify,
{
    pub fn new(
        store: Arc<Sto>,
        market_engine: Arc<MarketEngine<MStore, Ora>>,
        ledger: Arc<Ledger>,
        oracle: Arc<Ora>,
        notifier: Arc<Not>,
    ) -> Self {
        Self {
            store,
            market_engine,
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

    fn trading_fee_rate() -> FixedDecimal {
        FixedDecimal::parse_from_string(TRADING_FEE).expect("valid trading fee constant")
    }

    pub async fn open_position(&self, req: OpenPositionRequest) -> EngineResult<Position> {
        if !req.size.is_positive() {
            return Err(EngineError::InvalidParams("size must be positive".to_string()));
        }
        if !req.leverage.is_positive() {
            return Err(EngineError::InvalidParams("leverage must be positive".to_string()));
        }

        let market = self.market_engine.market_by_id(req.market_id).await?;
        if !market.is_active() {
            return Err(EngineError::InvalidParams(format!(
                "market {} is not active",
                market.symbol
            )));
        }
        if req.leverage.compare(&market.max_leverage) == std::cmp::Ordering::Greater {
            return Err(EngineError::InvalidParams("leverage exceeds market max".to_string()));
        }
        self.market_engine.check_liquidity(&market, &req.size)?;

        let preview = self.market_engine.preview(&market, req.side, false, &req.size)?;
        if preview.price_impact.abs().compare(&req.max_slippage) == std::cmp::Ordering::Greater {
            return Err(EngineError::SlippageExceeded {
                impact: preview.price_impact.to_string(),
                max: req.max_slippage.to_string(),
            });
        }

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

        let mut amount_to_lock = match req.token {
            CollateralAsset::C2 => required_margin_usd,
            CollateralAsset::C1 => required_margin_usd.div(&price_token)?,
        };

        let fee_usd = req.size.mul(&Self::trading_fee_rate());
        let fee_token = fee_usd.div(&price_token)?;
        amount_to_lock = amount_to_lock.sub(&fee_token);

        self.ledger.deduct(&req.user_id, req.token, fee_token).await?;
        let market = self
            .market_engine
            .add_trading_fees(market, &fee_token, req.token)
            .await?;
        self.ledger.lock(&req.user_id, req.token, amount_to_lock).await?;

        let market = self
            .market_engine
            .commit_trade(market, req.side, false, &req.size, &preview)
            .await?;

        let now = Utc::now();
        let mut position = Position {
            id: uuid::Uuid::new_v4(),
            user_id: req.user_id.clone(),
            market_id: market.id,
            symbol: market.symbol.clone(),
            side: req.side,
            size: req.size,
            entry_price: preview.execution_price,
            leverage: req.leverage,
            margin: required_margin_usd,
            token: req.token,
            locked_margin_c1: FixedDecimal::ZERO,
            locked_margin_c2: FixedDecimal::ZERO,
            stop_loss_price: req.stop_loss_price,
            take_profit_price: req.take_profit_price,
            accumulated_funding: FixedDecimal::ZERO,
            accumulated_borrowing: FixedDecimal::ZERO,
            last_funding_update: now.timestamp_millis(),
            last_borrowing_fee_update: now.timestamp_millis(),
            status: PositionStatus::Open,
            closed_at: None,
            closing_price: None,
            realized_pnl: None,
            created_at: now,
            updated_at: now,
        };
        match req.token {
            CollateralAsset::C1 => position.locked_margin_c1 = amount_to_lock,
            CollateralAsset::C2 => position.locked_margin_c2 = amount_to_lock,
        }

        let position = self.store.insert_position(position).await?;
        self.notifier
            .notify(engine_core::EngineEvent::PositionOpened {
                position_id: position.id,
                user_id: position.user_id.clone(),
            })
            .await;
        Ok(position)
    }

    pub async fn close_position(&self, req: ClosePositionRequest) -> EngineResult<Position> {
        let position = self
            .store
            .position_by_id(req.position_id)
            .await?
            .ok_or_else(|| EngineError::PositionNotFound(req.position_id.to_string()))?;
        if position.user_id != req.user_id {
            return Err(EngineError::NotPositionOwner);
        }
        if !position.is_open() {
            return Err(EngineError::InvalidParams("position is not open".to_string()));
        }
        if !req.size_delta.is_positive() || req.size_delta.compare(&position.size) == std::cmp::Ordering::Greater {
            return Err(EngineError::InvalidParams(
                "sizeDelta must be within (0, position.size]".to_string(),
            ));
        }
        let is_full = req.size_delta.compare(&position.size) != std::cmp::Ordering::Less;

        let market = self.market_engine.market_by_id(position.market_id).await?;
        let preview = self
            .market_engine
            .preview(&market, position.side, true, &req.size_delta)?;
        if preview.price_impact.abs().compare(&req.max_slippage) == std::cmp::Ordering::Greater {
            return Err(EngineError::SlippageExceeded {
                impact: preview.price_impact.to_string(),
                max: req.max_slippage.to_string(),
            });
        }

        let realized_pnl_usd = pnl::realized_pnl_usd(
            position.side,
            &req.size_delta,
            &position.entry_price,
            &preview.execution_price,
        )?;
        let close_fraction = position.close_fraction(&req.size_delta)?;
        let price_c1 = self.price_of(CollateralAsset::C1).await?;
        let split = collateral_split::split_by_usd_proportion(
            &position.locked_margin_c1,
            &position.locked_margin_c2,
            &close_fraction,
            &realized_pnl_usd,
            &price_c1,
        )?;

        let mut position = position;
        if split.release_c1.is_positive() {
            self.ledger
                .release(&req.user_id, CollateralAsset::C1, split.release_c1, split.pnl_share_c1)
                .await?;
            position.locked_margin_c1 = position.locked_margin_c1.sub(&split.release_c1).max(&FixedDecimal::ZERO);
        }
        if split.release_c2.is_positive() {
            self.ledger
                .release(&req.user_id, CollateralAsset::C2, split.release_c2, split.pnl_share_c2)
                .await?;
            position.locked_margin_c2 = position.locked_margin_c2.sub(&split.release_c2).max(&FixedDecimal::ZERO);
        }

        let market = self
            .market_engine
            .commit_trade(market, position.side, true, &req.size_delta, &preview)
            .await?;

        if is_full {
            position.status = PositionStatus::Closed;
            position.closed_at = Some(Utc::now());
            position.closing_price = Some(preview.execution_price);
            position.realized_pnl = Some(realized_pnl_usd);
        } else {
            let remaining_fraction = FixedDecimal::ONE.sub(&close_fraction);
            position.size = position.size.sub(&req.size_delta);
            position.margin = position.margin.mul(&remaining_fraction);
        }
        position.updated_at = Utc::now();
        let position = self.store.update_position(position).await?;

        let trade = Trade {
            id: uuid::Uuid::new_v4(),
            position_id: position.id,
            user_id: position.user_id.clone(),
            market_id: market.id,
            side: position.side.opposite(),
            size: req.size_delta,
            price: preview.execution_price,
            leverage: position.leverage,
            realized_pnl: Some(realized_pnl_usd),
            fee: FixedDecimal::ZERO,
            created_at: Utc::now(),
            is_partial_close: Some(!is_full),
        };
        self.store.insert_trade(trade).await?;

        let mut stats = self
            .store
            .stats_by_market(market.id)
            .await?
            .unwrap_or(engine_core::MarketStats {
                market_id: Some(market.id),
                ..Default::default()
            });
        let volume = req.size_delta.mul(&FixedDecimal::from_i64(2));
        stats.all_time_volume = stats.all_time_volume.add(&volume);
        stats.volume_24h = stats.volume_24h.add(&volume);
        stats.last_updated_timestamp = Utc::now().timestamp_millis();
        self.store.upsert_stats(stats).await?;

        let event = if is_full {
            engine_core::EngineEvent::PositionClosed {
                position_id: position.id,
                user_id: position.user_id.clone(),
                realized_pnl: realized_pnl_usd,
            }
        } else {
            engine_core::EngineEvent::PositionUpdated {
                position_id: position.id,
                user_id: position.user_id.clone(),
            }
        };
        self.notifier.notify(event).await;
        Ok(position)
    }

    pub async fn edit_stop_loss(
        &self,
        position_id: PositionId,
        user_id: &str,
        stop_loss_price: Option<FixedDecimal>,
    ) -> EngineResult<Position> {
        let mut position = self.load_editable_position(position_id, user_id).await?;
        if let Some(sl) = &stop_loss_price {
            let ordered = match position.side {
                Side::Long => sl.compare(&position.entry_price) == std::cmp::Ordering::Less,
                Side::Short => sl.compare(&position.entry_price) == std::cmp::Ordering::Greater,
            };
            if !ordered {
                return Err(EngineError::InvalidParams(
                    "stop loss must sit beyond entry price for the position's side".to_string(),
                ));
            }
        }
        position.stop_loss_price = stop_loss_price;
        position.updated_at = Utc::now();
        let position = self.store.update_position(position).await?;
        self.notifier
            .notify(engine_core::EngineEvent::PositionUpdated {
                position_id: position.id,
                user_id: position.user_id.clone(),
            })
            .await;
        Ok(position)
    }

    pub async fn edit_take_profit(
        &self,
        position_id: PositionId,
        user_id: &str,
        take_profit_price: Option<FixedDecimal>,
    ) -> EngineResult<Position> {
        let mut position = self.load_editable_position(position_id, user_id).await?;
        if let Some(tp) = &take_profit_price {
            let ordered = match position.side {
                Side::Long => tp.compare(&position.entry_price) == std::cmp::Ordering::Greater,
                Side::Short => tp.compare(&position.entry_price) == std::cmp::Ordering::Less,
            };
            if !ordered {
                return Err(EngineError::InvalidParams(
                    "take profit must sit beyond entry price for the position's side".to_string(),
                ));
            }
        }
        position.take_profit_price = take_profit_price;
        position.updated_at = Utc::now();
        let position = self.store.update_position(position).await?;
        self.notifier
            .notify(engine_core::EngineEvent::PositionUpdated {
                position_id: position.id,
                user_id: position.user_id.clone(),
            })
            .await;
        Ok(position)
    }

    pub async fn edit_margin(
        &self,
        position_id: PositionId,
        user_id: &str,
        margin_delta: FixedDecimal,
    ) -> EngineResult<Position> {
        let mut position = self.load_editable_position(position_id, user_id).await?;
        let new_margin = position.margin.add(&margin_delta);
        let new_leverage = position.size.div(&new_margin)?;
        let market = self.market_engine.market_by_id(position.market_id).await?;

        if margin_delta.is_negative() {
            if new_leverage.compare(&market.max_leverage) == std::cmp::Ordering::Greater {
                return Err(EngineError::LeverageOutOfBounds(
                    "withdrawal would exceed market max leverage".to_string(),
                ));
            }
        } else if margin_delta.is_positive() {
            if new_leverage.compare(&FixedDecimal::ONE) == std::cmp::Ordering::Less {
                return Err(EngineError::LeverageOutOfBounds(
                    "deposit would drop leverage below 1".to_string(),
                ));
            }
            let price_c1 = self.price_of(CollateralAsset::C1).await?;
            let c1_balance = self.ledger.balance(user_id, CollateralAsset::C1).await?;
            let c2_balance = self.ledger.balance(user_id, CollateralAsset::C2).await?;
            let combined_usd = c1_balance.available.mul(&price_c1).add(&c2_balance.available);
            if combined_usd.compare(&margin_delta) == std::cmp::Ordering::Less {
                return Err(EngineError::InsufficientFunds);
            }
        }

        let price_c1 = self.price_of(CollateralAsset::C1).await?;
        let c1_usd = position.locked_margin_c1.mul(&price_c1);
        let c2_usd = position.locked_margin_c2;
        let total_usd = c1_usd.add(&c2_usd);

        let (c1_proportion, c2_proportion) = if total_usd.is_zero() {
            match position.token {
                CollateralAsset::C1 => (FixedDecimal::ONE, FixedDecimal::ZERO),
                CollateralAsset::C2 => (FixedDecimal::ZERO, FixedDecimal::ONE),
            }
        } else {
            (c1_usd.div(&total_usd)?, c2_usd.div(&total_usd)?)
        };

        let delta_c1_usd = margin_delta.mul(&c1_proportion);
        let delta_c2_usd = margin_delta.mul(&c2_proportion);
        let delta_c1_native = delta_c1_usd.div(&price_c1)?;
        let delta_c2_native = delta_c2_usd;

        if margin_delta.is_positive() {
            if delta_c1_native.is_positive() {
                self.ledger.lock(user_id, CollateralAsset::C1, delta_c1_native).await?;
                position.locked_margin_c1 = position.locked_margin_c1.add(&delta_c1_native);
            }
            if delta_c2_native.is_positive() {
                self.ledger.lock(user_id, CollateralAsset::C2, delta_c2_native).await?;
                position.locked_margin_c2 = position.locked_margin_c2.add(&delta_c2_native);
            }
        } else if margin_delta.is_negative() {
            let abs_c1 = delta_c1_native.abs();
            let abs_c2 = delta_c2_native.abs();
            if abs_c1.is_positive() {
                self.ledger
                    .release(user_id, CollateralAsset::C1, abs_c1, FixedDecimal::ZERO)
                    .await?;
                position.locked_margin_c1 = position.locked_margin_c1.sub(&abs_c1).max(&FixedDecimal::ZERO);
            }
            if abs_c2.is_positive() {
                self.ledger
                    .release(user_id, CollateralAsset::C2, abs_c2, FixedDecimal::ZERO)
                    .await?;
                position.locked_margin_c2 = position.locked_margin_c2.sub(&abs_c2).max(&FixedDecimal::ZERO);
            }
        }

        position.margin = new_margin;
        position.leverage = new_leverage;
        position.updated_at = Utc::now();
        let position = self.store.update_position(position).await?;
        self.notifier
            .notify(engine_core::EngineEvent::PositionUpdated {
                position_id: position.id,
                user_id: position.user_id.clone(),
            })
            .await;
        Ok(position)
    }

    async fn load_editable_position(&self, position_id: PositionId, user_id: &str) -> EngineResult<Position> {
        let position = self
            .store
            .position_by_id(position_id)
            .await?
            .ok_or_else(|| EngineError::PositionNotFound(position_id.to_string()))?;
        if position.user_id != user_id {
            return Err(EngineError::NotPositionOwner);
        }
        if !position.is_open() {
            return Err(EngineError::InvalidParams("position is not open".to_string()));
        }
        Ok(position)
    }
}
