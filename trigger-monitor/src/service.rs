use std::sync::Arc;

use decimal::FixedDecimal;
use engine_core::{EngineResult, MarketStore, Notify, OhlcvStore, Position, PositionStore, TradeStore};
use margin_ledger::MarginLedger;
use market_engine::MarketEngine;
use price_oracle::PriceOracle;
use trade_engine::{ClosePositionRequest, TradeEngine};

use crate::trigger::check_trigger;

/// Ticks every ten seconds, scanning open positions that carry a stop loss
/// or take profit and closing any whose current virtual price has crossed
/// its level. A full-size close through the ordinary trade pipeline, so
/// PnL, fees, and reserve effects are identical to a user-initiated close.
pub struct TriggerMonitor<Sto, MStore, Ora, Ledger, Not>
where
    Sto: PositionStore + TradeStore + OhlcvStore,
    MStore: MarketStore,
    Ora: PriceOracle,
    Ledger: MarginLedger,
    Not: Notify,
{
    store: Arc<Sto>,
    market_engine: Arc<MarketEngine<MStore, Ora>>,
    trade_engine: Arc<TradeEngine<Sto, MStore, Ora, Ledger, Not>>,
}

impl<Sto, MStore, Ora, Ledger, Not> TriggerMonitor<Sto, MStore, Ora, Ledger, Not>
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
        trade_engine: Arc<TradeEngine<Sto, MStore, Ora, Ledger, Not>>,
    ) -> Self {
        Self {
            store,
            market_engine,
            trade_engine,
        }
    }

    pub async fn tick(&self) -> EngineResult<usize> {
        let positions = self.store.open_positions_with_triggers().await?;
        let mut closed = 0;
        for position in positions {
            let id = position.id;
            match self.check_and_close(position).await {
                Ok(true) => closed += 1,
                Ok(false) => {}
                Err(err) => log::warn!("trigger check failed for position {id}: {err}"),
            }
        }
        Ok(closed)
    }

    async fn check_and_close(&self, position: Position) -> EngineResult<bool> {
        let market = self.market_engine.market_by_id(position.market_id).await?;
        let current_price = self.market_engine.virtual_price(&market)?;
        if check_trigger(&position, &current_price).is_none() {
            return Ok(false);
        }

        self.trade_engine
            .close_position(ClosePositionRequest {
                position_id: position.id,
                user_id: position.user_id.clone(),
                size_delta: position.size,
                max_slippage: FixedDecimal::ONE,
            })
            .await?;
        Ok(true)
    }
}
