use std::sync::Arc;

use chrono::Utc;
use engine_core::{
    CollateralAsset, EngineEvent, EngineResult, MarketStore, Notify, Position, PositionStatus, PositionStore, Trade,
    TradeStore,
};
use margin_ledger::MarginLedger;
use market_engine::MarketEngine;
use price_oracle::PriceOracle;
use trade_engine::realized_pnl_usd;

use crate::solvency;

/// Ticks every five seconds, force-closing any OPEN position whose
/// effective collateral has fallen below its maintenance margin. Unlike a
/// user-initiated close, the realized PnL is recorded as zero and nothing
/// is returned to the user's available balance: the remaining collateral
/// stays forfeited to the protocol, per the source's unconditional rule.
pub struct LiquidationEngine<PStore, MStore, Ora, Ledger, Not>
where
    PStore: PositionStore + TradeStore,
    MStore: MarketStore,
    Ora: PriceOracle,
    Ledger: MarginLedger,
    Not: Notify,
{
    store: Arc<PStore>,
    market_engine: Arc<MarketEngine<MStore, Ora>>,
    ledger: Arc<Ledger>,
    oracle: Arc<Ora>,
    notifier: Arc<Not>,
}

impl<PStore, MStore, Ora, Ledger, Not> LiquidationEngine<PStore, MStore, Ora, Ledger, Not>
where
    PStore: PositionStore + TradeStore,
    MStore: MarketStore,
    Ora: PriceOracle,
    Ledger: MarginLedger,
    Not: Notify,
{
    pub fn new(
        store: Arc<PStore>,
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

    /// Closed-form alternative to the continuous check, exposed for
    /// clients that want to display a liquidation price rather than poll.
    pub async fn liquidation_price(&self, position_id: engine_core::PositionId) -> EngineResult<decimal::FixedDecimal> {
        let position = self
            .store
            .position_by_id(position_id)
            .await?
            .ok_or_else(|| engine_core::EngineError::PositionNotFound(position_id.to_string()))?;
        let market = self.market_engine.market_by_id(position.market_id).await?;
        let price_c1 = self.oracle.price_of(CollateralAsset::C1).await?;
        let collateral =
            solvency::collateral_usd(&position.locked_margin_c1, &position.locked_margin_c2, &price_c1);
        solvency::liquidation_price(
            position.side,
            &position.size,
            &position.entry_price,
            &collateral,
            &market.maintenance_margin,
        )
    }

    pub async fn tick(&self) -> EngineResult<usize> {
        let positions = self.store.open_positions().await?;
        let mut liquidated = 0;
        for position in positions {
            let id = position.id;
            match self.check_and_liquidate(position).await {
                Ok(true) => liquidated += 1,
                Ok(false) => {}
                Err(err) => log::warn!("liquidation check failed for position {id}: {err}"),
            }
        }
        Ok(liquidated)
    }

    /// Returns `Ok(true)` if the position was liquidated this pass.
    async fn check_and_liquidate(&self, position: Position) -> EngineResult<bool> {
        let market = self.market_engine.market_by_id(position.market_id).await?;
        let current_price = self.oracle.oracle_price(position.market_id).await?;
        let price_c1 = self.oracle.price_of(CollateralAsset::C1).await?;

        let collateral = solvency::collateral_usd(&position.locked_margin_c1, &position.locked_margin_c2, &price_c1);
        let pnl = realized_pnl_usd(position.side, &position.size, &position.entry_price, &current_price)?;

        if !solvency::is_liquidatable(&collateral, &pnl, &market.maintenance_margin) {
            return Ok(false);
        }

        self.force_close(position, market, current_price).await?;
        Ok(true)
    }

    async fn force_close(
        &self,
        mut position: Position,
        market: engine_core::Market,
        current_price: decimal::FixedDecimal,
    ) -> EngineResult<()> {
        if position.locked_margin_c1.is_positive() {
            self.ledger
                .reduce_locked(&position.user_id, CollateralAsset::C1, position.locked_margin_c1)
                .await?;
        }
        if position.locked_margin_c2.is_positive() {
            self.ledger
                .reduce_locked(&position.user_id, CollateralAsset::C2, position.locked_margin_c2)
                .await?;
        }

        let preview = self.market_engine.preview(&market, position.side, true, &position.size)?;
        let market = self
            .market_engine
            .commit_trade(market, position.side, true, &position.size, &preview)
            .await?;

        position.locked_margin_c1 = decimal::FixedDecimal::ZERO;
        position.locked_margin_c2 = decimal::FixedDecimal::ZERO;
        position.status = PositionStatus::Liquidated;
        position.closed_at = Some(Utc::now());
        position.closing_price = Some(current_price);
        position.realized_pnl = Some(decimal::FixedDecimal::ZERO);
        position.updated_at = Utc::now();
        let position = self.store.update_position(position).await?;

        let trade = Trade {
            id: uuid::Uuid::new_v4(),
            position_id: position.id,
            user_id: position.user_id.clone(),
            market_id: market.id,
            side: position.side.opposite(),
            size: position.size,
            price: current_price,
            leverage: position.leverage,
            realized_pnl: Some(decimal::FixedDecimal::ZERO),
            fee: decimal::FixedDecimal::ZERO,
            created_at: Utc::now(),
            is_partial_close: Some(false),
        };
        self.store.insert_trade(trade).await?;

        self.notifier
            .notify(EngineEvent::PositionLiquidated {
                position_id: position.id,
                user_id: position.user_id.clone(),
            })
            .await;
        Ok(())
    }
}
