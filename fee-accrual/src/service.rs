use std::sync::Arc;

use chrono::Utc;
use decimal::FixedDecimal;
use engine_core::{
    CollateralAsset, EngineEvent, EngineResult, MarketStore, Notify, Position, PositionStore, SECONDS_PER_DAY,
};
use margin_ledger::MarginLedger;
use market_engine::MarketEngine;
use price_oracle::PriceOracle;

use crate::fee_math;

/// Ticks every five seconds, advancing `accumulatedBorrowing` and
/// `accumulatedFunding` on every OPEN position. Per-item failures are
/// logged and skipped rather than aborting the whole pass, matching the
/// shared background-loop fault tolerance.
pub struct FeeAccrual<PStore, MStore, Ora, Ledger, Not>
where
    PStore: PositionStore,
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

impl<PStore, MStore, Ora, Ledger, Not> FeeAccrual<PStore, MStore, Ora, Ledger, Not>
where
    PStore: PositionStore,
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

    async fn price_of(&self, asset: CollateralAsset) -> EngineResult<FixedDecimal> {
        match asset {
            CollateralAsset::C2 => Ok(FixedDecimal::ONE),
            CollateralAsset::C1 => self.oracle.price_of(CollateralAsset::C1).await,
        }
    }

    /// Runs one pass over every open position. Returns the number of
    /// positions ticked successfully; individual failures are logged.
    pub async fn tick(&self) -> EngineResult<usize> {
        let positions = self.store.open_positions().await?;
        let mut ticked = 0;
        for position in positions {
            let id = position.id;
            match self.tick_position(position).await {
                Ok(()) => ticked += 1,
                Err(err) => log::warn!("fee accrual failed for position {id}: {err}"),
            }
        }
        Ok(ticked)
    }

    async fn tick_position(&self, mut position: Position) -> EngineResult<()> {
        let now_ms = Utc::now().timestamp_millis();
        let mut market = self.market_engine.market_by_id(position.market_id).await?;

        let borrowing_delta_s = (now_ms - position.last_borrowing_fee_update) / 1000;
        if borrowing_delta_s >= 1 {
            let fee_usd = fee_math::borrowing_fee_usd(
                &position.size,
                &market.borrowing_rate,
                &FixedDecimal::from_i64(borrowing_delta_s),
                SECONDS_PER_DAY,
            )?;
            let price_token = self.price_of(position.token).await?;
            let fee_token = fee_usd.div(&price_token)?;

            self.ledger.reduce_locked(&position.user_id, position.token, fee_token).await?;
            market = self.market_engine.add_trading_fees(market, &fee_token, position.token).await?;
            match position.token {
                CollateralAsset::C1 => position.locked_margin_c1 = position.locked_margin_c1.sub(&fee_token).max(&FixedDecimal::ZERO),
                CollateralAsset::C2 => position.locked_margin_c2 = position.locked_margin_c2.sub(&fee_token).max(&FixedDecimal::ZERO),
            }
            position.accumulated_borrowing = position.accumulated_borrowing.add(&fee_token);
            position.last_borrowing_fee_update = now_ms;
            self.notifier
                .notify(EngineEvent::BorrowingFeeCharged {
                    position_id: position.id,
                    amount: fee_token,
                })
                .await;
        }

        let funding_delta_s = (now_ms - position.last_funding_update) / 1000;
        if funding_delta_s >= 1 {
            let current_rate = self.market_engine.current_funding_rate(&market)?;
            let signed_fee_usd = fee_math::signed_funding_fee_usd(
                position.side,
                &position.size,
                &current_rate,
                &FixedDecimal::from_i64(funding_delta_s),
                SECONDS_PER_DAY,
            )?;
            let price_token = self.price_of(position.token).await?;
            let fee_token = signed_fee_usd.abs().div(&price_token)?;

            if signed_fee_usd.is_positive() {
                self.ledger.reduce_locked(&position.user_id, position.token, fee_token).await?;
                market = self.market_engine.add_trading_fees(market, &fee_token, position.token).await?;
                match position.token {
                    CollateralAsset::C1 => position.locked_margin_c1 = position.locked_margin_c1.sub(&fee_token).max(&FixedDecimal::ZERO),
                    CollateralAsset::C2 => position.locked_margin_c2 = position.locked_margin_c2.sub(&fee_token).max(&FixedDecimal::ZERO),
                }
            } else if signed_fee_usd.is_negative() {
                self.ledger.add_locked(&position.user_id, position.token, fee_token).await?;
                match position.token {
                    CollateralAsset::C1 => position.locked_margin_c1 = position.locked_margin_c1.add(&fee_token),
                    CollateralAsset::C2 => position.locked_margin_c2 = position.locked_margin_c2.add(&fee_token),
                }
            }
            position.accumulated_funding = position.accumulated_funding.add(&fee_token);
            position.last_funding_update = now_ms;
            self.notifier
                .notify(EngineEvent::FundingFeeCharged {
                    position_id: position.id,
                    amount: fee_token,
                })
                .await;
        }

        position.updated_at = Utc::now();
        self.store.update_position(position).await?;
        Ok(())
    }
}
