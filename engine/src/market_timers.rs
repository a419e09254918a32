//! Per-market funding and reserve-shift ticks. `MarketEngine` exposes these
//! one market at a time; the supervisor only knows how to repeat a
//! zero-arg tick, so these two functions do the "for every market" fan-out
//! the background loops actually need.

use std::sync::Arc;

use decimal::FixedDecimal;
use engine_core::{EngineResult, MarketStore, CONVERGENCE_SECONDS, CONVERGENCE_THRESHOLD, RESERVE_SHIFT_PERIOD_MS};
use market_engine::MarketEngine;
use price_oracle::PriceOracle;

pub async fn funding_tick<MStore, Ora>(market_engine: &Arc<MarketEngine<MStore, Ora>>, store: &Arc<MStore>) -> EngineResult<usize>
where
    MStore: MarketStore,
    Ora: PriceOracle,
{
    let markets = store.all_markets().await?;
    let mut updated = 0;
    for market in markets {
        market_engine.tick_funding(market).await?;
        updated += 1;
    }
    Ok(updated)
}

pub async fn reserve_shift_tick<MStore, Ora>(
    market_engine: &Arc<MarketEngine<MStore, Ora>>,
    store: &Arc<MStore>,
    oracle: &Arc<Ora>,
) -> EngineResult<usize>
where
    MStore: MarketStore,
    Ora: PriceOracle,
{
    let threshold = FixedDecimal::parse_from_string(CONVERGENCE_THRESHOLD).expect("valid convergence threshold constant");
    let tick_seconds = (RESERVE_SHIFT_PERIOD_MS / 1000) as i64;

    let markets = store.all_markets().await?;
    let mut shifted = 0;
    for market in markets {
        let oracle_price = oracle.oracle_price(market.id).await?;
        let result = market_engine
            .tick_reserve_shift(market, &oracle_price, CONVERGENCE_SECONDS, &threshold, tick_seconds)
            .await?;
        if result.is_some() {
            shifted += 1;
        }
    }
    Ok(shifted)
}
