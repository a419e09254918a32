//! Minute-bucketed OHLCV rollup, sampling the vAMM virtual price every ten
//! seconds. Volume is attributed by `TradeEngine` into `MarketStats`
//! directly at trade time; this loop only tracks open/high/low/close per
//! market per minute bucket.

use std::sync::Arc;

use engine_core::{EngineResult, MarketStore, OhlcvCandle, OhlcvStore, Timeframe};
use market_engine::MarketEngine;
use price_oracle::PriceOracle;

const BUCKET_MS: i64 = 60_000;

pub async fn rollup_tick<Sto, MStore, Ora>(
    store: &Arc<Sto>,
    market_engine: &Arc<MarketEngine<MStore, Ora>>,
) -> EngineResult<usize>
where
    Sto: OhlcvStore + MarketStore,
    MStore: MarketStore,
    Ora: PriceOracle,
{
    let markets = store.all_markets().await?;
    let mut updated = 0;
    for market in markets {
        let price = market_engine.virtual_price(&market)?;
        let now_ms = chrono::Utc::now().timestamp_millis();
        let bucket = now_ms - now_ms.rem_euclid(BUCKET_MS);

        let existing = store.candles(market.id, Timeframe::M1, bucket, bucket, 1).await?;
        let candle = match existing.into_iter().next() {
            Some(mut c) => {
                c.high = c.high.max(&price);
                c.low = c.low.min(&price);
                c.close = price;
                c
            }
            None => OhlcvCandle {
                market_id: market.id,
                timeframe: Timeframe::M1,
                timestamp: bucket,
                open: price,
                high: price,
                low: price,
                close: price,
                volume: decimal::FixedDecimal::ZERO,
            },
        };
        store.upsert_candle(candle).await?;
        updated += 1;
    }
    Ok(updated)
}
