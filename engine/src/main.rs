mod config;
mod feed;
mod market_timers;
mod ohlcv;
mod store;
mod supervisor;

use std::sync::Arc;

use engine_core::{
    LoggingNotifier, FEE_ACCRUAL_PERIOD_MS, FUNDING_UPDATE_PERIOD_MS, LIMIT_ORDER_PERIOD_MS, LIQUIDATION_PERIOD_MS,
    OHLCV_ROLLUP_PERIOD_MS, RESERVE_SHIFT_PERIOD_MS, TRIGGER_MONITOR_PERIOD_MS,
};
use fee_accrual::FeeAccrual;
use limit_order_engine::LimitOrderEngine;
use liquidation_engine::LiquidationEngine;
use margin_ledger::InMemoryLedger;
use market_engine::MarketEngine;
use price_oracle::ResilientOracle;
use trade_engine::TradeEngine;
use trigger_monitor::TriggerMonitor;

use config::EngineConfig;
use feed::StaticFeed;
use store::InMemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    common::init_logger();

    let config = EngineConfig::read()?;
    log::info!(
        "starting with {} configured market(s), liquidation collateral disposition {:?}",
        config.markets.len(),
        config.liquidation_collateral_disposition
    );

    let store = Arc::new(InMemoryStore::new());
    let feed = Arc::new(StaticFeed::new());
    for (asset, price) in &config.static_prices {
        if asset.as_str() == "C1" {
            feed.set_asset_price(engine_core::CollateralAsset::C1, *price);
        }
    }
    for seed in &config.markets {
        feed.queue_seed_price(seed.initial_price);
    }
    let oracle = Arc::new(ResilientOracle::new(feed));
    let ledger = Arc::new(InMemoryLedger::new());
    let notifier = Arc::new(LoggingNotifier);

    let market_engine = Arc::new(MarketEngine::new(store.clone(), oracle.clone()));
    for seed in &config.markets {
        let market = market_engine
            .create_market(
                seed.symbol.clone(),
                seed.token_address.clone(),
                seed.max_leverage,
                seed.maintenance_margin,
            )
            .await?;
        log::info!("seeded market {} ({})", market.symbol, market.id);
    }

    let trade_engine = Arc::new(TradeEngine::new(
        store.clone(),
        market_engine.clone(),
        ledger.clone(),
        oracle.clone(),
        notifier.clone(),
    ));
    let fee_accrual = Arc::new(FeeAccrual::new(
        store.clone(),
        market_engine.clone(),
        ledger.clone(),
        oracle.clone(),
        notifier.clone(),
    ));
    let liquidation_engine = Arc::new(LiquidationEngine::new(
        store.clone(),
        market_engine.clone(),
        ledger.clone(),
        oracle.clone(),
        notifier.clone(),
    ));
    let limit_order_engine = Arc::new(LimitOrderEngine::new(
        store.clone(),
        market_engine.clone(),
        trade_engine.clone(),
        ledger.clone(),
        oracle.clone(),
        notifier.clone(),
    ));
    let trigger_monitor = Arc::new(TriggerMonitor::new(store.clone(), market_engine.clone(), trade_engine.clone()));

    {
        let market_engine = market_engine.clone();
        let store = store.clone();
        supervisor::spawn_periodic("funding-update", FUNDING_UPDATE_PERIOD_MS, move || {
            let market_engine = market_engine.clone();
            let store = store.clone();
            async move { market_timers::funding_tick(&market_engine, &store).await.map_err(Into::into) }
        });
    }
    {
        let market_engine = market_engine.clone();
        let store = store.clone();
        let oracle = oracle.clone();
        supervisor::spawn_periodic("reserve-shift", RESERVE_SHIFT_PERIOD_MS, move || {
            let market_engine = market_engine.clone();
            let store = store.clone();
            let oracle = oracle.clone();
            async move {
                market_timers::reserve_shift_tick(&market_engine, &store, &oracle)
                    .await
                    .map_err(Into::into)
            }
        });
    }
    {
        let fee_accrual = fee_accrual.clone();
        supervisor::spawn_periodic("fee-accrual", FEE_ACCRUAL_PERIOD_MS, move || {
            let fee_accrual = fee_accrual.clone();
            async move { fee_accrual.tick().await.map_err(Into::into) }
        });
    }
    {
        let liquidation_engine = liquidation_engine.clone();
        supervisor::spawn_periodic("liquidation", LIQUIDATION_PERIOD_MS, move || {
            let liquidation_engine = liquidation_engine.clone();
            async move { liquidation_engine.tick().await.map_err(Into::into) }
        });
    }
    {
        let trigger_monitor = trigger_monitor.clone();
        supervisor::spawn_periodic("trigger-monitor", TRIGGER_MONITOR_PERIOD_MS, move || {
            let trigger_monitor = trigger_monitor.clone();
            async move { trigger_monitor.tick().await.map_err(Into::into) }
        });
    }
    {
        let limit_order_engine = limit_order_engine.clone();
        supervisor::spawn_periodic("limit-order", LIMIT_ORDER_PERIOD_MS, move || {
            let limit_order_engine = limit_order_engine.clone();
            async move { limit_order_engine.tick().await.map_err(Into::into) }
        });
    }
    {
        let store = store.clone();
        let market_engine = market_engine.clone();
        supervisor::spawn_periodic("ohlcv-rollup", OHLCV_ROLLUP_PERIOD_MS, move || {
            let store = store.clone();
            let market_engine = market_engine.clone();
            async move { ohlcv::rollup_tick(&store, &market_engine).await.map_err(Into::into) }
        });
    }

    log::info!("engine running, all background timers started");
    futures::future::pending::<()>().await;
    Ok(())
}
