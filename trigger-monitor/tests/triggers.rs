//! A long position's take-profit fires once the market's virtual price
//! crosses it, closing through the ordinary trade pipeline.

use std::sync::Arc;

use chrono::Utc;
use decimal::FixedDecimal;
use engine_core::{CollateralAsset, Position, PositionStatus, PositionStore, Side};
use margin_ledger::{InMemoryLedger, MarginLedger};
use market_engine::MarketEngine;
use rust_decimal_macros::dec;
use test_support::{FixedOracle, InMemoryStore};
use trade_engine::TradeEngine;
use trigger_monitor::TriggerMonitor;

fn fd(v: rust_decimal::Decimal) -> FixedDecimal {
    FixedDecimal::new(v)
}

#[tokio::test]
async fn long_take_profit_closes_once_price_crosses_it() {
    let store = Arc::new(InMemoryStore::new());
    let oracle = Arc::new(FixedOracle::new());
    // Seeded at $1.20 so the market's own virtual price already sits past
    // the position's $1.10 take-profit level; the monitor reads the vAMM's
    // virtual price, not a live oracle tick.
    oracle.set_default_market_price(fd(dec!(1.2)));
    let market_engine = Arc::new(MarketEngine::new(store.clone(), oracle.clone()));
    let market = market_engine
        .create_market("BTC".to_string(), "0xbtc".to_string(), fd(dec!(20)), fd(dec!(0.05)))
        .await
        .unwrap();

    let user_id = "heidi".to_string();
    let now = Utc::now();
    let position = Position {
        id: uuid::Uuid::new_v4(),
        user_id: user_id.clone(),
        market_id: market.id,
        symbol: market.symbol.clone(),
        side: Side::Long,
        size: fd(dec!(100)),
        entry_price: fd(dec!(1)),
        leverage: fd(dec!(10)),
        margin: fd(dec!(10)),
        token: CollateralAsset::C2,
        locked_margin_c1: FixedDecimal::ZERO,
        locked_margin_c2: fd(dec!(10)),
        stop_loss_price: None,
        take_profit_price: Some(fd(dec!(1.1))),
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
    store.insert_position(position.clone()).await.unwrap();

    let ledger = Arc::new(InMemoryLedger::new());
    ledger.deposit(&user_id, CollateralAsset::C2, fd(dec!(10)));
    ledger.lock(&user_id, CollateralAsset::C2, fd(dec!(10))).await.unwrap();
    let notifier = Arc::new(engine_core::LoggingNotifier);

    let trade_engine = Arc::new(TradeEngine::new(
        store.clone(),
        market_engine.clone(),
        ledger.clone(),
        oracle.clone(),
        notifier,
    ));
    let monitor = TriggerMonitor::new(store.clone(), market_engine.clone(), trade_engine);

    let closed_count = monitor.tick().await.unwrap();
    assert_eq!(closed_count, 1);

    let closed = store.position_by_id(position.id).await.unwrap().unwrap();
    assert_eq!(closed.status, PositionStatus::Closed);
    assert!(closed.closing_price.unwrap().compare(&fd(dec!(1.1))) == std::cmp::Ordering::Greater);
    assert!(closed.realized_pnl.unwrap().is_positive());
}

#[tokio::test]
async fn position_without_a_trigger_crossed_stays_open() {
    let store = Arc::new(InMemoryStore::new());
    let oracle = Arc::new(FixedOracle::new());
    oracle.set_default_market_price(fd(dec!(1)));
    let market_engine = Arc::new(MarketEngine::new(store.clone(), oracle.clone()));
    let market = market_engine
        .create_market("ETH".to_string(), "0xeth".to_string(), fd(dec!(20)), fd(dec!(0.05)))
        .await
        .unwrap();

    let now = Utc::now();
    let position = Position {
        id: uuid::Uuid::new_v4(),
        user_id: "ivan".to_string(),
        market_id: market.id,
        symbol: market.symbol.clone(),
        side: Side::Long,
        size: fd(dec!(100)),
        entry_price: fd(dec!(1)),
        leverage: fd(dec!(10)),
        margin: fd(dec!(10)),
        token: CollateralAsset::C2,
        locked_margin_c1: FixedDecimal::ZERO,
        locked_margin_c2: fd(dec!(10)),
        stop_loss_price: Some(fd(dec!(0.5))),
        take_profit_price: Some(fd(dec!(2))),
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
    store.insert_position(position.clone()).await.unwrap();

    let ledger = Arc::new(InMemoryLedger::new());
    let notifier = Arc::new(engine_core::LoggingNotifier);
    let trade_engine = Arc::new(TradeEngine::new(store.clone(), market_engine.clone(), ledger, oracle, notifier));
    let monitor = TriggerMonitor::new(store.clone(), market_engine, trade_engine);

    let closed_count = monitor.tick().await.unwrap();
    assert_eq!(closed_count, 0);

    let untouched = store.position_by_id(position.id).await.unwrap().unwrap();
    assert_eq!(untouched.status, PositionStatus::Open);
}
