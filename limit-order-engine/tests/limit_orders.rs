//! A resting LONG limit order fires once the market's price crosses its
//! trigger, opening through the ordinary trade pipeline and transitioning
//! to FILLED.

use std::sync::Arc;

use decimal::FixedDecimal;
use engine_core::{CollateralAsset, OrderStatus, Side};
use limit_order_engine::{CreateLimitOrderRequest, LimitOrderEngine};
use margin_ledger::InMemoryLedger;
use market_engine::MarketEngine;
use rust_decimal_macros::dec;
use test_support::{FixedOracle, InMemoryStore};
use trade_engine::TradeEngine;

fn fd(v: rust_decimal::Decimal) -> FixedDecimal {
    FixedDecimal::new(v)
}

#[tokio::test]
async fn resting_long_limit_fires_once_price_crosses() {
    let store = Arc::new(InMemoryStore::new());
    let oracle = Arc::new(FixedOracle::new());
    // Market seeded so its virtual price already sits at the scenario's
    // post-cross oracle price ("49500"); the limit scan reads the vAMM's
    // own virtual price, not a live oracle tick.
    oracle.set_default_market_price(fd(dec!(49500)));
    let market_engine = Arc::new(MarketEngine::new(store.clone(), oracle.clone()));
    let market = market_engine
        .create_market("BTC".to_string(), "0xbtc".to_string(), fd(dec!(20)), fd(dec!(0.05)))
        .await
        .unwrap();

    let ledger = Arc::new(InMemoryLedger::new());
    ledger.deposit("dave", CollateralAsset::C2, fd(dec!(10_000)));
    let notifier = Arc::new(engine_core::LoggingNotifier);

    let trade_engine = Arc::new(TradeEngine::new(
        store.clone(),
        market_engine.clone(),
        ledger.clone(),
        oracle.clone(),
        notifier.clone(),
    ));
    let limit_order_engine = LimitOrderEngine::new(
        store.clone(),
        market_engine.clone(),
        trade_engine.clone(),
        ledger.clone(),
        oracle.clone(),
        notifier,
    );

    let order = limit_order_engine
        .create_order(CreateLimitOrderRequest {
            user_id: "dave".to_string(),
            symbol: "BTC".to_string(),
            side: Side::Long,
            size: fd(dec!(1000)),
            price: fd(dec!(50000)),
            leverage: fd(dec!(5)),
            token: CollateralAsset::C2,
        })
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Open);
    assert_eq!(order.required_margin, fd(dec!(200)));

    let filled = limit_order_engine.tick().await.unwrap();
    assert_eq!(filled, 1);

    let after = engine_core::LimitOrderStore::order_by_id(store.as_ref(), order.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.status, OrderStatus::Filled);

    let positions = engine_core::PositionStore::positions_by_user(store.as_ref(), "dave")
        .await
        .unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].side, Side::Long);
    assert_eq!(positions[0].size, fd(dec!(1000)));
    assert_eq!(positions[0].market_id, market.id);
}

#[tokio::test]
async fn order_above_current_price_does_not_fire() {
    let store = Arc::new(InMemoryStore::new());
    let oracle = Arc::new(FixedOracle::new());
    oracle.set_default_market_price(fd(dec!(1)));
    let market_engine = Arc::new(MarketEngine::new(store.clone(), oracle.clone()));
    market_engine
        .create_market("ETH".to_string(), "0xeth".to_string(), fd(dec!(20)), fd(dec!(0.05)))
        .await
        .unwrap();

    let ledger = Arc::new(InMemoryLedger::new());
    ledger.deposit("erin", CollateralAsset::C2, fd(dec!(10_000)));
    let notifier = Arc::new(engine_core::LoggingNotifier);
    let trade_engine = Arc::new(TradeEngine::new(
        store.clone(),
        market_engine.clone(),
        ledger.clone(),
        oracle.clone(),
        notifier.clone(),
    ));
    let limit_order_engine = LimitOrderEngine::new(store.clone(), market_engine.clone(), trade_engine, ledger, oracle, notifier);

    let order = limit_order_engine
        .create_order(CreateLimitOrderRequest {
            user_id: "erin".to_string(),
            symbol: "ETH".to_string(),
            side: Side::Long,
            size: fd(dec!(100)),
            // Trigger well below the current $1 virtual price: a LONG limit
            // only fires once price falls to or below it.
            price: fd(dec!(0.5)),
            leverage: fd(dec!(5)),
            token: CollateralAsset::C2,
        })
        .await
        .unwrap();

    let filled = limit_order_engine.tick().await.unwrap();
    assert_eq!(filled, 0);
    let after = engine_core::LimitOrderStore::order_by_id(store.as_ref(), order.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.status, OrderStatus::Open);
}
