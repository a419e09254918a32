//! A position drops 9.5% against a 5% maintenance margin and is
//! force-closed with zero realized PnL.

use std::sync::Arc;

use chrono::Utc;
use decimal::FixedDecimal;
use engine_core::{CollateralAsset, MarketStore, Position, PositionStatus, PositionStore, Side};
use liquidation_engine::LiquidationEngine;
use margin_ledger::{InMemoryLedger, MarginLedger};
use market_engine::MarketEngine;
use rust_decimal_macros::dec;
use test_support::{FixedOracle, InMemoryStore};

fn fd(v: rust_decimal::Decimal) -> FixedDecimal {
    FixedDecimal::new(v)
}

#[tokio::test]
async fn underwater_position_is_force_closed_with_zero_pnl() {
    let store = Arc::new(InMemoryStore::new());
    let oracle = Arc::new(FixedOracle::new());
    oracle.set_default_market_price(fd(dec!(1)));
    oracle.set_c1_price(fd(dec!(100)));
    let market_engine = Arc::new(MarketEngine::new(store.clone(), oracle.clone()));
    let market = market_engine
        .create_market("BTC".to_string(), "0xbtc".to_string(), fd(dec!(20)), fd(dec!(0.05)))
        .await
        .unwrap();

    // Write straight to the store (not through `market_engine`) so this
    // never primes the engine's read-through cache ahead of the tick.
    let mut seeded = market.clone();
    seeded.long_open_interest = fd(dec!(1000));
    store.update_market(seeded).await.unwrap();

    let user_id = "bob".to_string();
    let now = Utc::now();
    let position = Position {
        id: uuid::Uuid::new_v4(),
        user_id: user_id.clone(),
        market_id: market.id,
        symbol: market.symbol.clone(),
        side: Side::Long,
        size: fd(dec!(1000)),
        entry_price: fd(dec!(1)),
        leverage: fd(dec!(10)),
        margin: fd(dec!(100)),
        token: CollateralAsset::C2,
        locked_margin_c1: FixedDecimal::ZERO,
        locked_margin_c2: fd(dec!(100)),
        stop_loss_price: None,
        take_profit_price: None,
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
    ledger.deposit(&user_id, CollateralAsset::C2, fd(dec!(100)));
    ledger.lock(&user_id, CollateralAsset::C2, fd(dec!(100))).await.unwrap();
    let notifier = Arc::new(engine_core::LoggingNotifier);

    let liquidation_engine = LiquidationEngine::new(store.clone(), market_engine.clone(), ledger.clone(), oracle.clone(), notifier);

    // Oracle drops 9.5%: pnl = 1000 * (0.905 - 1) = -95; remaining = 100 -
    // 95 = 5, required = 100 * 0.05 = 5; remaining < required is false at
    // exactly 5, so drop one basis point further to cross the boundary.
    oracle.set_market_price(market.id, fd(dec!(0.9049)));

    let liquidated_count = liquidation_engine.tick().await.unwrap();
    assert_eq!(liquidated_count, 1);

    let closed = store.position_by_id(position.id).await.unwrap().unwrap();
    assert_eq!(closed.status, PositionStatus::Liquidated);
    assert_eq!(closed.realized_pnl, Some(FixedDecimal::ZERO));
    assert_eq!(closed.locked_margin_c1, FixedDecimal::ZERO);
    assert_eq!(closed.locked_margin_c2, FixedDecimal::ZERO);

    let after_market = market_engine.market_by_id(market.id).await.unwrap();
    assert_eq!(after_market.long_open_interest, FixedDecimal::ZERO);

    let balance = ledger.balance(&user_id, CollateralAsset::C2).await.unwrap();
    assert_eq!(balance.locked, FixedDecimal::ZERO);
    assert_eq!(balance.available, FixedDecimal::ZERO);
}

#[tokio::test]
async fn healthy_position_survives_a_tick() {
    let store = Arc::new(InMemoryStore::new());
    let oracle = Arc::new(FixedOracle::new());
    oracle.set_default_market_price(fd(dec!(1)));
    oracle.set_c1_price(fd(dec!(100)));
    let market_engine = Arc::new(MarketEngine::new(store.clone(), oracle.clone()));
    let market = market_engine
        .create_market("ETH".to_string(), "0xeth".to_string(), fd(dec!(20)), fd(dec!(0.05)))
        .await
        .unwrap();

    let now = Utc::now();
    let position = Position {
        id: uuid::Uuid::new_v4(),
        user_id: "carol".to_string(),
        market_id: market.id,
        symbol: market.symbol.clone(),
        side: Side::Long,
        size: fd(dec!(1000)),
        entry_price: fd(dec!(1)),
        leverage: fd(dec!(10)),
        margin: fd(dec!(100)),
        token: CollateralAsset::C2,
        locked_margin_c1: FixedDecimal::ZERO,
        locked_margin_c2: fd(dec!(100)),
        stop_loss_price: None,
        take_profit_price: None,
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
    let liquidation_engine = LiquidationEngine::new(store.clone(), market_engine.clone(), ledger, oracle.clone(), notifier);

    oracle.set_market_price(market.id, fd(dec!(0.99)));
    let liquidated_count = liquidation_engine.tick().await.unwrap();
    assert_eq!(liquidated_count, 0);

    let untouched = store.position_by_id(position.id).await.unwrap().unwrap();
    assert_eq!(untouched.status, PositionStatus::Open);
}
