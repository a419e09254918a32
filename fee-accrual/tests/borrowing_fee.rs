//! One day of borrowing fee accrual on a size=1000, borrowingRate=0.001/day
//! C2 position.

use std::sync::Arc;

use chrono::Utc;
use decimal::FixedDecimal;
use engine_core::{CollateralAsset, Position, PositionStatus, PositionStore, Side};
use fee_accrual::FeeAccrual;
use margin_ledger::{InMemoryLedger, MarginLedger};
use market_engine::MarketEngine;
use rust_decimal_macros::dec;
use test_support::{FixedOracle, InMemoryStore};

fn fd(v: rust_decimal::Decimal) -> FixedDecimal {
    FixedDecimal::new(v)
}

#[tokio::test]
async fn one_day_of_borrowing_charges_exactly_one_unit() {
    let store = Arc::new(InMemoryStore::new());
    let oracle = Arc::new(FixedOracle::new());
    oracle.set_default_market_price(fd(dec!(1)));
    oracle.set_c1_price(fd(dec!(100)));
    let market_engine = Arc::new(MarketEngine::new(store.clone(), oracle.clone()));
    let market = market_engine
        .create_market("BTC".to_string(), "0xbtc".to_string(), fd(dec!(20)), fd(dec!(0.05)))
        .await
        .unwrap();

    // Override the default borrowing rate with the scenario's literal
    // 0.001/day, writing straight to the store before `MarketEngine` ever
    // caches this market so the fee tick reads the overridden value.
    let mut seeded = market.clone();
    seeded.borrowing_rate = fd(dec!(0.001));
    engine_core::MarketStore::update_market(store.as_ref(), seeded).await.unwrap();

    let one_day_ago = Utc::now().timestamp_millis() - 86_400_000;
    let user_id = "frank".to_string();
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
        last_borrowing_fee_update: one_day_ago,
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

    let fee_accrual = FeeAccrual::new(store.clone(), market_engine.clone(), ledger.clone(), oracle.clone(), notifier);
    // Funding rate starts at zero on a freshly seeded market: only the
    // borrowing leg is expected to move here.
    let ticked = fee_accrual.tick().await.unwrap();
    assert_eq!(ticked, 1);

    let after = store.position_by_id(position.id).await.unwrap().unwrap();
    assert_eq!(after.accumulated_borrowing, fd(dec!(1)));
    assert_eq!(after.locked_margin_c2, fd(dec!(99)));

    let after_market = market_engine.market_by_id(market.id).await.unwrap();
    assert_eq!(after_market.unclaimed_fees_c2, fd(dec!(1)));
    assert_eq!(after_market.cumulative_fees_c2, fd(dec!(1)));

    let balance = ledger.balance(&user_id, CollateralAsset::C2).await.unwrap();
    assert_eq!(balance.locked, fd(dec!(99)));
}

#[tokio::test]
async fn running_the_tick_twice_with_no_elapsed_time_is_a_no_op() {
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
        user_id: "grace".to_string(),
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
    ledger.deposit("grace", CollateralAsset::C2, fd(dec!(100)));
    ledger.lock("grace", CollateralAsset::C2, fd(dec!(100))).await.unwrap();
    let notifier = Arc::new(engine_core::LoggingNotifier);
    let fee_accrual = FeeAccrual::new(store.clone(), market_engine.clone(), ledger.clone(), oracle.clone(), notifier);

    fee_accrual.tick().await.unwrap();
    fee_accrual.tick().await.unwrap();

    let after = store.position_by_id(position.id).await.unwrap().unwrap();
    assert_eq!(after.accumulated_borrowing, FixedDecimal::ZERO);
    assert_eq!(after.locked_margin_c2, fd(dec!(100)));
}
