use std::sync::Arc;

use chrono::Utc;
use decimal::FixedDecimal;
use engine_core::{
    EngineError, EngineResult, Market, MarketId, MarketStatus, MarketStore, Side, TtlCache,
    DEFAULT_BORROWING_RATE, DEFAULT_MAX_FUNDING_RATE, DEFAULT_MAX_FUNDING_VELOCITY, MARKET_CACHE_TTL_SECS,
    SECONDS_PER_DAY,
};
use price_oracle::PriceOracle;

use crate::amm::{self, Preview};
use crate::funding;

/// Orchestrates the vAMM: owns no state itself beyond a read-through cache,
/// delegating durability to the store and price discovery to the oracle.
pub struct MarketEngine<Sto, Ora> {
    store: Arc<Sto>,
    oracle: Arc<Ora>,
    by_id: TtlCache<MarketId, Market>,
    by_symbol: TtlCache<String, MarketId>,
}

impl<Sto, Ora> MarketEngine<Sto, Ora>
where
    Sto: MarketStore,
    Ora: PriceOracle,
{
    pub fn new(store: Arc<Sto>, oracle: Arc<Ora>) -> Self {
        Self {
            store,
            oracle,
            by_id: TtlCache::new(MARKET_CACHE_TTL_SECS),
            by_symbol: TtlCache::new(MARKET_CACHE_TTL_SECS),
        }
    }

    fn invalidate(&self, market: &Market) {
        self.by_id.invalidate(&market.id);
        self.by_symbol.invalidate(&market.symbol);
    }

    pub async fn create_market(
        &self,
        symbol: String,
        token_address: String,
        max_leverage: FixedDecimal,
        maintenance_margin: FixedDecimal,
    ) -> EngineResult<Market> {
        if self.store.market_by_symbol(&symbol).await?.is_some() {
            return Err(EngineError::DuplicateSymbol(symbol));
        }

        let id = uuid::Uuid::new_v4();
        let p0 = self.oracle.oracle_price(id).await?;
        let (base_reserve, quote_reserve, virtual_k) = amm::seed_reserves(&p0)?;
        let now = Utc::now();

        let market = Market {
            id,
            symbol,
            token_address,
            max_leverage,
            maintenance_margin,
            borrowing_rate: FixedDecimal::parse_from_string(DEFAULT_BORROWING_RATE)
                .expect("valid default borrowing rate constant"),
            funding_rate: FixedDecimal::ZERO,
            funding_rate_velocity: FixedDecimal::ZERO,
            max_funding_rate: FixedDecimal::parse_from_string(DEFAULT_MAX_FUNDING_RATE)
                .expect("valid default max funding rate constant"),
            max_funding_velocity: FixedDecimal::parse_from_string(DEFAULT_MAX_FUNDING_VELOCITY)
                .expect("valid default max funding velocity constant"),
            long_open_interest: FixedDecimal::ZERO,
            short_open_interest: FixedDecimal::ZERO,
            available_liquidity: FixedDecimal::from_i64(engine_core::SEED_DEPTH_USD as i64 * 2),
            virtual_base_reserve: base_reserve,
            virtual_quote_reserve: quote_reserve,
            virtual_k,
            cumulative_fees_c1: FixedDecimal::ZERO,
            cumulative_fees_c2: FixedDecimal::ZERO,
            unclaimed_fees_c1: FixedDecimal::ZERO,
            unclaimed_fees_c2: FixedDecimal::ZERO,
            status: MarketStatus::Active,
            last_updated_timestamp: now.timestamp_millis(),
            created_at: now,
            updated_at: now,
        };
        self.store.insert_market(market).await
    }

    pub async fn market_by_id(&self, id: MarketId) -> EngineResult<Market> {
        if let Some(m) = self.by_id.get(&id) {
            return Ok(m);
        }
        let market = self
            .store
            .market_by_id(id)
            .await?
            .ok_or_else(|| EngineError::MarketNotFound(id.to_string()))?;
        self.by_id.put(id, market.clone());
        Ok(market)
    }

    pub async fn market_by_symbol(&self, symbol: &str) -> EngineResult<Market> {
        if let Some(id) = self.by_symbol.get(&symbol.to_string()) {
            return self.market_by_id(id).await;
        }
        let market = self
            .store
            .market_by_symbol(symbol)
            .await?
            .ok_or_else(|| EngineError::MarketNotFound(symbol.to_string()))?;
        self.by_symbol.put(symbol.to_string(), market.id);
        self.by_id.put(market.id, market.clone());
        Ok(market)
    }

    pub fn virtual_price(&self, market: &Market) -> EngineResult<FixedDecimal> {
        amm::virtual_price(market.virtual_base_reserve, market.virtual_quote_reserve)
    }

    /// Rejects if opening `size` would push total OI past `availableLiquidity`.
    pub fn check_liquidity(&self, market: &Market, size: &FixedDecimal) -> EngineResult<()> {
        let projected = market
            .long_open_interest
            .add(&market.short_open_interest)
            .add(size);
        if projected.compare(&market.available_liquidity) == std::cmp::Ordering::Greater {
            return Err(EngineError::InsufficientLiquidity);
        }
        Ok(())
    }

    pub fn preview(
        &self,
        market: &Market,
        side: Side,
        is_closing: bool,
        size_usd: &FixedDecimal,
    ) -> EngineResult<Preview> {
        amm::preview(
            market.virtual_base_reserve,
            market.virtual_quote_reserve,
            side,
            is_closing,
            size_usd,
        )
    }

    /// Commits a previewed trade: moves the base reserve, recomputes `k`,
    /// and updates open interest for `side` (increasing on open, decreasing
    /// on close). Persists and invalidates the cache.
    pub async fn commit_trade(
        &self,
        mut market: Market,
        side: Side,
        is_closing: bool,
        size_usd: &FixedDecimal,
        preview: &Preview,
    ) -> EngineResult<Market> {
        market.virtual_base_reserve = preview.new_base_reserve;
        market.virtual_k = amm::recompute_k(market.virtual_base_reserve, market.virtual_quote_reserve)?;

        let oi = match side {
            Side::Long => &mut market.long_open_interest,
            Side::Short => &mut market.short_open_interest,
        };
        *oi = if is_closing {
            oi.sub(size_usd).max(&FixedDecimal::ZERO)
        } else {
            oi.add(size_usd)
        };

        market.updated_at = Utc::now();
        let saved = self.store.update_market(market).await?;
        self.invalidate(&saved);
        Ok(saved)
    }

    /// Minute-scheduled funding re-seed.
    pub async fn tick_funding(&self, mut market: Market) -> EngineResult<Market> {
        let now_ms = Utc::now().timestamp_millis();
        let update = funding::next_funding_update(
            &market.long_open_interest,
            &market.short_open_interest,
            &market.funding_rate,
            &market.max_funding_rate,
            &market.max_funding_velocity,
            now_ms,
            market.last_updated_timestamp,
            SECONDS_PER_DAY,
        )?;
        market.funding_rate = update.funding_rate;
        market.funding_rate_velocity = update.funding_rate_velocity;
        market.last_updated_timestamp = now_ms;
        market.updated_at = Utc::now();
        let saved = self.store.update_market(market).await?;
        self.invalidate(&saved);
        Ok(saved)
    }

    /// Read-side current funding rate, drifted by velocity since the last
    /// scheduled update but not persisted.
    pub fn current_funding_rate(&self, market: &Market) -> EngineResult<FixedDecimal> {
        funding::current_funding_rate(
            &market.funding_rate,
            &market.funding_rate_velocity,
            &market.max_funding_rate,
            Utc::now().timestamp_millis(),
            market.last_updated_timestamp,
            SECONDS_PER_DAY,
        )
    }

    /// 10 s reserve convergence toward the oracle.
    pub async fn tick_reserve_shift(
        &self,
        mut market: Market,
        oracle_price: &FixedDecimal,
        convergence_seconds: i64,
        threshold: &FixedDecimal,
        tick_seconds: i64,
    ) -> EngineResult<Option<Market>> {
        let shifted = amm::convergence_adjustment(
            market.virtual_base_reserve,
            market.virtual_quote_reserve,
            oracle_price,
            convergence_seconds,
            threshold,
            tick_seconds,
        )?;
        let Some(new_base) = shifted else {
            return Ok(None);
        };
        market.virtual_base_reserve = new_base;
        market.virtual_k = amm::recompute_k(new_base, market.virtual_quote_reserve)?;
        market.updated_at = Utc::now();
        let saved = self.store.update_market(market).await?;
        self.invalidate(&saved);
        Ok(Some(saved))
    }

    pub async fn add_trading_fees(
        &self,
        mut market: Market,
        amount: &FixedDecimal,
        asset: engine_core::CollateralAsset,
    ) -> EngineResult<Market> {
        match asset {
            engine_core::CollateralAsset::C1 => {
                market.cumulative_fees_c1 = market.cumulative_fees_c1.add(amount);
                market.unclaimed_fees_c1 = market.unclaimed_fees_c1.add(amount);
            }
            engine_core::CollateralAsset::C2 => {
                market.cumulative_fees_c2 = market.cumulative_fees_c2.add(amount);
                market.unclaimed_fees_c2 = market.unclaimed_fees_c2.add(amount);
            }
        }
        market.updated_at = Utc::now();
        let saved = self.store.update_market(market).await?;
        self.invalidate(&saved);
        Ok(saved)
    }

    /// Zeros and returns the unclaimed fee pot for `asset`. Gated by admin
    /// PIN at the transport boundary, out of this crate's scope.
    pub async fn claim_fees(
        &self,
        mut market: Market,
        asset: engine_core::CollateralAsset,
    ) -> EngineResult<(Market, FixedDecimal)> {
        let claimed = match asset {
            engine_core::CollateralAsset::C1 => std::mem::replace(&mut market.unclaimed_fees_c1, FixedDecimal::ZERO),
            engine_core::CollateralAsset::C2 => std::mem::replace(&mut market.unclaimed_fees_c2, FixedDecimal::ZERO),
        };
        market.updated_at = Utc::now();
        let saved = self.store.update_market(market).await?;
        self.invalidate(&saved);
        Ok((saved, claimed))
    }
}
