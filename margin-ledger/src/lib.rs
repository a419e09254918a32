//! Per-user collateral balances are an external collaborator: the engine
//! only ever touches funds through a typed ledger interface, and this
//! crate ships that interface plus the in-process implementation this
//! engine runs against. The DashMap-sharded map lets balances be read and
//! mutated concurrently from multiple background tasks without an
//! external lock.

use async_trait::async_trait;
use dashmap::DashMap;
use decimal::FixedDecimal;
use engine_core::{CollateralAsset, EngineError, EngineResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct Balance {
    pub available: FixedDecimal,
    pub locked: FixedDecimal,
    pub unrealized: FixedDecimal,
}

#[async_trait]
pub trait MarginLedger: Send + Sync {
    async fn balance(&self, user_id: &str, asset: CollateralAsset) -> EngineResult<Balance>;

    /// Moves `amount` from available into locked. Used when a position opens
    /// or when `editMargin` deposits additional collateral.
    async fn lock(&self, user_id: &str, asset: CollateralAsset, amount: FixedDecimal) -> EngineResult<()>;

    /// Releases `amount` out of locked back into available, adjusted by a
    /// signed `pnl` credited (or debited) at the same time. Used when a
    /// position closes, in full or in part.
    async fn release(
        &self,
        user_id: &str,
        asset: CollateralAsset,
        amount: FixedDecimal,
        pnl: FixedDecimal,
    ) -> EngineResult<()>;

    /// Removes `amount` directly from available, with no corresponding lock.
    /// Used for the trading-fee debit at open.
    async fn deduct(&self, user_id: &str, asset: CollateralAsset, amount: FixedDecimal) -> EngineResult<()>;

    /// Increases locked directly, bypassing available. Used when a position
    /// receives funding (the user's locked margin grows without a deposit).
    async fn add_locked(&self, user_id: &str, asset: CollateralAsset, amount: FixedDecimal) -> EngineResult<()>;

    /// Decreases locked directly, with the difference flowing to the
    /// market's fee pot rather than the user's available balance. Used for
    /// borrowing-fee and positive-funding charges.
    async fn reduce_locked(&self, user_id: &str, asset: CollateralAsset, amount: FixedDecimal) -> EngineResult<()>;
}

/// In-process ledger keyed by `(userId, asset)`. A production deployment
/// would back this with the same row store used for markets/positions; this
/// implementation is what the engine's own test suite and background loops
/// run against.
#[derive(Default)]
pub struct InMemoryLedger {
    balances: DashMap<(String, CollateralAsset), Balance>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            balances: DashMap::new(),
        }
    }

    /// Test/seed helper: credits `amount` straight into available.
    pub fn deposit(&self, user_id: &str, asset: CollateralAsset, amount: FixedDecimal) {
        let mut entry = self.balances.entry((user_id.to_string(), asset)).or_default();
        entry.available = entry.available.add(&amount);
    }

    fn key(user_id: &str, asset: CollateralAsset) -> (String, CollateralAsset) {
        (user_id.to_string(), asset)
    }
}

#[async_trait]
impl MarginLedger for InMemoryLedger {
    async fn balance(&self, user_id: &str, asset: CollateralAsset) -> EngineResult<Balance> {
        Ok(self
            .balances
            .get(&Self::key(user_id, asset))
            .map(|b| *b)
            .unwrap_or_default())
    }

    async fn lock(&self, user_id: &str, asset: CollateralAsset, amount: FixedDecimal) -> EngineResult<()> {
        let mut entry = self.balances.entry(Self::key(user_id, asset)).or_default();
        if entry.available.compare(&amount) == std::cmp::Ordering::Less {
            return Err(EngineError::InsufficientFunds);
        }
        entry.available = entry.available.sub(&amount);
        entry.locked = entry.locked.add(&amount);
        Ok(())
    }

    async fn release(
        &self,
        user_id: &str,
        asset: CollateralAsset,
        amount: FixedDecimal,
        pnl: FixedDecimal,
    ) -> EngineResult<()> {
        let mut entry = self.balances.entry(Self::key(user_id, asset)).or_default();
        entry.locked = entry.locked.sub(&amount).max(&FixedDecimal::ZERO);
        entry.available = entry.available.add(&amount).add(&pnl).max(&FixedDecimal::ZERO);
        Ok(())
    }

    async fn deduct(&self, user_id: &str, asset: CollateralAsset, amount: FixedDecimal) -> EngineResult<()> {
        let mut entry = self.balances.entry(Self::key(user_id, asset)).or_default();
        if entry.available.compare(&amount) == std::cmp::Ordering::Less {
            return Err(EngineError::InsufficientFunds);
        }
        entry.available = entry.available.sub(&amount);
        Ok(())
    }

    async fn add_locked(&self, user_id: &str, asset: CollateralAsset, amount: FixedDecimal) -> EngineResult<()> {
        let mut entry = self.balances.entry(Self::key(user_id, asset)).or_default();
        entry.locked = entry.locked.add(&amount);
        Ok(())
    }

    async fn reduce_locked(&self, user_id: &str, asset: CollateralAsset, amount: FixedDecimal) -> EngineResult<()> {
        let mut entry = self.balances.entry(Self::key(user_id, asset)).or_default();
        entry.locked = entry.locked.sub(&amount).max(&FixedDecimal::ZERO);
        Ok(())
    }
}
