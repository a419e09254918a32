//! Named constants shared by every component. Keeping the scale factors
//! named (rather than inlined as magic numbers) is what keeps the vAMM
//! reserve math and the `FixedDecimal` math from drifting apart.

/// Scale factor for `Market::virtual_base_reserve`.
pub const BASE_UNIT: i128 = 1_000_000_000;
/// Scale factor for `Market::virtual_quote_reserve`.
pub const QUOTE_UNIT: i128 = 1_000_000;
/// `BASE_UNIT / QUOTE_UNIT`, aligning the two reserve scales into a
/// human-readable price.
pub const UNIT_DELTA: i128 = BASE_UNIT / QUOTE_UNIT;

/// USD depth seeded on each side of a freshly created market.
pub const SEED_DEPTH_USD: i128 = 1_000_000;

pub const SECONDS_PER_DAY: i64 = 86_400;

pub const DEFAULT_BORROWING_RATE: &str = "0.0003";
pub const DEFAULT_MAX_FUNDING_RATE: &str = "0.0003";
pub const DEFAULT_MAX_FUNDING_VELOCITY: &str = "0.01";
pub const DEFAULT_MAINTENANCE_MARGIN: &str = "0.05";
pub const TRADING_FEE: &str = "0.001";

/// Reserves converge toward the oracle price over this many seconds.
pub const CONVERGENCE_SECONDS: i64 = 14_400;
/// Reserve convergence only engages once virtual/oracle price diverge by
/// at least this relative fraction.
pub const CONVERGENCE_THRESHOLD: &str = "0.001";

/// How long a stale oracle price may still be served before opens are
/// rejected with `OracleUnavailable`.
pub const STALE_PRICE_BUDGET_MS: i64 = 30_000;

/// Background timer periods, in milliseconds.
pub const FUNDING_UPDATE_PERIOD_MS: u64 = 60_000;
pub const RESERVE_SHIFT_PERIOD_MS: u64 = 10_000;
pub const FEE_ACCRUAL_PERIOD_MS: u64 = 5_000;
pub const LIQUIDATION_PERIOD_MS: u64 = 5_000;
pub const TRIGGER_MONITOR_PERIOD_MS: u64 = 10_000;
pub const LIMIT_ORDER_PERIOD_MS: u64 = 10_000;
pub const OHLCV_ROLLUP_PERIOD_MS: u64 = 10_000;

/// Cache TTLs, in seconds, per the shared-cache design note.
pub const MARKET_CACHE_TTL_SECS: u64 = 3_600;
pub const POSITION_CACHE_TTL_SECS: u64 = 5;
pub const TRADE_CACHE_TTL_SECS: u64 = 60;
pub const OHLCV_CACHE_TTL_SECS: u64 = 60;
pub const MARKET_STATS_CACHE_TTL_SECS: u64 = 60;
