use decimal::FixedDecimal;
use engine_core::{EngineResult, Side};

/// `size * rate * (deltaSeconds / secondsPerDay)`, the shared shape behind
/// both the borrowing-fee and funding-fee formulas.
fn prorated(size: &FixedDecimal, rate: &FixedDecimal, delta_seconds: &FixedDecimal, seconds_per_day: i64) -> EngineResult<FixedDecimal> {
    Ok(size
        .mul(rate)
        .mul(&delta_seconds.div(&FixedDecimal::from_i64(seconds_per_day))?))
}

/// Always reduces the holder's locked margin; borrowing is charged to
/// longs and shorts alike.
pub fn borrowing_fee_usd(
    size: &FixedDecimal,
    borrowing_rate: &FixedDecimal,
    delta_seconds: &FixedDecimal,
    seconds_per_day: i64,
) -> EngineResult<FixedDecimal> {
    prorated(size, borrowing_rate, delta_seconds, seconds_per_day)
}

/// Signed: positive means the position pays (reduces locked margin),
/// negative means it receives (increases locked margin). LONG pays when
/// `current_funding_rate > 0`; SHORT receives in that case.
pub fn signed_funding_fee_usd(
    side: Side,
    size: &FixedDecimal,
    current_funding_rate: &FixedDecimal,
    delta_seconds: &FixedDecimal,
    seconds_per_day: i64,
) -> EngineResult<FixedDecimal> {
    let funding_usd = prorated(size, current_funding_rate, delta_seconds, seconds_per_day)?;
    Ok(match side {
        Side::Long => funding_usd,
        Side::Short => funding_usd.neg(),
    })
}
