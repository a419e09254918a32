//! Funding-rate skew/velocity dynamics, kept separate from reserve
//! arithmetic since the two tick on different schedules (1 min vs. 10 s).

use decimal::FixedDecimal;
use engine_core::EngineResult;

#[derive(Debug, Clone, Copy)]
pub struct FundingUpdate {
    pub funding_rate: FixedDecimal,
    pub funding_rate_velocity: FixedDecimal,
}

/// `skew / skewScale`, clamped to `[-1, 1]`, defined as zero when
/// `longOI + shortOI == 0` (a market with no open interest has no skew).
fn proportional_skew(long_oi: &FixedDecimal, short_oi: &FixedDecimal) -> EngineResult<FixedDecimal> {
    let skew = long_oi.sub(short_oi);
    let skew_scale = long_oi.add(short_oi);
    if skew_scale.is_zero() {
        return Ok(FixedDecimal::ZERO);
    }
    let raw = skew.div(&skew_scale)?;
    Ok(raw.clamp(&FixedDecimal::from_i64(-1), &FixedDecimal::ONE))
}

/// Recomputes `fundingRate`/`fundingRateVelocity` for the minute-scheduled
/// job. `now_ms` and `last_updated_ms` are both millisecond epoch; positive
/// rate means longs pay, shorts receive.
pub fn next_funding_update(
    long_oi: &FixedDecimal,
    short_oi: &FixedDecimal,
    current_funding_rate: &FixedDecimal,
    max_funding_rate: &FixedDecimal,
    max_funding_velocity: &FixedDecimal,
    now_ms: i64,
    last_updated_ms: i64,
    seconds_per_day: i64,
) -> EngineResult<FundingUpdate> {
    let skew = proportional_skew(long_oi, short_oi)?;
    let velocity = skew
        .mul(max_funding_velocity)
        .clamp(&max_funding_velocity.neg(), max_funding_velocity);

    let elapsed_s = FixedDecimal::from_i64((now_ms - last_updated_ms) / 1000);
    let drift = velocity
        .mul(&elapsed_s)
        .div(&FixedDecimal::from_i64(seconds_per_day))?;
    let clamped_rate = current_funding_rate
        .add(&drift)
        .clamp(&max_funding_rate.neg(), max_funding_rate);

    Ok(FundingUpdate {
        funding_rate: clamped_rate,
        funding_rate_velocity: velocity,
    })
}

/// Read-side current rate: the persisted rate drifted by velocity since the
/// last scheduled update, without mutating anything.
pub fn current_funding_rate(
    funding_rate: &FixedDecimal,
    funding_rate_velocity: &FixedDecimal,
    max_funding_rate: &FixedDecimal,
    now_ms: i64,
    last_updated_ms: i64,
    seconds_per_day: i64,
) -> EngineResult<FixedDecimal> {
    let elapsed_s = FixedDecimal::from_i64((now_ms - last_updated_ms) / 1000);
    let drift = funding_rate_velocity
        .mul(&elapsed_s)
        .div(&FixedDecimal::from_i64(seconds_per_day))?;
    Ok(funding_rate
        .add(&drift)
        .clamp(&max_funding_rate.neg(), max_funding_rate))
}
