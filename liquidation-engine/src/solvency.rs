use decimal::FixedDecimal;
use engine_core::{EngineResult, Side};

/// `lockedMarginC1 * PriceOf(C1) + lockedMarginC2`.
pub fn collateral_usd(locked_c1: &FixedDecimal, locked_c2: &FixedDecimal, price_c1: &FixedDecimal) -> FixedDecimal {
    locked_c1.mul(price_c1).add(locked_c2)
}

/// `remaining = collateralUsd + pnlUsd < required = collateralUsd * maintenanceMarginRate`.
pub fn is_liquidatable(collateral_usd: &FixedDecimal, pnl_usd: &FixedDecimal, maintenance_margin_rate: &FixedDecimal) -> bool {
    let remaining = collateral_usd.add(pnl_usd);
    let required = collateral_usd.mul(maintenance_margin_rate);
    remaining.compare(&required) == std::cmp::Ordering::Less
}

/// Closed-form liquidation price: solves `|pnlFraction| * size == collateralUsd
/// - maintenanceMarginUsd` for price, using the same boundary as
/// [`is_liquidatable`]. For LONG, liquidation fires when price falls to or
/// below this; for SHORT, when it rises to or above it.
pub fn liquidation_price(
    side: Side,
    size: &FixedDecimal,
    entry_price: &FixedDecimal,
    collateral_usd: &FixedDecimal,
    maintenance_margin_rate: &FixedDecimal,
) -> EngineResult<FixedDecimal> {
    let maintenance_margin_usd = collateral_usd.mul(maintenance_margin_rate);
    let offset_usd = collateral_usd.sub(&maintenance_margin_usd);
    let offset_fraction = offset_usd.div(size)?;
    Ok(match side {
        Side::Long => entry_price.mul(&FixedDecimal::ONE.sub(&offset_fraction)),
        Side::Short => entry_price.mul(&FixedDecimal::ONE.add(&offset_fraction)),
    })
}
