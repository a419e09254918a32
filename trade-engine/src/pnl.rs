use decimal::FixedDecimal;
use engine_core::{EngineResult, Side};

/// `sizeDelta * (executionPrice - entryPrice) / entryPrice`, negated for
/// SHORT. PnL is expressed as a fraction of notional since `size` is
/// USD-denominated rather than token-denominated.
pub fn realized_pnl_usd(
    side: Side,
    size_delta: &FixedDecimal,
    entry_price: &FixedDecimal,
    execution_price: &FixedDecimal,
) -> EngineResult<FixedDecimal> {
    let raw = size_delta
        .mul(&execution_price.sub(entry_price))
        .div(entry_price)?;
    Ok(match side {
        Side::Long => raw,
        Side::Short => raw.neg(),
    })
}
