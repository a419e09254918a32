//! Per-asset collateral arithmetic, isolated per the shared design note:
//! splitting a close's released margin and PnL across C1/C2 is the
//! trickiest invariant in the trade pipeline.

use decimal::FixedDecimal;
use engine_core::EngineResult;

#[derive(Debug, Clone, Copy, Default)]
pub struct CollateralSplit {
    pub release_c1: FixedDecimal,
    pub release_c2: FixedDecimal,
    pub pnl_share_c1: FixedDecimal,
    pub pnl_share_c2: FixedDecimal,
}

/// Splits a close of fraction `p` of a position's locked margin across C1
/// and C2, apportioning `realized_pnl_usd` by each asset's USD-denominated
/// share of the total released collateral. When the released total is zero
/// both PnL shares are zero.
pub fn split_by_usd_proportion(
    locked_margin_c1: &FixedDecimal,
    locked_margin_c2: &FixedDecimal,
    close_fraction: &FixedDecimal,
    realized_pnl_usd: &FixedDecimal,
    price_of_c1: &FixedDecimal,
) -> EngineResult<CollateralSplit> {
    let release_c1 = locked_margin_c1.mul(close_fraction);
    let release_c2 = locked_margin_c2.mul(close_fraction);

    let release_c1_usd = release_c1.mul(price_of_c1);
    let total_usd = release_c1_usd.add(&release_c2);

    if total_usd.is_zero() {
        return Ok(CollateralSplit {
            release_c1,
            release_c2,
            pnl_share_c1: FixedDecimal::ZERO,
            pnl_share_c2: FixedDecimal::ZERO,
        });
    }

    let pnl_share_c1 = realized_pnl_usd
        .mul(&release_c1_usd.div(&total_usd)?)
        .div(price_of_c1)?;
    let pnl_share_c2 = realized_pnl_usd.mul(&release_c2.div(&total_usd)?);

    Ok(CollateralSplit {
        release_c1,
        release_c2,
        pnl_share_c1,
        pnl_share_c2,
    })
}
