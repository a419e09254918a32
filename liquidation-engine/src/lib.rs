pub mod service;
pub mod solvency;

pub use service::LiquidationEngine;
pub use solvency::{collateral_usd, is_liquidatable, liquidation_price};
