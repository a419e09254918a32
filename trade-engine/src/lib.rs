pub mod collateral_split;
pub mod pnl;
pub mod request;
pub mod service;

pub use collateral_split::{split_by_usd_proportion, CollateralSplit};
pub use pnl::realized_pnl_usd;
pub use request::{ClosePositionRequest, OpenPositionRequest};
pub use service::TradeEngine;
