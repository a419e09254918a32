pub mod amm;
pub mod funding;
pub mod service;

pub use amm::{Preview, convergence_adjustment, preview, recompute_k, seed_reserves, virtual_price};
pub use funding::{current_funding_rate, next_funding_update, FundingUpdate};
pub use service::MarketEngine;
