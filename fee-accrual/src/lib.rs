pub mod fee_math;
pub mod service;

pub use fee_math::{borrowing_fee_usd, signed_funding_fee_usd};
pub use service::FeeAccrual;
