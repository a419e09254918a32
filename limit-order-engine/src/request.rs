use decimal::FixedDecimal;
use engine_core::{CollateralAsset, Side, UserId};

#[derive(Debug, Clone)]
pub struct CreateLimitOrderRequest {
    pub user_id: UserId,
    pub symbol: String,
    pub side: Side,
    pub size: FixedDecimal,
    pub price: FixedDecimal,
    pub leverage: FixedDecimal,
    pub token: CollateralAsset,
}
