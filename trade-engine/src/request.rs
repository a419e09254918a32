use decimal::FixedDecimal;
use engine_core::{CollateralAsset, MarketId, Side, UserId};

#[derive(Debug, Clone)]
pub struct OpenPositionRequest {
    pub user_id: UserId,
    pub market_id: MarketId,
    pub side: Side,
    pub size: FixedDecimal,
    pub leverage: FixedDecimal,
    pub token: CollateralAsset,
    pub max_slippage: FixedDecimal,
    pub stop_loss_price: Option<FixedDecimal>,
    pub take_profit_price: Option<FixedDecimal>,
}

#[derive(Debug, Clone)]
pub struct ClosePositionRequest {
    pub position_id: engine_core::PositionId,
    pub user_id: UserId,
    pub size_delta: FixedDecimal,
    pub max_slippage: FixedDecimal,
}
