use decimal::FixedDecimal;
use engine_core::{Position, Side};

/// What a triggered position should be closed for, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    StopLoss,
    TakeProfit,
}

/// A LONG's stop loss fires once price falls to or through it, its take
/// profit once price rises to or through it; a SHORT is the mirror image.
/// Stop loss is checked first so a price that gaps through both levels in
/// one tick closes for the loss-limiting reason.
pub fn check_trigger(position: &Position, current_price: &FixedDecimal) -> Option<TriggerKind> {
    if let Some(sl) = &position.stop_loss_price {
        let hit = match position.side {
            Side::Long => current_price.compare(sl) != std::cmp::Ordering::Greater,
            Side::Short => current_price.compare(sl) != std::cmp::Ordering::Less,
        };
        if hit {
            return Some(TriggerKind::StopLoss);
        }
    }
    if let Some(tp) = &position.take_profit_price {
        let hit = match position.side {
            Side::Long => current_price.compare(tp) != std::cmp::Ordering::Less,
            Side::Short => current_price.compare(tp) != std::cmp::Ordering::Greater,
        };
        if hit {
            return Some(TriggerKind::TakeProfit);
        }
    }
    None
}
