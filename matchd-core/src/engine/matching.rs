use crate::engine::book::{HeadFill, SymbolBook};
use crate::engine::error::BookError;
use crate::engine::types::{
    Order, OrderId, OrderKind, OrderStatus, Price, Quantity, RejectReason, Side, Trade,
};
use crossbeam::epoch;
use crypto_bigint::Zero;

/// One planned execution against a resting maker, at the maker's price.
#[derive(Debug, Clone)]
pub struct Fill {
    pub maker_order_id: OrderId,
    pub maker_user_id: String,
    pub price: Price,
    pub quantity: Quantity,
}

impl Fill {
    /// Materialize the trade for this fill, columns picked by the taker side.
    pub fn to_trade(&self, taker: &Order, executed_at: u64) -> Trade {
        Trade::between(
            taker,
            &self.maker_order_id,
            &self.maker_user_id,
            self.price,
            self.quantity,
            executed_at,
        )
    }
}

/// How the taker ends up once its plan is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakerOutcome {
    /// Fully executed; nothing rests.
    Filled,
    /// Limit order with remaining quantity; the residual rests on its side.
    Rests,
    /// Market order partially executed; the remainder is discarded.
    Discarded,
    /// Market order that crossed nothing at all.
    RejectedNoLiquidity,
}

/// The full result of crossing one taker against the opposite side,
/// computed without touching the book.
///
/// Splitting the match into `plan` and `commit` lets the pipeline durably
/// persist the trades of a taker before any book mutation becomes visible;
/// the only suspension point sits between the two, and the symbol's single
/// writer guarantees nothing else moves the book meanwhile.
#[derive(Debug, Clone)]
pub struct MatchPlan {
    pub fills: Vec<Fill>,
    /// Taker quantity left after all planned fills.
    pub residual: Quantity,
    pub outcome: TakerOutcome,
}

/// Walk the opposite side front-to-back and plan fills at maker prices while
/// the taker still crosses and has quantity left. Read-only.
pub fn plan(taker: &Order, book: &SymbolBook) -> MatchPlan {
    let guard = &epoch::pin();
    let makers = book.get_book(taker.side.opposite());

    let mut remaining = taker.quantity();
    let mut fills = Vec::new();
    let mut entry = makers.front(guard);
    while let Some(e) = entry {
        if bool::from(remaining.is_zero()) {
            break;
        }

        let key = e.key();
        let crosses = match taker.kind {
            OrderKind::Market => true,
            OrderKind::Limit => match taker.side {
                Side::Buy => taker.price >= key.price,
                Side::Sell => taker.price <= key.price,
            },
        };
        if !crosses {
            break;
        }

        let maker = e.value();
        let quantity = remaining.min(maker.quantity());
        fills.push(Fill {
            maker_order_id: maker.order_id.clone(),
            maker_user_id: maker.user_id.clone(),
            price: key.price,
            quantity,
        });
        remaining = remaining.saturating_sub(&quantity);
        entry = e.next();
    }

    let outcome = if bool::from(remaining.is_zero()) {
        TakerOutcome::Filled
    } else if taker.kind == OrderKind::Limit {
        TakerOutcome::Rests
    } else if fills.is_empty() {
        TakerOutcome::RejectedNoLiquidity
    } else {
        TakerOutcome::Discarded
    };

    MatchPlan {
        fills,
        residual: remaining,
        outcome,
    }
}

/// Apply a plan: consume the planned makers from the head of the opposite
/// side, update the taker's quantities and status, and rest the limit
/// residual on the taker's own side.
///
/// Every planned maker must still be at the head when its fill lands; the
/// plan walked the book front-to-back and nothing else writes this symbol,
/// so a mismatch is a programming error, not a race.
pub fn commit(taker: &Order, plan: &MatchPlan, book: &SymbolBook) -> Result<(), BookError> {
    let makers_side = taker.side.opposite();
    for fill in &plan.fills {
        let (head_id, _, _) = book.peek_best(makers_side).ok_or(BookError::HeadMissing)?;
        if head_id != fill.maker_order_id {
            return Err(BookError::HeadMismatch);
        }
        let consumed = book.decrement_head(makers_side, fill.quantity)?;
        let remaining = taker.quantity_fill(fill.quantity);
        debug_assert!(
            consumed == HeadFill::Removed || bool::from(remaining.is_zero()),
            "a maker may only survive the last fill of a plan"
        );
    }

    match plan.outcome {
        TakerOutcome::Filled => {
            taker.update_status(OrderStatus::Filled);
        }
        TakerOutcome::Rests => {
            // The resting copy keeps its fill history; remaining quantity is
            // what matters to matching from here on.
            book.insert(taker.clone())?;
            taker.update_status(OrderStatus::Resting);
        }
        TakerOutcome::Discarded => {
            taker.update_status(OrderStatus::PartiallyFilled);
        }
        TakerOutcome::RejectedNoLiquidity => {
            taker.update_status(OrderStatus::Rejected);
            taker.update_reject_reason(RejectReason::NoLiquidity);
        }
    }

    debug_assert_eq!(taker.quantity(), plan.residual);
    Ok(())
}
