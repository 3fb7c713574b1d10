use crate::engine::error::BookError;
use crate::engine::types::{BookKey, Order, OrderId, OrderStatus, Price, Quantity, Side};
use crossbeam::epoch;
use crossbeam::epoch::default_collector;
use crossbeam_skiplist::SkipList;
use crypto_bigint::Zero;
use flurry::HashMap;

/// Result of decrementing the head of a book side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadFill {
    /// The head still has remaining quantity.
    Remaining,
    /// The head was fully consumed and removed from the book.
    Removed,
}

/// SymbolBook holds both sides of one symbol's order book.
///
/// Two cooperating structures per side: a skip list ordered by `BookKey`
/// (price, then acceptance stamp; see the `BookKey` ordering) and a shared
/// `order_id → BookKey` index for O(log n) access by id. Every mutation
/// updates both; the book has exactly one writer (its shard worker), so the
/// pair is always observed consistent.
pub struct SymbolBook {
    symbol: String,
    // By price and then by acceptance stamp
    buy_orders: SkipList<BookKey, Order>,
    // By price and then by acceptance stamp
    sell_orders: SkipList<BookKey, Order>,
    // By order id for fast access order
    order_index: HashMap<OrderId, BookKey>,
}

impl SymbolBook {
    /// Creates an empty book for one symbol.
    pub fn new(symbol: impl Into<String>) -> Self {
        let collector = default_collector().clone();
        let buy_orders = SkipList::new(collector.clone());
        let sell_orders = SkipList::new(collector.clone());
        Self {
            symbol: symbol.into(),
            buy_orders,
            sell_orders,
            order_index: HashMap::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Get the skip list for a side. The matcher walks this directly.
    pub fn get_book(&self, side: Side) -> &SkipList<BookKey, Order> {
        match side {
            Side::Buy => &self.buy_orders,
            Side::Sell => &self.sell_orders,
        }
    }

    /// Rest an order on its side of the book.
    ///
    /// The order must carry positive remaining quantity and its acceptance
    /// stamp; stamps are strictly increasing per symbol, so keys never collide.
    pub fn insert(&self, order: Order) -> Result<(), BookError> {
        if bool::from(order.quantity().is_zero()) {
            return Err(BookError::ZeroQuantity);
        }

        let guard = &epoch::pin();
        let key = order.book_key();
        let order_id = order.order_id.clone();
        order.update_status(OrderStatus::Resting);
        self.get_book(key.side).get_or_insert(key, order, guard);
        self.order_index.pin().insert(order_id, key);
        Ok(())
    }

    /// The best resting order of a side, as an owned snapshot.
    /// Returns `None` on an empty side.
    pub fn peek_best(&self, side: Side) -> Option<(OrderId, Price, Quantity)> {
        let guard = &epoch::pin();
        self.get_book(side).front(guard).map(|entry| {
            let order = entry.value();
            (order.order_id.clone(), order.price, order.quantity())
        })
    }

    /// Best price of a side, `None` when the side is empty.
    pub fn best_price(&self, side: Side) -> Option<Price> {
        let guard = &epoch::pin();
        self.get_book(side)
            .front(guard)
            .map(|entry| entry.key().price)
    }

    /// Number of resting orders on a side.
    pub fn depth(&self, side: Side) -> usize {
        self.get_book(side).len()
    }

    /// Subtract `delta` from the head order's remaining quantity; remove the
    /// head when it reaches zero. Asking for more than the head holds is a
    /// caller bug and reported as `HeadOverdraw`.
    pub fn decrement_head(&self, side: Side, delta: Quantity) -> Result<HeadFill, BookError> {
        let guard = &epoch::pin();
        let entry = self.get_book(side).front(guard).ok_or(BookError::HeadMissing)?;
        let order = entry.value();
        if delta > order.quantity() {
            return Err(BookError::HeadOverdraw);
        }

        let remaining = order.quantity_fill(delta);
        if bool::from(remaining.is_zero()) {
            order.update_status(OrderStatus::Filled);
            let order_id = order.order_id.clone();
            entry.remove();
            self.order_index.pin().remove(&order_id);
            Ok(HeadFill::Removed)
        } else {
            order.update_status(OrderStatus::PartiallyFilled);
            Ok(HeadFill::Remaining)
        }
    }

    /// Remove an order by id, through the id index.
    pub fn remove(&self, order_id: &str) -> Result<Order, BookError> {
        let guard = &epoch::pin();
        let order_index = self.order_index.pin();
        let key = match order_index.get(order_id) {
            Some(key) => *key,
            None => return Err(BookError::UnknownOrder),
        };

        let entry = match self.get_book(key.side).get(&key, guard) {
            Some(entry) => entry,
            None => return Err(BookError::UnknownOrder),
        };

        let removed = entry.value().clone();
        entry.remove();
        order_index.remove(order_id);
        Ok(removed)
    }

    /// Look up a resting order by id, as an owned snapshot.
    pub fn lookup(&self, order_id: &str) -> Option<Order> {
        let guard = &epoch::pin();
        let order_index = self.order_index.pin();
        let key = *order_index.get(order_id)?;
        self.get_book(key.side)
            .get(&key, guard)
            .map(|entry| entry.value().clone())
    }
}
