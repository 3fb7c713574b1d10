use crate::engine::amount::notional;
use crypto_bigint::U256;
use std::cell::UnsafeCell;

/// OrderId is an opaque, venue-unique identifier assigned at the ingest edge.
pub type OrderId = String;

/// Price is the type used for prices, in fixed-point ticks (see `amount`).
pub type Price = U256;

/// Quantity is the type used for quantities, in fixed-point ticks.
pub type Quantity = U256;

/// Priority is the acceptance stamp the order book uses for time priority.
/// Stamps are assigned by the dispatch pipeline, strictly increasing per symbol.
pub type Priority = u64;

/// Side indicates the direction of the order.
#[derive(PartialEq, Eq, Default, Copy, Clone, Debug, Hash)]
pub enum Side {
    /// Buy means the user wants to acquire the asset, typically matching against sell orders.
    #[default]
    Buy,
    /// Sell means the user wants to sell the asset, typically matching against buy orders.
    Sell,
}

impl Side {
    /// The side an incoming order takes liquidity from.
    #[inline(always)]
    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// OrderKind determines how the order will be executed.
#[derive(PartialEq, Eq, Default, Copy, Clone, Debug)]
pub enum OrderKind {
    /// Limit orders specify a maximum (for buy) or minimum (for sell) price and can rest on the book.
    #[default]
    Limit,
    /// Market orders do not specify a price and must be filled immediately against the best available prices.
    Market,
}

/// OrderStatus represents the current status of an order during its lifecycle.
///
/// Transitions are monotone: `New` moves to one of the others, and a resting
/// order only ever advances `Resting → PartiallyFilled → Filled`.
#[derive(PartialEq, Eq, Default, Clone, Copy, Debug)]
pub enum OrderStatus {
    /// The order has been accepted but not yet matched.
    #[default]
    New,
    /// The order is resting on the book with its full remaining quantity.
    Resting,
    /// The order was partially filled but still has remaining quantity.
    PartiallyFilled,
    /// The order was fully filled.
    Filled,
    /// The order was rejected (see `RejectReason`).
    Rejected,
}

/// RejectReason indicates why the engine rejected an order.
#[derive(PartialEq, Eq, Default, Clone, Copy, Debug)]
pub enum RejectReason {
    /// A market order found no crossable liquidity at all.
    #[default]
    NoLiquidity,
}

/// BookKey is a composite key for identifying an order's position in the book.
/// It combines the order's price, priority (acceptance stamp), and side.
///
/// The ordering semantics are:
/// - For Buy orders: higher prices are prioritized (sorted descending),
///   and for the same price, earlier orders (lower priority values) are prioritized.
/// - For Sell orders: lower prices are prioritized (sorted ascending),
///   and for the same price, earlier orders (lower priority values) are prioritized.
///
/// This allows a single skip list to sort all orders per side correctly,
/// without needing a secondary level of price grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookKey {
    pub price: Price,
    pub priority: Priority,
    pub side: Side,
}

impl Ord for BookKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.side {
            Side::Buy => {
                // Higher price first for buys, then earlier priority
                self.price
                    .cmp(&other.price)
                    .reverse()
                    .then(self.priority.cmp(&other.priority))
            }
            Side::Sell => {
                // Lower price first for sells, then earlier priority
                self.price
                    .cmp(&other.price)
                    .then(self.priority.cmp(&other.priority))
            }
        }
    }
}

impl PartialOrd for BookKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// `Order` represents a single order worked by the engine.
///
/// Certain fields (quantity, filled_quantity, status, reject_reason) are
/// wrapped with `UnsafeCell` to allow safe internal mutability while the order
/// rests in the book.
///
/// SAFETY: each symbol's book has exactly one writer (its shard worker), and
/// all unsafe mutations happen on that worker, so there are no data races.
#[derive(Debug)]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: String,
    pub symbol: String,
    pub side: Side,
    pub kind: OrderKind,
    /// Limit price in ticks; zero for market orders.
    pub price: Price,
    /// Remaining quantity in ticks. Decreases as the order fills.
    pub quantity: UnsafeCell<Quantity>,
    pub filled_quantity: UnsafeCell<Quantity>,
    pub status: UnsafeCell<OrderStatus>,
    pub reject_reason: UnsafeCell<Option<RejectReason>>,
    /// Acceptance stamp assigned by the dispatch pipeline; the time-priority key.
    pub accepted_at: Priority,
}

impl Clone for Order {
    fn clone(&self) -> Self {
        Self {
            order_id: self.order_id.clone(),
            user_id: self.user_id.clone(),
            symbol: self.symbol.clone(),
            side: self.side,
            kind: self.kind,
            price: self.price,
            quantity: UnsafeCell::new(self.quantity()),
            filled_quantity: UnsafeCell::new(self.filled_quantity()),
            status: UnsafeCell::new(self.status()),
            reject_reason: UnsafeCell::new(self.reject_reason()),
            accepted_at: self.accepted_at,
        }
    }
}

unsafe impl Sync for Order {}

impl Order {
    /// Build an accepted order. The acceptance stamp starts at zero and is
    /// assigned by the pipeline before the order reaches a book.
    pub fn new(
        order_id: OrderId,
        user_id: String,
        symbol: String,
        side: Side,
        kind: OrderKind,
        price: Price,
        quantity: Quantity,
    ) -> Self {
        Order {
            order_id,
            user_id,
            symbol,
            side,
            kind,
            price,
            quantity: UnsafeCell::new(quantity),
            filled_quantity: UnsafeCell::new(U256::ZERO),
            status: UnsafeCell::new(OrderStatus::New),
            reject_reason: UnsafeCell::new(None),
            accepted_at: 0,
        }
    }

    /// Get the order's status.
    #[inline(always)]
    pub fn status(&self) -> OrderStatus {
        unsafe { *self.status.get() }
    }

    /// Check the order status is filled.
    #[inline(always)]
    pub fn is_filled(&self) -> bool {
        self.status() == OrderStatus::Filled
    }

    /// Get the remaining quantity of the order.
    #[inline(always)]
    pub fn quantity(&self) -> Quantity {
        unsafe { *self.quantity.get() }
    }

    /// Get the filled quantity of the order.
    #[inline(always)]
    pub fn filled_quantity(&self) -> Quantity {
        unsafe { *self.filled_quantity.get() }
    }

    /// Quantity the order was accepted with: remaining plus filled.
    #[inline(always)]
    pub fn original_quantity(&self) -> Quantity {
        self.quantity().wrapping_add(&self.filled_quantity())
    }

    /// Get the reject reason, if the order was rejected.
    #[inline(always)]
    pub fn reject_reason(&self) -> Option<RejectReason> {
        unsafe { *self.reject_reason.get() }
    }

    /// Get the book key for the order.
    #[inline(always)]
    pub fn book_key(&self) -> BookKey {
        BookKey {
            price: self.price,
            priority: self.accepted_at,
            side: self.side,
        }
    }

    /// SAFETY:
    /// Only the owning shard worker modifies quantity and filled_quantity,
    /// ensuring no data race even though accessed through shared reference.
    #[inline(always)]
    pub(crate) fn quantity_fill(&self, traded: Quantity) -> Quantity {
        unsafe {
            *self.quantity.get() -= traded;
            *self.filled_quantity.get() += traded;
            *self.quantity.get()
        }
    }

    /// SAFETY:
    /// Only the owning shard worker modifies order status through shared
    /// reference, ensuring no concurrent modification.
    #[inline(always)]
    pub(crate) fn update_status(&self, status: OrderStatus) {
        unsafe {
            *self.status.get() = status;
        }
    }

    /// SAFETY:
    /// Only the owning shard worker modifies reject_reason, ensuring safe
    /// access under shared reference.
    #[inline(always)]
    pub(crate) fn update_reject_reason(&self, reason: RejectReason) {
        unsafe {
            *self.reject_reason.get() = Some(reason);
        }
    }
}

/// Trade represents one execution between a taker and a resting maker.
///
/// The price is always the maker's price, so any price improvement goes to
/// the taker. `total_value` is `price * quantity` at the amount scale.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trade {
    pub symbol: String,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub buyer_id: String,
    pub seller_id: String,
    pub price: Price,
    pub quantity: Quantity,
    pub total_value: U256,
    /// Execution wall-clock time in milliseconds.
    pub executed_at: u64,
}

impl Trade {
    /// Assemble a trade from the taker and the maker fields of one fill.
    /// The buy/sell columns are picked by the taker's side.
    pub(crate) fn between(
        taker: &Order,
        maker_order_id: &OrderId,
        maker_user_id: &str,
        price: Price,
        quantity: Quantity,
        executed_at: u64,
    ) -> Trade {
        let (buy_order_id, buyer_id, sell_order_id, seller_id) = match taker.side {
            Side::Buy => (
                taker.order_id.clone(),
                taker.user_id.clone(),
                maker_order_id.clone(),
                maker_user_id.to_string(),
            ),
            Side::Sell => (
                maker_order_id.clone(),
                maker_user_id.to_string(),
                taker.order_id.clone(),
                taker.user_id.clone(),
            ),
        };
        Trade {
            symbol: taker.symbol.clone(),
            buy_order_id,
            sell_order_id,
            buyer_id,
            seller_id,
            price,
            quantity,
            total_value: notional(price, quantity),
            executed_at,
        }
    }
}
