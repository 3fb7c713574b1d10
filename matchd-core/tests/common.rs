use crossbeam::epoch;
use matchd_core::prelude::*;

/// Parse a decimal into ticks, panicking on bad test input.
pub fn amt(text: &str) -> Quantity {
    parse_amount(text).unwrap()
}

/// Quickly generate a simple limit order for testing
pub fn make_limit_order(id: &str, side: Side, price: &str, qty: &str, stamp: u64) -> Order {
    let mut order = Order::new(
        id.to_string(),
        format!("user-{id}"),
        "BTC-USD".to_string(),
        side,
        OrderKind::Limit,
        amt(price),
        amt(qty),
    );
    order.accepted_at = stamp;
    order
}

/// Quickly generate a market order for testing
pub fn make_market_order(id: &str, side: Side, qty: &str, stamp: u64) -> Order {
    let mut order = Order::new(
        id.to_string(),
        format!("user-{id}"),
        "BTC-USD".to_string(),
        side,
        OrderKind::Market,
        Price::ZERO,
        amt(qty),
    );
    order.accepted_at = stamp;
    order
}

/// Plan and commit one taker against the book, returning its trades.
pub fn run_order(book: &SymbolBook, taker: &Order) -> Vec<Trade> {
    let match_plan = plan(taker, book);
    let trades: Vec<Trade> = match_plan
        .fills
        .iter()
        .map(|fill| fill.to_trade(taker, 1_000))
        .collect();
    commit(taker, &match_plan, book).unwrap();
    trades
}

/// Get the current state of a side of the book
pub fn get_book_state(book: &SymbolBook, side: Side) -> Vec<(OrderId, Quantity)> {
    let guard = &epoch::pin();
    book.get_book(side)
        .iter(guard)
        .map(|entry| (entry.value().order_id.clone(), entry.value().quantity()))
        .collect()
}

#[test]
fn test_book_iteration_survives_middle_removal() {
    let book = SymbolBook::new("BTC-USD");
    book.insert(make_limit_order("s1", Side::Sell, "100", "1", 1)).unwrap();
    book.insert(make_limit_order("s2", Side::Sell, "101", "1", 2)).unwrap();
    book.insert(make_limit_order("s3", Side::Sell, "102", "1", 3)).unwrap();

    book.remove("s2").unwrap();

    let remaining = get_book_state(&book, Side::Sell);
    assert_eq!(remaining.len(), 2);
    assert_eq!(remaining[0].0, "s1");
    assert_eq!(remaining[1].0, "s3");
}
