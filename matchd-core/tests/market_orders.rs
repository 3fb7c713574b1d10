mod common;

use crate::common::*;
use matchd_core::prelude::*;

#[test]
fn test_market_order_on_empty_book_is_rejected() {
    let book = SymbolBook::new("BTC-USD");

    let buy = make_market_order("m1", Side::Buy, "1.0", 1);
    let match_plan = plan(&buy, &book);
    assert_eq!(match_plan.outcome, TakerOutcome::RejectedNoLiquidity);

    let trades = run_order(&book, &buy);
    assert!(trades.is_empty());
    assert_eq!(buy.status(), OrderStatus::Rejected);
    assert_eq!(buy.reject_reason(), Some(RejectReason::NoLiquidity));
    assert_eq!(book.depth(Side::Buy), 0, "Market orders never rest");
}

#[test]
fn test_market_order_full_fill() {
    let book = SymbolBook::new("BTC-USD");
    run_order(&book, &make_limit_order("s1", Side::Sell, "100", "1.0", 1));

    let buy = make_market_order("m1", Side::Buy, "1.0", 2);
    let trades = run_order(&book, &buy);

    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].price, amt("100"));
    assert_eq!(buy.status(), OrderStatus::Filled);
    assert_eq!(book.depth(Side::Sell), 0);
}

#[test]
fn test_market_order_partial_fill_discards_remainder() {
    let book = SymbolBook::new("BTC-USD");
    run_order(&book, &make_limit_order("s1", Side::Sell, "100", "0.5", 1));

    let buy = make_market_order("m1", Side::Buy, "1.0", 2);
    let trades = run_order(&book, &buy);

    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].quantity, amt("0.5"));
    assert_eq!(buy.status(), OrderStatus::PartiallyFilled);
    assert_eq!(
        book.depth(Side::Buy),
        0,
        "The unfilled market remainder must be discarded"
    );
    assert_eq!(book.depth(Side::Sell), 0);
}

#[test]
fn test_market_order_walks_price_levels() {
    let book = SymbolBook::new("BTC-USD");
    run_order(&book, &make_limit_order("s1", Side::Sell, "100", "0.5", 1));
    run_order(&book, &make_limit_order("s2", Side::Sell, "105", "1.0", 2));

    let buy = make_market_order("m1", Side::Buy, "1.0", 3);
    let trades = run_order(&book, &buy);

    assert_eq!(trades.len(), 2);
    assert_eq!((trades[0].price, trades[0].quantity), (amt("100"), amt("0.5")));
    assert_eq!((trades[1].price, trades[1].quantity), (amt("105"), amt("0.5")));
    assert_eq!(buy.status(), OrderStatus::Filled);

    let remaining = get_book_state(&book, Side::Sell);
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].1, amt("0.5"));
}

#[test]
fn test_market_sell_crosses_best_buy_first() {
    let book = SymbolBook::new("BTC-USD");
    run_order(&book, &make_limit_order("b1", Side::Buy, "99", "1.0", 1));
    run_order(&book, &make_limit_order("b2", Side::Buy, "101", "1.0", 2));

    let sell = make_market_order("m1", Side::Sell, "1.0", 3);
    let trades = run_order(&book, &sell);

    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].price, amt("101"), "Best (highest) buy fills first");
    assert_eq!(trades[0].buy_order_id, "b2");
    assert_eq!(trades[0].sell_order_id, "m1");
}
