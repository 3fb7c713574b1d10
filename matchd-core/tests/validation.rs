use matchd_core::prelude::*;
use matchd_core::wire::OrderRecord;

fn record(body: &str) -> OrderRecord {
    serde_json::from_str(body).unwrap()
}

#[test]
fn test_validate_canonicalizes_fields() {
    let order = validate(record(
        r#"{"order_id":"o-1","user_id":"u-9","symbol":" btc-usd ","side":"BUY",
           "order_type":"Limit","quantity":"1.5","price":30000.25}"#,
    ))
    .unwrap();

    assert_eq!(order.order_id, "o-1");
    assert_eq!(order.user_id, "u-9");
    assert_eq!(order.symbol, "BTC-USD");
    assert_eq!(order.side, Side::Buy);
    assert_eq!(order.kind, OrderKind::Limit);
    assert_eq!(order.quantity(), parse_amount("1.5").unwrap());
    assert_eq!(order.price, parse_amount("30000.25").unwrap());
    assert_eq!(order.status(), OrderStatus::New);
}

#[test]
fn test_validate_accepts_numbers_and_numeric_strings() {
    let by_number = validate(record(
        r#"{"symbol":"ETH-USD","side":"sell","order_type":"limit","quantity":2,"price":1800}"#,
    ))
    .unwrap();
    let by_string = validate(record(
        r#"{"symbol":"ETH-USD","side":"sell","order_type":"limit","quantity":"2","price":"1800"}"#,
    ))
    .unwrap();

    assert_eq!(by_number.quantity(), by_string.quantity());
    assert_eq!(by_number.price, by_string.price);
}

#[test]
fn test_validate_generates_missing_identities() {
    let order = validate(record(
        r#"{"symbol":"BTC-USD","side":"buy","order_type":"market","quantity":"1"}"#,
    ))
    .unwrap();

    assert!(order.order_id.starts_with("ORD-"), "generated id: {}", order.order_id);
    assert_eq!(order.user_id, "anonymous");
}

#[test]
fn test_validate_requires_fields_in_order() {
    let err = validate(record(r#"{"side":"buy"}"#)).unwrap_err();
    assert_eq!(err, ValidationError::MissingField("symbol"));

    let err = validate(record(r#"{"symbol":"BTC-USD","side":"buy"}"#)).unwrap_err();
    assert_eq!(err, ValidationError::MissingField("order_type"));

    let err = validate(record(
        r#"{"symbol":"BTC-USD","side":"buy","order_type":"limit"}"#,
    ))
    .unwrap_err();
    assert_eq!(err, ValidationError::MissingField("quantity"));

    // Price is required iff the order is a limit order.
    let err = validate(record(
        r#"{"symbol":"BTC-USD","side":"buy","order_type":"limit","quantity":"1"}"#,
    ))
    .unwrap_err();
    assert_eq!(err, ValidationError::MissingField("price"));
}

#[test]
fn test_validate_market_order_ignores_price() {
    let order = validate(record(
        r#"{"symbol":"BTC-USD","side":"sell","order_type":"market","quantity":"1","price":"100"}"#,
    ))
    .unwrap();
    assert_eq!(order.kind, OrderKind::Market);
    assert_eq!(order.price, Price::ZERO);
}

#[test]
fn test_validate_rejects_bad_enums() {
    let err = validate(record(
        r#"{"symbol":"BTC-USD","side":"hold","order_type":"limit","quantity":"1","price":"1"}"#,
    ))
    .unwrap_err();
    assert!(matches!(err, ValidationError::InvalidSide(_)));

    let err = validate(record(
        r#"{"symbol":"BTC-USD","side":"buy","order_type":"stop","quantity":"1","price":"1"}"#,
    ))
    .unwrap_err();
    assert!(matches!(err, ValidationError::InvalidKind(_)));
}

#[test]
fn test_validate_rejects_bad_amounts() {
    for quantity in ["0", "-1", "NaN", "Infinity", "abc", "1e3"] {
        let body = format!(
            r#"{{"symbol":"BTC-USD","side":"buy","order_type":"limit","quantity":"{quantity}","price":"1"}}"#
        );
        let err = validate(record(&body)).unwrap_err();
        assert!(
            matches!(err, ValidationError::InvalidQuantity(_)),
            "quantity {quantity:?} gave {err:?}"
        );
    }

    let err = validate(record(
        r#"{"symbol":"BTC-USD","side":"buy","order_type":"limit","quantity":"1","price":"0"}"#,
    ))
    .unwrap_err();
    assert!(matches!(err, ValidationError::InvalidPrice(_)));
}

#[test]
fn test_validate_rejects_blank_symbol() {
    let err = validate(record(
        r#"{"symbol":"   ","side":"buy","order_type":"market","quantity":"1"}"#,
    ))
    .unwrap_err();
    assert_eq!(err, ValidationError::EmptySymbol);
}
