use crate::engine::amount::{parse_amount, AmountParseError};
use crate::engine::types::{Order, OrderKind, Side};
use crate::wire::{new_order_id, OrderRecord};
use crypto_bigint::U256;
use std::fmt;

/// ValidationError represents possible failures when turning an inbound
/// record into an accepted order. Each check has its own variant so the
/// reject carries a precise reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is absent.
    MissingField(&'static str),
    /// `side` is not buy or sell.
    InvalidSide(String),
    /// `order_type` is not limit or market.
    InvalidKind(String),
    /// `quantity` is not a positive finite decimal.
    InvalidQuantity(AmountParseError),
    /// `price` is not a positive finite decimal.
    InvalidPrice(AmountParseError),
    /// `symbol` is empty after trimming.
    EmptySymbol,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingField(field) => {
                write!(f, "missing required field: {field}")
            }
            ValidationError::InvalidSide(side) => write!(f, "invalid side: {side:?}"),
            ValidationError::InvalidKind(kind) => write!(f, "invalid order type: {kind:?}"),
            ValidationError::InvalidQuantity(err) => write!(f, "invalid quantity: {err}"),
            ValidationError::InvalidPrice(err) => write!(f, "invalid price: {err}"),
            ValidationError::EmptySymbol => write!(f, "symbol is empty"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validates an inbound record and canonicalizes it into an `Order`.
///
/// Checks run in a fixed sequence: field presence, side, order type,
/// quantity, price (limit orders only), symbol. Side and order type are
/// accepted case-insensitively; the symbol is trimmed and upper-cased.
/// A missing order id is generated here, a missing user id passes through
/// as `anonymous`.
pub fn validate(record: OrderRecord) -> Result<Order, ValidationError> {
    let symbol = record
        .symbol
        .ok_or(ValidationError::MissingField("symbol"))?;
    let side_text = record.side.ok_or(ValidationError::MissingField("side"))?;
    let kind_text = record
        .order_type
        .ok_or(ValidationError::MissingField("order_type"))?;
    let quantity_text = record
        .quantity
        .ok_or(ValidationError::MissingField("quantity"))?;

    let side = match side_text.trim().to_ascii_lowercase().as_str() {
        "buy" => Side::Buy,
        "sell" => Side::Sell,
        _ => return Err(ValidationError::InvalidSide(side_text)),
    };
    let kind = match kind_text.trim().to_ascii_lowercase().as_str() {
        "limit" => OrderKind::Limit,
        "market" => OrderKind::Market,
        _ => return Err(ValidationError::InvalidKind(kind_text)),
    };

    let quantity =
        parse_amount(&quantity_text.as_text()).map_err(ValidationError::InvalidQuantity)?;

    // Price is required iff the order is a limit order. A stray price on a
    // market order carries no meaning and is dropped.
    let price = match kind {
        OrderKind::Limit => {
            let price_text = record.price.ok_or(ValidationError::MissingField("price"))?;
            parse_amount(&price_text.as_text()).map_err(ValidationError::InvalidPrice)?
        }
        OrderKind::Market => U256::ZERO,
    };

    let symbol = symbol.trim().to_ascii_uppercase();
    if symbol.is_empty() {
        return Err(ValidationError::EmptySymbol);
    }

    let order_id = record
        .order_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(new_order_id);
    let user_id = record
        .user_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| "anonymous".to_string());

    Ok(Order::new(order_id, user_id, symbol, side, kind, price, quantity))
}
