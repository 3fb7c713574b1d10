//! Wire records for the inbound order stream and the outbound trade stream.
//!
//! Decimal fields travel as strings on the way out so transports that coerce
//! numerics cannot damage precision; on the way in both numbers and numeric
//! strings are accepted.

use crate::engine::types::Trade;
use crate::engine::amount::format_amount;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use uuid::Uuid;

/// A decimal that may arrive as a JSON number or as a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(serde_json::Number),
    Text(String),
}

impl NumberOrText {
    /// The literal decimal text, whichever way it arrived.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            NumberOrText::Number(n) => Cow::Owned(n.to_string()),
            NumberOrText::Text(t) => Cow::Borrowed(t),
        }
    }
}

/// Inbound order record, one per stream message.
///
/// Every field is optional at the serde layer: a record that parses as JSON
/// but misses fields is a *validation* failure (rejected, acked), not a
/// decode failure (dead-lettered).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderRecord {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub order_type: Option<String>,
    #[serde(default)]
    pub quantity: Option<NumberOrText>,
    #[serde(default)]
    pub price: Option<NumberOrText>,
}

/// Outbound trade record, published keyed by symbol and persisted durably.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub trade_id: String,
    pub symbol: String,
    pub buy_order_id: String,
    pub sell_order_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub price: String,
    pub quantity: String,
    pub total_value: String,
    /// Execution time, unix milliseconds.
    pub timestamp: u64,
}

impl TradeRecord {
    /// Wrap an engine trade for the wire, assigning its venue trade id.
    pub fn from_trade(trade: &Trade) -> TradeRecord {
        TradeRecord {
            trade_id: new_trade_id(),
            symbol: trade.symbol.clone(),
            buy_order_id: trade.buy_order_id.clone(),
            sell_order_id: trade.sell_order_id.clone(),
            buyer_id: trade.buyer_id.clone(),
            seller_id: trade.seller_id.clone(),
            price: format_amount(trade.price),
            quantity: format_amount(trade.quantity),
            total_value: format_amount(trade.total_value),
            timestamp: trade.executed_at,
        }
    }
}

fn stamped_id(prefix: &str) -> String {
    let stamp = Utc::now().format("%Y%m%d%H%M%S");
    let unique = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{stamp}-{}", &unique[..8])
}

/// Venue order id, used when a record arrives without one.
pub fn new_order_id() -> String {
    stamped_id("ORD")
}

/// Venue trade id, assigned when a trade is put on the wire.
pub fn new_trade_id() -> String {
    stamped_id("TRD")
}
