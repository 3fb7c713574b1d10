use crate::engine::amount::format_amount;
use crate::engine::types::Price;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Last execution price per symbol, kept for quote streaming.
///
/// Updated by shard workers after each persisted trade; read from anywhere.
#[derive(Default)]
pub struct LastPriceStore {
    prices: RwLock<HashMap<String, Price>>,
}

impl LastPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, symbol: &str, price: Price) {
        self.prices.write().insert(symbol.to_string(), price);
    }

    pub fn last(&self, symbol: &str) -> Option<Price> {
        self.prices.read().get(symbol).copied()
    }

    /// All known quotes as decimal strings, for diagnostics and streaming.
    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.prices
            .read()
            .iter()
            .map(|(symbol, price)| (symbol.clone(), format_amount(*price)))
            .collect()
    }
}
