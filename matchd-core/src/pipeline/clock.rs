use std::time::{SystemTime, UNIX_EPOCH};

/// Per-symbol acceptance clock.
///
/// Stamps are wall-clock milliseconds scaled by 1000 with a same-millisecond
/// counter folded in, clamped strictly increasing. Time priority uses this
/// stamp and nothing else; client-supplied times never reach the book.
#[derive(Debug, Default)]
pub struct AcceptanceClock {
    last: u64,
}

impl AcceptanceClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next acceptance stamp; strictly greater than every earlier one.
    pub fn stamp(&mut self) -> u64 {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.last = (now_ms * 1000).max(self.last + 1);
        self.last
    }
}
