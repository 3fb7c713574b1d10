use std::fmt;

/// Represents violations of the order book contract.
///
/// Every variant is a programming error on the caller's side; the dispatch
/// layer treats one of these surfacing as fatal for the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookError {
    /// An order with zero remaining quantity was offered for insertion.
    ZeroQuantity,
    /// A head operation ran against an empty side.
    HeadMissing,
    /// A head decrement asked for more than the head's remaining quantity.
    HeadOverdraw,
    /// The head order was not the one the caller planned against.
    HeadMismatch,
    /// The order id is not present in the book.
    UnknownOrder,
}

impl fmt::Display for BookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookError::ZeroQuantity => write!(f, "resting orders must have positive quantity"),
            BookError::HeadMissing => write!(f, "head operation on an empty book side"),
            BookError::HeadOverdraw => write!(f, "head decrement exceeds remaining quantity"),
            BookError::HeadMismatch => write!(f, "book head diverged from the planned maker"),
            BookError::UnknownOrder => write!(f, "order id not found in the book"),
        }
    }
}

impl std::error::Error for BookError {}
