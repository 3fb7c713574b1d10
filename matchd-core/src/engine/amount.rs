//! Fixed-point decimal boundary.
//!
//! Prices and quantities are carried as `U256` tick counts at a scale of
//! 1e8 (8 decimal places). All book and matcher comparisons are exact integer
//! comparisons; decimal strings exist only at the wire boundary.

use crypto_bigint::{Limb, NonZero, Reciprocal, Zero, U256};
use std::fmt;

/// Number of decimal places carried by an amount.
pub const AMOUNT_DECIMALS: usize = 8;

/// Ticks per whole unit.
pub const AMOUNT_SCALE: u64 = 100_000_000;

/// Upper bound on integer digits accepted at the boundary. Keeps the
/// 1e16-scaled product of any two accepted amounts well inside `U256`.
const MAX_INTEGER_DIGITS: usize = 15;

/// a constant used for rescaling products back to tick scale.
const RECIPROCAL_SCALE: Reciprocal =
    Reciprocal::new(NonZero::<Limb>::new_unwrap(Limb(AMOUNT_SCALE)));

/// 1e18, the largest power of ten inside a limb; radix for printing.
const RECIPROCAL_PRINT: Reciprocal =
    Reciprocal::new(NonZero::<Limb>::new_unwrap(Limb(1_000_000_000_000_000_000)));

/// AmountParseError represents possible failures when parsing a decimal
/// amount at the wire boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountParseError {
    /// The input was empty after trimming.
    Empty,
    /// The input contained something other than digits and one decimal point.
    /// Signs, exponents, NaN and infinity spellings all land here.
    InvalidCharacter,
    /// More fractional digits than the venue's tick size carries.
    TooManyDecimals,
    /// More integer digits than the venue accepts.
    TooLarge,
    /// The amount parsed to zero; amounts must be strictly positive.
    NotPositive,
}

impl fmt::Display for AmountParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountParseError::Empty => write!(f, "amount is empty"),
            AmountParseError::InvalidCharacter => write!(f, "amount is not a plain decimal"),
            AmountParseError::TooManyDecimals => {
                write!(f, "amount has more than {AMOUNT_DECIMALS} decimal places")
            }
            AmountParseError::TooLarge => {
                write!(f, "amount has more than {MAX_INTEGER_DIGITS} integer digits")
            }
            AmountParseError::NotPositive => write!(f, "amount must be greater than zero"),
        }
    }
}

impl std::error::Error for AmountParseError {}

/// Parse a decimal string into ticks.
///
/// Accepts plain decimals only: optional fractional part, no sign, no
/// exponent. This deliberately rejects `NaN`, `inf`, and negative inputs.
pub fn parse_amount(text: &str) -> Result<U256, AmountParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AmountParseError::Empty);
    }

    let (int_part, frac_part) = match text.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (text, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(AmountParseError::InvalidCharacter);
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(AmountParseError::InvalidCharacter);
    }
    if frac_part.len() > AMOUNT_DECIMALS {
        return Err(AmountParseError::TooManyDecimals);
    }

    let int_digits = int_part.trim_start_matches('0');
    if int_digits.len() > MAX_INTEGER_DIGITS {
        return Err(AmountParseError::TooLarge);
    }
    let int: u128 = if int_digits.is_empty() {
        0
    } else {
        int_digits.parse().map_err(|_| AmountParseError::TooLarge)?
    };

    let mut frac: u128 = 0;
    if !frac_part.is_empty() {
        // Right-pad to tick precision: "5" after the point is 0.50000000.
        frac = frac_part
            .parse()
            .map_err(|_| AmountParseError::InvalidCharacter)?;
        for _ in frac_part.len()..AMOUNT_DECIMALS {
            frac *= 10;
        }
    }

    let ticks = int * AMOUNT_SCALE as u128 + frac;
    if ticks == 0 {
        return Err(AmountParseError::NotPositive);
    }
    Ok(U256::from_u128(ticks))
}

/// Format ticks as an exact decimal string, trailing zeros trimmed.
pub fn format_amount(value: U256) -> String {
    // Collect base-1e18 chunks, least significant first.
    let mut chunks: Vec<u64> = Vec::new();
    let mut rest = value;
    loop {
        let (quotient, remainder) = rest.div_rem_limb_with_reciprocal(&RECIPROCAL_PRINT);
        chunks.push(remainder.0);
        if bool::from(quotient.is_zero()) {
            break;
        }
        rest = quotient;
    }

    let mut digits = String::new();
    for (i, chunk) in chunks.iter().rev().enumerate() {
        if i == 0 {
            digits.push_str(&chunk.to_string());
        } else {
            digits.push_str(&format!("{chunk:018}"));
        }
    }

    // Place the decimal point AMOUNT_DECIMALS digits from the right.
    if digits.len() <= AMOUNT_DECIMALS {
        digits = format!("{digits:0>width$}", width = AMOUNT_DECIMALS + 1);
    }
    let split = digits.len() - AMOUNT_DECIMALS;
    let (int_part, frac_part) = digits.split_at(split);
    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{frac_part}")
    }
}

/// Notional value of a fill: `price * quantity` rescaled back to ticks.
///
/// Accepted amounts stay below 1e24 ticks, so the 1e16-scaled product stays
/// below 1e48 and the multiplication cannot wrap inside 256 bits.
pub fn notional(price: U256, quantity: U256) -> U256 {
    let product = price.wrapping_mul(&quantity);
    let (ticks, _) = product.div_rem_limb_with_reciprocal(&RECIPROCAL_SCALE);
    ticks
}
