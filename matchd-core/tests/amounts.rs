use matchd_core::prelude::*;

#[test]
fn test_parse_and_format_round_trip() {
    for text in ["1", "1.5", "0.00000001", "30000.25", "99999.99999999"] {
        let ticks = parse_amount(text).unwrap();
        assert_eq!(format_amount(ticks), text, "round trip of {text:?}");
    }
}

#[test]
fn test_parse_pads_fractional_digits() {
    assert_eq!(parse_amount("1.5").unwrap(), parse_amount("1.50000000").unwrap());
    assert_eq!(format_amount(parse_amount("1.50").unwrap()), "1.5");
    assert_eq!(format_amount(parse_amount("0100").unwrap()), "100");
}

#[test]
fn test_parse_accepts_whitespace_padding() {
    assert_eq!(parse_amount(" 2.5 ").unwrap(), parse_amount("2.5").unwrap());
}

#[test]
fn test_parse_rejects_non_decimals() {
    assert_eq!(parse_amount(""), Err(AmountParseError::Empty));
    assert_eq!(parse_amount("   "), Err(AmountParseError::Empty));
    assert_eq!(parse_amount("."), Err(AmountParseError::InvalidCharacter));
    assert_eq!(parse_amount("-1"), Err(AmountParseError::InvalidCharacter));
    assert_eq!(parse_amount("+1"), Err(AmountParseError::InvalidCharacter));
    assert_eq!(parse_amount("1e5"), Err(AmountParseError::InvalidCharacter));
    assert_eq!(parse_amount("NaN"), Err(AmountParseError::InvalidCharacter));
    assert_eq!(parse_amount("inf"), Err(AmountParseError::InvalidCharacter));
    assert_eq!(parse_amount("1,5"), Err(AmountParseError::InvalidCharacter));
}

#[test]
fn test_parse_rejects_zero_and_bounds() {
    assert_eq!(parse_amount("0"), Err(AmountParseError::NotPositive));
    assert_eq!(parse_amount("0.0"), Err(AmountParseError::NotPositive));
    assert_eq!(
        parse_amount("0.000000001"),
        Err(AmountParseError::TooManyDecimals)
    );
    let too_wide = "1".repeat(16);
    assert_eq!(parse_amount(&too_wide), Err(AmountParseError::TooLarge));
    let widest = "9".repeat(15);
    assert!(parse_amount(&widest).is_ok(), "15 integer digits are accepted");
    assert_eq!(
        parse_amount(&format!("000{}", "9".repeat(15))).ok(),
        parse_amount(&"9".repeat(15)).ok(),
        "leading zeros do not count against the width bound"
    );
}

#[test]
fn test_notional_rescales_the_product() {
    let price = parse_amount("100").unwrap();
    let quantity = parse_amount("1.5").unwrap();
    assert_eq!(format_amount(notional(price, quantity)), "150");

    let price = parse_amount("0.0001").unwrap();
    let quantity = parse_amount("0.5").unwrap();
    assert_eq!(format_amount(notional(price, quantity)), "0.00005");

    // Sub-tick products truncate to zero ticks.
    let dust = notional(parse_amount("0.00000001").unwrap(), parse_amount("0.5").unwrap());
    assert_eq!(format_amount(dust), "0");
}

#[test]
fn test_notional_of_widest_amounts_formats_exactly() {
    let huge = format!("1{}", "0".repeat(14)); // 1e14
    let ticks = parse_amount(&huge).unwrap();
    let product = notional(ticks, ticks); // 1e28 units, 1e36 ticks
    assert_eq!(format_amount(product), format!("1{}", "0".repeat(28)));
}
