//! Human-readable currency amounts.
//!
//! Service descriptors carry amounts as decimal strings in whole token units
//! (`"0.1"`), while contracts expect integer base units (`100000` for a
//! six-decimal stablecoin). Conversion goes through [`rust_decimal`] so that
//! no precision is lost or silently rounded.

use std::str::FromStr;

use alloy_primitives::U256;
use rust_decimal::Decimal;

use crate::error::ValidationError;

/// Converts a decimal amount string into token base units.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidAmount`] if the input is not a decimal
/// number, is negative, or has more fractional digits than `decimals`.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256, ValidationError> {
    let invalid = |reason| ValidationError::InvalidAmount {
        amount: amount.to_owned(),
        reason,
    };
    let value = Decimal::from_str(amount.trim()).map_err(|_| invalid("not a decimal number"))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(invalid("must not be negative"));
    }
    let value = value.normalize();
    let scale = value.scale();
    if scale > u32::from(decimals) {
        return Err(invalid("more decimal places than the token supports"));
    }
    let mantissa =
        u128::try_from(value.mantissa()).map_err(|_| invalid("must not be negative"))?;
    let shift = U256::from(10u64).pow(U256::from(u32::from(decimals) - scale));
    Ok(U256::from(mantissa) * shift)
}

/// Formats token base units as a decimal string, trimming trailing zeros.
#[must_use]
pub fn format_units(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    let decimals = usize::from(decimals);
    if decimals == 0 {
        return digits;
    }
    let padded = format!("{digits:0>width$}", width = decimals + 1);
    let (int, frac) = padded.split_at(padded.len() - decimals);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        int.to_owned()
    } else {
        format!("{int}.{frac}")
    }
}

/// Normalizes a decimal amount and appends the token symbol (`"0.10"` → `"0.1 USDC"`).
///
/// # Errors
///
/// Returns [`ValidationError::InvalidAmount`] if the input is not a decimal number.
pub fn display_amount(amount: &str, symbol: &str) -> Result<String, ValidationError> {
    let value = Decimal::from_str(amount.trim()).map_err(|_| ValidationError::InvalidAmount {
        amount: amount.to_owned(),
        reason: "not a decimal number",
    })?;
    Ok(format!("{} {symbol}", value.normalize()))
}

/// Renders a basis-point share as a percentage (`8000` → `"80%"`, `2550` → `"25.5%"`).
#[must_use]
pub fn bips_to_percentage(bips: u16) -> String {
    format!("{}%", Decimal::new(i64::from(bips), 2).normalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units_scales_to_decimals() {
        assert_eq!(parse_units("0.1", 6).unwrap(), U256::from(100_000u64));
        assert_eq!(parse_units("1", 6).unwrap(), U256::from(1_000_000u64));
        assert_eq!(parse_units("0.10", 6).unwrap(), U256::from(100_000u64));
        assert_eq!(parse_units("0", 6).unwrap(), U256::ZERO);
        assert_eq!(parse_units(" 2.5 ", 18).unwrap(), U256::from(2_500_000_000_000_000_000u128));
    }

    #[test]
    fn test_parse_units_rejects_bad_input() {
        assert!(parse_units("abc", 6).is_err());
        assert!(parse_units("-1", 6).is_err());
        assert!(parse_units("0.0000001", 6).is_err());
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(U256::from(100_000u64), 6), "0.1");
        assert_eq!(format_units(U256::from(1_000_000u64), 6), "1");
        assert_eq!(format_units(U256::from(1_234_567u64), 6), "1.234567");
        assert_eq!(format_units(U256::ZERO, 6), "0");
        assert_eq!(format_units(U256::from(42u64), 0), "42");
    }

    #[test]
    fn test_display_amount_normalizes() {
        assert_eq!(display_amount("0.1", "USDC").unwrap(), "0.1 USDC");
        assert_eq!(display_amount("0.100", "USDC").unwrap(), "0.1 USDC");
        assert_eq!(display_amount("5", "USDC").unwrap(), "5 USDC");
    }

    #[test]
    fn test_bips_to_percentage() {
        assert_eq!(bips_to_percentage(8000), "80%");
        assert_eq!(bips_to_percentage(2000), "20%");
        assert_eq!(bips_to_percentage(2550), "25.5%");
        assert_eq!(bips_to_percentage(10000), "100%");
        assert_eq!(bips_to_percentage(1), "0.01%");
    }
}
