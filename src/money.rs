//! Money Conversion Module
//!
//! Unified conversion between the internal u64 minor-unit representation
//! and the client-facing string/Decimal representation. All conversions
//! MUST go through this module.
//!
//! ## Internal Representation
//! - All amounts are stored as `u64` minor units (`i64` for signed deltas)
//! - The currency has a fixed scale of 10^2 (e.g. 40.00 units = 4000)
//! - Proportional fees use `round_half_up` so the rounded value, not the
//!   raw fraction, is what enters the zero-sum books

use rust_decimal::prelude::*;
use thiserror::Error;

/// Decimal places of the currency (minor unit = 1/100)
pub const CURRENCY_DECIMALS: u32 = 2;

/// Scale factor between display units and minor units
pub const MINOR_PER_UNIT: u64 = 100;

/// Rate precision for proportional fees (10^6 = 1,000,000)
pub const RATE_PRECISION: u64 = 1_000_000;

/// Largest transfer amount the ledger accepts (10 trillion display units).
///
/// Ledger deltas are signed i64; this cap keeps `amount + fee` far below
/// `i64::MAX`, so a delta can never wrap sign.
pub const MAX_AMOUNT: u64 = 1_000_000_000_000_000;

/// Money conversion errors
#[derive(Debug, Error)]
pub enum MoneyError {
    #[error("Precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Amount too large, would overflow")]
    Overflow,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Convert a client amount string to minor units
///
/// # Errors
/// * `PrecisionOverflow` - more than two decimal places
/// * `InvalidAmount` - zero or signed input
/// * `Overflow` - result would overflow u64
/// * `InvalidFormat` - not a plain decimal number
///
/// # Example
/// ```
/// use mbank::money::parse_amount;
/// assert_eq!(parse_amount("40").unwrap(), 4_000);
/// assert_eq!(parse_amount("1.5").unwrap(), 150);
/// ```
pub fn parse_amount(amount_str: &str) -> Result<u64, MoneyError> {
    let amount_str = amount_str.trim();
    if amount_str.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }

    // Explicit signs are rejected, amounts are unsigned by construction
    if amount_str.starts_with('-') || amount_str.starts_with('+') {
        return Err(MoneyError::InvalidAmount);
    }

    let parts: Vec<&str> = amount_str.split('.').collect();
    let (whole, frac) = match parts.len() {
        1 => (parts[0], ""),
        2 => {
            // Strict check: both sides of the dot must be non-empty.
            // This prevents ambiguous formats like ".5" or "5."
            if parts[0].is_empty() {
                return Err(MoneyError::InvalidFormat(
                    "missing leading zero (e.g., use 0.5 instead of .5)".into(),
                ));
            }
            if parts[1].is_empty() {
                return Err(MoneyError::InvalidFormat(
                    "missing fractional part (e.g., use 5.0 instead of 5.)".into(),
                ));
            }
            (parts[0], parts[1])
        }
        _ => return Err(MoneyError::InvalidFormat("multiple decimal points".into())),
    };

    // No silent truncation below the minor unit
    if frac.len() > CURRENCY_DECIMALS as usize {
        return Err(MoneyError::PrecisionOverflow {
            provided: frac.len() as u32,
            max: CURRENCY_DECIMALS,
        });
    }

    let whole_num: u64 = whole.parse::<u64>().map_err(|e| {
        let err_str = e.to_string();
        if err_str.contains("too large") || err_str.contains("overflow") {
            MoneyError::Overflow
        } else {
            MoneyError::InvalidFormat(format!("invalid character in whole part: {}", whole))
        }
    })?;

    let frac_num: u64 = if frac.is_empty() {
        0
    } else {
        let frac_padded = format!("{:0<width$}", frac, width = CURRENCY_DECIMALS as usize);
        frac_padded
            .parse::<u64>()
            .map_err(|_| MoneyError::InvalidFormat("invalid fractional part".into()))?
    };

    let amount = whole_num
        .checked_mul(MINOR_PER_UNIT)
        .and_then(|v: u64| v.checked_add(frac_num))
        .ok_or(MoneyError::Overflow)?;

    if amount == 0 {
        return Err(MoneyError::InvalidAmount);
    }

    Ok(amount)
}

/// Convert a Decimal to minor units
///
/// Used at API boundaries where `rust_decimal::Decimal` handles JSON
/// deserialization.
pub fn parse_decimal(decimal: Decimal) -> Result<u64, MoneyError> {
    if decimal.is_sign_negative() || decimal.is_zero() {
        return Err(MoneyError::InvalidAmount);
    }

    if decimal.scale() > CURRENCY_DECIMALS {
        return Err(MoneyError::PrecisionOverflow {
            provided: decimal.scale(),
            max: CURRENCY_DECIMALS,
        });
    }

    let result = decimal * Decimal::from(MINOR_PER_UNIT);
    if !result.fract().is_zero() {
        return Err(MoneyError::PrecisionOverflow {
            provided: decimal.scale(),
            max: CURRENCY_DECIMALS,
        });
    }

    result.to_u64().ok_or(MoneyError::Overflow)
}

/// Convert minor units to a display string ("1015.00")
pub fn format_amount(value: u64) -> String {
    format!(
        "{}.{:02}",
        value / MINOR_PER_UNIT,
        value % MINOR_PER_UNIT
    )
}

/// Convert a signed minor-unit delta to a display string ("-15.00")
pub fn format_amount_signed(value: i64) -> String {
    let formatted = format_amount(value.unsigned_abs());
    if value < 0 {
        format!("-{}", formatted)
    } else {
        formatted
    }
}

/// Proportional share of an amount, rounded half-up.
///
/// `rate` is in `RATE_PRECISION` units (10_000 = 1%). Uses a u128
/// intermediate to prevent overflow. The rounded value is what must
/// balance against the zero-sum invariant, never the raw fraction.
///
/// # Example
/// ```
/// use mbank::money::round_half_up;
/// // 1000.00 units * 1.0% = 10.00 units
/// assert_eq!(round_half_up(100_000, 10_000), 1_000);
/// ```
#[inline]
pub fn round_half_up(amount: u64, rate: u64) -> u64 {
    let scaled = amount as u128 * rate as u128 + (RATE_PRECISION as u128) / 2;
    (scaled / RATE_PRECISION as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_parse_amount_variations() {
        assert_eq!(parse_amount("1.23").unwrap(), 123);
        assert_eq!(parse_amount("40").unwrap(), 4_000);
        assert_eq!(parse_amount("001.2").unwrap(), 120);
        assert_eq!(parse_amount("0.01").unwrap(), 1);

        // Zero rejected, amounts are positive non-zero
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("0.00").is_err());
    }

    #[test]
    fn test_parse_amount_invalid_formats() {
        for case in ["1,000.00", "1.2.3", "1. 23", "+1.23", "-5", "1e2", ".", ".5", "5."] {
            assert!(parse_amount(case).is_err(), "should reject: {}", case);
        }
    }

    #[test]
    fn test_parse_amount_precision_limit() {
        assert!(parse_amount("1.23").is_ok());
        let res = parse_amount("1.234");
        assert!(matches!(
            res,
            Err(MoneyError::PrecisionOverflow { provided: 3, max: 2 })
        ));
    }

    #[test]
    fn test_parse_amount_overflow() {
        assert!(matches!(
            parse_amount("999999999999999999999"),
            Err(MoneyError::Overflow)
        ));
    }

    #[test]
    fn test_parse_decimal() {
        let d = Decimal::from_str("1015.00").unwrap();
        assert_eq!(parse_decimal(d).unwrap(), 101_500);

        let too_fine = Decimal::from_str("1.005").unwrap();
        assert!(parse_decimal(too_fine).is_err());

        let negative = Decimal::from_str("-1").unwrap();
        assert!(parse_decimal(negative).is_err());
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(101_500), "1015.00");
        assert_eq!(format_amount(5), "0.05");
        assert_eq!(format_amount(0), "0.00");
        assert_eq!(format_amount_signed(-1_500), "-15.00");
        assert_eq!(format_amount_signed(1_500), "15.00");
    }

    #[test]
    fn test_round_half_up() {
        // 1000.00 * 1.5% = 15.00 exactly
        assert_eq!(round_half_up(100_000, 15_000), 1_500);
        // 33 * 1.5% = 0.495 -> down, 34 * 1.5% = 0.51 -> up
        assert_eq!(round_half_up(33, 15_000), 0);
        assert_eq!(round_half_up(34, 15_000), 1);
        // exact half rounds up: 100 * 0.5% = 0.5 -> 1
        assert_eq!(round_half_up(100, 5_000), 1);
    }

    #[test]
    fn test_round_half_up_no_overflow() {
        let large: u64 = 10_000_000_000_000_000_000;
        assert_eq!(round_half_up(large, 15_000), 150_000_000_000_000_000);
    }

    #[test]
    fn test_roundtrip_consistency() {
        for s in ["1", "1.5", "0.01", "1234.56", "999999.99"] {
            let minor = parse_amount(s).unwrap();
            let back = parse_amount(&format_amount(minor)).unwrap();
            assert_eq!(minor, back, "roundtrip failed for {}", s);
        }
    }
}
