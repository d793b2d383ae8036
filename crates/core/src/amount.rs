//! Bounds and checked arithmetic for stored quantities and money values.
//!
//! Every quantity, price, total and balance is persisted as `NUMERIC(19, 4)`: at most
//! four decimal places and a magnitude below 10^15. Caller input outside that range is
//! rejected with `InvalidAmount`; computed products are rounded to four places with
//! banker's rounding, the same way currency conversion rounds.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::LedgerError;

/// Decimal places kept for every stored value.
pub const SCALE: u32 = 4;

/// Exclusive upper bound on the magnitude of every stored value.
// 10^15 == 0x0003_8D7E_A4C6_8000 split into 32-bit words.
pub const MAX_ABS: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// Checks that `value` fits a stored column.
///
/// Trailing zeros do not count towards the scale, so `1.50000` is accepted.
///
/// # Errors
///
/// Returns `InvalidAmount` for more than four decimal places or a magnitude of 10^15 or more.
pub fn ensure_storable(field: &str, value: Decimal) -> Result<Decimal, LedgerError> {
    if value.normalize().scale() > SCALE {
        return Err(LedgerError::InvalidAmount(format!(
            "{field} has more than {SCALE} decimal places, got {value}"
        )));
    }
    if value.abs() >= MAX_ABS {
        return Err(LedgerError::InvalidAmount(format!(
            "{field} is out of range, got {value}"
        )));
    }
    Ok(value)
}

/// Rounds a computed value to the stored scale.
#[must_use]
pub fn round(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointNearestEven)
}

/// `a × b` rounded to the stored scale.
///
/// # Errors
///
/// Returns `InvalidAmount` on overflow or when the product does not fit a stored column.
pub fn mul(field: &str, a: Decimal, b: Decimal) -> Result<Decimal, LedgerError> {
    let product = a.checked_mul(b).ok_or_else(|| overflow(field))?;
    ensure_storable(field, round(product))
}

/// `a + b`, bounded like every stored value.
///
/// # Errors
///
/// Returns `InvalidAmount` on overflow or when the sum does not fit a stored column.
pub fn add(field: &str, a: Decimal, b: Decimal) -> Result<Decimal, LedgerError> {
    let sum = a.checked_add(b).ok_or_else(|| overflow(field))?;
    ensure_storable(field, round(sum))
}

/// Sums `values`, failing on the first out-of-range partial sum.
///
/// # Errors
///
/// Returns `InvalidAmount` when a partial sum does not fit a stored column.
pub fn sum(
    field: &str,
    values: impl IntoIterator<Item = Decimal>,
) -> Result<Decimal, LedgerError> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |total, value| add(field, total, value))
}

fn overflow(field: &str) -> LedgerError {
    LedgerError::InvalidAmount(format!("{field} overflowed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(0.0001))]
    #[case(dec!(1.50000))]
    #[case(dec!(-999999999999999.9999))]
    #[case(Decimal::ZERO)]
    fn test_storable_values_pass(#[case] value: Decimal) {
        assert_eq!(ensure_storable("amount", value).unwrap(), value);
    }

    #[rstest]
    #[case(dec!(0.00001))]
    #[case(dec!(0.33333))]
    #[case(dec!(1000000000000000))]
    #[case(dec!(-1000000000000000))]
    #[case(Decimal::MAX)]
    fn test_unstorable_values_fail(#[case] value: Decimal) {
        assert!(matches!(
            ensure_storable("amount", value),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_mul_rounds_to_four_places() {
        assert_eq!(mul("total", dec!(0.3333), dec!(0.5)).unwrap(), dec!(0.1666));
        assert_eq!(mul("total", dec!(0.0001), dec!(0.5)).unwrap(), dec!(0.0000));
        assert_eq!(mul("total", dec!(0.0003), dec!(0.5)).unwrap(), dec!(0.0002));
    }

    #[test]
    fn test_mul_overflow_is_invalid_amount() {
        let result = mul("line total", dec!(100000000000000000000), dec!(10000000000));
        assert!(matches!(result, Err(LedgerError::InvalidAmount(_))));
        assert!(mul("line total", Decimal::MAX, dec!(2)).is_err());
    }

    #[test]
    fn test_add_beyond_bound_is_invalid_amount() {
        assert!(matches!(
            add("balance", Decimal::MAX, Decimal::ONE),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(add("balance", dec!(999999999999999), Decimal::ONE).is_err());
        assert_eq!(add("balance", dec!(-5), dec!(2.5)).unwrap(), dec!(-2.5));
    }

    #[test]
    fn test_sum_stops_at_first_overflow() {
        assert_eq!(sum("total", [dec!(1), dec!(2.5)]).unwrap(), dec!(3.5));
        assert!(sum("total", [dec!(600000000000000), dec!(600000000000000)]).is_err());
    }
}
