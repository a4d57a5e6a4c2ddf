use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::ProformaError;
use crate::ProformaResult;

/// Largest magnitude (1e24) any projected line item may take. Statement
/// totals sum a fixed handful of such lines with plain `+` and stay far
/// below `Decimal::MAX`.
pub const MAX_MAGNITUDE: Decimal = dec!(1000000000000000000000000);

pub fn mul(a: Decimal, b: Decimal, context: &str) -> ProformaResult<Decimal> {
    bounded(a.checked_mul(b), context)
}

pub fn add(a: Decimal, b: Decimal, context: &str) -> ProformaResult<Decimal> {
    bounded(a.checked_add(b), context)
}

pub fn sub(a: Decimal, b: Decimal, context: &str) -> ProformaResult<Decimal> {
    bounded(a.checked_sub(b), context)
}

pub fn div(a: Decimal, b: Decimal, context: &str) -> ProformaResult<Decimal> {
    if b.is_zero() {
        return Err(ProformaError::DivisionByZero {
            context: context.into(),
        });
    }
    bounded(a.checked_div(b), context)
}

/// `true` when `value` is inside the supported range.
pub fn within_range(value: Decimal) -> bool {
    value.abs() <= MAX_MAGNITUDE
}

fn bounded(value: Option<Decimal>, context: &str) -> ProformaResult<Decimal> {
    match value {
        Some(v) if within_range(v) => Ok(v),
        _ => Err(ProformaError::Overflow {
            context: context.into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_range_results_pass_through() {
        assert_eq!(mul(dec!(1.5), dec!(4), "x").unwrap(), dec!(6));
        assert_eq!(add(dec!(1.5), dec!(4), "x").unwrap(), dec!(5.5));
        assert_eq!(sub(dec!(1.5), dec!(4), "x").unwrap(), dec!(-2.5));
        assert_eq!(div(dec!(1), dec!(4), "x").unwrap(), dec!(0.25));
    }

    #[test]
    fn test_decimal_overflow_is_an_error() {
        let err = mul(Decimal::MAX, dec!(2), "revenue").unwrap_err();
        assert_eq!(err, ProformaError::Overflow { context: "revenue".into() });
        assert!(matches!(div(dec!(1), dec!(0.0000000000000000000000000001), "tv"), Err(ProformaError::Overflow { .. })));
    }

    #[test]
    fn test_results_beyond_ceiling_rejected() {
        assert!(mul(MAX_MAGNITUDE, dec!(1.01), "x").is_err());
        assert!(add(MAX_MAGNITUDE, dec!(1), "x").is_err());
        assert!(sub(-MAX_MAGNITUDE, dec!(1), "x").is_err());
        assert!(mul(MAX_MAGNITUDE, dec!(1), "x").is_ok());
    }

    #[test]
    fn test_division_by_zero() {
        assert!(matches!(div(dec!(1), Decimal::ZERO, "x"), Err(ProformaError::DivisionByZero { .. })));
    }
}
