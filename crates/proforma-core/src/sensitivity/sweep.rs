use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::ProformaError;
use crate::types::SensitivityVariable;
use crate::ProformaResult;

/// Cooperative cancellation flag shared between a sweep and its caller.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Most points a single sweep axis, or a whole grid, may hold. Every point
/// is a full projection run.
pub const MAX_SWEEP_POINTS: usize = 10_000;

/// Values from `min` to `max` in `step` increments. `max` is always
/// included even when the step does not land on it. Ranges that would
/// produce more than [`MAX_SWEEP_POINTS`] values are rejected up front.
pub fn sweep_values(var: &SensitivityVariable) -> ProformaResult<Vec<Decimal>> {
    if var.step <= Decimal::ZERO {
        return Err(ProformaError::InvalidInput {
            field: "step".into(),
            reason: "Step must be positive".into(),
        });
    }
    if var.min > var.max {
        return Err(ProformaError::InvalidInput {
            field: "min".into(),
            reason: "Min must be <= max".into(),
        });
    }

    let intervals = var
        .max
        .checked_sub(var.min)
        .and_then(|span| span.checked_div(var.step))
        .map(|n| n.ceil())
        .unwrap_or(Decimal::MAX);
    if intervals >= Decimal::from(MAX_SWEEP_POINTS) {
        return Err(ProformaError::InvalidInput {
            field: "step".into(),
            reason: format!(
                "Range {}..{} in steps of {} exceeds {MAX_SWEEP_POINTS} points",
                var.min, var.max, var.step
            ),
        });
    }

    let mut values = Vec::new();
    let mut current = var.min;
    while current <= var.max {
        values.push(current);
        current = match current.checked_add(var.step) {
            Some(next) => next,
            None => break,
        };
    }
    if let Some(&last) = values.last() {
        if last < var.max {
            values.push(var.max);
        }
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn var(min: Decimal, max: Decimal, step: Decimal) -> SensitivityVariable {
        SensitivityVariable { min, max, step }
    }

    #[test]
    fn test_exact_steps() {
        let values = sweep_values(&var(dec!(0.08), dec!(0.12), dec!(0.01))).unwrap();
        assert_eq!(
            values,
            vec![dec!(0.08), dec!(0.09), dec!(0.10), dec!(0.11), dec!(0.12)]
        );
    }

    #[test]
    fn test_max_appended_when_step_overshoots() {
        let values = sweep_values(&var(dec!(0), dec!(10), dec!(4))).unwrap();
        assert_eq!(values, vec![dec!(0), dec!(4), dec!(8), dec!(10)]);
    }

    #[test]
    fn test_single_point() {
        let values = sweep_values(&var(dec!(5), dec!(5), dec!(1))).unwrap();
        assert_eq!(values, vec![dec!(5)]);
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(sweep_values(&var(dec!(0), dec!(1), dec!(0))).is_err());
        assert!(sweep_values(&var(dec!(2), dec!(1), dec!(0.5))).is_err());
    }

    #[test]
    fn test_oversized_range_rejected() {
        let result = sweep_values(&var(dec!(0), dec!(1), dec!(0.0000000001)));
        match result.unwrap_err() {
            ProformaError::InvalidInput { field, reason } => {
                assert_eq!(field, "step");
                assert!(reason.contains("10000"));
            }
            e => panic!("Expected InvalidInput, got {e:?}"),
        }
    }

    #[test]
    fn test_range_at_point_limit() {
        // 9,999 intervals: 10,000 points
        let values = sweep_values(&var(dec!(0), dec!(9999), dec!(1))).unwrap();
        assert_eq!(values.len(), MAX_SWEEP_POINTS);
        assert!(sweep_values(&var(dec!(0), dec!(10000), dec!(1))).is_err());
    }

    #[test]
    fn test_cancellation_shared_between_clones() {
        let token = CancellationToken::new();
        let handle = token.clone();
        assert!(!token.is_cancelled());
        handle.cancel();
        assert!(token.is_cancelled());
    }
}
