use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ProformaError;
use crate::types::Rate;
use crate::ProformaResult;

/// Allowed gap between the supplied WACC and the one implied by its
/// components before a warning is raised.
const WACC_CONSISTENCY_THRESHOLD: Decimal = dec!(0.005);

/// Upper bound (1000%) on any cost of capital or weight.
pub const MAX_RATE: Decimal = dec!(10);

/// Discount-rate record: the blended WACC plus the components behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountRate {
    /// Cost of equity (Ke)
    pub cost_of_equity: Rate,
    /// Pre-tax cost of debt (Kd)
    pub cost_of_debt: Rate,
    /// Blended weighted average cost of capital used for discounting
    pub wacc: Rate,
    /// Weight of equity in the capital structure
    pub equity_weight: Rate,
    /// Weight of debt in the capital structure
    pub debt_weight: Rate,
    /// Marginal tax rate for the debt shield; zero when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<Rate>,
}

impl DiscountRate {
    /// Build a record whose `wacc` is blended from its components:
    /// WACC = Ke × We + Kd × (1 − t) × Wd
    pub fn from_components(
        cost_of_equity: Rate,
        cost_of_debt: Rate,
        tax_rate: Rate,
        equity_weight: Rate,
        debt_weight: Rate,
    ) -> ProformaResult<Self> {
        let mut rate = Self {
            cost_of_equity,
            cost_of_debt,
            wacc: Decimal::ZERO,
            equity_weight,
            debt_weight,
            tax_rate: Some(tax_rate),
        };
        rate.validate_components()?;
        rate.wacc = rate.implied_wacc();
        rate.validate()?;
        Ok(rate)
    }

    pub fn after_tax_cost_of_debt(&self) -> Rate {
        self.cost_of_debt * (Decimal::ONE - self.tax_rate.unwrap_or(Decimal::ZERO))
    }

    pub fn implied_wacc(&self) -> Rate {
        self.cost_of_equity * self.equity_weight + self.after_tax_cost_of_debt() * self.debt_weight
    }

    pub fn validate(&self) -> ProformaResult<()> {
        if self.wacc <= Decimal::ZERO {
            return Err(ProformaError::InvalidInput {
                field: "discount_rate.wacc".into(),
                reason: "WACC must be positive".into(),
            });
        }
        if self.wacc > MAX_RATE {
            return Err(ProformaError::InvalidInput {
                field: "discount_rate.wacc".into(),
                reason: format!("WACC cannot exceed {MAX_RATE}"),
            });
        }
        self.validate_components()
    }

    /// Range checks on the inputs to [`implied_wacc`](Self::implied_wacc).
    fn validate_components(&self) -> ProformaResult<()> {
        let bounded = [
            ("discount_rate.cost_of_equity", self.cost_of_equity),
            ("discount_rate.cost_of_debt", self.cost_of_debt),
            ("discount_rate.equity_weight", self.equity_weight),
            ("discount_rate.debt_weight", self.debt_weight),
        ];
        for (field, value) in bounded {
            if value > MAX_RATE {
                return Err(ProformaError::InvalidInput {
                    field: field.into(),
                    reason: format!("Value {value} exceeds {MAX_RATE}"),
                });
            }
        }
        if self.cost_of_equity < Decimal::ZERO || self.cost_of_debt < Decimal::ZERO {
            return Err(ProformaError::InvalidInput {
                field: "discount_rate.cost_of_equity / cost_of_debt".into(),
                reason: "Costs of capital cannot be negative".into(),
            });
        }
        if let Some(t) = self.tax_rate {
            if t < Decimal::ZERO || t > Decimal::ONE {
                return Err(ProformaError::InvalidInput {
                    field: "discount_rate.tax_rate".into(),
                    reason: "Tax rate must be between 0 and 1".into(),
                });
            }
        }
        if self.debt_weight < Decimal::ZERO || self.equity_weight < Decimal::ZERO {
            return Err(ProformaError::InvalidInput {
                field: "discount_rate.debt_weight / equity_weight".into(),
                reason: "Capital structure weights cannot be negative".into(),
            });
        }
        let weight_sum = self.debt_weight + self.equity_weight;
        if (weight_sum - Decimal::ONE).abs() > dec!(0.01) {
            return Err(ProformaError::InvalidInput {
                field: "discount_rate.debt_weight + equity_weight".into(),
                reason: format!("Capital structure weights must sum to 1.0, got {weight_sum}"),
            });
        }
        Ok(())
    }

    /// Reasonableness checks that do not block a valuation.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let implied = self.implied_wacc();
        if (implied - self.wacc).abs() > WACC_CONSISTENCY_THRESHOLD {
            warnings.push(format!(
                "Supplied WACC ({}) differs from the WACC implied by its components ({implied})",
                self.wacc
            ));
        }
        if self.wacc > dec!(0.20) {
            warnings.push(format!(
                "WACC of {} exceeds 20%; appropriate for high-risk situations only",
                self.wacc
            ));
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_discount_rate;

    #[test]
    fn test_implied_wacc() {
        let rate = sample_discount_rate();
        // 0.15 * 0.70 + 0.11 * 0.66 * 0.30 = 0.105 + 0.02178
        assert_eq!(rate.implied_wacc(), dec!(0.12678));
        assert_eq!(rate.after_tax_cost_of_debt(), dec!(0.0726));
    }

    #[test]
    fn test_sample_rate_consistent() {
        let rate = sample_discount_rate();
        assert!(rate.validate().is_ok());
        assert!(rate.warnings().is_empty());
    }

    #[test]
    fn test_from_components_blends() {
        let rate = DiscountRate::from_components(dec!(0.14), dec!(0.08), dec!(0.25), dec!(0.6), dec!(0.4))
            .unwrap();
        // 0.14 * 0.6 + 0.08 * 0.75 * 0.4 = 0.084 + 0.024
        assert_eq!(rate.wacc, dec!(0.108));
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let mut rate = sample_discount_rate();
        rate.debt_weight = dec!(0.5);
        match rate.validate().unwrap_err() {
            ProformaError::InvalidInput { field, .. } => assert!(field.contains("weight")),
            e => panic!("Expected InvalidInput, got {e:?}"),
        }
    }

    #[test]
    fn test_zero_wacc_rejected() {
        let mut rate = sample_discount_rate();
        rate.wacc = Decimal::ZERO;
        assert!(rate.validate().is_err());
    }

    #[test]
    fn test_out_of_range_rates_rejected() {
        let mut rate = sample_discount_rate();
        rate.cost_of_equity = Decimal::MAX;
        assert!(matches!(rate.validate(), Err(ProformaError::InvalidInput { .. })));

        let mut rate = sample_discount_rate();
        rate.wacc = dec!(11);
        assert!(rate.validate().is_err());

        assert!(DiscountRate::from_components(Decimal::MAX, dec!(0.08), dec!(0.25), dec!(0.6), dec!(0.4)).is_err());
    }

    #[test]
    fn test_inconsistent_wacc_warns() {
        let mut rate = sample_discount_rate();
        rate.wacc = dec!(0.09);
        assert!(rate.warnings().iter().any(|w| w.contains("implied")));
    }

    #[test]
    fn test_missing_tax_rate_means_no_shield() {
        let mut rate = sample_discount_rate();
        rate.tax_rate = None;
        assert_eq!(rate.after_tax_cost_of_debt(), dec!(0.11));
    }
}
