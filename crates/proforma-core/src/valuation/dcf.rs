use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::checked;
use crate::error::ProformaError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::ProformaResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Present value of one year's free cash flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountedCashFlow {
    pub year: i32,
    pub period: u32,
    pub fcff: Money,
    pub discount_factor: Rate,
    pub present_value: Money,
}

/// Output of the DCF valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    /// Enterprise value = Σ PV(FCFF) + PV(TV)
    pub enterprise_value: Money,
    /// Gordon growth terminal value at the horizon
    pub terminal_value: Money,
    /// Terminal value discounted with the final-year factor
    pub discounted_terminal_value: Money,
    /// Sum of present values of explicit-period FCFFs
    pub sum_of_discounted_cash_flows: Money,
    pub discounted_cash_flows: Vec<DiscountedCashFlow>,
    /// Terminal value as a share of enterprise value
    pub terminal_value_pct: Rate,
    pub wacc_used: Rate,
    pub perpetual_growth_rate: Rate,
    pub base_year: i32,
}

#[derive(Serialize)]
struct ValuationAssumptions<'a> {
    cash_flows: &'a [Money],
    wacc: Rate,
    perpetual_growth_rate: Rate,
    base_year: i32,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Discount an ordered FCFF series (year 1 first) plus a Gordon growth
/// terminal value back to `base_year`.
pub fn value_cash_flows(
    cash_flows: &[Money],
    wacc: Rate,
    perpetual_growth_rate: Rate,
    base_year: i32,
) -> ProformaResult<ComputationOutput<ValuationResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_valuation_input(cash_flows, wacc, perpetual_growth_rate)?;

    let one_plus_wacc = Decimal::ONE + wacc;
    let mut compound = Decimal::ONE;
    let mut discounted_cash_flows = Vec::with_capacity(cash_flows.len());

    for (idx, &fcff) in cash_flows.iter().enumerate() {
        let period = (idx + 1) as u32;
        compound = checked::mul(compound, one_plus_wacc, "discount factor")?;
        let discount_factor = Decimal::ONE / compound;
        discounted_cash_flows.push(DiscountedCashFlow {
            year: base_year + period as i32,
            period,
            fcff,
            discount_factor,
            present_value: checked::mul(fcff, discount_factor, "present value")?,
        });
    }

    let sum_of_discounted_cash_flows = discounted_cash_flows
        .iter()
        .try_fold(Decimal::ZERO, |acc, d| {
            checked::add(acc, d.present_value, "sum of discounted cash flows")
        })?;

    let last = discounted_cash_flows
        .last()
        .ok_or_else(|| ProformaError::InsufficientData("No cash flows to value".into()))?;

    let terminal_value = terminal_value(last.fcff, wacc, perpetual_growth_rate)?;
    let discounted_terminal_value =
        checked::mul(terminal_value, last.discount_factor, "discounted terminal value")?;
    let enterprise_value = checked::add(
        sum_of_discounted_cash_flows,
        discounted_terminal_value,
        "enterprise value",
    )?;

    if last.fcff < Decimal::ZERO {
        warnings.push(format!(
            "Final-year FCFF is negative ({}); terminal value is negative",
            last.fcff
        ));
    }

    // A near-zero EV makes the share meaningless; report it as zero.
    let terminal_value_pct = discounted_terminal_value
        .checked_div(enterprise_value)
        .filter(|pct| checked::within_range(*pct))
        .unwrap_or(Decimal::ZERO);
    if terminal_value_pct > dec!(0.75) {
        warnings.push(format!(
            "Terminal value represents {:.1}% of enterprise value; consider extending the explicit forecast period",
            terminal_value_pct * dec!(100)
        ));
    }

    let output = ValuationResult {
        enterprise_value,
        terminal_value,
        discounted_terminal_value,
        sum_of_discounted_cash_flows,
        discounted_cash_flows,
        terminal_value_pct,
        wacc_used: wacc,
        perpetual_growth_rate,
        base_year,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "FCFF DCF with Gordon Growth Terminal Value (end-of-year discounting)",
        &ValuationAssumptions {
            cash_flows,
            wacc,
            perpetual_growth_rate,
            base_year,
        },
        warnings,
        elapsed,
        output,
    ))
}

/// TV = FCFF_N × (1 + g) / (WACC − g)
///
/// A growth rate within a hair of WACC passes validation but sends the
/// value out of range, which is reported as `Overflow`.
pub fn terminal_value(final_fcff: Money, wacc: Rate, perpetual_growth_rate: Rate) -> ProformaResult<Money> {
    check_growth(wacc, perpetual_growth_rate)?;
    let grown = checked::mul(final_fcff, Decimal::ONE + perpetual_growth_rate, "terminal value")?;
    checked::div(grown, wacc - perpetual_growth_rate, "terminal value")
}

/// Equity value per share: (EV − net debt) / shares.
pub fn share_price(enterprise_value: Money, net_debt: Money, shares_outstanding: Decimal) -> ProformaResult<Money> {
    if shares_outstanding <= Decimal::ZERO {
        return Err(ProformaError::InvalidShareCount(shares_outstanding));
    }
    let equity_value = checked::sub(enterprise_value, net_debt, "equity value")?;
    checked::div(equity_value, shares_outstanding, "share price")
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_valuation_input(cash_flows: &[Money], wacc: Rate, g: Rate) -> ProformaResult<()> {
    if cash_flows.is_empty() {
        return Err(ProformaError::InsufficientData(
            "At least one projected cash flow is required".into(),
        ));
    }
    if wacc <= Decimal::ZERO {
        return Err(ProformaError::InvalidInput {
            field: "wacc".into(),
            reason: "WACC must be positive".into(),
        });
    }
    check_growth(wacc, g)
}

fn check_growth(wacc: Rate, g: Rate) -> ProformaResult<()> {
    if g < Decimal::ZERO || g >= wacc {
        return Err(ProformaError::InvalidGrowthAssumption { growth: g, wacc });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_flows() -> Vec<Money> {
        vec![dec!(1000), dec!(1100), dec!(1200), dec!(1300), dec!(1400)]
    }

    #[test]
    fn test_terminal_value_gordon() {
        let out = value_cash_flows(&sample_flows(), dec!(0.125), dec!(0.03), 2025).unwrap();
        let f = dec!(1400);
        assert_eq!(out.result.terminal_value, f * dec!(1.03) / dec!(0.095));
    }

    #[test]
    fn test_discount_factors() {
        let out = value_cash_flows(&[dec!(100), dec!(100)], dec!(0.10), dec!(0.02), 2025).unwrap();
        let flows = &out.result.discounted_cash_flows;

        assert_eq!(flows[0].year, 2026);
        assert_eq!(flows[1].period, 2);
        assert!((flows[0].discount_factor - dec!(1) / dec!(1.1)).abs() < dec!(0.0000000001));
        assert!((flows[1].discount_factor - dec!(1) / dec!(1.21)).abs() < dec!(0.0000000001));
        assert!((flows[1].present_value - dec!(82.6446280991)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_enterprise_value_composition() {
        let out = value_cash_flows(&sample_flows(), dec!(0.125), dec!(0.03), 2025).unwrap();
        let r = &out.result;

        let pv_sum: Money = r.discounted_cash_flows.iter().map(|d| d.present_value).sum();
        assert_eq!(r.sum_of_discounted_cash_flows, pv_sum);
        assert_eq!(
            r.discounted_terminal_value,
            r.terminal_value * r.discounted_cash_flows[4].discount_factor
        );
        assert_eq!(r.enterprise_value, pv_sum + r.discounted_terminal_value);
    }

    #[test]
    fn test_growth_equal_to_wacc_rejected() {
        let result = value_cash_flows(&sample_flows(), dec!(0.10), dec!(0.10), 2025);
        assert!(matches!(result, Err(ProformaError::InvalidGrowthAssumption { .. })));
    }

    #[test]
    fn test_growth_above_wacc_rejected() {
        let result = value_cash_flows(&sample_flows(), dec!(0.10), dec!(0.12), 2025);
        assert!(matches!(result, Err(ProformaError::InvalidGrowthAssumption { .. })));
    }

    #[test]
    fn test_negative_growth_rejected() {
        let result = value_cash_flows(&sample_flows(), dec!(0.10), dec!(-0.01), 2025);
        assert!(matches!(result, Err(ProformaError::InvalidGrowthAssumption { .. })));
    }

    #[test]
    fn test_empty_series_rejected() {
        let result = value_cash_flows(&[], dec!(0.10), dec!(0.02), 2025);
        assert!(matches!(result, Err(ProformaError::InsufficientData(_))));
    }

    #[test]
    fn test_negative_final_fcff_warns() {
        let out = value_cash_flows(&[dec!(100), dec!(-50)], dec!(0.10), dec!(0.02), 2025).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("negative")));
    }

    #[test]
    fn test_terminal_heavy_valuation_warns() {
        let out = value_cash_flows(&[dec!(100)], dec!(0.08), dec!(0.05), 2025).unwrap();
        assert!(out.result.terminal_value_pct > dec!(0.75));
        assert!(out.warnings.iter().any(|w| w.contains("Terminal value represents")));
    }

    #[test]
    fn test_growth_a_hair_below_wacc_is_an_error() {
        let g = dec!(0.1249999999999999999999999999);
        let result = value_cash_flows(&sample_flows(), dec!(0.125), g, 2025);
        assert_eq!(
            result.unwrap_err(),
            ProformaError::Overflow {
                context: "terminal value".into()
            }
        );
    }

    #[test]
    fn test_long_horizon_at_high_wacc_is_an_error() {
        // 1.9^100 is far outside the representable range
        let flows = vec![dec!(100); 100];
        let result = value_cash_flows(&flows, dec!(0.9), dec!(0.02), 2025);
        assert!(matches!(result, Err(ProformaError::Overflow { .. })));
    }

    #[test]
    fn test_share_price_tiny_share_count_is_an_error() {
        let result = share_price(dec!(1000000000000), dec!(0), dec!(0.0000000000000000000001));
        assert!(matches!(result, Err(ProformaError::Overflow { .. })));
    }

    #[test]
    fn test_share_price() {
        assert_eq!(share_price(dec!(1000), dec!(200), dec!(100)).unwrap(), dec!(8));
    }

    #[test]
    fn test_share_price_zero_shares() {
        assert_eq!(
            share_price(dec!(1000), dec!(200), Decimal::ZERO).unwrap_err(),
            ProformaError::InvalidShareCount(Decimal::ZERO)
        );
    }

    #[test]
    fn test_share_price_negative_shares() {
        assert!(matches!(
            share_price(dec!(1000), dec!(200), dec!(-5)),
            Err(ProformaError::InvalidShareCount(_))
        ));
    }
}
