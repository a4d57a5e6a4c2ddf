use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::engine::orchestrator::ProjectionInput;
use crate::error::ProformaError;

/// A scalar input that a sensitivity sweep can override.
///
/// Per-year assumptions are overridden in every projected year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityParameter {
    RevenueGrowth,
    CogsMargin,
    OpexMargin,
    CapexToSales,
    DepreciationRate,
    DaysReceivables,
    DaysInventory,
    DaysPayables,
    DividendPayout,
    ShortTermInterestRate,
    LongTermInterestRate,
    Wacc,
    PerpetualGrowthRate,
    BaseRevenue,
}

impl SensitivityParameter {
    pub const ALL: [SensitivityParameter; 14] = [
        SensitivityParameter::RevenueGrowth,
        SensitivityParameter::CogsMargin,
        SensitivityParameter::OpexMargin,
        SensitivityParameter::CapexToSales,
        SensitivityParameter::DepreciationRate,
        SensitivityParameter::DaysReceivables,
        SensitivityParameter::DaysInventory,
        SensitivityParameter::DaysPayables,
        SensitivityParameter::DividendPayout,
        SensitivityParameter::ShortTermInterestRate,
        SensitivityParameter::LongTermInterestRate,
        SensitivityParameter::Wacc,
        SensitivityParameter::PerpetualGrowthRate,
        SensitivityParameter::BaseRevenue,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::RevenueGrowth => "revenue_growth",
            Self::CogsMargin => "cogs_margin",
            Self::OpexMargin => "opex_margin",
            Self::CapexToSales => "capex_to_sales",
            Self::DepreciationRate => "depreciation_rate",
            Self::DaysReceivables => "days_receivables",
            Self::DaysInventory => "days_inventory",
            Self::DaysPayables => "days_payables",
            Self::DividendPayout => "dividend_payout",
            Self::ShortTermInterestRate => "short_term_interest_rate",
            Self::LongTermInterestRate => "long_term_interest_rate",
            Self::Wacc => "wacc",
            Self::PerpetualGrowthRate => "perpetual_growth_rate",
            Self::BaseRevenue => "base_revenue",
        }
    }

    /// Write `value` into the matching field of `input`.
    pub fn apply(&self, input: &mut ProjectionInput, value: Decimal) {
        match self {
            Self::RevenueGrowth => {
                for a in input.income_statement_assumptions.iter_mut() {
                    a.revenue_growth = value;
                }
            }
            Self::CogsMargin => {
                for a in input.income_statement_assumptions.iter_mut() {
                    a.cogs_margin = value;
                }
            }
            Self::OpexMargin => {
                for a in input.income_statement_assumptions.iter_mut() {
                    a.opex_margin = value;
                }
            }
            Self::CapexToSales => {
                for a in input.balance_sheet_assumptions.iter_mut() {
                    a.capex_to_sales = value;
                }
            }
            Self::DepreciationRate => {
                for a in input.balance_sheet_assumptions.iter_mut() {
                    a.depreciation_rate = value;
                }
            }
            Self::DaysReceivables => {
                for a in input.balance_sheet_assumptions.iter_mut() {
                    a.days_receivables = value;
                }
            }
            Self::DaysInventory => {
                for a in input.balance_sheet_assumptions.iter_mut() {
                    a.days_inventory = value;
                }
            }
            Self::DaysPayables => {
                for a in input.balance_sheet_assumptions.iter_mut() {
                    a.days_payables = value;
                }
            }
            Self::DividendPayout => {
                for a in input.balance_sheet_assumptions.iter_mut() {
                    a.dividend_payout = value;
                }
            }
            Self::ShortTermInterestRate => {
                for a in input.balance_sheet_assumptions.iter_mut() {
                    a.short_term_interest_rate = value;
                }
            }
            Self::LongTermInterestRate => {
                for a in input.balance_sheet_assumptions.iter_mut() {
                    a.long_term_interest_rate = value;
                }
            }
            Self::Wacc => input.discount_rate.wacc = value,
            Self::PerpetualGrowthRate => input.perpetual_growth_rate = value,
            Self::BaseRevenue => input.base.income_statement.revenue = value,
        }
    }
}

impl fmt::Display for SensitivityParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SensitivityParameter {
    type Err = ProformaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| ProformaError::InvalidInput {
                field: "parameter".into(),
                reason: format!(
                    "Unknown sensitivity parameter '{s}'. Expected one of: {}",
                    Self::ALL.map(|p| p.name()).join(", ")
                ),
            })
    }
}
