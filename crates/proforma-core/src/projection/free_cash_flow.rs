use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ProformaError;
use crate::types::Money;
use crate::ProformaResult;

use super::balance_sheet::ProjectedBalanceSheet;
use super::income_statement::ProjectedIncomeStatement;

/// Unlevered free cash flow for one projected year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedFreeCashFlow {
    pub year: i32,
    pub period: u32,
    pub ebit: Money,
    pub operating_taxes: Money,
    pub nopat: Money,
    pub plus_depreciation: Money,
    pub less_capex: Money,
    pub less_working_capital_change: Money,
    pub fcff: Money,
}

/// FCFF = EBIT × (1 − t) + D&A − CapEx − ΔNWC
///
/// Both statements must belong to the same resolved year.
pub fn calculate_free_cash_flow(
    income_statement: &ProjectedIncomeStatement,
    balance_sheet: &ProjectedBalanceSheet,
) -> ProformaResult<ProjectedFreeCashFlow> {
    if income_statement.period != balance_sheet.period {
        return Err(ProformaError::InvalidInput {
            field: "balance_sheet".into(),
            reason: format!(
                "Income statement period {} does not match balance sheet period {}",
                income_statement.period, balance_sheet.period
            ),
        });
    }

    let ebit = income_statement.ebit;
    let nopat = ebit * (Decimal::ONE - income_statement.effective_tax_rate);
    let fcff = nopat + balance_sheet.depreciation
        - balance_sheet.capex
        - balance_sheet.change_in_working_capital;

    Ok(ProjectedFreeCashFlow {
        year: income_statement.year,
        period: income_statement.period,
        ebit,
        operating_taxes: ebit - nopat,
        nopat,
        plus_depreciation: balance_sheet.depreciation,
        less_capex: balance_sheet.capex,
        less_working_capital_change: balance_sheet.change_in_working_capital,
        fcff,
    })
}

/// Pair up statements year by year.
pub fn calculate_free_cash_flows(
    income_statements: &[ProjectedIncomeStatement],
    balance_sheets: &[ProjectedBalanceSheet],
) -> ProformaResult<Vec<ProjectedFreeCashFlow>> {
    if income_statements.len() != balance_sheets.len() {
        return Err(ProformaError::InvalidInput {
            field: "balance_sheets".into(),
            reason: format!(
                "{} income statements but {} balance sheets",
                income_statements.len(),
                balance_sheets.len()
            ),
        });
    }
    income_statements
        .iter()
        .zip(balance_sheets)
        .map(|(is, bs)| calculate_free_cash_flow(is, bs))
        .collect()
}
