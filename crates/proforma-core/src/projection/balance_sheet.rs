use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::checked;
use crate::error::ProformaError;
use crate::financials::{
    BalanceSheetAccounts, BalanceSheetAssumption, BalanceSheetBase, CurrentAssets,
    CurrentLiabilities, Equity, LongTermAssets, LongTermLiabilities, BALANCE_TOLERANCE,
};
use crate::types::{Days, Money};
use crate::ProformaResult;

use super::income_statement::ProjectedIncomeStatement;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Commercial-year day count used for every working-capital account.
pub const DAYS_IN_YEAR: Decimal = dec!(360);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Balance sheet for one year, with the flows that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedBalanceSheet {
    pub year: i32,
    pub period: u32,
    pub accounts: BalanceSheetAccounts,
    pub net_ppe: Money,
    pub total_current_assets: Money,
    pub total_assets: Money,
    pub total_current_liabilities: Money,
    pub total_liabilities: Money,
    pub total_equity: Money,
    pub total_liabilities_and_equity: Money,
    pub capex: Money,
    pub depreciation: Money,
    pub interest_expense: Money,
    pub interest_income: Money,
    pub dividends: Money,
    /// Operating working capital (NCG) at year end
    pub working_capital: Money,
    /// Net investment in working capital versus the prior year
    pub change_in_working_capital: Money,
}

impl ProjectedBalanceSheet {
    /// Restate the base-year balance sheet in projected form (period 0).
    pub fn from_base(base: &BalanceSheetBase, year: i32) -> Self {
        Self::assemble(year, 0, base.clone(), Flows::default(), Decimal::ZERO)
    }

    pub fn total_debt(&self) -> Money {
        self.accounts.total_debt()
    }

    pub fn net_debt(&self) -> Money {
        self.accounts.net_debt()
    }

    /// Assets − (Liabilities + Equity)
    pub fn balance_difference(&self) -> Money {
        self.total_assets - self.total_liabilities_and_equity
    }

    fn assemble(
        year: i32,
        period: u32,
        accounts: BalanceSheetAccounts,
        flows: Flows,
        prior_working_capital: Money,
    ) -> Self {
        let working_capital = accounts.working_capital();
        let change_in_working_capital = if period == 0 {
            Decimal::ZERO
        } else {
            working_capital - prior_working_capital
        };
        Self {
            year,
            period,
            net_ppe: accounts.long_term_assets.net_ppe(),
            total_current_assets: accounts.current_assets.total(),
            total_assets: accounts.total_assets(),
            total_current_liabilities: accounts.current_liabilities.total(),
            total_liabilities: accounts.total_liabilities(),
            total_equity: accounts.equity.total(),
            total_liabilities_and_equity: accounts.total_liabilities_and_equity(),
            capex: flows.capex,
            depreciation: flows.depreciation,
            interest_expense: flows.interest_expense,
            interest_income: flows.interest_income,
            dividends: flows.dividends,
            working_capital,
            change_in_working_capital,
            accounts,
        }
    }
}

#[derive(Debug, Default)]
struct Flows {
    capex: Money,
    depreciation: Money,
    interest_expense: Money,
    interest_income: Money,
    dividends: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// `days / 360 × driver`
pub fn day_count_balance(days: Days, driver: Money) -> ProformaResult<Money> {
    Ok(checked::mul(driver, days, "working capital")? / DAYS_IN_YEAR)
}

/// Project one year of the balance sheet from the prior year, the same
/// year's income statement, and that year's assumptions.
///
/// Any funding surplus is parked in short-term investments and any shortfall
/// drawn on the revolving credit line, so the returned sheet balances. Call
/// [`check_balance`] to verify the accounting equation.
pub fn project_balance_sheet(
    previous: &ProjectedBalanceSheet,
    income_statement: &ProjectedIncomeStatement,
    assumption: &BalanceSheetAssumption,
) -> ProformaResult<ProjectedBalanceSheet> {
    let period = previous.period + 1;
    if income_statement.period != period {
        return Err(ProformaError::InvalidInput {
            field: "income_statement".into(),
            reason: format!(
                "Income statement is period {}, expected period {period}",
                income_statement.period
            ),
        });
    }
    if assumption.year != period {
        return Err(ProformaError::InvalidInput {
            field: "assumption".into(),
            reason: format!("Assumption is for year {}, expected year {period}", assumption.year),
        });
    }

    let prior = &previous.accounts;
    let revenue = income_statement.revenue;
    let cogs = income_statement.cost_of_goods_sold;
    let opex = income_statement.operating_expenses;

    // Working capital (day-count convention)
    let cash = day_count_balance(assumption.days_cash, revenue)?;
    let accounts_receivable = day_count_balance(assumption.days_receivables, revenue)?;
    let inventory = day_count_balance(assumption.days_inventory, cogs)?;
    let accounts_payable = day_count_balance(assumption.days_payables, cogs)?;
    let taxes_payable = day_count_balance(assumption.days_taxes_payable, revenue)?;
    let social_obligations = day_count_balance(assumption.days_social_obligations, opex)?;

    // Fixed assets
    let capex = checked::mul(revenue, assumption.capex_to_sales, "capex")?;
    let depreciation = checked::mul(
        prior.long_term_assets.gross_ppe,
        assumption.depreciation_rate,
        "depreciation",
    )?;
    let long_term_assets = LongTermAssets {
        gross_ppe: checked::add(prior.long_term_assets.gross_ppe, capex, "gross PP&E")?,
        accumulated_depreciation: checked::add(
            prior.long_term_assets.accumulated_depreciation,
            depreciation,
            "accumulated depreciation",
        )?,
        other_long_term_assets: prior.long_term_assets.other_long_term_assets,
    };

    // Scheduled debt
    let short_term_debt = checked::mul(
        prior.current_liabilities.short_term_debt,
        Decimal::ONE + assumption.short_term_new_debt_rate,
        "short-term debt",
    )?;
    let long_term_debt = checked::mul(
        prior.long_term_liabilities.long_term_debt,
        Decimal::ONE + assumption.long_term_new_debt_rate,
        "long-term debt",
    )?;
    let long_term_liabilities = LongTermLiabilities {
        long_term_debt,
        other_long_term_liabilities: prior.long_term_liabilities.other_long_term_liabilities,
    };

    // Equity
    let net_income = income_statement.net_income;
    let dividends = if net_income > Decimal::ZERO {
        checked::mul(net_income, assumption.dividend_payout, "dividends")?
    } else {
        Decimal::ZERO
    };
    let equity = Equity {
        share_capital: prior.equity.share_capital,
        retained_earnings: checked::add(
            prior.equity.retained_earnings,
            net_income - dividends,
            "retained earnings",
        )?,
    };

    // Balancing accounts
    let assets_before_plug = cash + accounts_receivable + inventory + long_term_assets.total();
    let claims_before_plug = accounts_payable
        + taxes_payable
        + social_obligations
        + short_term_debt
        + long_term_liabilities.total()
        + equity.total();
    let gap = claims_before_plug - assets_before_plug;
    let (short_term_investments, revolving_credit) = if gap >= Decimal::ZERO {
        (gap, Decimal::ZERO)
    } else {
        (Decimal::ZERO, -gap)
    };

    let interest_expense = checked::mul(
        short_term_debt + revolving_credit,
        assumption.short_term_interest_rate,
        "short-term interest",
    )? + checked::mul(long_term_debt, assumption.long_term_interest_rate, "long-term interest")?;
    let interest_income = checked::mul(
        short_term_investments,
        assumption.investment_yield,
        "interest income",
    )?;

    let accounts = BalanceSheetAccounts {
        current_assets: CurrentAssets {
            cash,
            short_term_investments,
            accounts_receivable,
            inventory,
        },
        long_term_assets,
        current_liabilities: CurrentLiabilities {
            accounts_payable,
            taxes_payable,
            social_obligations,
            short_term_debt,
            revolving_credit,
        },
        long_term_liabilities,
        equity,
    };

    Ok(ProjectedBalanceSheet::assemble(
        income_statement.year,
        period,
        accounts,
        Flows {
            capex,
            depreciation,
            interest_expense,
            interest_income,
            dividends,
        },
        previous.working_capital,
    ))
}

/// Verify Assets == Liabilities + Equity within [`BALANCE_TOLERANCE`].
pub fn check_balance(sheet: &ProjectedBalanceSheet) -> ProformaResult<()> {
    let assets = sheet.accounts.total_assets();
    let liabilities_and_equity = sheet.accounts.total_liabilities_and_equity();
    let difference = assets - liabilities_and_equity;
    if difference.abs() > BALANCE_TOLERANCE {
        return Err(ProformaError::BalanceMismatch {
            year: sheet.year,
            assets,
            liabilities_and_equity,
            difference,
        });
    }
    Ok(())
}

/// Project a balance sheet for every income statement, in order.
pub fn project_balance_sheets(
    base: &BalanceSheetBase,
    base_year: i32,
    income_statements: &[ProjectedIncomeStatement],
    assumptions: &[BalanceSheetAssumption],
) -> ProformaResult<Vec<ProjectedBalanceSheet>> {
    let mut sheets = Vec::with_capacity(income_statements.len());
    let mut previous = ProjectedBalanceSheet::from_base(base, base_year);

    for (idx, is) in income_statements.iter().enumerate() {
        let assumption = assumptions.get(idx).ok_or(ProformaError::InvalidYearIndex {
            index: idx,
            available: assumptions.len(),
        })?;
        let sheet = project_balance_sheet(&previous, is, assumption)?;
        sheets.push(sheet.clone());
        previous = sheet;
    }

    Ok(sheets)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
