use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::checked;
use crate::projection::balance_sheet::ProjectedBalanceSheet;
use crate::projection::income_statement::ProjectedIncomeStatement;
use crate::types::{Money, Multiple, Rate};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Financial ratios for one projected year. `None` marks a zero (or
/// vanishingly small) denominator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearIndicators {
    pub year: i32,
    pub period: u32,
    // Leverage
    pub total_debt: Money,
    pub net_debt: Money,
    pub debt_to_ebitda: Option<Multiple>,
    pub net_debt_to_ebitda: Option<Multiple>,
    // Coverage
    pub interest_coverage: Option<Multiple>,
    // Efficiency
    pub sales_to_fixed_assets: Option<Multiple>,
    pub working_capital_to_sales: Option<Rate>,
    // Liquidity
    pub current_ratio: Option<Multiple>,
    // Profitability
    pub gross_margin: Option<Rate>,
    pub ebitda_margin: Option<Rate>,
    pub net_margin: Option<Rate>,
    pub return_on_equity: Option<Rate>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn compute_indicators(
    income_statement: &ProjectedIncomeStatement,
    balance_sheet: &ProjectedBalanceSheet,
) -> YearIndicators {
    let revenue = income_statement.revenue;
    let ebitda = income_statement.ebitda;
    let total_debt = balance_sheet.total_debt();
    let net_debt = balance_sheet.net_debt();

    YearIndicators {
        year: income_statement.year,
        period: income_statement.period,
        total_debt,
        net_debt,
        debt_to_ebitda: ratio(total_debt, ebitda),
        net_debt_to_ebitda: ratio(net_debt, ebitda),
        interest_coverage: ratio(income_statement.ebit, income_statement.financial_expenses),
        sales_to_fixed_assets: ratio(revenue, balance_sheet.net_ppe),
        working_capital_to_sales: ratio(balance_sheet.working_capital, revenue),
        current_ratio: ratio(
            balance_sheet.total_current_assets,
            balance_sheet.total_current_liabilities,
        ),
        gross_margin: ratio(income_statement.gross_profit, revenue),
        ebitda_margin: ratio(ebitda, revenue),
        net_margin: ratio(income_statement.net_income, revenue),
        return_on_equity: ratio(income_statement.net_income, balance_sheet.total_equity),
    }
}

/// Indicators for each year of a resolved projection, paired by position.
pub fn compute_all_indicators(
    income_statements: &[ProjectedIncomeStatement],
    balance_sheets: &[ProjectedBalanceSheet],
) -> Vec<YearIndicators> {
    income_statements
        .iter()
        .zip(balance_sheets)
        .map(|(is, bs)| compute_indicators(is, bs))
        .collect()
}

fn ratio(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    // checked_div is None on a zero denominator
    numerator.checked_div(denominator).filter(|r| checked::within_range(*r))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::balance_sheet::project_balance_sheet;
    use crate::projection::income_statement::{project_income_statement, BalanceSheetFeed};
    use crate::test_support::{sample_base, sample_bs_assumptions, sample_is_assumptions};
    use rust_decimal_macros::dec;

    fn year1() -> (ProjectedIncomeStatement, ProjectedBalanceSheet) {
        let base = sample_base();
        let previous_is = ProjectedIncomeStatement::from_base(&base.income_statement);
        let feed = BalanceSheetFeed {
            depreciation: dec!(420000),
            interest_expense: dec!(200000),
            interest_income: dec!(20000),
        };
        let is = project_income_statement(
            &base.income_statement,
            &previous_is,
            &sample_is_assumptions(1),
            0,
            &feed,
        )
        .unwrap();
        let previous_bs = ProjectedBalanceSheet::from_base(&base.balance_sheet, 2025);
        let bs = project_balance_sheet(&previous_bs, &is, &sample_bs_assumptions(1)[0]).unwrap();
        (is, bs)
    }

    #[test]
    fn test_margins() {
        let (is, bs) = year1();
        let ind = compute_indicators(&is, &bs);

        // 4,800,000 / 12,000,000
        assert_eq!(ind.gross_margin, Some(dec!(0.4)));
        // 2,400,000 / 12,000,000
        assert_eq!(ind.ebitda_margin, Some(dec!(0.2)));
        // 1,188,000 / 12,000,000
        assert_eq!(ind.net_margin, Some(dec!(0.099)));
    }

    #[test]
    fn test_leverage_and_coverage() {
        let (is, bs) = year1();
        let ind = compute_indicators(&is, &bs);

        // Debt = 500,000 + 1,350,000
        assert_eq!(ind.total_debt, dec!(1850000));
        // 1,850,000 / 2,400,000
        assert!((ind.debt_to_ebitda.unwrap() - dec!(0.7708333)).abs() < dec!(0.00001));
        // Net debt = 1,850,000 - 600,000 - 521,000
        assert_eq!(ind.net_debt, dec!(729000));
        // EBIT 1,980,000 / interest 200,000
        assert_eq!(ind.interest_coverage, Some(dec!(9.9)));
    }

    #[test]
    fn test_efficiency() {
        let (is, bs) = year1();
        let ind = compute_indicators(&is, &bs);

        // 12,000,000 / 4,300,000
        assert!((ind.sales_to_fixed_assets.unwrap() - dec!(2.790697674)).abs() < dec!(0.000001));
        // 1,420,000 / 12,000,000
        assert!((ind.working_capital_to_sales.unwrap() - dec!(0.118333)).abs() < dec!(0.00001));
    }

    #[test]
    fn test_zero_interest_gives_no_coverage() {
        let (mut is, bs) = year1();
        is.financial_expenses = Decimal::ZERO;
        assert_eq!(compute_indicators(&is, &bs).interest_coverage, None);
    }

    #[test]
    fn test_zero_ebitda_gives_no_leverage_multiple() {
        let (mut is, bs) = year1();
        is.ebitda = Decimal::ZERO;
        let ind = compute_indicators(&is, &bs);
        assert_eq!(ind.debt_to_ebitda, None);
        assert_eq!(ind.net_debt_to_ebitda, None);
    }

    #[test]
    fn test_vanishing_ebitda_gives_no_leverage_multiple() {
        let (mut is, bs) = year1();
        is.ebitda = dec!(0.0000000000000000000000000001);
        assert_eq!(compute_indicators(&is, &bs).debt_to_ebitda, None);
    }
}
