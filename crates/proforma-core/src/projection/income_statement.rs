use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::checked;
use crate::error::ProformaError;
use crate::financials::{IncomeStatementAssumption, IncomeStatementBase};
use crate::types::{Money, Rate};
use crate::ProformaResult;

use super::balance_sheet::ProjectedBalanceSheet;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Values the balance sheet feeds back into the income statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheetFeed {
    pub depreciation: Money,
    pub interest_expense: Money,
    pub interest_income: Money,
}

impl BalanceSheetFeed {
    /// Zero interest and zero depreciation: the first resolution pass.
    pub fn cold_start() -> Self {
        Self::default()
    }

    pub fn from_balance_sheet(sheet: &ProjectedBalanceSheet) -> Self {
        Self {
            depreciation: sheet.depreciation,
            interest_expense: sheet.interest_expense,
            interest_income: sheet.interest_income,
        }
    }

    /// Largest absolute change in any fed-back value.
    pub fn max_abs_change(&self, other: &BalanceSheetFeed) -> Decimal {
        (self.depreciation - other.depreciation)
            .abs()
            .max((self.interest_expense - other.interest_expense).abs())
            .max((self.interest_income - other.interest_income).abs())
    }
}

/// Income statement for one year. `period` 0 is the base year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedIncomeStatement {
    pub year: i32,
    pub period: u32,
    pub revenue: Money,
    pub revenue_growth: Rate,
    pub cost_of_goods_sold: Money,
    pub gross_profit: Money,
    pub operating_expenses: Money,
    pub ebitda: Money,
    pub depreciation: Money,
    pub ebit: Money,
    pub financial_expenses: Money,
    pub financial_income: Money,
    pub pre_tax_income: Money,
    pub effective_tax_rate: Rate,
    pub income_tax: Money,
    pub net_income: Money,
}

impl ProjectedIncomeStatement {
    /// Restate the base-year actuals in projected form (period 0).
    pub fn from_base(base: &IncomeStatementBase) -> Self {
        Self {
            year: base.year,
            period: 0,
            revenue: base.revenue,
            revenue_growth: Decimal::ZERO,
            cost_of_goods_sold: base.cost_of_goods_sold,
            gross_profit: base.gross_profit(),
            operating_expenses: base.operating_expenses,
            ebitda: base.ebitda(),
            depreciation: base.depreciation,
            ebit: base.ebit(),
            financial_expenses: base.financial_expenses,
            financial_income: base.financial_income,
            pre_tax_income: base.pre_tax_income(),
            effective_tax_rate: base.effective_tax_rate(),
            income_tax: base.income_tax,
            net_income: base.net_income(),
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Project one year of the income statement.
///
/// Revenue is always rebuilt from the base year through the cumulative
/// growth factor so repeated passes never compound rounding. The effective
/// tax rate is taken from `previous`, which carries the base-year rate.
pub fn project_income_statement(
    base: &IncomeStatementBase,
    previous: &ProjectedIncomeStatement,
    assumptions: &[IncomeStatementAssumption],
    year_index: usize,
    feed: &BalanceSheetFeed,
) -> ProformaResult<ProjectedIncomeStatement> {
    let assumption = assumptions
        .get(year_index)
        .ok_or(ProformaError::InvalidYearIndex {
            index: year_index,
            available: assumptions.len(),
        })?;

    if previous.period as usize != year_index {
        return Err(ProformaError::InvalidInput {
            field: "previous".into(),
            reason: format!(
                "Previous statement is period {}, expected period {year_index}",
                previous.period
            ),
        });
    }

    let revenue = checked::mul(
        base.revenue,
        cumulative_growth_factor(assumptions, year_index)?,
        "revenue",
    )?;
    let cost_of_goods_sold = checked::mul(revenue, assumption.cogs_margin, "cost of goods sold")?;
    let gross_profit = revenue - cost_of_goods_sold;
    let operating_expenses = checked::mul(revenue, assumption.opex_margin, "operating expenses")?;
    let ebitda = gross_profit - operating_expenses;
    let ebit = ebitda - feed.depreciation;

    let pre_tax_income = ebit - feed.interest_expense + feed.interest_income;
    let effective_tax_rate = previous.effective_tax_rate;
    let income_tax = if pre_tax_income > Decimal::ZERO {
        checked::mul(pre_tax_income, effective_tax_rate, "income tax")?
    } else {
        Decimal::ZERO
    };
    let net_income = pre_tax_income - income_tax;

    Ok(ProjectedIncomeStatement {
        year: previous.year + 1,
        period: previous.period + 1,
        revenue,
        revenue_growth: assumption.revenue_growth,
        cost_of_goods_sold,
        gross_profit,
        operating_expenses,
        ebitda,
        depreciation: feed.depreciation,
        ebit,
        financial_expenses: feed.interest_expense,
        financial_income: feed.interest_income,
        pre_tax_income,
        effective_tax_rate,
        income_tax,
        net_income,
    })
}

/// Project every year in `0..feeds.len()`, chaining each year's output as
/// the next year's `previous`.
pub fn project_income_statements(
    base: &IncomeStatementBase,
    assumptions: &[IncomeStatementAssumption],
    feeds: &[BalanceSheetFeed],
) -> ProformaResult<Vec<ProjectedIncomeStatement>> {
    let mut statements = Vec::with_capacity(feeds.len());
    let mut previous = ProjectedIncomeStatement::from_base(base);

    for (year_index, feed) in feeds.iter().enumerate() {
        let statement = project_income_statement(base, &previous, assumptions, year_index, feed)?;
        statements.push(statement.clone());
        previous = statement;
    }

    Ok(statements)
}

/// Π (1 + growth_i) for i in 0..=year_index. Fails with `Overflow` once the
/// factor leaves the supported range.
pub fn cumulative_growth_factor(
    assumptions: &[IncomeStatementAssumption],
    year_index: usize,
) -> ProformaResult<Decimal> {
    assumptions
        .iter()
        .take(year_index + 1)
        .try_fold(Decimal::ONE, |acc, a| {
            checked::mul(acc, Decimal::ONE + a.revenue_growth, "revenue growth factor")
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_base, sample_is_assumptions};
    use rust_decimal_macros::dec;

    fn feed(depreciation: Money, interest_expense: Money, interest_income: Money) -> BalanceSheetFeed {
        BalanceSheetFeed {
            depreciation,
            interest_expense,
            interest_income,
        }
    }

    #[test]
    fn test_year1_revenue_from_20pct_growth() {
        let base = sample_base().income_statement;
        let assumptions = sample_is_assumptions(5);
        let previous = ProjectedIncomeStatement::from_base(&base);

        let is = project_income_statement(&base, &previous, &assumptions, 0, &BalanceSheetFeed::cold_start())
            .unwrap();

        // 10,000,000 * 1.20 = 12,000,000
        assert_eq!(is.revenue, dec!(12000000));
        assert_eq!(is.year, 2026);
        assert_eq!(is.period, 1);
    }

    #[test]
    fn test_cascade_with_feed() {
        let base = sample_base().income_statement;
        let assumptions = sample_is_assumptions(5);
        let previous = ProjectedIncomeStatement::from_base(&base);

        let is = project_income_statement(
            &base,
            &previous,
            &assumptions,
            0,
            &feed(dec!(420000), dec!(200000), dec!(20000)),
        )
        .unwrap();

        // COGS = 12,000,000 * 0.60
        assert_eq!(is.cost_of_goods_sold, dec!(7200000));
        assert_eq!(is.gross_profit, dec!(4800000));
        // Opex = 12,000,000 * 0.20
        assert_eq!(is.operating_expenses, dec!(2400000));
        assert_eq!(is.ebitda, dec!(2400000));
        // EBIT = 2,400,000 - 420,000
        assert_eq!(is.ebit, dec!(1980000));
        // EBT = 1,980,000 - 200,000 + 20,000
        assert_eq!(is.pre_tax_income, dec!(1800000));
        // Tax at the base-year 34%
        assert_eq!(is.income_tax, dec!(612000));
        assert_eq!(is.net_income, dec!(1188000));
    }

    #[test]
    fn test_cold_start_has_no_interest_or_depreciation() {
        let base = sample_base().income_statement;
        let assumptions = sample_is_assumptions(1);
        let previous = ProjectedIncomeStatement::from_base(&base);

        let is = project_income_statement(&base, &previous, &assumptions, 0, &BalanceSheetFeed::cold_start())
            .unwrap();

        assert_eq!(is.depreciation, Decimal::ZERO);
        assert_eq!(is.financial_expenses, Decimal::ZERO);
        assert_eq!(is.ebit, is.ebitda);
    }

    #[test]
    fn test_revenue_recomputed_from_base() {
        let base = sample_base().income_statement;
        let assumptions = sample_is_assumptions(3);
        let feeds = vec![BalanceSheetFeed::cold_start(); 3];

        let statements = project_income_statements(&base, &assumptions, &feeds).unwrap();

        assert_eq!(statements[0].revenue, dec!(12000000));
        // 10,000,000 * 1.20 * 1.10
        assert_eq!(statements[1].revenue, dec!(13200000));
        // 10,000,000 * 1.20 * 1.10 * 1.08
        assert_eq!(statements[2].revenue, dec!(14256000));
    }

    #[test]
    fn test_revenue_strictly_increasing_under_positive_growth() {
        let base = sample_base().income_statement;
        let assumptions = sample_is_assumptions(10);
        let feeds = vec![BalanceSheetFeed::cold_start(); 10];

        let statements = project_income_statements(&base, &assumptions, &feeds).unwrap();
        for pair in statements.windows(2) {
            assert!(pair[1].revenue > pair[0].revenue);
        }
    }

    #[test]
    fn test_tax_rate_carried_from_base() {
        let base = sample_base().income_statement;
        let assumptions = sample_is_assumptions(4);
        let feeds = vec![feed(dec!(300000), dec!(100000), dec!(0)); 4];

        let statements = project_income_statements(&base, &assumptions, &feeds).unwrap();
        for is in &statements {
            assert_eq!(is.effective_tax_rate, dec!(0.34));
        }
    }

    #[test]
    fn test_no_tax_on_pre_tax_loss() {
        let base = sample_base().income_statement;
        let assumptions = sample_is_assumptions(1);
        let previous = ProjectedIncomeStatement::from_base(&base);

        let is = project_income_statement(
            &base,
            &previous,
            &assumptions,
            0,
            &feed(dec!(1000000), dec!(2000000), dec!(0)),
        )
        .unwrap();

        assert!(is.pre_tax_income < Decimal::ZERO);
        assert_eq!(is.income_tax, Decimal::ZERO);
        assert_eq!(is.net_income, is.pre_tax_income);
    }

    #[test]
    fn test_year_index_out_of_bounds() {
        let base = sample_base().income_statement;
        let assumptions = sample_is_assumptions(3);
        let previous = ProjectedIncomeStatement::from_base(&base);

        let result = project_income_statement(&base, &previous, &assumptions, 3, &BalanceSheetFeed::cold_start());
        assert_eq!(
            result.unwrap_err(),
            ProformaError::InvalidYearIndex {
                index: 3,
                available: 3
            }
        );
    }

    #[test]
    fn test_previous_period_must_match_index() {
        let base = sample_base().income_statement;
        let assumptions = sample_is_assumptions(3);
        let previous = ProjectedIncomeStatement::from_base(&base);

        let result = project_income_statement(&base, &previous, &assumptions, 1, &BalanceSheetFeed::cold_start());
        assert!(matches!(result, Err(ProformaError::InvalidInput { .. })));
    }

    #[test]
    fn test_runaway_growth_is_an_overflow_error() {
        let base = sample_base().income_statement;
        let mut assumptions = sample_is_assumptions(10);
        for a in assumptions.iter_mut() {
            a.revenue_growth = dec!(1000);
        }
        let feeds = vec![BalanceSheetFeed::cold_start(); 10];

        // 1001^10 overflows long before revenue is multiplied in
        let result = project_income_statements(&base, &assumptions, &feeds);
        assert!(matches!(result, Err(ProformaError::Overflow { .. })));
        assert!(cumulative_growth_factor(&assumptions, 9).is_err());
        assert_eq!(cumulative_growth_factor(&assumptions, 0).unwrap(), dec!(1001));
    }

    #[test]
    fn test_feed_max_abs_change() {
        let a = feed(dec!(100), dec!(50), dec!(5));
        let b = feed(dec!(100), dec!(47), dec!(9));
        assert_eq!(a.max_abs_change(&b), dec!(4));
    }
}
