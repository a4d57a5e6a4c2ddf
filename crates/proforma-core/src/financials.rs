//! Base-year actuals and per-year projection assumptions.
//!
//! These are the plain records the engine consumes. Nothing here is mutated
//! by a projection run; every projected year is derived from them afresh.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::checked;
use crate::error::ProformaError;
use crate::types::{Days, Money, Rate};
use crate::ProformaResult;

/// Maximum |Assets − (Liabilities + Equity)| accepted for any balance sheet.
pub const BALANCE_TOLERANCE: Decimal = dec!(0.01);

// ---------------------------------------------------------------------------
// Income statement (base year)
// ---------------------------------------------------------------------------

/// Year-0 income statement actuals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatementBase {
    pub year: i32,
    pub revenue: Money,
    pub cost_of_goods_sold: Money,
    pub operating_expenses: Money,
    pub depreciation: Money,
    pub financial_expenses: Money,
    #[serde(default)]
    pub financial_income: Money,
    pub income_tax: Money,
}

impl IncomeStatementBase {
    pub fn gross_profit(&self) -> Money {
        self.revenue - self.cost_of_goods_sold
    }

    pub fn ebitda(&self) -> Money {
        self.gross_profit() - self.operating_expenses
    }

    pub fn ebit(&self) -> Money {
        self.ebitda() - self.depreciation
    }

    pub fn pre_tax_income(&self) -> Money {
        self.ebit() - self.financial_expenses + self.financial_income
    }

    pub fn net_income(&self) -> Money {
        self.pre_tax_income() - self.income_tax
    }

    /// Income tax over pre-tax income. Zero when the base year made no
    /// taxable profit, since no rate can be observed.
    pub fn effective_tax_rate(&self) -> Rate {
        let pre_tax = self.pre_tax_income();
        if pre_tax <= Decimal::ZERO {
            Decimal::ZERO
        } else {
            self.income_tax / pre_tax
        }
    }
}

// ---------------------------------------------------------------------------
// Balance sheet groups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentAssets {
    pub cash: Money,
    /// Surplus funds; balancing account on the asset side.
    #[serde(default)]
    pub short_term_investments: Money,
    pub accounts_receivable: Money,
    pub inventory: Money,
}

impl CurrentAssets {
    pub fn total(&self) -> Money {
        self.cash + self.short_term_investments + self.accounts_receivable + self.inventory
    }

    /// Operating current assets: everything except cash and investments.
    pub fn operating(&self) -> Money {
        self.accounts_receivable + self.inventory
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongTermAssets {
    pub gross_ppe: Money,
    pub accumulated_depreciation: Money,
    #[serde(default)]
    pub other_long_term_assets: Money,
}

impl LongTermAssets {
    pub fn net_ppe(&self) -> Money {
        self.gross_ppe - self.accumulated_depreciation
    }

    pub fn total(&self) -> Money {
        self.net_ppe() + self.other_long_term_assets
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentLiabilities {
    pub accounts_payable: Money,
    pub taxes_payable: Money,
    pub social_obligations: Money,
    pub short_term_debt: Money,
    /// Funding shortfall; balancing account on the liability side.
    #[serde(default)]
    pub revolving_credit: Money,
}

impl CurrentLiabilities {
    pub fn total(&self) -> Money {
        self.operating() + self.short_term_debt + self.revolving_credit
    }

    /// Operating current liabilities: everything except debt.
    pub fn operating(&self) -> Money {
        self.accounts_payable + self.taxes_payable + self.social_obligations
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongTermLiabilities {
    pub long_term_debt: Money,
    #[serde(default)]
    pub other_long_term_liabilities: Money,
}

impl LongTermLiabilities {
    pub fn total(&self) -> Money {
        self.long_term_debt + self.other_long_term_liabilities
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equity {
    pub share_capital: Money,
    pub retained_earnings: Money,
}

impl Equity {
    pub fn total(&self) -> Money {
        self.share_capital + self.retained_earnings
    }
}

/// Account balances grouped the way the statement is presented. Used both
/// for the base year and inside every projected balance sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheetAccounts {
    pub current_assets: CurrentAssets,
    pub long_term_assets: LongTermAssets,
    pub current_liabilities: CurrentLiabilities,
    pub long_term_liabilities: LongTermLiabilities,
    pub equity: Equity,
}

/// Year-0 balance sheet actuals.
pub type BalanceSheetBase = BalanceSheetAccounts;

impl BalanceSheetAccounts {
    pub fn total_assets(&self) -> Money {
        self.current_assets.total() + self.long_term_assets.total()
    }

    pub fn total_liabilities(&self) -> Money {
        self.current_liabilities.total() + self.long_term_liabilities.total()
    }

    pub fn total_liabilities_and_equity(&self) -> Money {
        self.total_liabilities() + self.equity.total()
    }

    pub fn total_debt(&self) -> Money {
        self.current_liabilities.short_term_debt
            + self.current_liabilities.revolving_credit
            + self.long_term_liabilities.long_term_debt
    }

    /// Total debt less cash and short-term investments.
    pub fn net_debt(&self) -> Money {
        self.total_debt()
            - self.current_assets.cash
            - self.current_assets.short_term_investments
    }

    /// Operating working capital (NCG): operating current assets less
    /// operating current liabilities.
    pub fn working_capital(&self) -> Money {
        self.current_assets.operating() - self.current_liabilities.operating()
    }
}

/// Immutable year-0 snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseFinancials {
    pub income_statement: IncomeStatementBase,
    pub balance_sheet: BalanceSheetBase,
}

// ---------------------------------------------------------------------------
// Assumptions
// ---------------------------------------------------------------------------

/// Income statement drivers for one projected year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatementAssumption {
    /// 1-indexed projection year
    pub year: u32,
    pub revenue_growth: Rate,
    /// COGS as % of revenue
    pub cogs_margin: Rate,
    /// Operating expenses as % of revenue
    pub opex_margin: Rate,
}

/// Balance sheet drivers for one projected year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheetAssumption {
    /// 1-indexed projection year
    pub year: u32,
    /// Operating cash, days of revenue
    pub days_cash: Days,
    /// Receivables, days of revenue
    pub days_receivables: Days,
    /// Inventory, days of COGS
    pub days_inventory: Days,
    /// Payables, days of COGS
    pub days_payables: Days,
    /// Taxes payable, days of revenue
    pub days_taxes_payable: Days,
    /// Payroll and social charges payable, days of operating expenses
    pub days_social_obligations: Days,
    pub capex_to_sales: Rate,
    /// Applied to beginning gross PP&E
    pub depreciation_rate: Rate,
    /// Growth of the short-term debt balance (negative = repayment)
    pub short_term_new_debt_rate: Rate,
    /// Growth of the long-term debt balance (negative = repayment)
    pub long_term_new_debt_rate: Rate,
    pub short_term_interest_rate: Rate,
    pub long_term_interest_rate: Rate,
    /// Yield earned on short-term investments
    #[serde(default)]
    pub investment_yield: Rate,
    /// Dividends as % of positive net income
    #[serde(default)]
    pub dividend_payout: Rate,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate the base-year snapshot, collecting every problem found.
pub fn validate_base(base: &BaseFinancials) -> ProformaResult<()> {
    let mut errors = Vec::new();
    let is = &base.income_statement;
    let bs = &base.balance_sheet;

    let non_negative = [
        ("income_statement.revenue", is.revenue),
        ("income_statement.cost_of_goods_sold", is.cost_of_goods_sold),
        ("income_statement.operating_expenses", is.operating_expenses),
        ("income_statement.depreciation", is.depreciation),
        ("income_statement.financial_expenses", is.financial_expenses),
        ("income_statement.financial_income", is.financial_income),
        ("balance_sheet.current_assets.cash", bs.current_assets.cash),
        (
            "balance_sheet.current_assets.short_term_investments",
            bs.current_assets.short_term_investments,
        ),
        (
            "balance_sheet.current_assets.accounts_receivable",
            bs.current_assets.accounts_receivable,
        ),
        ("balance_sheet.current_assets.inventory", bs.current_assets.inventory),
        ("balance_sheet.long_term_assets.gross_ppe", bs.long_term_assets.gross_ppe),
        (
            "balance_sheet.long_term_assets.accumulated_depreciation",
            bs.long_term_assets.accumulated_depreciation,
        ),
        (
            "balance_sheet.long_term_assets.other_long_term_assets",
            bs.long_term_assets.other_long_term_assets,
        ),
        (
            "balance_sheet.current_liabilities.accounts_payable",
            bs.current_liabilities.accounts_payable,
        ),
        (
            "balance_sheet.current_liabilities.taxes_payable",
            bs.current_liabilities.taxes_payable,
        ),
        (
            "balance_sheet.current_liabilities.social_obligations",
            bs.current_liabilities.social_obligations,
        ),
        (
            "balance_sheet.current_liabilities.short_term_debt",
            bs.current_liabilities.short_term_debt,
        ),
        (
            "balance_sheet.current_liabilities.revolving_credit",
            bs.current_liabilities.revolving_credit,
        ),
        (
            "balance_sheet.long_term_liabilities.long_term_debt",
            bs.long_term_liabilities.long_term_debt,
        ),
        (
            "balance_sheet.long_term_liabilities.other_long_term_liabilities",
            bs.long_term_liabilities.other_long_term_liabilities,
        ),
        ("balance_sheet.equity.share_capital", bs.equity.share_capital),
    ];
    let signed = [
        ("income_statement.income_tax", is.income_tax),
        ("balance_sheet.equity.retained_earnings", bs.equity.retained_earnings),
    ];
    for (field, value) in non_negative.iter().chain(signed.iter()) {
        if !checked::within_range(*value) {
            errors.push(ProformaError::InvalidBaseInput {
                field: (*field).into(),
                reason: format!("Magnitude exceeds {}", checked::MAX_MAGNITUDE),
            });
        }
    }
    // Derived totals below assume in-range lines
    if !errors.is_empty() {
        return ProformaError::from_collected(errors);
    }

    for (field, value) in non_negative {
        if value < Decimal::ZERO {
            errors.push(ProformaError::InvalidBaseInput {
                field: field.into(),
                reason: format!("Value must be non-negative, got {value}"),
            });
        }
    }

    let pre_tax_income = is.pre_tax_income();
    if pre_tax_income > Decimal::ZERO
        && (is.income_tax < Decimal::ZERO || is.income_tax > pre_tax_income)
    {
        errors.push(ProformaError::InvalidBaseInput {
            field: "income_statement.income_tax".into(),
            reason: format!(
                "Income tax ({}) must lie between zero and pre-tax income ({pre_tax_income})",
                is.income_tax
            ),
        });
    }

    if bs.long_term_assets.accumulated_depreciation > bs.long_term_assets.gross_ppe {
        errors.push(ProformaError::InvalidBaseInput {
            field: "balance_sheet.long_term_assets.accumulated_depreciation".into(),
            reason: format!(
                "Accumulated depreciation ({}) exceeds gross PP&E ({})",
                bs.long_term_assets.accumulated_depreciation, bs.long_term_assets.gross_ppe
            ),
        });
    }

    let difference = bs.total_assets() - bs.total_liabilities_and_equity();
    if difference.abs() > BALANCE_TOLERANCE {
        errors.push(ProformaError::InvalidBaseInput {
            field: "balance_sheet".into(),
            reason: format!(
                "Base balance sheet does not balance: assets {}, liabilities + equity {}",
                bs.total_assets(),
                bs.total_liabilities_and_equity()
            ),
        });
    }

    ProformaError::from_collected(errors)
}

/// Check both assumption sequences cover `horizon` years.
pub fn validate_horizon(
    is_assumptions: &[IncomeStatementAssumption],
    bs_assumptions: &[BalanceSheetAssumption],
    horizon: usize,
) -> ProformaResult<()> {
    if horizon == 0 {
        return Err(ProformaError::InvalidInput {
            field: "horizon_years".into(),
            reason: "Projection horizon must be at least one year".into(),
        });
    }
    if is_assumptions.len() < horizon {
        return Err(ProformaError::InsufficientAssumptions {
            sequence: "income_statement_assumptions".into(),
            available: is_assumptions.len(),
            required: horizon,
        });
    }
    if bs_assumptions.len() < horizon {
        return Err(ProformaError::InsufficientAssumptions {
            sequence: "balance_sheet_assumptions".into(),
            available: bs_assumptions.len(),
            required: horizon,
        });
    }
    Ok(())
}

/// Validate the assumption entries used within `horizon`, collecting every
/// problem found.
pub fn validate_assumptions(
    is_assumptions: &[IncomeStatementAssumption],
    bs_assumptions: &[BalanceSheetAssumption],
    horizon: usize,
) -> ProformaResult<()> {
    let mut errors = Vec::new();

    for (idx, a) in is_assumptions.iter().take(horizon).enumerate() {
        let prefix = format!("income_statement_assumptions[{idx}]");
        check_year_tag(&mut errors, &prefix, a.year, idx);
        if a.revenue_growth <= dec!(-1) {
            errors.push(ProformaError::InvalidInput {
                field: format!("{prefix}.revenue_growth"),
                reason: format!("Growth must be greater than -100%, got {}", a.revenue_growth),
            });
        }
        check_unit_rate(&mut errors, &prefix, "cogs_margin", a.cogs_margin);
        check_unit_rate(&mut errors, &prefix, "opex_margin", a.opex_margin);
    }

    for (idx, a) in bs_assumptions.iter().take(horizon).enumerate() {
        let prefix = format!("balance_sheet_assumptions[{idx}]");
        check_year_tag(&mut errors, &prefix, a.year, idx);
        for (name, days) in [
            ("days_cash", a.days_cash),
            ("days_receivables", a.days_receivables),
            ("days_inventory", a.days_inventory),
            ("days_payables", a.days_payables),
            ("days_taxes_payable", a.days_taxes_payable),
            ("days_social_obligations", a.days_social_obligations),
        ] {
            if days < Decimal::ZERO {
                errors.push(ProformaError::InvalidInput {
                    field: format!("{prefix}.{name}"),
                    reason: format!("Day count must be non-negative, got {days}"),
                });
            }
        }
        check_unit_rate(&mut errors, &prefix, "capex_to_sales", a.capex_to_sales);
        check_unit_rate(&mut errors, &prefix, "depreciation_rate", a.depreciation_rate);
        check_unit_rate(&mut errors, &prefix, "short_term_interest_rate", a.short_term_interest_rate);
        check_unit_rate(&mut errors, &prefix, "long_term_interest_rate", a.long_term_interest_rate);
        check_unit_rate(&mut errors, &prefix, "investment_yield", a.investment_yield);
        check_unit_rate(&mut errors, &prefix, "dividend_payout", a.dividend_payout);
        for (name, rate) in [
            ("short_term_new_debt_rate", a.short_term_new_debt_rate),
            ("long_term_new_debt_rate", a.long_term_new_debt_rate),
        ] {
            if rate < dec!(-1) {
                errors.push(ProformaError::InvalidInput {
                    field: format!("{prefix}.{name}"),
                    reason: format!("Cannot repay more than the outstanding balance, got {rate}"),
                });
            }
        }
    }

    ProformaError::from_collected(errors)
}

fn check_year_tag(errors: &mut Vec<ProformaError>, prefix: &str, year: u32, idx: usize) {
    if year as usize != idx + 1 {
        errors.push(ProformaError::InvalidInput {
            field: format!("{prefix}.year"),
            reason: format!("Expected year {}, got {year}", idx + 1),
        });
    }
}

fn check_unit_rate(errors: &mut Vec<ProformaError>, prefix: &str, name: &str, value: Rate) {
    if value < Decimal::ZERO || value > Decimal::ONE {
        errors.push(ProformaError::InvalidInput {
            field: format!("{prefix}.{name}"),
            reason: format!("Rate must be between 0 and 1, got {value}"),
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_base, sample_bs_assumptions, sample_is_assumptions};

    #[test]
    fn test_base_derived_lines() {
        let is = sample_base().income_statement;
        // 10,000,000 - 6,000,000 = 4,000,000
        assert_eq!(is.gross_profit(), dec!(4000000));
        // 4,000,000 - 2,000,000 = 2,000,000
        assert_eq!(is.ebitda(), dec!(2000000));
        // 2,000,000 - 400,000 = 1,600,000
        assert_eq!(is.ebit(), dec!(1600000));
        // 1,600,000 - 240,000 + 40,000 = 1,400,000
        assert_eq!(is.pre_tax_income(), dec!(1400000));
        // 476,000 / 1,400,000 = 0.34
        assert_eq!(is.effective_tax_rate(), dec!(0.34));
        assert_eq!(is.net_income(), dec!(924000));
    }

    #[test]
    fn test_effective_tax_rate_zero_on_loss() {
        let mut is = sample_base().income_statement;
        is.operating_expenses = dec!(5000000);
        is.income_tax = Decimal::ZERO;
        assert!(is.pre_tax_income() < Decimal::ZERO);
        assert_eq!(is.effective_tax_rate(), Decimal::ZERO);
    }

    #[test]
    fn test_sample_base_balances() {
        let bs = sample_base().balance_sheet;
        assert_eq!(bs.total_assets(), bs.total_liabilities_and_equity());
        assert!(validate_base(&sample_base()).is_ok());
    }

    #[test]
    fn test_working_capital_excludes_cash_and_debt() {
        let bs = sample_base().balance_sheet;
        let expected = bs.current_assets.accounts_receivable + bs.current_assets.inventory
            - bs.current_liabilities.accounts_payable
            - bs.current_liabilities.taxes_payable
            - bs.current_liabilities.social_obligations;
        assert_eq!(bs.working_capital(), expected);
    }

    #[test]
    fn test_negative_revenue_rejected() {
        let mut base = sample_base();
        base.income_statement.revenue = dec!(-1);
        match validate_base(&base).unwrap_err() {
            ProformaError::InvalidBaseInput { field, .. } => {
                assert_eq!(field, "income_statement.revenue");
            }
            e => panic!("Expected InvalidBaseInput, got {e:?}"),
        }
    }

    #[test]
    fn test_multiple_base_errors_collected() {
        let mut base = sample_base();
        base.income_statement.revenue = dec!(-1);
        base.balance_sheet.current_assets.cash += dec!(1000);
        let err = validate_base(&base).unwrap_err();
        assert_eq!(err.descriptions().len(), 2);
    }

    #[test]
    fn test_tax_above_pre_tax_income_rejected() {
        let mut base = sample_base();
        // Pre-tax income is 1,400,000
        base.income_statement.income_tax = dec!(1500000);
        match validate_base(&base).unwrap_err() {
            ProformaError::InvalidBaseInput { field, .. } => {
                assert_eq!(field, "income_statement.income_tax");
            }
            e => panic!("Expected InvalidBaseInput, got {e:?}"),
        }
    }

    #[test]
    fn test_out_of_range_base_line_rejected_before_totals() {
        let mut base = sample_base();
        base.balance_sheet.long_term_assets.gross_ppe = Decimal::MAX;
        base.balance_sheet.equity.share_capital = Decimal::MAX;
        let err = validate_base(&base).unwrap_err();
        assert_eq!(err.descriptions().len(), 2);
        assert!(err.descriptions()[0].contains("Magnitude exceeds"));
    }

    #[test]
    fn test_unbalanced_base_rejected() {
        let mut base = sample_base();
        base.balance_sheet.current_assets.inventory += dec!(5);
        assert!(matches!(
            validate_base(&base),
            Err(ProformaError::InvalidBaseInput { ref field, .. }) if field == "balance_sheet"
        ));
    }

    #[test]
    fn test_horizon_exceeds_assumptions() {
        let is = sample_is_assumptions(2);
        let bs = sample_bs_assumptions(5);
        match validate_horizon(&is, &bs, 5).unwrap_err() {
            ProformaError::InsufficientAssumptions {
                sequence,
                available,
                required,
            } => {
                assert_eq!(sequence, "income_statement_assumptions");
                assert_eq!(available, 2);
                assert_eq!(required, 5);
            }
            e => panic!("Expected InsufficientAssumptions, got {e:?}"),
        }
    }

    #[test]
    fn test_zero_horizon_rejected() {
        let is = sample_is_assumptions(3);
        let bs = sample_bs_assumptions(3);
        assert!(validate_horizon(&is, &bs, 0).is_err());
    }

    #[test]
    fn test_assumption_year_tags_checked() {
        let mut is = sample_is_assumptions(3);
        is[1].year = 7;
        let bs = sample_bs_assumptions(3);
        let err = validate_assumptions(&is, &bs, 3).unwrap_err();
        assert!(err.descriptions()[0].contains("Expected year 2"));
    }

    #[test]
    fn test_assumption_rates_checked() {
        let is = sample_is_assumptions(3);
        let mut bs = sample_bs_assumptions(3);
        bs[0].capex_to_sales = dec!(1.5);
        bs[2].days_inventory = dec!(-10);
        let err = validate_assumptions(&is, &bs, 3).unwrap_err();
        assert_eq!(err.descriptions().len(), 2);
    }

    #[test]
    fn test_assumptions_beyond_horizon_ignored() {
        let is = sample_is_assumptions(3);
        let mut bs = sample_bs_assumptions(3);
        bs[2].capex_to_sales = dec!(2);
        assert!(validate_assumptions(&is, &bs, 2).is_ok());
    }
}
