//! Shared fixtures for unit tests.

use rust_decimal_macros::dec;

use crate::engine::orchestrator::ProjectionInput;
use crate::financials::*;
use crate::types::Rate;
use crate::valuation::discount_rate::DiscountRate;

const GROWTH_PATH: [Rate; 5] = [dec!(0.20), dec!(0.10), dec!(0.08), dec!(0.06), dec!(0.05)];

/// A mid-sized industrial company: 10m revenue, balanced 7.2m balance sheet.
pub fn sample_base() -> BaseFinancials {
    BaseFinancials {
        income_statement: IncomeStatementBase {
            year: 2025,
            revenue: dec!(10000000),
            cost_of_goods_sold: dec!(6000000),
            operating_expenses: dec!(2000000),
            depreciation: dec!(400000),
            financial_expenses: dec!(240000),
            financial_income: dec!(40000),
            income_tax: dec!(476000),
        },
        balance_sheet: BalanceSheetBase {
            current_assets: CurrentAssets {
                cash: dec!(500000),
                short_term_investments: dec!(400000),
                accounts_receivable: dec!(1250000),
                inventory: dec!(800000),
            },
            long_term_assets: LongTermAssets {
                gross_ppe: dec!(6000000),
                accumulated_depreciation: dec!(2000000),
                other_long_term_assets: dec!(250000),
            },
            current_liabilities: CurrentLiabilities {
                accounts_payable: dec!(600000),
                taxes_payable: dec!(150000),
                social_obligations: dec!(100000),
                short_term_debt: dec!(500000),
                revolving_credit: dec!(0),
            },
            long_term_liabilities: LongTermLiabilities {
                long_term_debt: dec!(1500000),
                other_long_term_liabilities: dec!(150000),
            },
            equity: Equity {
                share_capital: dec!(2500000),
                retained_earnings: dec!(1700000),
            },
        },
    }
}

pub fn sample_is_assumptions(years: usize) -> Vec<IncomeStatementAssumption> {
    (0..years)
        .map(|idx| IncomeStatementAssumption {
            year: (idx + 1) as u32,
            revenue_growth: GROWTH_PATH.get(idx).copied().unwrap_or(dec!(0.04)),
            cogs_margin: dec!(0.60),
            opex_margin: dec!(0.20),
        })
        .collect()
}

pub fn sample_bs_assumptions(years: usize) -> Vec<BalanceSheetAssumption> {
    (0..years)
        .map(|idx| BalanceSheetAssumption {
            year: (idx + 1) as u32,
            days_cash: dec!(18),
            days_receivables: dec!(45),
            days_inventory: dec!(48),
            days_payables: dec!(36),
            days_taxes_payable: dec!(6),
            days_social_obligations: dec!(18),
            capex_to_sales: dec!(0.06),
            depreciation_rate: dec!(0.07),
            short_term_new_debt_rate: dec!(0),
            long_term_new_debt_rate: dec!(-0.10),
            short_term_interest_rate: dec!(0.12),
            long_term_interest_rate: dec!(0.10),
            investment_yield: dec!(0.08),
            dividend_payout: dec!(0.25),
        })
        .collect()
}

pub fn sample_discount_rate() -> DiscountRate {
    DiscountRate {
        cost_of_equity: dec!(0.15),
        cost_of_debt: dec!(0.11),
        wacc: dec!(0.125),
        equity_weight: dec!(0.70),
        debt_weight: dec!(0.30),
        tax_rate: Some(dec!(0.34)),
    }
}

pub fn sample_input(horizon: usize) -> ProjectionInput {
    ProjectionInput {
        base: sample_base(),
        income_statement_assumptions: sample_is_assumptions(horizon),
        balance_sheet_assumptions: sample_bs_assumptions(horizon),
        discount_rate: sample_discount_rate(),
        perpetual_growth_rate: dec!(0.03),
        horizon_years: horizon as u32,
        shares_outstanding: Some(dec!(1000000)),
        resolution: Default::default(),
        balance_policy: Default::default(),
    }
}
