use log::{debug, warn};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ProformaError;
use crate::financials::{
    validate_assumptions, validate_base, validate_horizon, BalanceSheetAssumption, BaseFinancials,
    IncomeStatementAssumption,
};
use crate::projection::balance_sheet::{check_balance, project_balance_sheets, ProjectedBalanceSheet};
use crate::projection::free_cash_flow::{calculate_free_cash_flows, ProjectedFreeCashFlow};
use crate::projection::income_statement::{
    project_income_statements, BalanceSheetFeed, ProjectedIncomeStatement,
};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::valuation::dcf::{share_price, value_cash_flows, ValuationResult};
use crate::valuation::discount_rate::DiscountRate;
use crate::ProformaResult;

use super::indicators::{compute_all_indicators, YearIndicators};

/// Default convergence threshold on the interest/depreciation feed.
pub const DEFAULT_TOLERANCE: Decimal = dec!(0.0001);
pub const DEFAULT_MAX_ITERATIONS: u32 = 50;

const LEVERAGE_WARNING_MULTIPLE: Decimal = dec!(6);
const COVERAGE_WARNING_MULTIPLE: Decimal = dec!(2);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How the income statement / balance sheet circularity is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ResolutionMode {
    /// IS with a zero feed, BS, IS with the pass-2 feed, BS.
    FixedFourPass,
    /// Alternate IS/BS sweeps until the feed stops moving.
    Iterative {
        tolerance: Decimal,
        max_iterations: u32,
    },
}

impl Default for ResolutionMode {
    fn default() -> Self {
        ResolutionMode::Iterative {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// What to do when a projected balance sheet fails the accounting equation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalancePolicy {
    #[default]
    Block,
    Warn,
}

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionInput {
    pub base: BaseFinancials,
    pub income_statement_assumptions: Vec<IncomeStatementAssumption>,
    pub balance_sheet_assumptions: Vec<BalanceSheetAssumption>,
    pub discount_rate: DiscountRate,
    pub perpetual_growth_rate: Rate,
    pub horizon_years: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares_outstanding: Option<Decimal>,
    #[serde(default)]
    pub resolution: ResolutionMode,
    #[serde(default)]
    pub balance_policy: BalancePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub mode: ResolutionMode,
    /// Statement passes run (one IS sweep or one BS sweep each)
    pub passes: u32,
    pub converged: bool,
    /// Largest feed change between the last two passes
    pub final_delta: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionOutput {
    pub income_statements: Vec<ProjectedIncomeStatement>,
    pub balance_sheets: Vec<ProjectedBalanceSheet>,
    pub free_cash_flows: Vec<ProjectedFreeCashFlow>,
    pub indicators: Vec<YearIndicators>,
    pub valuation: ValuationResult,
    /// Base-year net debt used to bridge EV to equity
    pub net_debt: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_price: Option<Money>,
    /// Every projected year satisfies the accounting equation
    pub balanced: bool,
    pub resolution: ResolutionReport,
}

struct Resolved {
    income_statements: Vec<ProjectedIncomeStatement>,
    balance_sheets: Vec<ProjectedBalanceSheet>,
    report: ResolutionReport,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run the full pipeline: validate, project both statements with the
/// circularity resolved, derive free cash flow, and value the company.
pub fn run_projection(input: &ProjectionInput) -> ProformaResult<ComputationOutput<ProjectionOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_projection_input(input)?;
    let horizon = input.horizon_years as usize;
    warnings.extend(input.discount_rate.warnings());

    // -- Statements ---------------------------------------------------------
    let resolved = match input.resolution {
        ResolutionMode::FixedFourPass => resolve_four_pass(input, horizon)?,
        ResolutionMode::Iterative {
            tolerance,
            max_iterations,
        } => resolve_iterative(input, horizon, tolerance, max_iterations)?,
    };

    // -- Accounting equation ------------------------------------------------
    let balanced = apply_balance_policy(&resolved.balance_sheets, input.balance_policy, &mut warnings)?;

    // -- Free cash flow and valuation ---------------------------------------
    let free_cash_flows =
        calculate_free_cash_flows(&resolved.income_statements, &resolved.balance_sheets)?;
    let flows: Vec<Money> = free_cash_flows.iter().map(|f| f.fcff).collect();

    let valuation = value_cash_flows(
        &flows,
        input.discount_rate.wacc,
        input.perpetual_growth_rate,
        input.base.income_statement.year,
    )?;
    for w in &valuation.warnings {
        warnings.push(format!("[DCF] {w}"));
    }

    // -- Indicators ---------------------------------------------------------
    let indicators = compute_all_indicators(&resolved.income_statements, &resolved.balance_sheets);
    warnings.extend(indicator_warnings(&indicators));

    for sheet in &resolved.balance_sheets {
        let revolver = sheet.accounts.current_liabilities.revolving_credit;
        if revolver > Decimal::ZERO {
            warnings.push(format!(
                "Year {}: funding shortfall of {revolver} drawn on the revolving credit line",
                sheet.year
            ));
        }
    }

    // -- Equity bridge ------------------------------------------------------
    let net_debt = input.base.balance_sheet.net_debt();
    let price = match input.shares_outstanding {
        Some(shares) => Some(share_price(valuation.result.enterprise_value, net_debt, shares)?),
        None => None,
    };

    debug!(
        "projection complete: {} years, EV {}, {} warnings",
        horizon,
        valuation.result.enterprise_value,
        warnings.len()
    );

    let output = ProjectionOutput {
        income_statements: resolved.income_statements,
        balance_sheets: resolved.balance_sheets,
        free_cash_flows,
        indicators,
        valuation: valuation.result,
        net_debt,
        share_price: price,
        balanced,
        resolution: resolved.report,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Three-statement projection (day-count working capital, plug-balanced) with FCFF DCF valuation",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Check every sheet against the accounting equation. Under `Block` the
/// first mismatch fails; under `Warn` each mismatch becomes a warning and
/// the result is `false`.
pub fn apply_balance_policy(
    sheets: &[ProjectedBalanceSheet],
    policy: BalancePolicy,
    warnings: &mut Vec<String>,
) -> ProformaResult<bool> {
    let mut balanced = true;
    for sheet in sheets {
        if let Err(e) = check_balance(sheet) {
            match policy {
                BalancePolicy::Block => return Err(e),
                BalancePolicy::Warn => {
                    warn!("{e}");
                    warnings.push(e.to_string());
                    balanced = false;
                }
            }
        }
    }
    Ok(balanced)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_projection_input(input: &ProjectionInput) -> ProformaResult<()> {
    validate_base(&input.base)?;

    let horizon = input.horizon_years as usize;
    validate_horizon(
        &input.income_statement_assumptions,
        &input.balance_sheet_assumptions,
        horizon,
    )?;
    validate_assumptions(
        &input.income_statement_assumptions,
        &input.balance_sheet_assumptions,
        horizon,
    )?;

    input.discount_rate.validate()?;

    let g = input.perpetual_growth_rate;
    if g < Decimal::ZERO || g >= input.discount_rate.wacc {
        return Err(ProformaError::InvalidGrowthAssumption {
            growth: g,
            wacc: input.discount_rate.wacc,
        });
    }

    if let Some(shares) = input.shares_outstanding {
        if shares <= Decimal::ZERO {
            return Err(ProformaError::InvalidShareCount(shares));
        }
    }

    if let ResolutionMode::Iterative {
        tolerance,
        max_iterations,
    } = input.resolution
    {
        if tolerance <= Decimal::ZERO {
            return Err(ProformaError::InvalidInput {
                field: "resolution.tolerance".into(),
                reason: "Tolerance must be positive".into(),
            });
        }
        if max_iterations == 0 {
            return Err(ProformaError::InvalidInput {
                field: "resolution.max_iterations".into(),
                reason: "At least one iteration is required".into(),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Circularity resolution
// ---------------------------------------------------------------------------

fn sweep(
    input: &ProjectionInput,
    horizon: usize,
    feeds: &[BalanceSheetFeed],
) -> ProformaResult<(Vec<ProjectedIncomeStatement>, Vec<ProjectedBalanceSheet>)> {
    let income_statements = project_income_statements(
        &input.base.income_statement,
        &input.income_statement_assumptions[..horizon],
        feeds,
    )?;
    let balance_sheets = project_balance_sheets(
        &input.base.balance_sheet,
        input.base.income_statement.year,
        &income_statements,
        &input.balance_sheet_assumptions[..horizon],
    )?;
    Ok((income_statements, balance_sheets))
}

fn feeds_from(sheets: &[ProjectedBalanceSheet]) -> Vec<BalanceSheetFeed> {
    sheets.iter().map(BalanceSheetFeed::from_balance_sheet).collect()
}

fn max_feed_delta(previous: &[BalanceSheetFeed], next: &[BalanceSheetFeed]) -> Decimal {
    previous
        .iter()
        .zip(next)
        .map(|(a, b)| a.max_abs_change(b))
        .max()
        .unwrap_or(Decimal::ZERO)
}

fn resolve_four_pass(input: &ProjectionInput, horizon: usize) -> ProformaResult<Resolved> {
    // Passes 1-2
    let cold = vec![BalanceSheetFeed::cold_start(); horizon];
    let (_, first_sheets) = sweep(input, horizon, &cold)?;

    // Passes 3-4
    let feeds = feeds_from(&first_sheets);
    let (income_statements, balance_sheets) = sweep(input, horizon, &feeds)?;

    let final_delta = max_feed_delta(&feeds, &feeds_from(&balance_sheets));
    debug!("four-pass resolution finished, residual feed delta {final_delta}");

    Ok(Resolved {
        income_statements,
        balance_sheets,
        report: ResolutionReport {
            mode: ResolutionMode::FixedFourPass,
            passes: 4,
            converged: final_delta < DEFAULT_TOLERANCE,
            final_delta,
        },
    })
}

fn resolve_iterative(
    input: &ProjectionInput,
    horizon: usize,
    tolerance: Decimal,
    max_iterations: u32,
) -> ProformaResult<Resolved> {
    let mut feeds = vec![BalanceSheetFeed::cold_start(); horizon];
    let mut last_delta = Decimal::ZERO;

    for iteration in 1..=max_iterations {
        let (income_statements, balance_sheets) = sweep(input, horizon, &feeds)?;
        let next = feeds_from(&balance_sheets);
        last_delta = max_feed_delta(&feeds, &next);
        debug!("resolution iteration {iteration}: feed delta {last_delta}");

        if last_delta < tolerance {
            return Ok(Resolved {
                income_statements,
                balance_sheets,
                report: ResolutionReport {
                    mode: input.resolution,
                    passes: iteration * 2,
                    converged: true,
                    final_delta: last_delta,
                },
            });
        }
        feeds = next;
    }

    warn!("statement resolution did not converge after {max_iterations} iterations (delta {last_delta})");
    Err(ProformaError::ConvergenceFailure {
        function: "income statement / balance sheet resolution".into(),
        iterations: max_iterations,
        last_delta,
    })
}

fn indicator_warnings(indicators: &[YearIndicators]) -> Vec<String> {
    let mut warnings = Vec::new();
    for ind in indicators {
        if let Some(leverage) = ind.debt_to_ebitda {
            if leverage > LEVERAGE_WARNING_MULTIPLE {
                warnings.push(format!(
                    "Year {}: debt/EBITDA of {:.2}x exceeds {LEVERAGE_WARNING_MULTIPLE}x",
                    ind.year, leverage
                ));
            }
        }
        if let Some(coverage) = ind.interest_coverage {
            if coverage < COVERAGE_WARNING_MULTIPLE {
                warnings.push(format!(
                    "Year {}: interest coverage of {:.2}x is below {COVERAGE_WARNING_MULTIPLE}x",
                    ind.year, coverage
                ));
            }
        }
    }
    warnings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
