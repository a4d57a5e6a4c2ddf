use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use proforma_core::engine::orchestrator::{
    run_projection, BalancePolicy, ProjectionInput, ProjectionOutput, ResolutionMode,
    DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE,
};

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ResolutionArg {
    Iterative,
    FourPass,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum ProjectView {
    /// The whole result envelope
    #[default]
    Full,
    /// One row per projected year
    Years,
}

/// Arguments for a full projection and valuation run
#[derive(Args)]
pub struct ProjectArgs {
    /// Path to JSON projection input (reads piped stdin when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Override the projection horizon in years
    #[arg(long)]
    pub horizon: Option<u32>,

    /// Circularity resolution strategy
    #[arg(long)]
    pub resolution: Option<ResolutionArg>,

    /// Convergence tolerance for iterative resolution
    #[arg(long)]
    pub tolerance: Option<Decimal>,

    /// Iteration cap for iterative resolution
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Report balance-sheet mismatches as warnings instead of failing
    #[arg(long)]
    pub allow_imbalance: bool,

    /// Shape of the printed result
    #[arg(long, value_enum, default_value_t = ProjectView::Full)]
    pub view: ProjectView,
}

#[derive(Serialize)]
struct YearRow {
    year: i32,
    revenue: Decimal,
    ebitda: Decimal,
    ebit: Decimal,
    net_income: Decimal,
    total_assets: Decimal,
    total_debt: Decimal,
    revolving_credit: Decimal,
    fcff: Decimal,
    present_value: Decimal,
    debt_to_ebitda: Option<Decimal>,
    interest_coverage: Option<Decimal>,
}

pub fn run_project(args: ProjectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut projection: ProjectionInput = input::file::read_input(args.input.as_deref())?;
    apply_overrides(&mut projection, &args);

    let output = run_projection(&projection)?;

    match args.view {
        ProjectView::Full => Ok(serde_json::to_value(output)?),
        ProjectView::Years => Ok(serde_json::to_value(year_rows(&output.result))?),
    }
}

fn apply_overrides(projection: &mut ProjectionInput, args: &ProjectArgs) {
    if let Some(horizon) = args.horizon {
        projection.horizon_years = horizon;
    }

    let (current_tolerance, current_iterations) = match projection.resolution {
        ResolutionMode::Iterative {
            tolerance,
            max_iterations,
        } => (tolerance, max_iterations),
        ResolutionMode::FixedFourPass => (DEFAULT_TOLERANCE, DEFAULT_MAX_ITERATIONS),
    };
    let four_pass = match args.resolution {
        Some(ResolutionArg::FourPass) => true,
        Some(ResolutionArg::Iterative) => false,
        None => projection.resolution == ResolutionMode::FixedFourPass,
    };
    projection.resolution = if four_pass {
        ResolutionMode::FixedFourPass
    } else {
        ResolutionMode::Iterative {
            tolerance: args.tolerance.unwrap_or(current_tolerance),
            max_iterations: args.max_iterations.unwrap_or(current_iterations),
        }
    };

    if args.allow_imbalance {
        projection.balance_policy = BalancePolicy::Warn;
    }
}

fn year_rows(result: &ProjectionOutput) -> Vec<YearRow> {
    result
        .income_statements
        .iter()
        .zip(&result.balance_sheets)
        .zip(&result.free_cash_flows)
        .zip(&result.valuation.discounted_cash_flows)
        .zip(&result.indicators)
        .map(|((((is, bs), fcf), dcf), ind)| YearRow {
            year: is.year,
            revenue: is.revenue,
            ebitda: is.ebitda,
            ebit: is.ebit,
            net_income: is.net_income,
            total_assets: bs.total_assets,
            total_debt: bs.total_debt(),
            revolving_credit: bs.accounts.current_liabilities.revolving_credit,
            fcff: fcf.fcff,
            present_value: dcf.present_value,
            debt_to_ebitda: ind.debt_to_ebitda,
            interest_coverage: ind.interest_coverage,
        })
        .collect()
}
