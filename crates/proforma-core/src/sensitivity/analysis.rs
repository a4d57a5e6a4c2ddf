#[cfg(feature = "parallel")]
use rayon::prelude::*;

use log::debug;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::engine::orchestrator::{run_projection, ProjectionInput};
use crate::error::ProformaError;
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::ProformaResult;

use super::parameter::SensitivityParameter;
use super::sweep::{CancellationToken, MAX_SWEEP_POINTS};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Execution controls for a sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepOptions {
    /// Run cells one after another even when the `parallel` feature is on
    #[serde(default)]
    pub force_sequential: bool,
}

/// One-variable sweep: `valuations[i]` is the enterprise value at
/// `input_values[i]`, or `None` when that run failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityCurve {
    pub parameter: SensitivityParameter,
    pub input_values: Vec<Decimal>,
    pub valuations: Vec<Option<Money>>,
    pub share_prices: Vec<Option<Money>>,
    pub balanced: Vec<bool>,
    /// Error descriptions per point, empty for successful runs
    pub errors: Vec<Vec<String>>,
}

impl SensitivityCurve {
    /// `(input, enterprise value)` pairs for charting. Failed points are
    /// skipped.
    pub fn points_f64(&self) -> Vec<(f64, f64)> {
        self.input_values
            .iter()
            .zip(&self.valuations)
            .filter_map(|(x, y)| Some((x.to_f64()?, y.as_ref()?.to_f64()?)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub row_value: Decimal,
    pub column_value: Decimal,
    pub enterprise_value: Option<Money>,
    pub share_price: Option<Money>,
    /// Every projected year of this run satisfied the accounting equation
    pub balanced: bool,
    pub errors: Vec<String>,
}

/// Two-variable sweep. `cells[i][j]` holds the run at `row_values[i]`,
/// `column_values[j]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityGrid {
    pub row_parameter: SensitivityParameter,
    pub column_parameter: SensitivityParameter,
    pub row_values: Vec<Decimal>,
    pub column_values: Vec<Decimal>,
    pub cells: Vec<Vec<GridCell>>,
}

impl SensitivityGrid {
    /// Enterprise values as a plain matrix; failed cells are `None`.
    pub fn matrix(&self) -> Vec<Vec<Option<Money>>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|c| c.enterprise_value).collect())
            .collect()
    }
}

struct RunOutcome {
    enterprise_value: Option<Money>,
    share_price: Option<Money>,
    balanced: bool,
    errors: Vec<String>,
}

#[derive(Serialize)]
struct SweepAssumptions<'a> {
    parameters: Vec<SensitivityParameter>,
    points: usize,
    force_sequential: bool,
    base: &'a ProjectionInput,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn analyze_univariate(
    input: &ProjectionInput,
    parameter: SensitivityParameter,
    values: &[Decimal],
    cancel: &CancellationToken,
) -> ProformaResult<ComputationOutput<SensitivityCurve>> {
    analyze_univariate_with(input, parameter, values, cancel, &SweepOptions::default())
}

/// Re-run the full projection once per value of `parameter`.
pub fn analyze_univariate_with(
    input: &ProjectionInput,
    parameter: SensitivityParameter,
    values: &[Decimal],
    cancel: &CancellationToken,
    options: &SweepOptions,
) -> ProformaResult<ComputationOutput<SensitivityCurve>> {
    let start = Instant::now();
    require_values("values", values)?;

    let outcomes = run_cells(values, options.force_sequential, cancel, |&value| {
        evaluate(input, &[(parameter, value)])
    })?;

    let failed = outcomes.iter().filter(|o| o.enterprise_value.is_none()).count();
    let mut warnings = Vec::new();
    if failed > 0 {
        warnings.push(format!("{failed} of {} sensitivity runs failed", values.len()));
    }

    let mut curve = SensitivityCurve {
        parameter,
        input_values: values.to_vec(),
        valuations: Vec::with_capacity(outcomes.len()),
        share_prices: Vec::with_capacity(outcomes.len()),
        balanced: Vec::with_capacity(outcomes.len()),
        errors: Vec::with_capacity(outcomes.len()),
    };
    for outcome in outcomes {
        curve.valuations.push(outcome.enterprise_value);
        curve.share_prices.push(outcome.share_price);
        curve.balanced.push(outcome.balanced);
        curve.errors.push(outcome.errors);
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Univariate sensitivity (full projection per point)",
        &SweepAssumptions {
            parameters: vec![parameter],
            points: values.len(),
            force_sequential: options.force_sequential,
            base: input,
        },
        warnings,
        elapsed,
        curve,
    ))
}

pub fn analyze_bivariate(
    input: &ProjectionInput,
    row_parameter: SensitivityParameter,
    row_values: &[Decimal],
    column_parameter: SensitivityParameter,
    column_values: &[Decimal],
    cancel: &CancellationToken,
) -> ProformaResult<ComputationOutput<SensitivityGrid>> {
    analyze_bivariate_with(
        input,
        row_parameter,
        row_values,
        column_parameter,
        column_values,
        cancel,
        &SweepOptions::default(),
    )
}

/// Re-run the full projection for every (row, column) pair.
pub fn analyze_bivariate_with(
    input: &ProjectionInput,
    row_parameter: SensitivityParameter,
    row_values: &[Decimal],
    column_parameter: SensitivityParameter,
    column_values: &[Decimal],
    cancel: &CancellationToken,
    options: &SweepOptions,
) -> ProformaResult<ComputationOutput<SensitivityGrid>> {
    let start = Instant::now();
    require_values("row_values", row_values)?;
    require_values("column_values", column_values)?;
    if row_parameter == column_parameter {
        return Err(ProformaError::InvalidInput {
            field: "column_parameter".into(),
            reason: format!("Both axes sweep '{row_parameter}'"),
        });
    }
    require_within_limit("grid", row_values.len() * column_values.len())?;

    let pairs: Vec<(Decimal, Decimal)> = row_values
        .iter()
        .flat_map(|&r| column_values.iter().map(move |&c| (r, c)))
        .collect();

    let outcomes = run_cells(&pairs, options.force_sequential, cancel, |&(r, c)| {
        evaluate(input, &[(row_parameter, r), (column_parameter, c)])
    })?;

    let unbalanced = outcomes.iter().filter(|o| !o.balanced).count();
    let mut warnings = Vec::new();
    if unbalanced > 0 {
        warnings.push(format!(
            "{unbalanced} of {} grid cells failed or did not balance",
            pairs.len()
        ));
    }

    let mut cells: Vec<Vec<GridCell>> = Vec::with_capacity(row_values.len());
    let mut outcomes = outcomes.into_iter();
    for &row_value in row_values {
        let mut row = Vec::with_capacity(column_values.len());
        for &column_value in column_values {
            if let Some(outcome) = outcomes.next() {
                row.push(GridCell {
                    row_value,
                    column_value,
                    enterprise_value: outcome.enterprise_value,
                    share_price: outcome.share_price,
                    balanced: outcome.balanced,
                    errors: outcome.errors,
                });
            }
        }
        cells.push(row);
    }

    let grid = SensitivityGrid {
        row_parameter,
        column_parameter,
        row_values: row_values.to_vec(),
        column_values: column_values.to_vec(),
        cells,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Bivariate sensitivity grid (full projection per cell)",
        &SweepAssumptions {
            parameters: vec![row_parameter, column_parameter],
            points: pairs.len(),
            force_sequential: options.force_sequential,
            base: input,
        },
        warnings,
        elapsed,
        grid,
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn require_values(field: &str, values: &[Decimal]) -> ProformaResult<()> {
    if values.is_empty() {
        return Err(ProformaError::InvalidInput {
            field: field.into(),
            reason: "At least one sweep value is required".into(),
        });
    }
    require_within_limit(field, values.len())
}

fn require_within_limit(field: &str, points: usize) -> ProformaResult<()> {
    if points > MAX_SWEEP_POINTS {
        return Err(ProformaError::InvalidInput {
            field: field.into(),
            reason: format!("{points} runs requested, at most {MAX_SWEEP_POINTS} allowed"),
        });
    }
    Ok(())
}

/// Clone the base input, apply the overrides and run the whole pipeline.
fn evaluate(input: &ProjectionInput, overrides: &[(SensitivityParameter, Decimal)]) -> RunOutcome {
    let mut scenario = input.clone();
    for (parameter, value) in overrides {
        parameter.apply(&mut scenario, *value);
    }

    match run_projection(&scenario) {
        Ok(out) => RunOutcome {
            enterprise_value: Some(out.result.valuation.enterprise_value),
            share_price: out.result.share_price,
            balanced: out.result.balanced,
            errors: Vec::new(),
        },
        Err(e) => RunOutcome {
            enterprise_value: None,
            share_price: None,
            balanced: false,
            errors: e.descriptions(),
        },
    }
}

/// Evaluate every job, checking `cancel` before each one. Order is preserved.
fn run_cells<T, F>(
    jobs: &[T],
    force_sequential: bool,
    cancel: &CancellationToken,
    f: F,
) -> ProformaResult<Vec<RunOutcome>>
where
    T: Sync,
    F: Fn(&T) -> RunOutcome + Sync + Send,
{
    let guarded = |job: &T| {
        if cancel.is_cancelled() {
            None
        } else {
            Some(f(job))
        }
    };

    #[cfg(feature = "parallel")]
    let results: Vec<Option<RunOutcome>> = if force_sequential {
        jobs.iter().map(guarded).collect()
    } else {
        jobs.par_iter().map(guarded).collect()
    };

    #[cfg(not(feature = "parallel"))]
    let results: Vec<Option<RunOutcome>> = {
        let _ = force_sequential;
        jobs.iter().map(guarded).collect()
    };

    let total = jobs.len();
    let completed = results.iter().filter(|r| r.is_some()).count();
    if completed < total {
        debug!("sensitivity sweep cancelled after {completed} of {total} runs");
        return Err(ProformaError::Cancelled { completed, total });
    }

    Ok(results.into_iter().flatten().collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
