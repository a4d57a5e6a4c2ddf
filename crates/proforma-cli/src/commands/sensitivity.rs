use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use proforma_core::engine::orchestrator::ProjectionInput;
use proforma_core::sensitivity::{
    analyze_bivariate_with, analyze_univariate_with, sweep_values, CancellationToken,
    SensitivityParameter, SweepOptions,
};
use proforma_core::SensitivityVariable;

use crate::input;

/// Arguments for sensitivity analysis over the full projection
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct SensitivityArgs {
    /// Path to JSON projection input (reads piped stdin when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// First variable as name:min:max:step (e.g. "wacc:0.10:0.14:0.01")
    #[arg(long)]
    pub var1: String,

    /// Second variable, same format (creates a 2D grid)
    #[arg(long)]
    pub var2: Option<String>,

    /// Evaluate cells one at a time
    #[arg(long)]
    pub sequential: bool,
}

#[derive(Debug)]
struct SweepAxis {
    parameter: SensitivityParameter,
    values: Vec<Decimal>,
}

#[derive(Serialize)]
struct SensitivityOutput {
    var1_name: String,
    var2_name: Option<String>,
    results: Vec<SensitivityRow>,
    warnings: Vec<String>,
}

#[derive(Serialize)]
struct SensitivityRow {
    var1_value: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    var2_value: Option<Decimal>,
    enterprise_value: Option<Decimal>,
    share_price: Option<Decimal>,
    balanced: bool,
    error: Option<String>,
}

fn parse_sweep(raw: &str) -> Result<SweepAxis, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() != 4 {
        return Err(format!("Sensitivity variable must be name:min:max:step, got '{raw}'").into());
    }
    let parameter: SensitivityParameter = parts[0].parse()?;
    let values = sweep_values(&SensitivityVariable {
        min: parts[1].parse()?,
        max: parts[2].parse()?,
        step: parts[3].parse()?,
    })?;
    Ok(SweepAxis { parameter, values })
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let var1 = parse_sweep(&args.var1)?;
    let var2 = args.var2.as_deref().map(parse_sweep).transpose()?;

    let base: ProjectionInput = input::file::read_input(args.input.as_deref())?;
    let options = SweepOptions {
        force_sequential: args.sequential,
    };
    let cancel = CancellationToken::new();

    let output = match var2 {
        None => {
            let out = analyze_univariate_with(&base, var1.parameter, &var1.values, &cancel, &options)?;
            let curve = out.result;
            let results = curve
                .input_values
                .iter()
                .zip(curve.valuations.iter().zip(&curve.share_prices))
                .zip(curve.balanced.iter().zip(&curve.errors))
                .map(|((&value, (&ev, &price)), (&balanced, errors))| SensitivityRow {
                    var1_value: value,
                    var2_value: None,
                    enterprise_value: ev,
                    share_price: price,
                    balanced,
                    error: joined_errors(errors),
                })
                .collect();
            SensitivityOutput {
                var1_name: var1.parameter.to_string(),
                var2_name: None,
                results,
                warnings: out.warnings,
            }
        }
        Some(var2) => {
            let out = analyze_bivariate_with(
                &base,
                var1.parameter,
                &var1.values,
                var2.parameter,
                &var2.values,
                &cancel,
                &options,
            )?;
            let results = out
                .result
                .cells
                .into_iter()
                .flatten()
                .map(|cell| SensitivityRow {
                    var1_value: cell.row_value,
                    var2_value: Some(cell.column_value),
                    enterprise_value: cell.enterprise_value,
                    share_price: cell.share_price,
                    balanced: cell.balanced,
                    error: joined_errors(&cell.errors),
                })
                .collect();
            SensitivityOutput {
                var1_name: var1.parameter.to_string(),
                var2_name: Some(var2.parameter.to_string()),
                results,
                warnings: out.warnings,
            }
        }
    };

    Ok(serde_json::to_value(output)?)
}

fn joined_errors(errors: &[String]) -> Option<String> {
    if errors.is_empty() {
        None
    } else {
        Some(errors.join("; "))
    }
}
