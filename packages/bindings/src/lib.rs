use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;

use proforma_core::engine::orchestrator::ProjectionInput;
use proforma_core::sensitivity::{
    analyze_bivariate_with, analyze_univariate_with, sweep_values, CancellationToken,
    SensitivityParameter, SweepOptions,
};
use proforma_core::{ProformaError, SensitivityVariable};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Engine errors carry every collected description, one per line.
fn engine_error(e: ProformaError) -> napi::Error {
    napi::Error::from_reason(e.descriptions().join("\n"))
}

/// Explicit values or a `{min, max, step}` range.
#[derive(Deserialize)]
#[serde(untagged)]
enum SweepValues {
    Explicit(Vec<Decimal>),
    Range(SensitivityVariable),
}

impl SweepValues {
    fn resolve(self) -> NapiResult<Vec<Decimal>> {
        match self {
            SweepValues::Explicit(values) => Ok(values),
            SweepValues::Range(var) => sweep_values(&var).map_err(engine_error),
        }
    }
}

#[derive(Deserialize)]
struct UnivariateRequest {
    input: ProjectionInput,
    parameter: SensitivityParameter,
    values: SweepValues,
    #[serde(default)]
    options: SweepOptions,
}

#[derive(Deserialize)]
struct BivariateRequest {
    input: ProjectionInput,
    row_parameter: SensitivityParameter,
    row_values: SweepValues,
    column_parameter: SensitivityParameter,
    column_values: SweepValues,
    #[serde(default)]
    options: SweepOptions,
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

#[napi]
pub fn run_projection(input_json: String) -> NapiResult<String> {
    let input: ProjectionInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = proforma_core::engine::orchestrator::run_projection(&input).map_err(engine_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn share_price(enterprise_value: String, net_debt: String, shares_outstanding: String) -> NapiResult<String> {
    let ev: Decimal = enterprise_value.parse().map_err(to_napi_error)?;
    let net_debt: Decimal = net_debt.parse().map_err(to_napi_error)?;
    let shares: Decimal = shares_outstanding.parse().map_err(to_napi_error)?;
    let price = proforma_core::valuation::dcf::share_price(ev, net_debt, shares).map_err(engine_error)?;
    Ok(price.to_string())
}

// ---------------------------------------------------------------------------
// Sensitivity
// ---------------------------------------------------------------------------

#[napi]
pub fn sensitivity_univariate(request_json: String) -> NapiResult<String> {
    let request: UnivariateRequest = serde_json::from_str(&request_json).map_err(to_napi_error)?;
    let values = request.values.resolve()?;
    let output = analyze_univariate_with(
        &request.input,
        request.parameter,
        &values,
        &CancellationToken::new(),
        &request.options,
    )
    .map_err(engine_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn sensitivity_bivariate(request_json: String) -> NapiResult<String> {
    let request: BivariateRequest = serde_json::from_str(&request_json).map_err(to_napi_error)?;
    let row_values = request.row_values.resolve()?;
    let column_values = request.column_values.resolve()?;
    let output = analyze_bivariate_with(
        &request.input,
        request.row_parameter,
        &row_values,
        request.column_parameter,
        &column_values,
        &CancellationToken::new(),
        &request.options,
    )
    .map_err(engine_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
