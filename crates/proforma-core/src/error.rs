use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProformaError {
    #[error("Invalid year index {index}: assumptions cover {available} year(s)")]
    InvalidYearIndex { index: usize, available: usize },

    #[error("Insufficient assumptions: {sequence} has {available} entries, horizon requires {required}")]
    InsufficientAssumptions {
        sequence: String,
        available: usize,
        required: usize,
    },

    #[error("Balance mismatch in year {year}: assets {assets} vs liabilities + equity {liabilities_and_equity} (difference {difference})")]
    BalanceMismatch {
        year: i32,
        assets: Decimal,
        liabilities_and_equity: Decimal,
        difference: Decimal,
    },

    #[error("Invalid growth assumption: perpetual growth {growth} must satisfy 0 <= g < WACC ({wacc})")]
    InvalidGrowthAssumption { growth: Decimal, wacc: Decimal },

    #[error("Invalid share count: {0} (must be positive)")]
    InvalidShareCount(Decimal),

    #[error("Invalid base input: {field} — {reason}")]
    InvalidBaseInput { field: String, reason: String },

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Arithmetic overflow in {context}: result exceeds the supported magnitude")]
    Overflow { context: String },

    #[error("Computation cancelled after {completed} of {total} runs")]
    Cancelled { completed: usize, total: usize },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("{} errors: {}", .0.len(), join_errors(.0))]
    Multiple(Vec<ProformaError>),
}

impl ProformaError {
    /// Ordered, flattened list of human-readable error descriptions.
    pub fn descriptions(&self) -> Vec<String> {
        match self {
            ProformaError::Multiple(errors) => {
                errors.iter().flat_map(|e| e.descriptions()).collect()
            }
            other => vec![other.to_string()],
        }
    }

    /// Collapse a list of collected errors: none is success, one is returned
    /// as-is, several are wrapped in `Multiple`.
    pub fn from_collected(mut errors: Vec<ProformaError>) -> Result<(), ProformaError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ProformaError::Multiple(errors)),
        }
    }
}

fn join_errors(errors: &[ProformaError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<serde_json::Error> for ProformaError {
    fn from(e: serde_json::Error) -> Self {
        ProformaError::SerializationError(e.to_string())
    }
}
