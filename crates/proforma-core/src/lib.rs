pub mod checked;
pub mod error;
pub mod financials;
pub mod types;

pub mod engine;
pub mod projection;
pub mod sensitivity;
pub mod valuation;

#[cfg(test)]
mod test_support;

pub use error::ProformaError;
pub use types::*;

/// Standard result type for all projection and valuation operations
pub type ProformaResult<T> = Result<T, ProformaError>;
