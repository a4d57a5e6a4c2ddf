pub mod analysis;
pub mod parameter;
pub mod sweep;

pub use analysis::{
    analyze_bivariate, analyze_bivariate_with, analyze_univariate, analyze_univariate_with,
    GridCell, SensitivityCurve, SensitivityGrid, SweepOptions,
};
pub use parameter::SensitivityParameter;
pub use sweep::{sweep_values, CancellationToken};
