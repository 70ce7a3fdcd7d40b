//! Validation errors for airspace and configuration definitions.
//!
//! Queries never fail; these errors only come out of the validation seams
//! that check definitions handed in from outside (parser output, user
//! configuration).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AirspaceError {
    #[error("polygon must have at least 3 distinct vertices, got {0}")]
    TooFewVertices(usize),

    #[error("circle radius must be positive, got {0}")]
    InvalidRadius(f64),

    #[error("base altitude {base}m is not below top altitude {top}m")]
    InvertedAltitudeBand { base: f64, top: f64 },

    #[error("{name} must be positive, got {value}")]
    NonPositiveTime { name: &'static str, value: f64 },
}
