//! Run-level error taxonomy
//!
//! Data-quality problems never abort a run; they accumulate on the context
//! as [`RunError`] values and the run is "successful" only when none were
//! recorded. Callers may still persist partial results from a failed run.

use thiserror::Error;

/// An error recorded against a calculation run
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    /// A variable named by the dependency order is missing from the catalog
    #[error("variable '{0}' not found in the variable catalog")]
    UnknownVariable(String),

    /// A non-historical variable at level 1+ has no formula
    #[error("no formula for calculated variable '{0}'")]
    MissingFormula(String),

    /// Formula evaluation failed (or divided by zero) for a variable
    #[error("error calculating {variable}: {message}")]
    Formula { variable: String, message: String },

    /// A hard validation rule was violated
    #[error("{variable}: {message}")]
    Validation { variable: String, message: String },

    /// The year-to-date historical query failed
    #[error("year-to-date aggregation failed: {0}")]
    Ytd(String),
}
