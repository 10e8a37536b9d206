//! Error types for vantage-metrics-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in vantage-metrics-core
#[derive(Debug, Error)]
pub enum Error {
    /// A value that should be numeric could not be parsed as one
    #[error("'{0}' is not a valid number")]
    NotNumeric(String),

    /// A variable named by the dependency order is missing from the catalog
    #[error("variable '{0}' not found in the variable catalog")]
    UnknownVariable(String),

    /// The variable catalog loaded empty
    #[error("variable catalog is empty")]
    EmptyCatalog,

    /// A report period could not be constructed
    #[error("invalid report period: {0}")]
    InvalidPeriod(String),

    /// The dependency-order artifact could not be read
    #[error("invalid dependency order: {0}")]
    InvalidOrder(String),

    /// The backing record store reported a failure
    #[error("record store error: {0}")]
    Store(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }
}
