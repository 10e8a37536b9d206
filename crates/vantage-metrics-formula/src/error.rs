//! Formula error types

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula or constraint handling
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Empty formula on a variable that requires one
    #[error("no formula provided")]
    Empty,

    /// A placeholder referenced a variable with no available value
    #[error("missing required variable: {0}")]
    MissingVariable(String),

    /// A placeholder's value could not be coerced to a number
    #[error("non-numeric value for {variable}: {value}")]
    NonNumericOperand { variable: String, value: String },

    /// The substituted expression failed the character-set guard
    #[error("invalid characters in formula: {0}")]
    InvalidCharacters(String),

    /// Expression parse error
    #[error("parse error: {0}")]
    Parse(String),

    /// Division by zero; the caller keeps a usable 0 result alongside this
    #[error("division by zero")]
    DivisionByZero,

    /// Expression evaluation error
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// A constraint clause could not be parsed
    #[error("could not parse condition '{0}'")]
    Condition(String),
}
