//! Field values
//!
//! Values crossing the record-store boundary are dynamically typed: a field
//! may hold a number, a string, or (for lookup fields) a list of either.
//! [`Value::scalar`] is the single place multi-valued lookups are flattened
//! to one element; everything downstream works on scalars.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// A raw field value from the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Numeric value (all numbers carried as f64)
    Number(f64),
    /// String value
    Text(String),
    /// Multi-valued lookup field
    Many(Vec<Value>),
}

impl Value {
    /// Normalize a possibly multi-valued field to a single scalar.
    ///
    /// Lookup fields arrive as lists; the first element wins. Returns `None`
    /// for an empty list.
    pub fn scalar(&self) -> Option<&Value> {
        match self {
            Value::Many(items) => items.first().and_then(|v| v.scalar()),
            other => Some(other),
        }
    }

    /// Try to get the value as a number without any format stripping
    pub fn as_number(&self) -> Option<f64> {
        match self.scalar()? {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Many(_) => None,
        }
    }

    /// Get the value as display text
    pub fn as_text(&self) -> String {
        self.to_string()
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Many(_) => "list",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::Many(items) => match items.first() {
                Some(v) => write!(f, "{}", v),
                None => write!(f, ""),
            },
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Many(items)
    }
}

/// Parse a value to numeric, handling currency and percentage formats.
///
/// Strips `$`, thousands separators and spaces; a trailing `%` divides by
/// 100. Multi-valued fields are scalar-extracted first.
pub fn parse_numeric(value: &Value) -> Result<f64> {
    let scalar = value
        .scalar()
        .ok_or_else(|| Error::NotNumeric("empty lookup value".to_string()))?;

    match scalar {
        Value::Number(n) => Ok(*n),
        Value::Text(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| *c != '$' && *c != ',' && *c != ' ')
                .collect();

            if let Some(stripped) = cleaned.strip_suffix('%') {
                let n: f64 = stripped
                    .parse()
                    .map_err(|_| Error::NotNumeric(s.clone()))?;
                return Ok(n / 100.0);
            }

            cleaned.parse().map_err(|_| Error::NotNumeric(s.clone()))
        }
        Value::Many(_) => Err(Error::NotNumeric(scalar.as_text())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_extraction() {
        let many = Value::Many(vec![Value::Number(3.0), Value::Number(4.0)]);
        assert_eq!(many.scalar(), Some(&Value::Number(3.0)));

        let empty = Value::Many(vec![]);
        assert_eq!(empty.scalar(), None);

        let nested = Value::Many(vec![Value::Many(vec![Value::Text("a".into())])]);
        assert_eq!(nested.scalar(), Some(&Value::Text("a".into())));
    }

    #[test]
    fn test_parse_numeric_currency() {
        assert_eq!(parse_numeric(&Value::from("$1,234.50")).unwrap(), 1234.5);
        assert_eq!(parse_numeric(&Value::from("  42 ")).unwrap(), 42.0);
        assert_eq!(parse_numeric(&Value::Number(7.25)).unwrap(), 7.25);
    }

    #[test]
    fn test_parse_numeric_percent() {
        assert_eq!(parse_numeric(&Value::from("12%")).unwrap(), 0.12);
        assert_eq!(parse_numeric(&Value::from("2,500%")).unwrap(), 25.0);
    }

    #[test]
    fn test_parse_numeric_rejects_garbage() {
        assert!(parse_numeric(&Value::from("n/a")).is_err());
        assert!(parse_numeric(&Value::Many(vec![])).is_err());
    }

    #[test]
    fn test_parse_numeric_extracts_lookup() {
        let lookup = Value::Many(vec![Value::from("$10.00")]);
        assert_eq!(parse_numeric(&lookup).unwrap(), 10.0);
    }
}
