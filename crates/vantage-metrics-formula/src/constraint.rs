//! Constraint expressions
//!
//! Validation rules are small comparison expressions such as
//! `>= 0 AND <= 1`, `> 0`, or `= 0.9`, combined strictly left to right with
//! `AND`/`OR` (no precedence). The literals `not_empty` and `integer` are
//! also supported; `integer` composes with range clauses
//! (`integer AND >= 0`). Values are coerced through the shared
//! currency/percentage-aware numeric parser before comparison.

use lazy_regex::regex;

use vantage_metrics_core::{parse_numeric, Value};

use crate::error::{FormulaError, FormulaResult};

/// A single comparison clause
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Comparison {
    Ge(f64),
    Le(f64),
    Gt(f64),
    Lt(f64),
    Eq(f64),
}

impl Comparison {
    fn holds(&self, value: f64) -> bool {
        match self {
            Comparison::Ge(t) => value >= *t,
            Comparison::Le(t) => value <= *t,
            Comparison::Gt(t) => value > *t,
            Comparison::Lt(t) => value < *t,
            // Float equality check
            Comparison::Eq(t) => (value - t).abs() < 1e-10,
        }
    }
}

/// Connective between adjacent clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

/// A parsed constraint expression
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    source: String,
    not_empty: bool,
    requires_integer: bool,
    clauses: Vec<Comparison>,
    connectives: Vec<Connective>,
}

impl Constraint {
    /// Parse a rule string from the catalog
    pub fn parse(rule: &str) -> FormulaResult<Self> {
        let trimmed = rule.trim();
        if trimmed.is_empty() {
            return Err(FormulaError::Condition(rule.to_string()));
        }

        let mut constraint = Constraint {
            source: trimmed.to_string(),
            not_empty: false,
            requires_integer: false,
            clauses: Vec::new(),
            connectives: Vec::new(),
        };

        if trimmed.eq_ignore_ascii_case("not_empty") {
            constraint.not_empty = true;
            return Ok(constraint);
        }

        // Split into clauses on AND/OR, keeping the connectives in order
        let splitter = regex!(r"(?i)\s+(and|or)\s+");
        let raw_clauses: Vec<&str> = splitter.split(trimmed).collect();
        let raw_connectives: Vec<Connective> = splitter
            .captures_iter(trimmed)
            .map(|captures| {
                if captures[1].eq_ignore_ascii_case("and") {
                    Connective::And
                } else {
                    Connective::Or
                }
            })
            .collect();

        for (index, clause) in raw_clauses.iter().enumerate() {
            let clause = clause.trim();
            if clause.eq_ignore_ascii_case("integer") {
                // The integer check composes with the remaining clauses
                constraint.requires_integer = true;
                continue;
            }
            let comparison = parse_comparison(clause)?;
            if !constraint.clauses.is_empty() {
                let connective = if index > 0 {
                    raw_connectives[index - 1]
                } else {
                    Connective::And
                };
                constraint.connectives.push(connective);
            }
            constraint.clauses.push(comparison);
        }

        Ok(constraint)
    }

    /// The original rule text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether a soft rule opts out of range checking entirely
    pub fn is_soft_skip(rule: &str) -> bool {
        let lowered = rule.trim().to_ascii_lowercase();
        lowered == "optional" || lowered == "not_empty"
    }

    /// Check a value against this constraint.
    ///
    /// Non-numeric values fail numeric constraints with an error describing
    /// the coercion failure.
    pub fn check(&self, value: &Value) -> FormulaResult<bool> {
        if self.not_empty {
            let present = match value.scalar() {
                Some(Value::Text(s)) => !s.trim().is_empty(),
                Some(_) => true,
                None => false,
            };
            return Ok(present);
        }

        let numeric =
            parse_numeric(value).map_err(|e| FormulaError::Evaluation(e.to_string()))?;

        if self.requires_integer && numeric.fract() != 0.0 {
            return Ok(false);
        }

        let mut results = self.clauses.iter().map(|c| c.holds(numeric));
        let Some(first) = results.next() else {
            return Ok(true);
        };

        // Left-to-right combination, no precedence
        let mut outcome = first;
        for (connective, result) in self.connectives.iter().zip(results) {
            outcome = match connective {
                Connective::And => outcome && result,
                Connective::Or => outcome || result,
            };
        }

        Ok(outcome)
    }

    /// The closed `>= min AND <= max` range, when this constraint is exactly
    /// that shape. Used to grade how far outside a value landed.
    pub fn closed_range(&self) -> Option<(f64, f64)> {
        if self.not_empty || self.connectives.iter().any(|c| *c == Connective::Or) {
            return None;
        }

        let mut min = None;
        let mut max = None;
        for clause in &self.clauses {
            match clause {
                Comparison::Ge(t) if min.is_none() => min = Some(*t),
                Comparison::Le(t) if max.is_none() => max = Some(*t),
                _ => return None,
            }
        }

        match (min, max) {
            (Some(min), Some(max)) if min <= max => Some((min, max)),
            _ => None,
        }
    }
}

/// Parse one comparison clause. Operators may be followed by the threshold
/// (`>= 0.25`); `>=`/`<=` are matched ahead of their one-character forms.
fn parse_comparison(clause: &str) -> FormulaResult<Comparison> {
    let threshold = |rest: &str| -> FormulaResult<f64> {
        rest.trim()
            .parse()
            .map_err(|_| FormulaError::Condition(clause.to_string()))
    };

    if let Some(rest) = clause.split_once(">=").map(|(_, r)| r) {
        Ok(Comparison::Ge(threshold(rest)?))
    } else if let Some(rest) = clause.split_once("<=").map(|(_, r)| r) {
        Ok(Comparison::Le(threshold(rest)?))
    } else if let Some(rest) = clause.split_once('>').map(|(_, r)| r) {
        Ok(Comparison::Gt(threshold(rest)?))
    } else if let Some(rest) = clause.split_once('<').map(|(_, r)| r) {
        Ok(Comparison::Lt(threshold(rest)?))
    } else if let Some(rest) = clause.split_once('=').map(|(_, r)| r) {
        Ok(Comparison::Eq(threshold(rest)?))
    } else {
        Err(FormulaError::Condition(clause.to_string()))
    }
}
