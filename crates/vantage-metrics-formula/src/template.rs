//! Formula templates
//!
//! A formula is a template string such as `{hhs} x {autos_per_hh}`: zero or
//! more `{name}` placeholders, an optional leading `=`, the operators
//! `+ - * / ( )`, and the ` x `/` X ` multiplication alias. This module
//! resolves placeholders against the available values, substitutes numeric
//! literals, and evaluates the resulting expression under the arithmetic
//! grammar.
//!
//! Percentage-typed operands are converted through the run's
//! [`ConversionTracker`] so a value that already resolved to a decimal
//! fraction is never divided by 100 a second time.

use lazy_regex::regex;
use std::collections::HashMap;

use vantage_metrics_core::{ConversionTracker, DataType, Value};

use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::evaluate;
use crate::parser::parse_expression;

/// Successful formula evaluation: the numeric result plus an audit trail
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub result: f64,
    /// The substituted numeric expression that was actually evaluated
    pub expression: String,
    /// `name=value` operand pairs, in order of appearance
    pub operands: Vec<String>,
    /// Set when the expression divided by zero: the result is the
    /// conventional 0 and this carries the note for the caller's error log
    pub note: Option<String>,
}

/// Extract placeholder names from a formula template, in order
pub fn placeholders(formula: &str) -> Vec<String> {
    regex!(r"\{([^}]+)\}")
        .captures_iter(formula)
        .map(|captures| captures[1].to_string())
        .collect()
}

/// Evaluate a formula template against the available values.
///
/// `types` carries the declared data type of each referenced variable;
/// operands typed as percentage are routed through `tracker`.
pub fn evaluate_template(
    formula: &str,
    values: &HashMap<String, Value>,
    types: &HashMap<String, DataType>,
    tracker: &mut ConversionTracker,
) -> FormulaResult<Evaluation> {
    if formula.trim().is_empty() {
        return Err(FormulaError::Empty);
    }

    let mut expression = formula.to_string();
    let mut operands = Vec::new();

    for name in placeholders(formula) {
        let raw = values
            .get(&name)
            .ok_or_else(|| FormulaError::MissingVariable(name.clone()))?;
        let scalar = raw
            .scalar()
            .cloned()
            .ok_or_else(|| FormulaError::MissingVariable(name.clone()))?;

        let number = operand_number(&name, scalar, types, tracker)?;
        operands.push(format!("{}={}", name, number));
        expression = expression.replace(&format!("{{{}}}", name), &number.to_string());
    }

    // Multiplication alias and assignment prefix
    expression = expression.replace(" x ", " * ").replace(" X ", " * ");
    let trimmed = expression.trim();
    let expression = trimmed
        .strip_prefix('=')
        .unwrap_or(trimmed)
        .trim()
        .to_string();

    // Character-set guard: the lexical safety boundary ahead of the grammar
    let allowed = |c: char| {
        c.is_ascii_digit()
            || c.is_ascii_whitespace()
            || matches!(c, '.' | '+' | '-' | '*' | '/' | '(' | ')')
    };
    if !expression.chars().all(allowed) {
        return Err(FormulaError::InvalidCharacters(expression));
    }

    let ast = parse_expression(&expression)?;
    match evaluate(&ast) {
        Ok(result) => Ok(Evaluation {
            result,
            expression,
            operands,
            note: None,
        }),
        Err(FormulaError::DivisionByZero) => Ok(Evaluation {
            result: 0.0,
            expression,
            operands,
            note: Some(format!("division by zero in formula: {}", formula)),
        }),
        Err(e) => Err(e),
    }
}

/// Coerce a single placeholder value to a number
fn operand_number(
    name: &str,
    value: Value,
    types: &HashMap<String, DataType>,
    tracker: &mut ConversionTracker,
) -> FormulaResult<f64> {
    let value = if types.get(name) == Some(&DataType::Percentage) {
        let (converted, _) = tracker.convert(value, name, "evaluate_formula");
        converted
    } else {
        value
    };

    match value {
        Value::Number(n) => Ok(n),
        Value::Text(text) => {
            // Strip thousands separators before the numeric parse
            let cleaned = text.replace(',', "");
            cleaned
                .trim()
                .parse()
                .map_err(|_| FormulaError::NonNumericOperand {
                    variable: name.to_string(),
                    value: text,
                })
        }
        Value::Many(_) => Err(FormulaError::NonNumericOperand {
            variable: name.to_string(),
            value: value.as_text(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn types(pairs: &[(&str, DataType)]) -> HashMap<String, DataType> {
        pairs.iter().map(|(k, t)| (k.to_string(), *t)).collect()
    }

    #[test]
    fn test_placeholder_extraction() {
        assert_eq!(
            placeholders("{hhs} x {autos_per_hh}"),
            vec!["hhs", "autos_per_hh"]
        );
        assert!(placeholders("1 + 2").is_empty());
    }

    #[test]
    fn test_multiplication_alias() {
        let mut tracker = ConversionTracker::new();
        let eval = evaluate_template(
            "{hhs} x {autos}",
            &values(&[("hhs", Value::Number(100.0)), ("autos", Value::Number(1.5))]),
            &HashMap::new(),
            &mut tracker,
        )
        .unwrap();
        assert_eq!(eval.result, 150.0);
        assert_eq!(eval.expression, "100 * 1.5");
        assert_eq!(eval.operands, vec!["hhs=100", "autos=1.5"]);
    }

    #[test]
    fn test_leading_equals_is_stripped() {
        let mut tracker = ConversionTracker::new();
        let eval = evaluate_template(
            "= {a} + {b}",
            &values(&[("a", Value::Number(2.0)), ("b", Value::Number(3.0))]),
            &HashMap::new(),
            &mut tracker,
        )
        .unwrap();
        assert_eq!(eval.result, 5.0);
    }

    #[test]
    fn test_empty_formula() {
        let mut tracker = ConversionTracker::new();
        assert_eq!(
            evaluate_template("", &HashMap::new(), &HashMap::new(), &mut tracker),
            Err(FormulaError::Empty)
        );
    }

    #[test]
    fn test_missing_variable() {
        let mut tracker = ConversionTracker::new();
        let err = evaluate_template(
            "{a} + {gone}",
            &values(&[("a", Value::Number(1.0))]),
            &HashMap::new(),
            &mut tracker,
        )
        .unwrap_err();
        assert_eq!(err, FormulaError::MissingVariable("gone".into()));
    }

    #[test]
    fn test_thousands_separators_in_operands() {
        let mut tracker = ConversionTracker::new();
        let eval = evaluate_template(
            "{premium} / {hhs}",
            &values(&[
                ("premium", Value::from("1,200")),
                ("hhs", Value::Number(4.0)),
            ]),
            &HashMap::new(),
            &mut tracker,
        )
        .unwrap();
        assert_eq!(eval.result, 300.0);
    }

    #[test]
    fn test_non_numeric_operand_names_placeholder() {
        let mut tracker = ConversionTracker::new();
        let err = evaluate_template(
            "{a} + 1",
            &values(&[("a", Value::from("n/a"))]),
            &HashMap::new(),
            &mut tracker,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FormulaError::NonNumericOperand { variable, .. } if variable == "a"
        ));
    }

    #[test]
    fn test_division_by_zero_yields_zero_with_note() {
        let mut tracker = ConversionTracker::new();
        let eval = evaluate_template(
            "{a}/{b}",
            &values(&[("a", Value::Number(10.0)), ("b", Value::Number(0.0))]),
            &HashMap::new(),
            &mut tracker,
        )
        .unwrap();
        assert_eq!(eval.result, 0.0);
        assert!(eval.note.is_some());
    }

    #[test]
    fn test_injection_is_rejected_before_parsing() {
        let mut tracker = ConversionTracker::new();
        let err = evaluate_template(
            "__import__('os').system('true')",
            &HashMap::new(),
            &HashMap::new(),
            &mut tracker,
        )
        .unwrap_err();
        assert!(matches!(err, FormulaError::InvalidCharacters(_)));
    }

    #[test]
    fn test_percentage_operand_converts_exactly_once() {
        let mut tracker = ConversionTracker::new();
        let vals = values(&[("rate", Value::from("25%")), ("leads", Value::Number(200.0))]);
        let kinds = types(&[("rate", DataType::Percentage)]);

        let eval =
            evaluate_template("{rate} * {leads}", &vals, &kinds, &mut tracker).unwrap();
        assert_eq!(eval.result, 50.0);

        // A second formula referencing the now-decimal value must not divide again
        let vals = values(&[("rate", Value::Number(0.25)), ("leads", Value::Number(200.0))]);
        let eval =
            evaluate_template("{rate} * {leads}", &vals, &kinds, &mut tracker).unwrap();
        assert_eq!(eval.result, 50.0);
    }

    #[test]
    fn test_lookup_operand_is_scalar_extracted() {
        let mut tracker = ConversionTracker::new();
        let eval = evaluate_template(
            "{cost} / 2",
            &values(&[("cost", Value::Many(vec![Value::Number(10.0)]))]),
            &HashMap::new(),
            &mut tracker,
        )
        .unwrap();
        assert_eq!(eval.result, 5.0);
    }
}
