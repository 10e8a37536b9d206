//! Result validation
//!
//! Two independent passes over every resolved value that has rules in the
//! catalog: hard rules (violations are run errors) and soft expected-range
//! rules (violations are warnings). Soft violations against a closed
//! `>= min AND <= max` range are graded `Outside` or `FarOutside` by
//! comparing the distance beyond the boundary to the range width.

use vantage_metrics_core::{parse_numeric, Value, VariableCatalog};
use vantage_metrics_formula::Constraint;

use crate::context::{CalcContext, ExpectedFlag, RangeSeverity, ValidationFlag};
use crate::error::RunError;

/// Validate all resolved values against their catalog rules
pub fn validate_all(ctx: &mut CalcContext, catalog: &VariableCatalog) {
    for (variable, value) in ctx.resolved_values() {
        let Some(def) = catalog.get(&variable) else {
            continue;
        };

        // Hard validation (run errors)
        if let Some(rule) = def.validation_rule.as_deref() {
            if let Some(message) = check_hard(rule, &value) {
                ctx.validation_flags.push(ValidationFlag {
                    variable: variable.clone(),
                    value: value.clone(),
                    message: message.clone(),
                });
                ctx.errors.push(RunError::Validation {
                    variable: variable.clone(),
                    message,
                });
            }
        }

        // Soft validation (warnings)
        if let Some(rule) = def.expected_range.as_deref() {
            if Constraint::is_soft_skip(rule) {
                continue;
            }
            if let Some((message, severity)) = check_soft(rule, &value) {
                ctx.warnings.push(format!("{}: {}", variable, message));
                ctx.expected_flags.push(ExpectedFlag {
                    variable,
                    value,
                    message,
                    severity,
                });
            }
        }
    }

    tracing::debug!(
        hard = ctx.validation_flags.len(),
        soft = ctx.expected_flags.len(),
        "validation finished"
    );
}

/// Check a hard rule; returns the violation message, if any
fn check_hard(rule: &str, value: &Value) -> Option<String> {
    let constraint = match Constraint::parse(rule) {
        Ok(constraint) => constraint,
        Err(e) => return Some(format!("validation error: {}", e)),
    };
    match constraint.check(value) {
        Ok(true) => None,
        Ok(false) => Some(format!(
            "validation failed: {} does not satisfy '{}'",
            value, rule
        )),
        Err(e) => Some(format!("validation error: {}", e)),
    }
}

/// Check a soft rule; returns the violation message and graded severity
fn check_soft(rule: &str, value: &Value) -> Option<(String, Option<RangeSeverity>)> {
    let constraint = match Constraint::parse(rule) {
        Ok(constraint) => constraint,
        Err(e) => return Some((format!("expected range check error: {}", e), None)),
    };
    match constraint.check(value) {
        Ok(true) => None,
        Ok(false) => {
            let severity = grade_severity(&constraint, value);
            Some((
                format!("outside expected range: {} does not meet '{}'", value, rule),
                severity,
            ))
        }
        Err(e) => Some((format!("expected range check error: {}", e), None)),
    }
}

/// Grade how far outside a closed range the value landed
fn grade_severity(constraint: &Constraint, value: &Value) -> Option<RangeSeverity> {
    let (min, max) = constraint.closed_range()?;
    let numeric = parse_numeric(value).ok()?;

    let distance = if numeric < min {
        min - numeric
    } else if numeric > max {
        numeric - max
    } else {
        return None;
    };

    let width = max - min;
    if distance > width {
        Some(RangeSeverity::FarOutside)
    } else {
        Some(RangeSeverity::Outside)
    }
}
