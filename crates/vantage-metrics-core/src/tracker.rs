//! Percentage conversion tracking
//!
//! Percentage values flow through several stages (resolution, formula
//! evaluation, output mapping) and each stage wants them as decimal
//! fractions. Converting in more than one stage silently corrupts the math
//! (0.25 becomes 0.0025), so every conversion goes through a per-run
//! [`ConversionTracker`] that guarantees a given variable is converted from
//! percentage points to a decimal fraction at most once.

use ahash::AHashSet;
use serde::Serialize;

use crate::value::Value;

/// One recorded percentage-to-decimal conversion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    pub variable: String,
    /// Pipeline stage that performed the conversion
    pub stage: String,
    pub from: Value,
    pub to: f64,
}

/// Convert-exactly-once guard for percentage values.
///
/// Must be reset (or freshly constructed) per calculation run; a long-lived
/// process that reuses one tracker across reports will corrupt later
/// reports' percentage values.
#[derive(Debug, Default)]
pub struct ConversionTracker {
    converted: AHashSet<String>,
    conversions: Vec<Conversion>,
    ambiguities: Vec<String>,
    errors: Vec<String>,
}

impl ConversionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the named variable has already been converted this run
    pub fn is_converted(&self, variable: &str) -> bool {
        self.converted.contains(variable)
    }

    /// Convert a percentage-representation value to a decimal fraction,
    /// at most once per variable per run.
    ///
    /// Returns the (possibly unchanged) value and whether a conversion
    /// happened on this call:
    /// - already converted: unchanged, `false`
    /// - text ending in `%`: stripped and divided by 100
    /// - numeric above 1: treated as percentage points, divided by 100
    /// - numeric exactly 1.0: ambiguous (1% or an already-decimal 100%);
    ///   left unchanged and logged, never converted
    /// - numeric in [0, 1): already a decimal fraction, unchanged
    /// - unparsable: unchanged, conversion error logged
    pub fn convert(&mut self, value: Value, variable: &str, stage: &str) -> (Value, bool) {
        if self.converted.contains(variable) {
            return (value, false);
        }

        let scalar = match value.scalar() {
            Some(v) => v.clone(),
            None => return (value, false),
        };

        match scalar {
            Value::Text(text) => {
                let trimmed = text.trim();
                if let Some(stripped) = trimmed.strip_suffix('%') {
                    match stripped.replace(',', "").trim().parse::<f64>() {
                        Ok(points) => {
                            let decimal = points / 100.0;
                            self.mark(variable, stage, value, decimal);
                            (Value::Number(decimal), true)
                        }
                        Err(_) => {
                            self.errors.push(format!(
                                "{}: cannot convert '{}' for {}",
                                stage, text, variable
                            ));
                            (value, false)
                        }
                    }
                } else {
                    match trimmed.replace(',', "").parse::<f64>() {
                        Ok(n) => self.convert_numeric(n, variable, stage, value),
                        Err(_) => {
                            self.errors.push(format!(
                                "{}: cannot convert '{}' for {}",
                                stage, text, variable
                            ));
                            (value, false)
                        }
                    }
                }
            }
            Value::Number(n) => self.convert_numeric(n, variable, stage, value),
            Value::Many(_) => (value, false),
        }
    }

    fn convert_numeric(
        &mut self,
        n: f64,
        variable: &str,
        stage: &str,
        original: Value,
    ) -> (Value, bool) {
        if n > 1.0 {
            let decimal = n / 100.0;
            self.mark(variable, stage, original, decimal);
            (Value::Number(decimal), true)
        } else if n == 1.0 {
            // 1.0 could mean "1%" or "100% already as a decimal"; leave it
            // alone and record the ambiguity.
            tracing::debug!(variable, stage, "ambiguous percentage value 1.0 left unconverted");
            self.ambiguities.push(format!(
                "{}: value for {} is exactly 1.0 (1% or already-decimal 100%?), left unconverted",
                stage, variable
            ));
            (original, false)
        } else {
            (original, false)
        }
    }

    fn mark(&mut self, variable: &str, stage: &str, from: Value, to: f64) {
        self.converted.insert(variable.to_string());
        self.conversions.push(Conversion {
            variable: variable.to_string(),
            stage: stage.to_string(),
            from,
            to,
        });
    }

    /// Conversions performed this run, in order
    pub fn conversions(&self) -> &[Conversion] {
        &self.conversions
    }

    /// Ambiguity notes (values of exactly 1.0)
    pub fn ambiguities(&self) -> &[String] {
        &self.ambiguities
    }

    /// Unparsable-value notes
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Clear all state. Called once per calculation run; state must never
    /// leak between reports processed by the same process.
    pub fn reset(&mut self) {
        self.converted.clear();
        self.conversions.clear();
        self.ambiguities.clear();
        self.errors.clear();
    }
}
