//! Calculation context
//!
//! One [`CalcContext`] exists per report record being processed. It holds
//! the immutable raw-field snapshot, the mutable resolved-value map, the
//! audit logs, and the run's [`ConversionTracker`]. Contexts are never
//! shared between reports; a host that parallelizes across reports gives
//! each unit its own context.

use ahash::AHashMap;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;

use vantage_metrics_core::{ConversionTracker, ReportPeriod, Value};

use crate::error::RunError;
use crate::ytd::YtdOutcome;

/// One recorded fallback usage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackEntry {
    pub variable: String,
    pub value: Value,
    /// Resolution source label, e.g. `"global_default"` or `"previous_period(6mo)"`
    pub source: String,
    /// RFC 3339 timestamp of the resolution
    pub at: String,
}

/// One recorded formula calculation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalcLogEntry {
    pub variable: String,
    pub formula: String,
    pub result: f64,
    pub level: usize,
    /// The substituted numeric expression that was evaluated
    pub expression: String,
    /// `name=value` operand pairs
    pub operands: Vec<String>,
}

/// A hard validation violation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationFlag {
    pub variable: String,
    pub value: Value,
    pub message: String,
}

/// How far outside a closed expected range a value landed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeSeverity {
    Outside,
    FarOutside,
}

/// A soft expected-range violation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpectedFlag {
    pub variable: String,
    pub value: Value,
    pub message: String,
    /// Graded severity when the rule was a closed range
    pub severity: Option<RangeSeverity>,
}

/// Per-report calculation state
#[derive(Debug)]
pub struct CalcContext {
    pub client_id: String,
    pub period: ReportPeriod,
    raw: HashMap<String, Value>,
    resolved: AHashMap<String, Value>,
    pub fallback_log: Vec<FallbackEntry>,
    pub calculation_log: Vec<CalcLogEntry>,
    pub errors: Vec<RunError>,
    pub warnings: Vec<String>,
    pub validation_flags: Vec<ValidationFlag>,
    pub expected_flags: Vec<ExpectedFlag>,
    pub ytd: Option<YtdOutcome>,
    pub tracker: ConversionTracker,
}

impl CalcContext {
    /// Create a context over an immutable snapshot of the report's raw fields
    pub fn new(client_id: String, period: ReportPeriod, raw: HashMap<String, Value>) -> Self {
        Self {
            client_id,
            period,
            raw,
            resolved: AHashMap::new(),
            fallback_log: Vec::new(),
            calculation_log: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            validation_flags: Vec::new(),
            expected_flags: Vec::new(),
            ytd: None,
            tracker: ConversionTracker::new(),
        }
    }

    /// Record a resolved or calculated value. Sources other than
    /// `"calculated"` also land in the fallback log.
    pub fn add_value(&mut self, variable: &str, value: Value, source: &str) {
        self.resolved.insert(variable.to_string(), value.clone());
        if source != "calculated" {
            self.fallback_log.push(FallbackEntry {
                variable: variable.to_string(),
                value,
                source: source.to_string(),
                at: Utc::now().to_rfc3339(),
            });
        }
    }

    /// Look up a value: resolved values win over raw data. Multi-valued
    /// lookup fields are normalized to their first element.
    pub fn value_of(&self, variable: &str) -> Option<Value> {
        self.resolved
            .get(variable)
            .or_else(|| self.raw.get(variable))
            .and_then(|v| v.scalar())
            .cloned()
    }

    /// Whether the variable has been written to the resolved map this run
    pub fn is_resolved(&self, variable: &str) -> bool {
        self.resolved.contains_key(variable)
    }

    /// All values available for formula evaluation: raw fields overlaid by
    /// resolved values, every entry normalized to a scalar.
    pub fn all_values(&self) -> HashMap<String, Value> {
        let mut all = HashMap::with_capacity(self.raw.len() + self.resolved.len());
        for (name, value) in self.raw.iter().chain(self.resolved.iter()) {
            if let Some(scalar) = value.scalar() {
                all.insert(name.clone(), scalar.clone());
            }
        }
        all
    }

    /// Snapshot of the resolved map, for validation and output mapping
    pub fn resolved_values(&self) -> Vec<(String, Value)> {
        self.resolved
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Number of values resolved or calculated this run
    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> CalcContext {
        let period = ReportPeriod::parse("2025-06-01", "2025-06-30").unwrap();
        let mut raw = HashMap::new();
        raw.insert("hhs".to_string(), Value::Number(120.0));
        raw.insert(
            "cost".to_string(),
            Value::Many(vec![Value::Number(1500.0)]),
        );
        CalcContext::new("client-1".to_string(), period, raw)
    }

    #[test]
    fn test_resolved_wins_over_raw() {
        let mut ctx = context();
        assert_eq!(ctx.value_of("hhs"), Some(Value::Number(120.0)));

        ctx.add_value("hhs", Value::Number(130.0), "calculated");
        assert_eq!(ctx.value_of("hhs"), Some(Value::Number(130.0)));
    }

    #[test]
    fn test_lookup_fields_normalized() {
        let ctx = context();
        assert_eq!(ctx.value_of("cost"), Some(Value::Number(1500.0)));
        assert_eq!(ctx.all_values().get("cost"), Some(&Value::Number(1500.0)));
    }

    #[test]
    fn test_fallback_sources_are_logged() {
        let mut ctx = context();
        ctx.add_value("autos", Value::Number(0.0), "zero_fallback");
        ctx.add_value("rate", Value::Number(0.4), "calculated");

        assert_eq!(ctx.fallback_log.len(), 1);
        assert_eq!(ctx.fallback_log[0].variable, "autos");
        assert_eq!(ctx.fallback_log[0].source, "zero_fallback");
    }
}
