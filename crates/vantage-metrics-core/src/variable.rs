//! The report-variable catalog
//!
//! Variable definitions are loaded once per calculation run from an external
//! catalog and are immutable for the duration of the run.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::value::{parse_numeric, Value};

/// Declared data type of a report variable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    Number,
    Currency,
    Percentage,
    Text,
    Integer,
    Decimal,
    Image,
}

impl DataType {
    /// Parse a catalog type label; unknown labels fall back to `Number`.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "currency" => DataType::Currency,
            "percentage" => DataType::Percentage,
            "text" => DataType::Text,
            "integer" => DataType::Integer,
            "decimal" => DataType::Decimal,
            "image" => DataType::Image,
            _ => DataType::Number,
        }
    }
}

/// Where a variable's value originates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Regular variable: raw data, fallbacks, or a formula
    #[default]
    Standard,
    /// Per-client static override; always wins over raw data
    ClientStatic,
    /// Aggregated from the client's historical records (year-to-date step)
    ClientHistorical,
}

impl SourceType {
    /// Parse a catalog source label; unknown labels fall back to `Standard`.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "client_static" => SourceType::ClientStatic,
            "client_historical" => SourceType::ClientHistorical,
            _ => SourceType::Standard,
        }
    }
}

/// A single fallback strategy in a variable's fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackKind {
    /// Use the literal value 0
    Zero,
    /// Use the most recent prior full-period value within the lookback window
    PreviousPeriod,
    /// Use the global default for this variable
    GlobalDefault,
    /// Defer to formula evaluation (handled by the caller, not the resolver)
    Calculation,
}

impl FallbackKind {
    /// Parse a catalog fallback label. Empty or unknown labels yield `None`.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "0" | "zero" => Some(FallbackKind::Zero),
            "previous_period" => Some(FallbackKind::PreviousPeriod),
            "global_default" => Some(FallbackKind::GlobalDefault),
            "calculation" => Some(FallbackKind::Calculation),
            _ => None,
        }
    }
}

/// Catalog definition of a single report variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDefinition {
    /// Unique variable identifier
    pub id: String,
    /// Formula template with `{name}` placeholders, or empty for input variables
    pub formula: String,
    /// Ordered fallback chain (slot 1, slot 2)
    pub fallbacks: [Option<FallbackKind>; 2],
    /// Declared data type
    pub data_type: DataType,
    /// Previous-period lookback window in months
    pub lookback_months: u32,
    /// Hard validation rule (violation is a run error)
    pub validation_rule: Option<String>,
    /// Soft expected-range rule (violation is a warning)
    pub expected_range: Option<String>,
    /// Value origin
    pub source_type: SourceType,
    /// Labels naming the upstream report(s) this variable is sourced from
    pub source_details: Vec<String>,
    /// Level assigned by the external dependency analysis
    pub depth: u8,
}

impl VariableDefinition {
    /// Create a definition with catalog defaults (input variable, number type)
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            formula: String::new(),
            fallbacks: [None, None],
            data_type: DataType::Number,
            lookback_months: 0,
            validation_rule: None,
            expected_range: None,
            source_type: SourceType::Standard,
            source_details: Vec::new(),
            depth: 0,
        }
    }

    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = formula.into();
        self
    }

    pub fn with_fallbacks(mut self, first: Option<FallbackKind>, second: Option<FallbackKind>) -> Self {
        self.fallbacks = [first, second];
        self
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn with_lookback_months(mut self, months: u32) -> Self {
        self.lookback_months = months;
        self
    }

    pub fn with_validation_rule(mut self, rule: impl Into<String>) -> Self {
        self.validation_rule = Some(rule.into());
        self
    }

    pub fn with_expected_range(mut self, rule: impl Into<String>) -> Self {
        self.expected_range = Some(rule.into());
        self
    }

    pub fn with_source_type(mut self, source_type: SourceType) -> Self {
        self.source_type = source_type;
        self
    }

    pub fn with_source_detail(mut self, label: impl Into<String>) -> Self {
        self.source_details.push(label.into());
        self
    }

    pub fn with_depth(mut self, depth: u8) -> Self {
        self.depth = depth;
        self
    }
}

/// The full variable catalog for a calculation run, keyed by identifier
#[derive(Debug, Clone, Default)]
pub struct VariableCatalog {
    variables: AHashMap<String, VariableDefinition>,
}

impl VariableCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a definition, replacing any previous one with the same id
    pub fn insert(&mut self, def: VariableDefinition) {
        self.variables.insert(def.id.clone(), def);
    }

    pub fn get(&self, id: &str) -> Option<&VariableDefinition> {
        self.variables.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.variables.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &VariableDefinition)> {
        self.variables.iter()
    }
}

impl FromIterator<VariableDefinition> for VariableCatalog {
    fn from_iter<T: IntoIterator<Item = VariableDefinition>>(iter: T) -> Self {
        let mut catalog = Self::new();
        for def in iter {
            catalog.insert(def);
        }
        catalog
    }
}

/// Global default values, keyed by variable identifier.
///
/// Upstream default entries are named with a `_global` suffix; insertion
/// strips it so lookups use the plain variable id.
#[derive(Debug, Clone, Default)]
pub struct GlobalDefaults {
    values: AHashMap<String, Value>,
}

impl GlobalDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a default as loaded from the defaults table: the `_global`
    /// suffix is stripped and numeric-typed entries are coerced to numbers.
    /// Entries that fail numeric coercion keep their raw value.
    pub fn insert(&mut self, name: &str, value: Value, data_type: DataType) {
        let clean = name.trim_end_matches("_global").to_string();
        let stored = match data_type {
            DataType::Number | DataType::Currency | DataType::Percentage => {
                match parse_numeric(&value) {
                    Ok(n) => Value::Number(n),
                    Err(_) => value,
                }
            }
            DataType::Text => Value::Text(value.as_text()),
            _ => value,
        };
        self.values.insert(clean, stored);
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.values.get(id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_parse() {
        assert_eq!(DataType::parse("Currency"), DataType::Currency);
        assert_eq!(DataType::parse("PERCENTAGE"), DataType::Percentage);
        assert_eq!(DataType::parse("mystery"), DataType::Number);
    }

    #[test]
    fn test_fallback_parse() {
        assert_eq!(FallbackKind::parse("0"), Some(FallbackKind::Zero));
        assert_eq!(
            FallbackKind::parse("previous_period"),
            Some(FallbackKind::PreviousPeriod)
        );
        assert_eq!(FallbackKind::parse(""), None);
    }

    #[test]
    fn test_global_defaults_strip_suffix() {
        let mut defaults = GlobalDefaults::new();
        defaults.insert("autos_per_hh_global", Value::from("1.8"), DataType::Number);
        assert_eq!(defaults.get("autos_per_hh"), Some(&Value::Number(1.8)));
        assert!(defaults.get("autos_per_hh_global").is_none());
    }

    #[test]
    fn test_global_defaults_keep_raw_on_bad_number() {
        let mut defaults = GlobalDefaults::new();
        defaults.insert("label_global", Value::from("tbd"), DataType::Number);
        assert_eq!(defaults.get("label"), Some(&Value::Text("tbd".into())));
    }
}
