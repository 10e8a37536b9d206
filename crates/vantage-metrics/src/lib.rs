//! # vantage-metrics
//!
//! A calculation engine for derived business metrics ("report variables")
//! computed from raw tabular client-report data.
//!
//! Variables are described declaratively in a catalog: a formula over
//! `{name}` placeholders, an ordered fallback chain, a data type, and hard
//! and soft range constraints. An externally computed dependency order
//! partitions variables into levels; the engine resolves level-0 inputs
//! through their fallback chains, evaluates each deeper level's formulas
//! over the already-resolved values, aggregates the year-to-date series,
//! validates every result, and maps the final value set into typed output
//! fields.
//!
//! ## Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use vantage_metrics::prelude::*;
//!
//! let catalog: VariableCatalog = [
//!     VariableDefinition::new("hhs"),
//!     VariableDefinition::new("cost"),
//!     VariableDefinition::new("cost_per_hh")
//!         .with_formula("{cost} / {hhs}")
//!         .with_depth(1),
//! ]
//! .into_iter()
//! .collect();
//!
//! let order = DependencyOrder::from_levels(vec![
//!     vec!["hhs".into(), "cost".into()],
//!     vec!["cost_per_hh".into()],
//! ]);
//!
//! let record = ReportRecord {
//!     report_id: "rpt-1".into(),
//!     client_id: "client-1".into(),
//!     period: ReportPeriod::parse("2025-06-01", "2025-06-30").unwrap(),
//!     fields: HashMap::from([
//!         ("hhs".to_string(), Value::Number(120.0)),
//!         ("cost".to_string(), Value::Number(1500.0)),
//!     ]),
//! };
//!
//! let defaults = GlobalDefaults::new();
//! let engine = Engine::new(&catalog, &defaults, &NoOverrides, &NoHistory);
//! let outcome = engine.calculate(&record, &order);
//!
//! assert!(outcome.success);
//! assert_eq!(outcome.values["cost_per_hh"], Value::Number(12.5));
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod output;
pub mod prelude;
pub mod resolver;
pub mod validator;
pub mod ytd;

// Re-export engine types
pub use context::{
    CalcContext, CalcLogEntry, ExpectedFlag, FallbackEntry, RangeSeverity, ValidationFlag,
};
pub use engine::{Engine, EngineOptions, ReportRecord, RunOutcome};
pub use error::RunError;
pub use output::{map_fields, narrative, write_results};
pub use resolver::{resolve, Resolution};
pub use validator::validate_all;
pub use ytd::{calculate_ytd, MonthStatus, YtdOutcome};

// Re-export core types
pub use vantage_metrics_core::{
    parse_numeric, ClientOverrides, Conversion, ConversionTracker, DataType, DependencyOrder,
    Error, FallbackKind, GlobalDefaults, HistoricalReports, MonthlyValue, NoHistory, NoOverrides,
    ReportPeriod, Result, ResultSink, SourceType, Value, VariableCatalog, VariableDefinition,
    MAX_CALC_LEVEL,
};

// Re-export formula types
pub use vantage_metrics_formula::{
    evaluate_template, placeholders, Constraint, Evaluation, FormulaError, FormulaResult,
};
