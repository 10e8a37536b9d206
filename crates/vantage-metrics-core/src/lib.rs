//! # vantage-metrics-core
//!
//! Core data structures for the vantage-metrics report calculation engine.
//!
//! This crate provides the fundamental types used throughout vantage-metrics:
//! - [`Value`] - Dynamically typed field values crossing the record-store boundary
//! - [`VariableDefinition`] and [`VariableCatalog`] - The report-variable catalog
//! - [`ReportPeriod`] - The time window of a client report
//! - [`DependencyOrder`] - The externally computed leveled calculation order
//! - [`ConversionTracker`] - The convert-exactly-once guard for percentage values
//! - Collaborator traits for the backing record store
//!
//! ## Example
//!
//! ```rust
//! use vantage_metrics_core::{Value, parse_numeric};
//!
//! let raw = Value::from("$1,234.50");
//! assert_eq!(parse_numeric(&raw).unwrap(), 1234.5);
//! ```

pub mod error;
pub mod order;
pub mod period;
pub mod store;
pub mod tracker;
pub mod value;
pub mod variable;

// Re-exports for convenience
pub use error::{Error, Result};
pub use order::DependencyOrder;
pub use period::ReportPeriod;
pub use store::{
    ClientOverrides, HistoricalReports, MonthlyValue, NoHistory, NoOverrides, ResultSink,
};
pub use tracker::{Conversion, ConversionTracker};
pub use value::{parse_numeric, Value};
pub use variable::{
    DataType, FallbackKind, GlobalDefaults, SourceType, VariableCatalog, VariableDefinition,
};

/// Deepest calculation level produced by the external dependency analysis
pub const MAX_CALC_LEVEL: usize = 5;
