//! Prelude module - common imports for vantage-metrics users
//!
//! ```rust
//! use vantage_metrics::prelude::*;
//! ```

pub use crate::{
    // Tracker
    ConversionTracker,
    // Catalog types
    DataType,
    DependencyOrder,
    // Engine types
    Engine,
    EngineOptions,
    // Error types
    Error,
    FallbackKind,
    GlobalDefaults,
    // Collaborators
    ClientOverrides,
    HistoricalReports,
    MonthlyValue,
    NoHistory,
    NoOverrides,
    ReportPeriod,
    ReportRecord,
    Result,
    ResultSink,
    RunError,
    RunOutcome,
    SourceType,
    // Values
    Value,
    VariableCatalog,
    VariableDefinition,
    YtdOutcome,
};
