//! The calculation engine
//!
//! Drives level-by-level computation over the externally supplied
//! dependency order: level 0 resolves input variables through their
//! fallback chains, levels 1-5 evaluate formulas over already-resolved
//! values, the year-to-date aggregation runs once level 3 has completed,
//! and a final validation pass grades every resolved value. All
//! collaborators are injected; the engine holds no global state.
//!
//! # Example
//!
//! ```rust,ignore
//! use vantage_metrics::{Engine, EngineOptions, ReportRecord};
//!
//! let engine = Engine::new(&catalog, &defaults, &overrides, &history);
//! let outcome = engine.calculate(&record, &order);
//! if outcome.success {
//!     println!("calculated {} values", outcome.values.len());
//! }
//! ```

use serde::Serialize;
use std::collections::HashMap;

use vantage_metrics_core::{
    ClientOverrides, DataType, DependencyOrder, GlobalDefaults, HistoricalReports, ReportPeriod,
    SourceType, Value, VariableCatalog, MAX_CALC_LEVEL,
};
use vantage_metrics_formula::{evaluate_template, placeholders};

use crate::context::{CalcContext, CalcLogEntry, ExpectedFlag, FallbackEntry, ValidationFlag};
use crate::error::RunError;
use crate::output;
use crate::resolver::{resolve, Resolution};
use crate::validator::validate_all;
use crate::ytd::{calculate_ytd, YtdOutcome};

/// Options for a calculation run
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Base variable for the year-to-date aggregation
    pub ytd_base: String,
    /// Source-detail labels whose variables are excluded from output
    pub excluded_source_details: Vec<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            ytd_base: "hhs".to_string(),
            excluded_source_details: Vec::new(),
        }
    }
}

/// The input report record: identifiers, the reporting window, and an
/// immutable snapshot of the raw field values.
#[derive(Debug, Clone)]
pub struct ReportRecord {
    pub report_id: String,
    pub client_id: String,
    pub period: ReportPeriod,
    pub fields: HashMap<String, Value>,
}

/// Everything a run produced. Serializable so hosts can persist the
/// detailed run log as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// True when no errors were recorded
    pub success: bool,
    /// All resolved and calculated values
    pub values: HashMap<String, Value>,
    /// Typed output fields ready for the result sink
    pub fields: HashMap<String, Value>,
    pub calculation_log: Vec<CalcLogEntry>,
    pub fallback_log: Vec<FallbackEntry>,
    /// Stringified run errors, in order of occurrence
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub validation_flags: Vec<ValidationFlag>,
    pub expected_flags: Vec<ExpectedFlag>,
    pub ytd: Option<YtdOutcome>,
    /// Human-readable calculation narrative for audit
    pub narrative: String,
}

impl RunOutcome {
    /// Serialize the outcome as pretty-printed JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
    }
}

/// The calculation engine, bound to its injected collaborators
pub struct Engine<'a> {
    catalog: &'a VariableCatalog,
    defaults: &'a GlobalDefaults,
    overrides: &'a dyn ClientOverrides,
    history: &'a dyn HistoricalReports,
    options: EngineOptions,
}

impl<'a> Engine<'a> {
    pub fn new(
        catalog: &'a VariableCatalog,
        defaults: &'a GlobalDefaults,
        overrides: &'a dyn ClientOverrides,
        history: &'a dyn HistoricalReports,
    ) -> Self {
        Self {
            catalog,
            defaults,
            overrides,
            history,
            options: EngineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Run the full calculation for one report record.
    ///
    /// Data-quality problems never escape as panics or `Err`; they
    /// accumulate on the outcome, and `success` is simply "no errors".
    pub fn calculate(&self, record: &ReportRecord, order: &DependencyOrder) -> RunOutcome {
        let mut ctx = CalcContext::new(
            record.client_id.clone(),
            record.period,
            record.fields.clone(),
        );
        // Trackers must never carry conversions across reports
        ctx.tracker.reset();

        tracing::info!(
            report_id = %record.report_id,
            client_id = %record.client_id,
            variables = order.len(),
            "starting calculation run"
        );

        self.resolve_level_zero(&mut ctx, order);

        for level in 1..=MAX_CALC_LEVEL {
            self.calculate_level(&mut ctx, order, level);

            // The YTD base is resolved by level 3; aggregate before the
            // deeper levels so they can reference the total.
            if level == 3 {
                self.run_ytd(&mut ctx);
            }
        }

        validate_all(&mut ctx, self.catalog);

        let fields = output::map_fields(&mut ctx, self.catalog, &self.options);
        let narrative = output::narrative(&ctx, self.catalog);

        let success = ctx.errors.is_empty();
        tracing::info!(
            success,
            resolved = ctx.resolved_count(),
            errors = ctx.errors.len(),
            warnings = ctx.warnings.len(),
            "calculation run finished"
        );

        let values: HashMap<String, Value> = ctx.resolved_values().into_iter().collect();
        let errors: Vec<String> = ctx.errors.iter().map(|e| e.to_string()).collect();

        RunOutcome {
            success,
            values,
            fields,
            calculation_log: ctx.calculation_log,
            fallback_log: ctx.fallback_log,
            errors,
            warnings: ctx.warnings,
            validation_flags: ctx.validation_flags,
            expected_flags: ctx.expected_flags,
            ytd: ctx.ytd,
            narrative,
        }
    }

    /// Resolve level-0 input variables through their fallback chains.
    /// A variable with no resolvable value is a warning, not an error.
    fn resolve_level_zero(&self, ctx: &mut CalcContext, order: &DependencyOrder) {
        for variable in order.level(0) {
            let Some(def) = self.catalog.get(variable) else {
                ctx.errors.push(RunError::UnknownVariable(variable.clone()));
                continue;
            };

            match resolve(def, ctx, self.defaults, self.overrides, self.history, None) {
                Resolution::Found(value) => {
                    // Values straight from raw data are recorded so they
                    // flow into validation and output like any other.
                    // Percentages convert here, once, so every later stage
                    // sees the decimal form.
                    if !ctx.is_resolved(variable) {
                        let value = if def.data_type == DataType::Percentage {
                            ctx.tracker.convert(value, variable, "level_0_resolved").0
                        } else {
                            value
                        };
                        ctx.add_value(variable, value, "level_0_resolved");
                    }
                }
                Resolution::Formula | Resolution::Missing => {
                    ctx.warnings
                        .push(format!("level 0 variable '{}' has no value", variable));
                }
            }
        }
    }

    /// Evaluate the formulas of one dependency level
    fn calculate_level(&self, ctx: &mut CalcContext, order: &DependencyOrder, level: usize) {
        let variables = order.level(level);
        if variables.is_empty() {
            return;
        }
        tracing::debug!(level, count = variables.len(), "calculating level");

        for variable in variables {
            let Some(def) = self.catalog.get(variable) else {
                ctx.errors.push(RunError::UnknownVariable(variable.clone()));
                continue;
            };

            // Historical aggregates are produced by the YTD step, not the
            // generic formula pass.
            if def.source_type == SourceType::ClientHistorical {
                continue;
            }

            if def.formula.trim().is_empty() {
                ctx.errors.push(RunError::MissingFormula(variable.clone()));
                continue;
            }

            let values = ctx.all_values();
            let types = self.placeholder_types(&def.formula);

            match evaluate_template(&def.formula, &values, &types, &mut ctx.tracker) {
                Ok(eval) => {
                    ctx.add_value(variable, Value::Number(eval.result), "calculated");
                    ctx.calculation_log.push(CalcLogEntry {
                        variable: variable.clone(),
                        formula: def.formula.clone(),
                        result: eval.result,
                        level,
                        expression: eval.expression,
                        operands: eval.operands,
                    });
                    // Division by zero keeps the usable 0 result but is
                    // still reported.
                    if let Some(note) = eval.note {
                        ctx.errors.push(RunError::Formula {
                            variable: variable.clone(),
                            message: note,
                        });
                    }
                }
                Err(e) => {
                    ctx.errors.push(RunError::Formula {
                        variable: variable.clone(),
                        message: e.to_string(),
                    });
                    // Last resort: the variable's own fallback chain
                    if resolve(
                        def,
                        ctx,
                        self.defaults,
                        self.overrides,
                        self.history,
                        Some("fallback_after_error"),
                    ) == Resolution::Formula
                    {
                        tracing::debug!(variable = %variable, "calculation fallback loops to formula");
                    }
                }
            }
        }
    }

    /// Declared data types for every placeholder in a formula
    fn placeholder_types(&self, formula: &str) -> HashMap<String, DataType> {
        placeholders(formula)
            .into_iter()
            .filter_map(|name| {
                self.catalog
                    .get(&name)
                    .map(|def| (name, def.data_type))
            })
            .collect()
    }

    /// Run the year-to-date aggregation and record its result
    fn run_ytd(&self, ctx: &mut CalcContext) {
        let base = self.options.ytd_base.clone();
        let outcome = calculate_ytd(ctx, &base, self.history);

        if let Some(error) = &outcome.query_error {
            ctx.errors.push(RunError::Ytd(error.clone()));
        }

        match outcome.total {
            Some(total) => {
                ctx.add_value(&outcome.variable, Value::Number(total), "calculated_ytd");
            }
            None => {
                ctx.warnings.push(format!(
                    "{}: {}",
                    outcome.variable,
                    outcome.reason.as_deref().unwrap_or("no data available")
                ));
            }
        }

        ctx.ytd = Some(outcome);
    }
}
