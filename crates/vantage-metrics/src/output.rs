//! Output mapping
//!
//! Converts the final value set into typed, externally formatted fields for
//! the result sink, and renders the human-readable calculation narrative
//! used for audit.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::collections::HashMap;

use vantage_metrics_core::{
    parse_numeric, DataType, Result, ResultSink, Value, VariableCatalog,
};

use crate::context::{CalcContext, RangeSeverity};
use crate::engine::EngineOptions;

/// Map the context's final values to typed output fields.
///
/// Variables absent from the catalog are dropped, as are variables sourced
/// from an excluded external report. Currency rounds to 2 decimals,
/// percentages convert through the run's tracker (never twice), text casts
/// to a string; integer/decimal/image types pass through unchanged. Values
/// that fail their type's coercion are skipped rather than written.
pub fn map_fields(
    ctx: &mut CalcContext,
    catalog: &VariableCatalog,
    options: &EngineOptions,
) -> HashMap<String, Value> {
    let mut fields = HashMap::new();

    for (name, value) in ctx.all_values() {
        let Some(def) = catalog.get(&name) else {
            continue;
        };

        if def
            .source_details
            .iter()
            .any(|detail| options.excluded_source_details.contains(detail))
        {
            tracing::debug!(variable = %name, "skipping excluded source");
            continue;
        }

        match def.data_type {
            DataType::Currency => match parse_numeric(&value) {
                Ok(n) => {
                    let rounded = Decimal::from_f64(n)
                        .map(|d| d.round_dp(2))
                        .and_then(|d| d.to_f64());
                    match rounded {
                        Some(n) => {
                            fields.insert(name, Value::Number(n));
                        }
                        None => {
                            tracing::warn!(variable = %name, "currency value out of range");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(variable = %name, error = %e, "currency conversion failed");
                }
            },

            DataType::Number => match parse_numeric(&value) {
                Ok(n) => {
                    fields.insert(name, Value::Number(n));
                }
                Err(e) => {
                    tracing::warn!(variable = %name, error = %e, "number conversion failed");
                }
            },

            DataType::Percentage => {
                let (converted, _) = ctx.tracker.convert(value, &name, "write_results");
                match parse_numeric(&converted) {
                    Ok(n) => {
                        fields.insert(name, Value::Number(n));
                    }
                    Err(e) => {
                        tracing::warn!(variable = %name, error = %e, "percentage conversion failed");
                    }
                }
            }

            DataType::Text => {
                let text = value.as_text();
                fields.insert(name, Value::Text(text));
            }

            // Integer, decimal and image fields pass through unchanged
            _ => {
                fields.insert(name, value);
            }
        }
    }

    fields
}

/// Persist mapped fields through the injected result sink
pub fn write_results(
    sink: &mut dyn ResultSink,
    report_id: &str,
    fields: &HashMap<String, Value>,
) -> Result<String> {
    let record_id = sink.write_result(report_id, fields)?;
    tracing::info!(report_id, record_id = %record_id, fields = fields.len(), "results written");
    Ok(record_id)
}

/// Render the level-grouped calculation narrative with a data quality
/// summary, for audit alongside the written fields.
pub fn narrative(ctx: &CalcContext, catalog: &VariableCatalog) -> String {
    let mut out = Vec::new();

    // Group calculation-log entries by level
    let mut levels: Vec<usize> = ctx.calculation_log.iter().map(|e| e.level).collect();
    levels.sort_unstable();
    levels.dedup();

    for level in levels {
        let entries: Vec<_> = ctx
            .calculation_log
            .iter()
            .filter(|e| e.level == level)
            .collect();
        out.push(format!(
            "LEVEL {} CALCULATIONS ({} variables):",
            level,
            entries.len()
        ));
        out.push(String::new());

        for entry in entries {
            out.push(format!(
                "* {} = {}",
                entry.variable,
                format_number(entry.result)
            ));
            out.push(format!("  Formula: {}", entry.formula));
            out.push(format!(
                "  Calculated: {} = {}",
                entry.expression,
                format_number(entry.result)
            ));

            match ctx
                .fallback_log
                .iter()
                .find(|f| f.variable == entry.variable)
            {
                Some(fallback) => out.push(format!("  Fallback Used: {}", fallback.source)),
                None => out.push("  No Fallback (calculated from available data)".to_string()),
            }

            if let Some(def) = catalog.get(&entry.variable) {
                if let Some(rule) = &def.validation_rule {
                    let failed = ctx
                        .validation_flags
                        .iter()
                        .any(|f| f.variable == entry.variable);
                    let status = if failed { "FAIL" } else { "PASS" };
                    out.push(format!("  Valid Range: {} ({})", rule, status));
                }
                if let Some(rule) = &def.expected_range {
                    let flag = ctx
                        .expected_flags
                        .iter()
                        .find(|f| f.variable == entry.variable);
                    let status = match flag.and_then(|f| f.severity) {
                        None if flag.is_none() => "PASS".to_string(),
                        None => "OUTSIDE".to_string(),
                        Some(RangeSeverity::Outside) => "OUTSIDE".to_string(),
                        Some(RangeSeverity::FarOutside) => "FAR OUTSIDE".to_string(),
                    };
                    out.push(format!("  Expected Range: {} ({})", rule, status));
                }
            }
            out.push(String::new());
        }
    }

    // Year-to-date section
    if let Some(ytd) = &ctx.ytd {
        out.push("YEAR-TO-DATE:".to_string());
        match ytd.total {
            Some(total) => out.push(format!("* {} = {}", ytd.variable, format_number(total))),
            None => out.push(format!(
                "* {} = No Data ({})",
                ytd.variable,
                ytd.reason.as_deref().unwrap_or("no reason recorded")
            )),
        }
        for (month, status) in &ytd.months {
            match status {
                crate::ytd::MonthStatus::Reported(value) => {
                    out.push(format!("  month {}: {}", month, format_number(*value)))
                }
                crate::ytd::MonthStatus::Missing => {
                    out.push(format!("  month {}: missing", month))
                }
            }
        }
        out.push(String::new());
    }

    // Data quality summary
    out.push("DATA QUALITY SUMMARY:".to_string());
    out.push(format!("- Total Variables: {}", ctx.resolved_count()));
    out.push(format!("- Fallbacks Used: {}", ctx.fallback_log.len()));

    let mut by_source: Vec<(String, usize)> = Vec::new();
    for entry in &ctx.fallback_log {
        match by_source.iter_mut().find(|(s, _)| *s == entry.source) {
            Some((_, count)) => *count += 1,
            None => by_source.push((entry.source.clone(), 1)),
        }
    }
    for (source, count) in by_source {
        out.push(format!("  - {}: {}", source, count));
    }

    let (hard_pass, hard_fail, soft_pass, soft_outside, soft_far) = validation_tallies(ctx, catalog);
    out.push("- Validation Results:".to_string());
    let hard_total = hard_pass + hard_fail;
    if hard_total > 0 {
        let pct = (hard_pass as f64 / hard_total as f64 * 100.0).round();
        out.push(format!(
            "  - Hard Validation Pass: {}/{} ({}%)",
            hard_pass, hard_total, pct
        ));
        if hard_fail > 0 {
            out.push(format!("  - Hard Validation Fail: {}", hard_fail));
        }
    }
    let soft_total = soft_pass + soft_outside + soft_far;
    if soft_total > 0 {
        let pct = (soft_pass as f64 / soft_total as f64 * 100.0).round();
        out.push(format!(
            "  - Within Expected Range: {}/{} ({}%)",
            soft_pass, soft_total, pct
        ));
        if soft_outside > 0 {
            out.push(format!("  - Outside Expected Range: {}", soft_outside));
        }
        if soft_far > 0 {
            out.push(format!("  - Far Outside Expected Range: {}", soft_far));
        }
    }

    if !ctx.validation_flags.is_empty() || !ctx.expected_flags.is_empty() {
        out.push(String::new());
        out.push("WARNINGS:".to_string());
        for flag in &ctx.validation_flags {
            out.push(format!("! {}: {}", flag.variable, flag.message));
        }
        for flag in &ctx.expected_flags {
            out.push(format!("~ {}: {}", flag.variable, flag.message));
        }
    }

    out.join("\n")
}

/// Count hard/soft rule outcomes over the resolved values
fn validation_tallies(
    ctx: &CalcContext,
    catalog: &VariableCatalog,
) -> (usize, usize, usize, usize, usize) {
    let mut hard_pass = 0;
    let mut hard_fail = 0;
    let mut soft_pass = 0;
    let mut soft_outside = 0;
    let mut soft_far = 0;

    for (variable, _) in ctx.resolved_values() {
        let Some(def) = catalog.get(&variable) else {
            continue;
        };
        if def.validation_rule.is_some() {
            if ctx.validation_flags.iter().any(|f| f.variable == variable) {
                hard_fail += 1;
            } else {
                hard_pass += 1;
            }
        }
        if let Some(rule) = def.expected_range.as_deref() {
            if vantage_metrics_formula::Constraint::is_soft_skip(rule) {
                continue;
            }
            match ctx.expected_flags.iter().find(|f| f.variable == variable) {
                Some(flag) => match flag.severity {
                    Some(RangeSeverity::FarOutside) => soft_far += 1,
                    _ => soft_outside += 1,
                },
                None => soft_pass += 1,
            }
        }
    }

    (hard_pass, hard_fail, soft_pass, soft_outside, soft_far)
}

/// Narrative number formatting: two decimals above 1, four below
fn format_number(value: f64) -> String {
    if value.abs() > 1.0 {
        format!("{:.2}", value)
    } else {
        format!("{:.4}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use vantage_metrics_core::{ReportPeriod, VariableDefinition};

    fn context_with(values: &[(&str, Value)]) -> CalcContext {
        let period = ReportPeriod::parse("2025-06-01", "2025-06-30").unwrap();
        let mut ctx = CalcContext::new("client-1".to_string(), period, HashMap::new());
        for (name, value) in values {
            ctx.add_value(name, value.clone(), "calculated");
        }
        ctx
    }

    #[test]
    fn test_currency_rounds_to_two_decimals() {
        let catalog: VariableCatalog =
            [VariableDefinition::new("premium").with_data_type(DataType::Currency)]
                .into_iter()
                .collect();
        let mut ctx = context_with(&[("premium", Value::Number(1234.5678))]);

        let fields = map_fields(&mut ctx, &catalog, &EngineOptions::default());
        assert_eq!(fields.get("premium"), Some(&Value::Number(1234.57)));
    }

    #[test]
    fn test_currency_string_parses() {
        let catalog: VariableCatalog =
            [VariableDefinition::new("premium").with_data_type(DataType::Currency)]
                .into_iter()
                .collect();
        let mut ctx = context_with(&[("premium", Value::from("$1,234.506"))]);

        let fields = map_fields(&mut ctx, &catalog, &EngineOptions::default());
        assert_eq!(fields.get("premium"), Some(&Value::Number(1234.51)));
    }

    #[test]
    fn test_percentage_not_double_converted() {
        let catalog: VariableCatalog =
            [VariableDefinition::new("rate").with_data_type(DataType::Percentage)]
                .into_iter()
                .collect();
        let mut ctx = context_with(&[]);

        // Simulate the resolver having already converted this variable
        let (converted, was) = ctx.tracker.convert(Value::from("25%"), "rate", "resolve_value");
        assert!(was);
        ctx.add_value("rate", converted, "calculated");

        let fields = map_fields(&mut ctx, &catalog, &EngineOptions::default());
        // 0.25, not 0.0025
        assert_eq!(fields.get("rate"), Some(&Value::Number(0.25)));
    }

    #[test]
    fn test_unmapped_variables_are_dropped() {
        let catalog = VariableCatalog::new();
        let mut ctx = context_with(&[("mystery", Value::Number(1.0))]);

        let fields = map_fields(&mut ctx, &catalog, &EngineOptions::default());
        assert!(fields.is_empty());
    }

    #[test]
    fn test_excluded_source_is_skipped() {
        let catalog: VariableCatalog = [VariableDefinition::new("total_leads")
            .with_source_detail("Partner Domain Report")]
        .into_iter()
        .collect();
        let mut ctx = context_with(&[("total_leads", Value::Number(42.0))]);

        let options = EngineOptions {
            excluded_source_details: vec!["Partner Domain Report".to_string()],
            ..EngineOptions::default()
        };
        let fields = map_fields(&mut ctx, &catalog, &options);
        assert!(fields.is_empty());
    }

    #[test]
    fn test_unparsable_number_is_skipped_not_written() {
        let catalog: VariableCatalog =
            [VariableDefinition::new("cost").with_data_type(DataType::Number)]
                .into_iter()
                .collect();
        let mut ctx = context_with(&[("cost", Value::from("n/a"))]);

        let fields = map_fields(&mut ctx, &catalog, &EngineOptions::default());
        assert!(fields.is_empty());
    }

    #[test]
    fn test_text_casts_to_string() {
        let catalog: VariableCatalog =
            [VariableDefinition::new("agency").with_data_type(DataType::Text)]
                .into_iter()
                .collect();
        let mut ctx = context_with(&[("agency", Value::Number(42.0))]);

        let fields = map_fields(&mut ctx, &catalog, &EngineOptions::default());
        assert_eq!(fields.get("agency"), Some(&Value::Text("42".to_string())));
    }

    #[test]
    fn test_narrative_mentions_levels_and_summary() {
        let catalog: VariableCatalog = [VariableDefinition::new("cost_per_hh")
            .with_formula("{cost} / {hhs}")
            .with_validation_rule(">= 0")]
        .into_iter()
        .collect();
        let mut ctx = context_with(&[("cost_per_hh", Value::Number(12.5))]);
        ctx.calculation_log.push(crate::context::CalcLogEntry {
            variable: "cost_per_hh".to_string(),
            formula: "{cost} / {hhs}".to_string(),
            result: 12.5,
            level: 1,
            expression: "1500 / 120".to_string(),
            operands: vec!["cost=1500".to_string(), "hhs=120".to_string()],
        });

        let text = narrative(&ctx, &catalog);
        assert!(text.contains("LEVEL 1 CALCULATIONS (1 variables):"));
        assert!(text.contains("* cost_per_hh = 12.50"));
        assert!(text.contains("Valid Range: >= 0 (PASS)"));
        assert!(text.contains("DATA QUALITY SUMMARY:"));
        assert!(text.contains("Hard Validation Pass: 1/1 (100%)"));
    }
}
