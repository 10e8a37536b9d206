//! Value resolution
//!
//! Resolves a single variable through its layered fallback chain: static
//! per-client override, then any value already in the context, then the
//! configured fallback slots in order. The `calculation` slot is not
//! resolved here; it defers to the caller's formula machinery.

use vantage_metrics_core::{
    parse_numeric, ClientOverrides, DataType, FallbackKind, GlobalDefaults, HistoricalReports,
    Value, VariableDefinition,
};

use crate::context::CalcContext;

/// Outcome of a resolution attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A value was found (and, unless it was already present, recorded)
    Found(Value),
    /// The variable's own formula should be evaluated by the caller
    Formula,
    /// The fallback chain is exhausted
    Missing,
}

/// Resolve a variable's value.
///
/// `source_tag` overrides the recorded fallback source label; the
/// orchestrator passes `"fallback_after_error"` when resolution runs as the
/// last resort after a formula failure.
///
/// Static overrides are checked before the already-resolved short-circuit,
/// so a client-static value wins even when a raw level-0 value exists.
pub fn resolve(
    def: &VariableDefinition,
    ctx: &mut CalcContext,
    defaults: &GlobalDefaults,
    overrides: &dyn ClientOverrides,
    history: &dyn HistoricalReports,
    source_tag: Option<&str>,
) -> Resolution {
    let variable = def.id.as_str();

    // 1. Per-client static override
    if def.source_type == vantage_metrics_core::SourceType::ClientStatic {
        match overrides.get_override(&ctx.client_id, variable) {
            Ok(Some(value)) => {
                let value = coerce_static(def, value, ctx);
                ctx.add_value(variable, value.clone(), "client_static");
                return Resolution::Found(value);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(variable, error = %e, "client override lookup failed");
            }
        }
    }

    // 2. Already resolved (or present in raw data): idempotent early return
    if let Some(existing) = ctx.value_of(variable) {
        return Resolution::Found(existing);
    }

    // 3. Fallback slots, in order
    for slot in def.fallbacks.iter().flatten() {
        let (value, source) = match slot {
            FallbackKind::Zero => (Some(Value::Number(0.0)), "zero_fallback".to_string()),

            FallbackKind::PreviousPeriod => {
                let found = history
                    .find_previous(
                        &ctx.client_id,
                        variable,
                        ctx.period.end,
                        def.lookback_months,
                    )
                    .unwrap_or_else(|e| {
                        tracing::warn!(variable, error = %e, "previous-period lookup failed");
                        None
                    });
                (
                    found,
                    format!("previous_period({}mo)", def.lookback_months),
                )
            }

            FallbackKind::GlobalDefault => (
                defaults.get(variable).cloned(),
                "global_default".to_string(),
            ),

            FallbackKind::Calculation => return Resolution::Formula,
        };

        if let Some(mut value) = value {
            if def.data_type == DataType::Percentage {
                let (converted, _) = ctx.tracker.convert(value, variable, "resolve_value");
                value = converted;
            }
            let source = source_tag.map(str::to_string).unwrap_or(source);
            tracing::debug!(variable, source = %source, "resolved via fallback");
            ctx.add_value(variable, value.clone(), &source);
            return Resolution::Found(value);
        }
    }

    Resolution::Missing
}

/// Coerce a static override by the variable's declared type
fn coerce_static(def: &VariableDefinition, value: Value, ctx: &mut CalcContext) -> Value {
    match def.data_type {
        DataType::Percentage => {
            let (converted, _) = ctx.tracker.convert(value, &def.id, "client_static");
            converted
        }
        DataType::Number | DataType::Currency => match parse_numeric(&value) {
            Ok(n) => Value::Number(n),
            Err(_) => value,
        },
        DataType::Text => Value::Text(value.as_text()),
        _ => value,
    }
}
