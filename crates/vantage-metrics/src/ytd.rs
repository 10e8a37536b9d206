//! Year-to-date aggregation
//!
//! Sums a base variable across the completed months of the report year and
//! adds the current period's value when present. Runs after level 3 so the
//! base variable is already resolved for the current period.
//!
//! Per-month detail is retained for audit: each previous month maps to its
//! reported value or the literal `"missing"` marker.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use vantage_metrics_core::{parse_numeric, HistoricalReports};

use crate::context::CalcContext;

/// A previous month's contribution to the year-to-date total
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MonthStatus {
    Reported(f64),
    Missing,
}

impl Serialize for MonthStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MonthStatus::Reported(value) => serializer.serialize_f64(*value),
            MonthStatus::Missing => serializer.serialize_str("missing"),
        }
    }
}

/// Result of the year-to-date aggregation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YtdOutcome {
    /// The derived variable written to the context, `<base>_ytd`
    pub variable: String,
    /// Aggregated total; `None` means "No Data"
    pub total: Option<f64>,
    /// Why the total is absent or degraded
    pub reason: Option<String>,
    /// Per-month audit detail for the months before the report month
    pub months: BTreeMap<u32, MonthStatus>,
    /// The current period's base-variable value, when available
    pub current: Option<f64>,
    /// Set when the historical query itself failed; reported as a run error
    pub query_error: Option<String>,
}

/// Aggregate the base variable year-to-date for the context's report period
pub fn calculate_ytd(
    ctx: &CalcContext,
    base: &str,
    history: &dyn HistoricalReports,
) -> YtdOutcome {
    let variable = format!("{}_ytd", base);
    let previous_months = ctx.period.previous_months();
    let current = ctx
        .value_of(base)
        .and_then(|v| parse_numeric(&v).ok());

    // January (or any period with no completed months this year): the
    // current value stands alone.
    if previous_months.is_empty() {
        return match current {
            Some(value) => YtdOutcome {
                variable,
                total: Some(value),
                reason: Some("no previous months in the report year, using current value".into()),
                months: BTreeMap::new(),
                current,
                query_error: None,
            },
            None => YtdOutcome {
                variable,
                total: None,
                reason: Some(format!(
                    "no previous months and no current value for {}",
                    base
                )),
                months: BTreeMap::new(),
                current,
                query_error: None,
            },
        };
    }

    let records = match history.find_full_month_records(
        &ctx.client_id,
        base,
        ctx.period.year(),
        &previous_months,
    ) {
        Ok(records) => records,
        Err(e) => {
            return YtdOutcome {
                variable,
                total: None,
                reason: Some(format!("historical query failed: {}", e)),
                months: BTreeMap::new(),
                current,
                query_error: Some(e.to_string()),
            };
        }
    };

    // Reported values, keyed by month; unparsable values count as missing
    let mut reported: BTreeMap<u32, f64> = BTreeMap::new();
    for record in records {
        if !previous_months.contains(&record.month) {
            continue;
        }
        if let Ok(value) = parse_numeric(&record.value) {
            reported.insert(record.month, value);
        }
    }

    let months: BTreeMap<u32, MonthStatus> = previous_months
        .iter()
        .map(|month| {
            let status = reported
                .get(month)
                .map(|v| MonthStatus::Reported(*v))
                .unwrap_or(MonthStatus::Missing);
            (*month, status)
        })
        .collect();

    if reported.is_empty() {
        // No history at all: degrade to the current value when we have one
        return match current {
            Some(value) => YtdOutcome {
                variable,
                total: Some(value),
                reason: Some("no historical data found, using current value".into()),
                months,
                current,
                query_error: None,
            },
            None => YtdOutcome {
                variable,
                total: None,
                reason: Some(format!(
                    "no historical data and no current value for {}",
                    base
                )),
                months,
                current,
                query_error: None,
            },
        };
    }

    let total = reported.values().sum::<f64>() + current.unwrap_or(0.0);

    YtdOutcome {
        variable,
        total: Some(total),
        reason: None,
        months,
        current,
        query_error: None,
    }
}
