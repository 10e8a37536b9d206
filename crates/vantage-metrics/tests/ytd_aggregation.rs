//! End-to-end tests for the year-to-date aggregation step

mod common;

use common::{report, InMemoryHistory};
use vantage_metrics::prelude::*;
use vantage_metrics::MonthStatus;

fn ytd_catalog() -> VariableCatalog {
    [
        VariableDefinition::new("hhs_raw"),
        VariableDefinition::new("hhs")
            .with_formula("{hhs_raw} + 0")
            .with_depth(3),
        VariableDefinition::new("hhs_ytd")
            .with_source_type(SourceType::ClientHistorical)
            .with_depth(4),
    ]
    .into_iter()
    .collect()
}

fn ytd_order() -> DependencyOrder {
    DependencyOrder::from_levels(vec![
        vec!["hhs_raw".into()],
        vec![],
        vec![],
        vec!["hhs".into()],
        vec!["hhs_ytd".into()],
    ])
}

/// The YTD step runs after level 3, so it sees the freshly calculated base
/// value and sums it with the previous months.
#[test]
fn test_ytd_runs_after_level_three() {
    let catalog = ytd_catalog();
    let defaults = GlobalDefaults::new();
    let history = InMemoryHistory::new()
        .with_month("client-1", "hhs", 2025, 1, 100.0)
        .with_month("client-1", "hhs", 2025, 3, 150.0)
        .with_month("client-1", "hhs", 2025, 4, 200.0)
        .with_month("client-1", "hhs", 2025, 6, 180.0);
    let record = report(
        "client-1",
        "2025-07-01",
        "2025-07-31",
        &[("hhs_raw", Value::Number(190.0))],
    );

    let engine = Engine::new(&catalog, &defaults, &NoOverrides, &history);
    let outcome = engine.calculate(&record, &ytd_order());

    assert!(outcome.success, "errors: {:?}", outcome.errors);
    // 100 + 150 + 200 + 180 from history, plus the current month's 190
    assert_eq!(outcome.values["hhs_ytd"], Value::Number(820.0));

    let ytd = outcome.ytd.as_ref().unwrap();
    assert_eq!(ytd.months.get(&2), Some(&MonthStatus::Missing));
    assert_eq!(ytd.months.get(&5), Some(&MonthStatus::Missing));
    assert_eq!(ytd.months.get(&6), Some(&MonthStatus::Reported(180.0)));
    assert!(outcome
        .fallback_log
        .iter()
        .any(|f| f.variable == "hhs_ytd" && f.source == "calculated_ytd"));
}

/// January has no previous months: YTD equals the current value with an
/// empty per-month detail map.
#[test]
fn test_ytd_january_boundary() {
    let catalog = ytd_catalog();
    let defaults = GlobalDefaults::new();
    let record = report(
        "client-1",
        "2025-01-01",
        "2025-01-31",
        &[("hhs_raw", Value::Number(95.0))],
    );

    let engine = Engine::new(&catalog, &defaults, &NoOverrides, &NoHistory);
    let outcome = engine.calculate(&record, &ytd_order());

    assert_eq!(outcome.values["hhs_ytd"], Value::Number(95.0));
    assert!(outcome.ytd.as_ref().unwrap().months.is_empty());
}

/// January with no current value either: "No Data" as a warning, never an
/// error, and no hhs_ytd value is written.
#[test]
fn test_ytd_january_without_data_warns() {
    let catalog = ytd_catalog();
    let defaults = GlobalDefaults::new();
    let record = report("client-1", "2025-01-01", "2025-01-31", &[]);

    let engine = Engine::new(&catalog, &defaults, &NoOverrides, &NoHistory);
    let outcome = engine.calculate(&record, &ytd_order());

    assert!(!outcome.values.contains_key("hhs_ytd"));
    assert!(outcome.warnings.iter().any(|w| w.starts_with("hhs_ytd:")));
    // The formula error for hhs (missing hhs_raw) is separate; the YTD path
    // itself contributed no error.
    assert!(!outcome.errors.iter().any(|e| e.contains("year-to-date")));
}

/// A failing historical query degrades to "No Data" plus a run-level error.
#[test]
fn test_ytd_query_failure_is_logged() {
    struct FailingHistory;

    impl HistoricalReports for FailingHistory {
        fn find_previous(
            &self,
            _client: &str,
            _variable: &str,
            _before: chrono::NaiveDate,
            _window: u32,
        ) -> Result<Option<Value>> {
            Ok(None)
        }

        fn find_full_month_records(
            &self,
            _client: &str,
            _variable: &str,
            _year: i32,
            _months: &[u32],
        ) -> Result<Vec<MonthlyValue>> {
            Err(Error::Store("timeout".into()))
        }
    }

    let catalog = ytd_catalog();
    let defaults = GlobalDefaults::new();
    let record = report(
        "client-1",
        "2025-07-01",
        "2025-07-31",
        &[("hhs_raw", Value::Number(190.0))],
    );

    let engine = Engine::new(&catalog, &defaults, &NoOverrides, &FailingHistory);
    let outcome = engine.calculate(&record, &ytd_order());

    assert!(!outcome.success);
    assert!(outcome
        .errors
        .iter()
        .any(|e| e.contains("year-to-date") && e.contains("timeout")));
    assert!(!outcome.values.contains_key("hhs_ytd"));
}

/// The aggregation base is configurable through the engine options.
#[test]
fn test_ytd_base_is_configurable() {
    let catalog: VariableCatalog = [
        VariableDefinition::new("policies"),
        VariableDefinition::new("policies_ytd")
            .with_source_type(SourceType::ClientHistorical)
            .with_depth(4),
    ]
    .into_iter()
    .collect();
    let defaults = GlobalDefaults::new();
    let history = InMemoryHistory::new().with_month("client-1", "policies", 2025, 1, 12.0);
    let order = DependencyOrder::from_levels(vec![vec!["policies".into()]]);
    let record = report(
        "client-1",
        "2025-02-01",
        "2025-02-28",
        &[("policies", Value::Number(8.0))],
    );

    let engine = Engine::new(&catalog, &defaults, &NoOverrides, &history).with_options(
        EngineOptions {
            ytd_base: "policies".to_string(),
            ..EngineOptions::default()
        },
    );
    let outcome = engine.calculate(&record, &order);

    assert_eq!(outcome.values["policies_ytd"], Value::Number(20.0));
}
