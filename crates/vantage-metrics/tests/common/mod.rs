//! Shared in-memory collaborator fakes for integration tests
#![allow(dead_code)]

use std::collections::HashMap;

use vantage_metrics::prelude::*;

/// Client override store backed by a map of (client, variable) pairs
#[derive(Debug, Default)]
pub struct StaticOverrides {
    entries: HashMap<(String, String), Value>,
}

impl StaticOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, client: &str, variable: &str, value: Value) -> Self {
        self.entries
            .insert((client.to_string(), variable.to_string()), value);
        self
    }
}

impl ClientOverrides for StaticOverrides {
    fn get_override(&self, client_id: &str, variable_id: &str) -> Result<Option<Value>> {
        Ok(self
            .entries
            .get(&(client_id.to_string(), variable_id.to_string()))
            .cloned())
    }
}

/// Historical store backed by explicit rows
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    /// (client, variable) -> most recent prior value
    previous: HashMap<(String, String), Value>,
    /// (client, variable, year, month) -> full-month value
    months: Vec<(String, String, i32, u32, f64)>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_previous(mut self, client: &str, variable: &str, value: Value) -> Self {
        self.previous
            .insert((client.to_string(), variable.to_string()), value);
        self
    }

    pub fn with_month(
        mut self,
        client: &str,
        variable: &str,
        year: i32,
        month: u32,
        value: f64,
    ) -> Self {
        self.months
            .push((client.to_string(), variable.to_string(), year, month, value));
        self
    }
}

impl HistoricalReports for InMemoryHistory {
    fn find_previous(
        &self,
        client_id: &str,
        variable_id: &str,
        _before: chrono::NaiveDate,
        _window_months: u32,
    ) -> Result<Option<Value>> {
        Ok(self
            .previous
            .get(&(client_id.to_string(), variable_id.to_string()))
            .cloned())
    }

    fn find_full_month_records(
        &self,
        client_id: &str,
        variable_id: &str,
        year: i32,
        months: &[u32],
    ) -> Result<Vec<MonthlyValue>> {
        Ok(self
            .months
            .iter()
            .filter(|(client, variable, y, month, _)| {
                client == client_id && variable == variable_id && *y == year
                    && months.contains(month)
            })
            .map(|(_, _, _, month, value)| MonthlyValue {
                month: *month,
                value: Value::Number(*value),
            })
            .collect())
    }
}

/// Result sink that records every write
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub written: Vec<(String, HashMap<String, Value>)>,
}

impl ResultSink for CollectingSink {
    fn write_result(&mut self, report_id: &str, fields: &HashMap<String, Value>) -> Result<String> {
        self.written.push((report_id.to_string(), fields.clone()));
        Ok(format!("rec-{}", self.written.len()))
    }
}

/// Build a report record over the given raw fields
pub fn report(client: &str, start: &str, end: &str, fields: &[(&str, Value)]) -> ReportRecord {
    ReportRecord {
        report_id: "rpt-1".to_string(),
        client_id: client.to_string(),
        period: ReportPeriod::parse(start, end).unwrap(),
        fields: fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    }
}
