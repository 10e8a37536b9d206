//! Collaborator traits for the backing record store
//!
//! The engine never talks to a concrete store; hosts inject implementations
//! of these traits. Store queries are blocking from the engine's point of
//! view, and the engine treats their failures as soft (logged) conditions.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::error::Result;
use crate::value::Value;

/// A historical full-month record's value for one variable
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyValue {
    /// Calendar month (1-12)
    pub month: u32,
    pub value: Value,
}

/// Per-client static overrides, keyed by variable identifier
pub trait ClientOverrides {
    fn get_override(&self, client_id: &str, variable_id: &str) -> Result<Option<Value>>;
}

/// Read access to previously generated reports
pub trait HistoricalReports {
    /// Most recent prior record value for `variable_id`: same client,
    /// strictly before `before`, within `window_months`, non-null.
    fn find_previous(
        &self,
        client_id: &str,
        variable_id: &str,
        before: NaiveDate,
        window_months: u32,
    ) -> Result<Option<Value>>;

    /// All full-month records for the client in `year` whose month is in
    /// `months`, carrying that record's value for the requested variable.
    fn find_full_month_records(
        &self,
        client_id: &str,
        variable_id: &str,
        year: i32,
        months: &[u32],
    ) -> Result<Vec<MonthlyValue>>;
}

/// Destination for computed report fields
pub trait ResultSink {
    /// Persist the field set for a report, returning the stored record id
    fn write_result(&mut self, report_id: &str, fields: &HashMap<String, Value>) -> Result<String>;
}

/// Override store with no entries; useful for tests and hosts without
/// client-static variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOverrides;

impl ClientOverrides for NoOverrides {
    fn get_override(&self, _client_id: &str, _variable_id: &str) -> Result<Option<Value>> {
        Ok(None)
    }
}

/// History store with no records
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHistory;

impl HistoricalReports for NoHistory {
    fn find_previous(
        &self,
        _client_id: &str,
        _variable_id: &str,
        _before: NaiveDate,
        _window_months: u32,
    ) -> Result<Option<Value>> {
        Ok(None)
    }

    fn find_full_month_records(
        &self,
        _client_id: &str,
        _variable_id: &str,
        _year: i32,
        _months: &[u32],
    ) -> Result<Vec<MonthlyValue>> {
        Ok(Vec::new())
    }
}
