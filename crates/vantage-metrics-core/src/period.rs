//! Report periods
//!
//! A report covers a time window; the period end anchors the report month
//! and year used by previous-period lookups and year-to-date aggregation.

use chrono::{Datelike, NaiveDate};

use crate::error::{Error, Result};

/// The time window of a single client report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(Error::InvalidPeriod(format!(
                "period end {} precedes start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse a period from ISO-8601 date strings as stored on report records
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let start = NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d")
            .map_err(|e| Error::InvalidPeriod(format!("bad start date '{}': {}", start, e)))?;
        let end = NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d")
            .map_err(|e| Error::InvalidPeriod(format!("bad end date '{}': {}", end, e)))?;
        Self::new(start, end)
    }

    /// Report month (1-12), taken from the period end
    pub fn month(&self) -> u32 {
        self.end.month()
    }

    /// Report year, taken from the period end
    pub fn year(&self) -> i32 {
        self.end.year()
    }

    /// Calendar months strictly before the report month, within the report
    /// year. Empty for January.
    pub fn previous_months(&self) -> Vec<u32> {
        (1..self.month()).collect()
    }
}
