//! Accounting periods (`YYYY-MM`) and their half-open date ranges.

use anyhow::anyhow;
use chrono::NaiveDate;
use service_core::error::AppError;

/// One calendar month, the granularity of the reconciliation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    start: NaiveDate,
    end: NaiveDate,
}

impl Period {
    /// Parse `"YYYY-MM"`. Anything else is an invalid scope argument.
    pub fn parse(s: &str) -> Result<Self, AppError> {
        let invalid = || AppError::BadRequest(anyhow!("invalid period `{}`, expected YYYY-MM", s));

        let (year_s, month_s) = s.split_once('-').ok_or_else(invalid)?;
        let year: i32 = year_s.parse().map_err(|_| invalid())?;
        let month: u32 = month_s.parse().map_err(|_| invalid())?;

        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let end = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(invalid)?;

        Ok(Self { start, end })
    }

    /// First day of the month.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Exclusive upper bound: first day of the next month. Queries filter
    /// `date >= start AND date < end`.
    pub fn end_exclusive(&self) -> NaiveDate {
        self.end
    }

    pub fn range(&self) -> (NaiveDate, NaiveDate) {
        (self.start, self.end)
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use chrono::Datelike;
        write!(f, "{:04}-{:02}", self.start.year(), self.start.month())
    }
}
