// Date period domain model
use chrono::{Days, NaiveDate};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodError {
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Date range of {length} days ending {end} is out of bounds")]
    OutOfBounds { end: NaiveDate, length: u32 },
}

/// Inclusive range of calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatePeriod {
    start: NaiveDate,
    end: NaiveDate,
}

impl DatePeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, PeriodError> {
        if start > end {
            return Err(PeriodError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Window of `length` days ending on (and including) `end`, i.e.
    /// `[end - length + 1, end]`. A zero length yields an inverted range.
    pub fn from_trailing_days(end: NaiveDate, length: u32) -> Result<Self, PeriodError> {
        let start = end
            .checked_sub_days(Days::new(u64::from(length)))
            .and_then(|d| d.checked_add_days(Days::new(1)))
            .ok_or(PeriodError::OutOfBounds { end, length })?;
        Self::new(start, end)
    }

    pub fn last_7_days(end: NaiveDate) -> Result<Self, PeriodError> {
        Self::from_trailing_days(end, 7)
    }

    pub fn last_4_weeks(end: NaiveDate) -> Result<Self, PeriodError> {
        Self::from_trailing_days(end, 28)
    }

    pub fn last_year(end: NaiveDate) -> Result<Self, PeriodError> {
        Self::from_trailing_days(end, 365)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Trailing window lengths accepted by the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowLength {
    Week,
    #[default]
    FourWeeks,
    Year,
}

impl WindowLength {
    pub fn days(self) -> u32 {
        match self {
            WindowLength::Week => 7,
            WindowLength::FourWeeks => 28,
            WindowLength::Year => 365,
        }
    }

    pub fn ending_on(self, end: NaiveDate) -> Result<DatePeriod, PeriodError> {
        DatePeriod::from_trailing_days(end, self.days())
    }
}
