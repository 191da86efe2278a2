use std::fmt;
use std::iter::FusedIterator;

use chrono::{Days, Local, NaiveDate};

/// Textual date format accepted on the command line (`DD/MM/YYYY`).
pub const INPUT_DATE_FORMAT: &str = "%d/%m/%Y";

/// Largest span the remote API accepts for one listing query, in days.
pub const DEFAULT_INCREMENT_DAYS: u64 = 120;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DateError {
    #[error("invalid date format, use DD/MM/YYYY, got: {0}")]
    InvalidDateFormat(String),
    #[error("window increment must be at least one day")]
    InvalidIncrement,
}

/// Parse a `DD/MM/YYYY` date.
pub fn parse_date(input: &str) -> Result<NaiveDate, DateError> {
    NaiveDate::parse_from_str(input.trim(), INPUT_DATE_FORMAT)
        .map_err(|_| DateError::InvalidDateFormat(input.to_string()))
}

/// One bounded sub-range of the overall scrape interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Lazily splits `[start, end]` into windows of at most `increment` days.
///
/// Windows are contiguous: each window starts where the previous one ended.
/// Iteration stops before emitting a window whose end has reached "today",
/// so a run never claims to have covered a period that is still in progress.
#[derive(Debug)]
pub struct DateWindower {
    cursor: NaiveDate,
    end: Option<NaiveDate>,
    increment: Days,
    today: NaiveDate,
    finished: bool,
}

impl DateWindower {
    /// `end` defaults to today when `None`.
    pub fn new(
        start: NaiveDate,
        end: Option<NaiveDate>,
        increment_days: u64,
    ) -> Result<Self, DateError> {
        if increment_days == 0 {
            return Err(DateError::InvalidIncrement);
        }
        Ok(Self {
            cursor: start,
            end,
            increment: Days::new(increment_days),
            today: Local::now().date_naive(),
            finished: false,
        })
    }

    /// Build from `DD/MM/YYYY` strings.
    pub fn from_input(
        start: &str,
        end: Option<&str>,
        increment_days: u64,
    ) -> Result<Self, DateError> {
        let start = parse_date(start)?;
        let end = end.map(parse_date).transpose()?;
        Self::new(start, end, increment_days)
    }

    /// Override the clock used for the "today" cut-off.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    fn overall_end(&self) -> NaiveDate {
        self.end.unwrap_or(self.today)
    }
}

impl Iterator for DateWindower {
    type Item = DateWindow;

    fn next(&mut self) -> Option<DateWindow> {
        if self.finished {
            return None;
        }
        let overall_end = self.overall_end();
        let end = self
            .cursor
            .checked_add_days(self.increment)
            .map_or(overall_end, |candidate| candidate.min(overall_end));

        // An empty window means the overall end was reached before today.
        if end <= self.cursor || end >= self.today {
            self.finished = true;
            return None;
        }

        let window = DateWindow::new(self.cursor, end);
        self.cursor = end;
        Some(window)
    }
}

impl FusedIterator for DateWindower {}
