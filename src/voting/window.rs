//! Classifies an instant against an election's calendar-date voting window.
//!
//! Dates carry no timezone. Callers hand in `now` already shifted into the
//! organization's offset; only its local date and time are read. The end date
//! is inclusive of its whole final day, for every operation in this module.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::{self, ValidationError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ElectionWindow {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WindowState {
    Upcoming,
    Ongoing,
    Ended,
}

/// How [`ElectionWindow::is_ended`] looks at `now`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndComparison {
    /// Compare the calendar date of `now` against the end date.
    DateOnly,
    /// Compare the full local timestamp against the first instant after the end date.
    Timestamp,
}

impl ElectionWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start > end {
            return Err(error::election_window_inverted(&start, &end));
        }
        Ok(ElectionWindow { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    fn opens_at(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::default())
    }

    // None when the end date is the last representable day
    fn closes_at(&self) -> Option<NaiveDateTime> {
        self.end.succ_opt().map(|next| next.and_time(NaiveTime::default()))
    }

    pub fn is_upcoming<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        now.naive_local() < self.opens_at()
    }

    pub fn is_ongoing<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        let local = now.naive_local();
        let before_close = match self.closes_at() {
            Some(closes_at) => local < closes_at,
            None => true,
        };
        self.opens_at() <= local && before_close
    }

    pub fn is_ended<Tz: TimeZone>(&self, now: &DateTime<Tz>, comparison: EndComparison) -> bool {
        match comparison {
            EndComparison::DateOnly => now.naive_local().date() > self.end,
            EndComparison::Timestamp => match self.closes_at() {
                Some(closes_at) => now.naive_local() >= closes_at,
                None => false,
            },
        }
    }

    pub fn state<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> WindowState {
        if self.is_upcoming(now) {
            WindowState::Upcoming
        } else if self.is_ongoing(now) {
            WindowState::Ongoing
        } else {
            WindowState::Ended
        }
    }
}
