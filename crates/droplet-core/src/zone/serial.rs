//! Date-based zone serial numbers (`YYYYMMDDnn`)

use chrono::{Datelike, NaiveDate};
use std::fmt;

/// A 10-digit zone serial: date prefix plus a two-digit daily counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ZoneSerial(u64);

impl ZoneSerial {
    /// Parse exactly ten ASCII digits
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() != 10 || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        raw.parse().ok().map(Self)
    }

    /// First serial of the given day (`YYYYMMDD00`)
    pub fn first_of(day: NaiveDate) -> Self {
        Self(date_number(day) * 100)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// `YYYYMMDD` part
    pub fn date_prefix(self) -> u64 {
        self.0 / 100
    }

    /// Two-digit daily counter
    pub fn counter(self) -> u64 {
        self.0 % 100
    }

    /// Serial to publish with the next change made on `today`
    ///
    /// Same day: counter + 1. Any other day: `today` + `00`. The result is
    /// always strictly greater than `self`; when the date rule cannot deliver
    /// that (a serial dated in the future, or a same-day counter already at 99)
    /// the serial is incremented by one instead.
    pub fn next(self, today: NaiveDate) -> Self {
        let first = Self::first_of(today);
        let candidate = if self.date_prefix() == first.date_prefix() {
            Self(self.0 + 1)
        } else {
            first
        };

        if candidate > self {
            candidate
        } else {
            Self(self.0 + 1)
        }
    }
}

impl fmt::Display for ZoneSerial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:010}", self.0)
    }
}

fn date_number(day: NaiveDate) -> u64 {
    day.year() as u64 * 10_000 + day.month() as u64 * 100 + day.day() as u64
}
