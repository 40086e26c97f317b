//! Calendar-year partitioning of message timestamps.

use crate::error::{ExportError, Result};
use chrono::TimeZone;
use std::collections::BTreeMap;
use std::ops::Range;

/// Half-open `[Jan 1 of year, Jan 1 of year+1)` intervals in Unix seconds,
/// covering the `max_years` calendar years that end with the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearBuckets {
    // year -> start-of-year timestamp; holds one extra entry for the closing boundary.
    boundaries: BTreeMap<i32, i64>,
}

impl YearBuckets {
    pub fn new<Tz: TimeZone>(current_year: i32, max_years: u32, tz: &Tz) -> Result<Self> {
        let mut boundaries = BTreeMap::new();
        if max_years > 0 {
            let invalid = || ExportError::InvalidYear { year: current_year };
            let span = i32::try_from(max_years).map_err(|_| invalid())?;
            let newest = current_year.checked_add(1).ok_or_else(invalid)?;
            let oldest = newest.checked_sub(span).ok_or_else(invalid)?;
            for year in oldest..=newest {
                boundaries.insert(year, start_of_year(year, tz)?);
            }
        }
        Ok(Self { boundaries })
    }

    pub fn len(&self) -> usize {
        self.boundaries.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn range(&self, year: i32) -> Option<Range<i64>> {
        let low = *self.boundaries.get(&year)?;
        let high = *self.boundaries.get(&(year + 1))?;
        Some(low..high)
    }

    /// Covered years, most recent first.
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.boundaries.keys().rev().skip(1).copied()
    }

    /// Buckets, most recent year first.
    pub fn iter(&self) -> impl Iterator<Item = (i32, Range<i64>)> + '_ {
        self.years()
            .filter_map(|year| self.range(year).map(|range| (year, range)))
    }

    /// The year whose bucket contains `ts`, if any.
    pub fn bucket_for(&self, ts: i64) -> Option<i32> {
        self.iter()
            .find(|(_, range)| range.contains(&ts))
            .map(|(year, _)| year)
    }
}

fn start_of_year<Tz: TimeZone>(year: i32, tz: &Tz) -> Result<i64> {
    tz.with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .earliest()
        .map(|dt| dt.timestamp())
        .ok_or(ExportError::InvalidYear { year })
}
