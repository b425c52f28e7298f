use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::config::Season;

/// Inclusive range of selectable years, stepping by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    min: i32,
    max: i32,
}

impl YearRange {
    pub fn new(min: i32, max: i32) -> Option<Self> {
        if min > max {
            return None;
        }
        Some(Self { min, max })
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn len(&self) -> usize {
        (self.max - self.min) as usize + 1
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.min..=self.max).contains(&year)
    }

    pub fn clamp(&self, year: i32) -> i32 {
        year.clamp(self.min, self.max)
    }

    /// Next year, cycling from `max` back to `min`.
    pub fn next_wrapping(&self, year: i32) -> i32 {
        if year >= self.max || year < self.min {
            self.min
        } else {
            year + 1
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + use<> {
        self.min..=self.max
    }
}

/// First and last acquisition instants of `season` within `year`.
pub fn season_bounds(year: i32, season: &Season) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let start = NaiveDate::from_ymd_opt(year, season.start_month(), 1)?.and_hms_opt(0, 0, 0)?;

    let after_end = if season.end_month() == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, season.end_month() + 1, 1)?
    };
    let end = after_end.pred_opt()?.and_hms_opt(23, 59, 59)?;

    Some((start, end))
}

pub fn in_season(acquired: &NaiveDateTime, year: i32, season: &Season) -> bool {
    acquired.year() == year && season.contains_month(acquired.month())
}
