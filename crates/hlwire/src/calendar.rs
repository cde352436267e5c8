//! Calendar fields of a Unix timestamp.

use chrono::{DateTime, Datelike, Timelike};

use crate::Timestamp;

/// Broken-down UTC time.
///
/// `month` and `day` are one-based, `weekday` counts from Sunday = 0 and
/// `yearday` from January 1st = 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub weekday: u32,
    pub yearday: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl Calendar {
    pub fn from_timestamp(ts: Timestamp) -> Self {
        // Every i32 second count is inside chrono's supported range.
        let dt = DateTime::from_timestamp(i64::from(ts), 0).unwrap_or_default();
        Self {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
            weekday: dt.weekday().num_days_from_sunday(),
            yearday: dt.ordinal0(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
        }
    }
}
