use crate::error::{AnalyticsError, Result};
use chrono::{Datelike, Days, Months, NaiveDate};

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn next_month_start(date: NaiveDate) -> NaiveDate {
    let year = if date.month() == 12 {
        date.year() + 1
    } else {
        date.year()
    };

    let month = if date.month() == 12 {
        1
    } else {
        date.month() + 1
    };

    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
}

/// First-of-month anchors for every month touched by `[start, end]`.
///
/// The month containing `start` is included even when `start` is mid-month,
/// so a range of `2023-01-15..=2023-03-02` yields Jan, Feb and Mar.
pub fn month_starts_in_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    if end < start {
        return dates;
    }

    let mut current = first_of_month(start);
    while current <= end {
        dates.push(current);
        current = next_month_start(current);
    }

    dates
}

pub fn quarter_start(date: NaiveDate) -> NaiveDate {
    let month = ((date.month0() / 3) * 3) + 1;
    NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
}

pub fn year_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date)
}

pub fn sub_calendar_months(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.checked_sub_months(Months::new(months)).ok_or_else(|| {
        AnalyticsError::DateError(format!("Cannot step {} months back from {}", months, date))
    })
}

pub fn sub_days(date: NaiveDate, days: u64) -> Result<NaiveDate> {
    date.checked_sub_days(Days::new(days)).ok_or_else(|| {
        AnalyticsError::DateError(format!("Cannot step {} days back from {}", days, date))
    })
}

/// Parses a month string in the format "YYYY-MM" into its first day.
pub fn parse_month(value: &str) -> Result<NaiveDate> {
    let start_str = format!("{}-01", value.trim());
    NaiveDate::parse_from_str(&start_str, "%Y-%m-%d").map_err(|_| {
        AnalyticsError::DateError(format!(
            "Invalid month format: {}. Expected YYYY-MM",
            value
        ))
    })
}
