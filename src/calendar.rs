use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::errors::{LoanError, Result};

/// Due date of the installment `offset_months` months after `start`, paid on `day_due`.
///
/// The day is clamped to the target month's length, so day 31 in February lands on the
/// 28th or 29th and never spills into March. Time of day is always midnight UTC.
pub fn compute_due_date(
    start: DateTime<Utc>,
    offset_months: u32,
    day_due: u32,
) -> Result<DateTime<Utc>> {
    // months since year 0, zero-based
    let absolute = start.year() as i64 * 12 + start.month0() as i64 + offset_months as i64;
    let year = i32::try_from(absolute.div_euclid(12)).map_err(|_| LoanError::CalculationError {
        message: format!("due date year out of range for offset {offset_months}"),
    })?;
    let month = absolute.rem_euclid(12) as u32 + 1;

    let day = day_due.clamp(1, 31).min(days_in_month(year, month));

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| LoanError::CalculationError {
            message: format!("no calendar date {year:04}-{month:02}-{day:02}"),
        })
}

/// number of days in the given month, derived from the first day of the next one
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let first_of_next = if month >= 12 {
        year.checked_add(1).and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    first_of_next
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

pub fn is_leap_year(year: i32) -> bool {
    days_in_month(year, 2) == 29
}

/// whole days from `earlier` to `later`, partial days truncated; zero if `later` is not after
pub fn whole_days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> u32 {
    let days = (later - earlier).num_days();
    u32::try_from(days.max(0)).unwrap_or(u32::MAX)
}
