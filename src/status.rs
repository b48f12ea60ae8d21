use chrono::{Duration, NaiveDate};
use hourglass_rs::SafeTimeProvider;

use crate::types::LoanStatus;

/// first calendar day past the loan's term (exclusive boundary)
pub fn end_date(start_date: NaiveDate, term_days: u32) -> NaiveDate {
    start_date + Duration::days(term_days as i64)
}

/// classify a loan as Active or Terminated for the given day
///
/// pure function of the terms and the calendar day; callers must never
/// store the result, it is recomputed on every read. Time-of-day has
/// already been discarded by working in `NaiveDate`, so a loan cannot
/// flap between states within a single day.
pub fn classify(start_date: NaiveDate, term_days: u32, today: NaiveDate) -> LoanStatus {
    if today < end_date(start_date, term_days) {
        LoanStatus::Active
    } else {
        LoanStatus::Terminated
    }
}

/// classify against the injected clock, normalized to a utc calendar day
pub fn classify_now(start_date: NaiveDate, term_days: u32, time: &SafeTimeProvider) -> LoanStatus {
    classify(start_date, term_days, time.now().date_naive())
}
