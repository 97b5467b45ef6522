use chrono::NaiveDate;

/// Add a (possibly fractional, always truncated) number of days to an
/// instant. Used for lead-time projection.
pub fn add_days(instant: NaiveDate, days: f64) -> NaiveDate {
    instant + chrono::Duration::days(days.trunc() as i64)
}

/// `later − earlier` in whole days. `NaiveDate` has no time-of-day
/// component so the subtraction is already whole days; this helper
/// exists so every instant-difference in the engine goes through one
/// place.
pub fn days_between(later: NaiveDate, earlier: NaiveDate) -> i64 {
    (later - earlier).num_days()
}
