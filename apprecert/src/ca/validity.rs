use time::{Date, Duration, Month, OffsetDateTime};

use super::{CaError, Result};

/// Shift `at` by whole calendar months, keeping the time of day.
///
/// A day that does not exist in the target month overflows into the next one
/// (Jan 31 + 1 month = Mar 3 in a non-leap year) instead of clamping.
pub fn add_months(at: OffsetDateTime, months: i32) -> Result<OffsetDateTime> {
    let index = at.year() * 12 + i32::from(u8::from(at.month())) - 1 + months;
    let year = index.div_euclid(12);
    let month = Month::January.nth_next(index.rem_euclid(12) as u8);

    let first = Date::from_calendar_date(year, month, 1)
        .map_err(|e| CaError::CertificateGeneration(format!("validity out of range: {e}")))?;
    let date = first
        .checked_add(Duration::days(i64::from(at.day()) - 1))
        .ok_or_else(|| CaError::CertificateGeneration("validity out of range".to_string()))?;

    Ok(at.replace_date(date))
}
