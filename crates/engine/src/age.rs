//! Age derivation from birth dates

use crate::error::ParseError;
use chrono::{Datelike, NaiveDate};

/// Date format used for birth and race dates everywhere in the store
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| ParseError::Date(value.to_string()))
}

/// Completed years between `birth_date` and `today`.
///
/// One year is subtracted when the birthday has not occurred yet this year.
/// A birth date after `today` yields 0.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> u32 {
    let mut years = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        years -= 1;
    }
    years.max(0) as u32
}
