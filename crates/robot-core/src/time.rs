//! Provider timestamp parsing.
//!
//! Some endpoints send zone-less local timestamps (`2021-12-10 14:13:38`). They are
//! interpreted with an explicitly passed offset rather than any process-wide time zone.

use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};

/// Format of zone-less provider timestamps.
pub const PROVIDER_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format of provider dates.
pub const PROVIDER_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a provider timestamp.
///
/// RFC 3339 values keep their own offset; zone-less values are placed in `offset`.
///
/// # Errors
///
/// Returns [`Error::Parse`] if the value matches neither format.
pub fn parse_provider_timestamp(
    value: &str,
    offset: FixedOffset,
) -> Result<DateTime<FixedOffset>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp);
    }

    let naive = NaiveDateTime::parse_from_str(value, PROVIDER_TIMESTAMP_FORMAT)
        .map_err(|err| Error::parse(format!("invalid timestamp `{value}`"), err))?;

    offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| Error::Validation(format!("ambiguous timestamp `{value}`")))
}

/// Parse a provider date such as `paid_until`.
///
/// # Errors
///
/// Returns [`Error::Parse`] if the value is not `YYYY-MM-DD`.
pub fn parse_provider_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, PROVIDER_DATE_FORMAT)
        .map_err(|err| Error::parse(format!("invalid date `{value}`"), err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn cet() -> FixedOffset {
        FixedOffset::east_opt(3600).unwrap()
    }

    #[test]
    fn zoneless_timestamp_uses_given_offset() {
        let ts = parse_provider_timestamp("2021-12-10 14:13:38", cet()).unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 3600);
        assert_eq!(ts.hour(), 14);
        assert_eq!(ts.naive_utc().hour(), 13);
    }

    #[test]
    fn rfc3339_keeps_its_offset() {
        let ts = parse_provider_timestamp("2024-06-01T08:00:00+02:00", cet()).unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 7200);
    }

    #[test]
    fn offset_changes_instant() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let a = parse_provider_timestamp("2021-12-10 14:13:38", cet()).unwrap();
        let b = parse_provider_timestamp("2021-12-10 14:13:38", utc).unwrap();
        assert_eq!((b - a).num_seconds(), 3600);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(parse_provider_timestamp("yesterday", cet()).is_err());
        assert!(parse_provider_date("2010/09/02").is_err());
    }

    #[test]
    fn parses_dates() {
        let date = parse_provider_date("2010-09-02").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2010, 9, 2));
    }
}
