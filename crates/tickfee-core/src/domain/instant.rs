use std::fmt::{Display, Formatter};

use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use crate::error::ValidationError;

/// The ledger's fixed textual timestamp format, always interpreted as UTC.
const LEDGER_FORMAT: &[FormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

const DAY_FORMAT: &[FormatItem<'_>] = format_description!("[year]-[month]-[day]");

/// A UTC trade instant parsed from the ledger's `YYYY-MM-DD HH:MM:SS` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcInstant(OffsetDateTime);

impl UtcInstant {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let parsed = PrimitiveDateTime::parse(input, LEDGER_FORMAT).map_err(|_| {
            ValidationError::BadTimestamp {
                value: input.to_owned(),
            }
        })?;
        Ok(Self(parsed.assume_utc()))
    }

    /// The calendar day this instant falls on; identifies one archive file.
    pub fn date(self) -> Date {
        self.0.date()
    }

    /// Milliseconds since the Unix epoch, the resolution of archived ticks.
    pub fn unix_millis(self) -> i64 {
        (self.0.unix_timestamp_nanos() / 1_000_000) as i64
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }
}

impl Display for UtcInstant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let formatted = self
            .0
            .format(LEDGER_FORMAT)
            .expect("UtcInstant must be formattable");
        f.write_str(&formatted)
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_day(input: &str) -> Result<Date, ValidationError> {
    Date::parse(input.trim(), DAY_FORMAT).map_err(|_| ValidationError::BadDay {
        value: input.to_owned(),
    })
}

/// Format a day as `YYYY-MM-DD` for archive names and URLs.
pub fn day_stamp(day: Date) -> String {
    day.format(DAY_FORMAT).expect("date must be formattable")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ledger_timestamp() {
        let instant = UtcInstant::parse("2024-05-24 05:47:21").expect("must parse");
        assert_eq!(day_stamp(instant.date()), "2024-05-24");
        assert_eq!(instant.to_string(), "2024-05-24 05:47:21");
    }

    #[test]
    fn rejects_malformed_timestamp() {
        let err = UtcInstant::parse("not-a-date").expect_err("must fail");
        assert!(matches!(err, ValidationError::BadTimestamp { .. }));
    }

    #[test]
    fn rejects_rfc3339_shape() {
        let err = UtcInstant::parse("2024-05-24T05:47:21Z").expect_err("must fail");
        assert!(matches!(err, ValidationError::BadTimestamp { .. }));
    }

    #[test]
    fn unix_millis_matches_epoch() {
        let instant = UtcInstant::parse("1970-01-01 00:00:01").expect("must parse");
        assert_eq!(instant.unix_millis(), 1_000);
    }

    #[test]
    fn parses_day() {
        let day = parse_day("2024-05-28").expect("must parse");
        assert_eq!(day_stamp(day), "2024-05-28");
        assert!(parse_day("28/05/2024").is_err());
    }
}
