//! Date and time formatting in the system time zone.

use std::fmt;

use jiff::{civil::Date, tz::TimeZone, Timestamp};

/// Formats a timestamp as `YYYY-MM-DD HH:MM TZ` in the system time zone.
pub struct LocalDateTime<'a>(pub &'a Timestamp);

impl fmt::Display for LocalDateTime<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.0
                .to_zoned(TimeZone::system())
                .strftime("%Y-%m-%d %H:%M %Z")
        )
    }
}

/// Formats an optional date, or a dash when absent.
pub struct MaybeDate<'a>(pub &'a Option<Date>);

impl fmt::Display for MaybeDate<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(date) => write!(f, "{}", date.strftime("%Y-%m-%d")),
            None => f.write_str("-"),
        }
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;

    #[test]
    fn test_maybe_date() {
        assert_eq!(MaybeDate(&Some(date(2025, 3, 9))).to_string(), "2025-03-09");
        assert_eq!(MaybeDate(&None).to_string(), "-");
    }
}
