//! Time source injected into the controller.

use jiff::{civil::Date, tz::TimeZone, Timestamp};

/// Supplies the current instant and the current local date.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    /// Today's date in the session's time zone; forecast dates compare
    /// against it.
    fn today(&self) -> Date;
}

/// Wall clock in the system time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }

    fn today(&self) -> Date {
        Timestamp::now().to_zoned(TimeZone::system()).date()
    }
}

/// A clock frozen at a given instant, read in UTC.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: Timestamp,
}

impl FixedClock {
    pub fn new(now: Timestamp) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.now
    }

    fn today(&self) -> Date {
        self.now.to_zoned(TimeZone::UTC).date()
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;

    #[test]
    fn test_fixed_clock_reads_utc_date() {
        let clock = FixedClock::new(Timestamp::from_second(1_735_732_800).unwrap());
        assert_eq!(clock.today(), date(2025, 1, 1));
        assert_eq!(clock.now().as_second(), 1_735_732_800);
    }
}
