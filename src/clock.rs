//! Wall-clock access.
//!
//! The parser and the archive writer both need "now" as a fallback, so it is
//! injected through [`Clock`] instead of being read ambiently.

use chrono::{DateTime, FixedOffset, Local};

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Local system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock frozen at one instant.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_is_stable() {
        let t = DateTime::parse_from_rfc3339("2025-03-04T05:06:07+02:00").unwrap();
        let clock = FixedClock(t);
        assert_eq!(clock.now(), t);
    }
}
