//! Calendar-day policy for the ledger.
//!
//! Every ledger operation asks a [`Clock`] for "today" instead of reading the
//! system time directly, so the reference timezone is decided once at startup.

use chrono::{FixedOffset, Local, NaiveDate, Utc};
use std::sync::Mutex;

pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock, either in the server's local timezone or a fixed UTC offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    offset: Option<FixedOffset>,
}

impl SystemClock {
    pub fn local() -> Self {
        Self { offset: None }
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self {
            offset: Some(offset),
        }
    }

    pub fn offset(&self) -> Option<FixedOffset> {
        self.offset
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        match self.offset {
            Some(offset) => Utc::now().with_timezone(&offset).date_naive(),
            None => Local::now().date_naive(),
        }
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    today: Mutex<NaiveDate>,
}

impl ManualClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Mutex::new(today),
        }
    }

    pub fn set(&self, date: NaiveDate) {
        *self.lock() = date;
    }

    pub fn advance_days(&self, days: u64) {
        let mut today = self.lock();
        *today = *today + chrono::Days::new(days);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NaiveDate> {
        // A poisoned guard still holds a valid date.
        self.today.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        *self.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_across_month_end() {
        let clock = ManualClock::new(NaiveDate::from_ymd_opt(2026, 1, 31).unwrap());
        clock.advance_days(1);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());

        clock.set(NaiveDate::from_ymd_opt(2025, 12, 24).unwrap());
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 12, 24).unwrap());
    }

    #[test]
    fn offset_clock_is_within_a_day_of_utc() {
        let east = SystemClock::with_offset(FixedOffset::east_opt(14 * 3600).unwrap());
        let west = SystemClock::with_offset(FixedOffset::west_opt(12 * 3600).unwrap());
        let utc = Utc::now().date_naive();

        assert!((east.today() - utc).num_days().abs() <= 1);
        assert!((west.today() - utc).num_days().abs() <= 1);
        assert!(east.today() >= west.today());
    }
}
