use crate::models::{DayBucket, HistoryEntry, Ledger};
use chrono::NaiveDate;

impl Ledger {
    pub fn new(created_on: NaiveDate) -> Self {
        Self {
            current: DayBucket::empty(created_on),
            history: Vec::new(),
        }
    }

    /// Moves `current` into history when `today` differs from its date.
    ///
    /// The fresh bucket starts at `seed`. Days with nothing consumed are
    /// dropped instead of archived. Returns the archived entry, if any.
    pub fn roll_over(&mut self, today: NaiveDate, goal: u32, seed: f64) -> Option<HistoryEntry> {
        if self.current.date == today {
            return None;
        }
        let archived = self.archive_current(goal);
        self.current = DayBucket {
            date: today,
            consumed: seed,
        };
        archived
    }

    /// Applies a delta: seeds a new bucket if the day changed, otherwise accumulates.
    pub fn add(&mut self, today: NaiveDate, goal: u32, delta: f64) -> Option<HistoryEntry> {
        if self.current.date != today {
            return self.roll_over(today, goal, delta);
        }
        self.current.consumed += delta;
        None
    }

    /// Archives `current` and starts over at zero even if the day has not changed.
    pub fn reset(&mut self, today: NaiveDate, goal: u32) -> Option<HistoryEntry> {
        let archived = self.archive_current(goal);
        self.current = DayBucket::empty(today);
        archived
    }

    /// The value `current.consumed` would hold after `add(today, _, delta)`.
    pub fn consumed_after_add(&self, today: NaiveDate, delta: f64) -> f64 {
        if self.current.date == today {
            self.current.consumed + delta
        } else {
            delta
        }
    }

    fn archive_current(&mut self, goal: u32) -> Option<HistoryEntry> {
        if self.current.consumed <= 0.0 {
            return None;
        }
        let entry = HistoryEntry {
            date: self.current.date,
            consumed: self.current.consumed,
            goal,
        };
        self.history.push(entry);
        Some(entry)
    }
}
