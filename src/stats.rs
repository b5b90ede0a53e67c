use crate::models::{HistoryEntry, Ledger, WeeklySummary};
use std::str::FromStr;

const HISTORY_DAYS: usize = 6;

/// Which six archived days feed the weekly summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeeklyWindow {
    /// The six entries with the latest dates.
    #[default]
    RecentByDate,
    /// The six entries appended last, whatever their dates.
    InsertionOrder,
}

impl FromStr for WeeklyWindow {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "date" | "recent" => Ok(Self::RecentByDate),
            "insertion" => Ok(Self::InsertionOrder),
            other => Err(format!("unknown weekly window '{other}', expected 'date' or 'insertion'")),
        }
    }
}

/// Builds the rolling week from up to six archived days plus the live bucket.
///
/// `ledger` must already be rolled over to today.
pub fn build_weekly_summary(ledger: &Ledger, goal: u32, window: WeeklyWindow) -> WeeklySummary {
    let mut days = select_history(&ledger.history, window);
    days.push(HistoryEntry {
        date: ledger.current.date,
        consumed: ledger.current.consumed,
        goal,
    });
    days.sort_by_key(|entry| entry.date);

    let count = days.len() as f64;
    let consumed_sum: f64 = days.iter().map(|entry| entry.consumed).sum();
    let goal_sum: f64 = days.iter().map(|entry| f64::from(entry.goal)).sum();

    WeeklySummary {
        average_consumed: consumed_sum / count,
        average_goal: goal_sum / count,
        days,
    }
}

fn select_history(history: &[HistoryEntry], window: WeeklyWindow) -> Vec<HistoryEntry> {
    match window {
        WeeklyWindow::InsertionOrder => {
            let start = history.len().saturating_sub(HISTORY_DAYS);
            history[start..].to_vec()
        }
        WeeklyWindow::RecentByDate => {
            let mut entries = history.to_vec();
            // Stable sort keeps the later insertion last when two entries share a date.
            entries.sort_by_key(|entry| entry.date);
            let start = entries.len().saturating_sub(HISTORY_DAYS);
            entries.split_off(start)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DayBucket;
    use chrono::{Duration, NaiveDate};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn entry(d: u32, consumed: f64, goal: u32) -> HistoryEntry {
        HistoryEntry {
            date: day(d),
            consumed,
            goal,
        }
    }

    #[test]
    fn summary_with_empty_history_is_current_only() {
        let ledger = Ledger {
            current: DayBucket { date: day(5), consumed: 640.0 },
            history: Vec::new(),
        };
        let summary = build_weekly_summary(&ledger, 1900, WeeklyWindow::default());
        assert_eq!(summary.days, vec![entry(5, 640.0, 1900)]);
        assert_eq!(summary.average_consumed, 640.0);
        assert_eq!(summary.average_goal, 1900.0);
    }

    #[test]
    fn summary_matches_two_day_scenario() {
        let ledger = Ledger {
            current: DayBucket { date: day(2), consumed: 300.0 },
            history: vec![entry(1, 500.0, 2000)],
        };
        let summary = build_weekly_summary(&ledger, 2000, WeeklyWindow::default());
        assert_eq!(summary.days, vec![entry(1, 500.0, 2000), entry(2, 300.0, 2000)]);
        assert_eq!(summary.average_consumed, 400.0);
        assert_eq!(summary.average_goal, 2000.0);
    }

    #[test]
    fn summary_caps_at_seven_sorted_days() {
        let history: Vec<_> = (1..=10).map(|d| entry(d, 100.0 * d as f64, 2000)).collect();
        let ledger = Ledger {
            current: DayBucket { date: day(11), consumed: 0.0 },
            history,
        };
        let summary = build_weekly_summary(&ledger, 2000, WeeklyWindow::default());
        assert_eq!(summary.days.len(), 7);
        assert_eq!(summary.days.first().unwrap().date, day(5));
        assert_eq!(summary.days.last().unwrap().date, day(11));
        assert!(summary.days.windows(2).all(|pair| pair[0].date <= pair[1].date));
    }

    #[test]
    fn windows_differ_when_history_is_out_of_order() {
        // Day 1 was archived last, e.g. by a late writer.
        let mut history: Vec<_> = (2..=8).map(|d| entry(d, 100.0, 2000)).collect();
        history.push(entry(1, 100.0, 2000));
        let ledger = Ledger {
            current: DayBucket { date: day(9), consumed: 50.0 },
            history,
        };

        let by_date = build_weekly_summary(&ledger, 2000, WeeklyWindow::RecentByDate);
        let dates: Vec<_> = by_date.days.iter().map(|e| e.date).collect();
        assert_eq!(dates, (3..=9).map(day).collect::<Vec<_>>());

        let by_insertion = build_weekly_summary(&ledger, 2000, WeeklyWindow::InsertionOrder);
        assert_eq!(by_insertion.days.first().unwrap().date, day(1));
        assert!(!by_insertion.days.iter().any(|e| e.date == day(3)));
        assert_eq!(by_insertion.days.len(), 7);
    }

    #[test]
    fn averages_use_archived_goals() {
        let today = day(20);
        let ledger = Ledger {
            current: DayBucket { date: today, consumed: 1000.0 },
            history: vec![HistoryEntry {
                date: today - Duration::days(1),
                consumed: 2000.0,
                goal: 1500,
            }],
        };
        let summary = build_weekly_summary(&ledger, 2500, WeeklyWindow::default());
        assert_eq!(summary.average_consumed, 1500.0);
        assert_eq!(summary.average_goal, 2000.0);
    }

    #[test]
    fn weekly_window_parses() {
        assert_eq!("insertion".parse::<WeeklyWindow>(), Ok(WeeklyWindow::InsertionOrder));
        assert_eq!(" Date ".parse::<WeeklyWindow>(), Ok(WeeklyWindow::RecentByDate));
        assert!("weekly".parse::<WeeklyWindow>().is_err());
    }
}
