//! Daily ledger manager.
//!
//! Each operation runs load → rollover → mutate → store while holding a
//! per-user lock. Saves are compare-and-swap on the record revision, so a
//! writer outside this process surfaces as [`LedgerError::ConcurrencyConflict`]
//! instead of a lost update. Every store call is bounded by `store_timeout`.

use crate::clock::Clock;
use crate::errors::{LedgerError, StoreError};
use crate::models::{
    CurrentUserResponse, GoalResponse, ResetResponse, StatusResponse, User, UserId, UserProfile,
    WeeklySummary,
};
use crate::stats::{WeeklyWindow, build_weekly_summary};
use crate::storage::{Store, bounded};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const MAX_CALORIE_GOAL: f64 = 100_000.0;

/// Upper bound for one day's running total.
pub const MAX_DAILY_CALORIES: f64 = 1_000_000.0;

const LOCK_PRUNE_THRESHOLD: usize = 1024;

pub struct LedgerManager {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
    weekly_window: WeeklyWindow,
    locks: std::sync::Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl LedgerManager {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, store_timeout: Duration) -> Self {
        Self {
            store,
            clock,
            store_timeout,
            weekly_window: WeeklyWindow::default(),
            locks: std::sync::Mutex::new(HashMap::new()),
        }
    }

    pub fn with_weekly_window(mut self, window: WeeklyWindow) -> Self {
        self.weekly_window = window;
        self
    }

    pub async fn get_status(&self, user_id: UserId) -> Result<StatusResponse, LedgerError> {
        self.with_user(user_id, |user, today| {
            roll_over(user, today);
            Ok(status_of(user))
        })
        .await
    }

    pub async fn add_calories(&self, user_id: UserId, delta: f64) -> Result<StatusResponse, LedgerError> {
        if !delta.is_finite() {
            return Err(LedgerError::validation("calories must be a finite number"));
        }

        self.with_user(user_id, |user, today| {
            let after = user.daily_calories.consumed_after_add(today, delta);
            if after < 0.0 {
                return Err(LedgerError::validation(format!(
                    "removing {} calories would leave today's total below zero",
                    -delta
                )));
            }
            if !after.is_finite() || after > MAX_DAILY_CALORIES {
                return Err(LedgerError::validation(format!(
                    "today's total may not exceed {MAX_DAILY_CALORIES} calories"
                )));
            }

            let goal = user.calorie_goal;
            if let Some(archived) = user.daily_calories.add(today, goal, delta) {
                info!(user_id = %user.id, date = %archived.date, consumed = archived.consumed, "archived day");
            }
            debug!(user_id = %user.id, delta, consumed = user.daily_calories.current.consumed, "added calories");
            Ok(status_of(user))
        })
        .await
    }

    /// Replaces the goal. The ledger is rolled over first so a day that ended
    /// before the change keeps the goal that was active during it.
    pub async fn set_goal(&self, user_id: UserId, goal: f64) -> Result<GoalResponse, LedgerError> {
        let goal = validate_goal(goal)?;

        self.with_user(user_id, |user, today| {
            roll_over(user, today);
            user.calorie_goal = goal;
            info!(user_id = %user.id, goal, "calorie goal updated");
            Ok(GoalResponse { goal })
        })
        .await
    }

    pub async fn reset_today(&self, user_id: UserId) -> Result<ResetResponse, LedgerError> {
        self.with_user(user_id, |user, today| {
            let goal = user.calorie_goal;
            if let Some(archived) = user.daily_calories.reset(today, goal) {
                info!(user_id = %user.id, date = %archived.date, consumed = archived.consumed, "archived day on reset");
            }
            Ok(ResetResponse {
                current: user.daily_calories.current,
            })
        })
        .await
    }

    pub async fn weekly_summary(&self, user_id: UserId) -> Result<WeeklySummary, LedgerError> {
        let window = self.weekly_window;
        self.with_user(user_id, |user, today| {
            roll_over(user, today);
            Ok(build_weekly_summary(&user.daily_calories, user.calorie_goal, window))
        })
        .await
    }

    /// Profile plus the full ledger, rolled over to today.
    pub async fn current_user(&self, user_id: UserId) -> Result<CurrentUserResponse, LedgerError> {
        self.with_user(user_id, |user, today| {
            roll_over(user, today);
            Ok(CurrentUserResponse {
                profile: UserProfile::from(&*user),
                daily_calories: user.daily_calories.clone(),
            })
        })
        .await
    }

    async fn with_user<T, F>(&self, user_id: UserId, op: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut User, NaiveDate) -> Result<T, LedgerError>,
    {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let record = bounded(self.store_timeout, self.store.load_user(user_id))
            .await?
            .ok_or(LedgerError::NotFound(user_id))?;
        if record.user.id != user_id {
            return Err(StoreError::Inconsistent(format!(
                "lookup for {user_id} returned user {}",
                record.user.id
            ))
            .into());
        }

        let today = self.clock.today();
        let mut user = record.user.clone();
        let output = op(&mut user, today)?;

        if user != record.user {
            bounded(self.store_timeout, self.store.save_user(&user, record.revision))
                .await?
                .ok_or(LedgerError::ConcurrencyConflict(user_id))?;
        }
        Ok(output)
    }

    fn user_lock(&self, user_id: UserId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if locks.len() >= LOCK_PRUNE_THRESHOLD {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        Arc::clone(locks.entry(user_id).or_default())
    }
}

/// Goals are whole calories in `(0, MAX_CALORIE_GOAL]`.
pub fn validate_goal(goal: f64) -> Result<u32, LedgerError> {
    if !goal.is_finite() {
        return Err(LedgerError::validation("goal must be a finite number"));
    }
    let rounded = goal.round();
    if rounded <= 0.0 || rounded > MAX_CALORIE_GOAL {
        return Err(LedgerError::validation(format!(
            "goal must be between 1 and {MAX_CALORIE_GOAL}"
        )));
    }
    Ok(rounded as u32)
}

fn roll_over(user: &mut User, today: NaiveDate) {
    let goal = user.calorie_goal;
    let previous = user.daily_calories.current.date;
    if let Some(archived) = user.daily_calories.roll_over(today, goal, 0.0) {
        info!(user_id = %user.id, date = %archived.date, consumed = archived.consumed, "archived day");
    } else if previous != today {
        debug!(user_id = %user.id, %previous, %today, "rolled over empty day");
    }
}

fn status_of(user: &User) -> StatusResponse {
    StatusResponse {
        current: user.daily_calories.current,
        goal: user.calorie_goal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goal_validation() {
        assert_eq!(validate_goal(2000.0).unwrap(), 2000);
        assert_eq!(validate_goal(1799.6).unwrap(), 1800);
        assert!(matches!(validate_goal(f64::NAN), Err(LedgerError::Validation(_))));
        assert!(matches!(validate_goal(f64::INFINITY), Err(LedgerError::Validation(_))));
        assert!(matches!(validate_goal(0.0), Err(LedgerError::Validation(_))));
        assert!(matches!(validate_goal(-5.0), Err(LedgerError::Validation(_))));
        assert!(matches!(validate_goal(250_000.0), Err(LedgerError::Validation(_))));
    }
}
