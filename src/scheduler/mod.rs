//! Keeps the timer facility in line with the stored reminders.
//!
//! A timer named `reminder:<id>` exists exactly when the reminder is enabled,
//! not completed, and due in the future.

mod tokio_timer;

use crate::clock::Clock;
use crate::config::{TIMER_DELIMITER, TIMER_PREFIX};
use crate::error::AppResult;
use crate::reminder::Reminder;
use crate::storage::Repository;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

pub use tokio_timer::{TimerEvents, TokioTimers};

/// Platform one-shot timers, keyed by name.
#[async_trait]
pub trait TimerFacility: Send + Sync {
    /// Register `name` to fire at `when_ms`, replacing any timer with that name.
    async fn create(&self, name: &str, when_ms: i64) -> AppResult<()>;
    /// Unregister `name`. Returns whether a timer was pending.
    async fn clear(&self, name: &str) -> AppResult<bool>;
    /// Names of pending timers.
    async fn names(&self) -> AppResult<Vec<String>>;
}

pub fn timer_name(id: &str) -> String {
    format!("{}{}{}", TIMER_PREFIX, TIMER_DELIMITER, id)
}

/// Id carried by a reminder timer name, `None` for foreign timers.
pub fn parse_timer_name(name: &str) -> Option<&str> {
    match name.split_once(TIMER_DELIMITER) {
        Some((TIMER_PREFIX, id)) if !id.is_empty() => Some(id),
        _ => None,
    }
}

#[derive(Clone)]
pub struct SchedulerAdapter {
    timers: Arc<dyn TimerFacility>,
    clock: Arc<dyn Clock>,
}

impl SchedulerAdapter {
    pub fn new(timers: Arc<dyn TimerFacility>, clock: Arc<dyn Clock>) -> Self {
        Self { timers, clock }
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Register a timer for an armable reminder; no-op otherwise.
    /// Returns whether a timer was registered.
    pub async fn schedule(&self, reminder: &Reminder) -> AppResult<bool> {
        if !reminder.is_armable(self.now_ms()) {
            debug!(id = %reminder.id, "not armable, schedule skipped");
            return Ok(false);
        }
        self.timers.create(&timer_name(&reminder.id), reminder.when).await?;
        debug!(id = %reminder.id, when = reminder.when, "timer registered");
        Ok(true)
    }

    /// Returns whether a timer was pending for `id`.
    pub async fn cancel(&self, id: &str) -> AppResult<bool> {
        let cleared = self.timers.clear(&timer_name(id)).await?;
        if cleared {
            debug!(id, "timer cleared");
        }
        Ok(cleared)
    }

    /// Schedule when armable, cancel otherwise.
    pub async fn sync(&self, reminder: &Reminder) -> AppResult<()> {
        if !self.schedule(reminder).await? {
            self.cancel(&reminder.id).await?;
        }
        Ok(())
    }

    /// Re-register timers for every stored reminder. Run at each process start,
    /// since timers do not outlive the process.
    pub async fn reschedule_all(&self, repo: &Repository) -> AppResult<usize> {
        let mut armed = 0;
        for reminder in repo.list_all().await? {
            if self.schedule(&reminder).await? {
                armed += 1;
            }
        }
        info!(armed, "timers restored");
        Ok(armed)
    }
}
