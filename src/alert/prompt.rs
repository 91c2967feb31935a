use super::{AlertTrigger, Response};
use crate::error::AppResult;
use crate::reminder::Reminder;
use crate::storage::Repository;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

/// The tab-style prompt for the last fired reminder. It closes itself after
/// its timeout without touching the record.
#[derive(Debug)]
pub struct PromptSession {
    reminder: Reminder,
    deadline: Instant,
}

impl PromptSession {
    /// Open a session for the last fired reminder, if there is one.
    pub async fn load(repo: &Repository, timeout: Duration) -> AppResult<Option<Self>> {
        Ok(repo
            .last_fired()
            .await?
            .map(|reminder| Self::new(reminder, timeout)))
    }

    pub fn new(reminder: Reminder, timeout: Duration) -> Self {
        Self {
            reminder,
            deadline: Instant::now() + timeout,
        }
    }

    pub fn reminder(&self) -> &Reminder {
        &self.reminder
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Snooze or Done, then close the surface.
    pub async fn respond(self, trigger: &AlertTrigger, response: Response) -> AppResult<Option<Reminder>> {
        let updated = trigger.respond(&self.reminder.id, response).await;
        trigger.close_prompt(&self.reminder.id).await;
        updated
    }

    /// Give up waiting: stop the alarm and close, leaving the reminder fired.
    pub async fn expire(self, trigger: &AlertTrigger) {
        trigger.stop_alarm();
        trigger.close_prompt(&self.reminder.id).await;
        info!(id = %self.reminder.id, "prompt timed out");
    }

    /// Closed without an answer: silence it, leave the reminder fired.
    pub async fn dismiss(self, trigger: &AlertTrigger) {
        trigger.stop_alarm();
        trigger.close_prompt(&self.reminder.id).await;
        info!(id = %self.reminder.id, "prompt dismissed");
    }

    /// A newer reminder fired: close this surface, leaving the new alarm alone.
    pub async fn replaced(self, trigger: &AlertTrigger) {
        trigger.close_prompt(&self.reminder.id).await;
        info!(id = %self.reminder.id, "prompt replaced by a newer reminder");
    }
}
