//! Fired-reminder handling for the background context.
//!
//! Per reminder: armed → fired (timer elapsed, `enabled = false`, user asked)
//! → snoozed (armed again) or done (terminal). A prompt that times out leaves
//! the record fired until the user comes back to it.

mod prompt;

use crate::config::{DONE_BUTTON_LABEL, NOTIFICATION_TITLE, SNOOZE_BUTTON_LABEL};
use crate::error::{AppError, AppResult};
use crate::messages::{Message, MessageBus};
use crate::reminder::Reminder;
use crate::scheduler::{parse_timer_name, timer_name};
use crate::storage::Repository;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use prompt::PromptSession;

/// The primary way of asking the user about a fired reminder (a tab or window).
#[async_trait]
pub trait PromptSurface: Send + Sync {
    async fn open(&self, reminder: &Reminder) -> AppResult<()>;
    async fn close(&self, id: &str) -> AppResult<()>;
}

/// System notifications, used when the prompt cannot be opened.
#[async_trait]
pub trait NotificationSurface: Send + Sync {
    async fn show(&self, notification: &Notification) -> AppResult<()>;
    async fn clear(&self, notification_id: &str) -> AppResult<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Same as the timer name, so button clicks lead back to the reminder.
    pub id: String,
    pub title: String,
    pub message: String,
    /// Index 0 snoozes, index 1 marks done.
    pub buttons: Vec<String>,
    pub require_interaction: bool,
}

impl Notification {
    pub fn for_reminder(reminder: &Reminder) -> Self {
        Self {
            id: timer_name(&reminder.id),
            title: NOTIFICATION_TITLE.to_string(),
            message: reminder.title.clone(),
            buttons: vec![SNOOZE_BUTTON_LABEL.to_string(), DONE_BUTTON_LABEL.to_string()],
            require_interaction: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Snooze,
    Done,
}

impl Response {
    pub fn from_button(index: usize) -> Option<Self> {
        match index {
            0 => Some(Response::Snooze),
            1 => Some(Response::Done),
            _ => None,
        }
    }

    /// Index of the matching notification button.
    pub fn button(self) -> usize {
        match self {
            Response::Snooze => 0,
            Response::Done => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FireOutcome {
    /// Not one of our timers
    Ignored,
    /// The reminder was deleted after it was scheduled
    Stale,
    Prompted(Reminder),
    /// The prompt could not open; a notification was shown instead
    Notified(Reminder),
}

#[derive(Clone)]
pub struct AlertTrigger {
    repo: Repository,
    bus: MessageBus,
    prompt: Arc<dyn PromptSurface>,
    notifications: Arc<dyn NotificationSurface>,
    snooze: chrono::Duration,
}

impl AlertTrigger {
    pub fn new(
        repo: Repository,
        bus: MessageBus,
        prompt: Arc<dyn PromptSurface>,
        notifications: Arc<dyn NotificationSurface>,
        snooze: chrono::Duration,
    ) -> Self {
        Self {
            repo,
            bus,
            prompt,
            notifications,
            snooze,
        }
    }

    /// Handle an expired timer.
    pub async fn on_timer_fired(&self, name: &str) -> AppResult<FireOutcome> {
        let Some(id) = parse_timer_name(name) else {
            debug!(name, "ignoring foreign timer");
            return Ok(FireOutcome::Ignored);
        };

        let Some(current) = self.repo.get(id).await? else {
            info!(id, "fired reminder no longer exists");
            return Ok(FireOutcome::Stale);
        };
        // An expiry can still be queued after the reminder was disarmed.
        if !current.enabled || current.completed {
            info!(id, "timer fired for a disarmed reminder, ignoring");
            return Ok(FireOutcome::Stale);
        }

        // Disarm first so a restart before the user answers does not re-fire.
        let Some(reminder) = self.repo.update(id, Reminder::mark_fired).await? else {
            info!(id, "fired reminder no longer exists");
            return Ok(FireOutcome::Stale);
        };
        info!(id, title = %reminder.title, "reminder fired");

        if reminder.beep_enabled {
            self.bus.send(Message::PlayAlarm {
                title: reminder.title.clone(),
            });
        }

        self.repo.set_last_fired(&reminder).await?;
        self.bus.send(Message::ShowReminder {
            reminder: reminder.clone(),
        });

        match self.prompt.open(&reminder).await {
            Ok(()) => Ok(FireOutcome::Prompted(reminder)),
            Err(e) => {
                warn!(id, error = %e, "prompt failed to open, falling back to notification");
                self.notifications
                    .show(&Notification::for_reminder(&reminder))
                    .await
                    .map_err(|e| AppError::surface(format!("no surface for reminder {}: {}", id, e)))?;
                Ok(FireOutcome::Notified(reminder))
            }
        }
    }

    /// Apply the user's answer. `None` when the reminder has been deleted meanwhile.
    pub async fn respond(&self, id: &str, response: Response) -> AppResult<Option<Reminder>> {
        self.stop_alarm();
        let scheduler = self.repo.scheduler();

        match response {
            Response::Snooze => {
                let when = scheduler.now_ms() + self.snooze.num_milliseconds();
                let updated = self.repo.update(id, |r| r.snooze_until(when)).await?;
                if let Some(reminder) = &updated {
                    scheduler.schedule(reminder).await?;
                    info!(id, when, "reminder snoozed");
                }
                Ok(updated)
            }
            Response::Done => {
                let updated = self.repo.update(id, |r| r.set_completed(true)).await?;
                scheduler.cancel(id).await?;
                info!(id, "reminder marked done");
                Ok(updated)
            }
        }
    }

    /// A button on the fallback notification was pressed.
    pub async fn on_notification_button(
        &self,
        notification_id: &str,
        index: usize,
    ) -> AppResult<Option<Reminder>> {
        let Some(id) = parse_timer_name(notification_id) else {
            return Ok(None);
        };
        let Some(response) = Response::from_button(index) else {
            debug!(notification_id, index, "unknown notification button");
            return Ok(None);
        };

        let updated = self.respond(id, response).await?;
        self.clear_notification(notification_id).await;
        Ok(updated)
    }

    /// The notification body was clicked: dismiss it, nothing else.
    pub async fn on_notification_clicked(&self, notification_id: &str) {
        if parse_timer_name(notification_id).is_some() {
            self.clear_notification(notification_id).await;
        }
    }

    pub fn stop_alarm(&self) {
        self.bus.send(Message::StopAlarm);
    }

    pub(crate) async fn close_prompt(&self, id: &str) {
        if let Err(e) = self.prompt.close(id).await {
            warn!(id, error = %e, "failed to close prompt");
        }
    }

    async fn clear_notification(&self, notification_id: &str) {
        if let Err(e) = self.notifications.clear(notification_id).await {
            warn!(notification_id, error = %e, "failed to clear notification");
        }
    }
}
