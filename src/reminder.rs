use crate::config::TITLE_MAX_CHARS;
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: String,
    pub title: String,
    pub when: i64, // epoch milliseconds
    pub enabled: bool,
    pub completed: bool,
    #[serde(default = "default_beep_enabled")]
    pub beep_enabled: bool, // older records have no field and beep
}

fn default_beep_enabled() -> bool {
    true
}

/// Where a reminder sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderState {
    /// Enabled but its time has passed without firing here, or disabled by the user
    Idle,
    /// A timer should be registered
    Armed,
    /// Timer elapsed and the user has not answered yet
    Fired,
    /// Terminal
    Done,
}

impl Reminder {
    pub fn new(title: String, when: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            when,
            enabled: true,
            completed: false,
            beep_enabled: true,
        }
    }

    /// Only future, enabled, non-completed reminders get a timer.
    pub fn is_armable(&self, now_ms: i64) -> bool {
        self.enabled && !self.completed && self.when > now_ms
    }

    pub fn state(&self, now_ms: i64) -> ReminderState {
        if self.completed {
            ReminderState::Done
        } else if self.is_armable(now_ms) {
            ReminderState::Armed
        } else if !self.enabled && self.when <= now_ms {
            ReminderState::Fired
        } else {
            ReminderState::Idle
        }
    }

    /// Timer elapsed: disarm so a restart does not re-fire before the user answers.
    pub fn mark_fired(&mut self) {
        self.enabled = false;
    }

    pub fn snooze_until(&mut self, when: i64) {
        self.when = when;
        self.enabled = !self.completed;
    }

    pub fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
        if completed {
            self.enabled = false;
        }
    }

    /// A completed reminder stays disabled.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled && !self.completed;
    }
}

/// Trim and bound a user-entered title.
pub fn validate_title(raw: &str) -> AppResult<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(AppError::validation("Title cannot be empty"));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(AppError::validation(format!(
            "Title must be at most {} characters",
            TITLE_MAX_CHARS
        )));
    }
    Ok(title.to_string())
}
