//! Fakes for the platform seams, shared by the unit tests.

use crate::alert::{AlertTrigger, Notification, NotificationSurface, PromptSurface};
use crate::audio::ToneOutput;
use crate::clock::{Clock, ManualClock};
use crate::error::{AppError, AppResult};
use crate::messages::MessageBus;
use crate::reminder::Reminder;
use crate::scheduler::{timer_name, SchedulerAdapter, TimerFacility};
use crate::storage::{MemoryStore, Repository, Store};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Timer facility that only records what is pending.
#[derive(Default)]
pub struct RecordingTimers {
    pending: Mutex<BTreeMap<String, i64>>,
}

impl RecordingTimers {
    pub fn armed(&self) -> Vec<(String, i64)> {
        self.pending
            .lock()
            .unwrap()
            .iter()
            .map(|(name, when)| (name.clone(), *when))
            .collect()
    }

    pub fn is_armed(&self, id: &str) -> bool {
        self.pending.lock().unwrap().contains_key(&timer_name(id))
    }

    /// Simulate the platform firing `name`.
    pub fn expire(&self, name: &str) {
        self.pending.lock().unwrap().remove(name);
    }
}

#[async_trait]
impl TimerFacility for RecordingTimers {
    async fn create(&self, name: &str, when_ms: i64) -> AppResult<()> {
        self.pending.lock().unwrap().insert(name.to_string(), when_ms);
        Ok(())
    }

    async fn clear(&self, name: &str) -> AppResult<bool> {
        Ok(self.pending.lock().unwrap().remove(name).is_some())
    }

    async fn names(&self) -> AppResult<Vec<String>> {
        Ok(self.pending.lock().unwrap().keys().cloned().collect())
    }
}

#[derive(Default)]
pub struct RecordingOutput {
    tones: AtomicUsize,
    silences: AtomicUsize,
}

impl RecordingOutput {
    pub fn tones(&self) -> usize {
        self.tones.load(Ordering::SeqCst)
    }

    pub fn silences(&self) -> usize {
        self.silences.load(Ordering::SeqCst)
    }
}

impl ToneOutput for RecordingOutput {
    fn start_tone(&self, _frequency_hz: f32, _duration: Duration) {
        self.tones.fetch_add(1, Ordering::SeqCst);
    }

    fn silence(&self) {
        self.silences.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct ScriptedPrompt {
    opened: Mutex<Vec<String>>,
    closed: Mutex<Vec<String>>,
    fail_next: AtomicBool,
}

impl ScriptedPrompt {
    pub fn fail_next_open(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    pub fn closed(&self) -> Vec<String> {
        self.closed.lock().unwrap().clone()
    }
}

#[async_trait]
impl PromptSurface for ScriptedPrompt {
    async fn open(&self, reminder: &Reminder) -> AppResult<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(AppError::surface("tab could not be created"));
        }
        self.opened.lock().unwrap().push(reminder.id.clone());
        Ok(())
    }

    async fn close(&self, id: &str) -> AppResult<()> {
        self.closed.lock().unwrap().push(id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifications {
    shown: Mutex<Vec<Notification>>,
    cleared: Mutex<Vec<String>>,
}

impl RecordingNotifications {
    pub fn shown(&self) -> Vec<Notification> {
        self.shown.lock().unwrap().clone()
    }

    pub fn cleared(&self) -> Vec<String> {
        self.cleared.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSurface for RecordingNotifications {
    async fn show(&self, notification: &Notification) -> AppResult<()> {
        self.shown.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn clear(&self, notification_id: &str) -> AppResult<()> {
        self.cleared.lock().unwrap().push(notification_id.to_string());
        Ok(())
    }
}

/// Store whose every call fails, as if storage were unavailable.
pub struct FailingStore;

#[async_trait]
impl Store for FailingStore {
    async fn get(&self, _key: &str) -> AppResult<Option<Value>> {
        Err(AppError::storage("storage unavailable"))
    }

    async fn set(&self, _key: &str, _value: Value) -> AppResult<()> {
        Err(AppError::storage("storage unavailable"))
    }
}

/// One background context wired to fakes, with a manual clock.
pub struct Harness {
    pub clock: ManualClock,
    pub timers: Arc<RecordingTimers>,
    pub scheduler: SchedulerAdapter,
    /// The backing store, when it is a `MemoryStore`
    memory: Option<MemoryStore>,
    pub repo: Repository,
    pub bus: MessageBus,
    pub prompt: Arc<ScriptedPrompt>,
    pub notifications: Arc<RecordingNotifications>,
    pub trigger: AlertTrigger,
}

impl Harness {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        Self::build(Arc::new(store.clone()), Some(store))
    }

    /// Harness over an arbitrary backing store; `store()` is unavailable.
    pub fn with_store(backing: Arc<dyn Store>) -> Self {
        Self::build(backing, None)
    }

    fn build(backing: Arc<dyn Store>, memory: Option<MemoryStore>) -> Self {
        let clock = ManualClock::new(1_700_000_000_000);
        let timers = Arc::new(RecordingTimers::default());
        let scheduler = SchedulerAdapter::new(timers.clone(), Arc::new(clock.clone()));
        let repo = Repository::new(backing, scheduler.clone());
        let bus = MessageBus::new();
        let prompt = Arc::new(ScriptedPrompt::default());
        let notifications = Arc::new(RecordingNotifications::default());
        let trigger = AlertTrigger::new(
            repo.clone(),
            bus.clone(),
            prompt.clone(),
            notifications.clone(),
            chrono::Duration::minutes(5),
        );

        Self {
            clock,
            timers,
            scheduler,
            memory,
            repo,
            bus,
            prompt,
            notifications,
            trigger,
        }
    }

    /// The in-memory backing store of a `Harness::new()` harness.
    pub fn store(&self) -> &MemoryStore {
        self.memory
            .as_ref()
            .expect("harness was built over a custom store")
    }

    pub fn clock_now(&self) -> i64 {
        self.clock.now_ms()
    }

    /// New reminder due `offset_ms` from now (not stored).
    pub fn reminder(&self, title: &str, offset_ms: i64) -> Reminder {
        Reminder::new(title.to_string(), self.clock_now() + offset_ms)
    }

    /// A timer exists for exactly the armable stored reminders.
    pub async fn assert_timers_match_store(&self) {
        let now = self.clock_now();
        let stored = self.repo.list_all().await.unwrap();
        let expected: Vec<(String, i64)> = {
            let mut armed: Vec<(String, i64)> = stored
                .iter()
                .filter(|r| r.is_armable(now))
                .map(|r| (timer_name(&r.id), r.when))
                .collect();
            armed.sort();
            armed
        };
        assert_eq!(self.timers.armed(), expected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::REMINDERS_KEY;

    #[tokio::test]
    async fn test_store_is_the_backing_store() {
        let h = Harness::new();
        let r = h.reminder("Tea", 60_000);
        h.repo.upsert(&r).await.unwrap();
        assert_eq!(h.store().write_count(), 1);
        assert!(h.store().get(REMINDERS_KEY).await.unwrap().is_some());
    }

    #[test]
    #[should_panic(expected = "custom store")]
    fn test_custom_store_is_not_exposed() {
        let h = Harness::with_store(Arc::new(FailingStore));
        h.store();
    }
}
