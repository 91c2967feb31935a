mod local;
mod memory;

use crate::config::{CURRENT_REMINDER_KEY, REMINDERS_KEY};
use crate::error::{AppError, AppResult};
use crate::reminder::Reminder;
use crate::scheduler::SchedulerAdapter;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

pub use local::JsonFileStore;
pub use memory::MemoryStore;

/// Persistent key-value store shared by every context of the app.
///
/// No transactions and no versioning: two contexts doing read-modify-write on
/// the same key can interleave and the last `set` wins.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> AppResult<()>;
}

/// The only reader/writer of the canonical reminder list.
///
/// Callers hold transient copies; every mutation re-reads the full list and
/// applies the change by `id`.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn Store>,
    scheduler: SchedulerAdapter,
}

impl Repository {
    pub fn new(store: Arc<dyn Store>, scheduler: SchedulerAdapter) -> Self {
        Self { store, scheduler }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn scheduler(&self) -> &SchedulerAdapter {
        &self.scheduler
    }

    // ============ Reminder list ============

    /// Current list in display order. Absent or non-list values read as empty.
    pub async fn list_all(&self) -> AppResult<Vec<Reminder>> {
        match self.store.get(REMINDERS_KEY).await? {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(serde_json::from_value)
                .collect::<Result<Vec<Reminder>, _>>()
                .map_err(|e| AppError::storage(format!("Unreadable reminder list: {}", e))),
            Some(other) => {
                warn!(kind = json_kind(&other), "stored reminder list is not a list, treating as empty");
                Ok(Vec::new())
            }
            None => Ok(Vec::new()),
        }
    }

    /// Overwrite the whole list with a single write.
    pub async fn replace_all(&self, items: &[Reminder]) -> AppResult<()> {
        let value = serde_json::to_value(items)?;
        self.store.set(REMINDERS_KEY, value).await
    }

    pub async fn get(&self, id: &str) -> AppResult<Option<Reminder>> {
        Ok(self.list_all().await?.into_iter().find(|r| r.id == id))
    }

    /// Replace the entry with the same id, or append it.
    pub async fn upsert(&self, item: &Reminder) -> AppResult<()> {
        let mut all = self.list_all().await?;
        match all.iter_mut().find(|r| r.id == item.id) {
            Some(existing) => *existing = item.clone(),
            None => all.push(item.clone()),
        }
        self.replace_all(&all).await?;
        debug!(id = %item.id, "reminder saved");
        Ok(())
    }

    /// Apply `change` to the freshly stored record. `None` when the id is gone.
    pub async fn update<F>(&self, id: &str, change: F) -> AppResult<Option<Reminder>>
    where
        F: FnOnce(&mut Reminder) + Send,
    {
        let mut all = self.list_all().await?;
        let Some(reminder) = all.iter_mut().find(|r| r.id == id) else {
            debug!(id, "update skipped, reminder no longer stored");
            return Ok(None);
        };
        change(reminder);
        let updated = reminder.clone();
        self.replace_all(&all).await?;
        Ok(Some(updated))
    }

    /// Delete a reminder and clear its timer. Returns whether it was stored.
    pub async fn remove(&self, id: &str) -> AppResult<bool> {
        let removed = self.remove_many(&[id.to_string()]).await?;
        Ok(removed > 0)
    }

    /// Bulk delete with one write; every id's timer is cleared.
    pub async fn remove_many(&self, ids: &[String]) -> AppResult<usize> {
        let mut all = self.list_all().await?;
        let before = all.len();
        all.retain(|r| !ids.contains(&r.id));
        let removed = before - all.len();

        if removed > 0 {
            self.replace_all(&all).await?;
        }
        for id in ids {
            self.scheduler.cancel(id).await?;
        }
        debug!(requested = ids.len(), removed, "reminders deleted");
        Ok(removed)
    }

    // ============ Fired-reminder handoff ============

    pub async fn last_fired(&self) -> AppResult<Option<Reminder>> {
        match self.store.get(CURRENT_REMINDER_KEY).await? {
            Some(Value::Null) | None => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    pub async fn set_last_fired(&self, reminder: &Reminder) -> AppResult<()> {
        let value = serde_json::to_value(reminder)?;
        self.store.set(CURRENT_REMINDER_KEY, value).await
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
