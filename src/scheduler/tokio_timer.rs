use super::TimerFacility;
use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Receiving end for expired timer names.
pub type TimerEvents = mpsc::UnboundedReceiver<String>;

struct Pending {
    seq: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Registry {
    next_seq: u64,
    pending: HashMap<String, Pending>,
}

/// Timer facility on top of the tokio runtime: one sleeping task per name.
/// Nothing survives the process, so `reschedule_all` must run at start.
pub struct TokioTimers {
    clock: Arc<dyn Clock>,
    fired_tx: mpsc::UnboundedSender<String>,
    registry: Arc<Mutex<Registry>>,
}

impl TokioTimers {
    pub fn new(clock: Arc<dyn Clock>) -> (Self, TimerEvents) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let timers = Self {
            clock,
            fired_tx,
            registry: Arc::new(Mutex::new(Registry::default())),
        };
        (timers, fired_rx)
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Registry>> {
        self.registry
            .lock()
            .map_err(|_| AppError::timer("timer registry poisoned"))
    }
}

#[async_trait]
impl TimerFacility for TokioTimers {
    async fn create(&self, name: &str, when_ms: i64) -> AppResult<()> {
        let delay = u64::try_from(when_ms - self.clock.now_ms()).unwrap_or(0);
        let mut registry = self.lock()?;
        registry.next_seq += 1;
        let seq = registry.next_seq;

        let task_name = name.to_string();
        let task_registry = Arc::clone(&self.registry);
        let fired_tx = self.fired_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;

            // A replacement registered under the same name owns the entry now.
            if let Ok(mut registry) = task_registry.lock() {
                if registry.pending.get(&task_name).map(|p| p.seq) == Some(seq) {
                    registry.pending.remove(&task_name);
                }
            }
            if fired_tx.send(task_name.clone()).is_err() {
                warn!(name = %task_name, "timer fired with no listener");
            }
        });

        if let Some(previous) = registry.pending.insert(name.to_string(), Pending { seq, handle }) {
            previous.handle.abort();
        }
        debug!(name, delay_ms = delay, "timer armed");
        Ok(())
    }

    async fn clear(&self, name: &str) -> AppResult<bool> {
        match self.lock()?.pending.remove(name) {
            Some(pending) => {
                pending.handle.abort();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn names(&self) -> AppResult<Vec<String>> {
        let mut names: Vec<String> = self.lock()?.pending.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
