//! Fire-and-forget messages between the background, audio and UI contexts.

use crate::reminder::Reminder;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

const BUS_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    PlayAlarm { title: String },
    StopAlarm,
    ShowReminder { reminder: Reminder },
}

/// Best-effort broadcast. Nothing is acknowledged and a send nobody hears is
/// dropped.
#[derive(Debug, Clone)]
pub struct MessageBus {
    tx: broadcast::Sender<Message>,
}

impl MessageBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.tx.subscribe()
    }

    pub fn send(&self, message: Message) {
        if let Err(broadcast::error::SendError(message)) = self.tx.send(message) {
            debug!(?message, "no listener for message, dropped");
        }
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}
