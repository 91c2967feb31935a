//! Alarm playback: a fixed, bounded beep pattern that can be cut off at any point.
//!
//! Each `play`/`stop` bumps a generation counter. A running pattern only keeps
//! beeping while the counter still holds the generation it started with, and
//! every inter-beep delay wakes up as soon as the counter moves. A superseded
//! pattern can therefore never beep over, or silence, a newer one.

mod bell;
mod speaker;

use crate::config::BeepSettings;
use crate::messages::Message;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub use bell::TerminalBell;
pub use speaker::Speaker;

/// Audio device. Tones end on their own after `duration`.
pub trait ToneOutput: Send + Sync {
    fn start_tone(&self, frequency_hz: f32, duration: Duration);
    /// Stop every tone currently sounding.
    fn silence(&self);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeepPattern {
    pub count: u32,
    pub frequency_hz: f32,
    pub tone: Duration,
    pub gap: Duration,
}

impl Default for BeepPattern {
    fn default() -> Self {
        Self::from(&BeepSettings::default())
    }
}

impl From<&BeepSettings> for BeepPattern {
    fn from(settings: &BeepSettings) -> Self {
        Self {
            count: settings.count,
            frequency_hz: settings.frequency_hz,
            tone: Duration::from_millis(settings.tone_ms),
            gap: Duration::from_millis(settings.gap_ms),
        }
    }
}

pub struct AudioPlayer {
    output: Arc<dyn ToneOutput>,
    pattern: BeepPattern,
    generation: watch::Sender<u64>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AudioPlayer {
    pub fn new(output: Arc<dyn ToneOutput>, pattern: BeepPattern) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            output,
            pattern,
            generation,
            task: Mutex::new(None),
        }
    }

    /// Start the pattern, superseding whatever is playing. Must be called
    /// from inside a tokio runtime.
    pub fn play(&self, title: &str) {
        let generation = self.supersede();
        debug!(title, generation, "alarm pattern started");

        let output = Arc::clone(&self.output);
        let pattern = self.pattern;
        let cancel = self.generation.subscribe();
        let handle = tokio::spawn(play_pattern(output, pattern, generation, cancel));

        if let Ok(mut task) = self.task.lock() {
            *task = Some(handle);
        }
    }

    /// Halt tones and any pending delay right away.
    pub fn stop(&self) {
        let generation = self.supersede();
        if let Ok(mut task) = self.task.lock() {
            task.take();
        }
        debug!(generation, "alarm stopped");
    }

    pub fn is_playing(&self) -> bool {
        self.task
            .lock()
            .map(|task| task.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Invalidate the current pattern and silence the device.
    fn supersede(&self) -> u64 {
        self.generation.send_modify(|g| *g += 1);
        self.output.silence();
        *self.generation.borrow()
    }
}

async fn play_pattern(
    output: Arc<dyn ToneOutput>,
    pattern: BeepPattern,
    generation: u64,
    mut cancel: watch::Receiver<u64>,
) {
    for beep in 0..pattern.count {
        if *cancel.borrow() != generation {
            return;
        }
        output.start_tone(pattern.frequency_hz, pattern.tone);
        if !wait(&mut cancel, generation, pattern.tone).await {
            return;
        }
        if beep + 1 < pattern.count && !wait(&mut cancel, generation, pattern.gap).await {
            return;
        }
    }
}

/// Sleep for `delay` unless the generation moves first. Returns false when cancelled.
async fn wait(cancel: &mut watch::Receiver<u64>, generation: u64, delay: Duration) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return *cancel.borrow() == generation,
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() != generation {
                    return false;
                }
            }
        }
    }
}

/// The audio context: turns bus messages into playback.
pub async fn run_audio_context(mut messages: broadcast::Receiver<Message>, player: Arc<AudioPlayer>) {
    loop {
        match messages.recv().await {
            Ok(Message::PlayAlarm { title }) => player.play(&title),
            Ok(Message::StopAlarm) => player.stop(),
            Ok(Message::ShowReminder { .. }) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "audio context lagged behind the message bus");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    player.stop();
    debug!("audio context stopped");
}
