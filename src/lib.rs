pub mod alert;
pub mod audio;
pub mod clock;
pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod messages;
pub mod reminder;
pub mod scheduler;
pub mod storage;
pub mod terminal;
pub mod ui;

#[cfg(test)]
pub(crate) mod test_support;

use alert::AlertTrigger;
use audio::{run_audio_context, AudioPlayer, BeepPattern, Speaker, TerminalBell, ToneOutput};
use clock::{Clock, SystemClock};
use config::Settings;
use host::TerminalHost;
use messages::MessageBus;
use scheduler::{SchedulerAdapter, TokioTimers};
use std::sync::Arc;
use storage::{JsonFileStore, Repository};
use terminal::{TerminalNotifications, TerminalPrompt};
use tracing::{error, info, warn};
use ui::PopupController;

fn load_settings() -> anyhow::Result<Settings> {
    match Settings::default_path() {
        Some(path) => Ok(Settings::load(&path)?),
        None => Ok(Settings::default()),
    }
}

/// The speaker when there is one, the terminal bell otherwise.
fn tone_output() -> Arc<dyn ToneOutput> {
    match Speaker::open() {
        Ok(speaker) => Arc::new(speaker),
        Err(e) => {
            warn!(error = %e, "no audio output, falling back to the terminal bell");
            Arc::new(TerminalBell)
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    let settings = load_settings()?;
    logging::init(&settings);

    let store = JsonFileStore::open(settings.store_path()).await?;
    info!(path = %store.path().display(), "using store");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (timers, fired) = TokioTimers::new(clock.clone());
    let scheduler = SchedulerAdapter::new(Arc::new(timers), clock);
    let repo = Repository::new(Arc::new(store), scheduler.clone());

    // Timers do not outlive the process; re-arm everything from storage.
    if let Err(e) = scheduler.reschedule_all(&repo).await {
        error!(error = %e, "failed to reschedule reminders");
    }

    let bus = MessageBus::new();
    let player = Arc::new(AudioPlayer::new(
        tone_output(),
        BeepPattern::from(&settings.beep),
    ));
    tokio::spawn(run_audio_context(bus.subscribe(), player));

    let trigger = AlertTrigger::new(
        repo.clone(),
        bus,
        Arc::new(TerminalPrompt),
        Arc::new(TerminalNotifications),
        settings.snooze(),
    );
    let ui = PopupController::new(repo);

    TerminalHost::new(trigger, ui, settings.prompt_timeout())
        .run(fired)
        .await
}
