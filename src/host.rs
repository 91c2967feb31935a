//! The foreground loop: timer expiries, typed commands, prompt timeouts.

use crate::alert::{AlertTrigger, FireOutcome, PromptSession, Response};
use crate::error::{AppError, AppResult};
use crate::scheduler::{parse_timer_name, timer_name, TimerEvents};
use crate::storage::Repository;
use crate::terminal::{format_view, parse_command, Command, HELP};
use crate::ui::{format_when, toggle_theme, ListView, PopupController, ReminderForm, ViewState};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::time::Instant;
use tracing::{debug, error, info};

/// What is currently waiting for the user's answer.
#[derive(Debug)]
enum Active {
    Prompt(PromptSession),
    /// Fallback notification, by notification id
    Notification(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct TerminalHost {
    trigger: AlertTrigger,
    ui: PopupController,
    prompt_timeout: Duration,
    state: ViewState,
    active: Option<Active>,
}

impl TerminalHost {
    pub fn new(trigger: AlertTrigger, ui: PopupController, prompt_timeout: Duration) -> Self {
        Self {
            trigger,
            ui,
            prompt_timeout,
            state: ViewState::default(),
            active: None,
        }
    }

    fn repo(&self) -> &Repository {
        self.ui.repository()
    }

    pub fn prompt_deadline(&self) -> Option<Instant> {
        match &self.active {
            Some(Active::Prompt(session)) => Some(session.deadline()),
            _ => None,
        }
    }

    pub async fn run(self, fired: TimerEvents) -> anyhow::Result<()> {
        self.run_with(BufReader::new(tokio::io::stdin()), fired).await
    }

    /// The loop behind `run`, reading commands from `input`.
    pub async fn run_with<R>(mut self, input: R, mut fired: TimerEvents) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        println!("Type `help` for commands.");
        let listing = self.list().await;
        print(listing);

        let mut reading = true;
        loop {
            let deadline = self.prompt_deadline();
            tokio::select! {
                Some(name) = fired.recv() => {
                    let output = self.on_timer(&name).await;
                    print(output);
                }
                line = lines.next_line(), if reading => match line {
                    Ok(Some(line)) => {
                        let flow = match parse_command(&line) {
                            Ok(command) => {
                                let (flow, output) = self.execute(command).await;
                                print(output);
                                flow
                            }
                            Err(e) => {
                                print(Err(e));
                                Flow::Continue
                            }
                        };
                        if flow == Flow::Quit {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        // alerts keep firing; only typed commands are lost
                        error!(error = %e, "cannot read from stdin, commands disabled");
                        reading = false;
                    }
                },
                _ = until(deadline) => self.on_prompt_timeout().await,
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        info!("shutting down");
        self.trigger.stop_alarm();
        Ok(())
    }

    async fn list(&mut self) -> AppResult<Option<String>> {
        let view = self.ui.render(&mut self.state).await?;
        Ok(Some(format_view(&view)))
    }

    /// Id of the reminder shown at `index`.
    async fn id_at(&self, index: usize) -> AppResult<String> {
        self.repo()
            .list_all()
            .await?
            .into_iter()
            .nth(index)
            .map(|r| r.id)
            .ok_or_else(|| AppError::validation(format!("No reminder at position {}", index + 1)))
    }

    // ============ Timers ============

    pub async fn on_timer(&mut self, name: &str) -> AppResult<Option<String>> {
        if parse_timer_name(name).is_none() {
            debug!(name, "ignoring foreign timer");
            return Ok(None);
        }

        let previous = self.active.take();
        let fired = match self.trigger.on_timer_fired(name).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.active = previous;
                return Err(e);
            }
        };

        let next = match fired {
            FireOutcome::Prompted(_) => PromptSession::load(self.repo(), self.prompt_timeout)
                .await?
                .map(Active::Prompt),
            FireOutcome::Notified(reminder) => Some(Active::Notification(timer_name(&reminder.id))),
            FireOutcome::Ignored | FireOutcome::Stale => {
                self.active = previous;
                return Ok(None);
            }
        };

        // the newer reminder takes over; its alarm is already playing
        match previous {
            Some(Active::Prompt(session)) => session.replaced(&self.trigger).await,
            Some(Active::Notification(id)) => self.trigger.on_notification_clicked(&id).await,
            None => {}
        }
        self.active = next;
        Ok(None)
    }

    pub async fn on_prompt_timeout(&mut self) {
        if let Some(Active::Prompt(session)) = self.active.take() {
            session.expire(&self.trigger).await;
        }
    }

    // ============ Commands ============

    pub async fn execute(&mut self, command: Command) -> (Flow, AppResult<Option<String>>) {
        match command {
            Command::Quit => (Flow::Quit, Ok(None)),
            Command::Help => (Flow::Continue, Ok(Some(HELP.to_string()))),
            other => (Flow::Continue, self.apply(other).await),
        }
    }

    async fn apply(&mut self, command: Command) -> AppResult<Option<String>> {
        let ui = self.ui.clone();
        let view = match command {
            Command::List | Command::Help | Command::Quit => ui.render(&mut self.state).await?,
            Command::Add(form) => {
                ui.open_form(&mut self.state, None);
                self.submit(&form).await?
            }
            Command::Edit(index, form) => {
                let id = self.id_at(index).await?;
                let reminder = self.repo().get(&id).await?;
                ui.open_form(&mut self.state, reminder.as_ref());
                self.submit(&form).await?
            }
            Command::Toggle(index) => {
                let id = self.id_at(index).await?;
                ui.toggle_enabled(&mut self.state, &id).await?
            }
            Command::Sound(index) => {
                let id = self.id_at(index).await?;
                ui.toggle_sound(&mut self.state, &id).await?
            }
            Command::Complete(index, completed) => {
                let id = self.id_at(index).await?;
                ui.set_completed(&mut self.state, &id, completed).await?
            }
            Command::Delete(index) => {
                let id = self.id_at(index).await?;
                ui.request_delete(&mut self.state, &id).await?
            }
            Command::Select(index) => {
                let id = self.id_at(index).await?;
                ui.toggle_selected(&mut self.state, &id).await?
            }
            Command::DeleteSelected(confirmed) => {
                if self.state.selected.is_empty() {
                    return Err(AppError::validation("Nothing selected"));
                }
                if confirmed {
                    ui.delete_selected(&mut self.state).await?
                } else {
                    ui.request_delete_selected(&mut self.state).await?
                }
            }
            Command::Confirm(true) => ui.confirm_delete(&mut self.state).await?,
            Command::Confirm(false) => ui.cancel_delete(&mut self.state).await?,
            Command::Move(from, to) => {
                let id = self.id_at(from).await?;
                ui.begin_drag(&mut self.state, &id);
                ui.drop_at(&mut self.state, to).await?
            }
            Command::Theme => {
                let theme = toggle_theme(self.repo().store().as_ref()).await?;
                return Ok(Some(format!("Theme: {}", theme.as_str())));
            }
            Command::Answer(response) => return self.answer(response).await,
            Command::Dismiss => return self.dismiss().await,
        };
        Ok(Some(format_view(&view)))
    }

    async fn submit(&mut self, form: &ReminderForm) -> AppResult<ListView> {
        match self.ui.submit_form(&mut self.state, form).await {
            Ok(view) => Ok(view),
            Err(e) => {
                // the terminal has no form to return to
                self.ui.cancel_form(&mut self.state).await?;
                Err(e)
            }
        }
    }

    async fn answer(&mut self, response: Response) -> AppResult<Option<String>> {
        let updated = match self.active.take() {
            Some(Active::Prompt(session)) => session.respond(&self.trigger, response).await?,
            Some(Active::Notification(id)) => {
                self.trigger.on_notification_button(&id, response.button()).await?
            }
            None => return Err(AppError::validation("No reminder is waiting for an answer")),
        };
        debug!(?response, found = updated.is_some(), "answered reminder");

        let note = match (response, updated) {
            (_, None) => "That reminder was deleted".to_string(),
            (Response::Snooze, Some(r)) => format!("Snoozed: {} ({})", r.title, format_when(r.when)),
            (Response::Done, Some(r)) => format!("Done: {}", r.title),
        };
        Ok(Some(note))
    }

    async fn dismiss(&mut self) -> AppResult<Option<String>> {
        match self.active.take() {
            Some(Active::Prompt(session)) => session.dismiss(&self.trigger).await,
            Some(Active::Notification(id)) => {
                self.trigger.stop_alarm();
                self.trigger.on_notification_clicked(&id).await;
            }
            None => return Err(AppError::validation("No reminder is waiting for an answer")),
        }
        Ok(None)
    }
}

fn print(output: AppResult<Option<String>>) {
    match output {
        Ok(Some(text)) => println!("{}", text),
        Ok(None) => {}
        Err(e) if e.is_user_facing() => println!("! {}", e.message()),
        Err(e) => {
            error!(error = %e, "command failed");
            println!("! Something went wrong, see the log");
        }
    }
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
