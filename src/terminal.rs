//! Terminal rendition of the prompt and notification surfaces, and the line
//! commands that drive the list UI.

use crate::alert::{Notification, NotificationSurface, PromptSurface, Response};
use crate::error::{AppError, AppResult};
use crate::reminder::{Reminder, ReminderState};
use crate::ui::{Card, ListView, ReminderForm, View};
use async_trait::async_trait;
use std::io::Write;

pub const HELP: &str = "\
commands (N is a list position):
  list                              show reminders
  add YYYY-MM-DD HH:MM <title>      new reminder
  edit N YYYY-MM-DD HH:MM <title>   change a reminder
  toggle N | sound N                switch alarm / beep on or off
  done N | undone N                 mark complete or not
  delete N | select N | delete-selected, then yes / no
  delete-selected -y                delete the selection without asking
  move N M                          drag reminder N to position M
  theme                             switch light / dark
  snooze (s) | done (d) | dismiss   answer a fired reminder
  help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List,
    Add(ReminderForm),
    Edit(usize, ReminderForm),
    Toggle(usize),
    Sound(usize),
    Complete(usize, bool),
    Delete(usize),
    Select(usize),
    /// `true` when confirmed inline with `-y`
    DeleteSelected(bool),
    Confirm(bool),
    Move(usize, usize),
    Theme,
    Answer(Response),
    Dismiss,
    Help,
    Quit,
}

/// Parse one input line. Positions are 1-based as shown in the list.
pub fn parse_command(line: &str) -> AppResult<Command> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(Command::List);
    };
    let rest: Vec<&str> = words.collect();

    let command = match (verb, rest.as_slice()) {
        ("list" | "ls", []) => Command::List,
        ("add", [date, time, title @ ..]) => Command::Add(ReminderForm::new(&title.join(" "), date, time)),
        ("edit", [n, date, time, title @ ..]) => {
            Command::Edit(position(n)?, ReminderForm::new(&title.join(" "), date, time))
        }
        ("toggle", [n]) => Command::Toggle(position(n)?),
        ("sound", [n]) => Command::Sound(position(n)?),
        ("done", [n]) => Command::Complete(position(n)?, true),
        ("undone", [n]) => Command::Complete(position(n)?, false),
        ("delete" | "rm", [n]) => Command::Delete(position(n)?),
        ("select", [n]) => Command::Select(position(n)?),
        ("delete-selected", []) => Command::DeleteSelected(false),
        ("delete-selected", ["-y" | "--yes"]) => Command::DeleteSelected(true),
        ("yes" | "y", []) => Command::Confirm(true),
        ("no" | "n", []) => Command::Confirm(false),
        ("move", [from, to]) => Command::Move(position(from)?, position(to)?),
        ("theme", []) => Command::Theme,
        ("snooze" | "s", []) => Command::Answer(Response::Snooze),
        ("done" | "d", []) => Command::Answer(Response::Done),
        ("dismiss", []) => Command::Dismiss,
        ("help" | "?", []) => Command::Help,
        ("quit" | "exit" | "q", []) => Command::Quit,
        _ => return Err(AppError::validation(format!("Unknown command: {} (try `help`)", line.trim()))),
    };
    Ok(command)
}

fn position(raw: &str) -> AppResult<usize> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(AppError::validation(format!("Not a list position: {}", raw))),
    }
}

fn card_line(index: usize, card: &Card) -> String {
    let done = if card.completed { "x" } else { " " };
    let state = match card.state {
        ReminderState::Armed => "on",
        ReminderState::Fired => "fired",
        ReminderState::Idle => "off",
        ReminderState::Done => "done",
    };
    let mut line = format!(
        "{:>2}. [{}] {:<35}  {}  ({}{})",
        index + 1,
        done,
        card.title,
        card.when_label,
        state,
        if card.beep_enabled { ", beep" } else { "" },
    );
    if card.selected {
        line.push_str("  *");
    }
    line
}

pub fn format_view(view: &ListView) -> String {
    let mut out = String::new();
    if view.empty {
        out.push_str("No reminders yet. Add one with `add YYYY-MM-DD HH:MM <title>`.");
    } else {
        let lines: Vec<String> = view.cards.iter().enumerate().map(|(i, c)| card_line(i, c)).collect();
        out.push_str(&lines.join("\n"));
    }
    if view.selection_count > 0 {
        out.push_str(&format!("\n{} selected", view.selection_count));
    }
    if let Some(count) = view.confirm_delete {
        out.push_str(&format!("\nDelete {} reminder(s)? yes / no", count));
    }
    if view.view == View::Form {
        if let Some(error) = &view.form_error {
            out.push_str(&format!("\n! {}", error));
        }
    }
    out
}

fn print(text: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", text)?;
    stdout.flush()
}

/// Fired reminders printed as a banner in the terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

#[async_trait]
impl PromptSurface for TerminalPrompt {
    async fn open(&self, reminder: &Reminder) -> AppResult<()> {
        print(&format!(
            "\n⏰ {}\n   snooze (s) for 5 min  |  done (d)",
            reminder.title
        ))
        .map_err(|e| AppError::surface(e.to_string()))
    }

    async fn close(&self, _id: &str) -> AppResult<()> {
        print("(reminder closed)").map_err(|e| AppError::surface(e.to_string()))
    }
}

/// Fallback surface: a one-line notice with numbered buttons.
#[derive(Debug, Default)]
pub struct TerminalNotifications;

#[async_trait]
impl NotificationSurface for TerminalNotifications {
    async fn show(&self, notification: &Notification) -> AppResult<()> {
        let buttons: Vec<String> = notification
            .buttons
            .iter()
            .enumerate()
            .map(|(i, label)| format!("{}: {}", i + 1, label))
            .collect();
        print(&format!(
            "\n{} {}  [{}]",
            notification.title,
            notification.message,
            buttons.join(", ")
        ))
        .map_err(|e| AppError::surface(e.to_string()))
    }

    async fn clear(&self, _notification_id: &str) -> AppResult<()> {
        Ok(())
    }
}
