//! The reminder list UI: view state, form validation and the actions behind
//! each control.
//!
//! Every mutating action writes through the repository, then brings the timer
//! in line, then re-renders from what is stored. Nothing is changed only in
//! the view.

mod theme;

use crate::config::FORM_PREFILL_STEP_MINUTES;
use crate::error::{AppError, AppResult};
use crate::reminder::{validate_title, Reminder, ReminderState};
use crate::storage::Repository;
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Timelike};
use std::collections::BTreeSet;
use tracing::{debug, info};

pub use theme::{toggle_theme, Theme};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    List,
    Form,
}

/// Everything the UI remembers between actions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub view: View,
    /// Id being edited in the form, `None` when creating
    pub editing: Option<String>,
    pub selected: BTreeSet<String>,
    /// Id of the card being dragged
    pub drag: Option<String>,
    /// Ids waiting for delete confirmation
    pub pending_delete: Vec<String>,
    pub form_error: Option<String>,
}

/// Raw form input, date as `YYYY-MM-DD` and time as `HH:MM`, local wall clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderForm {
    pub title: String,
    pub date: String,
    pub time: String,
}

impl ReminderForm {
    pub fn new(title: &str, date: &str, time: &str) -> Self {
        Self {
            title: title.to_string(),
            date: date.to_string(),
            time: time.to_string(),
        }
    }

    pub fn at<Tz: TimeZone>(title: &str, when: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self::new(
            title,
            &when.format("%Y-%m-%d").to_string(),
            &when.format("%H:%M").to_string(),
        )
    }

    /// Empty title, time rounded up to the next 5-minute mark.
    pub fn prefilled<Tz: TimeZone>(now: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        let step = FORM_PREFILL_STEP_MINUTES;
        let start = now
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or_else(|| now.clone());
        let bump = i64::from(step - start.minute() % step);
        Self::at("", &(start + chrono::Duration::minutes(bump)))
    }

    pub fn for_reminder(reminder: &Reminder) -> Self {
        match Local.timestamp_millis_opt(reminder.when).earliest() {
            Some(when) => Self::at(&reminder.title, &when),
            None => Self::new(&reminder.title, "", ""),
        }
    }

    /// Resolve date and time in `tz` to epoch milliseconds.
    pub fn parse_when_in<Tz: TimeZone>(&self, tz: &Tz) -> AppResult<i64> {
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")
            .map_err(|_| AppError::validation("Please pick a valid date"))?;
        let time = NaiveTime::parse_from_str(self.time.trim(), "%H:%M")
            .map_err(|_| AppError::validation("Please pick a valid time"))?;
        tz.from_local_datetime(&date.and_time(time))
            .earliest()
            .map(|when| when.timestamp_millis())
            .ok_or_else(|| AppError::validation("That time does not exist on this day"))
    }

    /// Title and strictly-future timestamp, or the message to show.
    pub fn validate_in<Tz: TimeZone>(&self, tz: &Tz, now_ms: i64) -> AppResult<(String, i64)> {
        let title = validate_title(&self.title)?;
        let when = self.parse_when_in(tz)?;
        if when <= now_ms {
            return Err(AppError::validation("Please pick a time in the future"));
        }
        Ok((title, when))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub id: String,
    pub title: String,
    pub when_label: String,
    pub enabled: bool,
    pub completed: bool,
    pub beep_enabled: bool,
    pub state: ReminderState,
    pub selected: bool,
    pub dragging: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListView {
    pub view: View,
    pub cards: Vec<Card>,
    pub empty: bool,
    pub selection_count: usize,
    /// How many reminders a pending delete would remove
    pub confirm_delete: Option<usize>,
    pub form_error: Option<String>,
}

pub fn format_when(when_ms: i64) -> String {
    match Local.timestamp_millis_opt(when_ms).earliest() {
        Some(when) => when.format("%b %-d, %Y %H:%M").to_string(),
        None => "-".to_string(),
    }
}

/// Build the view from stored items, in stored order.
pub fn render(items: &[Reminder], state: &ViewState, now_ms: i64) -> ListView {
    let cards: Vec<Card> = items
        .iter()
        .map(|r| Card {
            id: r.id.clone(),
            title: r.title.clone(),
            when_label: format_when(r.when),
            enabled: r.enabled,
            completed: r.completed,
            beep_enabled: r.beep_enabled,
            state: r.state(now_ms),
            selected: state.selected.contains(&r.id),
            dragging: state.drag.as_deref() == Some(r.id.as_str()),
        })
        .collect();

    ListView {
        view: state.view,
        empty: cards.is_empty(),
        selection_count: cards.iter().filter(|c| c.selected).count(),
        cards,
        confirm_delete: (!state.pending_delete.is_empty()).then_some(state.pending_delete.len()),
        form_error: state.form_error.clone(),
    }
}

/// Actions behind the list and form controls.
#[derive(Clone)]
pub struct PopupController {
    repo: Repository,
}

impl PopupController {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Re-read the stored list and render it. Selection of vanished ids is dropped.
    pub async fn render(&self, state: &mut ViewState) -> AppResult<ListView> {
        let items = self.repo.list_all().await?;
        state.selected.retain(|id| items.iter().any(|r| &r.id == id));
        state.pending_delete.retain(|id| items.iter().any(|r| &r.id == id));
        Ok(render(&items, state, self.repo.scheduler().now_ms()))
    }

    // ============ Form ============

    /// Switch to the form, pre-filled for `editing` or for a new reminder.
    pub fn open_form(&self, state: &mut ViewState, editing: Option<&Reminder>) -> ReminderForm {
        state.view = View::Form;
        state.form_error = None;
        state.editing = editing.map(|r| r.id.clone());
        match editing {
            Some(reminder) => ReminderForm::for_reminder(reminder),
            None => {
                let now = Local
                    .timestamp_millis_opt(self.repo.scheduler().now_ms())
                    .earliest()
                    .unwrap_or_else(Local::now);
                ReminderForm::prefilled(&now)
            }
        }
    }

    pub async fn cancel_form(&self, state: &mut ViewState) -> AppResult<ListView> {
        state.view = View::List;
        state.editing = None;
        state.form_error = None;
        self.render(state).await
    }

    /// Create or edit. Invalid input is rejected before anything is stored.
    pub async fn submit_form(&self, state: &mut ViewState, form: &ReminderForm) -> AppResult<ListView> {
        let scheduler = self.repo.scheduler();
        let (title, when) = match form.validate_in(&Local, scheduler.now_ms()) {
            Ok(valid) => valid,
            Err(e) => {
                state.form_error = Some(e.message().to_string());
                return Err(e);
            }
        };

        let saved = match state.editing.clone() {
            Some(id) => {
                let edited = self
                    .repo
                    .update(&id, |r| {
                        r.title = title;
                        r.when = when;
                        r.set_enabled(true);
                    })
                    .await?;
                if edited.is_none() {
                    debug!(id, "edited reminder was deleted meanwhile");
                }
                edited
            }
            None => {
                let reminder = Reminder::new(title, when);
                self.repo.upsert(&reminder).await?;
                info!(id = %reminder.id, when, "reminder created");
                Some(reminder)
            }
        };

        if let Some(reminder) = &saved {
            scheduler.sync(reminder).await?;
        }

        state.view = View::List;
        state.editing = None;
        state.form_error = None;
        self.render(state).await
    }

    // ============ Card controls ============

    pub async fn toggle_enabled(&self, state: &mut ViewState, id: &str) -> AppResult<ListView> {
        self.mutate(id, |r| r.set_enabled(!r.enabled)).await?;
        self.render(state).await
    }

    pub async fn toggle_sound(&self, state: &mut ViewState, id: &str) -> AppResult<ListView> {
        self.mutate(id, |r| r.beep_enabled = !r.beep_enabled).await?;
        self.render(state).await
    }

    pub async fn set_completed(&self, state: &mut ViewState, id: &str, completed: bool) -> AppResult<ListView> {
        self.mutate(id, |r| r.set_completed(completed)).await?;
        self.render(state).await
    }

    /// Read-modify-write one record, then bring its timer in line.
    async fn mutate<F>(&self, id: &str, change: F) -> AppResult<Option<Reminder>>
    where
        F: FnOnce(&mut Reminder) + Send,
    {
        let updated = self.repo.update(id, change).await?;
        if let Some(reminder) = &updated {
            self.repo.scheduler().sync(reminder).await?;
        }
        Ok(updated)
    }

    // ============ Delete ============

    pub async fn request_delete(&self, state: &mut ViewState, id: &str) -> AppResult<ListView> {
        state.pending_delete = vec![id.to_string()];
        self.render(state).await
    }

    pub async fn request_delete_selected(&self, state: &mut ViewState) -> AppResult<ListView> {
        state.pending_delete = state.selected.iter().cloned().collect();
        self.render(state).await
    }

    pub async fn cancel_delete(&self, state: &mut ViewState) -> AppResult<ListView> {
        state.pending_delete.clear();
        self.render(state).await
    }

    /// Delete whatever is waiting for confirmation; timers go with it.
    pub async fn confirm_delete(&self, state: &mut ViewState) -> AppResult<ListView> {
        let ids = std::mem::take(&mut state.pending_delete);
        if !ids.is_empty() {
            let removed = self.repo.remove_many(&ids).await?;
            info!(removed, "reminders deleted");
        }
        for id in &ids {
            state.selected.remove(id);
        }
        self.render(state).await
    }

    /// Delete the selection, confirmation already given.
    pub async fn delete_selected(&self, state: &mut ViewState) -> AppResult<ListView> {
        self.request_delete_selected(state).await?;
        self.confirm_delete(state).await
    }

    pub async fn toggle_selected(&self, state: &mut ViewState, id: &str) -> AppResult<ListView> {
        if !state.selected.remove(id) {
            state.selected.insert(id.to_string());
        }
        self.render(state).await
    }

    // ============ Reorder ============

    pub fn begin_drag(&self, state: &mut ViewState, id: &str) {
        state.drag = Some(id.to_string());
    }

    /// Drop the dragged card at `index` and persist the new order.
    pub async fn drop_at(&self, state: &mut ViewState, index: usize) -> AppResult<ListView> {
        let Some(id) = state.drag.take() else {
            return self.render(state).await;
        };
        self.move_item(state, &id, index).await
    }

    pub async fn move_item(&self, state: &mut ViewState, id: &str, index: usize) -> AppResult<ListView> {
        let mut all = self.repo.list_all().await?;
        if let Some(from) = all.iter().position(|r| r.id == id) {
            let item = all.remove(from);
            let to = index.min(all.len());
            all.insert(to, item);
            self.repo.replace_all(&all).await?;
            debug!(id, from, to, "reminder moved");
        }
        self.render(state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use chrono::Utc;

    fn local(ms: i64) -> DateTime<Local> {
        Local.timestamp_millis_opt(ms).unwrap()
    }

    async fn create(h: &Harness, ui: &PopupController, state: &mut ViewState, title: &str, minutes: i64) -> Reminder {
        ui.open_form(state, None);
        let form = ReminderForm::at(title, &local(h.clock_now() + minutes * 60_000));
        ui.submit_form(state, &form).await.unwrap();
        h.repo.list_all().await.unwrap().pop().unwrap()
    }

    #[test]
    fn test_parse_form_in_utc() {
        let form = ReminderForm::new("Tea", "2024-03-01", "09:30");
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap().timestamp_millis();
        assert_eq!(form.parse_when_in(&Utc).unwrap(), expected);
    }

    #[test]
    fn test_form_rejects_bad_input() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap().timestamp_millis();
        let past = ReminderForm::new("Tea", "2024-03-01", "08:59");
        let exact = ReminderForm::new("Tea", "2024-03-01", "09:00");
        let garbage = ReminderForm::new("Tea", "tomorrow", "09:00");
        let untitled = ReminderForm::new("  ", "2024-03-02", "09:00");

        for form in [past, exact, garbage, untitled] {
            let err = form.validate_in(&Utc, now).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{:?}", form);
        }
    }

    #[test]
    fn test_unrepresentable_time_label() {
        assert_eq!(format_when(i64::MAX), "-");
    }

    #[test]
    fn test_prefill_rounds_to_next_five_minutes() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 2, 41).unwrap();
        assert_eq!(ReminderForm::prefilled(&now), ReminderForm::new("", "2024-03-01", "09:05"));

        let on_mark = Utc.with_ymd_and_hms(2024, 3, 1, 23, 55, 0).unwrap();
        assert_eq!(ReminderForm::prefilled(&on_mark), ReminderForm::new("", "2024-03-02", "00:00"));
    }

    #[tokio::test]
    async fn test_create_stores_schedules_and_renders() {
        let h = Harness::new();
        let ui = PopupController::new(h.repo.clone());
        let mut state = ViewState::default();

        let r = create(&h, &ui, &mut state, "Call mom", 10).await;
        assert!(r.enabled && !r.completed && r.beep_enabled);
        assert!(h.timers.is_armed(&r.id));

        let view = ui.render(&mut state).await.unwrap();
        assert_eq!(view.view, View::List);
        assert!(!view.empty);
        assert_eq!(view.cards[0].title, "Call mom");
        assert_eq!(view.cards[0].state, ReminderState::Armed);
    }

    #[tokio::test]
    async fn test_invalid_submit_changes_nothing() {
        let h = Harness::new();
        let ui = PopupController::new(h.repo.clone());
        let mut state = ViewState::default();
        ui.open_form(&mut state, None);

        let past = ReminderForm::at("Too late", &local(h.clock_now() - 60_000));
        assert!(ui.submit_form(&mut state, &past).await.is_err());
        assert_eq!(h.store().write_count(), 0);
        assert!(h.timers.armed().is_empty());
        assert_eq!(state.view, View::Form);
        assert!(state.form_error.is_some());
    }

    #[tokio::test]
    async fn test_edit_rearms_fired_reminder() {
        let h = Harness::new();
        let ui = PopupController::new(h.repo.clone());
        let mut state = ViewState::default();
        let r = create(&h, &ui, &mut state, "Stretch", 1).await;
        h.clock.advance(chrono::Duration::minutes(1));
        h.trigger.on_timer_fired(&crate::scheduler::timer_name(&r.id)).await.unwrap();

        let fired = h.repo.get(&r.id).await.unwrap().unwrap();
        let mut form = ui.open_form(&mut state, Some(&fired));
        assert_eq!(form.title, "Stretch");
        form = ReminderForm::at("Stretch again", &local(h.clock_now() + 30 * 60_000));
        ui.submit_form(&mut state, &form).await.unwrap();

        let all = h.repo.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Stretch again");
        assert!(all[0].enabled);
        assert!(h.timers.is_armed(&r.id));
    }

    #[tokio::test]
    async fn test_toggles_keep_timer_in_line() {
        let h = Harness::new();
        let ui = PopupController::new(h.repo.clone());
        let mut state = ViewState::default();
        let r = create(&h, &ui, &mut state, "Toggle", 10).await;

        ui.toggle_enabled(&mut state, &r.id).await.unwrap();
        assert!(!h.timers.is_armed(&r.id));
        ui.toggle_enabled(&mut state, &r.id).await.unwrap();
        assert!(h.timers.is_armed(&r.id));

        let view = ui.toggle_sound(&mut state, &r.id).await.unwrap();
        assert!(!view.cards[0].beep_enabled);
        assert!(h.timers.is_armed(&r.id));
    }

    #[tokio::test]
    async fn test_complete_always_disarms() {
        let h = Harness::new();
        let ui = PopupController::new(h.repo.clone());
        let mut state = ViewState::default();
        let armed = create(&h, &ui, &mut state, "Armed", 10).await;
        let paused = create(&h, &ui, &mut state, "Paused", 10).await;
        ui.toggle_enabled(&mut state, &paused.id).await.unwrap();

        for id in [&armed.id, &paused.id] {
            ui.set_completed(&mut state, id, true).await.unwrap();
            let stored = h.repo.get(id).await.unwrap().unwrap();
            assert!(stored.completed);
            assert!(!stored.enabled);
            assert!(!h.timers.is_armed(id));
        }

        // a completed reminder cannot be switched back on
        ui.toggle_enabled(&mut state, &armed.id).await.unwrap();
        assert!(!h.repo.get(&armed.id).await.unwrap().unwrap().enabled);
        assert!(!h.timers.is_armed(&armed.id));
    }

    #[tokio::test]
    async fn test_delete_needs_confirmation() {
        let h = Harness::new();
        let ui = PopupController::new(h.repo.clone());
        let mut state = ViewState::default();
        let r = create(&h, &ui, &mut state, "Delete me", 10).await;

        let view = ui.request_delete(&mut state, &r.id).await.unwrap();
        assert_eq!(view.confirm_delete, Some(1));
        ui.cancel_delete(&mut state).await.unwrap();
        assert_eq!(h.repo.list_all().await.unwrap().len(), 1);

        ui.request_delete(&mut state, &r.id).await.unwrap();
        let view = ui.confirm_delete(&mut state).await.unwrap();
        assert!(view.empty);
        assert_eq!(view.confirm_delete, None);
        assert!(!h.timers.is_armed(&r.id));
    }

    #[tokio::test]
    async fn test_bulk_delete_selected() {
        let h = Harness::new();
        let ui = PopupController::new(h.repo.clone());
        let mut state = ViewState::default();
        let a = create(&h, &ui, &mut state, "A", 10).await;
        let b = create(&h, &ui, &mut state, "B", 10).await;
        let c = create(&h, &ui, &mut state, "C", 10).await;

        ui.toggle_selected(&mut state, &a.id).await.unwrap();
        let view = ui.toggle_selected(&mut state, &c.id).await.unwrap();
        assert_eq!(view.selection_count, 2);

        let view = ui.request_delete_selected(&mut state).await.unwrap();
        assert_eq!(view.confirm_delete, Some(2));
        let view = ui.confirm_delete(&mut state).await.unwrap();
        assert_eq!(view.cards.len(), 1);
        assert_eq!(view.cards[0].id, b.id);
        assert_eq!(view.selection_count, 0);
        assert!(state.selected.is_empty());
        assert_eq!(h.timers.armed().len(), 1);
    }

    #[tokio::test]
    async fn test_confirmed_delete_selected() {
        let h = Harness::new();
        let ui = PopupController::new(h.repo.clone());
        let mut state = ViewState::default();
        let a = create(&h, &ui, &mut state, "A", 10).await;
        let b = create(&h, &ui, &mut state, "B", 10).await;

        ui.toggle_selected(&mut state, &b.id).await.unwrap();
        let view = ui.delete_selected(&mut state).await.unwrap();
        assert_eq!(view.cards.len(), 1);
        assert_eq!(view.cards[0].id, a.id);
        assert_eq!(view.confirm_delete, None);
        assert!(!h.timers.is_armed(&b.id));
    }

    #[tokio::test]
    async fn test_drag_reorder_persists() {
        let h = Harness::new();
        let ui = PopupController::new(h.repo.clone());
        let mut state = ViewState::default();
        let a = create(&h, &ui, &mut state, "A", 10).await;
        let b = create(&h, &ui, &mut state, "B", 10).await;
        let c = create(&h, &ui, &mut state, "C", 10).await;

        ui.begin_drag(&mut state, &c.id);
        assert!(ui.render(&mut state).await.unwrap().cards[2].dragging);
        let view = ui.drop_at(&mut state, 0).await.unwrap();
        assert!(state.drag.is_none());

        let order: Vec<&str> = view.cards.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(order, vec!["C", "A", "B"]);
        let stored: Vec<String> = h.repo.list_all().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(stored, vec![c.id.clone(), a.id.clone(), b.id.clone()]);

        // past the end lands last
        ui.move_item(&mut state, &c.id, 99).await.unwrap();
        let last = h.repo.list_all().await.unwrap().pop().unwrap();
        assert_eq!(last.id, c.id);
    }

    #[tokio::test]
    async fn test_timer_invariant_after_every_action() {
        let h = Harness::new();
        let ui = PopupController::new(h.repo.clone());
        let mut state = ViewState::default();
        let a = create(&h, &ui, &mut state, "A", 10).await;
        let b = create(&h, &ui, &mut state, "B", 20).await;

        ui.toggle_enabled(&mut state, &a.id).await.unwrap();
        h.assert_timers_match_store().await;
        ui.set_completed(&mut state, &b.id, true).await.unwrap();
        h.assert_timers_match_store().await;
        ui.toggle_enabled(&mut state, &a.id).await.unwrap();
        h.assert_timers_match_store().await;
        ui.request_delete(&mut state, &a.id).await.unwrap();
        ui.confirm_delete(&mut state).await.unwrap();
        h.assert_timers_match_store().await;
    }
}
