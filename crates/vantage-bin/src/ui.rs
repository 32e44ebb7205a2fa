//! Keyboard prompts layered over the grid.
//!
//! The overlay never touches the snapshot. Each key yields a [`UiCommand`]
//! that the runtime hands to the coordinator, so every mutation still goes
//! through one place.

use chrono::NaiveDate;
use core_events::{KeyCode, KeyEvent, KeyModifiers, Selection};
use core_model::{CategoryId, ColorToken, EventId, YearSnapshot};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    None,
    NewEvent {
        start: NaiveDate,
        end: NaiveDate,
        title: String,
    },
    EventDetail {
        id: EventId,
    },
    Retitle {
        id: EventId,
        title: String,
    },
    NewCategory {
        name: String,
        color: ColorToken,
    },
    ConfirmDeleteCategory {
        id: CategoryId,
        name: String,
    },
}

impl Overlay {
    fn label(&self) -> &'static str {
        match self {
            Overlay::None => "none",
            Overlay::NewEvent { .. } => "new_event",
            Overlay::EventDetail { .. } => "event_detail",
            Overlay::Retitle { .. } => "retitle",
            Overlay::NewCategory { .. } => "new_category",
            Overlay::ConfirmDeleteCategory { .. } => "confirm_delete_category",
        }
    }
}

/// What the runtime should do after a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    /// Nothing changed.
    Ignore,
    /// Overlay changed; repaint.
    Redraw,
    CreateEvent {
        title: String,
        start: NaiveDate,
        end: NaiveDate,
        category: CategoryId,
    },
    RenameEvent {
        id: EventId,
        title: String,
    },
    DeleteEvent(EventId),
    CreateCategory {
        name: String,
        color: ColorToken,
    },
    DeleteCategory(CategoryId),
    ShiftYear(i32),
    RetryFailed,
    Quit,
}

#[derive(Debug)]
pub struct Ui {
    overlay: Overlay,
    /// Index into the snapshot's categories; new events land there.
    active_category: usize,
}

impl Default for Ui {
    fn default() -> Self {
        Self::new()
    }
}

impl Ui {
    pub fn new() -> Self {
        Self {
            overlay: Overlay::None,
            active_category: 0,
        }
    }

    /// A prompt is open; pointer gestures are ignored meanwhile.
    pub fn is_modal(&self) -> bool {
        self.overlay != Overlay::None
    }

    pub fn active_category<'s>(&self, snapshot: &'s YearSnapshot) -> Option<&'s core_model::Category> {
        let categories = snapshot.categories();
        if categories.is_empty() {
            return None;
        }
        categories.get(self.active_category.min(categories.len() - 1))
    }

    /// Open the prompt matching a completed gesture. Returns a notice when the
    /// selection cannot be acted on.
    pub fn open_for_selection(
        &mut self,
        selection: Selection,
        snapshot: &YearSnapshot,
    ) -> Option<&'static str> {
        let next = match selection {
            Selection::Day(day) => Overlay::NewEvent {
                start: day,
                end: day,
                title: String::new(),
            },
            Selection::Range { start, end } => Overlay::NewEvent {
                start,
                end,
                title: String::new(),
            },
            Selection::Event(id) => {
                if snapshot.event(&id).is_none() {
                    return Some("that event is gone");
                }
                Overlay::EventDetail { id }
            }
        };
        if matches!(next, Overlay::NewEvent { .. }) && snapshot.categories().is_empty() {
            return Some("add a category first (c)");
        }
        self.set(next);
        None
    }

    pub fn handle_key(&mut self, key: &KeyEvent, snapshot: &YearSnapshot) -> UiCommand {
        match std::mem::replace(&mut self.overlay, Overlay::None) {
            Overlay::None => self.idle_key(key, snapshot),
            Overlay::NewEvent { start, end, title } => self.new_event_key(key, snapshot, start, end, title),
            Overlay::EventDetail { id } => self.detail_key(key, snapshot, id),
            Overlay::Retitle { id, title } => self.retitle_key(key, id, title),
            Overlay::NewCategory { name, color } => self.new_category_key(key, name, color),
            Overlay::ConfirmDeleteCategory { id, .. } => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => UiCommand::DeleteCategory(id),
                _ => {
                    debug!(target: "runtime", "delete_category_declined");
                    UiCommand::Redraw
                }
            },
        }
    }

    /// The prompt row text, if a prompt is open.
    pub fn prompt_line(&self, snapshot: &YearSnapshot) -> Option<String> {
        let line = match &self.overlay {
            Overlay::None => return None,
            Overlay::NewEvent { start, end, title } => {
                let category = self
                    .active_category(snapshot)
                    .map(|c| c.name.as_str())
                    .unwrap_or("-");
                format!("New event {} [{category}] title: {title}_", range_text(*start, *end))
            }
            Overlay::EventDetail { id } => match snapshot.event(id) {
                Some(event) => {
                    let category = snapshot
                        .category(&event.category_id)
                        .map(|c| c.name.as_str())
                        .unwrap_or("?");
                    format!(
                        "{}  {}  {category}  (e rename, d delete, Esc close)",
                        event.title,
                        range_text(event.start, event.end)
                    )
                }
                None => "event removed (Esc close)".to_string(),
            },
            Overlay::Retitle { title, .. } => format!("Rename: {title}_"),
            Overlay::NewCategory { name, color } => {
                format!("New category [{}] name: {name}_", color.as_str())
            }
            Overlay::ConfirmDeleteCategory { name, .. } => {
                format!("Delete category '{name}' and its events? (y/n)")
            }
        };
        Some(line)
    }

    fn set(&mut self, overlay: Overlay) {
        if overlay.label() != self.overlay.label() {
            debug!(target: "runtime", from = self.overlay.label(), to = overlay.label(), "overlay");
        }
        self.overlay = overlay;
    }

    fn idle_key(&mut self, key: &KeyEvent, snapshot: &YearSnapshot) -> UiCommand {
        if key.mods.contains(KeyModifiers::CTRL) {
            return UiCommand::Ignore;
        }
        match key.code {
            KeyCode::Char('q') => UiCommand::Quit,
            KeyCode::Char('[') | KeyCode::Left => UiCommand::ShiftYear(-1),
            KeyCode::Char(']') | KeyCode::Right => UiCommand::ShiftYear(1),
            KeyCode::Char('r') => UiCommand::RetryFailed,
            KeyCode::Char('c') => {
                self.set(Overlay::NewCategory {
                    name: String::new(),
                    color: ColorToken::PALETTE[0],
                });
                UiCommand::Redraw
            }
            KeyCode::Char('x') => match self.active_category(snapshot) {
                Some(category) => {
                    let next = Overlay::ConfirmDeleteCategory {
                        id: category.id.clone(),
                        name: category.name.clone(),
                    };
                    self.set(next);
                    UiCommand::Redraw
                }
                None => UiCommand::Ignore,
            },
            KeyCode::Tab => self.cycle_category(snapshot),
            _ => UiCommand::Ignore,
        }
    }

    fn cycle_category(&mut self, snapshot: &YearSnapshot) -> UiCommand {
        let count = snapshot.categories().len();
        if count == 0 {
            return UiCommand::Ignore;
        }
        self.active_category = (self.active_category.min(count - 1) + 1) % count;
        UiCommand::Redraw
    }

    fn new_event_key(
        &mut self,
        key: &KeyEvent,
        snapshot: &YearSnapshot,
        start: NaiveDate,
        end: NaiveDate,
        mut title: String,
    ) -> UiCommand {
        match key.code {
            KeyCode::Esc => return UiCommand::Redraw,
            KeyCode::Enter => {
                if let Some(category) = self.active_category(snapshot) {
                    return UiCommand::CreateEvent {
                        title,
                        start,
                        end,
                        category: category.id.clone(),
                    };
                }
                return UiCommand::Redraw;
            }
            KeyCode::Tab => {
                self.cycle_category(snapshot);
            }
            _ => edit_text(&mut title, key),
        }
        self.overlay = Overlay::NewEvent { start, end, title };
        UiCommand::Redraw
    }

    fn detail_key(&mut self, key: &KeyEvent, snapshot: &YearSnapshot, id: EventId) -> UiCommand {
        match key.code {
            KeyCode::Char('d') => UiCommand::DeleteEvent(id),
            KeyCode::Char('e') => {
                let title = snapshot.event(&id).map(|e| e.title.clone()).unwrap_or_default();
                self.set(Overlay::Retitle { id, title });
                UiCommand::Redraw
            }
            KeyCode::Esc | KeyCode::Char('q') => UiCommand::Redraw,
            _ => {
                self.overlay = Overlay::EventDetail { id };
                UiCommand::Ignore
            }
        }
    }

    fn retitle_key(&mut self, key: &KeyEvent, id: EventId, mut title: String) -> UiCommand {
        match key.code {
            KeyCode::Esc => UiCommand::Redraw,
            KeyCode::Enter => UiCommand::RenameEvent { id, title },
            _ => {
                edit_text(&mut title, key);
                self.overlay = Overlay::Retitle { id, title };
                UiCommand::Redraw
            }
        }
    }

    fn new_category_key(&mut self, key: &KeyEvent, mut name: String, mut color: ColorToken) -> UiCommand {
        match key.code {
            KeyCode::Esc => return UiCommand::Redraw,
            KeyCode::Enter => return UiCommand::CreateCategory { name, color },
            KeyCode::Tab => color = color.next(),
            _ => edit_text(&mut name, key),
        }
        self.overlay = Overlay::NewCategory { name, color };
        UiCommand::Redraw
    }
}

fn edit_text(text: &mut String, key: &KeyEvent) {
    match key.code {
        KeyCode::Backspace => {
            text.pop();
        }
        KeyCode::Char(ch) if !key.mods.contains(KeyModifiers::CTRL) => text.push(ch),
        _ => {}
    }
}

fn range_text(start: NaiveDate, end: NaiveDate) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{start}..{end}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::{CalendarEvent, Category};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::plain(code)
    }

    fn typed(ui: &mut Ui, snapshot: &YearSnapshot, text: &str) {
        for ch in text.chars() {
            ui.handle_key(&key(KeyCode::Char(ch)), snapshot);
        }
    }

    fn snapshot() -> YearSnapshot {
        let work = Category::new(CategoryId::new("c1"), "work", ColorToken::Teal).unwrap();
        let home = Category::new(CategoryId::new("c2"), "home", ColorToken::Pink).unwrap();
        let ski = CalendarEvent::new(
            EventId::new("e1"),
            "Ski week",
            d(2, 5),
            d(2, 8),
            CategoryId::new("c1"),
        )
        .unwrap();
        YearSnapshot::from_parts(2026, vec![work, home], vec![ski])
    }

    #[test]
    fn drag_selection_prompts_for_a_title() {
        let snap = snapshot();
        let mut ui = Ui::new();
        let range = Selection::Range {
            start: d(3, 1),
            end: d(3, 4),
        };
        assert_eq!(ui.open_for_selection(range, &snap), None);
        typed(&mut ui, &snap, "Trip");
        assert_eq!(
            ui.prompt_line(&snap).as_deref(),
            Some("New event 2026-03-01..2026-03-04 [work] title: Trip_")
        );
        let cmd = ui.handle_key(&key(KeyCode::Enter), &snap);
        assert_eq!(
            cmd,
            UiCommand::CreateEvent {
                title: "Trip".into(),
                start: d(3, 1),
                end: d(3, 4),
                category: CategoryId::new("c1"),
            }
        );
        assert!(!ui.is_modal());
    }

    #[test]
    fn tab_in_title_prompt_switches_category() {
        let snap = snapshot();
        let mut ui = Ui::new();
        ui.open_for_selection(Selection::Day(d(4, 2)), &snap);
        ui.handle_key(&key(KeyCode::Tab), &snap);
        typed(&mut ui, &snap, "Yoga");
        ui.handle_key(&key(KeyCode::Backspace), &snap);
        match ui.handle_key(&key(KeyCode::Enter), &snap) {
            UiCommand::CreateEvent { title, category, .. } => {
                assert_eq!(title, "Yog");
                assert_eq!(category, CategoryId::new("c2"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn escape_abandons_the_prompt() {
        let snap = snapshot();
        let mut ui = Ui::new();
        ui.open_for_selection(Selection::Day(d(4, 2)), &snap);
        typed(&mut ui, &snap, "x");
        assert_eq!(ui.handle_key(&key(KeyCode::Esc), &snap), UiCommand::Redraw);
        assert!(!ui.is_modal());
    }

    #[test]
    fn day_selection_without_categories_is_refused() {
        let snap = YearSnapshot::new(2026);
        let mut ui = Ui::new();
        assert!(ui.open_for_selection(Selection::Day(d(1, 1)), &snap).is_some());
        assert!(!ui.is_modal());
    }

    #[test]
    fn event_detail_offers_delete_and_rename() {
        let snap = snapshot();
        let mut ui = Ui::new();
        ui.open_for_selection(Selection::Event(EventId::new("e1")), &snap);
        let line = ui.prompt_line(&snap).unwrap();
        assert!(line.starts_with("Ski week  2026-02-05..2026-02-08  work"));
        assert_eq!(ui.handle_key(&key(KeyCode::Char('z')), &snap), UiCommand::Ignore);
        assert!(ui.is_modal());

        ui.handle_key(&key(KeyCode::Char('e')), &snap);
        assert_eq!(ui.prompt_line(&snap).as_deref(), Some("Rename: Ski week_"));
        for _ in 0..4 {
            ui.handle_key(&key(KeyCode::Backspace), &snap);
        }
        typed(&mut ui, &snap, "trip");
        assert_eq!(
            ui.handle_key(&key(KeyCode::Enter), &snap),
            UiCommand::RenameEvent {
                id: EventId::new("e1"),
                title: "Ski trip".into()
            }
        );

        ui.open_for_selection(Selection::Event(EventId::new("e1")), &snap);
        assert_eq!(
            ui.handle_key(&key(KeyCode::Char('d')), &snap),
            UiCommand::DeleteEvent(EventId::new("e1"))
        );
    }

    #[test]
    fn missing_event_is_not_opened() {
        let snap = snapshot();
        let mut ui = Ui::new();
        assert!(
            ui.open_for_selection(Selection::Event(EventId::new("nope")), &snap)
                .is_some()
        );
        assert!(!ui.is_modal());
    }

    #[test]
    fn category_prompt_cycles_colors() {
        let snap = snapshot();
        let mut ui = Ui::new();
        assert_eq!(ui.handle_key(&key(KeyCode::Char('c')), &snap), UiCommand::Redraw);
        typed(&mut ui, &snap, "gym");
        ui.handle_key(&key(KeyCode::Tab), &snap);
        assert_eq!(
            ui.handle_key(&key(KeyCode::Enter), &snap),
            UiCommand::CreateCategory {
                name: "gym".into(),
                color: ColorToken::PALETTE[1],
            }
        );
    }

    #[test]
    fn deleting_a_category_needs_confirmation() {
        let snap = snapshot();
        let mut ui = Ui::new();
        ui.handle_key(&key(KeyCode::Tab), &snap);
        ui.handle_key(&key(KeyCode::Char('x')), &snap);
        assert_eq!(
            ui.prompt_line(&snap).as_deref(),
            Some("Delete category 'home' and its events? (y/n)")
        );
        assert_eq!(ui.handle_key(&key(KeyCode::Char('n')), &snap), UiCommand::Redraw);
        assert!(!ui.is_modal());

        ui.handle_key(&key(KeyCode::Char('x')), &snap);
        assert_eq!(
            ui.handle_key(&key(KeyCode::Char('y')), &snap),
            UiCommand::DeleteCategory(CategoryId::new("c2"))
        );
    }

    #[test]
    fn idle_keys_map_to_commands() {
        let snap = snapshot();
        let mut ui = Ui::new();
        assert_eq!(ui.handle_key(&key(KeyCode::Char('[')), &snap), UiCommand::ShiftYear(-1));
        assert_eq!(ui.handle_key(&key(KeyCode::Char(']')), &snap), UiCommand::ShiftYear(1));
        assert_eq!(ui.handle_key(&key(KeyCode::Char('r')), &snap), UiCommand::RetryFailed);
        assert_eq!(ui.handle_key(&key(KeyCode::Char('q')), &snap), UiCommand::Quit);
        assert_eq!(ui.handle_key(&key(KeyCode::Char('?')), &snap), UiCommand::Ignore);
    }

    #[test]
    fn active_category_survives_a_shrinking_snapshot() {
        let snap = snapshot();
        let mut ui = Ui::new();
        ui.handle_key(&key(KeyCode::Tab), &snap);
        let single = YearSnapshot::from_parts(2026, vec![snap.categories()[0].clone()], Vec::new());
        assert_eq!(ui.active_category(&single).map(|c| c.name.as_str()), Some("work"));
    }
}
