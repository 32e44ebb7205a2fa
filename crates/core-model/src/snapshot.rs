use std::collections::HashSet;

use crate::{CalendarEvent, Category, CategoryId, EventId, overlaps_year};

/// Materialized categories + events for one year.
///
/// Owned and mutated by the coordinator only; everyone else reads a clone or
/// a borrow taken after the latest mutation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct YearSnapshot {
    pub year: i32,
    categories: Vec<Category>,
    events: Vec<CalendarEvent>,
}

impl YearSnapshot {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            categories: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Build a snapshot from authoritative data. Duplicate category ids keep
    /// their first occurrence; events not touching `year` are dropped.
    pub fn from_parts(year: i32, categories: Vec<Category>, events: Vec<CalendarEvent>) -> Self {
        let mut snapshot = Self::new(year);
        snapshot.replace(categories, events);
        snapshot
    }

    /// Wholesale reconciliation: replace both collections.
    pub fn replace(&mut self, categories: Vec<Category>, events: Vec<CalendarEvent>) {
        let mut seen = HashSet::new();
        self.categories = categories
            .into_iter()
            .filter(|c| seen.insert(c.id.clone()))
            .collect();
        let year = self.year;
        self.events = events
            .into_iter()
            .filter(|e| overlaps_year(e, year))
            .collect();
    }

    /// Switch to another year, dropping events that do not touch it.
    pub fn set_year(&mut self, year: i32) {
        self.year = year;
        self.events.retain(|e| overlaps_year(e, year));
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    pub fn category(&self, id: &CategoryId) -> Option<&Category> {
        self.categories.iter().find(|c| &c.id == id)
    }

    pub fn event(&self, id: &EventId) -> Option<&CalendarEvent> {
        self.events.iter().find(|e| &e.id == id)
    }

    /// Append a category. Returns false (and leaves state unchanged) when the
    /// id is already present.
    pub fn push_category(&mut self, category: Category) -> bool {
        if self.category(&category.id).is_some() {
            return false;
        }
        self.categories.push(category);
        true
    }

    /// Re-insert a category at its former position (clamped to the end).
    pub fn insert_category_at(&mut self, index: usize, category: Category) {
        if self.category(&category.id).is_some() {
            return;
        }
        let index = index.min(self.categories.len());
        self.categories.insert(index, category);
    }

    pub fn remove_category(&mut self, id: &CategoryId) -> Option<(usize, Category)> {
        let index = self.categories.iter().position(|c| &c.id == id)?;
        Some((index, self.categories.remove(index)))
    }

    /// Drop every event referencing `id`, returning them in snapshot order.
    pub fn remove_events_for_category(&mut self, id: &CategoryId) -> Vec<CalendarEvent> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.events)
            .into_iter()
            .partition(|e| &e.category_id == id);
        self.events = kept;
        removed
    }

    /// Swap a category id everywhere (category list and event references).
    pub fn rename_category(&mut self, from: &CategoryId, to: CategoryId) {
        for category in self.categories.iter_mut().filter(|c| &c.id == from) {
            category.id = to.clone();
        }
        for event in self.events.iter_mut().filter(|e| &e.category_id == from) {
            event.category_id = to.clone();
        }
    }

    /// Append an event. Returns false when the id is already present.
    pub fn push_event(&mut self, event: CalendarEvent) -> bool {
        if self.event(&event.id).is_some() {
            return false;
        }
        self.events.push(event);
        true
    }

    pub fn insert_event_at(&mut self, index: usize, event: CalendarEvent) {
        if self.event(&event.id).is_some() {
            return;
        }
        let index = index.min(self.events.len());
        self.events.insert(index, event);
    }

    pub fn remove_event(&mut self, id: &EventId) -> Option<(usize, CalendarEvent)> {
        let index = self.events.iter().position(|e| &e.id == id)?;
        Some((index, self.events.remove(index)))
    }

    /// Replace the event stored under `id` (which may differ from
    /// `event.id` when splicing an authoritative id). Returns the old value.
    pub fn replace_event(&mut self, id: &EventId, event: CalendarEvent) -> Option<CalendarEvent> {
        let slot = self.events.iter_mut().find(|e| &e.id == id)?;
        Some(std::mem::replace(slot, event))
    }

    pub fn events_for_category<'a>(
        &'a self,
        id: &'a CategoryId,
    ) -> impl Iterator<Item = &'a CalendarEvent> + 'a {
        self.events.iter().filter(move |e| &e.category_id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ColorToken;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn cat(id: &str) -> Category {
        Category::new(CategoryId::from(id), id, ColorToken::Teal).unwrap()
    }

    fn ev(id: &str, cat: &str, start: NaiveDate, end: NaiveDate) -> CalendarEvent {
        CalendarEvent::new(EventId::from(id), id, start, end, CategoryId::from(cat)).unwrap()
    }

    #[test]
    fn replace_dedupes_categories_and_filters_year() {
        let snap = YearSnapshot::from_parts(
            2026,
            vec![cat("c1"), cat("c2"), cat("c1")],
            vec![
                ev("a", "c1", d(2026, 1, 1), d(2026, 1, 3)),
                ev("b", "c1", d(2025, 6, 1), d(2025, 6, 2)),
                ev("c", "c2", d(2025, 12, 31), d(2026, 1, 1)),
            ],
        );
        let cats: Vec<&str> = snap.categories().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(cats, ["c1", "c2"]);
        let evs: Vec<&str> = snap.events().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(evs, ["a", "c"]);
    }

    #[test]
    fn cascade_removal_returns_removed_events() {
        let mut snap = YearSnapshot::from_parts(
            2026,
            vec![cat("c1"), cat("c2")],
            vec![
                ev("a", "c1", d(2026, 1, 1), d(2026, 1, 1)),
                ev("b", "c2", d(2026, 1, 2), d(2026, 1, 2)),
                ev("c", "c1", d(2026, 1, 3), d(2026, 1, 3)),
            ],
        );
        let removed = snap.remove_events_for_category(&CategoryId::from("c1"));
        assert_eq!(removed.len(), 2);
        assert_eq!(snap.events().len(), 1);
        assert_eq!(snap.events_for_category(&CategoryId::from("c1")).count(), 0);
    }

    #[test]
    fn rename_category_rewrites_references() {
        let tmp = CategoryId::from("tmp-1");
        let mut snap = YearSnapshot::from_parts(
            2026,
            vec![cat("tmp-1")],
            vec![ev("a", "tmp-1", d(2026, 4, 1), d(2026, 4, 2))],
        );
        snap.rename_category(&tmp, CategoryId::from("real"));
        assert!(snap.category(&CategoryId::from("real")).is_some());
        assert_eq!(snap.events()[0].category_id, CategoryId::from("real"));
    }

    #[test]
    fn reinsertion_restores_position_and_ignores_duplicates() {
        let mut snap = YearSnapshot::new(2026);
        snap.push_event(ev("a", "c", d(2026, 1, 1), d(2026, 1, 1)));
        snap.push_event(ev("b", "c", d(2026, 1, 2), d(2026, 1, 2)));
        let (idx, removed) = snap.remove_event(&EventId::from("a")).unwrap();
        snap.insert_event_at(idx, removed.clone());
        snap.insert_event_at(0, removed);
        let evs: Vec<&str> = snap.events().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(evs, ["a", "b"]);
        assert!(!snap.push_event(ev("b", "c", d(2026, 1, 5), d(2026, 1, 5))));
    }
}
