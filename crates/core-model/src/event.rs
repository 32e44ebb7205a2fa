use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{CategoryId, ColorToken, EventId, ModelError, ModelResult};

/// User-defined grouping with a palette color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub color: ColorToken,
}

impl Category {
    pub fn new(id: CategoryId, name: &str, color: ColorToken) -> ModelResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ModelError::EmptyCategoryName);
        }
        Ok(Self {
            id,
            name: name.to_string(),
            color,
        })
    }
}

/// A colored, categorized inclusive date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: EventId,
    pub title: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub category_id: CategoryId,
    pub description: Option<String>,
}

/// Clamp `end` so it is never before `start`.
pub fn clamp_end(start: NaiveDate, end: NaiveDate) -> NaiveDate {
    if end < start { start } else { end }
}

fn validate_title(title: &str) -> ModelResult<()> {
    if title.trim().is_empty() {
        Err(ModelError::EmptyTitle)
    } else {
        Ok(())
    }
}

impl CalendarEvent {
    /// Validating constructor. An `end` before `start` is clamped to `start`.
    pub fn new(
        id: EventId,
        title: &str,
        start: NaiveDate,
        end: NaiveDate,
        category_id: CategoryId,
    ) -> ModelResult<Self> {
        validate_title(title)?;
        Ok(Self {
            id,
            title: title.to_string(),
            start,
            end: clamp_end(start, end),
            category_id,
            description: None,
        })
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.trim().is_empty());
        self
    }
}

/// Partial update of an event. `None` leaves a field untouched; for
/// `description`, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub title: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub category_id: Option<CategoryId>,
    pub description: Option<Option<String>>,
}

impl EventPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn dates(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.start.is_none()
            && self.end.is_none()
            && self.category_id.is_none()
            && self.description.is_none()
    }

    /// Produce the patched event, validating the title and re-clamping the end
    /// date against the (possibly patched) start.
    pub fn apply(&self, event: &CalendarEvent) -> ModelResult<CalendarEvent> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        let mut next = event.clone();
        if let Some(title) = &self.title {
            next.title = title.clone();
        }
        if let Some(start) = self.start {
            next.start = start;
        }
        if let Some(end) = self.end {
            next.end = end;
        }
        next.end = clamp_end(next.start, next.end);
        if let Some(category_id) = &self.category_id {
            next.category_id = category_id.clone();
        }
        if let Some(description) = &self.description {
            next.description = description.clone();
        }
        Ok(next)
    }

    /// Patch carrying only the fields in which `after` differs from `before`.
    pub fn diff(before: &CalendarEvent, after: &CalendarEvent) -> Self {
        Self {
            title: (before.title != after.title).then(|| after.title.clone()),
            start: (before.start != after.start).then_some(after.start),
            end: (before.end != after.end).then_some(after.end),
            category_id: (before.category_id != after.category_id)
                .then(|| after.category_id.clone()),
            description: (before.description != after.description)
                .then(|| after.description.clone()),
        }
    }
}
