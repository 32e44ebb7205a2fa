//! Wire records exchanged with the store.
//!
//! Dates travel as calendar-only `YYYY-MM-DD` strings built from the local
//! calendar date, never from a timestamp.

use chrono::{DateTime, NaiveDate, Utc};
use core_model::{
    CalendarEvent, Category, CategoryId, ColorToken, EventId, EventPatch, ModelResult, format_day,
    parse_day, year_bounds,
};
use serde::{Deserialize, Serialize};

use crate::{StoreError, StoreResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl CategoryRecord {
    /// Unknown color names degrade to the fallback token.
    pub fn into_model(self) -> StoreResult<Category> {
        let color = self.color.parse::<ColorToken>().unwrap_or_else(|_| {
            tracing::warn!(target: "store", category = %self.id, "unknown_color_fallback");
            ColorToken::FALLBACK
        });
        Category::new(CategoryId::new(self.id), &self.name, color)
            .map_err(|e| StoreError::Malformed(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub user_id: String,
    pub category_id: String,
    pub title: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl EventRecord {
    pub fn into_model(self) -> StoreResult<CalendarEvent> {
        let malformed = |e: core_model::ModelError| StoreError::Malformed(e.to_string());
        let start = parse_day(&self.start_date).map_err(malformed)?;
        let end = parse_day(&self.end_date).map_err(malformed)?;
        let event = CalendarEvent::new(
            EventId::new(self.id),
            &self.title,
            start,
            end,
            CategoryId::new(self.category_id),
        )
        .map_err(malformed)?;
        Ok(event.with_description(self.description))
    }

    /// Inclusive overlap with `range`. Works on the string form because
    /// `YYYY-MM-DD` sorts chronologically.
    pub fn overlaps(&self, range: &DayRange) -> bool {
        self.start_date.as_str() <= range.last_str().as_str()
            && self.end_date.as_str() >= range.first_str().as_str()
    }
}

/// Payload of an event insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub category_id: String,
    pub title: String,
    pub start_date: String,
    pub end_date: String,
    pub description: Option<String>,
}

impl From<&CalendarEvent> for NewEvent {
    fn from(event: &CalendarEvent) -> Self {
        Self {
            category_id: event.category_id.to_string(),
            title: event.title.clone(),
            start_date: format_day(event.start),
            end_date: format_day(event.end),
            description: event.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub color: String,
}

impl From<&Category> for NewCategory {
    fn from(category: &Category) -> Self {
        Self {
            name: category.name.clone(),
            color: category.color.as_str().to_string(),
        }
    }
}

/// Partial update. Absent fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
}

impl EventUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.category_id.is_none()
            && self.description.is_none()
    }

    /// Apply onto a stored record.
    pub fn apply_to(&self, record: &mut EventRecord) {
        if let Some(title) = &self.title {
            record.title = title.clone();
        }
        if let Some(start) = &self.start_date {
            record.start_date = start.clone();
        }
        if let Some(end) = &self.end_date {
            record.end_date = end.clone();
        }
        if let Some(category_id) = &self.category_id {
            record.category_id = category_id.clone();
        }
        if let Some(description) = &self.description {
            record.description = description.clone();
        }
    }
}

impl From<&EventPatch> for EventUpdate {
    fn from(patch: &EventPatch) -> Self {
        Self {
            title: patch.title.clone(),
            start_date: patch.start.map(format_day),
            end_date: patch.end.map(format_day),
            category_id: patch.category_id.as_ref().map(ToString::to_string),
            description: patch.description.clone(),
        }
    }
}

/// Inclusive calendar-day window for reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    pub first: NaiveDate,
    pub last: NaiveDate,
}

impl DayRange {
    pub fn year(year: i32) -> ModelResult<Self> {
        let (first, last) = year_bounds(year)?;
        Ok(Self { first, last })
    }

    pub fn first_str(&self) -> String {
        format_day(self.first)
    }

    pub fn last_str(&self) -> String {
        format_day(self.last)
    }
}
