//! Row storage shared by the in-memory and JSON-file stores.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::record::{CategoryRecord, DayRange, EventRecord, EventUpdate, NewCategory, NewEvent};
use crate::{Identity, StoreError, StoreResult};
use core_model::parse_day;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Tables {
    #[serde(default)]
    users: BTreeSet<String>,
    #[serde(default)]
    categories: Vec<CategoryRecord>,
    #[serde(default)]
    events: Vec<EventRecord>,
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl Tables {
    /// Insert the identity row; `Duplicate` when it already exists.
    pub(crate) fn insert_user(&mut self, who: &Identity) -> StoreResult<()> {
        if self.users.insert(who.user_id().to_string()) {
            Ok(())
        } else {
            Err(StoreError::Duplicate {
                table: "users",
                id: who.user_id().to_string(),
            })
        }
    }

    fn require_user(&self, who: &Identity) -> StoreResult<()> {
        if self.users.contains(who.user_id()) {
            Ok(())
        } else {
            Err(StoreError::Unauthenticated)
        }
    }

    /// Caller's categories, oldest first.
    pub(crate) fn categories(&self, who: &Identity) -> Vec<CategoryRecord> {
        let mut out: Vec<CategoryRecord> = self
            .categories
            .iter()
            .filter(|c| c.user_id == who.user_id())
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        out
    }

    /// Caller's events overlapping `range`, ordered by start date.
    pub(crate) fn events(&self, who: &Identity, range: &DayRange) -> Vec<EventRecord> {
        let mut out: Vec<EventRecord> = self
            .events
            .iter()
            .filter(|e| e.user_id == who.user_id() && e.overlaps(range))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.start_date.cmp(&b.start_date));
        out
    }

    pub(crate) fn insert_category(
        &mut self,
        who: &Identity,
        new: NewCategory,
    ) -> StoreResult<CategoryRecord> {
        self.require_user(who)?;
        let record = CategoryRecord {
            id: new_id(),
            user_id: who.user_id().to_string(),
            name: new.name,
            color: new.color,
            created_at: Utc::now(),
        };
        self.categories.push(record.clone());
        Ok(record)
    }

    /// Removes the category only. Events referencing it are left in place.
    pub(crate) fn delete_category(&mut self, who: &Identity, id: &str) -> StoreResult<()> {
        let before = self.categories.len();
        self.categories
            .retain(|c| !(c.id == id && c.user_id == who.user_id()));
        if self.categories.len() == before {
            return Err(StoreError::NotFound {
                table: "categories",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn require_category(&self, who: &Identity, id: &str) -> StoreResult<()> {
        if self
            .categories
            .iter()
            .any(|c| c.id == id && c.user_id == who.user_id())
        {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                table: "categories",
                id: id.to_string(),
            })
        }
    }

    pub(crate) fn insert_event(&mut self, who: &Identity, new: NewEvent) -> StoreResult<EventRecord> {
        self.require_user(who)?;
        self.require_category(who, &new.category_id)?;
        validate_dates(&new.start_date, &new.end_date)?;
        let record = EventRecord {
            id: new_id(),
            user_id: who.user_id().to_string(),
            category_id: new.category_id,
            title: new.title,
            start_date: new.start_date,
            end_date: new.end_date,
            description: new.description,
            created_at: Utc::now(),
        };
        self.events.push(record.clone());
        Ok(record)
    }

    pub(crate) fn update_event(
        &mut self,
        who: &Identity,
        id: &str,
        update: &EventUpdate,
    ) -> StoreResult<()> {
        if let Some(category_id) = &update.category_id {
            self.require_category(who, category_id)?;
        }
        let record = self
            .events
            .iter_mut()
            .find(|e| e.id == id && e.user_id == who.user_id())
            .ok_or_else(|| StoreError::NotFound {
                table: "events",
                id: id.to_string(),
            })?;
        let mut next = record.clone();
        update.apply_to(&mut next);
        validate_dates(&next.start_date, &next.end_date)?;
        *record = next;
        Ok(())
    }

    pub(crate) fn delete_event(&mut self, who: &Identity, id: &str) -> StoreResult<()> {
        let before = self.events.len();
        self.events
            .retain(|e| !(e.id == id && e.user_id == who.user_id()));
        if self.events.len() == before {
            return Err(StoreError::NotFound {
                table: "events",
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

fn validate_dates(start: &str, end: &str) -> StoreResult<()> {
    let start = parse_day(start).map_err(|e| StoreError::Malformed(e.to_string()))?;
    let end = parse_day(end).map_err(|e| StoreError::Malformed(e.to_string()))?;
    if end < start {
        return Err(StoreError::Malformed(format!(
            "end {end} before start {start}"
        )));
    }
    Ok(())
}
