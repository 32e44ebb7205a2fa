//! Persistence completions delivered back to the event loop.
//!
//! Remote errors travel as rendered strings: the loop only logs them and
//! stores them on the failed ledger entry, it never branches on the variant.

use core_model::{CalendarEvent, Category, CategoryId, EventId};
use std::fmt;

/// Identifier of one remote write tracked by the pending-operation ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpId(pub u64);

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

/// Authoritative contents of one year as read from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedYear {
    pub categories: Vec<Category>,
    pub events: Vec<CalendarEvent>,
}

#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A reconciling refetch finished. `generation` identifies the request so
    /// superseded fetches can be discarded.
    Fetched {
        generation: u64,
        year: i32,
        result: Result<FetchedYear, String>,
    },
    /// Insert of an optimistically created event finished.
    EventCreated {
        op: OpId,
        temp_id: EventId,
        result: Result<CalendarEvent, String>,
    },
    /// Insert of an optimistically created category finished.
    CategoryCreated {
        op: OpId,
        temp_id: CategoryId,
        result: Result<Category, String>,
    },
    /// Update or delete finished.
    Written { op: OpId, result: Result<(), String> },
}

impl SyncEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            SyncEvent::Fetched { .. } => "fetched",
            SyncEvent::EventCreated { .. } => "event_created",
            SyncEvent::CategoryCreated { .. } => "category_created",
            SyncEvent::Written { .. } => "written",
        }
    }

    pub fn is_failure(&self) -> bool {
        match self {
            SyncEvent::Fetched { result, .. } => result.is_err(),
            SyncEvent::EventCreated { result, .. } => result.is_err(),
            SyncEvent::CategoryCreated { result, .. } => result.is_err(),
            SyncEvent::Written { result, .. } => result.is_err(),
        }
    }
}
