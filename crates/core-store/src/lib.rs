//! Remote persistence boundary.
//!
//! The coordinator talks to the authoritative store only through
//! [`RemoteStore`]: collection reads (events filtered by an inclusive day
//! window and ordered by start date, categories ordered by creation),
//! insert-returning-record, partial update by id and delete by id. Every call
//! is scoped to the [`Identity`] obtained for that operation.
//!
//! Two implementations ship with the crate: [`MemoryStore`] (tests, demos,
//! failure injection) and [`JsonFileStore`] (a single JSON document on disk).

use async_trait::async_trait;

mod error;
mod identity;
mod json_file;
mod memory;
pub mod record;
mod tables;

pub use error::{StoreError, StoreResult};
pub use identity::{Identity, IdentityProvider, StaticIdentity};
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use record::{CategoryRecord, DayRange, EventRecord, EventUpdate, NewCategory, NewEvent};

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Stable identifier for logs.
    fn name(&self) -> &'static str;

    /// Insert the identity record. Returns [`StoreError::Duplicate`] when it
    /// already exists, which callers treat as success.
    async fn ensure_user(&self, who: &Identity) -> StoreResult<()>;

    async fn list_categories(&self, who: &Identity) -> StoreResult<Vec<CategoryRecord>>;

    async fn list_events(&self, who: &Identity, range: DayRange) -> StoreResult<Vec<EventRecord>>;

    async fn insert_category(&self, who: &Identity, new: NewCategory) -> StoreResult<CategoryRecord>;

    async fn delete_category(&self, who: &Identity, id: &str) -> StoreResult<()>;

    async fn insert_event(&self, who: &Identity, new: NewEvent) -> StoreResult<EventRecord>;

    async fn update_event(&self, who: &Identity, id: &str, update: EventUpdate) -> StoreResult<()>;

    async fn delete_event(&self, who: &Identity, id: &str) -> StoreResult<()>;
}
