use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::record::{CategoryRecord, DayRange, EventRecord, EventUpdate, NewCategory, NewEvent};
use crate::tables::Tables;
use crate::{Identity, RemoteStore, StoreError, StoreResult};

/// Process-local store. Supports failure injection so callers can exercise
/// rollback paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failure: Mutex<Option<String>>,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `Unavailable(message)`.
    pub fn fail_all(&self, message: impl Into<String>) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(message.into());
        }
    }

    pub fn heal(&self) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = None;
        }
    }

    /// Number of mutating calls received (including failed ones).
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    fn check_failure(&self) -> StoreResult<()> {
        let failure = self
            .failure
            .lock()
            .map_err(|_| StoreError::Unavailable("failure flag poisoned".into()))?;
        match failure.as_ref() {
            Some(message) => Err(StoreError::Unavailable(message.clone())),
            None => Ok(()),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> StoreResult<T> {
        self.check_failure()?;
        let tables = self
            .tables
            .lock()
            .map_err(|_| StoreError::Unavailable("tables poisoned".into()))?;
        Ok(f(&tables))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> StoreResult<T>) -> StoreResult<T> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.check_failure()?;
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| StoreError::Unavailable("tables poisoned".into()))?;
        f(&mut tables)
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ensure_user(&self, who: &Identity) -> StoreResult<()> {
        self.write(|t| t.insert_user(who))
    }

    async fn list_categories(&self, who: &Identity) -> StoreResult<Vec<CategoryRecord>> {
        self.read(|t| t.categories(who))
    }

    async fn list_events(&self, who: &Identity, range: DayRange) -> StoreResult<Vec<EventRecord>> {
        self.read(|t| t.events(who, &range))
    }

    async fn insert_category(&self, who: &Identity, new: NewCategory) -> StoreResult<CategoryRecord> {
        self.write(|t| t.insert_category(who, new))
    }

    async fn delete_category(&self, who: &Identity, id: &str) -> StoreResult<()> {
        self.write(|t| t.delete_category(who, id))
    }

    async fn insert_event(&self, who: &Identity, new: NewEvent) -> StoreResult<EventRecord> {
        self.write(|t| t.insert_event(who, new))
    }

    async fn update_event(&self, who: &Identity, id: &str, update: EventUpdate) -> StoreResult<()> {
        self.write(|t| t.update_event(who, id, &update))
    }

    async fn delete_event(&self, who: &Identity, id: &str) -> StoreResult<()> {
        self.write(|t| t.delete_event(who, id))
    }
}
