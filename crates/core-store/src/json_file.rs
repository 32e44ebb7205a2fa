use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::record::{CategoryRecord, DayRange, EventRecord, EventUpdate, NewCategory, NewEvent};
use crate::tables::Tables;
use crate::{Identity, RemoteStore, StoreResult};

/// Store persisted as one JSON document. Every successful write rewrites the
/// document through a sibling temp file and a rename, so a crash mid-write
/// leaves the previous version intact.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    tables: Mutex<Tables>,
}

impl JsonFileStore {
    /// Open `path`, starting empty when it does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let tables = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(target: "store", path = %path.display(), "store_file_created_on_first_write");
                Tables::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            tables: Mutex::new(tables),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, tables: &Tables) -> StoreResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(tables)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Apply `f` to a copy of the tables and commit it only if both `f` and
    /// the file write succeed.
    async fn write<T>(&self, f: impl FnOnce(&mut Tables) -> StoreResult<T>) -> StoreResult<T> {
        let mut tables = self.tables.lock().await;
        let mut next = tables.clone();
        let out = f(&mut next)?;
        self.persist(&next).await?;
        *tables = next;
        Ok(out)
    }
}

#[async_trait]
impl RemoteStore for JsonFileStore {
    fn name(&self) -> &'static str {
        "json_file"
    }

    async fn ensure_user(&self, who: &Identity) -> StoreResult<()> {
        self.write(|t| t.insert_user(who)).await
    }

    async fn list_categories(&self, who: &Identity) -> StoreResult<Vec<CategoryRecord>> {
        Ok(self.tables.lock().await.categories(who))
    }

    async fn list_events(&self, who: &Identity, range: DayRange) -> StoreResult<Vec<EventRecord>> {
        Ok(self.tables.lock().await.events(who, &range))
    }

    async fn insert_category(&self, who: &Identity, new: NewCategory) -> StoreResult<CategoryRecord> {
        self.write(|t| t.insert_category(who, new)).await
    }

    async fn delete_category(&self, who: &Identity, id: &str) -> StoreResult<()> {
        self.write(|t| t.delete_category(who, id)).await
    }

    async fn insert_event(&self, who: &Identity, new: NewEvent) -> StoreResult<EventRecord> {
        self.write(|t| t.insert_event(who, new)).await
    }

    async fn update_event(&self, who: &Identity, id: &str, update: EventUpdate) -> StoreResult<()> {
        self.write(|t| t.update_event(who, id, &update)).await
    }

    async fn delete_event(&self, who: &Identity, id: &str) -> StoreResult<()> {
        self.write(|t| t.delete_event(who, id)).await
    }
}
