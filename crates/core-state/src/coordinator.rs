use chrono::NaiveDate;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::Sender;
use tracing::{Instrument, debug, info, info_span, warn};

use core_events::{Event, FetchedYear, OpId, SYNC_EVENTS_SENT, SyncEvent, deliver};
use core_model::{
    CalendarEvent, Category, CategoryId, ColorToken, EventId, EventPatch, YearSnapshot,
    overlaps_year, year_bounds,
};
use core_store::{
    DayRange, EventUpdate, Identity, IdentityProvider, NewCategory, NewEvent, RemoteStore,
    StoreError, StoreResult,
};

use crate::ledger::{PendingLedger, PendingOp, PendingWrite};
use crate::notice::{NOTICE_TTL, NoticeBoard};
use crate::{MutationError, MutationResult};

/// Owns the year snapshot and every write made against it.
///
/// Mutations validate, apply locally, record a ledger entry and spawn the
/// remote call. Completions come back as [`SyncEvent`]s on the host channel
/// and are folded in by [`Coordinator::apply_sync`].
pub struct Coordinator {
    snapshot: YearSnapshot,
    loading: bool,
    generation: u64,
    ledger: PendingLedger,
    identity: Arc<dyn IdentityProvider>,
    persistence: Persistence,
    notices: NoticeBoard,
}

impl Coordinator {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        identity: Arc<dyn IdentityProvider>,
        tx: Sender<Event>,
        year: i32,
    ) -> Self {
        Self {
            snapshot: YearSnapshot::new(year),
            loading: false,
            generation: 0,
            ledger: PendingLedger::new(),
            identity,
            persistence: Persistence {
                store,
                tx,
                user_ensured: Arc::new(AtomicBool::new(false)),
            },
            notices: NoticeBoard::default(),
        }
    }

    pub fn snapshot(&self) -> &YearSnapshot {
        &self.snapshot
    }

    pub fn year(&self) -> i32 {
        self.snapshot.year
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Generation of the most recently launched fetch.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ledger(&self) -> &PendingLedger {
        &self.ledger
    }

    pub fn notice(&self) -> Option<&str> {
        self.notices.text()
    }

    pub fn notify(&mut self, text: impl Into<String>) {
        self.notices.set(text, NOTICE_TTL);
    }

    /// Expire the current notice. Returns true if something changed.
    pub fn tick(&mut self) -> bool {
        self.notices.tick()
    }

    fn who(&self) -> MutationResult<Identity> {
        self.identity.current().ok_or(MutationError::NoIdentity)
    }

    /// Switch years and reconcile against the store.
    pub fn set_year(&mut self, year: i32) -> MutationResult<()> {
        let who = self.who()?;
        year_bounds(year)?;
        if year != self.snapshot.year {
            info!(target: "state.sync", from = self.snapshot.year, to = year, "year_changed");
        }
        self.snapshot.set_year(year);
        self.launch_fetch(who);
        Ok(())
    }

    /// Reconciling refetch of the current year.
    pub fn refresh(&mut self) -> MutationResult<()> {
        let who = self.who()?;
        self.launch_fetch(who);
        Ok(())
    }

    fn launch_fetch(&mut self, who: Identity) {
        self.generation += 1;
        self.loading = true;
        debug!(target: "state.sync", generation = self.generation, year = self.snapshot.year, "fetch_launched");
        self.persistence
            .fetch(self.generation, self.snapshot.year, who);
    }

    fn require_usable_category(&self, id: &CategoryId) -> MutationResult<()> {
        if self.snapshot.category(id).is_none() {
            return Err(MutationError::UnknownCategory(id.to_string()));
        }
        if id.is_temporary() {
            return Err(MutationError::CategoryPending(id.to_string()));
        }
        Ok(())
    }

    fn begin(&mut self, write: PendingWrite, who: Identity) -> OpId {
        let op = self.ledger.begin(write);
        if let Some(pending) = self.ledger.get(op) {
            self.persistence.write(op, &pending.write, who);
        }
        op
    }

    /// Optimistically add an event under a temporary id. An `end` before
    /// `start` is clamped to `start`.
    pub fn create_event(
        &mut self,
        title: &str,
        start: NaiveDate,
        end: NaiveDate,
        category_id: &CategoryId,
    ) -> MutationResult<EventId> {
        let who = self.who()?;
        let event = CalendarEvent::new(
            EventId::temporary(),
            title,
            start,
            end,
            category_id.clone(),
        )?;
        self.require_usable_category(category_id)?;
        let id = event.id.clone();
        info!(
            target: "state.mutation",
            temp = %id,
            start = %event.start,
            end = %event.end,
            category = %category_id,
            title_len = event.title.len(),
            "create_event"
        );
        let write = PendingWrite::CreateEvent {
            event,
            cancelled: false,
        };
        write.apply(&mut self.snapshot);
        self.begin(write, who);
        Ok(id)
    }

    /// Apply a partial update locally, then send only the changed fields.
    ///
    /// Edits to an event whose insert is still in flight stay local; the
    /// difference is sent once the store has assigned the real id.
    pub fn update_event(&mut self, id: &EventId, patch: EventPatch) -> MutationResult<()> {
        let who = self.who()?;
        let before = self
            .snapshot
            .event(id)
            .cloned()
            .ok_or_else(|| MutationError::UnknownEvent(id.to_string()))?;
        if let Some(category_id) = &patch.category_id {
            self.require_usable_category(category_id)?;
        }
        let after = patch.apply(&before)?;
        if after == before {
            debug!(target: "state.mutation", event = %id, "update_noop");
            return Ok(());
        }
        if overlaps_year(&after, self.snapshot.year) {
            self.snapshot.replace_event(id, after.clone());
        } else {
            self.snapshot.remove_event(id);
            debug!(target: "state.mutation", event = %id, year = self.snapshot.year, "event_left_year");
        }
        if id.is_temporary() {
            if let Some(PendingWrite::CreateEvent { event, .. }) =
                self.ledger.pending_event_create_mut(id)
            {
                *event = after;
            }
            debug!(target: "state.mutation", event = %id, "update_deferred_until_created");
            return Ok(());
        }
        info!(target: "state.mutation", event = %id, "update_event");
        self.begin(PendingWrite::UpdateEvent { before, after }, who);
        Ok(())
    }

    pub fn delete_event(&mut self, id: &EventId) -> MutationResult<()> {
        let who = self.who()?;
        let (index, event) = self
            .snapshot
            .remove_event(id)
            .ok_or_else(|| MutationError::UnknownEvent(id.to_string()))?;
        info!(target: "state.mutation", event = %id, "delete_event");
        if id.is_temporary() {
            self.cancel_event_create(id);
            return Ok(());
        }
        self.begin(PendingWrite::DeleteEvent { event, index }, who);
        Ok(())
    }

    fn cancel_event_create(&mut self, id: &EventId) {
        if let Some(PendingWrite::CreateEvent { cancelled, .. }) =
            self.ledger.pending_event_create_mut(id)
        {
            *cancelled = true;
            debug!(target: "state.mutation", event = %id, "pending_create_cancelled");
        }
    }

    pub fn create_category(&mut self, name: &str, color: ColorToken) -> MutationResult<CategoryId> {
        let who = self.who()?;
        let category = Category::new(CategoryId::temporary(), name, color)?;
        let id = category.id.clone();
        info!(target: "state.mutation", temp = %id, color = color.as_str(), "create_category");
        let write = PendingWrite::CreateCategory {
            category,
            cancelled: false,
        };
        write.apply(&mut self.snapshot);
        self.begin(write, who);
        Ok(id)
    }

    /// Remove a category and, locally only, every event referencing it.
    pub fn delete_category(&mut self, id: &CategoryId) -> MutationResult<()> {
        let who = self.who()?;
        let (index, category) = self
            .snapshot
            .remove_category(id)
            .ok_or_else(|| MutationError::UnknownCategory(id.to_string()))?;
        let cascade = self.snapshot.remove_events_for_category(id);
        info!(target: "state.mutation", category = %id, cascade = cascade.len(), "delete_category");
        let (unsaved, events): (Vec<_>, Vec<_>) =
            cascade.into_iter().partition(|e| e.id.is_temporary());
        for event in &unsaved {
            self.cancel_event_create(&event.id);
        }
        if id.is_temporary() {
            if let Some(PendingWrite::CreateCategory { cancelled, .. }) =
                self.ledger.pending_category_create_mut(id)
            {
                *cancelled = true;
            }
            return Ok(());
        }
        self.begin(
            PendingWrite::DeleteCategory {
                category,
                index,
                events,
            },
            who,
        );
        Ok(())
    }

    /// Re-apply a failed write and launch it again.
    pub fn retry(&mut self, op: OpId) -> MutationResult<()> {
        let who = self.who()?;
        match self.ledger.get(op) {
            None => return Err(MutationError::UnknownOp(op)),
            Some(pending) if !pending.is_failed() => return Err(MutationError::OpInFlight(op)),
            Some(_) => {}
        }
        let Some(pending) = self.ledger.relaunch(op) else {
            return Err(MutationError::UnknownOp(op));
        };
        info!(target: "state.mutation", op = %op, kind = pending.write.kind(), attempts = pending.attempts, "retry");
        pending.write.apply(&mut self.snapshot);
        self.persistence.write(op, &pending.write, who);
        Ok(())
    }

    /// Retry every failed write. Returns how many were relaunched.
    pub fn retry_failed(&mut self) -> MutationResult<usize> {
        let failed: Vec<OpId> = self.ledger.failed_ops().map(|op| op.id).collect();
        for op in &failed {
            self.retry(*op)?;
        }
        Ok(failed.len())
    }

    /// Forget a failed write. Its rollback has already happened.
    pub fn dismiss(&mut self, op: OpId) -> MutationResult<()> {
        match self.ledger.get(op) {
            None => Err(MutationError::UnknownOp(op)),
            Some(pending) if !pending.is_failed() => Err(MutationError::OpInFlight(op)),
            Some(_) => {
                self.ledger.finish(op);
                info!(target: "state.mutation", op = %op, "dismissed");
                Ok(())
            }
        }
    }

    /// Fold one persistence completion into the snapshot.
    pub fn apply_sync(&mut self, event: SyncEvent) {
        debug!(target: "state.sync", kind = event.kind(), failure = event.is_failure(), "sync_event");
        match event {
            SyncEvent::Fetched {
                generation,
                year,
                result,
            } => self.apply_fetch(generation, year, result),
            SyncEvent::EventCreated {
                op,
                temp_id,
                result,
            } => self.apply_event_created(op, temp_id, result),
            SyncEvent::CategoryCreated {
                op,
                temp_id,
                result,
            } => self.apply_category_created(op, temp_id, result),
            SyncEvent::Written { op, result } => self.apply_written(op, result),
        }
    }

    fn apply_fetch(&mut self, generation: u64, year: i32, result: Result<FetchedYear, String>) {
        if generation != self.generation || year != self.snapshot.year {
            debug!(target: "state.sync", generation, current = self.generation, year, "stale_fetch_dropped");
            return;
        }
        self.loading = false;
        match result {
            Ok(fetched) => {
                self.snapshot.replace(fetched.categories, fetched.events);
                for write in self.ledger.in_flight_writes() {
                    write.apply(&mut self.snapshot);
                }
                info!(
                    target: "state.sync",
                    year,
                    categories = self.snapshot.categories().len(),
                    events = self.snapshot.events().len(),
                    in_flight = self.ledger.in_flight(),
                    "snapshot_reconciled"
                );
            }
            Err(error) => {
                warn!(target: "state.sync", year, %error, "fetch_failed");
                self.notices.set(format!("refresh failed: {error}"), NOTICE_TTL);
            }
        }
    }

    /// A write confirmed while a fetch is outstanding may be missing from
    /// that fetch, so supersede it.
    fn after_confirm(&mut self) {
        if self.loading
            && let Some(who) = self.identity.current()
        {
            self.launch_fetch(who);
        }
    }

    fn pending(&self, op: OpId) -> Option<PendingOp> {
        let pending = self.ledger.get(op).cloned();
        if pending.is_none() {
            debug!(target: "state.sync", op = %op, "completion_for_unknown_op");
        }
        pending
    }

    fn fail(&mut self, op: OpId, write: PendingWrite, error: String) {
        write.revert(&mut self.snapshot);
        warn!(target: "state.sync", op = %op, kind = write.kind(), %error, "write_failed_rolled_back");
        self.notices
            .set(format!("{} failed: {error}", write.kind().replace('_', " ")), NOTICE_TTL);
        self.ledger.fail(op, write, error);
    }

    fn apply_event_created(
        &mut self,
        op: OpId,
        temp_id: EventId,
        result: Result<CalendarEvent, String>,
    ) {
        let Some(pending) = self.pending(op) else {
            return;
        };
        let PendingWrite::CreateEvent { event: payload, cancelled } = pending.write else {
            warn!(target: "state.sync", op = %op, "completion_kind_mismatch");
            return;
        };
        match result {
            Ok(created) => {
                self.ledger.finish(op);
                if cancelled {
                    info!(target: "state.sync", op = %op, id = %created.id, "cancelled_create_confirmed");
                    if let Some(who) = self.identity.current() {
                        let index = self.snapshot.events().len();
                        self.begin(PendingWrite::DeleteEvent { event: created, index }, who);
                    }
                } else {
                    let local = self.snapshot.event(&temp_id).cloned().unwrap_or(payload);
                    let spliced = CalendarEvent {
                        id: created.id.clone(),
                        ..local
                    };
                    let year = self.snapshot.year;
                    if let Some(fetched) = self.snapshot.event(&created.id).cloned() {
                        // A fetch already delivered the stored row: keep it and
                        // carry the local edits over.
                        self.snapshot.remove_event(&temp_id);
                        let merged = EventPatch::diff(&created, &spliced)
                            .apply(&fetched)
                            .unwrap_or_else(|_| spliced.clone());
                        if overlaps_year(&merged, year) {
                            self.snapshot.replace_event(&created.id, merged);
                        } else {
                            self.snapshot.remove_event(&created.id);
                        }
                        info!(target: "state.sync", op = %op, temp = %temp_id, id = %created.id, "event_merged_into_fetched");
                    } else {
                        if self
                            .snapshot
                            .replace_event(&temp_id, spliced.clone())
                            .is_none()
                            && overlaps_year(&spliced, year)
                        {
                            self.snapshot.push_event(spliced.clone());
                        }
                        info!(target: "state.sync", op = %op, temp = %temp_id, id = %created.id, "event_id_spliced");
                    }
                    if !EventPatch::diff(&created, &spliced).is_empty()
                        && let Some(who) = self.identity.current()
                    {
                        self.begin(
                            PendingWrite::UpdateEvent {
                                before: created,
                                after: spliced,
                            },
                            who,
                        );
                    }
                }
                self.after_confirm();
            }
            Err(error) if cancelled => {
                self.ledger.finish(op);
                debug!(target: "state.sync", op = %op, %error, "cancelled_create_failed");
            }
            Err(error) => {
                let event = self.snapshot.event(&temp_id).cloned().unwrap_or(payload);
                self.fail(
                    op,
                    PendingWrite::CreateEvent {
                        event,
                        cancelled: false,
                    },
                    error,
                );
            }
        }
    }

    fn apply_category_created(
        &mut self,
        op: OpId,
        temp_id: CategoryId,
        result: Result<Category, String>,
    ) {
        let Some(pending) = self.pending(op) else {
            return;
        };
        let PendingWrite::CreateCategory {
            category: payload,
            cancelled,
        } = pending.write
        else {
            warn!(target: "state.sync", op = %op, "completion_kind_mismatch");
            return;
        };
        match result {
            Ok(created) => {
                self.ledger.finish(op);
                if cancelled {
                    info!(target: "state.sync", op = %op, id = %created.id, "cancelled_create_confirmed");
                    if let Some(who) = self.identity.current() {
                        let index = self.snapshot.categories().len();
                        self.begin(
                            PendingWrite::DeleteCategory {
                                category: created,
                                index,
                                events: Vec::new(),
                            },
                            who,
                        );
                    }
                } else {
                    if self.snapshot.category(&created.id).is_some() {
                        self.snapshot.remove_category(&temp_id);
                        self.snapshot.rename_category(&temp_id, created.id.clone());
                        info!(target: "state.sync", op = %op, temp = %temp_id, id = %created.id, "category_merged_into_fetched");
                    } else if self.snapshot.category(&temp_id).is_some() {
                        self.snapshot.rename_category(&temp_id, created.id.clone());
                    } else {
                        self.snapshot.push_category(Category {
                            id: created.id.clone(),
                            ..payload
                        });
                    }
                    info!(target: "state.sync", op = %op, temp = %temp_id, id = %created.id, "category_id_spliced");
                }
                self.after_confirm();
            }
            Err(error) if cancelled => {
                self.ledger.finish(op);
                debug!(target: "state.sync", op = %op, %error, "cancelled_create_failed");
            }
            Err(error) => {
                self.fail(
                    op,
                    PendingWrite::CreateCategory {
                        category: payload,
                        cancelled: false,
                    },
                    error,
                );
            }
        }
    }

    fn apply_written(&mut self, op: OpId, result: Result<(), String>) {
        let Some(pending) = self.pending(op) else {
            return;
        };
        match result {
            Ok(()) => {
                self.ledger.finish(op);
                debug!(target: "state.sync", op = %op, kind = pending.write.kind(), "write_confirmed");
                self.after_confirm();
            }
            Err(error) => self.fail(op, pending.write, error),
        }
    }
}

/// Spawns store calls and reports their outcome on the host channel.
struct Persistence {
    store: Arc<dyn RemoteStore>,
    tx: Sender<Event>,
    user_ensured: Arc<AtomicBool>,
}

impl Persistence {
    fn spawn<F>(&self, kind: &'static str, task: F)
    where
        F: Future<Output = SyncEvent> + Send + 'static,
    {
        let tx = self.tx.clone();
        let span = info_span!(target: "state.sync", "store_call", kind, store = self.store.name());
        tokio::spawn(
            async move {
                let event = task.await;
                if deliver(&tx, Event::Sync(event)).await {
                    SYNC_EVENTS_SENT.fetch_add(1, Ordering::Relaxed);
                }
            }
            .instrument(span),
        );
    }

    fn fetch(&self, generation: u64, year: i32, who: Identity) {
        let store = Arc::clone(&self.store);
        self.spawn("fetch", async move {
            let result = fetch_year(store.as_ref(), &who, year)
                .await
                .map_err(|e| e.to_string());
            SyncEvent::Fetched {
                generation,
                year,
                result,
            }
        });
    }

    fn write(&self, op: OpId, write: &PendingWrite, who: Identity) {
        let store = Arc::clone(&self.store);
        match write {
            PendingWrite::CreateEvent { event, .. } => {
                let temp_id = event.id.clone();
                let new = NewEvent::from(event);
                let ensured = Arc::clone(&self.user_ensured);
                self.spawn(write.kind(), async move {
                    let result = insert_event(store.as_ref(), &who, &ensured, new)
                        .await
                        .map_err(|e| e.to_string());
                    SyncEvent::EventCreated {
                        op,
                        temp_id,
                        result,
                    }
                });
            }
            PendingWrite::UpdateEvent { before, after } => {
                let id = after.id.to_string();
                let update = EventUpdate::from(&EventPatch::diff(before, after));
                self.spawn(write.kind(), async move {
                    let result = store
                        .update_event(&who, &id, update)
                        .await
                        .map_err(|e| e.to_string());
                    SyncEvent::Written { op, result }
                });
            }
            PendingWrite::DeleteEvent { event, .. } => {
                let id = event.id.to_string();
                self.spawn(write.kind(), async move {
                    let result = idempotent(store.delete_event(&who, &id).await)
                        .map_err(|e| e.to_string());
                    SyncEvent::Written { op, result }
                });
            }
            PendingWrite::CreateCategory { category, .. } => {
                let temp_id = category.id.clone();
                let new = NewCategory::from(category);
                let ensured = Arc::clone(&self.user_ensured);
                self.spawn(write.kind(), async move {
                    let result = insert_category(store.as_ref(), &who, &ensured, new)
                        .await
                        .map_err(|e| e.to_string());
                    SyncEvent::CategoryCreated {
                        op,
                        temp_id,
                        result,
                    }
                });
            }
            PendingWrite::DeleteCategory { category, .. } => {
                let id = category.id.to_string();
                self.spawn(write.kind(), async move {
                    let result = idempotent(store.delete_category(&who, &id).await)
                        .map_err(|e| e.to_string());
                    SyncEvent::Written { op, result }
                });
            }
        }
    }
}

/// Deleting something already gone counts as done.
fn idempotent(result: StoreResult<()>) -> StoreResult<()> {
    match result {
        Err(StoreError::NotFound { .. }) => Ok(()),
        other => other,
    }
}

/// Insert the identity record once per session. A duplicate means another
/// call (or an earlier session) got there first.
async fn ensure_user(store: &dyn RemoteStore, who: &Identity, ensured: &AtomicBool) -> StoreResult<()> {
    if ensured.load(Ordering::Acquire) {
        return Ok(());
    }
    match store.ensure_user(who).await {
        Ok(()) => debug!(target: "state.sync", "user_record_created"),
        Err(e) if e.is_duplicate() => debug!(target: "state.sync", "user_record_exists"),
        Err(e) => return Err(e),
    }
    ensured.store(true, Ordering::Release);
    Ok(())
}

async fn insert_event(
    store: &dyn RemoteStore,
    who: &Identity,
    ensured: &AtomicBool,
    new: NewEvent,
) -> StoreResult<CalendarEvent> {
    ensure_user(store, who, ensured).await?;
    store.insert_event(who, new).await?.into_model()
}

async fn insert_category(
    store: &dyn RemoteStore,
    who: &Identity,
    ensured: &AtomicBool,
    new: NewCategory,
) -> StoreResult<Category> {
    ensure_user(store, who, ensured).await?;
    store.insert_category(who, new).await?.into_model()
}

/// Read one year. Rows that fail to convert are skipped so one bad record
/// does not blank the calendar.
async fn fetch_year(store: &dyn RemoteStore, who: &Identity, year: i32) -> StoreResult<FetchedYear> {
    let range = DayRange::year(year).map_err(|e| StoreError::Malformed(e.to_string()))?;
    let categories = store
        .list_categories(who)
        .await?
        .into_iter()
        .filter_map(|record| {
            let id = record.id.clone();
            record
                .into_model()
                .inspect_err(|e| warn!(target: "state.sync", record = %id, error = %e, "malformed_category_skipped"))
                .ok()
        })
        .collect();
    let events = store
        .list_events(who, range)
        .await?
        .into_iter()
        .filter_map(|record| {
            let id = record.id.clone();
            record
                .into_model()
                .inspect_err(|e| warn!(target: "state.sync", record = %id, error = %e, "malformed_event_skipped"))
                .ok()
        })
        .collect();
    Ok(FetchedYear { categories, events })
}
