use core_events::OpId;
use core_model::{CalendarEvent, Category, CategoryId, EventId, EventPatch, YearSnapshot, overlaps_year};
use std::collections::BTreeMap;
use tracing::trace;

/// Maximum number of failed operations retained for retry. Oldest failures are
/// forgotten first.
pub const FAILED_HISTORY_MAX: usize = 64;

/// One optimistic change together with what is needed to undo or redo it
/// against a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingWrite {
    /// `event` carries the temporary id and the latest local field values.
    /// `cancelled` is set when the user deleted the event before the insert
    /// finished.
    CreateEvent { event: CalendarEvent, cancelled: bool },
    UpdateEvent { before: CalendarEvent, after: CalendarEvent },
    DeleteEvent { event: CalendarEvent, index: usize },
    CreateCategory { category: Category, cancelled: bool },
    /// `events` are the local cascade, restored on rollback. The store only
    /// receives the category delete.
    DeleteCategory {
        category: Category,
        index: usize,
        events: Vec<CalendarEvent>,
    },
}

impl PendingWrite {
    pub fn kind(&self) -> &'static str {
        match self {
            PendingWrite::CreateEvent { .. } => "create_event",
            PendingWrite::UpdateEvent { .. } => "update_event",
            PendingWrite::DeleteEvent { .. } => "delete_event",
            PendingWrite::CreateCategory { .. } => "create_category",
            PendingWrite::DeleteCategory { .. } => "delete_category",
        }
    }

    /// Apply the optimistic change. Used on first launch, on retry, and when
    /// rebasing in-flight writes onto a freshly fetched snapshot.
    pub fn apply(&self, snapshot: &mut YearSnapshot) {
        match self {
            PendingWrite::CreateEvent { event, cancelled } => {
                if !cancelled && overlaps_year(event, snapshot.year) {
                    snapshot.push_event(event.clone());
                }
            }
            PendingWrite::UpdateEvent { before, after } => {
                let year = snapshot.year;
                if let Some(current) = snapshot.event(&after.id).cloned() {
                    let next = EventPatch::diff(before, after)
                        .apply(&current)
                        .unwrap_or_else(|_| after.clone());
                    if overlaps_year(&next, year) {
                        snapshot.replace_event(&after.id, next);
                    } else {
                        snapshot.remove_event(&after.id);
                    }
                }
            }
            PendingWrite::DeleteEvent { event, .. } => {
                snapshot.remove_event(&event.id);
            }
            PendingWrite::CreateCategory { category, cancelled } => {
                if !cancelled {
                    snapshot.push_category(category.clone());
                }
            }
            PendingWrite::DeleteCategory { category, .. } => {
                snapshot.remove_category(&category.id);
                snapshot.remove_events_for_category(&category.id);
            }
        }
    }

    /// Undo the optimistic change after the store rejected it.
    pub fn revert(&self, snapshot: &mut YearSnapshot) {
        match self {
            PendingWrite::CreateEvent { event, .. } => {
                snapshot.remove_event(&event.id);
            }
            PendingWrite::UpdateEvent { before, after } => {
                // A later local edit wins over the rollback.
                let year = snapshot.year;
                match snapshot.event(&after.id).cloned() {
                    Some(current) if current == *after => {
                        snapshot.replace_event(&after.id, before.clone());
                    }
                    // The update had moved it out of the year.
                    None if !overlaps_year(after, year) && overlaps_year(before, year) => {
                        snapshot.push_event(before.clone());
                    }
                    _ => {
                        trace!(target: "state.ledger", event = %after.id, "revert_skipped_newer_local_edit");
                    }
                }
            }
            PendingWrite::DeleteEvent { event, index } => {
                if overlaps_year(event, snapshot.year) {
                    snapshot.insert_event_at(*index, event.clone());
                }
            }
            PendingWrite::CreateCategory { category, .. } => {
                snapshot.remove_category(&category.id);
                snapshot.remove_events_for_category(&category.id);
            }
            PendingWrite::DeleteCategory {
                category,
                index,
                events,
            } => {
                snapshot.insert_category_at(*index, category.clone());
                let year = snapshot.year;
                for event in events.iter().filter(|e| overlaps_year(e, year)) {
                    snapshot.push_event(event.clone());
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpStatus {
    InFlight,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOp {
    pub id: OpId,
    pub write: PendingWrite,
    pub status: OpStatus,
    /// Number of launches, including the first.
    pub attempts: u32,
}

impl PendingOp {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, OpStatus::Failed { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            OpStatus::Failed { error } => Some(error),
            OpStatus::InFlight => None,
        }
    }
}

/// Operation id → status for every remote write not yet confirmed.
///
/// Confirmed operations are removed. Failed ones stay (already rolled back)
/// until retried or dismissed.
#[derive(Debug, Default)]
pub struct PendingLedger {
    ops: BTreeMap<OpId, PendingOp>,
    next_id: u64,
}

impl PendingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly launched write.
    pub fn begin(&mut self, write: PendingWrite) -> OpId {
        self.next_id += 1;
        let id = OpId(self.next_id);
        trace!(target: "state.ledger", op = %id, kind = write.kind(), in_flight = self.in_flight() + 1, "op_begin");
        self.ops.insert(
            id,
            PendingOp {
                id,
                write,
                status: OpStatus::InFlight,
                attempts: 1,
            },
        );
        id
    }

    pub fn get(&self, id: OpId) -> Option<&PendingOp> {
        self.ops.get(&id)
    }

    /// Remove an operation, returning it. Used for confirmations, dismissals
    /// and cancelled creates.
    pub fn finish(&mut self, id: OpId) -> Option<PendingOp> {
        let op = self.ops.remove(&id);
        if let Some(op) = &op {
            trace!(target: "state.ledger", op = %id, kind = op.write.kind(), in_flight = self.in_flight(), "op_finished");
        }
        op
    }

    /// Mark an operation failed, replacing its write payload (the caller may
    /// have refreshed it) and keeping its attempt count. Trims the oldest
    /// failures beyond [`FAILED_HISTORY_MAX`].
    pub fn fail(&mut self, id: OpId, write: PendingWrite, error: String) {
        let attempts = self.ops.get(&id).map_or(1, |op| op.attempts);
        self.ops.insert(
            id,
            PendingOp {
                id,
                write,
                status: OpStatus::Failed { error },
                attempts,
            },
        );
        trace!(target: "state.ledger", op = %id, failed = self.failed(), "op_failed");
        while self.failed() > FAILED_HISTORY_MAX {
            let oldest = self.ops.values().find(|op| op.is_failed()).map(|op| op.id);
            match oldest {
                Some(oldest) => {
                    self.ops.remove(&oldest);
                    trace!(target: "state.ledger", op = %oldest, "failed_history_trimmed");
                }
                None => break,
            }
        }
    }

    /// Flip a failed operation back to in-flight for another attempt.
    pub fn relaunch(&mut self, id: OpId) -> Option<&PendingOp> {
        let op = self.ops.get_mut(&id)?;
        if !op.is_failed() {
            return None;
        }
        op.status = OpStatus::InFlight;
        op.attempts += 1;
        trace!(target: "state.ledger", op = %id, attempts = op.attempts, "op_relaunched");
        Some(op)
    }

    pub fn in_flight(&self) -> usize {
        self.ops.values().filter(|op| !op.is_failed()).count()
    }

    pub fn failed(&self) -> usize {
        self.ops.values().filter(|op| op.is_failed()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// All operations in launch order.
    pub fn iter(&self) -> impl Iterator<Item = &PendingOp> {
        self.ops.values()
    }

    pub fn failed_ops(&self) -> impl Iterator<Item = &PendingOp> {
        self.ops.values().filter(|op| op.is_failed())
    }

    /// In-flight writes in launch order, for rebasing onto fetched data.
    pub fn in_flight_writes(&self) -> impl Iterator<Item = &PendingWrite> {
        self.ops
            .values()
            .filter(|op| !op.is_failed())
            .map(|op| &op.write)
    }

    /// The in-flight insert of the temporary event `id`, if any.
    pub fn pending_event_create_mut(&mut self, id: &EventId) -> Option<&mut PendingWrite> {
        self.ops
            .values_mut()
            .filter(|op| !op.is_failed())
            .map(|op| &mut op.write)
            .find(|w| matches!(w, PendingWrite::CreateEvent { event, .. } if &event.id == id))
    }

    /// The in-flight insert of the temporary category `id`, if any.
    pub fn pending_category_create_mut(&mut self, id: &CategoryId) -> Option<&mut PendingWrite> {
        self.ops
            .values_mut()
            .filter(|op| !op.is_failed())
            .map(|op| &mut op.write)
            .find(|w| matches!(w, PendingWrite::CreateCategory { category, .. } if &category.id == id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_model::ColorToken;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    fn event(id: &str, cat: &str) -> CalendarEvent {
        CalendarEvent::new(EventId::from(id), "t", d(2, 5), d(2, 8), CategoryId::from(cat)).unwrap()
    }

    fn category(id: &str) -> Category {
        Category::new(CategoryId::from(id), id, ColorToken::Teal).unwrap()
    }

    #[test]
    fn create_apply_and_revert_are_inverse() {
        let mut snap = YearSnapshot::from_parts(2026, vec![category("c1")], vec![]);
        let write = PendingWrite::CreateEvent {
            event: event("tmp-1", "c1"),
            cancelled: false,
        };
        write.apply(&mut snap);
        assert_eq!(snap.events().len(), 1);
        write.revert(&mut snap);
        assert!(snap.events().is_empty());
    }

    #[test]
    fn cancelled_create_is_not_reapplied() {
        let mut snap = YearSnapshot::new(2026);
        PendingWrite::CreateEvent {
            event: event("tmp-1", "c1"),
            cancelled: true,
        }
        .apply(&mut snap);
        assert!(snap.events().is_empty());
    }

    #[test]
    fn delete_category_revert_restores_position_and_cascade() {
        let mut snap = YearSnapshot::from_parts(
            2026,
            vec![category("a"), category("b"), category("c")],
            vec![event("e1", "b"), event("e2", "a")],
        );
        let (index, removed) = snap.remove_category(&CategoryId::from("b")).unwrap();
        let cascade = snap.remove_events_for_category(&CategoryId::from("b"));
        let write = PendingWrite::DeleteCategory {
            category: removed,
            index,
            events: cascade,
        };
        write.revert(&mut snap);
        let ids: Vec<&str> = snap.categories().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert!(snap.event(&EventId::from("e1")).is_some());
    }

    #[test]
    fn delete_category_revert_skips_events_outside_the_year() {
        let mut snap = YearSnapshot::from_parts(2027, vec![category("a")], vec![]);
        let write = PendingWrite::DeleteCategory {
            category: category("b"),
            index: 1,
            events: vec![event("e1", "b")],
        };
        write.revert(&mut snap);
        assert!(snap.category(&CategoryId::from("b")).is_some());
        assert!(snap.events().is_empty());
    }

    #[test]
    fn update_revert_yields_to_newer_local_edit() {
        let before = event("e1", "c1");
        let after = EventPatch::title("x").apply(&before).unwrap();
        let newer = EventPatch::title("y").apply(&before).unwrap();
        let mut snap = YearSnapshot::from_parts(2026, vec![], vec![newer.clone()]);
        PendingWrite::UpdateEvent { before, after }.revert(&mut snap);
        assert_eq!(snap.event(&EventId::from("e1")), Some(&newer));
    }

    #[test]
    fn update_out_of_year_is_dropped_and_restored_on_revert() {
        let before = event("e1", "c1");
        let after = EventPatch::dates(
            NaiveDate::from_ymd_opt(2027, 1, 4).unwrap(),
            NaiveDate::from_ymd_opt(2027, 1, 5).unwrap(),
        )
        .apply(&before)
        .unwrap();
        let mut snap = YearSnapshot::from_parts(2026, vec![], vec![before.clone()]);
        let write = PendingWrite::UpdateEvent {
            before: before.clone(),
            after,
        };
        write.apply(&mut snap);
        assert!(snap.events().is_empty());
        write.revert(&mut snap);
        assert_eq!(snap.event(&EventId::from("e1")), Some(&before));
    }

    #[test]
    fn update_apply_rebases_only_changed_fields() {
        let before = event("e1", "c1");
        let after = EventPatch::title("renamed").apply(&before).unwrap();
        let fetched = EventPatch::dates(d(3, 1), d(3, 2)).apply(&before).unwrap();
        let mut snap = YearSnapshot::from_parts(2026, vec![], vec![fetched]);
        PendingWrite::UpdateEvent { before, after }.apply(&mut snap);
        let e = snap.event(&EventId::from("e1")).unwrap();
        assert_eq!(e.title, "renamed");
        assert_eq!((e.start, e.end), (d(3, 1), d(3, 2)));
    }

    #[test]
    fn ledger_tracks_status_counts() {
        let mut ledger = PendingLedger::new();
        let write = PendingWrite::DeleteEvent {
            event: event("e1", "c1"),
            index: 0,
        };
        let a = ledger.begin(write.clone());
        let b = ledger.begin(write.clone());
        assert_eq!((ledger.in_flight(), ledger.failed()), (2, 0));
        ledger.fail(a, write.clone(), "offline".into());
        assert_eq!((ledger.in_flight(), ledger.failed()), (1, 1));
        assert_eq!(ledger.get(a).and_then(PendingOp::error), Some("offline"));
        assert!(ledger.relaunch(b).is_none(), "in-flight ops cannot be relaunched");
        assert_eq!(ledger.relaunch(a).map(|op| op.attempts), Some(2));
        ledger.finish(a);
        ledger.finish(b);
        assert!(ledger.is_empty());
    }

    #[test]
    fn failed_history_is_bounded() {
        let mut ledger = PendingLedger::new();
        let write = PendingWrite::DeleteEvent {
            event: event("e1", "c1"),
            index: 0,
        };
        let first = ledger.begin(write.clone());
        ledger.fail(first, write.clone(), "x".into());
        for _ in 0..FAILED_HISTORY_MAX {
            let id = ledger.begin(write.clone());
            ledger.fail(id, write.clone(), "x".into());
        }
        assert_eq!(ledger.failed(), FAILED_HISTORY_MAX);
        assert!(ledger.get(first).is_none());
    }
}
