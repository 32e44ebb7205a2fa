//! Mutation coordinator: the single owner of the in-memory year snapshot.
//!
//! Every user intent (create/update/delete of events and categories, year
//! changes) goes through [`Coordinator`]. Mutations are optimistic: they are
//! validated, applied to the snapshot immediately, and then persisted by a
//! spawned task. The coordinator never awaits; completions arrive later as
//! `core_events::SyncEvent`s on the host's event channel and are applied by
//! [`Coordinator::apply_sync`] on the same single logical thread.
//!
//! Pending-operation ledger:
//! - Each remote write is tracked by an `OpId` in [`PendingLedger`] together
//!   with the [`PendingWrite`] needed to revert or re-apply it.
//! - A failed write is rolled back and kept as `Failed` so the host can show
//!   it; `retry` re-applies and relaunches, `dismiss` forgets it.
//! - Confirmed writes leave the ledger.
//!
//! Reconciliation:
//! - A confirmed create splices the store-assigned id into the snapshot in
//!   place. Edits made to the temporary event meanwhile are then sent as a
//!   follow-up partial update.
//! - Refetches carry a generation number; only the latest generation for the
//!   current year is applied. In-flight writes are rebased on top of fetched
//!   data so optimistic state does not flicker away.
//!
//! Validation failures are returned as [`MutationError`] before anything
//! local changes. Remote failures never reach the caller as errors.

mod coordinator;
mod error;
pub mod ledger;
mod notice;

pub use coordinator::Coordinator;
pub use error::{MutationError, MutationResult};
pub use ledger::{FAILED_HISTORY_MAX, OpStatus, PendingLedger, PendingOp, PendingWrite};
pub use notice::{NOTICE_TTL, Notice, NoticeBoard};
