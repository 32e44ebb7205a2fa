use core_events::OpId;
use core_model::ModelError;
use thiserror::Error;

/// Reasons a mutation is refused before anything local changes.
///
/// Remote failures never show up here; they land in the pending-operation
/// ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error("no signed-in user")]
    NoIdentity,

    #[error(transparent)]
    Validation(#[from] ModelError),

    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    #[error("unknown event '{0}'")]
    UnknownEvent(String),

    /// The category is still being created; its id is not usable remotely yet.
    #[error("category '{0}' is still being saved")]
    CategoryPending(String),

    #[error("no pending operation {0}")]
    UnknownOp(OpId),

    #[error("operation {0} is still in flight")]
    OpInFlight(OpId),
}

pub type MutationResult<T> = Result<T, MutationError>;
