use thiserror::Error;

/// Validation failures raised before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("event title must not be empty")]
    EmptyTitle,

    #[error("category name must not be empty")]
    EmptyCategoryName,

    #[error("invalid calendar date: '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("month index {0} out of range (0..=11)")]
    InvalidMonth(u32),

    #[error("year {0} outside the supported calendar range")]
    InvalidYear(i32),

    #[error("unknown color token '{0}'")]
    UnknownColor(String),
}
