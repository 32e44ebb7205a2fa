//! Calendar domain model: categories, date-range events, and the per-year
//! snapshot every other crate reads.
//!
//! All dates are `chrono::NaiveDate` values. There is no time-of-day anywhere
//! in the model; callers holding a timestamp convert it with [`day_of`] (local
//! calendar day in the timestamp's own zone) before it reaches an event. This
//! keeps every coverage comparison a plain day comparison.
//!
//! Core invariants (must hold after every public constructor / mutator):
//! * `CalendarEvent::end >= CalendarEvent::start`.
//! * `CalendarEvent::title` is non-empty after trimming.
//! * `YearSnapshot::categories` ids are unique and keep creation order.
//!
//! A `CalendarEvent::category_id` may dangle transiently (category deleted
//! while the event is still cached); readers resolve colors with a fallback
//! instead of failing.

mod dates;
mod error;
mod event;
mod ids;
mod palette;
mod snapshot;

pub use dates::{
    covers_day, day_of, days_in_month, format_day, normalize_range, overlaps_year, parse_day,
    span_days, year_bounds,
};
pub use error::ModelError;
pub use event::{CalendarEvent, Category, EventPatch, clamp_end};
pub use ids::{CategoryId, EventId, TEMP_ID_PREFIX};
pub use palette::ColorToken;
pub use snapshot::YearSnapshot;

/// Day precision calendar date used throughout the workspace.
pub type Day = chrono::NaiveDate;

/// Result alias for model validation.
pub type ModelResult<T> = Result<T, ModelError>;
