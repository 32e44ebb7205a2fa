//! Pointer vocabulary shared by the gesture machine and its hosts.
//!
//! A host resolves raw device input into [`PointerEvent`]s: which day cell or
//! event segment lies under the pointer, and whether the report came from the
//! grid's own handlers or from the document-level safety net.

use chrono::NaiveDate;
use core_model::EventId;

/// Pointer position in host units (pixels, or terminal cells for a TUI host).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerPos {
    pub x: f32,
    pub y: f32,
}

impl PointerPos {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: PointerPos) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// What lies under the pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerTarget {
    /// The free area of a day cell.
    Day(NaiveDate),
    /// An event segment drawn inside the cell for `day`.
    Segment { event: EventId, day: NaiveDate },
    /// Inside the grid but not on a day (placeholder cells, labels, gaps).
    Blank,
    /// Outside the grid.
    Outside,
}

impl PointerTarget {
    /// Day cell the target belongs to, if any.
    pub fn day(&self) -> Option<NaiveDate> {
        match self {
            PointerTarget::Day(day) | PointerTarget::Segment { day, .. } => Some(*day),
            PointerTarget::Blank | PointerTarget::Outside => None,
        }
    }
}

/// Where a release / leave was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerScope {
    /// A day cell's own handler.
    Cell,
    /// The grid container.
    Grid,
    /// Document-level listener, i.e. outside the grid's handlers.
    Document,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointerEvent {
    Down {
        target: PointerTarget,
        button: PointerButton,
        pos: PointerPos,
    },
    /// Pointer entered a day cell.
    Enter { day: NaiveDate },
    Up { pos: PointerPos, scope: PointerScope },
    Leave { scope: PointerScope },
}

/// Intents emitted by the gesture machine for the host's dialogs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Click on a single day.
    Day(NaiveDate),
    /// Drag across days; always `start <= end`.
    Range { start: NaiveDate, end: NaiveDate },
    /// Click on an event segment.
    Event(EventId),
}

/// Resolves terminal / surface coordinates to a pointer target.
pub trait HitTest {
    fn hit(&self, column: u16, row: u16) -> PointerTarget;
}

impl<F> HitTest for F
where
    F: Fn(u16, u16) -> PointerTarget,
{
    fn hit(&self, column: u16, row: u16) -> PointerTarget {
        self(column, row)
    }
}
