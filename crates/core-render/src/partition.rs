//! Division of one day cell between its covering events and a free region.
//!
//! Segments stack along the cell's columns in coverage order. They share a
//! primary region of at most `max_event_fraction` of the cell equally (the
//! remainder of an uneven split goes to the first segments). The trailing
//! empty region is never shorter than one column when the cell is at least
//! two columns wide, so a range drag can always start from any day.
//! Segments that do not fit get zero width and are counted in `hidden`.

use core_model::EventId;
use std::ops::Range;

/// Lower/upper bounds applied to the configured event fraction.
pub const MIN_EVENT_FRACTION: f32 = 0.1;
pub const MAX_EVENT_FRACTION: f32 = 0.95;
pub const DEFAULT_EVENT_FRACTION: f32 = 0.75;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub event: EventId,
    /// Cell-local column span.
    pub span: Range<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellPartition {
    pub segments: Vec<Segment>,
    pub empty: Range<u16>,
    pub hidden: usize,
}

impl CellPartition {
    pub fn compute<'a, I>(extent: u16, events: I, max_event_fraction: f32) -> Self
    where
        I: IntoIterator<Item = &'a EventId>,
    {
        let events: Vec<&EventId> = events.into_iter().collect();
        if events.is_empty() {
            return Self {
                segments: Vec::new(),
                empty: 0..extent,
                hidden: 0,
            };
        }
        let fraction = clamp_fraction(max_event_fraction);
        let primary = ((f32::from(extent) * fraction).floor() as u16).min(extent.saturating_sub(1));
        let visible = events.len().min(usize::from(primary));
        let (base, mut extra) = if visible == 0 {
            (0, 0)
        } else {
            let visible = visible as u16;
            (primary / visible, primary % visible)
        };

        let mut cursor = 0u16;
        let mut segments = Vec::with_capacity(events.len());
        for (idx, event) in events.iter().enumerate() {
            let width = if idx < visible {
                let bonus = u16::from(extra > 0);
                extra = extra.saturating_sub(1);
                base + bonus
            } else {
                0
            };
            segments.push(Segment {
                event: (*event).clone(),
                span: cursor..cursor + width,
            });
            cursor += width;
        }
        Self {
            segments,
            empty: cursor..extent,
            hidden: events.len() - visible,
        }
    }

    /// Event whose segment contains cell-local column `x`.
    pub fn segment_at(&self, x: u16) -> Option<&EventId> {
        self.segments
            .iter()
            .find(|s| s.span.contains(&x))
            .map(|s| &s.event)
    }
}

/// Clamp a configured fraction into the supported band. NaN maps to the default.
pub fn clamp_fraction(value: f32) -> f32 {
    if value.is_nan() {
        return DEFAULT_EVENT_FRACTION;
    }
    value.clamp(MIN_EVENT_FRACTION, MAX_EVENT_FRACTION)
}
