//! Terminal geometry of the year grid and hit testing against it.
//!
//! Screen rows, top to bottom: title bar, day-number header, 12 month bands of
//! `cell_height` rows each, then the prompt line and the status line. Each
//! month band starts with a `label_width` column label followed by 31 day
//! cells of `cell_width` columns.

use core_events::{HitTest, PointerTarget};

use crate::partition::CellPartition;
use crate::year_layout::{GRID_COLUMNS, GridCell, YearLayout};

/// Rows above the grid (title bar and day-number header).
pub const HEADER_ROWS: u16 = 2;
/// Rows below the grid (prompt line and status line).
pub const FOOTER_ROWS: u16 = 2;
pub const LABEL_WIDTH: u16 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutRegion {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl LayoutRegion {
    pub fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, column: u16, row: u16) -> bool {
        column >= self.x
            && row >= self.y
            && u32::from(column) < u32::from(self.x) + u32::from(self.width)
            && u32::from(row) < u32::from(self.y) + u32::from(self.height)
    }
}

/// What a screen coordinate lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridSpot {
    Outside,
    Label { month: u32 },
    Cell { month: u32, slot: u32, local_x: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridGeometry {
    pub origin_x: u16,
    pub origin_y: u16,
    pub label_width: u16,
    pub cell_width: u16,
    pub cell_height: u16,
}

impl GridGeometry {
    /// Largest grid that fits a `width` x `height` terminal. Cells never
    /// shrink below one column / one row, so tiny terminals clip instead.
    pub fn fit(width: u16, height: u16) -> Self {
        let cell_width = (width.saturating_sub(LABEL_WIDTH) / GRID_COLUMNS as u16).max(1);
        let cell_height = (height.saturating_sub(HEADER_ROWS + FOOTER_ROWS) / 12).max(1);
        Self {
            origin_x: 0,
            origin_y: HEADER_ROWS,
            label_width: LABEL_WIDTH,
            cell_width,
            cell_height,
        }
    }

    pub fn grid_rect(&self) -> LayoutRegion {
        LayoutRegion::new(
            self.origin_x,
            self.origin_y,
            self.label_width
                .saturating_add(self.cell_width.saturating_mul(GRID_COLUMNS as u16)),
            self.cell_height.saturating_mul(12),
        )
    }

    /// Row of the first line after the grid.
    pub fn bottom(&self) -> u16 {
        let rect = self.grid_rect();
        rect.y.saturating_add(rect.height)
    }

    /// Screen rectangle of the zero-based `month` row / day `slot`.
    pub fn cell_rect(&self, month: u32, slot: u32) -> LayoutRegion {
        LayoutRegion::new(
            self.origin_x
                .saturating_add(self.label_width)
                .saturating_add(self.cell_width.saturating_mul(slot as u16)),
            self.origin_y
                .saturating_add(self.cell_height.saturating_mul(month as u16)),
            self.cell_width,
            self.cell_height,
        )
    }

    pub fn locate(&self, column: u16, row: u16) -> GridSpot {
        if !self.grid_rect().contains(column, row) {
            return GridSpot::Outside;
        }
        let month = u32::from((row - self.origin_y) / self.cell_height);
        let dx = column - self.origin_x;
        if dx < self.label_width {
            return GridSpot::Label { month };
        }
        let dx = dx - self.label_width;
        GridSpot::Cell {
            month,
            slot: u32::from(dx / self.cell_width),
            local_x: dx % self.cell_width,
        }
    }
}

/// Hit test over a built layout. Uses the same partition as the painter so a
/// segment is clickable exactly where it is drawn.
pub struct GridHitTest<'l, 'a> {
    pub geometry: GridGeometry,
    pub layout: &'l YearLayout<'a>,
    pub max_event_fraction: f32,
}

impl HitTest for GridHitTest<'_, '_> {
    fn hit(&self, column: u16, row: u16) -> PointerTarget {
        let (month, slot, local_x) = match self.geometry.locate(column, row) {
            GridSpot::Outside => return PointerTarget::Outside,
            GridSpot::Label { .. } => return PointerTarget::Blank,
            GridSpot::Cell {
                month,
                slot,
                local_x,
            } => (month, slot, local_x),
        };
        let Some(GridCell::Day(cell)) = self.layout.cell(month, slot) else {
            return PointerTarget::Blank;
        };
        let partition = CellPartition::compute(
            self.geometry.cell_width,
            cell.events.iter().map(|e| &e.id),
            self.max_event_fraction,
        );
        match partition.segment_at(local_x) {
            Some(event) => PointerTarget::Segment {
                event: event.clone(),
                day: cell.date,
            },
            None => PointerTarget::Day(cell.date),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::year_layout::LayoutContext;
    use chrono::NaiveDate;
    use core_model::{CalendarEvent, CategoryId, EventId, YearSnapshot};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    #[test]
    fn fit_uses_available_space() {
        let g = GridGeometry::fit(132, 40);
        assert_eq!(g.cell_width, 4);
        assert_eq!(g.cell_height, 3);
        assert_eq!(g.grid_rect(), LayoutRegion::new(0, 2, 128, 36));
        assert_eq!(g.bottom(), 38);
        let tiny = GridGeometry::fit(10, 5);
        assert_eq!((tiny.cell_width, tiny.cell_height), (1, 1));
    }

    #[test]
    fn locate_maps_label_cells_and_outside() {
        let g = GridGeometry::fit(128, 28);
        assert_eq!(g.locate(0, 0), GridSpot::Outside);
        assert_eq!(g.locate(2, 2), GridSpot::Label { month: 0 });
        assert_eq!(
            g.locate(4 + 4 * 5 + 2, 2 + 2 * 1),
            GridSpot::Cell {
                month: 1,
                slot: 5,
                local_x: 2
            }
        );
        assert_eq!(g.locate(200, 3), GridSpot::Outside);
    }

    #[test]
    fn hit_distinguishes_segment_free_area_and_placeholder() {
        let snap = YearSnapshot::from_parts(
            2026,
            Vec::new(),
            vec![
                CalendarEvent::new(
                    EventId::from("e1"),
                    "trip",
                    d(2, 5),
                    d(2, 8),
                    CategoryId::from("c1"),
                )
                .unwrap(),
            ],
        );
        let layout = YearLayout::build(&snap, LayoutContext::default()).unwrap();
        let geometry = GridGeometry::fit(128, 28);
        let hit = GridHitTest {
            geometry,
            layout: &layout,
            max_event_fraction: 0.75,
        };
        let cell = geometry.cell_rect(1, 5);
        assert_eq!(
            hit.hit(cell.x, cell.y),
            PointerTarget::Segment {
                event: EventId::from("e1"),
                day: d(2, 6)
            }
        );
        assert_eq!(hit.hit(cell.x + 3, cell.y), PointerTarget::Day(d(2, 6)));
        let placeholder = geometry.cell_rect(1, 29);
        assert_eq!(hit.hit(placeholder.x, placeholder.y), PointerTarget::Blank);
    }
}
