use core_model::{ColorToken, YearSnapshot};

use crate::geometry::{GridGeometry, LayoutRegion};
use crate::palette::{LABEL_FG, SELECTED_BG, WEEKEND_BG, terminal_color};
use crate::partition::CellPartition;
use crate::year_layout::{DayCell, GRID_COLUMNS, GridCell, YearLayout};
use crate::{Cell, CellFlags, Frame};

/// Paints a [`YearLayout`] into a [`Frame`].
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    pub max_event_fraction: f32,
    pub fallback_color: ColorToken,
}

impl Painter {
    pub fn new(max_event_fraction: f32, fallback_color: ColorToken) -> Self {
        Self {
            max_event_fraction,
            fallback_color,
        }
    }

    /// Draw the day-number header, month labels and every day cell.
    /// `snapshot` must be the snapshot `layout` was built from.
    pub fn compose(
        &self,
        frame: &mut Frame,
        geometry: &GridGeometry,
        layout: &YearLayout<'_>,
        snapshot: &YearSnapshot,
    ) {
        self.header(frame, geometry);
        for row in &layout.months {
            let band = geometry.cell_rect(row.month, 0);
            let has_today = row
                .cells
                .iter()
                .filter_map(GridCell::as_day)
                .any(|c| c.today);
            let flags = if has_today {
                CellFlags::BOLD
            } else {
                CellFlags::empty()
            };
            frame.put_str(
                geometry.origin_x,
                band.y,
                row.label,
                Cell::styled(' ', Some(LABEL_FG), None, flags),
            );
            for (slot, cell) in row.cells.iter().enumerate() {
                if let GridCell::Day(day) = cell {
                    let rect = geometry.cell_rect(row.month, slot as u32);
                    self.day(frame, rect, day, snapshot);
                }
            }
        }
    }

    fn header(&self, frame: &mut Frame, geometry: &GridGeometry) {
        let Some(y) = geometry.origin_y.checked_sub(1) else {
            return;
        };
        let width = usize::from(geometry.cell_width);
        let style = Cell::styled(' ', Some(LABEL_FG), None, CellFlags::DIM);
        for slot in 0..GRID_COLUMNS {
            let number = (slot + 1).to_string();
            let shown = &number[number.len().saturating_sub(width)..];
            let rect = geometry.cell_rect(0, slot);
            frame.put_str(rect.x, y, shown, style);
        }
    }

    fn day(&self, frame: &mut Frame, rect: LayoutRegion, day: &DayCell<'_>, snapshot: &YearSnapshot) {
        let base_bg = if day.selected {
            Some(SELECTED_BG)
        } else if day.weekend {
            Some(WEEKEND_BG)
        } else {
            None
        };
        frame.fill(rect, Cell::styled(' ', None, base_bg, CellFlags::empty()));

        let partition = CellPartition::compute(
            rect.width,
            day.events.iter().map(|e| &e.id),
            self.max_event_fraction,
        );
        for (segment, event) in partition.segments.iter().zip(&day.events) {
            if segment.span.is_empty() {
                continue;
            }
            let color = crate::color_of(snapshot, &event.category_id, self.fallback_color);
            frame.fill(
                LayoutRegion::new(
                    rect.x + segment.span.start,
                    rect.y,
                    segment.span.end - segment.span.start,
                    rect.height,
                ),
                Cell::styled(' ', None, Some(terminal_color(color)), CellFlags::empty()),
            );
        }
        if partition.hidden > 0 && !partition.empty.is_empty() {
            frame.set(
                rect.x + partition.empty.start,
                rect.y,
                Cell::styled('+', Some(LABEL_FG), base_bg, CellFlags::BOLD),
            );
        }
        if day.today {
            let bottom = rect.y + rect.height.saturating_sub(1);
            for dx in 0..rect.width {
                if let Some(cell) = frame.get(rect.x + dx, bottom).copied() {
                    frame.set(
                        rect.x + dx,
                        bottom,
                        Cell {
                            flags: cell.flags | CellFlags::UNDERLINE,
                            ..cell
                        },
                    );
                }
            }
        }
    }
}
