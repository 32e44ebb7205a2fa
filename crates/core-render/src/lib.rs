//! Year layout engine, geometry and terminal painting.
//!
//! Pipeline per frame:
//! 1. [`YearLayout::build`] derives per-day coverage from the coordinator's
//!    current snapshot (pure; never mutates it).
//! 2. [`GridGeometry::fit`] sizes the 12 x 31 grid for the terminal.
//! 3. [`Painter::compose`] fills a [`Frame`] using [`CellPartition`] for each
//!    day, the same partition [`GridHitTest`] uses to resolve clicks.
//! 4. [`writer::Writer`] turns the frame into batched crossterm commands.
//!
//! Invariants:
//! - Events covering a day are stacked in ascending id order.
//! - Every day cell at least two columns wide keeps a free column.
//! - Categories missing from the snapshot render with the fallback color.

use bitflags::bitflags;
use crossterm::style::Color;

pub mod geometry;
pub mod paint;
pub mod palette;
pub mod partition;
pub mod status;
pub mod writer;
pub mod year_layout;

pub use geometry::{GridGeometry, GridHitTest, GridSpot, LayoutRegion};
pub use paint::Painter;
pub use partition::{CellPartition, Segment, clamp_fraction};
pub use year_layout::{
    DayCell, GridCell, LayoutContext, MONTH_LABELS, MonthRow, YearLayout, color_of, events_on,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CellFlags: u8 {
        const BOLD      = 0b0000_0001;
        const REVERSE   = 0b0000_0010;
        const DIM       = 0b0000_0100;
        const UNDERLINE = 0b0000_1000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub flags: CellFlags,
}

impl Cell {
    pub fn styled(ch: char, fg: Option<Color>, bg: Option<Color>, flags: CellFlags) -> Self {
        Self { ch, fg, bg, flags }
    }

    /// Same styling as `other`; used to batch writer output.
    pub fn same_style(&self, other: &Cell) -> bool {
        self.fg == other.fg && self.bg == other.bg && self.flags == other.flags
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            ch: ' ',
            fg: None,
            bg: None,
            flags: CellFlags::empty(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u16,
    pub height: u16,
    pub cells: Vec<Cell>,
}

impl Frame {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); (width as usize) * (height as usize)],
        }
    }

    #[inline]
    fn index(&self, x: u16, y: u16) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }

    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        self.index(x, y).map(|idx| &self.cells[idx])
    }

    pub fn set(&mut self, x: u16, y: u16, cell: Cell) {
        if let Some(idx) = self.index(x, y) {
            self.cells[idx] = cell;
        }
    }

    /// Write `text` starting at (x,y), clipped to the frame. One char per
    /// column. Returns the number of columns written.
    pub fn put_str(&mut self, x: u16, y: u16, text: &str, style: Cell) -> u16 {
        let mut written = 0u16;
        for (offset, ch) in text.chars().enumerate() {
            let Ok(offset) = u16::try_from(offset) else {
                break;
            };
            let col = x.saturating_add(offset);
            if col >= self.width {
                break;
            }
            self.set(col, y, Cell { ch, ..style });
            written += 1;
        }
        written
    }

    /// Fill a rectangle with `cell`, clipped to the frame.
    pub fn fill(&mut self, region: LayoutRegion, cell: Cell) {
        for dy in 0..region.height {
            for dx in 0..region.width {
                self.set(region.x.saturating_add(dx), region.y.saturating_add(dy), cell);
            }
        }
    }

    /// Characters of row `y` (tests / diagnostics).
    pub fn row_text(&self, y: u16) -> String {
        if y >= self.height {
            return String::new();
        }
        let start = y as usize * self.width as usize;
        self.cells[start..start + self.width as usize]
            .iter()
            .map(|c| c.ch)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_str_clips_at_frame_edge() {
        let mut f = Frame::new(5, 2);
        let written = f.put_str(3, 1, "hello", Cell::default());
        assert_eq!(written, 2);
        assert_eq!(f.row_text(1), "   he");
        assert_eq!(f.row_text(9), "");
    }

    #[test]
    fn fill_ignores_out_of_bounds() {
        let mut f = Frame::new(3, 3);
        let mark = Cell::styled('x', None, Some(Color::Red), CellFlags::empty());
        f.fill(LayoutRegion::new(2, 2, 4, 4), mark);
        assert_eq!(f.get(2, 2), Some(&mark));
        assert_eq!(f.row_text(2), "  x");
        assert_eq!(f.row_text(1), "   ");
    }
}
