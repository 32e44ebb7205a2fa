//! Terminal writer: batches primitive operations and flushes them once.
//!
//! Invariants:
//! * Commands preserve ordering; nothing is flushed mid-frame.
//! * Positions are absolute with a (0,0) origin; callers ensure bounds.
//! * Style changes are emitted only when consecutive cells differ.

use anyhow::Result;
use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
};
use std::io::Write;

use crate::{Cell, CellFlags, Frame};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    MoveTo(u16, u16),
    Style {
        fg: Option<Color>,
        bg: Option<Color>,
        flags: CellFlags,
    },
    Print(String),
}

#[derive(Default)]
pub struct Writer {
    cmds: Vec<Command>,
}

impl Writer {
    pub fn new() -> Self {
        Self { cmds: Vec::new() }
    }

    pub fn move_to(&mut self, x: u16, y: u16) {
        self.cmds.push(Command::MoveTo(x, y));
    }

    pub fn style(&mut self, cell: &Cell) {
        self.cmds.push(Command::Style {
            fg: cell.fg,
            bg: cell.bg,
            flags: cell.flags,
        });
    }

    pub fn print<S: Into<String>>(&mut self, s: S) {
        let s: String = s.into();
        if !s.is_empty() {
            self.cmds.push(Command::Print(s));
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.cmds
    }

    /// Full repaint of `frame`: one `MoveTo` per row, then runs of equally
    /// styled cells.
    pub fn from_frame(frame: &Frame) -> Self {
        let mut writer = Self::new();
        for y in 0..frame.height {
            writer.move_to(0, y);
            let mut run = String::new();
            let mut current: Option<Cell> = None;
            for x in 0..frame.width {
                let Some(cell) = frame.get(x, y) else {
                    continue;
                };
                match current {
                    Some(prev) if prev.same_style(cell) => {}
                    _ => {
                        writer.print(std::mem::take(&mut run));
                        writer.style(cell);
                        current = Some(*cell);
                    }
                }
                run.push(cell.ch);
            }
            writer.print(run);
        }
        writer
    }

    pub fn flush_to<W: Write>(self, out: &mut W) -> Result<()> {
        for c in self.cmds {
            match c {
                Command::MoveTo(x, y) => {
                    queue!(out, MoveTo(x, y))?;
                }
                Command::Style { fg, bg, flags } => {
                    queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;
                    if let Some(fg) = fg {
                        queue!(out, SetForegroundColor(fg))?;
                    }
                    if let Some(bg) = bg {
                        queue!(out, SetBackgroundColor(bg))?;
                    }
                    if flags.contains(CellFlags::BOLD) {
                        queue!(out, SetAttribute(Attribute::Bold))?;
                    }
                    if flags.contains(CellFlags::DIM) {
                        queue!(out, SetAttribute(Attribute::Dim))?;
                    }
                    if flags.contains(CellFlags::REVERSE) {
                        queue!(out, SetAttribute(Attribute::Reverse))?;
                    }
                    if flags.contains(CellFlags::UNDERLINE) {
                        queue!(out, SetAttribute(Attribute::Underlined))?;
                    }
                }
                Command::Print(s) => {
                    queue!(out, Print(s))?;
                }
            }
        }
        queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;
        out.flush()?;
        Ok(())
    }

    pub fn flush(self) -> Result<()> {
        let mut out = std::io::stdout();
        self.flush_to(&mut out)
    }
}
