//! Terminal mouse reports to pointer events.
//!
//! A terminal only reports button transitions and motion, never cell
//! enter/leave, so the translator remembers the last day under the pointer and
//! synthesizes `Enter` when it changes and `Leave { Grid }` when the pointer
//! moves past the grid edge.

use chrono::NaiveDate;
use core_events::{
    HitTest, MouseButton, MouseEvent, MouseEventKind, POINTER_EVENTS, PointerButton, PointerEvent,
    PointerPos, PointerScope, PointerTarget,
};
use std::sync::atomic::Ordering;

#[derive(Debug, Default, Clone)]
pub struct MouseTranslator {
    last_day: Option<NaiveDate>,
    outside: bool,
}

fn pointer_button(button: MouseButton) -> PointerButton {
    match button {
        MouseButton::Left => PointerButton::Primary,
        MouseButton::Right => PointerButton::Secondary,
        MouseButton::Middle => PointerButton::Middle,
    }
}

fn pos_of(ev: &MouseEvent) -> PointerPos {
    PointerPos::new(f32::from(ev.column), f32::from(ev.row))
}

impl MouseTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate one mouse report against the current grid geometry.
    pub fn translate<H: HitTest + ?Sized>(&mut self, ev: &MouseEvent, hit: &H) -> Vec<PointerEvent> {
        let out = match ev.kind {
            MouseEventKind::Down(button) => {
                let target = hit.hit(ev.column, ev.row);
                self.track(&target);
                vec![PointerEvent::Down {
                    target,
                    button: pointer_button(button),
                    pos: pos_of(ev),
                }]
            }
            MouseEventKind::Drag(_) | MouseEventKind::Moved => {
                let target = hit.hit(ev.column, ev.row);
                self.motion(&target)
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let target = hit.hit(ev.column, ev.row);
                // Only days and segments take a release; anything else
                // behaves like letting go outside the grid.
                let scope = match &target {
                    PointerTarget::Day(_) | PointerTarget::Segment { .. } => PointerScope::Cell,
                    PointerTarget::Blank | PointerTarget::Outside => PointerScope::Document,
                };
                self.track(&target);
                vec![PointerEvent::Up {
                    pos: pos_of(ev),
                    scope,
                }]
            }
            MouseEventKind::Up(_) | MouseEventKind::ScrollUp | MouseEventKind::ScrollDown => {
                Vec::new()
            }
        };
        POINTER_EVENTS.fetch_add(out.len() as u64, Ordering::Relaxed);
        out
    }

    /// The terminal lost focus: treat it as leaving the document.
    pub fn focus_lost(&mut self) -> PointerEvent {
        self.last_day = None;
        self.outside = true;
        POINTER_EVENTS.fetch_add(1, Ordering::Relaxed);
        PointerEvent::Leave {
            scope: PointerScope::Document,
        }
    }

    fn track(&mut self, target: &PointerTarget) {
        self.outside = *target == PointerTarget::Outside;
        if let Some(day) = target.day() {
            self.last_day = Some(day);
        }
    }

    fn motion(&mut self, target: &PointerTarget) -> Vec<PointerEvent> {
        match target {
            PointerTarget::Outside => {
                if self.outside {
                    return Vec::new();
                }
                self.outside = true;
                self.last_day = None;
                vec![PointerEvent::Leave {
                    scope: PointerScope::Grid,
                }]
            }
            PointerTarget::Blank => {
                self.outside = false;
                Vec::new()
            }
            PointerTarget::Day(_) | PointerTarget::Segment { .. } => {
                self.outside = false;
                let day = target.day();
                if day == self.last_day {
                    return Vec::new();
                }
                self.last_day = day;
                day.map(|day| vec![PointerEvent::Enter { day }])
                    .unwrap_or_default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::ModMask;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, day).unwrap()
    }

    // Columns 0..28 map to Feb 1..28 (one column per day), 28..31 are
    // placeholders, anything further right is outside the grid.
    fn grid(column: u16, _row: u16) -> PointerTarget {
        match column {
            0..28 => PointerTarget::Day(d(u32::from(column) + 1)),
            28..31 => PointerTarget::Blank,
            _ => PointerTarget::Outside,
        }
    }

    fn mouse(kind: MouseEventKind, column: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row: 0,
            mods: ModMask::empty(),
        }
    }

    #[test]
    fn drag_emits_enter_once_per_day() {
        let mut t = MouseTranslator::new();
        let down = t.translate(&mouse(MouseEventKind::Down(MouseButton::Left), 4), &grid);
        assert!(matches!(
            down.as_slice(),
            [PointerEvent::Down {
                button: PointerButton::Primary,
                ..
            }]
        ));
        assert!(
            t.translate(&mouse(MouseEventKind::Drag(MouseButton::Left), 4), &grid)
                .is_empty()
        );
        let moved = t.translate(&mouse(MouseEventKind::Drag(MouseButton::Left), 6), &grid);
        assert_eq!(moved, vec![PointerEvent::Enter { day: d(7) }]);
    }

    #[test]
    fn crossing_placeholders_is_silent_but_leaving_grid_is_not() {
        let mut t = MouseTranslator::new();
        t.translate(&mouse(MouseEventKind::Down(MouseButton::Left), 27), &grid);
        assert!(
            t.translate(&mouse(MouseEventKind::Drag(MouseButton::Left), 29), &grid)
                .is_empty()
        );
        let out = t.translate(&mouse(MouseEventKind::Drag(MouseButton::Left), 40), &grid);
        assert_eq!(
            out,
            vec![PointerEvent::Leave {
                scope: PointerScope::Grid
            }]
        );
        assert!(
            t.translate(&mouse(MouseEventKind::Drag(MouseButton::Left), 41), &grid)
                .is_empty()
        );
    }

    #[test]
    fn release_outside_grid_is_document_scoped() {
        let mut t = MouseTranslator::new();
        let out = t.translate(&mouse(MouseEventKind::Up(MouseButton::Left), 50), &grid);
        assert!(matches!(
            out.as_slice(),
            [PointerEvent::Up {
                scope: PointerScope::Document,
                ..
            }]
        ));
        let out = t.translate(&mouse(MouseEventKind::Up(MouseButton::Left), 3), &grid);
        assert!(matches!(
            out.as_slice(),
            [PointerEvent::Up {
                scope: PointerScope::Cell,
                ..
            }]
        ));
    }

    #[test]
    fn release_over_a_placeholder_cancels_the_drag() {
        let mut t = MouseTranslator::new();
        let mut machine = crate::GestureMachine::new(5.0);
        let mut feed = |t: &mut MouseTranslator, kind: MouseEventKind, column: u16| {
            t.translate(&mouse(kind, column), &grid)
                .iter()
                .filter_map(|e| machine.handle(e))
                .collect::<Vec<_>>()
        };
        assert!(feed(&mut t, MouseEventKind::Down(MouseButton::Left), 25).is_empty());
        assert!(feed(&mut t, MouseEventKind::Drag(MouseButton::Left), 27).is_empty());
        assert!(feed(&mut t, MouseEventKind::Drag(MouseButton::Left), 29).is_empty());
        let up = t.translate(&mouse(MouseEventKind::Up(MouseButton::Left), 29), &grid);
        assert!(matches!(
            up.as_slice(),
            [PointerEvent::Up {
                scope: PointerScope::Document,
                ..
            }]
        ));
        assert!(up.iter().filter_map(|e| machine.handle(e)).next().is_none());
        assert!(!machine.is_active());
    }

    #[test]
    fn scroll_and_secondary_release_are_dropped() {
        let mut t = MouseTranslator::new();
        assert!(t.translate(&mouse(MouseEventKind::ScrollUp, 3), &grid).is_empty());
        assert!(
            t.translate(&mouse(MouseEventKind::Up(MouseButton::Right), 3), &grid)
                .is_empty()
        );
    }

    #[test]
    fn focus_loss_is_a_document_leave() {
        let mut t = MouseTranslator::new();
        assert_eq!(
            t.focus_lost(),
            PointerEvent::Leave {
                scope: PointerScope::Document
            }
        );
    }
}
