//! Click-versus-drag interpretation of pointer input over the year grid.
//!
//! ```text
//!   Idle ──down(day, primary)──▶ Armed ──enter(other day)──▶ Dragging
//!    ▲                             │                            │
//!    │     up within tolerance ────┘ emits Day                  │
//!    │     up past tolerance / leave / doc up: no emission      │
//!    └────────────── up: emits Range, leave / doc up: cancel ───┘
//! ```
//!
//! A primary press on an event segment emits `Selection::Event` and never
//! arms. A cancel never emits anything.

use chrono::NaiveDate;
use core_events::{
    PointerButton, PointerEvent, PointerPos, PointerScope, PointerTarget, Selection,
};
use core_model::normalize_range;
use tracing::{debug, trace, warn};

/// Default maximum pointer travel (host units) still treated as a click.
pub const DEFAULT_CLICK_TOLERANCE: f32 = 5.0;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    /// Pressed on `anchor`, pointer has not yet entered another day.
    Armed { anchor: NaiveDate, origin: PointerPos },
    /// Pressed on `anchor`, pointer currently over `current`.
    Dragging { anchor: NaiveDate, current: NaiveDate },
}

impl GestureState {
    pub fn label(&self) -> &'static str {
        match self {
            GestureState::Idle => "idle",
            GestureState::Armed { .. } => "armed",
            GestureState::Dragging { .. } => "dragging",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GestureMachine {
    state: GestureState,
    click_tolerance: f32,
}

impl Default for GestureMachine {
    fn default() -> Self {
        Self::new(DEFAULT_CLICK_TOLERANCE)
    }
}

impl GestureMachine {
    /// Negative or non-finite tolerances collapse to zero.
    pub fn new(click_tolerance: f32) -> Self {
        let click_tolerance = if click_tolerance.is_finite() {
            click_tolerance.max(0.0)
        } else {
            0.0
        };
        Self {
            state: GestureState::Idle,
            click_tolerance,
        }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn click_tolerance(&self) -> f32 {
        self.click_tolerance
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, GestureState::Idle)
    }

    /// Inclusive highlighted range while a gesture is in progress.
    pub fn preview(&self) -> Option<(NaiveDate, NaiveDate)> {
        match self.state {
            GestureState::Idle => None,
            GestureState::Armed { anchor, .. } => Some((anchor, anchor)),
            GestureState::Dragging { anchor, current } => Some(normalize_range(anchor, current)),
        }
    }

    /// Abandon any gesture without emitting. Returns whether one was active.
    pub fn cancel(&mut self) -> bool {
        let was_active = self.is_active();
        if was_active {
            debug!(target: "input.gesture", from = self.state.label(), "gesture_cancelled");
        }
        self.state = GestureState::Idle;
        was_active
    }

    /// Feed one pointer event; returns the selection it completes, if any.
    pub fn handle(&mut self, event: &PointerEvent) -> Option<Selection> {
        let from = self.state.label();
        let emitted = match event {
            PointerEvent::Down {
                target,
                button,
                pos,
            } => self.on_down(target, *button, *pos),
            PointerEvent::Enter { day } => {
                self.on_enter(*day);
                None
            }
            PointerEvent::Up { pos, scope } => self.on_up(*pos, *scope),
            PointerEvent::Leave { scope } => {
                if *scope != PointerScope::Cell {
                    self.cancel();
                }
                None
            }
        };
        let to = self.state.label();
        if from != to {
            trace!(target: "input.gesture", from, to, "transition");
        }
        if let Some(selection) = &emitted {
            debug!(target: "input.gesture", kind = selection_kind(selection), "selection");
        }
        emitted
    }

    fn on_down(
        &mut self,
        target: &PointerTarget,
        button: PointerButton,
        pos: PointerPos,
    ) -> Option<Selection> {
        if button != PointerButton::Primary {
            return None;
        }
        if self.is_active() {
            warn!(target: "input.gesture", state = self.state.label(), "pointer_down_while_active");
            return None;
        }
        match target {
            PointerTarget::Segment { event, .. } => Some(Selection::Event(event.clone())),
            PointerTarget::Day(day) => {
                self.state = GestureState::Armed {
                    anchor: *day,
                    origin: pos,
                };
                None
            }
            PointerTarget::Blank | PointerTarget::Outside => None,
        }
    }

    fn on_enter(&mut self, day: NaiveDate) {
        match self.state {
            GestureState::Armed { anchor, .. } if day != anchor => {
                self.state = GestureState::Dragging {
                    anchor,
                    current: day,
                };
            }
            GestureState::Dragging { anchor, .. } => {
                self.state = GestureState::Dragging {
                    anchor,
                    current: day,
                };
            }
            _ => {}
        }
    }

    fn on_up(&mut self, pos: PointerPos, scope: PointerScope) -> Option<Selection> {
        let state = std::mem::take(&mut self.state);
        if scope == PointerScope::Document {
            if !matches!(state, GestureState::Idle) {
                debug!(target: "input.gesture", from = state.label(), "released_outside_grid");
            }
            return None;
        }
        match state {
            GestureState::Idle => None,
            GestureState::Armed { anchor, origin } => {
                if origin.distance(pos) < self.click_tolerance {
                    Some(Selection::Day(anchor))
                } else {
                    debug!(target: "input.gesture", "click_tolerance_exceeded");
                    None
                }
            }
            GestureState::Dragging { anchor, current } => {
                let (start, end) = normalize_range(anchor, current);
                Some(Selection::Range { start, end })
            }
        }
    }
}

fn selection_kind(selection: &Selection) -> &'static str {
    match selection {
        Selection::Day(_) => "day",
        Selection::Range { .. } => "range",
        Selection::Event(_) => "event",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::EventId;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    fn down(day: NaiveDate, x: f32) -> PointerEvent {
        PointerEvent::Down {
            target: PointerTarget::Day(day),
            button: PointerButton::Primary,
            pos: PointerPos::new(x, 0.0),
        }
    }

    fn up(x: f32, scope: PointerScope) -> PointerEvent {
        PointerEvent::Up {
            pos: PointerPos::new(x, 0.0),
            scope,
        }
    }

    #[test]
    fn click_within_tolerance_selects_day() {
        let mut m = GestureMachine::default();
        assert_eq!(m.handle(&down(d(3, 3), 10.0)), None);
        assert!(matches!(m.state(), GestureState::Armed { .. }));
        assert_eq!(
            m.handle(&up(12.0, PointerScope::Cell)),
            Some(Selection::Day(d(3, 3)))
        );
        assert_eq!(m.state(), &GestureState::Idle);
    }

    #[test]
    fn release_past_tolerance_emits_nothing() {
        let mut m = GestureMachine::new(5.0);
        m.handle(&down(d(3, 3), 0.0));
        assert_eq!(m.handle(&up(5.0, PointerScope::Cell)), None);
        assert_eq!(m.state(), &GestureState::Idle);
    }

    #[test]
    fn backward_drag_normalizes_range() {
        let mut m = GestureMachine::default();
        m.handle(&down(d(2, 8), 0.0));
        m.handle(&PointerEvent::Enter { day: d(2, 7) });
        m.handle(&PointerEvent::Enter { day: d(2, 5) });
        assert_eq!(m.preview(), Some((d(2, 5), d(2, 8))));
        assert_eq!(
            m.handle(&up(40.0, PointerScope::Cell)),
            Some(Selection::Range {
                start: d(2, 5),
                end: d(2, 8)
            })
        );
        assert_eq!(m.preview(), None);
    }

    #[test]
    fn entering_the_anchor_keeps_the_machine_armed() {
        let mut m = GestureMachine::default();
        m.handle(&down(d(4, 1), 0.0));
        m.handle(&PointerEvent::Enter { day: d(4, 1) });
        assert!(matches!(m.state(), GestureState::Armed { .. }));
        assert_eq!(m.preview(), Some((d(4, 1), d(4, 1))));
    }

    #[test]
    fn drag_back_onto_anchor_yields_single_day_range() {
        let mut m = GestureMachine::default();
        m.handle(&down(d(4, 1), 0.0));
        m.handle(&PointerEvent::Enter { day: d(4, 2) });
        m.handle(&PointerEvent::Enter { day: d(4, 1) });
        assert_eq!(
            m.handle(&up(0.0, PointerScope::Cell)),
            Some(Selection::Range {
                start: d(4, 1),
                end: d(4, 1)
            })
        );
    }

    #[test]
    fn document_release_cancels_without_emitting() {
        let mut m = GestureMachine::default();
        m.handle(&down(d(6, 1), 0.0));
        m.handle(&PointerEvent::Enter { day: d(6, 9) });
        assert_eq!(m.handle(&up(0.0, PointerScope::Document)), None);
        assert_eq!(m.state(), &GestureState::Idle);
        // Subsequent cell release must not resurrect the gesture.
        assert_eq!(m.handle(&up(0.0, PointerScope::Cell)), None);
    }

    #[test]
    fn leaving_grid_cancels_but_cell_leave_does_not() {
        let mut m = GestureMachine::default();
        m.handle(&down(d(6, 1), 0.0));
        m.handle(&PointerEvent::Leave {
            scope: PointerScope::Cell,
        });
        assert!(m.is_active());
        m.handle(&PointerEvent::Leave {
            scope: PointerScope::Grid,
        });
        assert!(!m.is_active());
    }

    #[test]
    fn segment_press_selects_event_without_arming() {
        let mut m = GestureMachine::default();
        let out = m.handle(&PointerEvent::Down {
            target: PointerTarget::Segment {
                event: EventId::from("e1"),
                day: d(2, 6),
            },
            button: PointerButton::Primary,
            pos: PointerPos::default(),
        });
        assert_eq!(out, Some(Selection::Event(EventId::from("e1"))));
        assert_eq!(m.state(), &GestureState::Idle);
    }

    #[test]
    fn secondary_button_is_ignored() {
        let mut m = GestureMachine::default();
        let out = m.handle(&PointerEvent::Down {
            target: PointerTarget::Day(d(1, 1)),
            button: PointerButton::Secondary,
            pos: PointerPos::default(),
        });
        assert_eq!(out, None);
        assert_eq!(m.state(), &GestureState::Idle);
    }

    #[test]
    fn second_press_while_dragging_keeps_original_anchor() {
        let mut m = GestureMachine::default();
        m.handle(&down(d(1, 10), 0.0));
        m.handle(&PointerEvent::Enter { day: d(1, 12) });
        m.handle(&down(d(1, 20), 0.0));
        assert_eq!(m.preview(), Some((d(1, 10), d(1, 12))));
    }

    #[test]
    fn enter_while_idle_is_ignored() {
        let mut m = GestureMachine::default();
        m.handle(&PointerEvent::Enter { day: d(1, 12) });
        assert_eq!(m.state(), &GestureState::Idle);
    }

    #[test]
    fn invalid_tolerance_collapses_to_zero() {
        assert_eq!(GestureMachine::new(-3.0).click_tolerance(), 0.0);
        assert_eq!(GestureMachine::new(f32::NAN).click_tolerance(), 0.0);
    }
}
