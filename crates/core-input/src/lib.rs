//! Terminal input service and pointer gesture interpretation.
//!
//! * [`spawn_async_input`] forwards `crossterm` reports into the runtime
//!   channel as `core_events::InputEvent`s.
//! * [`MouseTranslator`] turns raw mouse reports into pointer events using the
//!   grid's hit test.
//! * [`GestureMachine`] decides whether a press/release pair was a day click,
//!   a range drag or an event selection.

mod async_service;
mod gesture;
mod mouse;

pub use async_service::AsyncInputShutdown;
pub use gesture::{DEFAULT_CLICK_TOLERANCE, GestureMachine, GestureState};
pub use mouse::MouseTranslator;

use async_service::spawn_async_event_task;

use core_events::{Event, KeyCode, KeyModifiers, ModMask, MouseButton, MouseEvent, MouseEventKind};
use crossterm::event::{
    KeyCode as CKeyCode, KeyModifiers as CMods, MouseButton as CButton, MouseEvent as CMouseEvent,
    MouseEventKind as CMouseKind,
};
use tokio::task::JoinHandle;

/// Spawn the async input service backed by `crossterm::EventStream`.
///
/// Returns the `JoinHandle` for the background task alongside a shutdown handle
/// that can be used to request immediate termination.
pub fn spawn_async_input(
    sender: tokio::sync::mpsc::Sender<Event>,
) -> (JoinHandle<()>, AsyncInputShutdown) {
    spawn_async_event_task(sender)
}

pub(crate) fn map_mods(m: CMods) -> KeyModifiers {
    let mut out = KeyModifiers::empty();
    if m.contains(CMods::CONTROL) {
        out |= KeyModifiers::CTRL;
    }
    if m.contains(CMods::ALT) {
        out |= KeyModifiers::ALT;
    }
    if m.contains(CMods::SHIFT) {
        out |= KeyModifiers::SHIFT;
    }
    out
}

fn map_mod_mask(m: CMods) -> ModMask {
    let mut out = ModMask::empty();
    if m.contains(CMods::CONTROL) {
        out |= ModMask::CTRL;
    }
    if m.contains(CMods::ALT) {
        out |= ModMask::ALT;
    }
    if m.contains(CMods::SHIFT) {
        out |= ModMask::SHIFT;
    }
    if m.contains(CMods::META) {
        out |= ModMask::META;
    }
    if m.contains(CMods::SUPER) {
        out |= ModMask::SUPER;
    }
    out
}

/// Keys the host reacts to; everything else is dropped at the source.
pub(crate) fn map_key_code(code: CKeyCode) -> Option<KeyCode> {
    Some(match code {
        CKeyCode::Char(c) => KeyCode::Char(c),
        CKeyCode::Enter => KeyCode::Enter,
        CKeyCode::Esc => KeyCode::Esc,
        CKeyCode::Backspace => KeyCode::Backspace,
        CKeyCode::Tab => KeyCode::Tab,
        CKeyCode::BackTab => KeyCode::BackTab,
        CKeyCode::Delete => KeyCode::Delete,
        CKeyCode::Up => KeyCode::Up,
        CKeyCode::Down => KeyCode::Down,
        CKeyCode::Left => KeyCode::Left,
        CKeyCode::Right => KeyCode::Right,
        _ => return None,
    })
}

fn map_button(button: CButton) -> MouseButton {
    match button {
        CButton::Left => MouseButton::Left,
        CButton::Right => MouseButton::Right,
        CButton::Middle => MouseButton::Middle,
    }
}

pub(crate) fn map_mouse(ev: CMouseEvent) -> MouseEvent {
    let kind = match ev.kind {
        CMouseKind::Down(b) => MouseEventKind::Down(map_button(b)),
        CMouseKind::Up(b) => MouseEventKind::Up(map_button(b)),
        CMouseKind::Drag(b) => MouseEventKind::Drag(map_button(b)),
        CMouseKind::Moved => MouseEventKind::Moved,
        CMouseKind::ScrollUp | CMouseKind::ScrollLeft => MouseEventKind::ScrollUp,
        CMouseKind::ScrollDown | CMouseKind::ScrollRight => MouseEventKind::ScrollDown,
    };
    MouseEvent {
        kind,
        column: ev.column,
        row: ev.row,
        mods: map_mod_mask(ev.modifiers),
    }
}
