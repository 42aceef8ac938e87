// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene events delivered to items.
//!
//! A [`SceneEvent`] wraps one [`EventKind`] plus an `accepted` flag. Events
//! start out accepted; handlers that do not want an event call
//! [`SceneEvent::ignore`]. Positional payloads carry both item-local and scene
//! coordinates; the local ones are rewritten whenever an event is redirected
//! to an ancestor.

use alloc::string::String;
use kurbo::{Affine, Point};

use crate::types::FocusReason;

bitflags::bitflags! {
    /// Keyboard modifiers held during an event.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        /// Shift.
        const SHIFT = 1 << 0;
        /// Control.
        const CTRL = 1 << 1;
        /// Alt / Option.
        const ALT = 1 << 2;
        /// Meta / Command / Super.
        const META = 1 << 3;
    }
}

bitflags::bitflags! {
    /// Mouse buttons held during an event.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct MouseButtons: u8 {
        /// Primary button.
        const LEFT = 1 << 0;
        /// Secondary button.
        const RIGHT = 1 << 1;
        /// Middle button.
        const MIDDLE = 1 << 2;
    }
}

/// Keys the scene interprets itself. Everything else is passed through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    /// Tab.
    Tab,
    /// Shift+Tab as reported by some platforms.
    Backtab,
    /// A printable character.
    Character(char),
    /// Any other key, by platform code.
    Other(u32),
}

/// Mouse press, move, release, and double-click payload.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MouseEvent {
    /// Position in item coordinates.
    pub pos: Point,
    /// Position in scene coordinates.
    pub scene_pos: Point,
    /// Previous position in item coordinates.
    pub last_pos: Point,
    /// Previous position in scene coordinates.
    pub last_scene_pos: Point,
    /// Item-coordinate position where the triggering button went down.
    pub button_down_pos: Point,
    /// Button that caused the event (empty for moves).
    pub button: MouseButtons,
    /// Buttons held.
    pub buttons: MouseButtons,
    /// Modifiers held.
    pub modifiers: Modifiers,
}

impl MouseEvent {
    /// A left-button event at a scene position, with item coordinates equal
    /// to scene coordinates until the scene localizes it.
    pub fn left_at(scene_pos: Point) -> Self {
        Self {
            pos: scene_pos,
            scene_pos,
            last_pos: scene_pos,
            last_scene_pos: scene_pos,
            button_down_pos: scene_pos,
            button: MouseButtons::LEFT,
            buttons: MouseButtons::LEFT,
            modifiers: Modifiers::empty(),
        }
    }
}

/// Hover enter, move, and leave payload.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct HoverEvent {
    /// Position in item coordinates.
    pub pos: Point,
    /// Position in scene coordinates.
    pub scene_pos: Point,
    /// Previous position in item coordinates.
    pub last_pos: Point,
    /// Modifiers held.
    pub modifiers: Modifiers,
}

/// Wheel payload.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct WheelEvent {
    /// Position in item coordinates.
    pub pos: Point,
    /// Position in scene coordinates.
    pub scene_pos: Point,
    /// Scroll distance; positive away from the user.
    pub delta: f64,
    /// Buttons held.
    pub buttons: MouseButtons,
    /// Modifiers held.
    pub modifiers: Modifiers,
}

/// Context menu request payload.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct ContextMenuEvent {
    /// Position in item coordinates.
    pub pos: Point,
    /// Position in scene coordinates.
    pub scene_pos: Point,
    /// Modifiers held.
    pub modifiers: Modifiers,
}

/// Drag enter, move, leave, and drop payload. Payload data is out of scope.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct DragEvent {
    /// Position in item coordinates.
    pub pos: Point,
    /// Position in scene coordinates.
    pub scene_pos: Point,
    /// Buttons held.
    pub buttons: MouseButtons,
    /// Modifiers held.
    pub modifiers: Modifiers,
}

/// Key press and release payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    /// The key.
    pub key: Key,
    /// Modifiers held.
    pub modifiers: Modifiers,
}

/// Input method composition payload.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct InputMethodEvent {
    /// Text being composed.
    pub preedit: String,
    /// Text committed by this event.
    pub commit: String,
}

/// What happened.
#[derive(Clone, Debug, PartialEq)]
pub enum EventKind {
    /// The item gained input focus.
    FocusIn(FocusReason),
    /// The item lost input focus.
    FocusOut(FocusReason),
    /// A context menu was requested over the item.
    ContextMenu(ContextMenuEvent),
    /// A drag entered the item.
    DragEnter(DragEvent),
    /// A drag moved over the item.
    DragMove(DragEvent),
    /// A drag left the item.
    DragLeave(DragEvent),
    /// A drag was dropped on the item.
    Drop(DragEvent),
    /// The pointer entered the item.
    HoverEnter(HoverEvent),
    /// The pointer moved over the item.
    HoverMove(HoverEvent),
    /// The pointer left the item.
    HoverLeave(HoverEvent),
    /// A mouse button went down.
    MousePress(MouseEvent),
    /// The mouse moved with the item as grabber.
    MouseMove(MouseEvent),
    /// A mouse button went up.
    MouseRelease(MouseEvent),
    /// A mouse button was double-clicked.
    MouseDoubleClick(MouseEvent),
    /// Wheel rotation.
    Wheel(WheelEvent),
    /// A key went down.
    KeyPress(KeyEvent),
    /// A key went up.
    KeyRelease(KeyEvent),
    /// Input method composition.
    InputMethod(InputMethodEvent),
    /// The item's panel (or the scene) became active.
    WindowActivate,
    /// The item's panel (or the scene) became inactive.
    WindowDeactivate,
    /// The item became the mouse grabber.
    GrabMouse,
    /// The item stopped being the mouse grabber.
    UngrabMouse,
    /// The item became the keyboard grabber.
    GrabKeyboard,
    /// The item stopped being the keyboard grabber.
    UngrabKeyboard,
}

impl EventKind {
    /// Returns true for the enter/leave pair of hover and drag events.
    pub fn is_enter_or_leave(&self) -> bool {
        matches!(
            self,
            Self::HoverEnter(_) | Self::HoverLeave(_) | Self::DragEnter(_) | Self::DragLeave(_)
        )
    }

    /// Rewrite item-local positions through `item_to_target`.
    ///
    /// Scene positions are left untouched. Events without positions are not
    /// affected.
    pub(crate) fn remap(&mut self, item_to_target: Affine) {
        let m = item_to_target;
        match self {
            Self::MousePress(e)
            | Self::MouseMove(e)
            | Self::MouseRelease(e)
            | Self::MouseDoubleClick(e) => {
                e.pos = m * e.pos;
                e.last_pos = m * e.last_pos;
                e.button_down_pos = m * e.button_down_pos;
            }
            Self::HoverEnter(e) | Self::HoverMove(e) | Self::HoverLeave(e) => {
                e.pos = m * e.pos;
                e.last_pos = m * e.last_pos;
            }
            Self::Wheel(e) => e.pos = m * e.pos,
            Self::ContextMenu(e) => e.pos = m * e.pos,
            Self::DragEnter(e) | Self::DragMove(e) | Self::DragLeave(e) | Self::Drop(e) => {
                e.pos = m * e.pos;
            }
            _ => {}
        }
    }
}

/// An event on its way to an item.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneEvent {
    /// The payload.
    pub kind: EventKind,
    accepted: bool,
}

impl SceneEvent {
    /// Wrap `kind` into an accepted event.
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            accepted: true,
        }
    }

    /// Whether the receiver accepted the event.
    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    /// Mark the event as handled.
    pub fn accept(&mut self) {
        self.accepted = true;
    }

    /// Mark the event as not handled so it may propagate elsewhere.
    pub fn ignore(&mut self) {
        self.accepted = false;
    }

    /// Set the accepted flag.
    pub fn set_accepted(&mut self, accepted: bool) {
        self.accepted = accepted;
    }
}

impl From<EventKind> for SceneEvent {
    fn from(kind: EventKind) -> Self {
        Self::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remap_moves_local_positions_only() {
        let mut kind = EventKind::MousePress(MouseEvent::left_at(Point::new(1.0, 2.0)));
        kind.remap(Affine::translate((10.0, 0.0)));
        let EventKind::MousePress(e) = kind else {
            panic!("kind changed");
        };
        assert_eq!(e.pos, Point::new(11.0, 2.0));
        assert_eq!(e.button_down_pos, Point::new(11.0, 2.0));
        assert_eq!(e.scene_pos, Point::new(1.0, 2.0));
    }

    #[test]
    fn enter_leave_classification() {
        assert!(EventKind::HoverEnter(HoverEvent::default()).is_enter_or_leave());
        assert!(EventKind::DragLeave(DragEvent::default()).is_enter_or_leave());
        assert!(!EventKind::HoverMove(HoverEvent::default()).is_enter_or_leave());
        assert!(!EventKind::Drop(DragEvent::default()).is_enter_or_leave());
    }

    #[test]
    fn events_start_accepted() {
        let mut ev = SceneEvent::new(EventKind::WindowActivate);
        assert!(ev.is_accepted());
        ev.ignore();
        assert!(!ev.is_accepted());
    }
}
