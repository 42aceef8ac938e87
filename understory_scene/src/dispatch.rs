// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event delivery, scene event filters, and mouse/keyboard grabs.
//!
//! [`Scene::send_event`] runs an event through these stages, in order:
//!
//! 1. Delegation: an item inside a group whose root handles child events
//!    forwards the event to that root, with local positions remapped.
//!    Hover and drag enter/leave events are swallowed instead.
//! 2. Installed filters, in installation order.
//! 3. Ancestors that filter child events, nearest first.
//! 4. Disabled items ignore input events; hidden items swallow everything
//!    except `FocusOut`.
//! 5. The handler method for the event kind. Tab and Backtab drive focus
//!    traversal; window activation fans out to visible non-panel children.
//!
//! A filter that returns true consumes the event; later stages do not run.

use alloc::vec::Vec;
use smallvec::SmallVec;

use crate::error::{SceneError, report};
use crate::event::{EventKind, Key, KeyEvent, Modifiers, SceneEvent};
use crate::scene::Scene;
use crate::types::{AncestorFlags, ItemFlags, ItemId};

impl EventKind {
    fn is_input(&self) -> bool {
        matches!(
            self,
            Self::ContextMenu(_)
                | Self::DragEnter(_)
                | Self::DragMove(_)
                | Self::DragLeave(_)
                | Self::Drop(_)
                | Self::MousePress(_)
                | Self::MouseMove(_)
                | Self::MouseRelease(_)
                | Self::MouseDoubleClick(_)
                | Self::Wheel(_)
                | Self::KeyPress(_)
                | Self::KeyRelease(_)
                | Self::InputMethod(_)
        )
    }
}

/// Direction of Tab traversal requested by a key press, if any.
fn tab_direction(key: &KeyEvent) -> Option<bool> {
    if key
        .modifiers
        .intersects(Modifiers::CTRL | Modifiers::ALT | Modifiers::META)
    {
        return None;
    }
    match key.key {
        Key::Backtab => Some(false),
        Key::Tab => Some(!key.modifiers.contains(Modifiers::SHIFT)),
        _ => None,
    }
}

impl Scene {
    /// Deliver an event to an item.
    ///
    /// Returns whether the event ended up accepted. Events consumed by a
    /// filter, swallowed by a hidden item, or swallowed on delegation count
    /// as accepted; events for stale ids are not.
    pub fn send_event(&mut self, id: ItemId, event: &mut SceneEvent) -> bool {
        let Some(item) = self.item_opt(id) else {
            return false;
        };

        if item
            .ancestor_flags
            .contains(AncestorFlags::HANDLES_CHILD_EVENTS)
        {
            if event.kind.is_enter_or_leave() {
                return true;
            }
            let mut handler = id;
            while let Some(p) = self.item(handler).parent {
                handler = p;
                if !self
                    .item(p)
                    .ancestor_flags
                    .contains(AncestorFlags::HANDLES_CHILD_EVENTS)
                {
                    break;
                }
            }
            if let Some(m) = self.item_transform(id, handler) {
                event.kind.remap(m);
            }
            log::trace!("{id:?}: {:?} delegated to {handler:?}", event.kind);
            return self.send_event(handler, event);
        }

        if self.filter_event(id, event) || self.filter_descendant_event(id, event) {
            log::trace!("{id:?}: {:?} consumed by a filter", event.kind);
            return true;
        }

        let item = self.item(id);
        if !item.enabled && event.kind.is_input() {
            event.ignore();
            return false;
        }
        if !item.visible && !matches!(event.kind, EventKind::FocusOut(_)) {
            return true;
        }

        self.dispatch(id, event);
        event.is_accepted()
    }

    /// Let `filter` see every event sent to `watched` first.
    ///
    /// Both items must be in the scene. Installing the same filter twice
    /// does nothing.
    pub fn install_scene_event_filter(
        &mut self,
        watched: ItemId,
        filter: ItemId,
    ) -> Result<(), SceneError> {
        for id in [watched, filter] {
            if !self.is_alive(id) {
                return Err(report("install_scene_event_filter", SceneError::StaleItem(id)));
            }
            if !self.is_in_scene(id) {
                return Err(report("install_scene_event_filter", SceneError::NotInScene(id)));
            }
        }
        let filters = self.event_filters.entry(watched).or_default();
        if !filters.contains(&filter) {
            filters.push(filter);
        }
        Ok(())
    }

    /// Undo [`Scene::install_scene_event_filter`].
    pub fn remove_scene_event_filter(&mut self, watched: ItemId, filter: ItemId) {
        if let Some(filters) = self.event_filters.get_mut(&watched) {
            filters.retain(|f| *f != filter);
            if filters.is_empty() {
                self.event_filters.remove(&watched);
            }
        }
    }

    /// The item holding the mouse grab, if any.
    pub fn mouse_grabber_item(&self) -> Option<ItemId> {
        self.mouse_grabbers.last().copied()
    }

    /// The item holding the keyboard grab, if any.
    pub fn keyboard_grabber_item(&self) -> Option<ItemId> {
        self.keyboard_grabbers.last().copied()
    }

    /// Make the item the mouse grabber.
    ///
    /// The previous grabber receives `UngrabMouse` and gets the grab back
    /// when this item lets go. Grabbing while already the grabber does
    /// nothing.
    pub fn grab_mouse(&mut self, id: ItemId) -> Result<(), SceneError> {
        self.check_grab("grab_mouse", id)?;
        grab(self, id, Grab::Mouse);
        Ok(())
    }

    /// Release the mouse grab held by the item, along with every grab taken
    /// after it.
    pub fn ungrab_mouse(&mut self, id: ItemId) {
        if self.mouse_grabbers.contains(&id) {
            self.ungrab_mouse_helper(id, false);
        } else {
            log::warn!("ungrab_mouse: {id:?} is not a mouse grabber");
        }
    }

    /// Make the item the keyboard grabber.
    pub fn grab_keyboard(&mut self, id: ItemId) -> Result<(), SceneError> {
        self.check_grab("grab_keyboard", id)?;
        grab(self, id, Grab::Keyboard);
        Ok(())
    }

    /// Release the keyboard grab held by the item, along with every grab
    /// taken after it.
    pub fn ungrab_keyboard(&mut self, id: ItemId) {
        if self.keyboard_grabbers.contains(&id) {
            self.ungrab_keyboard_helper(id, false);
        } else {
            log::warn!("ungrab_keyboard: {id:?} is not a keyboard grabber");
        }
    }

    // --- internals ---

    pub(crate) fn ungrab_mouse_helper(&mut self, id: ItemId, dying: bool) {
        ungrab(self, id, dying, Grab::Mouse);
    }

    pub(crate) fn ungrab_keyboard_helper(&mut self, id: ItemId, dying: bool) {
        ungrab(self, id, dying, Grab::Keyboard);
    }

    fn check_grab(&self, op: &str, id: ItemId) -> Result<(), SceneError> {
        let Some(item) = self.item_opt(id) else {
            return Err(report(op, SceneError::StaleItem(id)));
        };
        if !item.in_scene {
            return Err(report(op, SceneError::NotInScene(id)));
        }
        if !item.visible {
            return Err(report(op, SceneError::NotVisible(id)));
        }
        Ok(())
    }

    fn filter_event(&mut self, id: ItemId, event: &mut SceneEvent) -> bool {
        let Some(filters) = self.event_filters.get(&id) else {
            return false;
        };
        let filters = filters.clone();
        for f in filters {
            if f == id || !self.is_alive(f) {
                continue;
            }
            if self.with_handler(f, |h, scene| h.scene_event_filter(scene, f, id, event)) {
                return true;
            }
        }
        false
    }

    fn filter_descendant_event(&mut self, id: ItemId, event: &mut SceneEvent) -> bool {
        let mut cur = id;
        while self
            .item_opt(cur)
            .is_some_and(|n| n.ancestor_flags.contains(AncestorFlags::FILTERS_CHILD_EVENTS))
        {
            let Some(parent) = self.item(cur).parent else {
                break;
            };
            if self.item(parent).flags.contains(ItemFlags::FILTERS_CHILD_EVENTS)
                && self.with_handler(parent, |h, scene| {
                    h.scene_event_filter(scene, parent, id, event)
                })
            {
                return true;
            }
            cur = parent;
        }
        false
    }

    /// Run the handler method matching the event kind.
    fn dispatch(&mut self, id: ItemId, event: &mut SceneEvent) {
        if let EventKind::KeyPress(key) = &event.kind
            && let Some(next) = tab_direction(key)
        {
            if !self.focus_next_prev_child(next) {
                event.ignore();
            }
            return;
        }
        let accepted = self.with_handler(id, |h, scene| match &event.kind {
            EventKind::FocusIn(reason) => {
                h.focus_in_event(scene, id, *reason);
                None
            }
            EventKind::FocusOut(reason) => {
                h.focus_out_event(scene, id, *reason);
                None
            }
            EventKind::HoverEnter(e) => {
                h.hover_enter_event(scene, id, e);
                None
            }
            EventKind::HoverMove(e) => {
                h.hover_move_event(scene, id, e);
                None
            }
            EventKind::HoverLeave(e) => {
                h.hover_leave_event(scene, id, e);
                None
            }
            EventKind::ContextMenu(e) => Some(h.context_menu_event(scene, id, e)),
            EventKind::DragEnter(e) => Some(h.drag_enter_event(scene, id, e)),
            EventKind::DragMove(e) => Some(h.drag_move_event(scene, id, e)),
            EventKind::DragLeave(e) => Some(h.drag_leave_event(scene, id, e)),
            EventKind::Drop(e) => Some(h.drop_event(scene, id, e)),
            EventKind::MousePress(e) => Some(h.mouse_press_event(scene, id, e)),
            EventKind::MouseMove(e) => Some(h.mouse_move_event(scene, id, e)),
            EventKind::MouseRelease(e) => Some(h.mouse_release_event(scene, id, e)),
            EventKind::MouseDoubleClick(e) => Some(h.mouse_double_click_event(scene, id, e)),
            EventKind::Wheel(e) => Some(h.wheel_event(scene, id, e)),
            EventKind::KeyPress(e) => Some(h.key_press_event(scene, id, e)),
            EventKind::KeyRelease(e) => Some(h.key_release_event(scene, id, e)),
            EventKind::InputMethod(e) => Some(h.input_method_event(scene, id, e)),
            EventKind::WindowActivate => {
                h.window_activate_event(scene, id);
                None
            }
            EventKind::WindowDeactivate => {
                h.window_deactivate_event(scene, id);
                None
            }
            kind @ (EventKind::GrabMouse
            | EventKind::UngrabMouse
            | EventKind::GrabKeyboard
            | EventKind::UngrabKeyboard) => {
                h.grab_event(scene, id, kind);
                None
            }
        });
        if let Some(accepted) = accepted {
            event.set_accepted(accepted);
        }

        if matches!(
            event.kind,
            EventKind::WindowActivate | EventKind::WindowDeactivate
        ) {
            self.propagate_activation(id, &event.kind);
        }
    }

    /// Pass panel activation down to visible non-panel children.
    fn propagate_activation(&mut self, id: ItemId, kind: &EventKind) {
        let Some(item) = self.item_opt(id) else {
            return;
        };
        if !item.visible {
            return;
        }
        let children: SmallVec<[ItemId; 8]> = item
            .children
            .iter()
            .copied()
            .filter(|&c| {
                let child = self.item(c);
                child.visible
                    && !child.is_panel()
                    && !child
                        .ancestor_flags
                        .contains(AncestorFlags::HANDLES_CHILD_EVENTS)
            })
            .collect();
        for child in children {
            self.send_event(child, &mut SceneEvent::new(kind.clone()));
        }
    }
}

#[derive(Clone, Copy)]
enum Grab {
    Mouse,
    Keyboard,
}

impl Grab {
    fn stack(self, scene: &mut Scene) -> &mut Vec<ItemId> {
        match self {
            Self::Mouse => &mut scene.mouse_grabbers,
            Self::Keyboard => &mut scene.keyboard_grabbers,
        }
    }

    fn events(self) -> (EventKind, EventKind) {
        match self {
            Self::Mouse => (EventKind::GrabMouse, EventKind::UngrabMouse),
            Self::Keyboard => (EventKind::GrabKeyboard, EventKind::UngrabKeyboard),
        }
    }
}

fn grab(scene: &mut Scene, id: ItemId, which: Grab) {
    let (grab_kind, ungrab_kind) = which.events();
    let stack = which.stack(scene);
    if stack.contains(&id) {
        if stack.last() != Some(&id) {
            log::warn!("{grab_kind:?}: {id:?} is blocked by a later grabber");
        }
        return;
    }
    let previous = stack.last().copied();
    stack.push(id);
    log::debug!("{grab_kind:?}: {id:?}");
    if let Some(previous) = previous {
        scene.send_event(previous, &mut SceneEvent::new(ungrab_kind));
    }
    scene.send_event(id, &mut SceneEvent::new(grab_kind));
}

fn ungrab(scene: &mut Scene, id: ItemId, dying: bool, which: Grab) {
    let (grab_kind, ungrab_kind) = which.events();
    let Some(index) = which.stack(scene).iter().position(|g| *g == id) else {
        return;
    };
    // Grabs taken after this one go first.
    if let Some(&above) = which.stack(scene).get(index + 1) {
        ungrab(scene, above, dying, which);
    }
    log::debug!("{ungrab_kind:?}: {id:?}");
    if !dying {
        scene.send_event(id, &mut SceneEvent::new(ungrab_kind));
    }
    which.stack(scene).retain(|g| *g != id);
    if !dying && let Some(&regained) = which.stack(scene).last() {
        scene.send_event(regained, &mut SceneEvent::new(grab_kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{DragEvent, HoverEvent, MouseEvent};
    use crate::handler::ItemHandler;
    use crate::types::FocusReason;
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::vec;
    use alloc::format;
    use core::cell::RefCell;
    use kurbo::Point;

    type Log = Rc<RefCell<Vec<String>>>;

    /// Logs every event it sees as `"<name> <what>"`.
    struct Tracer {
        name: &'static str,
        log: Log,
        consume: bool,
    }

    impl Tracer {
        fn new(name: &'static str, log: &Log) -> Self {
            Self {
                name,
                log: log.clone(),
                consume: false,
            }
        }

        fn push(&self, what: &str) {
            self.log.borrow_mut().push(format!("{} {what}", self.name));
        }
    }

    impl ItemHandler for Tracer {
        fn scene_event_filter(
            &mut self,
            _: &mut Scene,
            _: ItemId,
            _: ItemId,
            _: &mut SceneEvent,
        ) -> bool {
            self.push("filter");
            self.consume
        }
        fn mouse_press_event(&mut self, _: &mut Scene, _: ItemId, event: &MouseEvent) -> bool {
            self.push(&format!("press {:?}", (event.pos.x, event.pos.y)));
            true
        }
        fn hover_enter_event(&mut self, _: &mut Scene, _: ItemId, _: &HoverEvent) {
            self.push("hover-enter");
        }
        fn hover_move_event(&mut self, _: &mut Scene, _: ItemId, _: &HoverEvent) {
            self.push("hover-move");
        }
        fn hover_leave_event(&mut self, _: &mut Scene, _: ItemId, _: &HoverEvent) {
            self.push("hover-leave");
        }
        fn drag_enter_event(&mut self, _: &mut Scene, _: ItemId, _: &DragEvent) -> bool {
            self.push("drag-enter");
            true
        }
        fn drag_leave_event(&mut self, _: &mut Scene, _: ItemId, _: &DragEvent) -> bool {
            self.push("drag-leave");
            true
        }
        fn key_press_event(&mut self, _: &mut Scene, _: ItemId, _: &KeyEvent) -> bool {
            self.push("key");
            true
        }
        fn focus_out_event(&mut self, _: &mut Scene, _: ItemId, _: FocusReason) {
            self.push("focus-out");
        }
        fn window_activate_event(&mut self, _: &mut Scene, _: ItemId) {
            self.push("activate");
        }
        fn grab_event(&mut self, _: &mut Scene, _: ItemId, kind: &EventKind) {
            self.push(&format!("{kind:?}"));
        }
    }

    fn root(scene: &mut Scene) -> ItemId {
        let id = scene.create_item();
        scene.add_item(id).unwrap();
        id
    }

    fn child(scene: &mut Scene, parent: ItemId) -> ItemId {
        let id = scene.create_item();
        scene.set_parent(id, Some(parent)).unwrap();
        id
    }

    fn press() -> SceneEvent {
        SceneEvent::new(EventKind::MousePress(MouseEvent::left_at(Point::new(1.0, 1.0))))
    }

    fn drain(log: &Log) -> Vec<String> {
        core::mem::take(&mut *log.borrow_mut())
    }

    #[test]
    fn child_events_go_to_the_group_root() {
        let log = Log::default();
        let mut scene = Scene::new();
        let group = root(&mut scene);
        let inner = child(&mut scene, group);
        let leaf = child(&mut scene, inner);
        scene.set_pos(inner, Point::new(10.0, 0.0));
        scene.set_handles_child_events(group, true);
        scene.set_handles_child_events(inner, true);
        scene.set_handler(group, Tracer::new("group", &log));
        scene.set_handler(inner, Tracer::new("inner", &log));
        scene.set_handler(leaf, Tracer::new("leaf", &log));

        assert!(scene.send_event(leaf, &mut press()));
        assert_eq!(drain(&log), vec!["group press (11.0, 1.0)"]);

        let hover = HoverEvent::default();
        assert!(scene.send_event(leaf, &mut EventKind::HoverEnter(hover).into()));
        assert!(drain(&log).is_empty(), "enter/leave is swallowed, not forwarded");
        scene.send_event(leaf, &mut EventKind::HoverMove(hover).into());
        assert_eq!(drain(&log), vec!["group hover-move"]);
        assert!(scene.send_event(leaf, &mut EventKind::HoverLeave(hover).into()));
        let drag = DragEvent::default();
        assert!(scene.send_event(leaf, &mut EventKind::DragEnter(drag).into()));
        assert!(scene.send_event(inner, &mut EventKind::DragLeave(drag).into()));
        assert!(drain(&log).is_empty());

        // The group root itself still sees them.
        scene.send_event(group, &mut EventKind::HoverLeave(hover).into());
        scene.send_event(group, &mut EventKind::DragEnter(drag).into());
        scene.send_event(group, &mut EventKind::DragLeave(drag).into());
        assert_eq!(
            drain(&log),
            vec!["group hover-leave", "group drag-enter", "group drag-leave"]
        );
    }

    #[test]
    fn installed_filters_run_in_order_and_can_consume() {
        let log = Log::default();
        let mut scene = Scene::new();
        let watched = root(&mut scene);
        let first = root(&mut scene);
        let second = root(&mut scene);
        scene.set_handler(watched, Tracer::new("watched", &log));
        scene.set_handler(first, Tracer::new("first", &log));
        scene.set_handler(second, Tracer::new("second", &log));
        scene.install_scene_event_filter(watched, first).unwrap();
        scene.install_scene_event_filter(watched, second).unwrap();

        scene.send_event(watched, &mut press());
        assert_eq!(
            drain(&log),
            vec!["first filter", "second filter", "watched press (1.0, 1.0)"]
        );

        scene.set_handler(
            first,
            Tracer {
                consume: true,
                ..Tracer::new("first", &log)
            },
        );
        assert!(scene.send_event(watched, &mut press()));
        assert_eq!(drain(&log), vec!["first filter"]);

        scene.remove_scene_event_filter(watched, first);
        scene.remove_scene_event_filter(watched, second);
        scene.send_event(watched, &mut press());
        assert_eq!(drain(&log), vec!["watched press (1.0, 1.0)"]);

        let detached = scene.create_item();
        assert_eq!(
            scene.install_scene_event_filter(watched, detached),
            Err(SceneError::NotInScene(detached))
        );
    }

    #[test]
    fn ancestors_filter_descendant_events_nearest_first() {
        let log = Log::default();
        let mut scene = Scene::new();
        let outer = root(&mut scene);
        let inner = child(&mut scene, outer);
        let leaf = child(&mut scene, inner);
        scene.set_filters_child_events(outer, true);
        scene.set_filters_child_events(inner, true);
        scene.set_handler(outer, Tracer::new("outer", &log));
        scene.set_handler(inner, Tracer::new("inner", &log));
        scene.set_handler(leaf, Tracer::new("leaf", &log));

        scene.send_event(leaf, &mut press());
        assert_eq!(
            drain(&log),
            vec!["inner filter", "outer filter", "leaf press (1.0, 1.0)"]
        );
    }

    #[test]
    fn hidden_and_disabled_items() {
        let log = Log::default();
        let mut scene = Scene::new();
        let a = root(&mut scene);
        scene.set_handler(a, Tracer::new("a", &log));

        scene.set_enabled(a, false);
        let mut ev = press();
        assert!(!scene.send_event(a, &mut ev));
        assert!(!ev.is_accepted());

        scene.set_enabled(a, true);
        scene.hide(a);
        assert!(scene.send_event(a, &mut press()), "hidden items swallow events");
        scene.send_event(a, &mut EventKind::FocusOut(FocusReason::Other).into());
        assert_eq!(drain(&log), vec!["a focus-out"]);
    }

    #[test]
    fn tab_keys_move_focus() {
        let log = Log::default();
        let mut scene = Scene::new();
        let a = root(&mut scene);
        let b = root(&mut scene);
        scene.set_flags(a, ItemFlags::FOCUSABLE);
        scene.set_flags(b, ItemFlags::FOCUSABLE);
        scene.set_handler(a, Tracer::new("a", &log));
        scene.set_focus(a, FocusReason::Other);

        let tab = |modifiers| -> SceneEvent {
            EventKind::KeyPress(KeyEvent {
                key: Key::Tab,
                modifiers,
            })
            .into()
        };
        assert!(scene.send_event(a, &mut tab(Modifiers::empty())));
        assert_eq!(scene.focus_item(), Some(b));
        assert!(!scene.send_event(b, &mut tab(Modifiers::empty())), "no wrap");
        assert!(scene.send_event(b, &mut tab(Modifiers::SHIFT)));
        assert_eq!(scene.focus_item(), Some(a));

        drain(&log);
        scene.send_event(a, &mut tab(Modifiers::CTRL));
        assert_eq!(drain(&log), vec!["a key"]);
        assert_eq!(scene.focus_item(), Some(a));
    }

    #[test]
    fn activation_fans_out_to_visible_non_panel_children() {
        let log = Log::default();
        let mut scene = Scene::new();
        let top = root(&mut scene);
        let shown = child(&mut scene, top);
        let hidden = child(&mut scene, top);
        let panel = child(&mut scene, top);
        let grandchild = child(&mut scene, shown);
        scene.hide(hidden);
        scene.set_flags(panel, ItemFlags::PANEL);
        for (id, name) in [
            (top, "top"),
            (shown, "shown"),
            (hidden, "hidden"),
            (panel, "panel"),
            (grandchild, "grandchild"),
        ] {
            scene.set_handler(id, Tracer::new(name, &log));
        }

        scene.send_event(top, &mut EventKind::WindowActivate.into());
        assert_eq!(
            drain(&log),
            vec!["top activate", "shown activate", "grandchild activate"]
        );
    }

    #[test]
    fn grab_stack() {
        let log = Log::default();
        let mut scene = Scene::new();
        let a = root(&mut scene);
        let b = root(&mut scene);
        scene.set_handler(a, Tracer::new("a", &log));
        scene.set_handler(b, Tracer::new("b", &log));

        scene.grab_mouse(a).unwrap();
        scene.grab_mouse(b).unwrap();
        assert_eq!(scene.mouse_grabber_item(), Some(b));
        assert_eq!(
            drain(&log),
            vec!["a GrabMouse", "a UngrabMouse", "b GrabMouse"]
        );

        scene.ungrab_mouse(a);
        assert_eq!(scene.mouse_grabber_item(), None);
        assert_eq!(
            drain(&log),
            vec!["b UngrabMouse", "a GrabMouse", "a UngrabMouse"]
        );

        scene.grab_keyboard(a).unwrap();
        scene.hide(a);
        assert_eq!(scene.keyboard_grabber_item(), None, "hiding releases grabs");
        assert_eq!(scene.grab_keyboard(a), Err(SceneError::NotVisible(a)));
        let detached = scene.create_item();
        assert_eq!(scene.grab_mouse(detached), Err(SceneError::NotInScene(detached)));

        scene.grab_mouse(b).unwrap();
        scene.destroy_item(b);
        assert_eq!(scene.mouse_grabber_item(), None);
    }
}
