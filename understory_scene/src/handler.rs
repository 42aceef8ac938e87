// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-item behavior: change hooks, event filters, and event handlers.
//!
//! Every method has a default, so a handler only overrides what it cares
//! about. [`DefaultHandler`] is the handler used for items without one.
//!
//! Event methods receive the scene mutably and may call back into it. While a
//! handler runs it is detached from its item; re-entrant delivery to the same
//! item reaches [`DefaultHandler`] instead.
//!
//! Handlers that return `bool` report whether they accepted the event.

use kurbo::Point;
use smallvec::SmallVec;

use crate::change::{ItemChange, ItemChanged};
use crate::event::{
    ContextMenuEvent, DragEvent, EventKind, HoverEvent, InputMethodEvent, KeyEvent, Modifiers,
    MouseButtons, MouseEvent, SceneEvent, WheelEvent,
};
use crate::scene::Scene;
use crate::types::{FocusReason, ItemFlags, ItemId};

/// Behavior attached to an item.
pub trait ItemHandler {
    /// A change is about to be applied; return the value to apply instead.
    ///
    /// Returning a different variant than `change` keeps the request as is.
    fn item_change(&mut self, _scene: &Scene, _item: ItemId, change: ItemChange) -> ItemChange {
        change
    }

    /// A change was applied.
    fn item_changed(&mut self, _scene: &Scene, _item: ItemId, _change: ItemChanged) {}

    /// Inspect an event bound for `watched` before it gets there.
    ///
    /// Called on `watcher` when it was installed as a filter on `watched`, or
    /// when it filters child events and `watched` is a descendant. Returning
    /// true consumes the event.
    fn scene_event_filter(
        &mut self,
        _scene: &mut Scene,
        _watcher: ItemId,
        _watched: ItemId,
        _event: &mut SceneEvent,
    ) -> bool {
        false
    }

    /// The item gained focus. Repaints the item by default.
    fn focus_in_event(&mut self, scene: &mut Scene, item: ItemId, _reason: FocusReason) {
        scene.update(item, None);
    }

    /// The item lost focus. Repaints the item by default.
    fn focus_out_event(&mut self, scene: &mut Scene, item: ItemId, _reason: FocusReason) {
        scene.update(item, None);
    }

    /// The pointer entered the item. Repaints the item by default.
    fn hover_enter_event(&mut self, scene: &mut Scene, item: ItemId, _event: &HoverEvent) {
        scene.update(item, None);
    }

    /// The pointer moved over the item.
    fn hover_move_event(&mut self, _scene: &mut Scene, _item: ItemId, _event: &HoverEvent) {}

    /// The pointer left the item. Repaints the item by default.
    fn hover_leave_event(&mut self, scene: &mut Scene, item: ItemId, _event: &HoverEvent) {
        scene.update(item, None);
    }

    /// A mouse button went down over the item.
    ///
    /// By default a left press selects a selectable item (clearing the rest
    /// of the selection unless Ctrl is held); presses on items that are
    /// neither selectable nor movable are ignored.
    fn mouse_press_event(&mut self, scene: &mut Scene, item: ItemId, event: &MouseEvent) -> bool {
        default_mouse_press(scene, item, event)
    }

    /// The mouse moved while the item held the grab.
    ///
    /// By default a left drag moves a movable item, together with the rest of
    /// the selection when the item is selected.
    fn mouse_move_event(&mut self, scene: &mut Scene, item: ItemId, event: &MouseEvent) -> bool {
        default_mouse_move(scene, item, event)
    }

    /// A mouse button went up.
    ///
    /// By default a Ctrl-click that did not move toggles the selection of a
    /// selectable item.
    fn mouse_release_event(&mut self, scene: &mut Scene, item: ItemId, event: &MouseEvent) -> bool {
        default_mouse_release(scene, item, event)
    }

    /// Double click. Treated as a press by default.
    fn mouse_double_click_event(
        &mut self,
        scene: &mut Scene,
        item: ItemId,
        event: &MouseEvent,
    ) -> bool {
        self.mouse_press_event(scene, item, event)
    }

    /// Wheel rotation. Ignored by default.
    fn wheel_event(&mut self, _scene: &mut Scene, _item: ItemId, _event: &WheelEvent) -> bool {
        false
    }

    /// Context menu request. Ignored by default.
    fn context_menu_event(
        &mut self,
        _scene: &mut Scene,
        _item: ItemId,
        _event: &ContextMenuEvent,
    ) -> bool {
        false
    }

    /// A drag entered the item. Ignored by default.
    fn drag_enter_event(&mut self, _scene: &mut Scene, _item: ItemId, _event: &DragEvent) -> bool {
        false
    }

    /// A drag moved over the item. Ignored by default.
    fn drag_move_event(&mut self, _scene: &mut Scene, _item: ItemId, _event: &DragEvent) -> bool {
        false
    }

    /// A drag left the item. Ignored by default.
    fn drag_leave_event(&mut self, _scene: &mut Scene, _item: ItemId, _event: &DragEvent) -> bool {
        false
    }

    /// A drag was dropped on the item. Ignored by default.
    fn drop_event(&mut self, _scene: &mut Scene, _item: ItemId, _event: &DragEvent) -> bool {
        false
    }

    /// Key press. Tab and Backtab never get here. Ignored by default.
    fn key_press_event(&mut self, _scene: &mut Scene, _item: ItemId, _event: &KeyEvent) -> bool {
        false
    }

    /// Key release. Ignored by default.
    fn key_release_event(&mut self, _scene: &mut Scene, _item: ItemId, _event: &KeyEvent) -> bool {
        false
    }

    /// Input method composition. Ignored by default.
    fn input_method_event(
        &mut self,
        _scene: &mut Scene,
        _item: ItemId,
        _event: &InputMethodEvent,
    ) -> bool {
        false
    }

    /// The item's panel, or the scene, became active.
    fn window_activate_event(&mut self, _scene: &mut Scene, _item: ItemId) {}

    /// The item's panel, or the scene, became inactive.
    fn window_deactivate_event(&mut self, _scene: &mut Scene, _item: ItemId) {}

    /// Mouse or keyboard grab gained or lost (one of the grab kinds of
    /// [`EventKind`]).
    fn grab_event(&mut self, _scene: &mut Scene, _item: ItemId, _kind: &EventKind) {}
}

/// Handler with the stock behavior of every method.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultHandler;

impl ItemHandler for DefaultHandler {}

fn default_mouse_press(scene: &mut Scene, item: ItemId, event: &MouseEvent) -> bool {
    let flags = scene.flags(item).unwrap_or_default();
    if event.button == MouseButtons::LEFT && flags.contains(ItemFlags::SELECTABLE) {
        if !event.modifiers.contains(Modifiers::CTRL) && !scene.is_selected(item) {
            scene.clear_selection();
            scene.set_selected(item, true);
        }
        true
    } else {
        flags.contains(ItemFlags::MOVABLE)
    }
}

fn default_mouse_move(scene: &mut Scene, item: ItemId, event: &MouseEvent) -> bool {
    let flags = scene.flags(item).unwrap_or_default();
    if !event.buttons.contains(MouseButtons::LEFT) || !flags.contains(ItemFlags::MOVABLE) {
        return false;
    }
    let movers: SmallVec<[ItemId; 8]> = if scene.is_selected(item) {
        let selected = scene.selected_items();
        selected
            .iter()
            .copied()
            .filter(|&s| scene.flags(s).is_some_and(|f| f.contains(ItemFlags::MOVABLE)))
            // An item moves with its ancestor; moving it again would double the delta.
            .filter(|&s| {
                !selected
                    .iter()
                    .any(|&other| other != s && scene.is_ancestor_of(other, s))
            })
            .collect()
    } else {
        SmallVec::from_slice(&[item])
    };
    for m in movers {
        let (Some(now), Some(before)) = (
            scene_to_parent_space(scene, m, event.scene_pos),
            scene_to_parent_space(scene, m, event.last_scene_pos),
        ) else {
            continue;
        };
        scene.move_by(m, now - before);
    }
    true
}

fn default_mouse_release(scene: &mut Scene, item: ItemId, event: &MouseEvent) -> bool {
    let flags = scene.flags(item).unwrap_or_default();
    if event.button == MouseButtons::LEFT
        && flags.contains(ItemFlags::SELECTABLE)
        && event.modifiers.contains(Modifiers::CTRL)
        && event.pos == event.button_down_pos
    {
        let selected = scene.is_selected(item);
        scene.set_selected(item, !selected);
    }
    true
}

fn scene_to_parent_space(scene: &Scene, item: ItemId, scene_pos: Point) -> Option<Point> {
    match scene.parent(item) {
        Some(parent) => scene.map_from_scene(parent, scene_pos),
        None => Some(scene_pos),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Rect;

    fn selectable(scene: &mut Scene) -> ItemId {
        let id = scene.create_item();
        scene.set_bounding_rect(id, Rect::new(0.0, 0.0, 10.0, 10.0));
        scene.set_flags(id, ItemFlags::SELECTABLE | ItemFlags::MOVABLE);
        scene.add_item(id).unwrap();
        id
    }

    #[test]
    fn press_selects_and_clears_others() {
        let mut scene = Scene::new();
        let a = selectable(&mut scene);
        let b = selectable(&mut scene);
        let mut h = DefaultHandler;
        assert!(h.mouse_press_event(&mut scene, a, &MouseEvent::left_at(Point::ZERO)));
        assert!(scene.is_selected(a));
        h.mouse_press_event(&mut scene, b, &MouseEvent::left_at(Point::ZERO));
        assert!(!scene.is_selected(a));
        assert!(scene.is_selected(b));
    }

    #[test]
    fn ctrl_click_toggles_selection() {
        let mut scene = Scene::new();
        let a = selectable(&mut scene);
        let b = selectable(&mut scene);
        scene.set_selected(a, true);
        let mut ev = MouseEvent::left_at(Point::ZERO);
        ev.modifiers = Modifiers::CTRL;
        let mut h = DefaultHandler;
        h.mouse_press_event(&mut scene, b, &ev);
        h.mouse_release_event(&mut scene, b, &ev);
        assert!(scene.is_selected(a), "ctrl keeps the rest of the selection");
        assert!(scene.is_selected(b));
        h.mouse_release_event(&mut scene, b, &ev);
        assert!(!scene.is_selected(b));
    }

    #[test]
    fn drag_moves_the_selection_once() {
        let mut scene = Scene::new();
        let a = selectable(&mut scene);
        let b = selectable(&mut scene);
        let child = scene.create_item();
        scene.set_flags(child, ItemFlags::SELECTABLE | ItemFlags::MOVABLE);
        scene.set_parent(child, Some(a)).unwrap();
        scene.set_pos(child, Point::new(1.0, 1.0));
        for id in [a, b, child] {
            scene.set_selected(id, true);
        }
        let mut ev = MouseEvent::left_at(Point::new(5.0, 5.0));
        ev.last_scene_pos = Point::new(2.0, 1.0);
        assert!(DefaultHandler.mouse_move_event(&mut scene, a, &ev));
        assert_eq!(scene.pos(a), Some(Point::new(3.0, 4.0)));
        assert_eq!(scene.pos(b), Some(Point::new(3.0, 4.0)));
        assert_eq!(
            scene.pos(child),
            Some(Point::new(1.0, 1.0)),
            "children ride along with their parent"
        );
    }

    #[test]
    fn inert_items_ignore_presses() {
        let mut scene = Scene::new();
        let a = scene.create_item();
        assert!(!DefaultHandler.mouse_press_event(&mut scene, a, &MouseEvent::left_at(Point::ZERO)));
        assert!(!DefaultHandler.mouse_move_event(&mut scene, a, &MouseEvent::left_at(Point::ZERO)));
    }
}
