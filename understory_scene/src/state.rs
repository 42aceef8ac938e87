// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Inherited item state: visibility, enabled state, opacity, selection, and
//! traits.
//!
//! Visibility and enabled state are inherited: hiding (or disabling) an item
//! hides every descendant, and showing it again restores exactly the
//! descendants that were not explicitly hidden themselves. The explicit bit is
//! remembered even while an ancestor keeps the effective state off.

use alloc::vec::Vec;

use crate::change::{ItemChange, ItemChanged};
use crate::scene::Scene;
use crate::types::{AncestorFlags, FocusReason, ItemFlags, ItemId};

impl Scene {
    /// Effective visibility.
    pub fn is_visible(&self, id: ItemId) -> bool {
        self.item_opt(id).is_some_and(|n| n.visible)
    }

    /// Returns true if the item itself was hidden with
    /// [`Scene::set_visible`].
    pub fn is_explicitly_hidden(&self, id: ItemId) -> bool {
        self.item_opt(id).is_some_and(|n| n.explicitly_hidden)
    }

    /// Show or hide an item and its descendants.
    ///
    /// Hiding drops grabs and focus held inside the subtree but keeps the
    /// selection. Showing an item under a hidden parent only records the
    /// request.
    pub fn set_visible(&mut self, id: ItemId, visible: bool) {
        let Some(item) = self.item_opt(id) else {
            return;
        };
        let hidden_by_panel = item.is_panel();
        self.set_visible_helper(id, visible, true, true, hidden_by_panel);
    }

    /// Shorthand for `set_visible(id, true)`.
    pub fn show(&mut self, id: ItemId) {
        self.set_visible(id, true);
    }

    /// Shorthand for `set_visible(id, false)`.
    pub fn hide(&mut self, id: ItemId) {
        self.set_visible(id, false);
    }

    /// Effective enabled state.
    pub fn is_enabled(&self, id: ItemId) -> bool {
        self.item_opt(id).is_some_and(|n| n.enabled)
    }

    /// Enable or disable an item and its descendants.
    ///
    /// Disabling drops the mouse grab, focus, and selection.
    pub fn set_enabled(&mut self, id: ItemId, enabled: bool) {
        if self.item_opt(id).is_none() {
            return;
        }
        self.set_enabled_helper(id, enabled, true, true);
    }

    /// Local opacity in `0..=1`.
    pub fn opacity(&self, id: ItemId) -> Option<f64> {
        self.item_opt(id).map(|n| n.opacity)
    }

    /// Set the local opacity. The value is clamped to `0..=1` after the
    /// change hook has seen it.
    pub fn set_opacity(&mut self, id: ItemId, opacity: f64) {
        if self.item_opt(id).is_none() {
            return;
        }
        let requested = self
            .item_change(id, ItemChange::Opacity(opacity))
            .as_f64()
            .unwrap_or(opacity);
        let opacity = requested.clamp(0.0, 1.0);
        if opacity == self.item(id).opacity {
            return;
        }
        self.item_mut(id).opacity = opacity;
        self.item_changed(id, ItemChanged::Opacity(opacity));
        self.mark_dirty(id, None, true, false);
    }

    /// Opacity after composing with the ancestors.
    ///
    /// Composition stops at an item that ignores its parent's opacity, or at a
    /// parent that does not propagate its opacity to children.
    pub fn effective_opacity(&self, id: ItemId) -> Option<f64> {
        let item = self.item_opt(id)?;
        let mut opacity = item.opacity;
        let mut flags = item.flags;
        let mut cur = item.parent;
        while let Some(p) = cur {
            let parent = self.item(p);
            if flags.contains(ItemFlags::IGNORES_PARENT_OPACITY)
                || parent
                    .flags
                    .contains(ItemFlags::DOESNT_PROPAGATE_OPACITY_TO_CHILDREN)
            {
                break;
            }
            opacity *= parent.opacity;
            flags = parent.flags;
            cur = parent.parent;
        }
        Some(opacity)
    }

    /// Selection state.
    pub fn is_selected(&self, id: ItemId) -> bool {
        self.item_opt(id).is_some_and(|n| n.selected)
    }

    /// Select or deselect an item.
    ///
    /// Only selectable, enabled, visible items can be selected; any other
    /// item is deselected instead.
    pub fn set_selected(&mut self, id: ItemId, selected: bool) {
        let Some(item) = self.item_opt(id) else {
            return;
        };
        let selected = selected
            && item.flags.contains(ItemFlags::SELECTABLE)
            && item.enabled
            && item.visible;
        if item.selected == selected {
            return;
        }
        let selected = self
            .item_change(id, ItemChange::Selected(selected))
            .as_bool()
            .unwrap_or(selected);
        if self.item(id).selected == selected {
            return;
        }
        self.item_mut(id).selected = selected;
        self.update(id, None);
        self.item_changed(id, ItemChanged::Selected(selected));
    }

    /// Selected items of the scene, in arena order.
    pub fn selected_items(&self) -> Vec<ItemId> {
        self.live_items()
            .filter(|&id| {
                let item = self.item(id);
                item.in_scene && item.selected
            })
            .collect()
    }

    /// Deselect every item of the scene.
    pub fn clear_selection(&mut self) {
        for id in self.selected_items() {
            self.set_selected(id, false);
        }
    }

    /// Replace the item's traits.
    ///
    /// Dropping [`ItemFlags::FOCUSABLE`] clears focus held by the item and
    /// dropping [`ItemFlags::SELECTABLE`] deselects it. Traits that contribute
    /// ancestor flags are pushed down to the descendants.
    pub fn set_flags(&mut self, id: ItemId, flags: ItemFlags) {
        match self.item_opt(id) {
            Some(item) if item.flags != flags => {}
            _ => return,
        }
        let mut flags = self
            .item_change(id, ItemChange::Flags(flags))
            .as_flags()
            .unwrap_or(flags);
        let old = self.item(id).flags;
        if old == flags {
            return;
        }
        let geometry = ItemFlags::CLIPS_CHILDREN_TO_SHAPE
            | ItemFlags::CLIPS_TO_SHAPE
            | ItemFlags::IGNORES_TRANSFORMATIONS
            | ItemFlags::SELECTABLE;
        if (old ^ flags).intersects(geometry) {
            // Repaint the old extent.
            self.mark_dirty(id, None, true, false);
        }
        self.item_mut(id).flags = flags;

        if !flags.contains(ItemFlags::FOCUSABLE) && self.has_focus(id) {
            self.clear_focus(id);
        }
        if !flags.contains(ItemFlags::FOCUS_SCOPE)
            && let Some(fsi) = self.item_mut(id).focus_scope_item.take()
        {
            self.item_changed(fsi, ItemChanged::FocusScopeItem(false));
        }
        if !flags.contains(ItemFlags::SELECTABLE) && self.is_selected(id) {
            self.set_selected(id, false);
        }

        let changed = old ^ flags;
        if changed.contains(ItemFlags::CLIPS_CHILDREN_TO_SHAPE) {
            self.update_ancestor_flag(id, AncestorFlags::CLIPS_CHILDREN);
            // Children bounds are clipped to the item's own bounds.
            self.item(id).dirty_children_bounding_rect.set(true);
            self.mark_parent_dirty(id);
        }
        for flag in [
            AncestorFlags::CONTAINS_CHILDREN,
            AncestorFlags::IGNORES_TRANSFORMATIONS,
            AncestorFlags::HANDLES_CHILD_EVENTS,
            AncestorFlags::FILTERS_CHILD_EVENTS,
        ] {
            if changed.intersects(flag.trait_flag()) {
                self.update_ancestor_flag(id, flag);
            }
        }

        if changed.contains(ItemFlags::NEGATIVE_Z_STACKS_BEHIND_PARENT) {
            let z = self.item(id).z;
            flags.set(ItemFlags::STACKS_BEHIND_PARENT, z < 0.0);
            self.item_mut(id).flags = flags;
        }
        if (old ^ flags).contains(ItemFlags::STACKS_BEHIND_PARENT) {
            let parent = self.item(id).parent;
            if parent.is_some() || self.item(id).in_scene {
                self.sort_siblings(parent);
            }
        }

        if self.item(id).in_scene {
            if changed.contains(ItemFlags::SENDS_SCENE_POSITION_CHANGES) {
                if flags.contains(ItemFlags::SENDS_SCENE_POSITION_CHANGES) {
                    self.scene_pos_items.push(id);
                } else {
                    self.scene_pos_items.retain(|s| *s != id);
                }
            }
            self.mark_dirty(id, None, true, false);
        }
        self.item_changed(id, ItemChanged::Flags(flags));
    }

    /// Turn a single trait on or off, keeping the others.
    pub fn set_flag(&mut self, id: ItemId, flag: ItemFlags, enabled: bool) {
        let Some(mut flags) = self.flags(id) else {
            return;
        };
        flags.set(flag, enabled);
        self.set_flags(id, flags);
    }

    // --- internals ---

    /// Apply a visibility change to `id` and cascade it to its children.
    ///
    /// `explicit` records user intent; `update` schedules repaints;
    /// `hidden_by_panel` keeps the focus chain intact so the panel can
    /// restore focus when it is shown again.
    pub(crate) fn set_visible_helper(
        &mut self,
        id: ItemId,
        visible: bool,
        explicit: bool,
        update: bool,
        hidden_by_panel: bool,
    ) {
        if explicit {
            self.item_mut(id).explicitly_hidden = !visible;
        }
        let item = self.item(id);
        if item.visible == visible {
            return;
        }
        if visible && item.parent.is_some_and(|p| !self.item(p).visible) {
            return;
        }
        let visible = self
            .item_change(id, ItemChange::Visible(visible))
            .as_bool()
            .unwrap_or(visible);
        if self.item(id).visible == visible {
            return;
        }
        self.item_mut(id).visible = visible;

        if update {
            self.purge_cache(id);
            self.mark_dirty(id, None, false, true);
        }

        let in_scene = self.item(id).in_scene;
        let had_focus = self.has_focus(id);
        if !visible && in_scene {
            if self.mouse_grabbers.contains(&id) {
                self.ungrab_mouse_helper(id, false);
            }
            if self.keyboard_grabbers.contains(&id) {
                self.ungrab_keyboard_helper(id, false);
            }
            if had_focus {
                self.clear_focus_helper(id, false, hidden_by_panel);
            }
        }

        let flags = self.item(id).flags;
        let bounds_children = flags
            .intersects(ItemFlags::CLIPS_CHILDREN_TO_SHAPE | ItemFlags::CONTAINS_CHILDREN_IN_SHAPE)
            && !flags.contains(ItemFlags::HAS_NO_CONTENTS);
        let update_children = update && !bounds_children;
        let children = self.item(id).children.clone();
        for child in children {
            if !self.is_alive(child) {
                continue;
            }
            if !visible || !self.item(child).explicitly_hidden {
                self.set_visible_helper(child, visible, false, update_children, hidden_by_panel);
            }
        }

        let parent = self.item(id).parent;
        if in_scene && self.item(id).is_panel() {
            if visible {
                if parent.is_some_and(|p| self.is_active(p)) {
                    self.set_item_active(id, true);
                }
            } else if self.is_active(id) {
                self.set_active_panel_helper(parent, false);
            }
        }

        if in_scene {
            if visible {
                self.restore_focus_on_show(id);
            } else if had_focus {
                let mut p = parent;
                while let Some(s) = p {
                    let scope = self.item(s);
                    if scope.is_focus_scope() {
                        if scope.visible {
                            self.set_focus_helper(s, FocusReason::Other, true, true);
                        }
                        break;
                    }
                    p = scope.parent;
                }
            }
        }

        self.item_changed(id, ItemChanged::Visible(visible));
    }

    /// Give focus back to what the item's focus scope or focus chain
    /// remembers after it was shown.
    fn restore_focus_on_show(&mut self, id: ItemId) {
        let mut p = self.item(id).parent;
        while let Some(s) = p {
            let scope = self.item(s);
            if scope.is_focus_scope() {
                if let Some(mut fsi) = scope.focus_scope_item
                    && (fsi == id || self.is_ancestor_of(id, fsi))
                {
                    while let Some(next) = self.item(fsi).focus_scope_item
                        && self.item_opt(next).is_some_and(|n| n.visible)
                    {
                        fsi = next;
                    }
                    self.set_focus_helper(fsi, FocusReason::Other, true, false);
                    return;
                }
                break;
            }
            p = scope.parent;
        }
        let item = self.item(id);
        if let Some(sub) = item.sub_focus_item
            && Some(sub) != self.focus_item
        {
            self.set_focus_item(Some(sub), FocusReason::Other);
        } else if item.is_focus_scope()
            && self.focus_item.is_none()
            && self.last_focus_item.is_some_and(|l| self.is_ancestor_of(id, l))
        {
            self.set_focus(id, FocusReason::Other);
        }
    }

    pub(crate) fn set_enabled_helper(
        &mut self,
        id: ItemId,
        enabled: bool,
        explicit: bool,
        update: bool,
    ) {
        if explicit {
            self.item_mut(id).explicitly_disabled = !enabled;
        }
        if self.item(id).enabled == enabled {
            return;
        }
        let enabled = self
            .item_change(id, ItemChange::Enabled(enabled))
            .as_bool()
            .unwrap_or(enabled);
        if !self.is_alive(id) {
            return;
        }
        if explicit {
            self.item_mut(id).explicitly_disabled = !enabled;
        }
        if self.item(id).enabled == enabled {
            return;
        }
        if !enabled {
            if self.item(id).in_scene && self.mouse_grabber_item() == Some(id) {
                self.ungrab_mouse_helper(id, false);
            }
            if self.has_focus(id) {
                self.clear_focus(id);
            }
            if self.item(id).selected {
                self.set_selected(id, false);
            }
        }
        self.item_mut(id).enabled = enabled;
        if update {
            self.update(id, None);
        }
        let children = self.item(id).children.clone();
        for child in children {
            if !self.is_alive(child) {
                continue;
            }
            if !enabled || !self.item(child).explicitly_disabled {
                self.set_enabled_helper(child, enabled, false, true);
            }
        }
        self.item_changed(id, ItemChanged::Enabled(enabled));
    }
}
