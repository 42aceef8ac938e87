// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree structure: scene membership, reparenting, ancestor flags, depth, and
//! stacking order.

use alloc::vec::Vec;
use smallvec::SmallVec;

use crate::change::{ItemChange, ItemChanged};
use crate::error::{SceneError, report};
use crate::scene::Scene;
use crate::types::{AncestorFlags, FocusReason, ItemFlags, ItemId};

impl Scene {
    /// Register a root item (and its subtree) with the scene.
    ///
    /// An item whose parent is outside the scene is detached from that parent
    /// first. Adding an item that is already in the scene does nothing.
    pub fn add_item(&mut self, id: ItemId) -> Result<(), SceneError> {
        let Some(item) = self.item_opt(id) else {
            return Err(report("add_item", SceneError::StaleItem(id)));
        };
        if item.in_scene {
            return Ok(());
        }
        if item.parent.is_some() {
            self.set_parent_helper(id, None);
        }
        self.register_top_level(id);
        self.join_scene(id);
        Ok(())
    }

    /// Unregister an item (and its subtree) from the scene without
    /// destroying it. A child item is detached from its parent.
    pub fn remove_item(&mut self, id: ItemId) -> Result<(), SceneError> {
        let Some(item) = self.item_opt(id) else {
            return Err(report("remove_item", SceneError::StaleItem(id)));
        };
        if !item.in_scene {
            return Err(report("remove_item", SceneError::NotInScene(id)));
        }
        if item.parent.is_some() {
            self.set_parent_helper(id, None);
        }
        self.leave_scene(id);
        Ok(())
    }

    /// Destroy an item and its subtree, children first.
    ///
    /// Every reference to the destroyed items (focus, focus proxies, focus
    /// scopes, grabs, filters, custom data) is dropped. Change hooks of the
    /// dying items are not run.
    pub fn destroy_item(&mut self, id: ItemId) {
        if !self.is_alive(id) {
            return;
        }
        self.item_mut(id).in_destructor = true;
        self.item_mut(id).cache = None;
        self.clear_focus_helper(id, true, false);
        self.drop_focus_proxy(id);
        self.forget_focus_scope_items(&[id], false);
        let children = self.item(id).children.clone();
        for child in children {
            self.destroy_item(child);
        }
        if self.item(id).in_scene {
            self.leave_scene(id);
        } else {
            self.reset_focus_proxy(id);
            self.clear_sub_focus(id, None);
        }
        if let Some(parent) = self.item(id).parent {
            self.mark_parent_dirty(id);
            self.item_mut(parent).children.retain(|c| *c != id);
            self.item_changed(parent, ItemChanged::ChildRemoved(id));
        }
        self.top_level.retain(|t| *t != id);
        self.free_slot(id);
    }

    /// Move an item (and its subtree) under `parent`, or make it a root.
    ///
    /// The parent change is offered to the item's change hook, which may pick
    /// a different parent. Setting the current parent again does nothing.
    /// Fails without changing anything if the item would become its own
    /// ancestor.
    pub fn set_parent(&mut self, id: ItemId, parent: Option<ItemId>) -> Result<(), SceneError> {
        self.check_parent(id, parent)?;
        if self.item(id).parent == parent {
            return Ok(());
        }
        let parent = self
            .item_change(id, ItemChange::Parent(parent))
            .as_parent()
            .unwrap_or(parent);
        self.check_parent(id, parent)?;
        self.set_parent_helper(id, parent);
        Ok(())
    }

    /// Root of the tree containing the item.
    pub fn top_level_item(&self, id: ItemId) -> Option<ItemId> {
        let mut cur = self.item_opt(id).map(|_| id)?;
        while let Some(p) = self.item(cur).parent {
            cur = p;
        }
        Some(cur)
    }

    /// Nearest panel at or above the item.
    pub fn panel(&self, id: ItemId) -> Option<ItemId> {
        let mut cur = self.item_opt(id).map(|_| id);
        while let Some(c) = cur {
            let item = self.item(c);
            if item.is_panel() {
                return Some(c);
            }
            cur = item.parent;
        }
        None
    }

    /// Number of ancestors of the item.
    pub fn depth(&self, id: ItemId) -> Option<u32> {
        self.item_opt(id)?;
        Some(self.depth_of(id))
    }

    /// Returns true if `ancestor` is a proper ancestor of `id`.
    pub fn is_ancestor_of(&self, ancestor: ItemId, id: ItemId) -> bool {
        if ancestor == id || !self.is_alive(ancestor) || !self.is_alive(id) {
            return false;
        }
        let (da, di) = (self.depth_of(ancestor), self.depth_of(id));
        if di <= da {
            return false;
        }
        let mut cur = id;
        for _ in 0..(di - da) {
            match self.item(cur).parent {
                Some(p) => cur = p,
                None => return false,
            }
        }
        cur == ancestor
    }

    /// Lowest item that is an ancestor of (or equal to) both items.
    pub fn common_ancestor(&self, a: ItemId, b: ItemId) -> Option<ItemId> {
        if !self.is_alive(a) || !self.is_alive(b) {
            return None;
        }
        if a == b {
            return Some(a);
        }
        let (mut x, mut y) = (a, b);
        let (mut dx, mut dy) = (self.depth_of(a), self.depth_of(b));
        while dx > dy {
            x = self.item(x).parent?;
            dx -= 1;
        }
        while dy > dx {
            y = self.item(y).parent?;
            dy -= 1;
        }
        while x != y {
            x = self.item(x).parent?;
            y = self.item(y).parent?;
        }
        Some(x)
    }

    /// Stacking value among siblings; higher is on top.
    pub fn z_value(&self, id: ItemId) -> Option<f64> {
        self.item_opt(id).map(|n| n.z)
    }

    /// Set the stacking value among siblings.
    ///
    /// Items with [`ItemFlags::NEGATIVE_Z_STACKS_BEHIND_PARENT`] stack behind
    /// their parent while their z value is negative.
    pub fn set_z_value(&mut self, id: ItemId, z: f64) {
        if self.item_opt(id).is_none() {
            return;
        }
        let z = self
            .item_change(id, ItemChange::ZValue(z))
            .as_f64()
            .unwrap_or(z);
        if z == self.item(id).z {
            return;
        }
        self.item_mut(id).z = z;
        let parent = self.item(id).parent;
        self.sort_siblings(parent);
        self.mark_dirty(id, None, true, false);
        self.item_changed(id, ItemChanged::ZValue(z));
        let flags = self.item(id).flags;
        if flags.contains(ItemFlags::NEGATIVE_Z_STACKS_BEHIND_PARENT) {
            let mut next = flags;
            next.set(ItemFlags::STACKS_BEHIND_PARENT, z < 0.0);
            self.set_flags(id, next);
        }
    }

    /// Restack `id` directly below `sibling`, keeping both z values.
    ///
    /// Only affects the order among items with equal z values.
    pub fn stack_before(&mut self, id: ItemId, sibling: ItemId) -> Result<(), SceneError> {
        if !self.is_alive(id) {
            return Err(report("stack_before", SceneError::StaleItem(id)));
        }
        if id == sibling {
            return Ok(());
        }
        let not_sibling = || SceneError::NotASibling { item: id, sibling };
        let Some(other) = self.item_opt(sibling) else {
            return Err(report("stack_before", not_sibling()));
        };
        let parent = self.item(id).parent;
        if other.parent != parent || (parent.is_none() && !(other.in_scene && self.item(id).in_scene)) {
            return Err(report("stack_before", not_sibling()));
        }
        let mut siblings: Vec<ItemId> = match parent {
            Some(p) => self.item(p).children.clone(),
            None => self.top_level.clone(),
        };
        // Renumber in insertion order so indices are sequential.
        siblings.sort_by_key(|s| self.item(*s).sibling_index);
        for (i, s) in siblings.iter().enumerate() {
            self.item_mut(*s).sibling_index = i;
        }
        let target = self.item(sibling).sibling_index;
        let mine = self.item(id).sibling_index;
        if mine >= target {
            for s in &siblings {
                let item = self.item_mut(*s);
                if *s != id && item.sibling_index >= target && item.sibling_index < mine {
                    item.sibling_index += 1;
                }
            }
            self.item_mut(id).sibling_index = target;
        }
        self.sort_siblings(parent);
        self.mark_dirty(id, None, true, false);
        Ok(())
    }

    /// Make the item receive its descendants' events in their place.
    pub fn set_handles_child_events(&mut self, id: ItemId, enabled: bool) {
        self.set_flag(id, ItemFlags::HANDLES_CHILD_EVENTS, enabled);
    }

    /// Let the item's event filter see its descendants' events first.
    pub fn set_filters_child_events(&mut self, id: ItemId, enabled: bool) {
        self.set_flag(id, ItemFlags::FILTERS_CHILD_EVENTS, enabled);
    }

    // --- internals ---

    fn check_parent(&self, id: ItemId, parent: Option<ItemId>) -> Result<(), SceneError> {
        if !self.is_alive(id) {
            return Err(report("set_parent", SceneError::StaleItem(id)));
        }
        if let Some(p) = parent {
            if !self.is_alive(p) {
                return Err(report("set_parent", SceneError::StaleItem(p)));
            }
            if p == id {
                return Err(report("set_parent", SceneError::SelfParent(id)));
            }
            if self.is_ancestor_of(id, p) {
                return Err(report(
                    "set_parent",
                    SceneError::ParentIsDescendant { item: id, parent: p },
                ));
            }
        }
        Ok(())
    }

    /// Reparent without consulting the item's hook.
    pub(crate) fn set_parent_helper(&mut self, id: ItemId, new_parent: Option<ItemId>) {
        let old_parent = self.item(id).parent;
        if old_parent == new_parent {
            return;
        }
        let was_in_scene = self.item(id).in_scene;
        let dying = self.item(id).in_destructor;

        // The old ancestors must not point at the focused descendant anymore.
        if let (Some(focused), Some(op)) = (self.item(id).sub_focus_item, old_parent) {
            self.clear_sub_focus(focused, Some(op));
        }
        if !dying {
            self.prepare_geometry_change(id);
        }
        if let Some(op) = old_parent {
            self.item_mut(op).children.retain(|c| *c != id);
            self.item_changed(op, ItemChanged::ChildRemoved(id));
        }
        if was_in_scene && !dying {
            if new_parent.is_none() {
                self.register_top_level(id);
            } else if old_parent.is_none() {
                self.top_level.retain(|t| *t != id);
            }
        }

        // Old focus scope: forget remembered items inside the moving subtree.
        let mut parent_scope_item = None;
        let mut p = old_parent;
        while let Some(s) = p {
            if self.item(s).is_focus_scope() {
                if let Some(fsi) = self.item(s).focus_scope_item
                    && (fsi == id || self.is_ancestor_of(id, fsi))
                {
                    parent_scope_item = Some(fsi);
                    self.item_mut(s).focus_scope_item = None;
                    self.item_changed(fsi, ItemChanged::FocusScopeItem(false));
                }
                break;
            }
            p = self.item(s).parent;
        }

        // New focus scope: remember the moving focus, or what the old scope had.
        let sub_focus = self.item(id).sub_focus_item;
        if let (Some(mut remembered), Some(np)) = (sub_focus.or(parent_scope_item), new_parent) {
            let mut p = Some(np);
            while let Some(s) = p {
                if self.item(s).is_focus_scope() {
                    if let Some(focused) = sub_focus
                        && focused != id
                    {
                        // Topmost scope between the focused item and the moving root.
                        let mut nearest_scope = None;
                        let mut q = self.item(focused).parent;
                        while let Some(a) = q {
                            if a == s {
                                break;
                            }
                            let item = self.item(a);
                            if item.is_focus_scope() {
                                nearest_scope = Some(a);
                            }
                            if item.is_panel() || a == id {
                                break;
                            }
                            q = item.parent;
                        }
                        if let Some(a) = nearest_scope {
                            remembered = a;
                        }
                    }
                    self.item_mut(s).focus_scope_item = Some(remembered);
                    self.item_changed(remembered, ItemChanged::FocusScopeItem(true));
                    // Focus enters a scope only through the scope itself.
                    if let Some(focused) = sub_focus
                        && self.item(s).sub_focus_item.is_none()
                    {
                        self.clear_sub_focus(focused, None);
                    }
                    break;
                }
                p = self.item(s).parent;
            }
        }

        self.invalidate_depth(id);
        self.item_mut(id).parent = new_parent;

        if let Some(np) = new_parent {
            let parent_in_scene = self.item(np).in_scene;
            if parent_in_scene && !was_in_scene {
                self.join_scene(id);
            } else if !parent_in_scene && was_in_scene {
                self.leave_scene(id);
            }
            let index = self.next_sibling_index(&self.item(np).children);
            self.item_mut(id).sibling_index = index;
            self.item_mut(np).children.push(id);
            self.sort_siblings(Some(np));
            self.item_changed(np, ItemChanged::ChildAdded(id));
            self.mark_parent_dirty(id);
            self.update_ancestor_flags(id);

            let parent = self.item(np);
            let (parent_visible, parent_enabled) = (parent.visible, parent.enabled);
            let item = self.item(id);
            if parent_visible != item.visible && (!parent_visible || !item.explicitly_hidden) {
                self.set_visible_helper(id, parent_visible, false, false, false);
            }
            let item = self.item(id);
            if parent_enabled != item.enabled && (!parent_enabled || !item.explicitly_disabled) {
                self.set_enabled_helper(id, parent_enabled, false, false);
            }
            if self.item(id).visible && self.is_active(np) {
                self.set_item_active(id, true);
            }
        } else {
            self.update_ancestor_flags(id);
            if !dying {
                let item = self.item(id);
                if !item.visible && !item.explicitly_hidden {
                    self.set_visible_helper(id, true, false, true, false);
                }
                let item = self.item(id);
                if !item.enabled && !item.explicitly_disabled {
                    self.set_enabled_helper(id, true, false, true);
                }
            }
        }

        self.invalidate_scene_transform(id);
        if !dying {
            self.transform_changed(id);
        }

        // Restore the focus chain in the new location.
        if let Some(focused) = self.item(id).sub_focus_item {
            self.set_sub_focus(focused, new_parent);
            if new_parent.is_some_and(|np| self.is_active(np)) {
                self.set_focus(focused, FocusReason::Other);
            }
        }

        if !dying {
            self.send_scene_pos_change(id);
        }
        self.item_changed(id, ItemChanged::Parent(new_parent));
        log::trace!("reparented {id:?} from {old_parent:?} to {new_parent:?}");
    }

    /// Mark a subtree as part of the scene and wire it into scene bookkeeping.
    fn join_scene(&mut self, id: ItemId) {
        let nodes = self.subtree_pre_order(id);
        for &n in &nodes {
            let item = self.item_mut(n);
            item.in_scene = true;
            if item.flags.contains(ItemFlags::SENDS_SCENE_POSITION_CHANGES) {
                self.scene_pos_items.push(n);
            }
        }
        // Children settle before their parents, as with one add per item.
        for &n in nodes.iter().rev() {
            if !self.is_alive(n) || !self.item(n).in_scene {
                continue;
            }
            self.item_changed(n, ItemChanged::SceneMembership(true));
            if self.item(n).is_panel()
                && self.active_panel.is_none()
                && self.last_active_panel.is_none()
            {
                if self.active {
                    self.set_active_panel_helper(Some(n), false);
                } else {
                    self.last_active_panel = Some(n);
                }
            }
            if self.focus_item.is_none()
                && self.last_focus_item != Some(n)
                && self.item(n).sub_focus_item == Some(n)
            {
                self.set_focus(n, FocusReason::Other);
            }
        }
        self.mark_dirty(id, None, true, false);
        log::debug!("{id:?} joined the scene with {} items", nodes.len());
    }

    /// Take a subtree out of the scene, dropping every scene-level reference
    /// to it. Parent links are left alone.
    pub(crate) fn leave_scene(&mut self, id: ItemId) {
        self.mark_dirty(id, None, true, false);
        let nodes = self.subtree_pre_order(id);
        for &n in &nodes {
            if !self.is_alive(n) {
                continue;
            }
            let dying = self.item(n).in_destructor;
            self.clear_focus_helper(n, true, false);
            self.clear_sub_focus(n, None);
            self.scene_pos_items.retain(|s| *s != n);
            self.item_mut(n).in_scene = false;
            self.reset_focus_proxy(n);
            if self.focus_item == Some(n) {
                self.focus_item = None;
            }
            for slot in [
                &mut self.last_focus_item,
                &mut self.passive_focus_item,
                &mut self.active_panel,
                &mut self.last_active_panel,
            ] {
                if *slot == Some(n) {
                    *slot = None;
                }
            }
            self.remove_event_filters_of(n);
            if self.mouse_grabbers.contains(&n) {
                self.ungrab_mouse_helper(n, dying);
            }
            if self.keyboard_grabbers.contains(&n) {
                self.ungrab_keyboard_helper(n, dying);
            }
            self.item_changed(n, ItemChanged::SceneMembership(false));
        }
        // Scopes that stay behind must not point into the departed subtree.
        self.forget_focus_scope_items(&nodes, true);
        self.top_level.retain(|t| *t != id);
        log::debug!("{id:?} left the scene");
    }

    fn register_top_level(&mut self, id: ItemId) {
        if self.top_level.contains(&id) {
            return;
        }
        let index = self.next_sibling_index(&self.top_level);
        self.item_mut(id).sibling_index = index;
        self.top_level.push(id);
        self.sort_siblings(None);
    }

    fn next_sibling_index(&self, siblings: &[ItemId]) -> usize {
        siblings
            .iter()
            .map(|s| self.item(*s).sibling_index + 1)
            .max()
            .unwrap_or(0)
    }

    /// Restore stacking order among the children of `parent`, or among the
    /// top-level items for `None`.
    pub(crate) fn sort_siblings(&mut self, parent: Option<ItemId>) {
        let mut list = match parent {
            Some(p) => core::mem::take(&mut self.item_mut(p).children),
            None => core::mem::take(&mut self.top_level),
        };
        list.sort_by(|a, b| {
            let (a, b) = (self.item(*a), self.item(*b));
            b.stacks_behind_parent()
                .cmp(&a.stacks_behind_parent())
                .then(a.z.total_cmp(&b.z))
                .then(a.sibling_index.cmp(&b.sibling_index))
        });
        match parent {
            Some(p) => self.item_mut(p).children = list,
            None => self.top_level = list,
        }
    }

    /// Propagate a change of the trait behind `flag` on `id` to its
    /// descendants.
    ///
    /// The walk stops at descendants that carry the trait themselves, since
    /// they already assert the flag for everything below them.
    pub(crate) fn update_ancestor_flag(&mut self, id: ItemId, flag: AncestorFlags) {
        let trait_flag = flag.trait_flag();
        let inherited = self.item(id).parent.is_some_and(|p| {
            let parent = self.item(p);
            parent.ancestor_flags.contains(flag) || parent.flags.intersects(trait_flag)
        });
        let item = self.item_mut(id);
        item.ancestor_flags.set(flag, inherited);
        let enabled = inherited || item.flags.intersects(trait_flag);
        let mut stack: SmallVec<[ItemId; 16]> = item.children.iter().copied().collect();
        while let Some(c) = stack.pop() {
            let child = self.item_mut(c);
            if child.ancestor_flags.contains(flag) == enabled {
                continue;
            }
            child.ancestor_flags.set(flag, enabled);
            if child.flags.intersects(trait_flag) {
                continue;
            }
            stack.extend(child.children.iter().copied());
        }
    }

    /// Recompute all ancestor flags of `id` from its parent and push the
    /// result down until nothing changes.
    pub(crate) fn update_ancestor_flags(&mut self, id: ItemId) {
        let mut stack: SmallVec<[ItemId; 16]> = SmallVec::new();
        stack.push(id);
        while let Some(cur) = stack.pop() {
            let flags = match self.item(cur).parent {
                Some(p) => {
                    let parent = self.item(p);
                    parent.ancestor_flags | AncestorFlags::contributed_by(parent.flags)
                }
                None => AncestorFlags::empty(),
            };
            let item = self.item_mut(cur);
            if item.ancestor_flags == flags {
                continue;
            }
            item.ancestor_flags = flags;
            stack.extend(item.children.iter().copied());
        }
    }

    pub(crate) fn depth_of(&self, id: ItemId) -> u32 {
        let mut chain: SmallVec<[ItemId; 16]> = SmallVec::new();
        let mut cur = id;
        let mut base = loop {
            let item = self.item(cur);
            if let Some(d) = item.depth.get() {
                break d;
            }
            chain.push(cur);
            match item.parent {
                Some(p) => cur = p,
                None => break 0,
            }
        };
        // `base` is the depth of the first resolved item, or of the root.
        let root_unresolved = chain.last() == Some(&cur);
        for (i, &c) in chain.iter().rev().enumerate() {
            if !(root_unresolved && i == 0) {
                base += 1;
            }
            self.item(c).depth.set(Some(base));
        }
        self.item(id).depth.get().unwrap_or(0)
    }

    fn invalidate_depth(&self, id: ItemId) {
        let mut stack: SmallVec<[ItemId; 16]> = SmallVec::new();
        stack.push(id);
        while let Some(cur) = stack.pop() {
            let item = self.item(cur);
            if item.depth.get().is_none() && cur != id {
                continue;
            }
            item.depth.set(None);
            stack.extend(item.children.iter().copied());
        }
    }

    pub(crate) fn subtree_pre_order(&self, id: ItemId) -> Vec<ItemId> {
        let mut out = Vec::new();
        let mut stack: SmallVec<[ItemId; 16]> = SmallVec::new();
        stack.push(id);
        while let Some(cur) = stack.pop() {
            out.push(cur);
            stack.extend(self.item(cur).children.iter().rev().copied());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::ItemHandler;
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::RefCell;

    #[derive(Default)]
    struct Recorder(Rc<RefCell<Vec<ItemChanged>>>);

    impl ItemHandler for Recorder {
        fn item_changed(&mut self, _: &Scene, _: ItemId, change: ItemChanged) {
            self.0.borrow_mut().push(change);
        }
    }

    fn check_ancestor_flags(scene: &Scene) {
        for id in scene.live_items() {
            let expected = match scene.parent(id) {
                Some(p) => {
                    scene.ancestor_flags(p).unwrap()
                        | AncestorFlags::contributed_by(scene.flags(p).unwrap())
                }
                None => AncestorFlags::empty(),
            };
            assert_eq!(scene.ancestor_flags(id), Some(expected), "{id:?}");
        }
    }

    #[test]
    fn reparent_rejects_cycles_and_self() {
        let mut scene = Scene::new();
        let a = scene.create_item();
        let b = scene.create_item();
        scene.set_parent(b, Some(a)).unwrap();
        assert_eq!(scene.set_parent(a, Some(a)), Err(SceneError::SelfParent(a)));
        assert_eq!(
            scene.set_parent(a, Some(b)),
            Err(SceneError::ParentIsDescendant { item: a, parent: b })
        );
        assert_eq!(scene.parent(a), None, "tree unchanged");
        assert_eq!(scene.children(a), &[b]);
    }

    #[test]
    fn reparent_twice_is_quiet() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut scene = Scene::new();
        let a = scene.create_item();
        let b = scene.create_item();
        scene.set_handler(b, Recorder(log.clone()));
        scene.set_parent(b, Some(a)).unwrap();
        assert_eq!(log.borrow().last(), Some(&ItemChanged::Parent(Some(a))));
        let before = log.borrow().len();
        let flags = scene.ancestor_flags(b);
        scene.set_parent(b, Some(a)).unwrap();
        assert_eq!(log.borrow().len(), before);
        assert_eq!(scene.ancestor_flags(b), flags);
    }

    #[test]
    fn scene_membership_follows_the_root() {
        let mut scene = Scene::new();
        let root = scene.create_item();
        let child = scene.create_item();
        scene.set_parent(child, Some(root)).unwrap();
        assert!(!scene.is_in_scene(child));
        scene.add_item(root).unwrap();
        assert!(scene.is_in_scene(child));
        assert_eq!(scene.top_level_items(), &[root]);

        let loose = scene.create_item();
        scene.set_parent(child, Some(loose)).unwrap();
        assert!(!scene.is_in_scene(child), "moved under a detached parent");
        scene.set_parent(child, None).unwrap();
        assert!(!scene.is_in_scene(child));

        scene.set_parent(child, Some(root)).unwrap();
        scene.remove_item(child).unwrap();
        assert_eq!(scene.parent(child), None, "removal detaches children");
        assert!(!scene.is_in_scene(child));
        assert_eq!(scene.remove_item(child), Err(SceneError::NotInScene(child)));
    }

    #[test]
    fn ancestor_flags_prune_at_items_owning_the_trait() {
        let mut scene = Scene::new();
        let a = scene.create_item();
        let b = scene.create_item();
        let c = scene.create_item();
        let d = scene.create_item();
        scene.set_parent(b, Some(a)).unwrap();
        scene.set_parent(c, Some(b)).unwrap();
        scene.set_parent(d, Some(c)).unwrap();

        scene.set_flags(b, ItemFlags::CLIPS_CHILDREN_TO_SHAPE);
        scene.set_flags(a, ItemFlags::CLIPS_CHILDREN_TO_SHAPE);
        check_ancestor_flags(&scene);
        // Clearing the trait on `a` leaves the flag under `b` intact.
        scene.set_flags(a, ItemFlags::empty());
        check_ancestor_flags(&scene);
        assert!(!scene.ancestor_flags(b).unwrap().contains(AncestorFlags::CLIPS_CHILDREN));
        assert!(scene.ancestor_flags(d).unwrap().contains(AncestorFlags::CLIPS_CHILDREN));

        scene.set_handles_child_events(a, true);
        scene.set_filters_child_events(c, true);
        check_ancestor_flags(&scene);
        assert!(scene.ancestor_flags(d).unwrap().contains(
            AncestorFlags::HANDLES_CHILD_EVENTS | AncestorFlags::FILTERS_CHILD_EVENTS
        ));

        // Reparenting recomputes the moved subtree.
        scene.set_parent(c, None).unwrap();
        check_ancestor_flags(&scene);
        assert_eq!(scene.ancestor_flags(c), Some(AncestorFlags::empty()));
    }

    #[test]
    fn reparent_adopts_inherited_visibility() {
        let mut scene = Scene::new();
        let hidden = scene.create_item();
        let shown = scene.create_item();
        let item = scene.create_item();
        scene.set_visible(hidden, false);
        scene.set_parent(item, Some(hidden)).unwrap();
        assert!(!scene.is_visible(item));
        scene.set_parent(item, Some(shown)).unwrap();
        assert!(scene.is_visible(item));

        scene.set_visible(item, false);
        scene.set_parent(item, None).unwrap();
        assert!(!scene.is_visible(item), "explicitly hidden stays hidden");
    }

    #[test]
    fn depth_and_common_ancestor() {
        let mut scene = Scene::new();
        let root = scene.create_item();
        let l = scene.create_item();
        let r = scene.create_item();
        let ll = scene.create_item();
        scene.set_parent(l, Some(root)).unwrap();
        scene.set_parent(r, Some(root)).unwrap();
        scene.set_parent(ll, Some(l)).unwrap();
        assert_eq!(scene.depth(ll), Some(2));
        assert_eq!(scene.common_ancestor(ll, r), Some(root));
        assert_eq!(scene.common_ancestor(ll, l), Some(l));
        assert!(scene.is_ancestor_of(root, ll));
        assert!(!scene.is_ancestor_of(ll, root));
        assert!(!scene.is_ancestor_of(r, ll));

        scene.set_parent(l, Some(r)).unwrap();
        assert_eq!(scene.depth(ll), Some(3), "depth is invalidated on reparent");
        assert_eq!(scene.common_ancestor(ll, r), Some(r));
        let stray = scene.create_item();
        assert_eq!(scene.common_ancestor(ll, stray), None);
        assert_eq!(scene.top_level_item(ll), Some(root));
    }

    #[test]
    fn stacking_by_z_and_stack_before() {
        let mut scene = Scene::new();
        let p = scene.create_item();
        let kids: Vec<ItemId> = (0..4).map(|_| scene.create_item()).collect();
        for &k in &kids {
            scene.set_parent(k, Some(p)).unwrap();
        }
        assert_eq!(scene.children(p), kids.as_slice(), "insertion order by default");

        scene.set_z_value(kids[0], 1.0);
        assert_eq!(scene.children(p), &[kids[1], kids[2], kids[3], kids[0]]);

        scene.stack_before(kids[3], kids[1]).unwrap();
        assert_eq!(scene.children(p), &[kids[3], kids[1], kids[2], kids[0]]);

        let other = scene.create_item();
        assert_eq!(
            scene.stack_before(kids[2], other),
            Err(SceneError::NotASibling {
                item: kids[2],
                sibling: other
            })
        );
    }

    #[test]
    fn negative_z_stacks_behind_parent() {
        let mut scene = Scene::new();
        let p = scene.create_item();
        let a = scene.create_item();
        let b = scene.create_item();
        scene.set_parent(a, Some(p)).unwrap();
        scene.set_parent(b, Some(p)).unwrap();
        scene.set_flags(b, ItemFlags::NEGATIVE_Z_STACKS_BEHIND_PARENT);
        scene.set_z_value(b, -1.0);
        assert!(scene.flags(b).unwrap().contains(ItemFlags::STACKS_BEHIND_PARENT));
        assert_eq!(scene.children(p), &[b, a]);
        scene.set_z_value(b, 2.0);
        assert!(!scene.flags(b).unwrap().contains(ItemFlags::STACKS_BEHIND_PARENT));
        assert_eq!(scene.children(p), &[a, b]);
    }

    #[test]
    fn destroy_clears_references() {
        let mut scene = Scene::new();
        let root = scene.create_item();
        let a = scene.create_item();
        let b = scene.create_item();
        scene.set_parent(a, Some(root)).unwrap();
        scene.set_parent(b, Some(root)).unwrap();
        scene.add_item(root).unwrap();
        scene.set_flags(a, ItemFlags::FOCUSABLE);
        scene.set_flags(b, ItemFlags::FOCUSABLE);
        scene.set_focus_proxy(b, Some(a)).unwrap();
        scene.set_focus(a, FocusReason::Other);
        scene.install_scene_event_filter(b, a).unwrap();
        scene.set_data(a, 1, 5_i32).unwrap();

        scene.destroy_item(a);
        assert!(!scene.is_alive(a));
        assert_eq!(scene.focus_item(), None);
        assert_eq!(scene.focus_proxy(b), None);
        assert_eq!(scene.children(root), &[b]);
        assert!(scene.event_filters.is_empty());

        scene.destroy_item(root);
        assert!(!scene.is_alive(b));
        assert!(scene.top_level_items().is_empty());
        assert_eq!(scene.live_items().count(), 0);
    }

    #[test]
    fn parent_hook_can_redirect() {
        struct Redirect(ItemId);
        impl ItemHandler for Redirect {
            fn item_change(&mut self, _: &Scene, _: ItemId, change: ItemChange) -> ItemChange {
                match change {
                    ItemChange::Parent(Some(_)) => ItemChange::Parent(Some(self.0)),
                    other => other,
                }
            }
        }
        let mut scene = Scene::new();
        let a = scene.create_item();
        let b = scene.create_item();
        let c = scene.create_item();
        scene.set_handler(c, Redirect(b));
        scene.set_parent(c, Some(a)).unwrap();
        assert_eq!(scene.parent(c), Some(b));
        assert_eq!(scene.children(b), vec![c].as_slice());
    }
}
