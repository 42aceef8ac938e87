// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Input focus, focus scopes, focus proxies, panel activation, and Tab
//! traversal.
//!
//! Focus is tracked at three levels:
//!
//! - The scene's focus item: at most one item, inside the active panel (or
//!   outside every panel when none is active), holds input focus.
//! - Sub-focus chains: every ancestor of a focused item, up to its panel,
//!   points at it, so a panel knows what to focus when it is activated again.
//! - Focus scopes: an item with [`ItemFlags::FOCUS_SCOPE`] remembers which
//!   descendant last asked for focus, even while the scope itself does not
//!   hold focus.
//!
//! Focus set while the scene is inactive is kept as the pending ("passive")
//! focus item and delivered when the scene is activated.

use alloc::vec::Vec;

use crate::change::ItemChanged;
use crate::error::{SceneError, report};
use crate::event::{EventKind, SceneEvent};
use crate::scene::Scene;
use crate::types::{FocusReason, ItemFlags, ItemId, WrapMode};

impl Scene {
    /// The item holding input focus, if the scene is active.
    pub fn focus_item(&self) -> Option<ItemId> {
        if self.active { self.focus_item } else { None }
    }

    /// Returns true if the item (or the end of its focus proxy chain) holds
    /// input focus inside the active panel.
    pub fn has_focus(&self, id: ItemId) -> bool {
        let Some(item) = self.item_opt(id) else {
            return false;
        };
        if !item.in_scene || !self.active {
            return false;
        }
        if let Some(proxy) = item.focus_proxy {
            return self.has_focus(proxy);
        }
        self.focus_item == Some(id) && self.panel(id) == self.active_panel
    }

    /// Give focus to an item, or clear the scene's focus for `None`.
    pub fn set_focus_item(&mut self, item: Option<ItemId>, reason: FocusReason) {
        match item {
            Some(id) => self.set_focus(id, reason),
            None => self.set_focus_item_helper(None, reason),
        }
    }

    /// The descendant (or the item itself) that has, or last had, focus
    /// within the item's panel.
    pub fn focus_item_of(&self, id: ItemId) -> Option<ItemId> {
        self.item_opt(id).and_then(|n| n.sub_focus_item)
    }

    /// The descendant a focus scope hands focus to when it gains focus.
    pub fn focus_scope_item(&self, id: ItemId) -> Option<ItemId> {
        self.item_opt(id).and_then(|n| n.focus_scope_item)
    }

    /// Request input focus for an item.
    ///
    /// Disabled and non-focusable items are ignored. Focus goes to the end of
    /// the item's focus proxy chain. Inside a focus scope that does not hold
    /// focus only the scope's memory is updated. Focus requested inside an
    /// inactive panel is remembered and delivered when the panel is
    /// activated.
    pub fn set_focus(&mut self, id: ItemId, reason: FocusReason) {
        self.set_focus_helper(id, reason, true, false);
    }

    /// Drop focus from an item.
    ///
    /// Inside a focus scope, focus moves back to the scope. Otherwise the
    /// scene ends up with no focus item.
    pub fn clear_focus(&mut self, id: ItemId) {
        self.clear_focus_helper(id, true, false);
    }

    /// The item that receives focus in place of `id`.
    pub fn focus_proxy(&self, id: ItemId) -> Option<ItemId> {
        self.item_opt(id).and_then(|n| n.focus_proxy)
    }

    /// Forward focus requests for `id` to `proxy`.
    ///
    /// Rejects the item itself, proxies with different scene membership, and
    /// proxies whose own chain leads back to the item. Removing the link an
    /// item held focus through takes that focus away.
    pub fn set_focus_proxy(&mut self, id: ItemId, proxy: Option<ItemId>) -> Result<(), SceneError> {
        let Some(item) = self.item_opt(id) else {
            return Err(report("set_focus_proxy", SceneError::StaleItem(id)));
        };
        if item.focus_proxy == proxy {
            return Ok(());
        }
        if let Some(p) = proxy {
            let Some(target) = self.item_opt(p) else {
                return Err(report("set_focus_proxy", SceneError::StaleItem(p)));
            };
            if p == id {
                return Err(report("set_focus_proxy", SceneError::SelfFocusProxy(id)));
            }
            if target.in_scene != item.in_scene {
                return Err(report(
                    "set_focus_proxy",
                    SceneError::FocusProxyCrossScene { item: id, proxy: p },
                ));
            }
            let mut next = target.focus_proxy;
            while let Some(f) = next {
                if f == id {
                    return Err(report(
                        "set_focus_proxy",
                        SceneError::FocusProxyCycle { item: id, proxy: p },
                    ));
                }
                next = self.item(f).focus_proxy;
            }
        }

        let focused_through_proxy = item.focus_proxy.is_some() && self.has_focus(id);
        let old_target = self.resolve_focus_proxy(id);
        self.drop_focus_proxy(id);
        if let Some(p) = proxy {
            self.item_mut(id).focus_proxy = Some(p);
            self.item_mut(p).focus_proxy_refs.push(id);
        }
        if focused_through_proxy && self.resolve_focus_proxy(id) != old_target {
            self.clear_focus_helper(old_target, false, false);
        }
        Ok(())
    }

    /// Returns true while the scene is active (as if its view had focus).
    pub fn is_scene_active(&self) -> bool {
        self.active
    }

    /// Activate or deactivate the scene.
    ///
    /// Deactivation keeps the active panel and the focus item so that the
    /// next activation restores both.
    pub fn set_active(&mut self, active: bool) {
        if self.active == active {
            return;
        }
        if active {
            self.active = true;
            if let Some(panel) = self.last_active_panel {
                self.set_active_panel_helper(Some(panel), true);
            } else {
                self.send_to_top_level(&EventKind::WindowActivate);
            }
            if self.focus_item.is_none()
                && let Some(pending) = self.passive_focus_item
                && self.is_alive(pending)
            {
                self.set_focus_item(Some(pending), FocusReason::ActiveWindow);
            }
        } else {
            self.passive_focus_item = self.focus_item;
            if self.focus_item.is_some() {
                self.set_focus_item_helper(None, FocusReason::ActiveWindow);
            }
            self.active = false;
            if let Some(panel) = self.active_panel {
                self.set_active_panel_helper(None, true);
                self.last_active_panel = Some(panel);
            } else {
                self.send_to_top_level(&EventKind::WindowDeactivate);
            }
        }
        log::debug!("scene active: {active}");
    }

    /// The active panel, if any.
    pub fn active_panel(&self) -> Option<ItemId> {
        self.active_panel
    }

    /// Activate the panel of `item`, or no panel for `None`.
    pub fn set_active_panel(&mut self, item: Option<ItemId>) -> Result<(), SceneError> {
        if let Some(id) = item
            && !self.is_in_scene(id)
        {
            return Err(report("set_active_panel", SceneError::NotInScene(id)));
        }
        self.set_active_panel_helper(item, false);
        Ok(())
    }

    /// Returns true if the item is in the active panel of an active scene.
    pub fn is_active(&self, id: ItemId) -> bool {
        self.active && self.is_in_scene(id) && self.panel(id) == self.active_panel
    }

    /// Activate the item's panel, or deactivate it and fall back to the
    /// parent's panel or the previously active panel.
    pub fn set_item_active(&mut self, id: ItemId, active: bool) {
        if !self.is_in_scene(id) {
            return;
        }
        if active {
            self.set_active_panel_helper(Some(id), false);
            return;
        }
        let this_panel = self.panel(id);
        if self.active_panel.is_none() || self.active_panel != this_panel {
            return;
        }
        let mut next = self.item(id).parent.and_then(|p| self.panel(p));
        if next.is_none() {
            next = self.last_active_panel;
        }
        if next.is_some_and(|n| n == id || self.is_ancestor_of(id, n)) {
            next = None;
        }
        self.set_active_panel_helper(next, false);
    }

    /// Move focus to the next (or previous) focusable item.
    ///
    /// Candidates are the focusable, visible, enabled items of the active
    /// panel (or outside every panel when none is active) in depth-first
    /// stacking order. Returns false when traversal runs off the end and the
    /// scene does not wrap, or when there is nothing to focus.
    pub fn focus_next_prev_child(&mut self, next: bool) -> bool {
        let reason = if next {
            FocusReason::Tab
        } else {
            FocusReason::Backtab
        };
        let chain = self.tab_chain();
        let (Some(&first), Some(&last)) = (chain.first(), chain.last()) else {
            return false;
        };
        let current = self.focus_item();
        let position = current.and_then(|c| chain.iter().position(|x| *x == c));
        let target = match position {
            Some(i) => {
                let step = if next { i.checked_add(1) } else { i.checked_sub(1) };
                match step.and_then(|j| chain.get(j)) {
                    Some(&t) => t,
                    None if self.config.tab_wrap == WrapMode::Scope => {
                        if next { first } else { last }
                    }
                    None => return false,
                }
            }
            None => match self.last_focus_item {
                Some(l) if current.is_none() && chain.contains(&l) => l,
                _ => {
                    if next { first } else { last }
                }
            },
        };
        // Tab focus goes straight to the candidate, even inside an unfocused scope.
        self.set_focus_helper(target, reason, false, true);
        true
    }

    // --- internals ---

    /// Focus `id`.
    ///
    /// `climb` descends into remembered focus scope items. `through_scope`
    /// delivers focus even when the enclosing scope does not hold it.
    pub(crate) fn set_focus_helper(
        &mut self,
        id: ItemId,
        reason: FocusReason,
        climb: bool,
        through_scope: bool,
    ) {
        let Some(item) = self.item_opt(id) else {
            return;
        };
        if !item.enabled || !item.flags.contains(ItemFlags::FOCUSABLE) {
            return;
        }
        let mut target = self.resolve_focus_proxy(id);
        if self.focus_item() == Some(target) {
            return;
        }

        let mut p = item.parent;
        while let Some(s) = p {
            if self.item(s).is_focus_scope() {
                let old = self.item_mut(s).focus_scope_item.replace(id);
                if let Some(old) = old {
                    self.item_changed(old, ItemChanged::FocusScopeItem(false));
                }
                self.item_changed(id, ItemChanged::FocusScopeItem(true));
                if self.item(s).sub_focus_item.is_none() && !through_scope {
                    return;
                }
                break;
            }
            p = self.item(s).parent;
        }

        if climb {
            while let Some(next) = self.item(target).focus_scope_item
                && self.item_opt(next).is_some_and(|n| n.visible)
            {
                target = next;
            }
        }

        if let Some(current) = self.focus_item()
            && self.panel(current) == self.panel(id)
        {
            self.clear_sub_focus(current, Some(current));
        }
        self.set_sub_focus(target, Some(target));

        if self.item(id).in_scene {
            let deliver = match self.panel(id) {
                None => self.active,
                Some(panel) => self.is_active(panel),
            };
            if deliver {
                self.set_focus_item_helper(Some(target), reason);
            }
        }
    }

    /// Clear focus held by `id` (or by what its scope remembers).
    ///
    /// With `give_to_parent`, focus moves to the nearest focus scope when it
    /// can take it. `hidden_by_panel` keeps the sub-focus chain so the panel
    /// can restore it later.
    pub(crate) fn clear_focus_helper(
        &mut self,
        id: ItemId,
        give_to_parent: bool,
        hidden_by_panel: bool,
    ) {
        let Some(item) = self.item_opt(id) else {
            return;
        };
        let mut sub = id;
        if item.is_focus_scope() {
            while let Some(next) = self.item(sub).focus_scope_item
                && self.is_alive(next)
            {
                sub = next;
            }
        }
        if give_to_parent && !item.in_destructor {
            let mut p = item.parent;
            while let Some(s) = p {
                if self.item(s).is_focus_scope() {
                    if self.item(s).focus_scope_item == Some(id) {
                        self.item_mut(s).focus_scope_item = None;
                        if !self.has_focus(sub) {
                            self.item_changed(id, ItemChanged::FocusScopeItem(false));
                        }
                    }
                    if self.has_focus(sub) {
                        self.set_focus_helper(s, FocusReason::Other, false, false);
                    }
                    if !self.has_focus(sub) {
                        return;
                    }
                    // The scope could not take focus; clear it below.
                    break;
                }
                p = self.item(s).parent;
            }
        }
        if self.has_focus(sub) {
            if !hidden_by_panel {
                self.clear_sub_focus(sub, Some(sub));
            }
            self.set_focus_item_helper(None, FocusReason::Other);
        }
    }

    /// Move the scene's input focus, delivering `FocusOut` and `FocusIn`.
    pub(crate) fn set_focus_item_helper(&mut self, item: Option<ItemId>, reason: FocusReason) {
        if item == self.focus_item {
            return;
        }
        let accepts = |scene: &Self, id: ItemId| {
            scene
                .item_opt(id)
                .is_some_and(|n| n.flags.contains(ItemFlags::FOCUSABLE) && n.visible && n.enabled)
        };
        let mut item = item.filter(|&id| accepts(self, id));
        if let Some(old) = self.focus_item.take() {
            self.last_focus_item = Some(old);
            self.send_event(old, &mut SceneEvent::new(EventKind::FocusOut(reason)));
        }
        // The handler of the old item may have removed the new one.
        item = item.filter(|&id| self.is_in_scene(id));
        self.focus_item = item;
        if let Some(id) = item {
            self.send_event(id, &mut SceneEvent::new(EventKind::FocusIn(reason)));
        }
        log::debug!("focus item: {item:?} ({reason:?})");
    }

    /// Point `root` (or `item`) and its ancestors up to the panel at `item`.
    pub(crate) fn set_sub_focus(&mut self, item: ItemId, root: Option<ItemId>) {
        let start = root.unwrap_or(item);
        if self.panel(start) != self.panel(item) {
            return;
        }
        let visible = self.item(item).visible;
        let mut cur = start;
        loop {
            if cur != item
                && let Some(old) = self.item(cur).sub_focus_item
            {
                if old == item {
                    break;
                }
                self.clear_sub_focus(old, None);
            }
            let node = self.item_mut(cur);
            node.sub_focus_item = Some(item);
            if node.is_panel() {
                break;
            }
            let parent = node.parent;
            match parent {
                Some(p) if visible || !self.item(p).visible => cur = p,
                _ => break,
            }
        }
        if self.item(item).in_scene
            && !self.active
            && let Some(sub) = self.item(item).sub_focus_item
        {
            self.passive_focus_item = Some(sub);
            self.last_focus_item = Some(sub);
        }
    }

    /// Unlink `item` from the sub-focus chain, starting at `root` (or `item`)
    /// and going up while the chain points at it.
    pub(crate) fn clear_sub_focus(&mut self, item: ItemId, root: Option<ItemId>) {
        let mut cur = root.unwrap_or(item);
        while let Some(node) = self.item_opt_mut(cur) {
            if node.sub_focus_item != Some(item) {
                break;
            }
            node.sub_focus_item = None;
            if node.is_panel() {
                break;
            }
            match node.parent {
                Some(p) => cur = p,
                None => break,
            }
        }
    }

    /// Null the focus proxy of every item that forwards to `id`.
    pub(crate) fn reset_focus_proxy(&mut self, id: ItemId) {
        let refs = core::mem::take(&mut self.item_mut(id).focus_proxy_refs);
        for r in refs {
            if let Some(referrer) = self.item_opt_mut(r) {
                referrer.focus_proxy = None;
            }
        }
    }

    /// Unlink `id` from its own focus proxy.
    pub(crate) fn drop_focus_proxy(&mut self, id: ItemId) {
        if let Some(proxy) = self.item_mut(id).focus_proxy.take()
            && let Some(target) = self.item_opt_mut(proxy)
        {
            target.focus_proxy_refs.retain(|r| *r != id);
        }
    }

    fn resolve_focus_proxy(&self, id: ItemId) -> ItemId {
        let mut target = id;
        while let Some(next) = self.item(target).focus_proxy {
            target = next;
        }
        target
    }

    pub(crate) fn set_active_panel_helper(&mut self, item: Option<ItemId>, during_activation: bool) {
        if let Some(id) = item
            && !self.is_in_scene(id)
        {
            log::warn!("set_active_panel: {id:?} is not part of the scene");
            return;
        }
        let panel = item.and_then(|id| self.panel(id));
        self.last_active_panel = if panel.is_some() {
            self.active_panel
        } else {
            None
        };
        if panel == self.active_panel || (!self.active && !during_activation) {
            return;
        }

        if let Some(old) = self.active_panel {
            if let Some(focused) = self.focus_item_of(old)
                && self.focus_item() == Some(focused)
            {
                self.set_focus_item_helper(None, FocusReason::ActiveWindow);
            }
            self.send_event(old, &mut SceneEvent::new(EventKind::WindowDeactivate));
        } else if panel.is_some() && !during_activation {
            self.send_to_top_level(&EventKind::WindowDeactivate);
        }

        self.active_panel = panel;
        log::debug!("active panel: {panel:?}");

        if let Some(p) = panel {
            self.send_event(p, &mut SceneEvent::new(EventKind::WindowActivate));
            if let Some(focused) = self.focus_item_of(p) {
                self.set_focus_item_helper(Some(focused), FocusReason::ActiveWindow);
            } else if self.item(p).flags.contains(ItemFlags::FOCUSABLE) {
                self.set_focus(p, FocusReason::ActiveWindow);
            }
        } else if self.active {
            self.send_to_top_level(&EventKind::WindowActivate);
        }
    }

    /// Send an activation event to every visible non-panel root.
    fn send_to_top_level(&mut self, kind: &EventKind) {
        let roots = self.top_level.clone();
        for root in roots {
            match self.item_opt(root) {
                Some(item) if item.visible && !item.is_panel() => {}
                _ => continue,
            }
            self.send_event(root, &mut SceneEvent::new(kind.clone()));
        }
    }

    fn tab_chain(&self) -> Vec<ItemId> {
        let mut out = Vec::new();
        for &root in &self.top_level {
            for id in self.subtree_pre_order(root) {
                let item = self.item(id);
                if item.flags.contains(ItemFlags::FOCUSABLE)
                    && item.visible
                    && item.enabled
                    && self.panel(id) == self.active_panel
                {
                    out.push(id);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::ItemHandler;
    use crate::scene::SceneConfig;
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::RefCell;

    type Log = Rc<RefCell<Vec<(ItemId, &'static str)>>>;

    struct Recorder(Log);

    impl ItemHandler for Recorder {
        fn focus_in_event(&mut self, _: &mut Scene, item: ItemId, _: FocusReason) {
            self.0.borrow_mut().push((item, "in"));
        }
        fn focus_out_event(&mut self, _: &mut Scene, item: ItemId, _: FocusReason) {
            self.0.borrow_mut().push((item, "out"));
        }
        fn window_activate_event(&mut self, _: &mut Scene, item: ItemId) {
            self.0.borrow_mut().push((item, "activate"));
        }
        fn window_deactivate_event(&mut self, _: &mut Scene, item: ItemId) {
            self.0.borrow_mut().push((item, "deactivate"));
        }
    }

    fn item(scene: &mut Scene, flags: ItemFlags, parent: Option<ItemId>) -> ItemId {
        let id = scene.create_item();
        scene.set_flags(id, flags);
        match parent {
            Some(p) => scene.set_parent(id, Some(p)).unwrap(),
            None => scene.add_item(id).unwrap(),
        }
        id
    }

    #[test]
    fn focus_moves_between_items() {
        let log = Log::default();
        let mut scene = Scene::new();
        let a = item(&mut scene, ItemFlags::FOCUSABLE, None);
        let b = item(&mut scene, ItemFlags::FOCUSABLE, None);
        scene.set_handler(a, Recorder(log.clone()));
        scene.set_handler(b, Recorder(log.clone()));

        scene.set_focus(a, FocusReason::Other);
        assert!(scene.has_focus(a));
        scene.set_focus(b, FocusReason::Mouse);
        assert!(!scene.has_focus(a));
        assert_eq!(scene.focus_item(), Some(b));
        assert_eq!(*log.borrow(), vec![(a, "in"), (a, "out"), (b, "in")]);

        let plain = item(&mut scene, ItemFlags::empty(), None);
        scene.set_focus(plain, FocusReason::Other);
        scene.set_enabled(a, false);
        scene.set_focus(a, FocusReason::Other);
        assert_eq!(scene.focus_item(), Some(b), "unfocusable and disabled items are ignored");
    }

    #[test]
    fn hiding_an_ancestor_drops_focus_for_good() {
        let mut scene = Scene::new();
        let a = item(&mut scene, ItemFlags::empty(), None);
        let b = item(&mut scene, ItemFlags::FOCUSABLE, Some(a));
        scene.set_focus(b, FocusReason::Other);
        assert!(scene.has_focus(b));
        scene.hide(a);
        assert!(!scene.has_focus(b));
        scene.show(a);
        assert!(!scene.has_focus(b), "focus is not restored on show");
        assert_eq!(scene.focus_item(), None);
    }

    #[test]
    fn focus_scope_remembers_across_panel_reactivation() {
        let mut scene = Scene::new();
        let panel = scene.create_item();
        scene.set_flags(panel, ItemFlags::PANEL);
        let scope = item(
            &mut scene,
            ItemFlags::FOCUS_SCOPE | ItemFlags::FOCUSABLE,
            Some(panel),
        );
        let c1 = item(&mut scene, ItemFlags::FOCUSABLE, Some(scope));
        let c2 = item(&mut scene, ItemFlags::FOCUSABLE, Some(scope));
        scene.add_item(panel).unwrap();
        assert_eq!(scene.active_panel(), Some(panel), "first panel auto-activates");

        scene.set_focus(scope, FocusReason::Other);
        scene.set_focus(c1, FocusReason::Other);
        scene.set_focus(c2, FocusReason::Other);
        assert!(scene.has_focus(c2));
        assert_eq!(scene.focus_scope_item(scope), Some(c2));

        scene.hide(panel);
        assert_eq!(scene.focus_item(), None);
        assert_eq!(scene.active_panel(), None);
        scene.show(panel);
        scene.set_item_active(panel, true);
        assert!(scene.has_focus(c2));
        assert!(!scene.has_focus(c1));
    }

    #[test]
    fn focus_inside_an_unfocused_scope_is_only_remembered() {
        let mut scene = Scene::new();
        let scope = item(&mut scene, ItemFlags::FOCUS_SCOPE | ItemFlags::FOCUSABLE, None);
        let child = item(&mut scene, ItemFlags::FOCUSABLE, Some(scope));
        scene.set_focus(child, FocusReason::Other);
        assert_eq!(scene.focus_item(), None);
        assert_eq!(scene.focus_scope_item(scope), Some(child));
        scene.set_focus(scope, FocusReason::Other);
        assert!(scene.has_focus(child), "the scope hands focus to its child");
    }

    #[test]
    fn clear_focus_returns_focus_to_the_scope() {
        let mut scene = Scene::new();
        let scope = item(&mut scene, ItemFlags::FOCUS_SCOPE | ItemFlags::FOCUSABLE, None);
        let child = item(&mut scene, ItemFlags::FOCUSABLE, Some(scope));
        scene.set_focus(scope, FocusReason::Other);
        scene.set_focus(child, FocusReason::Other);
        assert!(scene.has_focus(child));

        scene.clear_focus(child);
        assert_eq!(scene.focus_item(), Some(scope));
        assert_eq!(scene.focus_scope_item(scope), None);

        // A scope that cannot take focus leaves the scene without focus.
        scene.set_focus(child, FocusReason::Other);
        assert!(scene.has_focus(child));
        scene.set_flags(scope, ItemFlags::FOCUS_SCOPE);
        scene.clear_focus(child);
        assert_eq!(scene.focus_item(), None);
    }

    #[test]
    fn destroyed_items_are_forgotten_by_every_scope() {
        let mut scene = Scene::new();
        let outer = item(&mut scene, ItemFlags::FOCUS_SCOPE | ItemFlags::FOCUSABLE, None);
        let middle = item(&mut scene, ItemFlags::empty(), Some(outer));
        let leaf = item(&mut scene, ItemFlags::FOCUSABLE, Some(middle));
        scene.set_focus(leaf, FocusReason::Other);
        assert_eq!(scene.focus_scope_item(outer), Some(leaf));

        // A closer scope appears after the outer one remembered the leaf.
        scene.set_flags(middle, ItemFlags::FOCUS_SCOPE);
        scene.destroy_item(leaf);
        assert_eq!(scene.focus_scope_item(outer), None);
        scene.set_focus(outer, FocusReason::Other);
        assert!(scene.has_focus(outer));

        // Dropping the scope trait forgets the remembered item.
        let other = item(&mut scene, ItemFlags::FOCUSABLE, Some(outer));
        scene.set_focus(other, FocusReason::Other);
        assert_eq!(scene.focus_scope_item(outer), Some(other));
        scene.set_flags(outer, ItemFlags::FOCUSABLE);
        assert_eq!(scene.focus_scope_item(outer), None);
        assert!(scene.has_focus(other));
    }

    #[test]
    fn focus_proxy_forwards_and_validates() {
        let mut scene = Scene::new();
        let a = item(&mut scene, ItemFlags::FOCUSABLE, None);
        let b = item(&mut scene, ItemFlags::FOCUSABLE, None);
        scene.set_focus_proxy(a, Some(b)).unwrap();
        scene.set_focus(a, FocusReason::Other);
        assert_eq!(scene.focus_item(), Some(b));
        assert!(scene.has_focus(a), "focus reads through the proxy");

        assert_eq!(
            scene.set_focus_proxy(b, Some(a)),
            Err(SceneError::FocusProxyCycle { item: b, proxy: a })
        );
        assert_eq!(scene.set_focus_proxy(b, Some(b)), Err(SceneError::SelfFocusProxy(b)));
        let detached = scene.create_item();
        assert_eq!(
            scene.set_focus_proxy(a, Some(detached)),
            Err(SceneError::FocusProxyCrossScene {
                item: a,
                proxy: detached
            })
        );
        assert_eq!(scene.focus_proxy(a), Some(b), "failed calls change nothing");

        scene.set_focus_proxy(a, None).unwrap();
        assert_eq!(scene.focus_item(), None, "the proxied binding is dropped");

        scene.set_focus_proxy(a, Some(b)).unwrap();
        scene.destroy_item(b);
        assert_eq!(scene.focus_proxy(a), None);
    }

    #[test]
    fn deactivation_keeps_pending_focus() {
        let log = Log::default();
        let mut scene = Scene::with_config(SceneConfig {
            start_active: false,
            ..SceneConfig::default()
        });
        let a = item(&mut scene, ItemFlags::FOCUSABLE, None);
        scene.set_handler(a, Recorder(log.clone()));
        scene.set_focus(a, FocusReason::Other);
        assert!(!scene.has_focus(a), "inactive scenes hold no focus");

        scene.set_active(true);
        assert!(scene.has_focus(a));
        scene.set_active(false);
        assert!(!scene.has_focus(a));
        scene.set_active(true);
        assert!(scene.has_focus(a));
        assert_eq!(
            *log.borrow(),
            vec![
                (a, "activate"),
                (a, "in"),
                (a, "out"),
                (a, "deactivate"),
                (a, "activate"),
                (a, "in"),
            ]
        );
    }

    #[test]
    fn switching_panels_moves_focus() {
        let mut scene = Scene::new();
        let x = scene.create_item();
        let y = scene.create_item();
        scene.set_flags(x, ItemFlags::PANEL);
        scene.set_flags(y, ItemFlags::PANEL);
        let x1 = item(&mut scene, ItemFlags::FOCUSABLE, Some(x));
        let y1 = item(&mut scene, ItemFlags::FOCUSABLE, Some(y));
        scene.add_item(x).unwrap();
        scene.add_item(y).unwrap();
        assert_eq!(scene.active_panel(), Some(x));

        scene.set_focus(x1, FocusReason::Other);
        scene.set_focus(y1, FocusReason::Other);
        assert!(scene.has_focus(x1), "focus in an inactive panel waits");
        assert_eq!(scene.focus_item_of(y), Some(y1));

        scene.set_item_active(y, true);
        assert!(scene.has_focus(y1));
        assert!(scene.is_active(y1));
        assert!(!scene.is_active(x1));

        scene.set_item_active(y, false);
        assert_eq!(scene.active_panel(), Some(x));
        assert!(scene.has_focus(x1));
    }

    #[test]
    fn tab_traversal_honors_wrap_mode() {
        for wrap in [WrapMode::Never, WrapMode::Scope] {
            let mut scene = Scene::with_config(SceneConfig {
                tab_wrap: wrap,
                ..SceneConfig::default()
            });
            let root = item(&mut scene, ItemFlags::empty(), None);
            let a = item(&mut scene, ItemFlags::FOCUSABLE, Some(root));
            let b = item(&mut scene, ItemFlags::FOCUSABLE, Some(root));
            let c = item(&mut scene, ItemFlags::FOCUSABLE, Some(root));

            assert!(scene.focus_next_prev_child(true));
            assert_eq!(scene.focus_item(), Some(a));
            scene.hide(b);
            assert!(scene.focus_next_prev_child(true));
            assert_eq!(scene.focus_item(), Some(c), "hidden items are skipped");
            scene.show(b);
            assert!(scene.focus_next_prev_child(false));
            assert_eq!(scene.focus_item(), Some(b));
            assert!(scene.focus_next_prev_child(true));

            let wrapped = scene.focus_next_prev_child(true);
            match wrap {
                WrapMode::Never => {
                    assert!(!wrapped);
                    assert_eq!(scene.focus_item(), Some(c));
                }
                WrapMode::Scope => {
                    assert!(wrapped);
                    assert_eq!(scene.focus_item(), Some(a));
                }
            }
        }
    }
}
