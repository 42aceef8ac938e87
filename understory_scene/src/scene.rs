// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The scene: item arena, scene-level state, hooks, and custom data.

use alloc::{boxed::Box, vec::Vec};
use core::any::Any;
use hashbrown::HashMap;
use kurbo::Rect;
use smallvec::SmallVec;

use crate::cache::ItemCache;
use crate::change::{ItemChange, ItemChanged};
use crate::damage::Damage;
use crate::error::{SceneError, report};
use crate::handler::{DefaultHandler, ItemHandler};
use crate::item::Item;
use crate::types::{AncestorFlags, CacheMode, ItemFlags, ItemId, WrapMode};
use crate::util::{transform_rect_bbox, union_nonempty};

/// Runtime configuration of a [`Scene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SceneConfig {
    /// Whether Tab traversal wraps around at the end of the active panel.
    pub tab_wrap: WrapMode,
    /// Whether the scene starts out active (as if a view had focus).
    pub start_active: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            tab_wrap: WrapMode::Never,
            start_active: true,
        }
    }
}

/// A retained scene of items.
///
/// The scene owns every item it creates. Items form trees: a parent
/// exclusively owns its children, and destroying an item destroys its whole
/// subtree. Root items may be registered with the scene ("in the scene") with
/// [`Scene::add_item`]; unregistered trees are detached and never receive
/// focus, activation, or repaint bookkeeping.
///
/// All cross references between items (parent links, focus proxies, focus
/// scope memory, sub-focus chains) are [`ItemId`]s and are cleared when the
/// referenced item is destroyed.
///
/// Cached state (scene transforms, children bounding rects, depth) is
/// recomputed on read, so queries take `&self`.
///
/// ## Example
///
/// ```rust
/// use kurbo::Point;
/// use understory_scene::Scene;
///
/// let mut scene = Scene::new();
/// let a = scene.create_item();
/// let b = scene.create_item();
/// scene.set_parent(b, Some(a)).unwrap();
/// scene.add_item(a).unwrap();
///
/// scene.set_pos(b, Point::new(10.0, 10.0));
/// assert_eq!(scene.map_to_scene(b, Point::ZERO), Some(Point::new(10.0, 10.0)));
/// scene.set_pos(a, Point::new(5.0, 5.0));
/// assert_eq!(scene.map_to_scene(b, Point::ZERO), Some(Point::new(15.0, 15.0)));
/// ```
pub struct Scene {
    /// slots
    items: Vec<Option<Item>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
    pub(crate) config: SceneConfig,
    /// Registered roots in stacking order.
    pub(crate) top_level: Vec<ItemId>,
    pub(crate) active: bool,
    pub(crate) focus_item: Option<ItemId>,
    pub(crate) last_focus_item: Option<ItemId>,
    pub(crate) passive_focus_item: Option<ItemId>,
    pub(crate) active_panel: Option<ItemId>,
    pub(crate) last_active_panel: Option<ItemId>,
    pub(crate) mouse_grabbers: Vec<ItemId>,
    pub(crate) keyboard_grabbers: Vec<ItemId>,
    /// watched item -> filter items, in installation order
    pub(crate) event_filters: HashMap<ItemId, SmallVec<[ItemId; 2]>>,
    pub(crate) scene_pos_items: Vec<ItemId>,
    custom_data: HashMap<ItemId, HashMap<u32, Box<dyn Any>>>,
    pub(crate) damage: Damage,
}

impl core::fmt::Debug for Scene {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.items.len();
        let alive = self.items.iter().filter(|n| n.is_some()).count();
        f.debug_struct("Scene")
            .field("items_total", &total)
            .field("items_alive", &alive)
            .field("free_list", &self.free_list.len())
            .field("top_level", &self.top_level)
            .field("active", &self.active)
            .field("focus_item", &self.focus_item)
            .field("active_panel", &self.active_panel)
            .finish_non_exhaustive()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Create an empty scene with the default [`SceneConfig`].
    pub fn new() -> Self {
        Self::with_config(SceneConfig::default())
    }

    /// Create an empty scene.
    pub fn with_config(config: SceneConfig) -> Self {
        Self {
            items: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            config,
            top_level: Vec::new(),
            active: config.start_active,
            focus_item: None,
            last_focus_item: None,
            passive_focus_item: None,
            active_panel: None,
            last_active_panel: None,
            mouse_grabbers: Vec::new(),
            keyboard_grabbers: Vec::new(),
            event_filters: HashMap::new(),
            scene_pos_items: Vec::new(),
            custom_data: HashMap::new(),
            damage: Damage::default(),
        }
    }

    /// The configuration this scene was created with.
    pub fn config(&self) -> SceneConfig {
        self.config
    }

    /// Create a new detached item: no parent, not in the scene.
    ///
    /// The item starts visible, enabled, fully opaque, at the origin, with
    /// empty bounds and no traits.
    pub fn create_item(&mut self) -> ItemId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.items[idx] = Some(Item::new(generation));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ItemId uses 32-bit indices by design."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.items.push(Some(Item::new(generation)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ItemId uses 32-bit indices by design."
            )]
            ((self.items.len() - 1) as u32, generation)
        };
        let id = ItemId::new(idx, generation);
        log::trace!("created item {id:?}");
        id
    }

    /// Returns true if `id` refers to a live item.
    ///
    /// An `ItemId` is live if its slot exists and its generation matches the
    /// generation currently stored in that slot.
    pub fn is_alive(&self, id: ItemId) -> bool {
        self.items
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .map(|n| n.generation == id.1)
            .unwrap_or(false)
    }

    /// Install the handler that receives `id`'s events and change hooks.
    pub fn set_handler(&mut self, id: ItemId, handler: impl ItemHandler + 'static) {
        if let Some(item) = self.item_opt_mut(id) {
            item.handler = Some(Box::new(handler));
        }
    }

    /// Remove `id`'s handler; the default behavior applies afterwards.
    pub fn clear_handler(&mut self, id: ItemId) {
        if let Some(item) = self.item_opt_mut(id) {
            item.handler = None;
        }
    }

    /// Returns the parent of an item, or `None` for roots or stale ids.
    pub fn parent(&self, id: ItemId) -> Option<ItemId> {
        self.item_opt(id).and_then(|n| n.parent)
    }

    /// Children of an item in stacking order (bottom first), or an empty slice
    /// if the id is stale.
    pub fn children(&self, id: ItemId) -> &[ItemId] {
        self.item_opt(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Registered root items in stacking order (bottom first).
    pub fn top_level_items(&self) -> &[ItemId] {
        &self.top_level
    }

    /// Returns true if the item belongs to the scene (directly or through an
    /// ancestor registered with [`Scene::add_item`]).
    pub fn is_in_scene(&self, id: ItemId) -> bool {
        self.item_opt(id).is_some_and(|n| n.in_scene)
    }

    /// Traits of an item.
    pub fn flags(&self, id: ItemId) -> Option<ItemFlags> {
        self.item_opt(id).map(|n| n.flags)
    }

    /// Derived ancestor flags of an item.
    pub fn ancestor_flags(&self, id: ItemId) -> Option<AncestorFlags> {
        self.item_opt(id).map(|n| n.ancestor_flags)
    }

    /// Cache mode of an item.
    pub fn cache_mode(&self, id: ItemId) -> Option<CacheMode> {
        self.item_opt(id).map(|n| n.cache_mode)
    }

    /// Paint-cache record of an item, present while caching is enabled.
    pub fn cache(&self, id: ItemId) -> Option<&ItemCache> {
        self.item_opt(id).and_then(|n| n.cache.as_ref())
    }

    /// Mutable paint-cache record, for the renderer to store snapshot keys.
    pub fn cache_mut(&mut self, id: ItemId) -> Option<&mut ItemCache> {
        self.item_opt_mut(id).and_then(|n| n.cache.as_mut())
    }

    /// Enable, switch, or disable paint caching. Switching purges the record.
    pub fn set_cache_mode(&mut self, id: ItemId, mode: CacheMode) {
        let Some(item) = self.item_opt_mut(id) else {
            return;
        };
        if item.cache_mode == mode {
            return;
        }
        item.cache_mode = mode;
        item.cache = match mode {
            CacheMode::NoCache => None,
            _ => Some(ItemCache::default()),
        };
        self.update(id, None);
    }

    /// Drop the item's cached snapshots; the next paint renders from scratch.
    pub fn purge_cache(&mut self, id: ItemId) {
        if let Some(cache) = self.item_opt_mut(id).and_then(|n| n.cache.as_mut()) {
            cache.purge();
        }
    }

    /// Schedule a repaint of `rect` (item coordinates), or of the whole item
    /// for `None`.
    ///
    /// With caching enabled the region is also recorded as exposed in the
    /// cache record, so the renderer only refreshes what changed.
    pub fn update(&mut self, id: ItemId, rect: Option<Rect>) {
        if let Some(r) = rect
            && r.is_zero_area()
        {
            return;
        }
        let Some(item) = self.item_opt_mut(id) else {
            return;
        };
        if let Some(cache) = item.cache.as_mut() {
            cache.expose(rect);
        }
        self.mark_dirty(id, rect, false, false);
    }

    /// Drain the scene-space regions that need repainting.
    pub fn take_damage(&mut self) -> Damage {
        core::mem::take(&mut self.damage)
    }

    /// Store a value under `key` for the item, replacing any previous value.
    ///
    /// Entries live exactly as long as the item.
    pub fn set_data<T: Any>(&mut self, id: ItemId, key: u32, value: T) -> Result<(), SceneError> {
        if !self.is_alive(id) {
            return Err(report("set_data", SceneError::StaleItem(id)));
        }
        self.custom_data
            .entry(id)
            .or_default()
            .insert(key, Box::new(value));
        Ok(())
    }

    /// Value stored under `key`, if present and of type `T`.
    pub fn data<T: Any>(&self, id: ItemId, key: u32) -> Option<&T> {
        self.custom_data.get(&id)?.get(&key)?.downcast_ref()
    }

    /// Mutable access to the value stored under `key`.
    pub fn data_mut<T: Any>(&mut self, id: ItemId, key: u32) -> Option<&mut T> {
        self.custom_data.get_mut(&id)?.get_mut(&key)?.downcast_mut()
    }

    /// Remove and return the value stored under `key`.
    pub fn remove_data(&mut self, id: ItemId, key: u32) -> Option<Box<dyn Any>> {
        let map = self.custom_data.get_mut(&id)?;
        let value = map.remove(&key);
        if map.is_empty() {
            self.custom_data.remove(&id);
        }
        value
    }

    // --- internals ---

    /// Access an item; panics if `id` is stale.
    pub(crate) fn item(&self, id: ItemId) -> &Item {
        self.items[id.idx()].as_ref().expect("dangling ItemId")
    }

    /// Access an item mutably; panics if `id` is stale.
    pub(crate) fn item_mut(&mut self, id: ItemId) -> &mut Item {
        self.items[id.idx()].as_mut().expect("dangling ItemId")
    }

    pub(crate) fn item_opt(&self, id: ItemId) -> Option<&Item> {
        let n = self.items.get(id.idx())?.as_ref()?;
        (n.generation == id.1).then_some(n)
    }

    pub(crate) fn item_opt_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        let n = self.items.get_mut(id.idx())?.as_mut()?;
        if n.generation != id.1 {
            return None;
        }
        Some(n)
    }

    /// Drop `gone` items from every focus scope that remembers one of them.
    ///
    /// With `in_scene_only`, scopes outside the scene keep what they remember.
    pub(crate) fn forget_focus_scope_items(&mut self, gone: &[ItemId], in_scene_only: bool) {
        for item in self.items.iter_mut().flatten() {
            if in_scene_only && !item.in_scene {
                continue;
            }
            if item.focus_scope_item.is_some_and(|f| gone.contains(&f)) {
                item.focus_scope_item = None;
            }
        }
    }

    /// Free the slot of an item whose subtree and references are already gone.
    pub(crate) fn free_slot(&mut self, id: ItemId) {
        self.custom_data.remove(&id);
        self.items[id.idx()] = None;
        self.free_list.push(id.idx());
        log::trace!("destroyed item {id:?}");
    }

    /// Run `f` with the item's handler, or the default behavior if it has none.
    ///
    /// The handler is taken out of its slot for the duration of the call, so
    /// re-entrant dispatch to the same item falls back to the default behavior.
    pub(crate) fn with_handler<R>(
        &mut self,
        id: ItemId,
        f: impl FnOnce(&mut dyn ItemHandler, &mut Self) -> R,
    ) -> R {
        let taken = self.item_opt_mut(id).and_then(|n| n.handler.take());
        match taken {
            Some(mut handler) => {
                let out = f(handler.as_mut(), self);
                if let Some(n) = self.item_opt_mut(id)
                    && n.handler.is_none()
                {
                    n.handler = Some(handler);
                }
                out
            }
            None => f(&mut DefaultHandler, self),
        }
    }

    /// Offer a pending change to the item's hook and return the value to apply.
    ///
    /// Hooks are skipped while the item is being destroyed.
    pub(crate) fn item_change(&mut self, id: ItemId, change: ItemChange) -> ItemChange {
        match self.item_opt(id) {
            Some(n) if !n.in_destructor && n.handler.is_some() => {}
            _ => return change,
        }
        let out = self.with_handler(id, |h, scene| h.item_change(scene, id, change));
        if out.same_kind(&change) {
            out
        } else {
            log::warn!("item_change: hook for {id:?} answered {change:?} with {out:?}; ignored");
            change
        }
    }

    /// Deliver a post-change notification to the item's handler.
    pub(crate) fn item_changed(&mut self, id: ItemId, change: ItemChanged) {
        match self.item_opt(id) {
            Some(n) if !n.in_destructor && n.handler.is_some() => {}
            _ => return,
        }
        self.with_handler(id, |h, scene| h.item_changed(scene, id, change));
    }

    /// Record the item's area in the dirty region.
    ///
    /// `rect` is in item coordinates; `None` means the whole item. With
    /// `invalidate_children` the children's area is included. Invisible items
    /// are skipped unless `force` is set.
    pub(crate) fn mark_dirty(
        &mut self,
        id: ItemId,
        rect: Option<Rect>,
        invalidate_children: bool,
        force: bool,
    ) {
        let Some(item) = self.item_opt(id) else {
            return;
        };
        if !item.in_scene || (!force && !item.visible) {
            return;
        }
        let local = match rect {
            Some(r) => r,
            None if invalidate_children => {
                union_nonempty(item.bounding_rect, self.children_bounding_rect(id))
            }
            None => item.bounding_rect,
        };
        let area = transform_rect_bbox(self.scene_transform_of(id), local);
        self.damage.add(area);
    }

    pub(crate) fn remove_event_filters_of(&mut self, id: ItemId) {
        self.event_filters.remove(&id);
        self.event_filters.retain(|_, filters| {
            filters.retain(|f| *f != id);
            !filters.is_empty()
        });
    }

    pub(crate) fn live_items(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.items.iter().enumerate().filter_map(|(i, n)| {
            n.as_ref().map(|n| {
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "ItemId uses 32-bit indices by design."
                )]
                ItemId::new(i as u32, n.generation)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    #[test]
    fn liveness_create_destroy_reuse() {
        let mut scene = Scene::new();
        let a = scene.create_item();
        assert!(scene.is_alive(a));
        scene.destroy_item(a);
        assert!(!scene.is_alive(a));
        let b = scene.create_item();
        assert_eq!(a.0, b.0, "slot is reused");
        assert_ne!(a, b, "generation differs");
        assert!(!scene.is_alive(a));
        assert!(scene.flags(a).is_none(), "stale ids read as absent");
        assert!(scene.children(a).is_empty());
    }

    #[test]
    fn custom_data_is_scoped_to_item_lifetime() {
        let mut scene = Scene::new();
        let a = scene.create_item();
        scene.set_data(a, 1, String::from("label")).unwrap();
        scene.set_data(a, 2, 42_u32).unwrap();
        assert_eq!(scene.data::<String>(a, 1).map(String::as_str), Some("label"));
        assert_eq!(scene.data::<u32>(a, 2), Some(&42));
        assert!(scene.data::<u32>(a, 1).is_none(), "wrong type reads as absent");

        *scene.data_mut::<u32>(a, 2).unwrap() += 1;
        assert_eq!(scene.data::<u32>(a, 2), Some(&43));

        scene.destroy_item(a);
        let b = scene.create_item();
        assert_eq!(a.0, b.0);
        assert!(scene.data::<u32>(b, 2).is_none(), "data dies with the item");
        assert_eq!(scene.set_data(a, 1, 0_u8), Err(SceneError::StaleItem(a)));
    }

    #[test]
    fn remove_data_drops_entry() {
        let mut scene = Scene::new();
        let a = scene.create_item();
        scene.set_data(a, 7, 1.5_f64).unwrap();
        let v = scene.remove_data(a, 7).unwrap();
        assert_eq!(v.downcast_ref::<f64>(), Some(&1.5));
        assert!(scene.remove_data(a, 7).is_none());
    }

    #[test]
    fn cache_mode_and_partial_updates() {
        let mut scene = Scene::new();
        let a = scene.create_item();
        scene.set_bounding_rect(a, Rect::new(0.0, 0.0, 50.0, 50.0));
        scene.add_item(a).unwrap();
        assert!(scene.cache(a).is_none());

        scene.set_cache_mode(a, CacheMode::ItemCoordinateCache);
        let cache = scene.cache_mut(a).unwrap();
        cache.set_key(11);
        cache.mark_painted();
        let _ = scene.take_damage();

        scene.update(a, Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
        let cache = scene.cache(a).unwrap();
        assert_eq!(cache.exposed(), &[Rect::new(0.0, 0.0, 10.0, 10.0)]);
        assert_eq!(cache.key(), Some(11));
        assert_eq!(
            scene.take_damage().union_rect(),
            Some(Rect::new(0.0, 0.0, 10.0, 10.0))
        );

        scene.purge_cache(a);
        assert!(scene.cache(a).unwrap().all_exposed());
        assert_eq!(scene.cache(a).unwrap().key(), None);

        scene.set_cache_mode(a, CacheMode::NoCache);
        assert!(scene.cache(a).is_none());
    }

    #[test]
    fn detached_items_produce_no_damage() {
        let mut scene = Scene::new();
        let a = scene.create_item();
        scene.set_bounding_rect(a, Rect::new(0.0, 0.0, 10.0, 10.0));
        scene.update(a, None);
        assert!(scene.take_damage().is_empty());
        scene.add_item(a).unwrap();
        let _ = scene.take_damage();
        scene.update(a, None);
        assert_eq!(
            scene.take_damage().union_rect(),
            Some(Rect::new(0.0, 0.0, 10.0, 10.0))
        );
    }
}
