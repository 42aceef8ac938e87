// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transforms, coordinate mapping, and bounding geometry.
//!
//! Scene transforms are cached per item and recomputed on read. Any change to
//! an item's local geometry marks the item and its whole subtree dirty; the
//! next read walks up to the topmost dirty ancestor and recomputes downward
//! along that single path. An item whose parent chain consists only of pure
//! translations keeps the translate-only flag, and mapping through it skips
//! matrix multiplication.

use alloc::vec::Vec;
use kurbo::{Affine, BezPath, Point, Rect, Shape, Vec2};
use smallvec::SmallVec;

use crate::change::{ItemChange, ItemChanged};
use crate::clip::{ClipRegion, rects_overlap};
use crate::scene::Scene;
use crate::transform::{self, TransformSpec, TransformStep};
use crate::types::{AncestorFlags, ItemFlags, ItemId};
use crate::util::{is_invertible, is_translation, transform_rect_bbox, translation_of, union_nonempty};

const SHAPE_TOLERANCE: f64 = 0.1;

fn invert(m: Affine) -> Option<Affine> {
    is_invertible(m).then(|| m.inverse())
}

impl Scene {
    /// Position of an item in parent coordinates.
    pub fn pos(&self, id: ItemId) -> Option<Point> {
        self.item_opt(id).map(|n| n.pos)
    }

    /// Move an item to `pos` in parent coordinates.
    ///
    /// Items with [`ItemFlags::SENDS_GEOMETRY_CHANGES`] or
    /// [`ItemFlags::SENDS_SCENE_POSITION_CHANGES`] route the new position
    /// through their change hook first.
    pub fn set_pos(&mut self, id: ItemId, pos: Point) {
        let Some(item) = self.item_opt(id) else {
            return;
        };
        if item.pos == pos || item.in_destructor {
            return;
        }
        let notify = item.flags.intersects(
            ItemFlags::SENDS_GEOMETRY_CHANGES | ItemFlags::SENDS_SCENE_POSITION_CHANGES,
        );
        let pos = if notify {
            self.item_change(id, ItemChange::Position(pos))
                .as_point()
                .unwrap_or(pos)
        } else {
            pos
        };
        if self.item(id).pos == pos {
            return;
        }
        self.prepare_geometry_change(id);
        self.item_mut(id).pos = pos;
        self.transform_changed(id);
        if notify {
            self.item_changed(id, ItemChanged::Position(pos));
        }
        self.send_scene_pos_change(id);
    }

    /// Move an item by `delta` in parent coordinates.
    pub fn move_by(&mut self, id: ItemId, delta: Vec2) {
        if let Some(pos) = self.pos(id) {
            self.set_pos(id, pos + delta);
        }
    }

    /// The item's transform description, if it ever had one.
    pub fn transform_spec(&self, id: ItemId) -> Option<&TransformSpec> {
        self.item_opt(id)?.transform.as_ref()
    }

    /// Explicit local matrix (identity unless set).
    pub fn transform(&self, id: ItemId) -> Option<Affine> {
        let item = self.item_opt(id)?;
        Some(item.transform.as_ref().map_or(Affine::IDENTITY, |t| t.matrix))
    }

    /// Set the explicit local matrix.
    pub fn set_transform(&mut self, id: ItemId, matrix: Affine) {
        self.apply_transform_change(id, ItemChange::Transform(matrix));
    }

    /// Rotation in degrees.
    pub fn rotation(&self, id: ItemId) -> Option<f64> {
        let item = self.item_opt(id)?;
        Some(item.transform.as_ref().map_or(0.0, |t| t.rotation))
    }

    /// Set the rotation in degrees about the transform origin.
    pub fn set_rotation(&mut self, id: ItemId, degrees: f64) {
        self.apply_transform_change(id, ItemChange::Rotation(degrees));
    }

    /// Uniform scale.
    pub fn scale(&self, id: ItemId) -> Option<f64> {
        let item = self.item_opt(id)?;
        Some(item.transform.as_ref().map_or(1.0, |t| t.scale))
    }

    /// Set the uniform scale about the transform origin.
    pub fn set_scale(&mut self, id: ItemId, scale: f64) {
        self.apply_transform_change(id, ItemChange::Scale(scale));
    }

    /// Origin point of rotation and scale, in item coordinates.
    pub fn transform_origin(&self, id: ItemId) -> Option<Point> {
        let item = self.item_opt(id)?;
        Some(item.transform.as_ref().map_or(Point::ZERO, |t| t.origin))
    }

    /// Set the origin point of rotation and scale.
    pub fn set_transform_origin(&mut self, id: ItemId, origin: Point) {
        self.apply_transform_change(id, ItemChange::TransformOrigin(origin));
    }

    /// Elementary transform chain.
    pub fn transformations(&self, id: ItemId) -> &[TransformStep] {
        self.item_opt(id)
            .and_then(|n| n.transform.as_ref())
            .map(|t| t.chain.as_slice())
            .unwrap_or(&[])
    }

    /// Replace the elementary transform chain.
    pub fn set_transformations(&mut self, id: ItemId, chain: Vec<TransformStep>) {
        let Some(item) = self.item_opt(id) else {
            return;
        };
        if item.in_destructor {
            return;
        }
        self.prepare_geometry_change(id);
        self.item_mut(id)
            .transform
            .get_or_insert_with(TransformSpec::default)
            .chain = chain;
        self.transform_changed(id);
        self.send_scene_pos_change(id);
    }

    /// Matrix mapping item coordinates to parent coordinates.
    pub fn transform_to_parent(&self, id: ItemId) -> Option<Affine> {
        self.item_opt(id)?;
        Some(self.local_to_parent(id))
    }

    /// Matrix mapping item coordinates to scene coordinates.
    pub fn scene_transform(&self, id: ItemId) -> Option<Affine> {
        self.item_opt(id)?;
        Some(self.scene_transform_of(id))
    }

    /// Returns true if the scene transform is a pure translation.
    pub fn has_translate_only_scene_transform(&self, id: ItemId) -> Option<bool> {
        self.item_opt(id)?;
        self.scene_transform_of(id);
        Some(self.item(id).translate_only.get())
    }

    /// Position of the item's origin in scene coordinates.
    pub fn scene_pos(&self, id: ItemId) -> Option<Point> {
        self.map_to_scene(id, Point::ZERO)
    }

    /// Matrix mapping item coordinates to device coordinates, given the
    /// viewport's scene-to-device matrix.
    ///
    /// Items that ignore transformations (or descend from one) are anchored
    /// at the device position of their topmost ignoring ancestor and keep only
    /// the transforms below that anchor.
    pub fn device_transform(&self, id: ItemId, viewport: Affine) -> Option<Affine> {
        let item = self.item_opt(id)?;
        if !item
            .ancestor_flags
            .contains(AncestorFlags::IGNORES_TRANSFORMATIONS)
            && !item.flags.contains(ItemFlags::IGNORES_TRANSFORMATIONS)
        {
            return Some(viewport * self.scene_transform_of(id));
        }
        // Walk up to the topmost item that ignores transformations.
        let mut chain: SmallVec<[ItemId; 8]> = SmallVec::new();
        let mut anchor = id;
        while self
            .item(anchor)
            .ancestor_flags
            .contains(AncestorFlags::IGNORES_TRANSFORMATIONS)
        {
            chain.push(anchor);
            anchor = self.item(anchor).parent?;
        }
        let device_origin = viewport * self.scene_transform_of(anchor) * Point::ZERO;
        let anchor_local = self
            .item(anchor)
            .transform
            .as_ref()
            .map_or(Affine::IDENTITY, TransformSpec::compose);
        let mut m = Affine::translate(device_origin.to_vec2()) * anchor_local;
        for &below in chain.iter().rev() {
            m *= self.local_to_parent(below);
        }
        Some(m)
    }

    /// Matrix mapping `from`'s coordinates into `to`'s coordinates.
    ///
    /// Uses the lowest common ancestor when there is one and composes through
    /// scene coordinates otherwise. Returns `None` for stale ids or when a
    /// required inversion hits a singular matrix.
    pub fn item_transform(&self, from: ItemId, to: ItemId) -> Option<Affine> {
        self.item_opt(from)?;
        let to_item = self.item_opt(to)?;
        if from == to {
            return Some(Affine::IDENTITY);
        }
        let from_parent = self.item(from).parent;
        let to_parent = to_item.parent;
        if from_parent == Some(to) {
            return Some(self.local_to_parent(from));
        }
        if to_parent == Some(from) {
            return invert(self.local_to_parent(to));
        }
        if from_parent.is_some() && from_parent == to_parent {
            let from_local = self.local_to_parent(from);
            let to_local = self.local_to_parent(to);
            if is_translation(from_local) && is_translation(to_local) {
                return Some(Affine::translate(
                    translation_of(from_local) - translation_of(to_local),
                ));
            }
            return Some(invert(to_local)? * from_local);
        }
        let Some(common) = self.common_ancestor(from, to) else {
            let to_scene = self.scene_transform_of(to);
            return Some(invert(to_scene)? * self.scene_transform_of(from));
        };
        if common != from && common != to {
            let from_common = self.item_transform(from, common)?;
            let to_common = self.item_transform(to, common)?;
            return Some(invert(to_common)? * from_common);
        }
        // One is an ancestor of the other: compose along the path.
        let from_is_ancestor = common == from;
        let (child, root) = if from_is_ancestor { (to, from) } else { (from, to) };
        let mut m = Affine::IDENTITY;
        let mut cur = child;
        loop {
            m = self.local_to_parent(cur) * m;
            match self.item(cur).parent {
                Some(p) if p != root => cur = p,
                _ => break,
            }
        }
        if from_is_ancestor { invert(m) } else { Some(m) }
    }

    /// Map a point from item to scene coordinates.
    pub fn map_to_scene(&self, id: ItemId, point: Point) -> Option<Point> {
        self.item_opt(id)?;
        let st = self.scene_transform_of(id);
        if self.item(id).translate_only.get() {
            return Some(point + translation_of(st));
        }
        Some(st * point)
    }

    /// Map a point from scene to item coordinates.
    pub fn map_from_scene(&self, id: ItemId, point: Point) -> Option<Point> {
        self.item_opt(id)?;
        let st = self.scene_transform_of(id);
        if self.item(id).translate_only.get() {
            return Some(point - translation_of(st));
        }
        Some(invert(st)? * point)
    }

    /// Map a point from item to parent coordinates.
    pub fn map_to_parent(&self, id: ItemId, point: Point) -> Option<Point> {
        self.item_opt(id)?;
        Some(self.local_to_parent(id) * point)
    }

    /// Map a point from parent to item coordinates.
    pub fn map_from_parent(&self, id: ItemId, point: Point) -> Option<Point> {
        self.item_opt(id)?;
        Some(invert(self.local_to_parent(id))? * point)
    }

    /// Map a point from `id`'s coordinates into `other`'s.
    pub fn map_to_item(&self, id: ItemId, other: ItemId, point: Point) -> Option<Point> {
        Some(self.item_transform(id, other)? * point)
    }

    /// Map a point from `other`'s coordinates into `id`'s.
    pub fn map_from_item(&self, id: ItemId, other: ItemId, point: Point) -> Option<Point> {
        Some(self.item_transform(other, id)? * point)
    }

    /// Bounding box of a rect mapped from item to scene coordinates.
    pub fn map_rect_to_scene(&self, id: ItemId, rect: Rect) -> Option<Rect> {
        Some(transform_rect_bbox(self.scene_transform(id)?, rect))
    }

    /// Bounding box of a rect mapped from scene to item coordinates.
    pub fn map_rect_from_scene(&self, id: ItemId, rect: Rect) -> Option<Rect> {
        Some(transform_rect_bbox(invert(self.scene_transform(id)?)?, rect))
    }

    /// Bounding box of a rect mapped from `id`'s coordinates into `other`'s.
    pub fn map_rect_to_item(&self, id: ItemId, other: ItemId, rect: Rect) -> Option<Rect> {
        Some(transform_rect_bbox(self.item_transform(id, other)?, rect))
    }

    /// Map a path from item to scene coordinates.
    pub fn map_path_to_scene(&self, id: ItemId, path: &BezPath) -> Option<BezPath> {
        Some(self.scene_transform(id)? * path.clone())
    }

    /// Map a path from scene to item coordinates.
    pub fn map_path_from_scene(&self, id: ItemId, path: &BezPath) -> Option<BezPath> {
        Some(invert(self.scene_transform(id)?)? * path.clone())
    }

    /// Map a path from `id`'s coordinates into `other`'s.
    pub fn map_path_to_item(&self, id: ItemId, other: ItemId, path: &BezPath) -> Option<BezPath> {
        Some(self.item_transform(id, other)? * path.clone())
    }

    /// Local bounding rect.
    pub fn bounding_rect(&self, id: ItemId) -> Option<Rect> {
        self.item_opt(id).map(|n| n.bounding_rect)
    }

    /// Set the local bounding rect. Announces the geometry change first.
    pub fn set_bounding_rect(&mut self, id: ItemId, rect: Rect) {
        match self.item_opt(id) {
            Some(n) if n.bounding_rect != rect => {}
            _ => return,
        }
        self.prepare_geometry_change(id);
        let item = self.item_mut(id);
        item.bounding_rect = rect;
        // The repaint above may have refilled the cache from the old bounds.
        item.dirty_children_bounding_rect.set(true);
        self.mark_dirty(id, None, false, false);
    }

    /// Hit-test shape in item coordinates: the custom shape, or the bounding
    /// rect.
    pub fn shape(&self, id: ItemId) -> Option<BezPath> {
        self.item_opt(id)?;
        Some(self.shape_of(id))
    }

    /// Set a custom shape; `None` falls back to the bounding rect.
    pub fn set_shape(&mut self, id: ItemId, shape: Option<BezPath>) {
        if self.item_opt(id).is_none() {
            return;
        }
        self.prepare_geometry_change(id);
        let item = self.item_mut(id);
        item.shape = shape;
        // The repaint above may have refilled the cache from the old bounds.
        item.dirty_children_bounding_rect.set(true);
        self.mark_dirty(id, None, false, false);
    }

    /// Union of all descendants' bounds in item coordinates.
    ///
    /// Items that clip their children limit the contribution of their subtree
    /// to their own bounds. Returns an empty rect for stale ids.
    pub fn children_bounding_rect(&self, id: ItemId) -> Rect {
        let Some(item) = self.item_opt(id) else {
            return Rect::ZERO;
        };
        if !item.dirty_children_bounding_rect.get() {
            return item.children_bounding_rect.get();
        }
        let rect = self.children_bounding_rect_in(id, Affine::IDENTITY);
        item.children_bounding_rect.set(rect);
        item.dirty_children_bounding_rect.set(false);
        rect
    }

    /// Bounding rect mapped to scene coordinates.
    pub fn scene_bounding_rect(&self, id: ItemId) -> Option<Rect> {
        let item = self.item_opt(id)?;
        let st = self.scene_transform_of(id);
        if item.translate_only.get() {
            return Some(item.bounding_rect + translation_of(st));
        }
        Some(transform_rect_bbox(st, item.bounding_rect))
    }

    /// Announce that the item's bounds or shape are about to change.
    ///
    /// Must be called before the change so the old area is repainted and
    /// ancestors drop their cached children bounds. Does nothing while the
    /// item is being destroyed.
    pub fn prepare_geometry_change(&mut self, id: ItemId) {
        let Some(item) = self.item_opt(id) else {
            return;
        };
        if item.in_destructor {
            return;
        }
        item.dirty_children_bounding_rect.set(true);
        self.mark_dirty(id, None, true, false);
        self.mark_parent_dirty(id);
    }

    /// Returns true if the item or one of its ancestors clips it.
    pub fn is_clipped(&self, id: ItemId) -> bool {
        self.item_opt(id).is_some_and(|n| {
            n.ancestor_flags.contains(AncestorFlags::CLIPS_CHILDREN)
                || n.flags.contains(ItemFlags::CLIPS_TO_SHAPE)
        })
    }

    /// The region the item is clipped to, in item coordinates, or `None` if
    /// it is not clipped.
    pub fn clip_path(&self, id: ItemId) -> Option<ClipRegion> {
        if !self.is_clipped(id) {
            return None;
        }
        let item = self.item(id);
        if item.bounding_rect.is_zero_area() {
            return Some(ClipRegion::default());
        }
        let mut clip = ClipRegion::from_path(item.bounding_rect.to_path(SHAPE_TOLERANCE));
        if item.ancestor_flags.contains(AncestorFlags::CLIPS_CHILDREN) {
            let mut last = id;
            let mut cur = item.parent;
            while let Some(p) = cur {
                let parent = self.item(p);
                if parent.flags.contains(ItemFlags::CLIPS_CHILDREN_TO_SHAPE) {
                    let Some(m) = self.item_transform(last, p) else {
                        return Some(ClipRegion::default());
                    };
                    clip.apply_affine(m);
                    clip.intersect_with(self.shape_of(p));
                    if clip.is_empty() {
                        return Some(clip);
                    }
                    last = p;
                }
                if !parent.ancestor_flags.contains(AncestorFlags::CLIPS_CHILDREN) {
                    break;
                }
                cur = parent.parent;
            }
            if last != id {
                let Some(m) = self.item_transform(last, id) else {
                    return Some(ClipRegion::default());
                };
                clip.apply_affine(m);
            }
        }
        if item.flags.contains(ItemFlags::CLIPS_TO_SHAPE) {
            clip.intersect_with(self.shape_of(id));
        }
        Some(clip)
    }

    /// Returns true if `point` (item coordinates) lies in the item's shape,
    /// honoring clipping.
    pub fn contains(&self, id: ItemId, point: Point) -> bool {
        if self.item_opt(id).is_none() {
            return false;
        }
        match self.clip_path(id) {
            Some(clip) => clip.contains(point),
            None => self.shape_of(id).contains(point),
        }
    }

    /// Returns true if `path` (item coordinates) overlaps the item's shape,
    /// honoring clipping.
    pub fn collides_with_path(&self, id: ItemId, path: &BezPath) -> bool {
        let Some(region) = self.collision_region(id, true) else {
            return false;
        };
        region.intersects(&ClipRegion::from_path(path.clone()))
    }

    /// Returns true if the shapes of two items overlap, honoring clipping.
    pub fn collides_with_item(&self, id: ItemId, other: ItemId) -> bool {
        if id == other {
            return self.is_alive(id);
        }
        let (Some(item), Some(other_item)) = (self.item_opt(id), self.item_opt(other)) else {
            return false;
        };
        let clips = item.ancestor_flags.contains(AncestorFlags::CLIPS_CHILDREN);
        let other_clips = other_item
            .ancestor_flags
            .contains(AncestorFlags::CLIPS_CHILDREN);
        let Some(to_self) = self.item_transform(other, id) else {
            return false;
        };
        if clips || other_clips {
            // Items under the same clipper are clipped identically; compare
            // raw shapes.
            let closest = self.closest_clipper(if self.is_ancestor_of(id, other) {
                Some(id)
            } else {
                item.parent
            });
            let other_closest = self.closest_clipper(if self.is_ancestor_of(other, id) {
                Some(other)
            } else {
                other_item.parent
            });
            if closest == other_closest {
                let mut theirs = ClipRegion::from_path(self.shape_of(other));
                theirs.apply_affine(to_self);
                return self
                    .collision_region(id, false)
                    .is_some_and(|mine| mine.intersects(&theirs));
            }
        }
        let Some(mut theirs) = self.collision_region(other, true) else {
            return false;
        };
        theirs.apply_affine(to_self);
        self.collision_region(id, true)
            .is_some_and(|mine| mine.intersects(&theirs))
    }

    /// Items under a scene point, topmost first. Only visible items in the
    /// scene are considered.
    pub fn items_at(&self, scene_point: Point) -> Vec<ItemId> {
        let mut order = Vec::new();
        for &root in &self.top_level {
            self.collect_paint_order(root, &mut order);
        }
        order
            .into_iter()
            .rev()
            .filter(|&id| {
                self.map_from_scene(id, scene_point)
                    .is_some_and(|p| self.contains(id, p))
            })
            .collect()
    }

    /// Topmost visible item under a scene point.
    pub fn item_at(&self, scene_point: Point) -> Option<ItemId> {
        self.items_at(scene_point).into_iter().next()
    }

    // --- internals ---

    pub(crate) fn local_to_parent(&self, id: ItemId) -> Affine {
        let item = self.item(id);
        transform::item_to_parent(item.pos, item.transform.as_ref())
    }

    pub(crate) fn shape_of(&self, id: ItemId) -> BezPath {
        let item = self.item(id);
        match &item.shape {
            Some(path) => path.clone(),
            None => item.bounding_rect.to_path(SHAPE_TOLERANCE),
        }
    }

    /// Current scene transform of a live item, recomputing stale ancestors.
    pub(crate) fn scene_transform_of(&self, id: ItemId) -> Affine {
        let item = self.item(id);
        if !item.dirty_scene_transform.get() {
            return item.scene_transform.get();
        }
        // Every descendant of a dirty item is dirty, so the stale part of the
        // chain ends at the first clean ancestor.
        let mut chain: SmallVec<[ItemId; 16]> = SmallVec::new();
        chain.push(id);
        let mut cur = item.parent;
        while let Some(p) = cur {
            let parent = self.item(p);
            if !parent.dirty_scene_transform.get() {
                break;
            }
            chain.push(p);
            cur = parent.parent;
        }
        for &c in chain.iter().rev() {
            self.recompute_scene_transform(c);
        }
        self.item(id).scene_transform.get()
    }

    fn recompute_scene_transform(&self, id: ItemId) {
        let item = self.item(id);
        let own_translate_only = item
            .transform
            .as_ref()
            .is_none_or(|t| is_translation(t.compose()));
        let (st, translate_only) = match item.parent {
            Some(p) => {
                let parent = self.item(p);
                let pst = parent.scene_transform.get();
                if parent.translate_only.get() && own_translate_only {
                    let local = self.local_to_parent(id);
                    (
                        Affine::translate(translation_of(pst) + translation_of(local)),
                        true,
                    )
                } else {
                    (pst * self.local_to_parent(id), false)
                }
            }
            None => (self.local_to_parent(id), own_translate_only),
        };
        item.scene_transform.set(st);
        item.translate_only.set(translate_only);
        item.dirty_scene_transform.set(false);
    }

    /// Mark the scene transform of an item and its subtree stale.
    pub(crate) fn invalidate_scene_transform(&self, id: ItemId) {
        let mut stack: SmallVec<[ItemId; 16]> = SmallVec::new();
        stack.push(id);
        let mut first = true;
        while let Some(cur) = stack.pop() {
            let item = self.item(cur);
            if item.dirty_scene_transform.get() && !first {
                continue;
            }
            first = false;
            item.dirty_scene_transform.set(true);
            stack.extend(item.children.iter().copied());
        }
    }

    fn apply_transform_change(&mut self, id: ItemId, request: ItemChange) {
        let Some(item) = self.item_opt(id) else {
            return;
        };
        if item.in_destructor {
            return;
        }
        let notify = item.flags.contains(ItemFlags::SENDS_GEOMETRY_CHANGES);
        let request = if notify {
            self.item_change(id, request)
        } else {
            request
        };
        let current = self.item(id).transform.clone().unwrap_or_default();
        let mut next = current.clone();
        let changed = match request {
            ItemChange::Transform(m) => {
                next.matrix = m;
                ItemChanged::Transform(m)
            }
            ItemChange::Rotation(r) => {
                next.rotation = r;
                ItemChanged::Rotation(r)
            }
            ItemChange::Scale(s) => {
                next.scale = s;
                ItemChanged::Scale(s)
            }
            ItemChange::TransformOrigin(o) => {
                next.origin = o;
                ItemChanged::TransformOrigin(o)
            }
            _ => return,
        };
        if next == current {
            return;
        }
        self.prepare_geometry_change(id);
        self.item_mut(id).transform = Some(next);
        self.transform_changed(id);
        if notify {
            self.item_changed(id, changed);
        }
        self.send_scene_pos_change(id);
    }

    /// Invalidate cached transforms after a local geometry change and mark
    /// the new area dirty.
    pub(crate) fn transform_changed(&mut self, id: ItemId) {
        self.invalidate_scene_transform(id);
        self.mark_dirty(id, None, true, false);
    }

    /// Drop cached children bounds on every ancestor.
    pub(crate) fn mark_parent_dirty(&self, id: ItemId) {
        let mut cur = self.item(id).parent;
        while let Some(p) = cur {
            let parent = self.item(p);
            parent.dirty_children_bounding_rect.set(true);
            cur = parent.parent;
        }
    }

    /// Notify scene-position subscribers at or below `id`.
    pub(crate) fn send_scene_pos_change(&mut self, id: ItemId) {
        if self.scene_pos_items.is_empty() || !self.is_in_scene(id) {
            return;
        }
        let targets: SmallVec<[ItemId; 4]> = self
            .scene_pos_items
            .iter()
            .copied()
            .filter(|&t| t == id || self.is_ancestor_of(id, t))
            .collect();
        for t in targets {
            if let Some(p) = self.scene_pos(t) {
                self.item_changed(t, ItemChanged::ScenePosition(p));
            }
        }
    }

    fn children_bounding_rect_in(&self, id: ItemId, x: Affine) -> Rect {
        let item = self.item(id);
        let mut rect = Rect::ZERO;
        for &child in &item.children {
            let m = x * self.local_to_parent(child);
            let child_item = self.item(child);
            rect = union_nonempty(rect, transform_rect_bbox(m, child_item.bounding_rect));
            if !child_item.children.is_empty() {
                rect = union_nonempty(rect, self.children_bounding_rect_in(child, m));
            }
        }
        if item.flags.contains(ItemFlags::CLIPS_CHILDREN_TO_SHAPE) {
            let own = transform_rect_bbox(x, item.bounding_rect);
            rect = if rects_overlap(rect, own) {
                rect.intersect(own)
            } else {
                Rect::ZERO
            };
        }
        rect
    }

    fn collision_region(&self, id: ItemId, honor_clip: bool) -> Option<ClipRegion> {
        if honor_clip && let Some(clip) = self.clip_path(id) {
            return (!clip.is_empty()).then_some(clip);
        }
        self.item_opt(id)?;
        Some(ClipRegion::from_path(self.shape_of(id)))
    }

    fn closest_clipper(&self, start: Option<ItemId>) -> Option<ItemId> {
        let mut cur = start;
        while let Some(c) = cur {
            if self.item(c).flags.contains(ItemFlags::CLIPS_CHILDREN_TO_SHAPE) {
                return Some(c);
            }
            cur = self.item(c).parent;
        }
        None
    }

    /// Visible items of the subtree in back-to-front order.
    pub(crate) fn collect_paint_order(&self, id: ItemId, out: &mut Vec<ItemId>) {
        let item = self.item(id);
        if !item.visible {
            return;
        }
        let (behind, front): (SmallVec<[ItemId; 8]>, SmallVec<[ItemId; 8]>) = item
            .children
            .iter()
            .copied()
            .partition(|&c| self.item(c).stacks_behind_parent());
        for c in behind {
            self.collect_paint_order(c, out);
        }
        out.push(id);
        for c in front {
            self.collect_paint_order(c, out);
        }
    }
}
