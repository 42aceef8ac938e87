// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-item storage.

use alloc::{boxed::Box, vec::Vec};
use core::cell::Cell;
use kurbo::{Affine, BezPath, Point, Rect};
use smallvec::SmallVec;

use crate::cache::ItemCache;
use crate::handler::ItemHandler;
use crate::transform::TransformSpec;
use crate::types::{AncestorFlags, CacheMode, ItemFlags, ItemId};

pub(crate) struct Item {
    pub(crate) generation: u32,
    pub(crate) parent: Option<ItemId>,
    /// Children in stacking order (see `Scene::sort_siblings`).
    pub(crate) children: Vec<ItemId>,
    pub(crate) in_scene: bool,
    pub(crate) in_destructor: bool,

    // geometry
    pub(crate) pos: Point,
    pub(crate) transform: Option<TransformSpec>,
    pub(crate) bounding_rect: Rect,
    pub(crate) shape: Option<BezPath>,

    // cached geometry, recomputed on read
    pub(crate) scene_transform: Cell<Affine>,
    pub(crate) translate_only: Cell<bool>,
    pub(crate) dirty_scene_transform: Cell<bool>,
    pub(crate) children_bounding_rect: Cell<Rect>,
    pub(crate) dirty_children_bounding_rect: Cell<bool>,
    /// `None` until resolved.
    pub(crate) depth: Cell<Option<u32>>,

    pub(crate) flags: ItemFlags,
    pub(crate) ancestor_flags: AncestorFlags,

    // state
    pub(crate) visible: bool,
    pub(crate) explicitly_hidden: bool,
    pub(crate) enabled: bool,
    pub(crate) explicitly_disabled: bool,
    pub(crate) selected: bool,
    pub(crate) opacity: f64,
    pub(crate) z: f64,
    pub(crate) sibling_index: usize,

    // focus
    pub(crate) sub_focus_item: Option<ItemId>,
    pub(crate) focus_scope_item: Option<ItemId>,
    pub(crate) focus_proxy: Option<ItemId>,
    /// Items that name this item as their focus proxy.
    pub(crate) focus_proxy_refs: SmallVec<[ItemId; 2]>,

    pub(crate) cache_mode: CacheMode,
    pub(crate) cache: Option<ItemCache>,
    pub(crate) handler: Option<Box<dyn ItemHandler>>,
}

impl Item {
    pub(crate) fn new(generation: u32) -> Self {
        Self {
            generation,
            parent: None,
            children: Vec::new(),
            in_scene: false,
            in_destructor: false,
            pos: Point::ZERO,
            transform: None,
            bounding_rect: Rect::ZERO,
            shape: None,
            scene_transform: Cell::new(Affine::IDENTITY),
            translate_only: Cell::new(true),
            dirty_scene_transform: Cell::new(true),
            children_bounding_rect: Cell::new(Rect::ZERO),
            dirty_children_bounding_rect: Cell::new(true),
            depth: Cell::new(None),
            flags: ItemFlags::empty(),
            ancestor_flags: AncestorFlags::empty(),
            visible: true,
            explicitly_hidden: false,
            enabled: true,
            explicitly_disabled: false,
            selected: false,
            opacity: 1.0,
            z: 0.0,
            sibling_index: 0,
            sub_focus_item: None,
            focus_scope_item: None,
            focus_proxy: None,
            focus_proxy_refs: SmallVec::new(),
            cache_mode: CacheMode::NoCache,
            cache: None,
            handler: None,
        }
    }

    pub(crate) fn stacks_behind_parent(&self) -> bool {
        self.flags.contains(ItemFlags::STACKS_BEHIND_PARENT)
    }

    pub(crate) fn is_panel(&self) -> bool {
        self.flags.contains(ItemFlags::PANEL)
    }

    pub(crate) fn is_focus_scope(&self) -> bool {
        self.flags.contains(ItemFlags::FOCUS_SCOPE)
    }
}
