// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the scene: item identifiers, traits, and small enums.

/// Identifier for an item in a [`Scene`](crate::Scene) (generational).
///
/// Ids stay valid until the item is destroyed. A destroyed item's slot may be
/// reused, but the reused slot carries a newer generation, so old ids never
/// alias a new item.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ItemId(pub(crate) u32, pub(crate) u32);

impl ItemId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

bitflags::bitflags! {
    /// Traits of an item.
    ///
    /// Traits are set explicitly through [`Scene::set_flags`](crate::Scene::set_flags)
    /// and never change on their own, except for [`ItemFlags::STACKS_BEHIND_PARENT`]
    /// which follows the sign of the z value when
    /// [`ItemFlags::NEGATIVE_Z_STACKS_BEHIND_PARENT`] is set.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ItemFlags: u32 {
        /// Item is moved by dragging it with the mouse.
        const MOVABLE = 1 << 0;
        /// Item can be selected.
        const SELECTABLE = 1 << 1;
        /// Item accepts input focus.
        const FOCUSABLE = 1 << 2;
        /// Item clips itself to its shape.
        const CLIPS_TO_SHAPE = 1 << 3;
        /// Item clips all descendants to its shape.
        const CLIPS_CHILDREN_TO_SHAPE = 1 << 4;
        /// Item ignores the transforms of its ancestors (device-space anchored).
        const IGNORES_TRANSFORMATIONS = 1 << 5;
        /// Item starts a fresh opacity chain.
        const IGNORES_PARENT_OPACITY = 1 << 6;
        /// Item's opacity does not apply to its children.
        const DOESNT_PROPAGATE_OPACITY_TO_CHILDREN = 1 << 7;
        /// Item is stacked behind its parent.
        const STACKS_BEHIND_PARENT = 1 << 8;
        /// Item draws nothing itself.
        const HAS_NO_CONTENTS = 1 << 9;
        /// Position and transform changes go through the change hooks.
        const SENDS_GEOMETRY_CHANGES = 1 << 10;
        /// Item accepts input method events.
        const ACCEPTS_INPUT_METHOD = 1 << 11;
        /// A negative z value sets [`ItemFlags::STACKS_BEHIND_PARENT`].
        const NEGATIVE_Z_STACKS_BEHIND_PARENT = 1 << 12;
        /// Item is a panel: an independently activatable partition of the tree.
        const PANEL = 1 << 13;
        /// Item remembers which descendant last held focus.
        const FOCUS_SCOPE = 1 << 14;
        /// Item is notified whenever its scene position changes.
        const SENDS_SCENE_POSITION_CHANGES = 1 << 15;
        /// Children are known to lie inside the item's shape.
        const CONTAINS_CHILDREN_IN_SHAPE = 1 << 16;
        /// Item receives the events of its descendants (legacy grouping).
        const HANDLES_CHILD_EVENTS = 1 << 17;
        /// Item's event filter sees the events of its descendants.
        const FILTERS_CHILD_EVENTS = 1 << 18;
    }
}

bitflags::bitflags! {
    /// Cached summary of traits contributed by an item's ancestors.
    ///
    /// A bit is set when some proper ancestor carries the matching trait. Items
    /// without a parent always have no ancestor flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct AncestorFlags: u8 {
        /// Some ancestor clips its children.
        const CLIPS_CHILDREN = 1 << 0;
        /// Some ancestor ignores transformations.
        const IGNORES_TRANSFORMATIONS = 1 << 1;
        /// Some ancestor handles child events.
        const HANDLES_CHILD_EVENTS = 1 << 2;
        /// Some ancestor filters child events.
        const FILTERS_CHILD_EVENTS = 1 << 3;
        /// Some ancestor contains its children in its shape.
        const CONTAINS_CHILDREN = 1 << 4;
    }
}

impl AncestorFlags {
    /// The item trait that contributes this ancestor flag.
    ///
    /// `self` must be a single flag; the union of the matching traits is
    /// returned otherwise.
    pub fn trait_flag(self) -> ItemFlags {
        let mut out = ItemFlags::empty();
        if self.contains(Self::CLIPS_CHILDREN) {
            out |= ItemFlags::CLIPS_CHILDREN_TO_SHAPE;
        }
        if self.contains(Self::IGNORES_TRANSFORMATIONS) {
            out |= ItemFlags::IGNORES_TRANSFORMATIONS;
        }
        if self.contains(Self::HANDLES_CHILD_EVENTS) {
            out |= ItemFlags::HANDLES_CHILD_EVENTS;
        }
        if self.contains(Self::FILTERS_CHILD_EVENTS) {
            out |= ItemFlags::FILTERS_CHILD_EVENTS;
        }
        if self.contains(Self::CONTAINS_CHILDREN) {
            out |= ItemFlags::CONTAINS_CHILDREN_IN_SHAPE;
        }
        out
    }

    /// The ancestor flags an item with `flags` contributes to its children.
    pub fn contributed_by(flags: ItemFlags) -> Self {
        let mut out = Self::empty();
        for flag in Self::all().iter() {
            if flags.intersects(flag.trait_flag()) {
                out |= flag;
            }
        }
        out
    }
}

/// How an item's appearance is cached between paints.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum CacheMode {
    /// No paint cache.
    #[default]
    NoCache,
    /// Cache in item coordinates; survives transform changes.
    ItemCoordinateCache,
    /// Cache in device coordinates, one record per device.
    DeviceCoordinateCache,
}

/// Why focus moved.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum FocusReason {
    /// Focus moved because of a mouse action.
    Mouse,
    /// Focus moved forward with Tab.
    Tab,
    /// Focus moved backward with Backtab.
    Backtab,
    /// The panel or scene became (in)active.
    ActiveWindow,
    /// Any other reason.
    #[default]
    Other,
}

/// Wrap behavior of Tab traversal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    /// Do not wrap; reaching the end lets focus leave the scene.
    #[default]
    Never,
    /// Wrap around within the active panel.
    Scope,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contributed_flags_follow_traits() {
        let flags = ItemFlags::CLIPS_CHILDREN_TO_SHAPE | ItemFlags::FOCUSABLE;
        assert_eq!(
            AncestorFlags::contributed_by(flags),
            AncestorFlags::CLIPS_CHILDREN
        );
        let flags = ItemFlags::HANDLES_CHILD_EVENTS | ItemFlags::FILTERS_CHILD_EVENTS;
        assert_eq!(
            AncestorFlags::contributed_by(flags),
            AncestorFlags::HANDLES_CHILD_EVENTS | AncestorFlags::FILTERS_CHILD_EVENTS
        );
        assert!(AncestorFlags::contributed_by(ItemFlags::PANEL).is_empty());
    }

    #[test]
    fn each_ancestor_flag_maps_to_one_trait() {
        for flag in AncestorFlags::all().iter() {
            assert_eq!(
                flag.trait_flag().bits().count_ones(),
                1,
                "{flag:?} should map to exactly one trait"
            );
        }
    }
}
