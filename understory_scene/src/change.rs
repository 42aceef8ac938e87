// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Item change requests and notifications.

use kurbo::{Affine, Point};

use crate::types::{ItemFlags, ItemId};

/// A pending change to an item, offered to
/// [`ItemHandler::item_change`](crate::ItemHandler::item_change) before it is
/// applied.
///
/// The handler returns the value to apply, which lets it clamp or veto the
/// change. Returning a different variant is treated as "keep the request".
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ItemChange {
    /// New position in parent coordinates.
    Position(Point),
    /// New explicit local matrix.
    Transform(Affine),
    /// New rotation in degrees.
    Rotation(f64),
    /// New uniform scale.
    Scale(f64),
    /// New transform origin point.
    TransformOrigin(Point),
    /// New visibility.
    Visible(bool),
    /// New enabled state.
    Enabled(bool),
    /// New selection state.
    Selected(bool),
    /// New local opacity (clamped to `0..=1` after the hook).
    Opacity(f64),
    /// New z value.
    ZValue(f64),
    /// New traits.
    Flags(ItemFlags),
    /// New parent.
    Parent(Option<ItemId>),
}

impl ItemChange {
    pub(crate) fn same_kind(&self, other: &Self) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }

    pub(crate) fn as_bool(self) -> Option<bool> {
        match self {
            Self::Visible(v) | Self::Enabled(v) | Self::Selected(v) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn as_f64(self) -> Option<f64> {
        match self {
            Self::Rotation(v) | Self::Scale(v) | Self::Opacity(v) | Self::ZValue(v) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn as_point(self) -> Option<Point> {
        match self {
            Self::Position(p) | Self::TransformOrigin(p) => Some(p),
            _ => None,
        }
    }

    pub(crate) fn as_flags(self) -> Option<ItemFlags> {
        match self {
            Self::Flags(f) => Some(f),
            _ => None,
        }
    }

    pub(crate) fn as_parent(self) -> Option<Option<ItemId>> {
        match self {
            Self::Parent(p) => Some(p),
            _ => None,
        }
    }
}

/// A change that has been applied, reported through
/// [`ItemHandler::item_changed`](crate::ItemHandler::item_changed).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ItemChanged {
    /// Position changed.
    Position(Point),
    /// Explicit local matrix changed.
    Transform(Affine),
    /// Rotation changed.
    Rotation(f64),
    /// Scale changed.
    Scale(f64),
    /// Transform origin changed.
    TransformOrigin(Point),
    /// Visibility changed.
    Visible(bool),
    /// Enabled state changed.
    Enabled(bool),
    /// Selection changed.
    Selected(bool),
    /// Opacity changed.
    Opacity(f64),
    /// Z value changed.
    ZValue(f64),
    /// Traits changed.
    Flags(ItemFlags),
    /// Parent changed.
    Parent(Option<ItemId>),
    /// A child was attached.
    ChildAdded(ItemId),
    /// A child was detached.
    ChildRemoved(ItemId),
    /// The item joined (`true`) or left (`false`) the scene.
    SceneMembership(bool),
    /// The item's scene position changed (for items that opted in).
    ScenePosition(Point),
    /// The item became (`true`) or stopped being (`false`) the remembered
    /// focus item of its focus scope.
    FocusScopeItem(bool),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_matches_variant() {
        assert_eq!(ItemChange::Visible(true).as_bool(), Some(true));
        assert_eq!(ItemChange::Visible(true).as_f64(), None);
        assert_eq!(ItemChange::Opacity(0.5).as_f64(), Some(0.5));
        assert_eq!(ItemChange::Parent(None).as_parent(), Some(None));
        assert!(ItemChange::ZValue(1.0).same_kind(&ItemChange::ZValue(2.0)));
        assert!(!ItemChange::ZValue(1.0).same_kind(&ItemChange::Opacity(1.0)));
    }
}
