// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Usage errors reported by scene mutations.

use core::fmt;

use crate::types::ItemId;

/// A rejected scene operation.
///
/// Every operation that returns a `SceneError` leaves the scene exactly as it
/// was and also logs the problem with [`log::warn!`], so callers that do not
/// care may ignore the result.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SceneError {
    /// The id does not refer to a live item.
    StaleItem(ItemId),
    /// An item cannot be its own parent.
    SelfParent(ItemId),
    /// The requested parent lies inside the item's own subtree.
    ParentIsDescendant {
        /// Item being reparented.
        item: ItemId,
        /// Requested parent.
        parent: ItemId,
    },
    /// An item cannot be its own focus proxy.
    SelfFocusProxy(ItemId),
    /// The proxy already forwards focus back to the item.
    FocusProxyCycle {
        /// Item whose proxy is being set.
        item: ItemId,
        /// Requested proxy.
        proxy: ItemId,
    },
    /// The proxy and the item do not share scene membership.
    FocusProxyCrossScene {
        /// Item whose proxy is being set.
        item: ItemId,
        /// Requested proxy.
        proxy: ItemId,
    },
    /// Stacking requires both items to share a parent.
    NotASibling {
        /// Item being restacked.
        item: ItemId,
        /// Requested sibling.
        sibling: ItemId,
    },
    /// The operation needs an item registered with the scene.
    NotInScene(ItemId),
    /// The operation needs a visible item.
    NotVisible(ItemId),
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaleItem(id) => write!(f, "item {id:?} is not alive"),
            Self::SelfParent(id) => write!(f, "item {id:?} cannot be its own parent"),
            Self::ParentIsDescendant { item, parent } => {
                write!(f, "cannot parent {item:?} to its descendant {parent:?}")
            }
            Self::SelfFocusProxy(id) => {
                write!(f, "item {id:?} cannot be its own focus proxy")
            }
            Self::FocusProxyCycle { item, proxy } => {
                write!(f, "{proxy:?} already proxies focus to {item:?}")
            }
            Self::FocusProxyCrossScene { item, proxy } => write!(
                f,
                "focus proxy {proxy:?} must share scene membership with {item:?}"
            ),
            Self::NotASibling { item, sibling } => {
                write!(f, "cannot stack {item:?} before {sibling:?}, which is not a sibling")
            }
            Self::NotInScene(id) => write!(f, "item {id:?} is not part of the scene"),
            Self::NotVisible(id) => write!(f, "item {id:?} is not visible"),
        }
    }
}

impl core::error::Error for SceneError {}

/// Log `err` as a usage diagnostic and hand it back for `?`/`Err`.
pub(crate) fn report(op: &str, err: SceneError) -> SceneError {
    log::warn!("{op}: {err}");
    err
}
