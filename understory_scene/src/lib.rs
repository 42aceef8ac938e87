// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_scene --heading-base-level=0

//! Understory Scene: a Kurbo-native retained scene graph.
//!
//! Understory Scene is the item layer of a retained canvas: a tree of items
//! with local transforms, traits, focus, and event handlers, plus the
//! bookkeeping a view and a renderer need to drive it.
//!
//! - Items form trees owned by a [`Scene`]. Scene transforms, children
//!   bounding rects, and depth are cached and recomputed lazily on read.
//! - Visibility, enabled state, and opacity propagate down the tree; explicit
//!   settings on a child survive changes to its ancestors.
//! - One focus item per scene, with focus scopes, focus proxies, panels, and
//!   Tab traversal.
//! - Events are delivered through [`Scene::send_event`], which applies
//!   child-event delegation and scene event filters ahead of the item's
//!   [`ItemHandler`].
//! - Repaints are collected as scene-space [`Damage`]; items with a
//!   [`CacheMode`] keep an [`ItemCache`] record of what needs re-rendering.
//!
//! ## Not a renderer
//!
//! This crate does not paint. A renderer walks the tree (for example with
//! [`Scene::items_at`] or the children lists), reads scene transforms,
//! effective opacity, and clip paths, and drains [`Scene::take_damage`] to
//! learn what to repaint.
//!
//! ## Transform order
//!
//! An item's matrix to its parent applies, in order: the explicit matrix,
//! rotation and scale about the transform origin, the [`TransformStep`]
//! chain, and finally the position offset. See [`TransformSpec::pipeline`].
//!
//! ## Minimal example
//!
//! ```rust
//! use kurbo::{Point, Rect};
//! use understory_scene::{FocusReason, ItemFlags, Scene};
//!
//! let mut scene = Scene::new();
//! let root = scene.create_item();
//! let field = scene.create_item();
//! scene.set_bounding_rect(field, Rect::new(0.0, 0.0, 100.0, 20.0));
//! scene.set_flags(field, ItemFlags::FOCUSABLE);
//! scene.set_parent(field, Some(root)).unwrap();
//! scene.add_item(root).unwrap();
//!
//! scene.set_pos(root, Point::new(10.0, 10.0));
//! assert_eq!(scene.item_at(Point::new(15.0, 15.0)), Some(field));
//!
//! scene.set_focus(field, FocusReason::Mouse);
//! assert!(scene.has_focus(field));
//!
//! // Hiding an ancestor takes focus away.
//! scene.hide(root);
//! assert_eq!(scene.focus_item(), None);
//! ```
//!
//! ## Diagnostics
//!
//! Rejected operations return a [`SceneError`] and are also logged through
//! the [`log`] facade at `warn` level. Focus and activation changes are
//! logged at `debug`, item lifecycle at `trace`.
//!
//! ## Features
//!
//! - `std` (default): forwards to Kurbo's `std` feature.
//! - `libm`: `no_std` builds that use `libm` for floating-point math.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod cache;
mod change;
mod clip;
mod damage;
mod dispatch;
mod error;
mod event;
mod focus;
mod geometry;
mod handler;
mod hierarchy;
mod item;
mod scene;
mod state;
mod transform;
mod types;
mod util;

pub use cache::{DeviceCache, DeviceId, ItemCache};
pub use change::{ItemChange, ItemChanged};
pub use clip::ClipRegion;
pub use damage::Damage;
pub use error::SceneError;
pub use event::{
    ContextMenuEvent, DragEvent, EventKind, HoverEvent, InputMethodEvent, Key, KeyEvent,
    Modifiers, MouseButtons, MouseEvent, SceneEvent, WheelEvent,
};
pub use handler::{DefaultHandler, ItemHandler};
pub use scene::{Scene, SceneConfig};
pub use transform::{TransformSpec, TransformStep};
pub use types::{AncestorFlags, CacheMode, FocusReason, ItemFlags, ItemId, WrapMode};
