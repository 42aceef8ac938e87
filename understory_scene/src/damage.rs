// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-region accumulator drained by the renderer.

use alloc::vec::Vec;
use kurbo::Rect;

/// Scene-space regions that need repainting.
///
/// The scene pushes rectangles here whenever an item's appearance or geometry
/// changes. [`Scene::take_damage`](crate::Scene::take_damage) hands the
/// accumulated set to the renderer and starts a fresh one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Damage {
    /// Scene-space rectangles that should be repainted.
    pub dirty_rects: Vec<Rect>,
}

impl Damage {
    /// Returns the union of all damage rects.
    pub fn union_rect(&self) -> Option<Rect> {
        let mut it = self.dirty_rects.iter().copied();
        let first = it.next()?;
        Some(it.fold(first, |acc, r| acc.union(r)))
    }

    /// Returns true if nothing needs repainting.
    pub fn is_empty(&self) -> bool {
        self.dirty_rects.is_empty()
    }

    /// Record a dirty scene-space rectangle. Zero-area rects are dropped.
    pub(crate) fn add(&mut self, rect: Rect) {
        if rect.is_zero_area() {
            return;
        }
        if self.dirty_rects.iter().any(|r| covers(*r, rect)) {
            return;
        }
        self.dirty_rects.push(rect);
    }
}

fn covers(outer: Rect, inner: Rect) -> bool {
    outer.x0 <= inner.x0 && outer.y0 <= inner.y0 && outer.x1 >= inner.x1 && outer.y1 >= inner.y1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contained_and_empty_rects_are_skipped() {
        let mut damage = Damage::default();
        damage.add(Rect::new(0.0, 0.0, 100.0, 100.0));
        damage.add(Rect::new(10.0, 10.0, 20.0, 20.0));
        damage.add(Rect::new(200.0, 0.0, 200.0, 50.0));
        assert_eq!(damage.dirty_rects.len(), 1);
        damage.add(Rect::new(150.0, 0.0, 160.0, 10.0));
        assert_eq!(
            damage.union_rect(),
            Some(Rect::new(0.0, 0.0, 160.0, 100.0))
        );
    }
}
