// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clip regions and path collision tests.
//!
//! Kurbo has no path boolean operations, so an intersection of shapes is kept
//! as the list of shapes itself: a point is inside a [`ClipRegion`] when it is
//! inside every member path.

use alloc::vec::Vec;
use kurbo::{Affine, BezPath, PathEl, Point, Rect, Shape};
use smallvec::SmallVec;

const FLATTEN_TOLERANCE: f64 = 0.1;

/// Intersection of one or more closed paths, in item coordinates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClipRegion {
    paths: SmallVec<[BezPath; 2]>,
}

impl ClipRegion {
    pub(crate) fn from_path(path: BezPath) -> Self {
        let mut paths = SmallVec::new();
        paths.push(path);
        Self { paths }
    }

    /// The member paths; the region is their intersection.
    pub fn paths(&self) -> &[BezPath] {
        &self.paths
    }

    /// Returns true if `point` lies inside every member path.
    pub fn contains(&self, point: Point) -> bool {
        !self.paths.is_empty() && self.paths.iter().all(|p| p.contains(point))
    }

    /// Conservative bounds: the intersection of the members' bounds.
    pub fn bounding_box(&self) -> Rect {
        let mut it = self.paths.iter().map(Shape::bounding_box);
        let Some(first) = it.next() else {
            return Rect::ZERO;
        };
        it.fold(first, |acc, r| {
            if rects_overlap(acc, r) {
                acc.intersect(r)
            } else {
                Rect::ZERO
            }
        })
    }

    /// Returns true if the region is known to be empty.
    pub fn is_empty(&self) -> bool {
        self.bounding_box().is_zero_area()
    }

    /// Returns true if every member of `self` overlaps every member of
    /// `other`.
    ///
    /// This is exact for single-member regions and conservative otherwise.
    pub fn intersects(&self, other: &Self) -> bool {
        !self.paths.is_empty()
            && !other.paths.is_empty()
            && self
                .paths
                .iter()
                .all(|a| other.paths.iter().all(|b| paths_intersect(a, b)))
    }

    pub(crate) fn intersect_with(&mut self, path: BezPath) {
        self.paths.push(path);
    }

    pub(crate) fn apply_affine(&mut self, affine: Affine) {
        for p in &mut self.paths {
            p.apply_affine(affine);
        }
    }
}

/// Edge-inclusive overlap test for rects.
pub(crate) fn rects_overlap(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

/// Returns true if the filled areas of two paths overlap or touch.
pub(crate) fn paths_intersect(a: &BezPath, b: &BezPath) -> bool {
    if !rects_overlap(a.bounding_box(), b.bounding_box()) {
        return false;
    }
    let sa = segments(a);
    let sb = segments(b);
    if sa
        .iter()
        .any(|&(p0, p1)| sb.iter().any(|&(q0, q1)| segments_cross(p0, p1, q0, q1)))
    {
        return true;
    }
    // No crossing edges: either disjoint or one lies inside the other.
    let inside = |outer: &BezPath, inner: &[(Point, Point)]| {
        inner.first().is_some_and(|&(p, _)| outer.contains(p))
    };
    inside(a, &sb) || inside(b, &sa)
}

/// Flattened edges of a path, with every subpath implicitly closed.
fn segments(path: &BezPath) -> Vec<(Point, Point)> {
    let mut out = Vec::new();
    let mut start = None;
    let mut last = Point::ZERO;
    kurbo::flatten(path.iter(), FLATTEN_TOLERANCE, |el| match el {
        PathEl::MoveTo(p) => {
            close_subpath(&mut out, start, last);
            start = Some(p);
            last = p;
        }
        PathEl::LineTo(p) => {
            out.push((last, p));
            last = p;
        }
        PathEl::ClosePath => {
            close_subpath(&mut out, start, last);
            if let Some(s) = start {
                last = s;
            }
        }
        // Flattening only emits the elements above.
        PathEl::QuadTo(..) | PathEl::CurveTo(..) => {}
    });
    close_subpath(&mut out, start, last);
    out
}

fn close_subpath(out: &mut Vec<(Point, Point)>, start: Option<Point>, last: Point) {
    if let Some(s) = start
        && s != last
    {
        out.push((last, s));
    }
}

fn orientation(a: Point, b: Point, c: Point) -> f64 {
    (b - a).cross(c - a)
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

fn segments_cross(p0: Point, p1: Point, q0: Point, q1: Point) -> bool {
    let d1 = orientation(q0, q1, p0);
    let d2 = orientation(q0, q1, p1);
    let d3 = orientation(p0, p1, q0);
    let d4 = orientation(p0, p1, q1);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    (d1 == 0.0 && on_segment(q0, q1, p0))
        || (d2 == 0.0 && on_segment(q0, q1, p1))
        || (d3 == 0.0 && on_segment(p0, p1, q0))
        || (d4 == 0.0 && on_segment(p0, p1, q1))
}
