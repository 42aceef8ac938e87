// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::{Affine, Rect, Vec2};

/// Transform an axis-aligned `Rect` by an `Affine` and return a conservative
/// axis-aligned bounding box in the target space.
pub(crate) fn transform_rect_bbox(affine: Affine, rect: Rect) -> Rect {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    let min_x = (a * rect.x0).min(a * rect.x1) + (c * rect.y0).min(c * rect.y1);
    let max_x = (a * rect.x0).max(a * rect.x1) + (c * rect.y0).max(c * rect.y1);
    let min_y = (b * rect.x0).min(b * rect.x1) + (d * rect.y0).min(d * rect.y1);
    let max_y = (b * rect.x0).max(b * rect.x1) + (d * rect.y0).max(d * rect.y1);
    Rect::new(min_x + e, min_y + f, max_x + e, max_y + f)
}

/// Returns true if `affine` only translates.
pub(crate) fn is_translation(affine: Affine) -> bool {
    let [a, b, c, d, _, _] = affine.as_coeffs();
    a == 1.0 && b == 0.0 && c == 0.0 && d == 1.0
}

/// Translation part of an affine.
pub(crate) fn translation_of(affine: Affine) -> Vec2 {
    let [_, _, _, _, e, f] = affine.as_coeffs();
    Vec2::new(e, f)
}

/// Returns true if `affine` can be inverted without producing garbage.
pub(crate) fn is_invertible(affine: Affine) -> bool {
    let det = affine.determinant();
    det.is_finite() && det != 0.0
}

/// Union of two rects where an empty (zero-area) rect contributes nothing.
pub(crate) fn union_nonempty(acc: Rect, r: Rect) -> Rect {
    if r.is_zero_area() {
        acc
    } else if acc.is_zero_area() {
        r
    } else {
        acc.union(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f64::consts::FRAC_PI_2;

    #[test]
    fn bbox_of_rotated_rect() {
        let r = Rect::new(0.0, 0.0, 10.0, 20.0);
        let bbox = transform_rect_bbox(Affine::rotate(FRAC_PI_2), r);
        assert!((bbox.x0 + 20.0).abs() < 1e-9, "x0 = {}", bbox.x0);
        assert!((bbox.x1 - 0.0).abs() < 1e-9, "x1 = {}", bbox.x1);
        assert!((bbox.y1 - 10.0).abs() < 1e-9, "y1 = {}", bbox.y1);
    }

    #[test]
    fn translation_detection() {
        assert!(is_translation(Affine::translate((3.0, 4.0))));
        assert!(!is_translation(Affine::scale(2.0)));
        assert_eq!(
            translation_of(Affine::translate((3.0, 4.0))),
            Vec2::new(3.0, 4.0)
        );
    }

    #[test]
    fn singular_matrices_are_not_invertible() {
        assert!(is_invertible(Affine::rotate(0.3)));
        assert!(!is_invertible(Affine::scale_non_uniform(1.0, 0.0)));
    }

    #[test]
    fn empty_rects_do_not_grow_union() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(union_nonempty(Rect::ZERO, a), a);
        assert_eq!(union_nonempty(a, Rect::ZERO), a);
        assert_eq!(
            union_nonempty(a, Rect::new(5.0, 5.0, 20.0, 20.0)),
            Rect::new(0.0, 0.0, 20.0, 20.0)
        );
    }
}
