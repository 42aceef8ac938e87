// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Local transform description and its composition pipeline.
//!
//! An item maps its local coordinates into its parent's coordinates with
//!
//! ```text
//! item_to_parent = T(pos) ∘ G ∘ T(origin) ∘ R(rotation) ∘ S(scale) ∘ T(-origin) ∘ M
//! ```
//!
//! where `M` is the explicit local matrix and `G` the chain of elementary
//! transforms. Read right to left: a local point is first mapped by `M`, then
//! rotated and scaled about the origin point, then passed through the chain
//! (first element first), and finally offset by the item's position.
//!
//! [`TransformSpec::pipeline`] yields those stages in application order and
//! [`TransformSpec::compose`] folds them; both are the single source of truth
//! for the order.

use alloc::vec::Vec;
use kurbo::{Affine, Point, Vec2};
use smallvec::SmallVec;

/// One elementary transform in an item's transform chain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransformStep {
    /// Offset by a vector.
    Translate(Vec2),
    /// Rotate clockwise (in y-down coordinates) by degrees about a point.
    Rotate {
        /// Angle in degrees.
        degrees: f64,
        /// Center of rotation.
        origin: Point,
    },
    /// Scale about a point.
    Scale {
        /// Horizontal factor.
        sx: f64,
        /// Vertical factor.
        sy: f64,
        /// Fixed point of the scale.
        origin: Point,
    },
    /// Arbitrary affine matrix.
    Matrix(Affine),
}

impl TransformStep {
    /// The affine matrix for this step.
    pub fn to_affine(&self) -> Affine {
        match *self {
            Self::Translate(v) => Affine::translate(v),
            Self::Rotate { degrees, origin } => about(origin, Affine::rotate(degrees.to_radians())),
            Self::Scale { sx, sy, origin } => about(origin, Affine::scale_non_uniform(sx, sy)),
            Self::Matrix(m) => m,
        }
    }
}

fn about(origin: Point, m: Affine) -> Affine {
    Affine::translate(origin.to_vec2()) * m * Affine::translate(-origin.to_vec2())
}

/// Everything besides the position that makes up an item's local transform.
///
/// A default `TransformSpec` is the identity.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformSpec {
    /// Explicit local matrix, applied first.
    pub matrix: Affine,
    /// Rotation in degrees about [`TransformSpec::origin`].
    pub rotation: f64,
    /// Uniform scale about [`TransformSpec::origin`].
    pub scale: f64,
    /// Origin point for rotation and scale, in item coordinates.
    pub origin: Point,
    /// Elementary transforms, applied in list order after rotation and scale.
    pub chain: Vec<TransformStep>,
}

impl Default for TransformSpec {
    fn default() -> Self {
        Self {
            matrix: Affine::IDENTITY,
            rotation: 0.0,
            scale: 1.0,
            origin: Point::ZERO,
            chain: Vec::new(),
        }
    }
}

impl TransformSpec {
    /// The stages of the local transform in the order they act on a point.
    pub fn pipeline(&self) -> SmallVec<[Affine; 8]> {
        let mut stages = SmallVec::new();
        stages.push(self.matrix);
        stages.push(Affine::translate(-self.origin.to_vec2()));
        stages.push(Affine::scale(self.scale));
        stages.push(Affine::rotate(self.rotation.to_radians()));
        stages.push(Affine::translate(self.origin.to_vec2()));
        for step in &self.chain {
            stages.push(step.to_affine());
        }
        stages
    }

    /// Compose the pipeline into a single matrix (without the position).
    pub fn compose(&self) -> Affine {
        self.pipeline()
            .into_iter()
            .fold(Affine::IDENTITY, |acc, stage| stage * acc)
    }

    /// Returns true if every component is at its neutral value.
    pub fn is_identity(&self) -> bool {
        self.matrix == Affine::IDENTITY
            && self.rotation == 0.0
            && self.scale == 1.0
            && self.chain.is_empty()
    }
}

/// The item-to-parent matrix for an item at `pos` with an optional spec.
pub(crate) fn item_to_parent(pos: Point, spec: Option<&TransformSpec>) -> Affine {
    let local = spec.map(TransformSpec::compose).unwrap_or(Affine::IDENTITY);
    Affine::translate(pos.to_vec2()) * local
}
