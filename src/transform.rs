//! Affine transform helpers for descriptor matrices and cache identity.
//!
//! Animation descriptors carry placements as 16-element column-major 4x4
//! matrices. Only the 2D affine sub-block is meaningful here; the remaining
//! 3-D and perspective terms are ignored.

use crate::foundation::core::Affine;
use crate::foundation::error::{AtlasflipError, AtlasflipResult};

/// Extract the 2D affine part of a column-major 4x4 matrix.
///
/// Picks the coefficients at indices `[0, 4, 12, 1, 5, 13]`, mapping
/// `(x, y)` to `(m0*x + m4*y + m12, m1*x + m5*y + m13)`.
pub fn from_m4x4(m: &[f64; 16]) -> Affine {
    Affine::new([m[0], m[1], m[4], m[5], m[12], m[13]])
}

/// Plain translation by `(dx, dy)`.
pub fn translation(dx: f64, dy: f64) -> Affine {
    Affine::translate((dx, dy))
}

/// Invert a transform, rejecting singular matrices.
///
/// The renderer only inverts re-origin transforms it built itself, so a
/// singular matrix here means corrupt input rather than an expected state.
pub fn invert(t: &Affine) -> AtlasflipResult<Affine> {
    let det = t.determinant();
    if !det.is_finite() || det.abs() < 1e-12 {
        return Err(AtlasflipError::content(format!(
            "transform is singular and cannot be inverted (determinant {det})"
        )));
    }
    Ok(t.inverse())
}

/// Bit-exact cache identity for an affine transform.
///
/// Float coefficients compare by bit pattern, so the sprite cache is
/// exact-match rather than epsilon-tolerant. Matrices repeating across
/// frames (the common case in exported timelines) produce equal keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TransformKey([u64; 6]);

impl TransformKey {
    /// Build the key from a transform's coefficients.
    pub fn from_affine(t: &Affine) -> Self {
        let c = t.as_coeffs();
        Self([
            c[0].to_bits(),
            c[1].to_bits(),
            c[2].to_bits(),
            c[3].to_bits(),
            c[4].to_bits(),
            c[5].to_bits(),
        ])
    }
}

#[cfg(test)]
#[path = "../tests/unit/transform.rs"]
mod tests;
