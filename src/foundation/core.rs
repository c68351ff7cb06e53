use crate::foundation::error::{AtlasflipError, AtlasflipResult};

pub use kurbo::{Affine, Point, Rect, Vec2};

/// Zero-based frame index into a symbol timeline.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Frame rate as a rational number (`num / den` frames per second).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator, must be > 0.
    pub num: u32,
    /// Denominator, must be > 0.
    pub den: u32,
}

impl Fps {
    /// Build a validated frame rate.
    pub fn new(num: u32, den: u32) -> AtlasflipResult<Self> {
        if num == 0 {
            return Err(AtlasflipError::validation("Fps num must be > 0"));
        }
        if den == 0 {
            return Err(AtlasflipError::validation("Fps den must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Frame rate as frames per second.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }
}

/// Logical output canvas size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Interpolation filter used when resampling transformed sprites.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SampleFilter {
    /// Nearest-neighbor lookup.
    Nearest,
    /// Bilinear interpolation over the 2x2 neighborhood.
    #[default]
    Bilinear,
    /// Catmull-Rom bicubic interpolation over the 4x4 neighborhood.
    Bicubic,
}
