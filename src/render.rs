//! Frame composition and batched sequence rendering.

pub mod batch;
pub mod compositor;

use crate::foundation::core::{Canvas, SampleFilter};
use crate::foundation::error::{AtlasflipError, AtlasflipResult};

/// Rasterization settings shared by every frame of a render.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderConfig {
    /// Output canvas size in pixels.
    pub canvas: Canvas,
    /// Resampling filter used when transforming sprites.
    pub filter: SampleFilter,
    /// Maximum number of transformed sprites kept in the slicer cache.
    pub sprite_cache_capacity: usize,
}

impl RenderConfig {
    /// Config with the default filter and cache capacity.
    pub fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            filter: SampleFilter::default(),
            sprite_cache_capacity: 1000,
        }
    }

    /// Check the config for values that cannot render.
    pub fn validate(&self) -> AtlasflipResult<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(AtlasflipError::validation(format!(
                "canvas size {}x{} must be non-zero in both dimensions",
                self.canvas.width, self.canvas.height
            )));
        }
        if self.sprite_cache_capacity == 0 {
            return Err(AtlasflipError::validation(
                "sprite cache capacity must be at least 1",
            ));
        }
        Ok(())
    }
}
