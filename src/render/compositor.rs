//! Alpha-over composition of resolved placements onto a canvas.

use image::RgbaImage;

use crate::atlas::slicer::{AtlasSlicer, SlicedSprite};
use crate::foundation::error::AtlasflipResult;
use crate::foundation::math;

/// Composite resolved placements back-to-front onto a transparent canvas.
///
/// Placements are painted in list order, so later entries cover earlier
/// ones. Sprites the slicer culls as off-canvas are skipped. Returns
/// `None` only for an empty placement list, which callers treat as an
/// empty frame.
pub fn compose_frame(
    placements: &[crate::timeline::resolver::SpritePlacement],
    slicer: &mut AtlasSlicer,
) -> AtlasflipResult<Option<RgbaImage>> {
    if placements.is_empty() {
        return Ok(None);
    }
    let canvas = slicer.canvas();
    let mut frame = RgbaImage::new(canvas.width, canvas.height);
    for placement in placements {
        let Some(sprite) =
            slicer.get_sprite(&placement.sprite, &placement.transform, &placement.color)?
        else {
            continue;
        };
        paste_over(&mut frame, &sprite);
    }
    Ok(Some(frame))
}

fn paste_over(dst: &mut RgbaImage, sprite: &SlicedSprite) {
    let (dst_w, dst_h) = dst.dimensions();
    for (sx, sy, src) in sprite.image.enumerate_pixels() {
        if src.0[3] == 0 {
            continue;
        }
        let dx = sprite.left + sx;
        let dy = sprite.top + sy;
        if dx >= dst_w || dy >= dst_h {
            continue;
        }
        let out = math::over_straight_rgba8(dst.get_pixel(dx, dy).0, src.0);
        dst.put_pixel(dx, dy, image::Rgba(out));
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
