use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use image::RgbaImage;

use crate::atlas::descriptor::{AtlasDescriptor, AtlasRegion};
use crate::color::ColorEffect;
use crate::foundation::core::{Affine, Canvas, Point, Rect, SampleFilter};
use crate::foundation::error::{AtlasflipError, AtlasflipResult};
use crate::foundation::math;
use crate::render::RenderConfig;
use crate::transform::{TransformKey, invert, translation};

/// A transformed, color-adjusted sprite ready to paste onto the canvas.
#[derive(Clone, Debug)]
pub struct SlicedSprite {
    /// Rendered pixels, sized to the clipped bounding box.
    pub image: Arc<RgbaImage>,
    /// Canvas x offset to paste at.
    pub left: u32,
    /// Canvas y offset to paste at.
    pub top: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct SpriteCacheKey {
    name: String,
    transform: TransformKey,
    color: ColorEffect,
}

/// Renders named atlas regions under a transform and color effect.
///
/// Two caches back the slicer: untransformed region crops are cut from the
/// atlas once per name, and finished sprites are kept in a bounded
/// least-recently-used cache keyed by `(name, transform, color)`. Exported
/// timelines repeat the same matrices across frames, so the working set
/// stays small.
pub struct AtlasSlicer {
    atlas: Arc<RgbaImage>,
    regions: Arc<BTreeMap<String, AtlasRegion>>,
    canvas: Canvas,
    filter: SampleFilter,
    source_cache: HashMap<String, Arc<RgbaImage>>,
    sprite_cache: HashMap<SpriteCacheKey, SlicedSprite>,
    lru: VecDeque<SpriteCacheKey>,
    capacity: usize,
}

impl AtlasSlicer {
    /// Build a slicer over a decoded atlas image and its descriptor.
    pub fn new(
        atlas: RgbaImage,
        descriptor: &AtlasDescriptor,
        config: &RenderConfig,
    ) -> AtlasflipResult<Self> {
        config.validate()?;
        descriptor.validate()?;
        Ok(Self {
            atlas: Arc::new(atlas),
            regions: Arc::new(descriptor.sprites.clone()),
            canvas: config.canvas,
            filter: config.filter,
            source_cache: HashMap::new(),
            sprite_cache: HashMap::new(),
            lru: VecDeque::new(),
            capacity: config.sprite_cache_capacity,
        })
    }

    /// Logical canvas the slicer clips against.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Duplicate for use on another worker thread.
    ///
    /// The atlas pixels and region table are shared; the caches start empty
    /// so workers never contend.
    pub fn worker(&self) -> AtlasSlicer {
        AtlasSlicer {
            atlas: Arc::clone(&self.atlas),
            regions: Arc::clone(&self.regions),
            canvas: self.canvas,
            filter: self.filter,
            source_cache: HashMap::new(),
            sprite_cache: HashMap::new(),
            lru: VecDeque::new(),
            capacity: self.capacity,
        }
    }

    /// Render a named sprite under `transform` and `color`.
    ///
    /// Returns the sprite sized to its clipped bounding box together with
    /// the canvas offset to paste it at, or `Ok(None)` when the transformed
    /// sprite lies entirely outside the canvas.
    pub fn get_sprite(
        &mut self,
        name: &str,
        transform: &Affine,
        color: &ColorEffect,
    ) -> AtlasflipResult<Option<SlicedSprite>> {
        let key = SpriteCacheKey {
            name: name.to_string(),
            transform: TransformKey::from_affine(transform),
            color: *color,
        };
        if let Some(hit) = self.sprite_cache.get(&key).cloned() {
            self.touch(&key);
            return Ok(Some(hit));
        }

        let source = self.source_sprite(name)?;
        let (sw, sh) = source.dimensions();

        let bbox =
            transform.transform_rect_bbox(Rect::new(0.0, 0.0, f64::from(sw), f64::from(sh)));
        let min_x = bbox.x0.floor() as i64;
        let min_y = bbox.y0.floor() as i64;
        let max_x = bbox.x1.ceil() as i64;
        let max_y = bbox.y1.ceil() as i64;

        let cw = i64::from(self.canvas.width);
        let ch = i64::from(self.canvas.height);
        if max_x <= 0 || max_y <= 0 || min_x >= cw || min_y >= ch {
            tracing::warn!(
                sprite = name,
                "transformed sprite lies outside the canvas, consider increasing the canvas size"
            );
            return Ok(None);
        }

        let left = min_x.max(0);
        let top = min_y.max(0);
        let out_w = (max_x.min(cw) - left) as u32;
        let out_h = (max_y.min(ch) - top) as u32;
        if out_w == 0 || out_h == 0 {
            tracing::debug!(sprite = name, "transformed sprite has a degenerate bounding box");
            return Ok(None);
        }

        // Re-origin so the clipped box renders into a buffer of its own size;
        // resample cost scales with output area, not canvas area.
        let local = translation(-(left as f64), -(top as f64)) * *transform;
        let inverse = invert(&local)?;

        // Color applies in source-pixel space, before the geometric transform.
        let colored = if color.is_identity() {
            Arc::clone(&source)
        } else {
            let mut img = (*source).clone();
            color.apply(&mut img);
            Arc::new(img)
        };

        let image = resample(&colored, out_w, out_h, &inverse, self.filter);
        let sprite = SlicedSprite {
            image: Arc::new(image),
            left: left as u32,
            top: top as u32,
        };
        self.insert_sprite(key, sprite.clone());
        Ok(Some(sprite))
    }

    fn source_sprite(&mut self, name: &str) -> AtlasflipResult<Arc<RgbaImage>> {
        if let Some(img) = self.source_cache.get(name) {
            return Ok(Arc::clone(img));
        }
        let region = *self
            .regions
            .get(name)
            .ok_or_else(|| AtlasflipError::content(format!("unknown sprite '{name}'")))?;
        let (aw, ah) = self.atlas.dimensions();
        if region.x.checked_add(region.w).is_none_or(|r| r > aw)
            || region.y.checked_add(region.h).is_none_or(|b| b > ah)
        {
            return Err(AtlasflipError::content(format!(
                "sprite '{name}' region {}x{} at ({}, {}) exceeds atlas bounds {aw}x{ah}",
                region.w, region.h, region.x, region.y
            )));
        }

        let crop =
            image::imageops::crop_imm(&*self.atlas, region.x, region.y, region.w, region.h)
                .to_image();
        let crop = if region.rotated {
            image::imageops::rotate270(&crop)
        } else {
            crop
        };
        let crop = Arc::new(crop);
        self.source_cache.insert(name.to_string(), Arc::clone(&crop));
        Ok(crop)
    }

    fn insert_sprite(&mut self, key: SpriteCacheKey, sprite: SlicedSprite) {
        self.sprite_cache.insert(key.clone(), sprite);
        self.touch(&key);
        while self.lru.len() > self.capacity {
            if let Some(old) = self.lru.pop_front() {
                self.sprite_cache.remove(&old);
            }
        }
    }

    fn touch(&mut self, key: &SpriteCacheKey) {
        if let Some(pos) = self.lru.iter().position(|k| k == key) {
            self.lru.remove(pos);
        }
        self.lru.push_back(key.clone());
    }
}

fn resample(
    src: &RgbaImage,
    out_w: u32,
    out_h: u32,
    inverse: &Affine,
    filter: SampleFilter,
) -> RgbaImage {
    let mut out = RgbaImage::new(out_w, out_h);
    for oy in 0..out_h {
        for ox in 0..out_w {
            // Sample at the destination pixel center.
            let p = *inverse * Point::new(f64::from(ox) + 0.5, f64::from(oy) + 0.5);
            let px = match filter {
                SampleFilter::Nearest => sample_nearest(src, p),
                SampleFilter::Bilinear => sample_bilinear(src, p),
                SampleFilter::Bicubic => sample_bicubic(src, p),
            };
            out.put_pixel(ox, oy, image::Rgba(px));
        }
    }
    out
}

/// Source pixel as f32 RGBA; positions outside the source are transparent.
fn texel(src: &RgbaImage, x: i64, y: i64) -> [f32; 4] {
    if x < 0 || y < 0 || x >= i64::from(src.width()) || y >= i64::from(src.height()) {
        return [0.0; 4];
    }
    let p = src.get_pixel(x as u32, y as u32).0;
    [
        f32::from(p[0]),
        f32::from(p[1]),
        f32::from(p[2]),
        f32::from(p[3]),
    ]
}

fn sample_nearest(src: &RgbaImage, p: Point) -> [u8; 4] {
    let x = p.x.floor();
    let y = p.y.floor();
    if x < 0.0 || y < 0.0 || x >= f64::from(src.width()) || y >= f64::from(src.height()) {
        return [0; 4];
    }
    src.get_pixel(x as u32, y as u32).0
}

fn sample_bilinear(src: &RgbaImage, p: Point) -> [u8; 4] {
    let u = p.x - 0.5;
    let v = p.y - 0.5;
    let fx = (u - u.floor()) as f32;
    let fy = (v - v.floor()) as f32;
    let x0 = u.floor() as i64;
    let y0 = v.floor() as i64;

    let mut acc = [0.0f32; 4];
    for (dy, wy) in [(0, 1.0 - fy), (1, fy)] {
        for (dx, wx) in [(0, 1.0 - fx), (1, fx)] {
            let t = texel(src, x0 + dx, y0 + dy);
            let w = wx * wy;
            for c in 0..4 {
                acc[c] += t[c] * w;
            }
        }
    }
    quantize(acc)
}

fn sample_bicubic(src: &RgbaImage, p: Point) -> [u8; 4] {
    let u = p.x - 0.5;
    let v = p.y - 0.5;
    let fx = (u - u.floor()) as f32;
    let fy = (v - v.floor()) as f32;
    let x0 = u.floor() as i64;
    let y0 = v.floor() as i64;

    let mut acc = [0.0f32; 4];
    for dy in -1i64..=2 {
        let wy = math::catmull_rom(fy - dy as f32);
        if wy == 0.0 {
            continue;
        }
        for dx in -1i64..=2 {
            let wx = math::catmull_rom(fx - dx as f32);
            if wx == 0.0 {
                continue;
            }
            let t = texel(src, x0 + dx, y0 + dy);
            let w = wx * wy;
            for c in 0..4 {
                acc[c] += t[c] * w;
            }
        }
    }
    quantize(acc)
}

fn quantize(acc: [f32; 4]) -> [u8; 4] {
    [
        acc[0].clamp(0.0, 255.0).round() as u8,
        acc[1].clamp(0.0, 255.0).round() as u8,
        acc[2].clamp(0.0, 255.0).round() as u8,
        acc[3].clamp(0.0, 255.0).round() as u8,
    ]
}

#[cfg(test)]
#[path = "../../tests/unit/atlas/slicer.rs"]
mod tests;
