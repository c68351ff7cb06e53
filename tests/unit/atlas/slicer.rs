use super::*;
use crate::color::ColorMap;

/// 8x8 atlas: solid red "body" (4x4 at 0,0), solid blue "eyes" (2x2 at
/// 4,0), and "tall", a 3x2 gradient stored rotated a quarter turn
/// clockwise in a 2x3 region at (6,0).
fn test_atlas() -> RgbaImage {
    let mut atlas = RgbaImage::new(8, 8);
    for y in 0..4 {
        for x in 0..4 {
            atlas.put_pixel(x, y, image::Rgba([255, 0, 0, 255]));
        }
    }
    for y in 0..2 {
        for x in 4..6 {
            atlas.put_pixel(x, y, image::Rgba([0, 0, 255, 255]));
        }
    }
    let upright = [[10u8, 20, 30], [40, 50, 60]];
    for (sy, row) in upright.iter().enumerate() {
        for (sx, v) in row.iter().enumerate() {
            let rx = 6 + (1 - sy) as u32;
            let ry = sx as u32;
            atlas.put_pixel(rx, ry, image::Rgba([*v, 0, 0, 255]));
        }
    }
    atlas
}

fn test_descriptor() -> AtlasDescriptor {
    let mut descriptor = AtlasDescriptor::default();
    let mut add = |name: &str, x, y, w, h, rotated| {
        descriptor
            .sprites
            .insert(name.to_string(), AtlasRegion { x, y, w, h, rotated });
    };
    add("body", 0, 0, 4, 4, false);
    add("eyes", 4, 0, 2, 2, false);
    add("tall", 6, 0, 2, 3, true);
    descriptor
}

fn slicer_with(width: u32, height: u32, filter: SampleFilter) -> AtlasSlicer {
    let mut config = RenderConfig::new(Canvas { width, height });
    config.filter = filter;
    AtlasSlicer::new(test_atlas(), &test_descriptor(), &config).unwrap()
}

#[test]
fn identity_renders_the_region_at_the_origin() {
    let mut slicer = slicer_with(10, 10, SampleFilter::Nearest);
    let sprite = slicer
        .get_sprite("body", &Affine::IDENTITY, &ColorEffect::Identity)
        .unwrap()
        .unwrap();
    assert_eq!((sprite.left, sprite.top), (0, 0));
    assert_eq!(sprite.image.dimensions(), (4, 4));
    assert_eq!(sprite.image.get_pixel(0, 0).0, [255, 0, 0, 255]);
    assert_eq!(sprite.image.get_pixel(3, 3).0, [255, 0, 0, 255]);
}

#[test]
fn translation_offsets_the_paste_position() {
    let mut slicer = slicer_with(10, 10, SampleFilter::Nearest);
    let sprite = slicer
        .get_sprite("eyes", &translation(2.0, 3.0), &ColorEffect::Identity)
        .unwrap()
        .unwrap();
    assert_eq!((sprite.left, sprite.top), (2, 3));
    assert_eq!(sprite.image.dimensions(), (2, 2));
    assert_eq!(sprite.image.get_pixel(0, 0).0, [0, 0, 255, 255]);
}

#[test]
fn sprites_outside_the_canvas_are_culled() {
    let mut slicer = slicer_with(100, 100, SampleFilter::Bilinear);
    let sprite = slicer
        .get_sprite("body", &translation(-50.0, 0.0), &ColorEffect::Identity)
        .unwrap();
    assert!(sprite.is_none());
}

#[test]
fn rotated_regions_are_unrotated_before_use() {
    let mut slicer = slicer_with(10, 10, SampleFilter::Nearest);
    let sprite = slicer
        .get_sprite("tall", &Affine::IDENTITY, &ColorEffect::Identity)
        .unwrap()
        .unwrap();
    assert_eq!(sprite.image.dimensions(), (3, 2));
    assert_eq!(sprite.image.get_pixel(0, 0).0[0], 10);
    assert_eq!(sprite.image.get_pixel(2, 0).0[0], 30);
    assert_eq!(sprite.image.get_pixel(0, 1).0[0], 40);
    assert_eq!(sprite.image.get_pixel(2, 1).0[0], 60);
}

#[test]
fn color_effects_apply_to_the_sprite_pixels() {
    let mut slicer = slicer_with(10, 10, SampleFilter::Nearest);
    let faded = ColorEffect::Map(ColorMap {
        mul: [1.0, 1.0, 1.0, 0.5],
        add: [0.0; 4],
    });
    let sprite = slicer
        .get_sprite("body", &Affine::IDENTITY, &faded)
        .unwrap()
        .unwrap();
    assert_eq!(sprite.image.get_pixel(0, 0).0, [255, 0, 0, 128]);

    let plain = slicer
        .get_sprite("body", &Affine::IDENTITY, &ColorEffect::Identity)
        .unwrap()
        .unwrap();
    assert_eq!(plain.image.get_pixel(0, 0).0[3], 255);
}

#[test]
fn repeated_lookups_share_the_cached_sprite() {
    let mut slicer = slicer_with(10, 10, SampleFilter::Nearest);
    let first = slicer
        .get_sprite("body", &Affine::IDENTITY, &ColorEffect::Identity)
        .unwrap()
        .unwrap();
    let second = slicer
        .get_sprite("body", &Affine::IDENTITY, &ColorEffect::Identity)
        .unwrap()
        .unwrap();
    assert!(Arc::ptr_eq(&first.image, &second.image));
}

#[test]
fn cache_evicts_the_least_recently_used_sprite() {
    let mut config = RenderConfig::new(Canvas {
        width: 10,
        height: 10,
    });
    config.filter = SampleFilter::Nearest;
    config.sprite_cache_capacity = 2;
    let mut slicer = AtlasSlicer::new(test_atlas(), &test_descriptor(), &config).unwrap();

    slicer
        .get_sprite("body", &Affine::IDENTITY, &ColorEffect::Identity)
        .unwrap();
    slicer
        .get_sprite("eyes", &Affine::IDENTITY, &ColorEffect::Identity)
        .unwrap();
    // Touch body so eyes is the oldest entry when tall lands.
    slicer
        .get_sprite("body", &Affine::IDENTITY, &ColorEffect::Identity)
        .unwrap();
    slicer
        .get_sprite("tall", &Affine::IDENTITY, &ColorEffect::Identity)
        .unwrap();

    assert_eq!(slicer.sprite_cache.len(), 2);
    assert!(slicer.sprite_cache.keys().all(|k| k.name != "eyes"));
}

#[test]
fn regions_outside_the_atlas_fail_at_first_use() {
    let mut descriptor = test_descriptor();
    descriptor.sprites.insert(
        "oob".to_string(),
        AtlasRegion {
            x: 6,
            y: 6,
            w: 4,
            h: 4,
            rotated: false,
        },
    );
    descriptor.validate().unwrap();

    let config = RenderConfig::new(Canvas {
        width: 10,
        height: 10,
    });
    let mut slicer = AtlasSlicer::new(test_atlas(), &descriptor, &config).unwrap();
    let err = slicer
        .get_sprite("oob", &Affine::IDENTITY, &ColorEffect::Identity)
        .unwrap_err();
    assert!(matches!(err, AtlasflipError::Content(_)));
    assert!(err.to_string().contains("'oob'"));
}

#[test]
fn unknown_sprites_are_content_errors() {
    let mut slicer = slicer_with(10, 10, SampleFilter::Nearest);
    let err = slicer
        .get_sprite("ghost", &Affine::IDENTITY, &ColorEffect::Identity)
        .unwrap_err();
    assert!(matches!(err, AtlasflipError::Content(_)));
    assert!(err.to_string().contains("'ghost'"));
}

#[test]
fn scaling_resizes_the_output() {
    let mut slicer = slicer_with(20, 20, SampleFilter::Nearest);
    let sprite = slicer
        .get_sprite("eyes", &Affine::scale(2.0), &ColorEffect::Identity)
        .unwrap()
        .unwrap();
    assert_eq!((sprite.left, sprite.top), (0, 0));
    assert_eq!(sprite.image.dimensions(), (4, 4));
    assert_eq!(sprite.image.get_pixel(3, 3).0, [0, 0, 255, 255]);
}

#[test]
fn clipping_trims_to_canvas_bounds() {
    let mut slicer = slicer_with(10, 10, SampleFilter::Nearest);
    let sprite = slicer
        .get_sprite("body", &translation(8.0, 0.0), &ColorEffect::Identity)
        .unwrap()
        .unwrap();
    assert_eq!((sprite.left, sprite.top), (8, 0));
    assert_eq!(sprite.image.dimensions(), (2, 4));
}

#[test]
fn workers_start_with_empty_caches() {
    let mut slicer = slicer_with(10, 10, SampleFilter::Nearest);
    slicer
        .get_sprite("body", &Affine::IDENTITY, &ColorEffect::Identity)
        .unwrap();

    let mut worker = slicer.worker();
    assert!(worker.sprite_cache.is_empty());
    let sprite = worker
        .get_sprite("body", &Affine::IDENTITY, &ColorEffect::Identity)
        .unwrap()
        .unwrap();
    assert_eq!(sprite.image.dimensions(), (4, 4));
}

#[test]
fn bilinear_blends_across_sub_pixel_offsets() {
    let mut slicer = slicer_with(10, 10, SampleFilter::Bilinear);
    let sprite = slicer
        .get_sprite("tall", &translation(0.5, 0.0), &ColorEffect::Identity)
        .unwrap()
        .unwrap();
    // Half a pixel of offset splits each output texel between the source
    // texel and its left neighbor (transparent outside the sprite).
    assert_eq!(sprite.image.get_pixel(0, 0).0, [5, 0, 0, 128]);
    assert_eq!(sprite.image.get_pixel(1, 0).0, [15, 0, 0, 255]);
}
