use super::*;

fn parse(mode: &str, params: serde_json::Value) -> AtlasflipResult<ColorEffect> {
    ColorEffect::parse(&ColorEffectSpec {
        mode: mode.to_string(),
        params,
    })
}

fn map(effect: &ColorEffect) -> ColorMap {
    let ColorEffect::Map(m) = effect else {
        panic!("expected a map effect, got identity");
    };
    *m
}

#[test]
fn identity_absorbs_on_both_sides() {
    let e = parse("alpha", serde_json::json!({"multiplier": 0.5})).unwrap();
    assert_eq!(ColorEffect::Identity.compose(&e), e);
    assert_eq!(e.compose(&ColorEffect::Identity), e);
    assert_eq!(
        ColorEffect::Identity.compose(&ColorEffect::Identity),
        ColorEffect::Identity
    );
}

#[test]
fn apply_identity_leaves_pixel_bytes() {
    let mut img = RgbaImage::from_pixel(2, 2, image::Rgba([10, 200, 55, 128]));
    let before = img.clone();
    ColorEffect::Identity.apply(&mut img);
    assert_eq!(img.as_raw(), before.as_raw());
}

#[test]
fn apply_clamps_instead_of_wrapping() {
    let effect = parse("advanced", serde_json::json!({"red": [1.5, 0.0]})).unwrap();
    let mut img = RgbaImage::from_pixel(1, 1, image::Rgba([200, 100, 7, 255]));
    effect.apply(&mut img);
    let px = img.get_pixel(0, 0).0;
    assert_eq!(px[0], 255);
    assert_eq!(px[1], 100);
    assert_eq!(px[3], 255);
}

#[test]
fn advanced_parses_channel_pairs_with_defaults() {
    let effect = parse(
        "advanced",
        serde_json::json!({"red": [0.5, 10.0], "alpha": [0.25, 0.0]}),
    )
    .unwrap();
    let m = map(&effect);
    assert_eq!(m.mul, [0.5, 1.0, 1.0, 0.25]);
    assert_eq!(m.add, [10.0, 0.0, 0.0, 0.0]);
}

#[test]
fn advanced_rejects_malformed_pairs() {
    assert!(parse("advanced", serde_json::json!({"red": [1.0]})).is_err());
    assert!(parse("advanced", serde_json::json!({"red": "opaque"})).is_err());
    assert!(parse("advanced", serde_json::json!({"green": [1.0, null]})).is_err());
}

#[test]
fn alpha_multiplier_defaults_to_one() {
    let m = map(&parse("alpha", serde_json::Value::Null).unwrap());
    assert_eq!(m.mul, [1.0, 1.0, 1.0, 1.0]);
    assert_eq!(m.add, [0.0; 4]);

    let m = map(&parse("alpha", serde_json::json!({"multiplier": 0.5})).unwrap());
    assert_eq!(m.mul[3], 0.5);
    assert_eq!(m.mul[0], 1.0);
}

#[test]
fn brightness_blends_toward_white_or_black() {
    let up = map(&parse("brightness", serde_json::json!({"amount": 0.5})).unwrap());
    assert_eq!(up.mul[0], 0.5);
    assert_eq!(up.add[0], 127.5);
    assert_eq!(up.mul[3], 1.0);
    assert_eq!(up.add[3], 0.0);

    let down = map(&parse("brightness", serde_json::json!({"amount": -0.5})).unwrap());
    assert_eq!(down.mul[0], 0.5);
    assert_eq!(down.add[0], 0.0);
}

#[test]
fn brightness_amount_is_clamped() {
    let m = map(&parse("brightness", serde_json::json!({"amount": 5.0})).unwrap());
    assert_eq!(m.mul[0], 0.0);
    assert_eq!(m.add[0], 255.0);
}

#[test]
fn tint_requires_a_color() {
    let err = parse("tint", serde_json::json!({"amount": 0.5})).unwrap_err();
    assert!(err.to_string().contains("tint.color"));
    assert!(parse("tint", serde_json::json!({"color": [0.0, 0.0]})).is_err());
}

#[test]
fn tint_mixes_toward_the_target_color() {
    let m = map(&parse("tint", serde_json::json!({"color": [255.0, 0.0, 0.0]})).unwrap());
    // Amount defaults to 1.0: full replacement.
    assert_eq!(m.mul[0], 0.0);
    assert_eq!(m.add[0], 255.0);
    assert_eq!(m.mul[3], 1.0);
    assert_eq!(m.add[3], 0.0);

    let m = map(&parse(
        "tint",
        serde_json::json!({"color": [100.0, 50.0, 0.0], "amount": 0.5}),
    )
    .unwrap());
    assert_eq!(m.mul[0], 0.5);
    assert_eq!(m.add, [50.0, 25.0, 0.0, 0.0]);
}

#[test]
fn unknown_mode_degrades_to_identity() {
    let effect = parse("filters", serde_json::json!({"whatever": 1})).unwrap();
    assert!(effect.is_identity());
}

#[test]
fn mode_matching_ignores_case_and_whitespace() {
    let effect = parse("  Alpha ", serde_json::json!({"multiplier": 0.25})).unwrap();
    assert_eq!(map(&effect).mul[3], 0.25);
}

#[test]
fn params_must_be_an_object_when_present() {
    assert!(parse("alpha", serde_json::json!([1, 2])).is_err());
    assert!(parse("alpha", serde_json::json!("opaque")).is_err());
}

#[test]
fn compose_chains_multipliers_and_offsets() {
    // f(v) = 0.5v + 10 after g(v) = 2v + 5 must equal v + 12.5.
    let f = ColorEffect::Map(ColorMap {
        mul: [0.5; 4],
        add: [10.0; 4],
    });
    let g = ColorEffect::Map(ColorMap {
        mul: [2.0; 4],
        add: [5.0; 4],
    });
    let m = map(&f.compose(&g));
    assert_eq!(m.mul, [1.0; 4]);
    assert_eq!(m.add, [12.5; 4]);
}

#[test]
fn identity_map_equals_identity_effect() {
    let noop = ColorEffect::Map(ColorMap {
        mul: [1.0; 4],
        add: [0.0; 4],
    });
    assert_eq!(noop, ColorEffect::Identity);
}
