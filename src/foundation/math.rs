/// Straight-alpha source-over blend of one RGBA8 pixel pair.
pub(crate) fn over_straight_rgba8(dst: [u8; 4], src: [u8; 4]) -> [u8; 4] {
    if src[3] == 0 {
        return dst;
    }
    if src[3] == 255 || dst[3] == 0 {
        return src;
    }

    let sa = f32::from(src[3]) / 255.0;
    let da = f32::from(dst[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return [0, 0, 0, 0];
    }

    let mut out = [0u8; 4];
    for c in 0..3 {
        let sc = f32::from(src[c]);
        let dc = f32::from(dst[c]);
        let v = (sc * sa + dc * da * (1.0 - sa)) / out_a;
        out[c] = v.clamp(0.0, 255.0).round() as u8;
    }
    out[3] = (out_a * 255.0).round() as u8;
    out
}

/// Catmull-Rom cubic kernel weight for a tap at distance `t` from the sample point.
pub(crate) fn catmull_rom(t: f32) -> f32 {
    let t = t.abs();
    if t < 1.0 {
        ((1.5 * t - 2.5) * t) * t + 1.0
    } else if t < 2.0 {
        ((-0.5 * t + 2.5) * t - 4.0) * t + 2.0
    } else {
        0.0
    }
}
