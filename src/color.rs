use image::RgbaImage;

use crate::foundation::error::{AtlasflipError, AtlasflipResult};

/// Per-channel affine map over RGBA: `channel' = clamp(channel * mul + add, 0, 255)`.
#[derive(Clone, Copy, Debug, serde::Serialize)]
pub struct ColorMap {
    /// Channel multipliers in RGBA order.
    pub mul: [f32; 4],
    /// Channel offsets in RGBA order, applied after the multiply.
    pub add: [f32; 4],
}

/// Color/alpha adjustment applied to a sprite before its geometric transform.
#[derive(Clone, Copy, Debug, Default, serde::Serialize)]
pub enum ColorEffect {
    /// No channel change.
    #[default]
    Identity,
    /// Per-channel affine map.
    Map(ColorMap),
}

/// Descriptor-side color effect: a mode tag plus raw mode parameters.
///
/// Recognized modes are `advanced`, `alpha`, `brightness` and `tint`; an
/// unrecognized mode degrades to [`ColorEffect::Identity`] with a warning.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ColorEffectSpec {
    /// Effect mode tag.
    pub mode: String,
    /// Raw mode parameters, interpreted per mode.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
}

impl ColorEffect {
    /// Parse a descriptor effect into its resolved form.
    pub fn parse(spec: &ColorEffectSpec) -> AtlasflipResult<ColorEffect> {
        parse_mode_params(&spec.mode, &spec.params)
    }

    /// Whether this effect leaves pixels untouched.
    pub fn is_identity(&self) -> bool {
        matches!(self, ColorEffect::Identity)
    }

    /// Compose two effects: `self` applied to the output of `other`.
    ///
    /// The identity is absorptive on both sides and composition returns the
    /// other operand unchanged in that case.
    pub fn compose(&self, other: &ColorEffect) -> ColorEffect {
        match (self, other) {
            (ColorEffect::Identity, _) => *other,
            (_, ColorEffect::Identity) => *self,
            (ColorEffect::Map(f), ColorEffect::Map(g)) => {
                let mut mul = [0.0f32; 4];
                let mut add = [0.0f32; 4];
                for c in 0..4 {
                    mul[c] = f.mul[c] * g.mul[c];
                    add[c] = f.mul[c] * g.add[c] + f.add[c];
                }
                ColorEffect::Map(ColorMap { mul, add })
            }
        }
    }

    /// Apply the effect to an image in place. The identity is a no-op.
    pub fn apply(&self, image: &mut RgbaImage) {
        let ColorEffect::Map(map) = self else {
            return;
        };
        for px in image.pixels_mut() {
            for c in 0..4 {
                let v = f32::from(px.0[c]) * map.mul[c] + map.add[c];
                px.0[c] = v.clamp(0.0, 255.0).round() as u8;
            }
        }
    }

    /// Bit-pattern identity used for equality, hashing and cache keys.
    ///
    /// The identity and a map with identity coefficients produce the same
    /// key; they render identically.
    pub(crate) fn key(&self) -> [u32; 8] {
        match self {
            ColorEffect::Identity => {
                let one = 1.0f32.to_bits();
                let zero = 0.0f32.to_bits();
                [one, one, one, one, zero, zero, zero, zero]
            }
            ColorEffect::Map(m) => [
                m.mul[0].to_bits(),
                m.mul[1].to_bits(),
                m.mul[2].to_bits(),
                m.mul[3].to_bits(),
                m.add[0].to_bits(),
                m.add[1].to_bits(),
                m.add[2].to_bits(),
                m.add[3].to_bits(),
            ],
        }
    }
}

impl PartialEq for ColorEffect {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ColorEffect {}

impl std::hash::Hash for ColorEffect {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

fn parse_mode_params(mode: &str, params: &serde_json::Value) -> AtlasflipResult<ColorEffect> {
    let mode = mode.trim().to_ascii_lowercase();

    let params_obj = if params.is_null() {
        None
    } else {
        Some(params.as_object().ok_or_else(|| {
            AtlasflipError::content(format!("color effect '{mode}' params must be an object"))
        })?)
    };

    match mode.as_str() {
        "advanced" => {
            let mut mul = [1.0f32; 4];
            let mut add = [0.0f32; 4];
            for (i, channel) in ["red", "green", "blue", "alpha"].iter().enumerate() {
                let Some(v) = params_obj.and_then(|p| p.get(*channel)) else {
                    continue;
                };
                let pair = v.as_array().filter(|a| a.len() == 2).ok_or_else(|| {
                    AtlasflipError::content(format!(
                        "advanced.{channel} must be a [multiplier, offset] pair"
                    ))
                })?;
                let m = pair[0].as_f64().filter(|f| f.is_finite()).ok_or_else(|| {
                    AtlasflipError::content(format!(
                        "advanced.{channel} multiplier must be a finite number"
                    ))
                })?;
                let o = pair[1].as_f64().filter(|f| f.is_finite()).ok_or_else(|| {
                    AtlasflipError::content(format!(
                        "advanced.{channel} offset must be a finite number"
                    ))
                })?;
                mul[i] = m as f32;
                add[i] = o as f32;
            }
            Ok(ColorEffect::Map(ColorMap { mul, add }))
        }
        "alpha" => {
            let multiplier = match params_obj.and_then(|p| p.get("multiplier")) {
                None => 1.0,
                Some(v) => v.as_f64().filter(|f| f.is_finite()).ok_or_else(|| {
                    AtlasflipError::content("alpha.multiplier must be a finite number")
                })?,
            };
            Ok(ColorEffect::Map(ColorMap {
                mul: [1.0, 1.0, 1.0, multiplier as f32],
                add: [0.0; 4],
            }))
        }
        "brightness" => {
            let amount = match params_obj.and_then(|p| p.get("amount")) {
                None => 0.0,
                Some(v) => v.as_f64().filter(|f| f.is_finite()).ok_or_else(|| {
                    AtlasflipError::content("brightness.amount must be a finite number")
                })?,
            };
            let amount = amount.clamp(-1.0, 1.0) as f32;
            // Positive blends toward white, negative scales toward black.
            let (m, o) = if amount >= 0.0 {
                (1.0 - amount, 255.0 * amount)
            } else {
                (1.0 + amount, 0.0)
            };
            Ok(ColorEffect::Map(ColorMap {
                mul: [m, m, m, 1.0],
                add: [o, o, o, 0.0],
            }))
        }
        "tint" => {
            let target = params_obj
                .and_then(|p| p.get("color"))
                .ok_or_else(|| AtlasflipError::content("tint.color is required"))?;
            let arr = target
                .as_array()
                .filter(|a| a.len() == 3)
                .ok_or_else(|| AtlasflipError::content("tint.color must be a [r, g, b] array"))?;
            let mut rgb = [0.0f32; 3];
            for (i, v) in arr.iter().enumerate() {
                let f = v.as_f64().filter(|f| f.is_finite()).ok_or_else(|| {
                    AtlasflipError::content("tint.color components must be finite numbers")
                })?;
                rgb[i] = f.clamp(0.0, 255.0) as f32;
            }
            let amount = match params_obj.and_then(|p| p.get("amount")) {
                None => 1.0,
                Some(v) => v.as_f64().filter(|f| f.is_finite()).ok_or_else(|| {
                    AtlasflipError::content("tint.amount must be a finite number")
                })?,
            };
            let a = amount.clamp(0.0, 1.0) as f32;
            Ok(ColorEffect::Map(ColorMap {
                mul: [1.0 - a, 1.0 - a, 1.0 - a, 1.0],
                add: [rgb[0] * a, rgb[1] * a, rgb[2] * a, 0.0],
            }))
        }
        other => {
            tracing::warn!(mode = other, "unknown color effect mode, rendering uncolored");
            Ok(ColorEffect::Identity)
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/color.rs"]
mod tests;
