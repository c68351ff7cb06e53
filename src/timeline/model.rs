use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::color::ColorEffectSpec;
use crate::foundation::core::Fps;
use crate::foundation::error::{AtlasflipError, AtlasflipResult};

fn identity_m4x4() -> [f64; 16] {
    let mut m = [0.0; 16];
    m[0] = 1.0;
    m[5] = 1.0;
    m[10] = 1.0;
    m[15] = 1.0;
    m
}

/// Frame mapping policy when a nested symbol's length differs from the
/// parent's requested frame index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LoopMode {
    /// Wrap modulo the nested symbol's own length.
    #[default]
    Loop,
    /// Clamp to the last frame once exhausted.
    PlayOnce,
    /// Always render local frame 0.
    SingleFrame,
}

/// Direct atlas sprite placement.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SpriteElement {
    /// Sprite name in the atlas descriptor.
    pub sprite: String,
    /// Column-major 4x4 placement matrix; only the 2D affine part is used.
    #[serde(default = "identity_m4x4")]
    pub transform: [f64; 16],
    /// Optional color effect for this placement.
    #[serde(default)]
    pub color: Option<ColorEffectSpec>,
}

/// Nested symbol instance with its own timing policy.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SymbolElement {
    /// Referenced symbol name.
    pub symbol: String,
    /// Column-major 4x4 placement matrix; only the 2D affine part is used.
    #[serde(default = "identity_m4x4")]
    pub transform: [f64; 16],
    /// Optional color effect for the whole instance.
    #[serde(default)]
    pub color: Option<ColorEffectSpec>,
    /// Frame mapping policy for the nested timeline.
    #[serde(default)]
    pub loop_mode: LoopMode,
}

/// One placed item in a timed frame.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum Element {
    /// A direct atlas sprite.
    Sprite(SpriteElement),
    /// A nested symbol instance.
    Symbol(SymbolElement),
}

/// A span of frames holding one element list.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TimedFrame {
    /// First frame index covered by this span.
    pub start_index: u64,
    /// Number of frames covered, must be >= 1.
    pub duration: u64,
    /// Placed elements, ordered back-to-front.
    #[serde(default)]
    pub elements: Vec<Element>,
}

/// An ordered, contiguous run of timed frames.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Layer {
    /// Optional display name used in diagnostics.
    #[serde(default)]
    pub name: String,
    /// Timed frames starting at 0, each beginning where the previous ended.
    #[serde(default)]
    pub frames: Vec<TimedFrame>,
}

/// A named, reusable timeline.
///
/// Layer order is authoritative for draw order: the first layer is the
/// furthest back.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Symbol {
    /// Layers in back-to-front order.
    #[serde(default)]
    pub layers: Vec<Layer>,
}

/// Symbol/timeline animation graph of one exported package.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Animation {
    /// Playback frame rate.
    pub fps: Fps,
    /// Entry-point symbol name.
    pub root_symbol: String,
    /// All symbols keyed by name.
    pub symbols: BTreeMap<String, Symbol>,
}

impl Animation {
    /// Parse an animation descriptor from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> AtlasflipResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| AtlasflipError::serde(format!("parse animation descriptor JSON: {e}")))
    }

    /// Parse an animation descriptor from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> AtlasflipResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            AtlasflipError::validation(format!(
                "open animation descriptor '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Check structural invariants of the whole graph.
    ///
    /// Layers must start at frame 0 and be contiguous with durations >= 1,
    /// every referenced symbol must exist, the root must be defined, and
    /// symbol references must be acyclic.
    pub fn validate(&self) -> AtlasflipResult<()> {
        if self.fps.num == 0 || self.fps.den == 0 {
            return Err(AtlasflipError::validation("fps must have num>0 and den>0"));
        }
        if !self.symbols.contains_key(&self.root_symbol) {
            return Err(AtlasflipError::validation(format!(
                "root symbol '{}' is not defined",
                self.root_symbol
            )));
        }

        for (name, symbol) in &self.symbols {
            for (li, layer) in symbol.layers.iter().enumerate() {
                let mut expected = 0u64;
                for (fi, frame) in layer.frames.iter().enumerate() {
                    if frame.duration == 0 {
                        return Err(AtlasflipError::validation(format!(
                            "symbol '{name}' layer {li} frame {fi} has zero duration"
                        )));
                    }
                    if frame.start_index != expected {
                        return Err(AtlasflipError::validation(format!(
                            "symbol '{name}' layer {li} frame {fi} starts at {} (expected {expected})",
                            frame.start_index
                        )));
                    }
                    expected = frame.start_index + frame.duration;

                    for element in &frame.elements {
                        if let Element::Symbol(nested) = element
                            && !self.symbols.contains_key(&nested.symbol)
                        {
                            return Err(AtlasflipError::content(format!(
                                "symbol '{name}' references missing symbol '{}'",
                                nested.symbol
                            )));
                        }
                    }
                }
            }
        }

        self.check_cycles()
    }

    fn check_cycles(&self) -> AtlasflipResult<()> {
        let mut refs: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (name, symbol) in &self.symbols {
            let entry = refs.entry(name.as_str()).or_default();
            for layer in &symbol.layers {
                for frame in &layer.frames {
                    for element in &frame.elements {
                        if let Element::Symbol(nested) = element {
                            entry.push(nested.symbol.as_str());
                        }
                    }
                }
            }
        }

        // Iterative DFS; 1 = on the current path, 2 = fully explored.
        let mut state: BTreeMap<&str, u8> = BTreeMap::new();
        for start in self.symbols.keys() {
            let start = start.as_str();
            if state.contains_key(start) {
                continue;
            }
            let mut stack: Vec<(&str, usize)> = vec![(start, 0)];
            state.insert(start, 1);
            while let Some(top) = stack.last_mut() {
                let (node, next) = (top.0, top.1);
                let children = refs.get(node).map(Vec::as_slice).unwrap_or(&[]);
                if next < children.len() {
                    top.1 += 1;
                    let child = children[next];
                    match state.get(child).copied() {
                        Some(1) => {
                            return Err(AtlasflipError::content(format!(
                                "symbol '{child}' participates in a reference cycle"
                            )));
                        }
                        Some(_) => {}
                        None => {
                            state.insert(child, 1);
                            stack.push((child, 0));
                        }
                    }
                } else {
                    state.insert(node, 2);
                    stack.pop();
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/model.rs"]
mod tests;
