use std::collections::BTreeMap;

use crate::color::{ColorEffect, ColorEffectSpec};
use crate::foundation::core::{Affine, FrameIndex, Fps};
use crate::foundation::error::{AtlasflipError, AtlasflipResult};
use crate::timeline::model::{Animation, Element, LoopMode, Symbol};
use crate::transform::from_m4x4;

/// Fully resolved leaf placement, ready to rasterize.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SpritePlacement {
    /// Sprite name in the atlas descriptor.
    pub sprite: String,
    /// Accumulated transform from the requested symbol down to this sprite.
    pub transform: Affine,
    /// Accumulated color effect.
    pub color: ColorEffect,
}

#[derive(Debug)]
enum ResolvedElement {
    Sprite {
        sprite: String,
        transform: Affine,
        color: ColorEffect,
    },
    Symbol {
        symbol: String,
        transform: Affine,
        color: ColorEffect,
        loop_mode: LoopMode,
    },
}

#[derive(Debug)]
struct ResolvedFrame {
    start: u64,
    end: u64,
    elements: Vec<ResolvedElement>,
}

#[derive(Debug)]
struct ResolvedLayer {
    frames: Vec<ResolvedFrame>,
}

#[derive(Debug)]
struct ResolvedSymbol {
    layers: Vec<ResolvedLayer>,
}

/// Validated, immutable symbol library with the recursive frame resolver.
///
/// Construction validates the whole graph (dangling references, layer
/// contiguity, reference cycles) and pre-parses placement matrices and
/// color effects, so per-frame resolution is pure traversal.
#[derive(Debug)]
pub struct SymbolLibrary {
    fps: Fps,
    root: String,
    symbols: BTreeMap<String, ResolvedSymbol>,
    lengths: BTreeMap<String, u64>,
}

impl SymbolLibrary {
    /// Validate an animation and build the resolvable library.
    pub fn new(animation: Animation) -> AtlasflipResult<Self> {
        animation.validate()?;

        let mut symbols = BTreeMap::new();
        let mut lengths = BTreeMap::new();
        for (name, symbol) in &animation.symbols {
            lengths.insert(name.clone(), symbol_length(symbol));
            symbols.insert(name.clone(), resolve_symbol(name, symbol)?);
        }
        Ok(Self {
            fps: animation.fps,
            root: animation.root_symbol,
            symbols,
            lengths,
        })
    }

    /// Playback frame rate of the package.
    pub fn fps(&self) -> Fps {
        self.fps
    }

    /// Entry-point symbol name.
    pub fn root_symbol(&self) -> &str {
        &self.root
    }

    /// All symbol names in sorted order.
    pub fn symbol_names(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(String::as_str)
    }

    /// Total frame count of a symbol: the max layer end at its own top
    /// level, with no loop-mode remapping applied.
    pub fn length(&self, symbol: &str) -> AtlasflipResult<u64> {
        self.lengths
            .get(symbol)
            .copied()
            .ok_or_else(|| AtlasflipError::content(format!("unknown symbol '{symbol}'")))
    }

    #[tracing::instrument(skip(self, transform, color))]
    /// Flatten one frame of a symbol into back-to-front leaf placements.
    ///
    /// `transform` and `color` are inherited state composed onto every
    /// placement; pass identity values at the top level.
    pub fn resolve_frame(
        &self,
        symbol: &str,
        frame: FrameIndex,
        transform: &Affine,
        color: &ColorEffect,
    ) -> AtlasflipResult<Vec<SpritePlacement>> {
        let mut out = Vec::new();
        self.resolve_into(symbol, frame.0, *transform, *color, &mut out)?;
        Ok(out)
    }

    fn resolve_into(
        &self,
        symbol: &str,
        frame: u64,
        transform: Affine,
        color: ColorEffect,
        out: &mut Vec<SpritePlacement>,
    ) -> AtlasflipResult<()> {
        let resolved = self
            .symbols
            .get(symbol)
            .ok_or_else(|| AtlasflipError::content(format!("unknown symbol '{symbol}'")))?;

        for layer in &resolved.layers {
            // A layer shorter than the requested frame contributes nothing.
            let Some(timed) = layer.frames.iter().find(|f| f.start <= frame && frame < f.end)
            else {
                continue;
            };
            for element in &timed.elements {
                match element {
                    ResolvedElement::Sprite {
                        sprite,
                        transform: local,
                        color: local_color,
                    } => {
                        out.push(SpritePlacement {
                            sprite: sprite.clone(),
                            transform: transform * *local,
                            color: color.compose(local_color),
                        });
                    }
                    ResolvedElement::Symbol {
                        symbol: nested,
                        transform: local,
                        color: local_color,
                        loop_mode,
                    } => {
                        let len = self.length(nested)?;
                        let local_frame = match loop_mode {
                            LoopMode::Loop => {
                                if len == 0 {
                                    return Err(AtlasflipError::content(format!(
                                        "symbol '{nested}' has zero length and cannot loop \
                                         (referenced from '{symbol}' at frame {frame})"
                                    )));
                                }
                                frame % len
                            }
                            LoopMode::PlayOnce => frame.min(len.saturating_sub(1)),
                            LoopMode::SingleFrame => 0,
                        };
                        self.resolve_into(
                            nested,
                            local_frame,
                            transform * *local,
                            color.compose(local_color),
                            out,
                        )?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn symbol_length(symbol: &Symbol) -> u64 {
    symbol
        .layers
        .iter()
        .filter_map(|l| l.frames.last())
        .map(|f| f.start_index + f.duration)
        .max()
        .unwrap_or(0)
}

fn resolve_symbol(name: &str, symbol: &Symbol) -> AtlasflipResult<ResolvedSymbol> {
    let mut layers = Vec::with_capacity(symbol.layers.len());
    for layer in &symbol.layers {
        let mut frames = Vec::with_capacity(layer.frames.len());
        for timed in &layer.frames {
            let mut elements = Vec::with_capacity(timed.elements.len());
            for element in &timed.elements {
                elements.push(resolve_element(name, element)?);
            }
            frames.push(ResolvedFrame {
                start: timed.start_index,
                end: timed.start_index + timed.duration,
                elements,
            });
        }
        layers.push(ResolvedLayer { frames });
    }
    Ok(ResolvedSymbol { layers })
}

fn resolve_element(symbol: &str, element: &Element) -> AtlasflipResult<ResolvedElement> {
    Ok(match element {
        Element::Sprite(el) => ResolvedElement::Sprite {
            sprite: el.sprite.clone(),
            transform: from_m4x4(&el.transform),
            color: resolve_color(symbol, &el.color)?,
        },
        Element::Symbol(el) => ResolvedElement::Symbol {
            symbol: el.symbol.clone(),
            transform: from_m4x4(&el.transform),
            color: resolve_color(symbol, &el.color)?,
            loop_mode: el.loop_mode,
        },
    })
}

fn resolve_color(symbol: &str, spec: &Option<ColorEffectSpec>) -> AtlasflipResult<ColorEffect> {
    match spec {
        None => Ok(ColorEffect::Identity),
        Some(spec) => ColorEffect::parse(spec).map_err(|err| match err {
            AtlasflipError::Content(msg) => {
                AtlasflipError::content(format!("symbol '{symbol}': {msg}"))
            }
            other => other,
        }),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/resolver.rs"]
mod tests;
