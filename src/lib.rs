//! Atlasflip is a batch rasterizer for Adobe Animate texture atlas animations.
//!
//! Atlasflip turns an exported atlas package (atlas image plus JSON atlas and
//! animation descriptors) into RGBA frame sequences. A recursive resolver
//! flattens nested symbol timelines into ordered sprite placements, and a
//! caching slicer rasterizes each placement from the atlas for back-to-front
//! composition. Whole symbols render in memory-bounded batches through
//! pluggable frame sinks.
//!
//! # Pipeline overview
//!
//! 1. **Load**: parse [`AtlasDescriptor`] and [`Animation`] JSON, decode the atlas image
//! 2. **Resolve**: `symbol name + FrameIndex -> Vec<SpritePlacement>` (recursive timeline traversal)
//! 3. **Slice**: crop, color and transform one sprite into a tight canvas-clipped buffer, with LRU caching
//! 4. **Compose**: alpha-over paste of sliced sprites onto a transparent canvas
//! 5. **Batch**: drive frames `0..length(symbol)` through a [`FrameSink`] in memory-bounded batches
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Straight alpha**: every RGBA8 buffer is non-premultiplied, end to end.
//! - **No IO mid-render**: package data is loaded up front and held immutable
//!   for the renderer's lifetime.
//! - **Validate before evaluate**: descriptors are checked at load time so
//!   per-frame resolution cannot meet a dangling reference.
//!
//! # Getting started
//!
//! The `atlasflip` binary renders a package to a numbered PNG sequence; see
//! the repository README for end-user usage.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod atlas;
mod color;
mod foundation;
mod render;
mod timeline;

/// Affine transform helpers for atlas placement matrices.
pub mod transform;

pub use atlas::descriptor::{AtlasDescriptor, AtlasRegion, load_atlas_image};
pub use atlas::slicer::{AtlasSlicer, SlicedSprite};
pub use color::{ColorEffect, ColorEffectSpec, ColorMap};
pub use foundation::core::{Affine, Canvas, Fps, FrameIndex, Point, Rect, SampleFilter, Vec2};
pub use foundation::error::{AtlasflipError, AtlasflipResult};
pub use render::RenderConfig;
pub use render::batch::{
    BatchOptions, BatchRenderer, FrameSink, MemoryProbe, MemorySink, PngSequenceSink,
    ProcMemoryProbe, RenderStats, SinkConfig,
};
pub use render::compositor::compose_frame;
pub use timeline::model::{
    Animation, Element, Layer, LoopMode, SpriteElement, Symbol, SymbolElement, TimedFrame,
};
pub use timeline::resolver::{SpritePlacement, SymbolLibrary};
