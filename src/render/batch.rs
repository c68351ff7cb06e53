//! Memory-bounded batch rendering and frame sinks.

use std::path::PathBuf;

use anyhow::Context as _;
use image::{RgbaImage, imageops};
use rayon::prelude::*;

use crate::atlas::slicer::AtlasSlicer;
use crate::color::ColorEffect;
use crate::foundation::core::{Affine, FrameIndex, Fps};
use crate::foundation::error::{AtlasflipError, AtlasflipResult};
use crate::render::compositor::compose_frame;
use crate::timeline::resolver::SymbolLibrary;

/// Source of system memory utilization samples for adaptive batch sizing.
pub trait MemoryProbe {
    /// Current utilization in `0.0..=1.0`, or `None` when it cannot be read.
    fn utilization(&mut self) -> Option<f32>;
}

/// Probe backed by `/proc/meminfo`.
///
/// On platforms without that file every sample is `None`, which leaves
/// the batch size untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcMemoryProbe;

impl MemoryProbe for ProcMemoryProbe {
    fn utilization(&mut self) -> Option<f32> {
        let text = std::fs::read_to_string("/proc/meminfo").ok()?;
        parse_meminfo_utilization(&text)
    }
}

fn parse_meminfo_utilization(text: &str) -> Option<f32> {
    let mut total = None;
    let mut available = None;
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            total = parse_meminfo_kb(rest);
        } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
            available = parse_meminfo_kb(rest);
        }
    }
    let total = total?;
    let available = available?;
    if total <= 0.0 {
        return None;
    }
    Some(((1.0 - available / total) as f32).clamp(0.0, 1.0))
}

fn parse_meminfo_kb(rest: &str) -> Option<f64> {
    rest.trim().strip_suffix("kB")?.trim().parse().ok()
}

/// Stream-level metadata handed to a sink before the first frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SinkConfig {
    /// Playback frame rate of the rendered symbol.
    pub fps: Fps,
    /// Total frame count of the rendered symbol.
    pub frame_count: u64,
}

/// Receiver for rendered frames.
///
/// `begin` is called once before any frame and `end` once after the last.
/// Frames arrive in ascending index order; frames that resolved to no
/// content are never pushed, so the index sequence may have gaps.
pub trait FrameSink {
    /// Receive stream metadata before the first frame.
    fn begin(&mut self, config: SinkConfig) -> AtlasflipResult<()>;
    /// Receive one rendered frame.
    fn push_frame(&mut self, index: FrameIndex, frame: &RgbaImage) -> AtlasflipResult<()>;
    /// Finish the stream after the final frame.
    fn end(&mut self) -> AtlasflipResult<()>;
}

/// Sink that buffers every frame in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    config: Option<SinkConfig>,
    /// Collected `(index, frame)` pairs in push order.
    pub frames: Vec<(FrameIndex, RgbaImage)>,
}

impl MemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Config received from `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.config
    }
}

impl FrameSink for MemorySink {
    fn begin(&mut self, config: SinkConfig) -> AtlasflipResult<()> {
        self.config = Some(config);
        Ok(())
    }

    fn push_frame(&mut self, index: FrameIndex, frame: &RgbaImage) -> AtlasflipResult<()> {
        self.frames.push((index, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> AtlasflipResult<()> {
        Ok(())
    }
}

/// Sink writing frames as `{prefix}_{index:04}.png` files under a directory.
///
/// The directory is created on `begin` if it does not exist.
#[derive(Debug)]
pub struct PngSequenceSink {
    dir: PathBuf,
    prefix: String,
}

impl PngSequenceSink {
    /// Sink writing into `dir`, naming files after `prefix`.
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }
}

impl FrameSink for PngSequenceSink {
    fn begin(&mut self, _config: SinkConfig) -> AtlasflipResult<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create output directory '{}'", self.dir.display()))?;
        Ok(())
    }

    fn push_frame(&mut self, index: FrameIndex, frame: &RgbaImage) -> AtlasflipResult<()> {
        let path = self.dir.join(format!("{}_{:04}.png", self.prefix, index.0));
        image::save_buffer_with_format(
            &path,
            frame.as_raw(),
            frame.width(),
            frame.height(),
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }

    fn end(&mut self) -> AtlasflipResult<()> {
        Ok(())
    }
}

#[derive(Clone, Debug)]
/// Batching and threading controls for sequence rendering.
pub struct BatchOptions {
    /// Starting and maximum batch size in frames.
    pub initial_batch_size: usize,
    /// Memory utilization in `(0.0, 1.0]` above which the batch size halves.
    pub memory_threshold: f32,
    /// Render frames within a batch on worker threads when `true`.
    pub parallel: bool,
    /// Optional explicit worker thread count.
    pub threads: Option<usize>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            initial_batch_size: 64,
            memory_threshold: 0.85,
            parallel: false,
            threads: None,
        }
    }
}

impl BatchOptions {
    /// Check the options for values that cannot drive a batch.
    pub fn validate(&self) -> AtlasflipResult<()> {
        if self.initial_batch_size == 0 {
            return Err(AtlasflipError::validation(
                "initial batch size must be at least 1",
            ));
        }
        if !(self.memory_threshold > 0.0 && self.memory_threshold <= 1.0) {
            return Err(AtlasflipError::validation(format!(
                "memory threshold {} must lie in (0.0, 1.0]",
                self.memory_threshold
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Aggregated rendering counters.
pub struct RenderStats {
    /// Total requested frames.
    pub frames_total: u64,
    /// Frames composited and pushed to the sink.
    pub frames_rendered: u64,
    /// Frames that resolved to no placements.
    pub frames_empty: u64,
    /// Frames skipped after a render failure.
    pub frames_failed: u64,
    /// Batches executed.
    pub batches: u64,
}

/// Batch driver rendering a symbol's full timeline through a sink.
///
/// Frames render in batches whose size adapts to memory pressure: after
/// each batch the probe is sampled, and utilization above the threshold
/// halves the next batch (minimum 1) while utilization at or below it
/// doubles the size back toward the configured initial value. Each batch
/// is padded to a common size and cropped to the union of its frames'
/// visible content before frames reach the sink.
pub struct BatchRenderer<'a> {
    library: &'a SymbolLibrary,
    slicer: AtlasSlicer,
    opts: BatchOptions,
    probe: Box<dyn MemoryProbe>,
    pool: Option<rayon::ThreadPool>,
}

impl std::fmt::Debug for BatchRenderer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchRenderer")
            .field("library", &self.library)
            .field("opts", &self.opts)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl<'a> BatchRenderer<'a> {
    /// Build a renderer over a validated library and slicer.
    pub fn new(
        library: &'a SymbolLibrary,
        slicer: AtlasSlicer,
        opts: BatchOptions,
    ) -> AtlasflipResult<Self> {
        opts.validate()?;
        let pool = if opts.parallel {
            Some(build_thread_pool(opts.threads)?)
        } else {
            None
        };
        Ok(Self {
            library,
            slicer,
            opts,
            probe: Box::new(ProcMemoryProbe),
            pool,
        })
    }

    /// Replace the memory probe, mainly for tests.
    pub fn with_probe(mut self, probe: Box<dyn MemoryProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Render a single frame of a symbol at canvas size.
    ///
    /// Returns `None` when the frame resolves to no placements.
    pub fn render_frame(
        &mut self,
        symbol: &str,
        frame: FrameIndex,
    ) -> AtlasflipResult<Option<RgbaImage>> {
        let placements =
            self.library
                .resolve_frame(symbol, frame, &Affine::IDENTITY, &ColorEffect::Identity)?;
        compose_frame(&placements, &mut self.slicer)
    }

    #[tracing::instrument(skip(self, sink))]
    /// Render frames `0..length(symbol)` through `sink`.
    ///
    /// Individual frame failures are logged and skipped. The run itself
    /// fails only for an unknown symbol, a sink error, or memory pressure
    /// that persists at batch size 1.
    pub fn render_symbol(
        &mut self,
        symbol: &str,
        sink: &mut dyn FrameSink,
    ) -> AtlasflipResult<RenderStats> {
        let total = self.library.length(symbol)?;
        sink.begin(SinkConfig {
            fps: self.library.fps(),
            frame_count: total,
        })?;

        let mut stats = RenderStats::default();
        let mut batch_size = self.opts.initial_batch_size as u64;
        let mut next = 0u64;
        while next < total {
            let end = (next + batch_size).min(total);
            let mut rendered = if self.opts.parallel {
                self.render_batch_parallel(symbol, next, end, &mut stats)?
            } else {
                self.render_batch(symbol, next, end, &mut stats)
            };
            stats.frames_total += end - next;
            stats.batches += 1;

            pad_to_common_size(&mut rendered);
            for (index, frame) in crop_to_content(rendered) {
                sink.push_frame(index, &frame)?;
                stats.frames_rendered += 1;
            }

            next = end;
            batch_size = self.adapt_batch_size(batch_size)?;
        }
        sink.end()?;
        Ok(stats)
    }

    fn render_batch(
        &mut self,
        symbol: &str,
        start: u64,
        end: u64,
        stats: &mut RenderStats,
    ) -> Vec<(FrameIndex, RgbaImage)> {
        let mut out = Vec::with_capacity((end - start) as usize);
        for f in start..end {
            match self.render_frame(symbol, FrameIndex(f)) {
                Ok(Some(frame)) => out.push((FrameIndex(f), frame)),
                Ok(None) => stats.frames_empty += 1,
                Err(err) => {
                    tracing::warn!(symbol, frame = f, error = %err, "frame render failed, skipping");
                    stats.frames_failed += 1;
                }
            }
        }
        out
    }

    fn render_batch_parallel(
        &self,
        symbol: &str,
        start: u64,
        end: u64,
        stats: &mut RenderStats,
    ) -> AtlasflipResult<Vec<(FrameIndex, RgbaImage)>> {
        let pool = self.pool.as_ref().ok_or_else(|| {
            AtlasflipError::resource("internal error: worker pool missing in parallel mode")
        })?;
        let library = self.library;
        let slicer = &self.slicer;
        let indices = (start..end).collect::<Vec<_>>();

        let results = pool.install(|| {
            indices
                .par_iter()
                .map_init(
                    || slicer.worker(),
                    |worker, f| -> AtlasflipResult<Option<RgbaImage>> {
                        let placements = library.resolve_frame(
                            symbol,
                            FrameIndex(*f),
                            &Affine::IDENTITY,
                            &ColorEffect::Identity,
                        )?;
                        compose_frame(&placements, worker)
                    },
                )
                .collect::<Vec<_>>()
        });

        let mut out = Vec::with_capacity(results.len());
        for (f, result) in indices.into_iter().zip(results) {
            match result {
                Ok(Some(frame)) => out.push((FrameIndex(f), frame)),
                Ok(None) => stats.frames_empty += 1,
                Err(err) => {
                    tracing::warn!(symbol, frame = f, error = %err, "frame render failed, skipping");
                    stats.frames_failed += 1;
                }
            }
        }
        Ok(out)
    }

    fn adapt_batch_size(&mut self, current: u64) -> AtlasflipResult<u64> {
        let initial = self.opts.initial_batch_size as u64;
        match self.probe.utilization() {
            Some(utilization) if utilization > self.opts.memory_threshold => {
                if current == 1 {
                    return Err(AtlasflipError::resource(format!(
                        "memory utilization {utilization:.2} still exceeds threshold {:.2} at batch size 1",
                        self.opts.memory_threshold
                    )));
                }
                let halved = (current / 2).max(1);
                tracing::debug!(
                    utilization,
                    batch_size = halved,
                    "memory pressure, batch size halved"
                );
                Ok(halved)
            }
            _ => Ok(current.saturating_mul(2).min(initial)),
        }
    }
}

fn build_thread_pool(threads: Option<usize>) -> AtlasflipResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(AtlasflipError::validation(
            "batch 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| AtlasflipError::resource(format!("failed to build rayon thread pool: {e}")))
}

fn pad_to_common_size(frames: &mut [(FrameIndex, RgbaImage)]) {
    let max_w = frames.iter().map(|(_, f)| f.width()).max().unwrap_or(0);
    let max_h = frames.iter().map(|(_, f)| f.height()).max().unwrap_or(0);
    for (_, frame) in frames.iter_mut() {
        if frame.width() == max_w && frame.height() == max_h {
            continue;
        }
        let mut padded = RgbaImage::new(max_w, max_h);
        let dx = ((max_w - frame.width()) / 2) as i64;
        let dy = ((max_h - frame.height()) / 2) as i64;
        imageops::replace(&mut padded, &*frame, dx, dy);
        *frame = padded;
    }
}

// Inclusive bounds of the pixels with non-zero alpha.
fn alpha_bbox(image: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel.0[3] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((min_x, min_y, max_x, max_y)) => {
                (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
            }
        });
    }
    bounds
}

fn crop_to_content(frames: Vec<(FrameIndex, RgbaImage)>) -> Vec<(FrameIndex, RgbaImage)> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    for (_, frame) in &frames {
        if let Some((x0, y0, x1, y1)) = alpha_bbox(frame) {
            min_x = min_x.min(x0);
            min_y = min_y.min(y0);
            max_x = max_x.max(x1);
            max_y = max_y.max(y1);
        }
    }
    if min_x > max_x {
        tracing::debug!("batch has no visible content, skipping");
        return Vec::new();
    }

    let w = max_x - min_x + 1;
    let h = max_y - min_y + 1;
    frames
        .into_iter()
        .map(|(index, frame)| {
            (index, imageops::crop_imm(&frame, min_x, min_y, w, h).to_image())
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/render/batch.rs"]
mod tests;
