use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use atlasflip::{
    Animation, AtlasDescriptor, AtlasSlicer, BatchOptions, BatchRenderer, Canvas, PngSequenceSink,
    RenderConfig, SampleFilter, SymbolLibrary, load_atlas_image,
};

#[derive(Parser, Debug)]
#[command(name = "atlasflip", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a symbol as a numbered PNG sequence.
    Render(RenderArgs),
    /// List the symbols defined in an animation descriptor.
    Symbols(SymbolsArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Atlas descriptor JSON.
    #[arg(long)]
    atlas: PathBuf,

    /// Atlas image (PNG).
    #[arg(long)]
    image: PathBuf,

    /// Animation descriptor JSON.
    #[arg(long)]
    animation: PathBuf,

    /// Output directory for the PNG sequence.
    #[arg(long)]
    out: PathBuf,

    /// Symbol to render (defaults to the package's root symbol).
    #[arg(long)]
    symbol: Option<String>,

    /// Canvas width in pixels.
    #[arg(long)]
    width: u32,

    /// Canvas height in pixels.
    #[arg(long)]
    height: u32,

    /// Resampling filter for transformed sprites.
    #[arg(long, value_enum, default_value_t = FilterChoice::Bilinear)]
    filter: FilterChoice,

    /// Transformed-sprite cache capacity.
    #[arg(long, default_value_t = 1000)]
    cache_capacity: usize,

    /// Initial (and maximum) batch size in frames.
    #[arg(long, default_value_t = 64)]
    batch_size: usize,

    /// Memory utilization above which the batch size halves.
    #[arg(long, default_value_t = 0.85)]
    memory_threshold: f32,

    /// Enable frame-level parallelism within batches.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Override rayon worker threads (parallel mode only).
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FilterChoice {
    Nearest,
    Bilinear,
    Bicubic,
}

impl From<FilterChoice> for SampleFilter {
    fn from(choice: FilterChoice) -> Self {
        match choice {
            FilterChoice::Nearest => SampleFilter::Nearest,
            FilterChoice::Bilinear => SampleFilter::Bilinear,
            FilterChoice::Bicubic => SampleFilter::Bicubic,
        }
    }
}

#[derive(Parser, Debug)]
struct SymbolsArgs {
    /// Animation descriptor JSON.
    #[arg(long)]
    animation: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Symbols(args) => cmd_symbols(args),
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let descriptor = AtlasDescriptor::from_path(&args.atlas)?;
    let atlas = load_atlas_image(&args.image)?;
    let animation = Animation::from_path(&args.animation)?;
    let library = SymbolLibrary::new(animation)?;

    let symbol = args
        .symbol
        .unwrap_or_else(|| library.root_symbol().to_string());

    let config = RenderConfig {
        canvas: Canvas {
            width: args.width,
            height: args.height,
        },
        filter: args.filter.into(),
        sprite_cache_capacity: args.cache_capacity,
    };
    let slicer = AtlasSlicer::new(atlas, &descriptor, &config)?;

    let opts = BatchOptions {
        initial_batch_size: args.batch_size,
        memory_threshold: args.memory_threshold,
        parallel: args.parallel,
        threads: args.threads,
    };
    let mut renderer = BatchRenderer::new(&library, slicer, opts)?;
    let mut sink = PngSequenceSink::new(&args.out, symbol.as_str());
    let stats = renderer.render_symbol(&symbol, &mut sink)?;

    eprintln!(
        "wrote {} frames to {} ({} empty, {} failed, {} batches)",
        stats.frames_rendered,
        args.out.display(),
        stats.frames_empty,
        stats.frames_failed,
        stats.batches
    );
    Ok(())
}

fn cmd_symbols(args: SymbolsArgs) -> anyhow::Result<()> {
    let animation = Animation::from_path(&args.animation)?;
    let library = SymbolLibrary::new(animation)?;
    for name in library.symbol_names() {
        let frames = library.length(name)?;
        if name == library.root_symbol() {
            println!("{name}  {frames} frames  (root)");
        } else {
            println!("{name}  {frames} frames");
        }
    }
    Ok(())
}
