//! chemhex CLI
//!
//! Builds hexbin datasets for a folder of query tables, compares two
//! queries, or prints the blur kernel footprint.

use anyhow::{bail, Result};
use chemhex_core::{AspectMode, Orientation, PlotBounds, SigmaKey};
use chemhex_hexbin::{BlurKernel, DEFAULT_EXTENT};
use chemhex_report::{
    compare_queries, ClassOverlayConfig, FigureOptions, RatioOptions, ReportConfig, ReportPipeline,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// chemhex: hexagonal density maps for literature-mined chemicals
#[derive(Parser, Debug)]
#[command(name = "chemhex")]
#[command(version)]
#[command(about = "Hexbin datasets over logP and mass for literature-mined chemicals", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build datasets and figures for every query table of a folder
    Build(BuildArgs),

    /// Compare two query tables as a per-cell log ratio
    Compare(CompareArgs),

    /// Print the blur kernel footprint
    Kernel(KernelArgs),
}

#[derive(Parser, Debug)]
struct BuildArgs {
    /// Folder of query tables (*.tsv)
    #[arg(long, required = true)]
    input: PathBuf,

    /// Output directory
    #[arg(long, short = 'o', required = true)]
    out: PathBuf,

    /// JSON configuration; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base hexagon size
    #[arg(long)]
    hex_size: Option<f64>,

    /// Hexagon orientation (flattop or pointytop)
    #[arg(long)]
    orientation: Option<Orientation>,

    /// Largest blur sigma
    #[arg(long)]
    blur_max: Option<f64>,

    /// Blur sigma step
    #[arg(long)]
    blur_step: Option<f64>,

    /// Contributors kept per hexagon
    #[arg(long)]
    top_k: Option<usize>,

    /// Shared plot bounds as x_min,x_max,y_min,y_max
    #[arg(long, allow_hyphen_values = true)]
    bounds: Option<PlotBounds>,

    /// Fit the grid to each query's own data range
    #[arg(long, conflicts_with = "bounds")]
    fit_data: bool,

    /// Skip SVG figures
    #[arg(long)]
    no_figures: bool,

    /// id<TAB>name table resolving class ids
    #[arg(long, requires = "class")]
    class_names: Option<PathBuf>,

    /// Class highlighted in every query
    #[arg(long, requires = "class_names")]
    class: Option<String>,
}

#[derive(Parser, Debug)]
struct CompareArgs {
    /// First query table
    #[arg(long, required = true)]
    a: PathBuf,

    /// Second query table
    #[arg(long, required = true)]
    b: PathBuf,

    /// Output directory
    #[arg(long, short = 'o', required = true)]
    out: PathBuf,

    /// Correct for different total counts
    #[arg(long)]
    normalize: bool,

    /// Counts below this are raised to it
    #[arg(long, default_value = "2")]
    lower_bound: f64,

    /// Skip the SVG figure
    #[arg(long)]
    no_figures: bool,
}

#[derive(Parser, Debug)]
struct KernelArgs {
    /// Hexagon orientation (flattop or pointytop)
    #[arg(long, default_value = "flattop")]
    orientation: Orientation,

    /// Footprint extent in hexagon units
    #[arg(long, default_value_t = DEFAULT_EXTENT)]
    extent: f64,

    /// Also print coefficients for this sigma
    #[arg(long)]
    sigma: Option<SigmaKey>,
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build(args) => run_build(args),
        Commands::Compare(args) => run_compare(args),
        Commands::Kernel(args) => show_kernel(args),
    }
}

fn build_config(args: &BuildArgs) -> Result<ReportConfig> {
    let mut config = match &args.config {
        Some(path) => ReportConfig::load(path)?,
        None => ReportConfig::default(),
    };
    config.input_dir = args.input.clone();
    config.output_dir = args.out.clone();

    let pipeline = &mut config.pipeline;
    if let Some(size) = args.hex_size {
        pipeline.geometry.hex_size = size;
    }
    if let Some(orientation) = args.orientation {
        pipeline.geometry.orientation = orientation;
    }
    if let Some(bounds) = args.bounds {
        pipeline.geometry.aspect = AspectMode::Bounds { bounds };
    }
    if args.fit_data {
        pipeline.geometry.aspect = AspectMode::FitData;
    }
    if let Some(max_sigma) = args.blur_max {
        pipeline.blur.max_sigma = max_sigma;
    }
    if let Some(step) = args.blur_step {
        pipeline.blur.step_size = step;
    }
    if let Some(k) = args.top_k {
        pipeline.top_k = k;
    }
    if args.no_figures {
        config.figures.enabled = false;
    }
    if let (Some(names_file), Some(class_name)) = (&args.class_names, &args.class) {
        config.class_overlay = Some(ClassOverlayConfig {
            names_file: names_file.clone(),
            class_name: class_name.clone(),
        });
    }
    Ok(config)
}

fn run_build(args: BuildArgs) -> Result<()> {
    println!("============================================================");
    println!("  chemhex v{} - hexbin datasets", chemhex_report::VERSION);
    println!("============================================================");
    println!();

    if !args.input.is_dir() {
        bail!("Input folder not found: {}", args.input.display());
    }

    let config = build_config(&args)?;
    let pipeline = ReportPipeline::new(config)?;
    let result = pipeline.run()?;

    println!();
    println!("Queries built:   {}", result.queries.len());
    println!("Hexagons:        {}", result.n_hexagons);
    println!("Files written:   {}", result.files_generated.len());
    for (name, message) in &result.failed {
        println!("FAILED {}: {}", name, message);
    }
    println!("Output:          {}", result.output_dir.display());

    if result.queries.is_empty() && !result.failed.is_empty() {
        bail!("All {} queries failed", result.failed.len());
    }
    Ok(())
}

fn run_compare(args: CompareArgs) -> Result<()> {
    let options = RatioOptions {
        lower_bound: args.lower_bound,
        normalize: args.normalize,
        ..RatioOptions::default()
    };
    let figures = FigureOptions {
        enabled: !args.no_figures,
        ..FigureOptions::default()
    };
    let comparison = compare_queries(&args.a, &args.b, &args.out, &options, &figures)?;

    println!("{}", comparison.title);
    println!("  cells:        {}", comparison.cell_count());
    println!("  {} dominant:  {}", comparison.query_a, comparison.high.len());
    println!("  {} dominant:  {}", comparison.query_b, comparison.low.len());
    println!("  log ratio:    {:.3} .. {:.3}", comparison.minimum, comparison.maximum);
    Ok(())
}

fn show_kernel(args: KernelArgs) -> Result<()> {
    let kernel = BlurKernel::build(args.orientation, args.extent)?;
    let coefficients = args.sigma.map(|sigma| kernel.coefficients(sigma));

    println!(
        "{} kernel, extent {}: {} offsets",
        args.orientation,
        args.extent,
        kernel.len()
    );
    for (i, entry) in kernel.entries().iter().enumerate() {
        match &coefficients {
            Some(c) => println!(
                "  ({:>3}, {:>3})  dx={:.4}  dy={:.4}  coef={:.6}",
                entry.dq, entry.dr, entry.dx, entry.dy, c[i]
            ),
            None => println!(
                "  ({:>3}, {:>3})  dx={:.4}  dy={:.4}",
                entry.dq, entry.dr, entry.dx, entry.dy
            ),
        }
    }
    if let (Some(sigma), Some(c)) = (args.sigma, &coefficients) {
        println!("sum of coefficients at sigma {}: {:.6}", sigma, c.iter().sum::<f64>());
    }
    Ok(())
}
