//! filmlab - develop scanned film negatives and slides from the command line

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "filmlab")]
#[command(author, version, about = "Film negative and slide developer")]
#[command(long_about = "
Develops linear film scans into finished prints: log normalization,
virtual enlarger exposure, dust removal, lab corrections and toning.

Examples:
  filmlab develop scan.png -o print.png              # C-41 with defaults
  filmlab develop scan.png -o print.png --mode bw --depth 16
  filmlab develop scan.png -o print.png --settings look.yaml --roll roll.yaml
  filmlab analyze scan.png --mode e6                 # Print channel bounds
  filmlab roll frames/*.png -o roll.yaml --name \"Portra 400\"
  filmlab dust scan.png --sensitivity 1.5
  filmlab -vv -j 4 develop scan.png -o print.png
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Number of threads (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Develop a scan into a print
    #[command(visible_alias = "dev")]
    Develop(DevelopArgs),

    /// Print per-channel log bounds of a scan
    Analyze(AnalyzeArgs),

    /// Build a shared profile from a roll of scans
    Roll(RollArgs),

    /// List detected dust spots
    Dust(DustArgs),

    /// List compute backends
    Backends,
}

#[derive(Args)]
struct DevelopArgs {
    /// Input scan (PNG)
    input: PathBuf,

    /// Output print (PNG)
    #[arg(short, long)]
    output: PathBuf,

    /// Development settings (YAML)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Process mode: c41, bw, e6 (overrides the settings file)
    #[arg(short, long)]
    mode: Option<String>,

    /// Roll profile (YAML) to print from
    #[arg(short, long)]
    roll: Option<PathBuf>,

    /// Input is sRGB encoded rather than linear
    #[arg(long)]
    srgb_input: bool,

    /// Output bit depth: 8 or 16
    #[arg(short, long, default_value = "8")]
    depth: String,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Input scan (PNG)
    input: PathBuf,

    /// Process mode: c41, bw, e6
    #[arg(short, long, default_value = "c41")]
    mode: String,

    /// Fraction of each edge excluded from analysis
    #[arg(long, default_value = "0.07")]
    margin: f32,

    /// Input is sRGB encoded rather than linear
    #[arg(long)]
    srgb_input: bool,
}

#[derive(Args)]
struct RollArgs {
    /// Input scans (PNG)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output profile (YAML)
    #[arg(short, long)]
    output: PathBuf,

    /// Roll name (defaults to the output file stem)
    #[arg(short, long)]
    name: Option<String>,

    /// Process mode: c41, bw, e6
    #[arg(short, long, default_value = "c41")]
    mode: String,

    /// Outlier rejection distance in standard deviations
    #[arg(long, default_value = "2.0")]
    sigma: f32,

    /// Development settings (YAML) for analysis and exposure
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Inputs are sRGB encoded rather than linear
    #[arg(long)]
    srgb_input: bool,
}

#[derive(Args)]
struct DustArgs {
    /// Input scan (PNG)
    input: PathBuf,

    /// Detection sensitivity (higher finds fainter spots)
    #[arg(long, default_value = "1.0")]
    sensitivity: f32,

    /// Input is sRGB encoded rather than linear
    #[arg(long)]
    srgb_input: bool,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Configure thread pool
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    let verbose = cli.verbose > 0;
    match cli.command {
        Commands::Develop(args) => commands::develop::run(args, verbose),
        Commands::Analyze(args) => commands::analyze::run(args, verbose),
        Commands::Roll(args) => commands::roll::run(args, verbose),
        Commands::Dust(args) => commands::dust::run(args, verbose),
        Commands::Backends => commands::backends::run(verbose),
    }
}
