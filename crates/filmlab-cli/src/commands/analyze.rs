//! Analyze command

use crate::AnalyzeArgs;
use anyhow::{Context, Result};
use filmlab_ops::analyze_bounds;

pub fn run(args: AnalyzeArgs, verbose: bool) -> Result<()> {
    let mode = super::parse_mode(&args.mode)?;
    let scan = super::load_scan(&args.input, args.srgb_input)?;
    if verbose {
        eprintln!("Analyzing {} as {} (margin {:.2})", args.input.display(), mode, args.margin);
    }

    let bounds = analyze_bounds(&scan, mode, args.margin)
        .with_context(|| format!("Failed to analyze: {}", args.input.display()))?;
    print!("{}", serde_yaml::to_string(&bounds)?);
    Ok(())
}
