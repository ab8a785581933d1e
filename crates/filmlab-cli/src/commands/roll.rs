//! Roll command

use crate::RollArgs;
use anyhow::{Context, Result, bail};
use filmlab_ops::Roll;
use rayon::prelude::*;

pub fn run(args: RollArgs, verbose: bool) -> Result<()> {
    if !(args.sigma > 0.0) {
        bail!("--sigma must be positive, got {}", args.sigma);
    }
    let mut settings = super::load_settings(args.settings.as_deref())?;
    settings.process.mode = super::parse_mode(&args.mode)?;

    let name = match &args.name {
        Some(n) => n.clone(),
        None => args
            .output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "roll".to_string()),
    };

    let frames = args
        .inputs
        .par_iter()
        .map(|p| super::load_scan(p, args.srgb_input))
        .collect::<Result<Vec<_>>>()?;
    if verbose {
        println!("Analyzing {} frames for roll '{}'", frames.len(), name);
    }

    let roll = Roll::analyze_with(name, &frames, &settings, args.sigma).context("Roll analysis failed")?;
    roll.save(&args.output)
        .with_context(|| format!("Failed to save: {}", args.output.display()))?;

    if verbose {
        println!("  floors: {:?}", roll.bounds.floors);
        println!("  ceils:  {:?}", roll.bounds.ceils);
        println!("Wrote {}", args.output.display());
    }
    Ok(())
}
