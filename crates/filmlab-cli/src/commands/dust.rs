//! Dust command

use crate::DustArgs;
use anyhow::{Result, bail};
use filmlab_ops::detect_dust;

pub fn run(args: DustArgs, verbose: bool) -> Result<()> {
    if !(args.sensitivity > 0.0) {
        bail!("--sensitivity must be positive, got {}", args.sensitivity);
    }
    let scan = super::load_scan(&args.input, args.srgb_input)?;
    let spots = detect_dust(&scan, args.sensitivity);

    if verbose {
        println!("{}: {} spots", args.input.display(), spots.len());
    }
    println!("{:>6} {:>6} {:>8} {:>8}", "x", "y", "radius", "z");
    for s in &spots {
        println!(
            "{:>6} {:>6} {:>8.2} {:>8.2}",
            s.location.0,
            s.location.1,
            s.heal_radius(),
            s.z_score
        );
    }
    Ok(())
}
