//! Develop command

use crate::DevelopArgs;
use anyhow::{Context, Result};
use filmlab_io::png::{self, BitDepth};
use filmlab_ops::{Pipeline, Roll};
use tracing::info;

pub fn run(args: DevelopArgs, verbose: bool) -> Result<()> {
    let roll = match &args.roll {
        Some(path) => {
            Some(Roll::from_file(path).with_context(|| format!("Failed to read roll: {}", path.display()))?)
        }
        None => None,
    };

    // Without a settings file a roll frame starts from the roll's own settings
    let mut settings = match (&args.settings, &roll) {
        (None, Some(roll)) => roll.starting_settings(),
        (path, _) => super::load_settings(path.as_deref())?,
    };
    if let Some(mode) = &args.mode {
        settings.process.mode = super::parse_mode(mode)?;
    }
    let mode = settings.process.mode;
    let depth: BitDepth = args.depth.parse().context("Invalid --depth")?;

    let pipeline = match roll {
        Some(roll) => {
            settings.process.use_roll_average = true;
            Pipeline::new(settings).with_roll(roll)
        }
        None => Pipeline::new(settings),
    };

    let scan = super::load_scan(&args.input, args.srgb_input)?;
    if verbose {
        println!(
            "Developing {} ({}x{}, {})",
            args.input.display(),
            scan.width(),
            scan.height(),
            mode
        );
    }

    let dev = pipeline
        .run(&scan)
        .with_context(|| format!("Failed to develop: {}", args.input.display()))?;
    info!(source = ?dev.bounds_source, crop = %dev.crop, dust = dev.dust_spots, "developed");

    png::write(&args.output, &dev.image, depth)
        .with_context(|| format!("Failed to save: {}", args.output.display()))?;

    if verbose {
        println!("  bounds: {:?}", dev.bounds_source);
        println!("  crop: {}", dev.crop);
        if dev.dust_spots > 0 {
            println!("  dust spots healed: {}", dev.dust_spots);
        }
        println!("Done.");
    }

    Ok(())
}
