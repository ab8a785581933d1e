//! Backends command

use anyhow::Result;
use filmlab_compute::{Executor, describe_backends};

pub fn run(verbose: bool) -> Result<()> {
    print!("{}", describe_backends());
    if verbose {
        let exec = Executor::auto()?;
        println!("Selected: {}", exec.backend_name());
        let limits = exec.limits();
        println!("Memory budget: {} MB", limits.available_memory / (1024 * 1024));
        println!("Band size: {} KB", limits.band_bytes / 1024);
    }
    Ok(())
}
