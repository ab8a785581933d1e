//! CLI command implementations

pub mod analyze;
pub mod backends;
pub mod develop;
pub mod dust;
pub mod roll;

use anyhow::{Context, Result};
use filmlab_core::{ImageBuffer, ProcessMode};
use filmlab_ops::DevelopSettings;
use std::path::Path;

/// Load a scan from path
pub fn load_scan(path: &Path, srgb_input: bool) -> Result<ImageBuffer> {
    filmlab_io::png::read(path, srgb_input).with_context(|| format!("Failed to load: {}", path.display()))
}

/// Load settings from an optional YAML file, defaults otherwise
pub fn load_settings(path: Option<&Path>) -> Result<DevelopSettings> {
    match path {
        Some(p) => DevelopSettings::from_file(p).with_context(|| format!("Failed to read settings: {}", p.display())),
        None => Ok(DevelopSettings::default()),
    }
}

/// Parse a process mode name
pub fn parse_mode(name: &str) -> Result<ProcessMode> {
    name.parse::<ProcessMode>()
        .with_context(|| format!("Unknown process mode '{}' (expected c41, bw or e6)", name))
}
