//! Film process modes.
//!
//! The process decides only which way round the bounds percentiles are
//! taken (and a few per-process constants); normalization itself is
//! identical for negatives and slides.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Chemical process of the scanned film.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProcessMode {
    /// Color negative.
    #[default]
    #[serde(rename = "C41")]
    C41,
    /// Black & white negative.
    #[serde(rename = "B&W")]
    Bw,
    /// Color reversal (slide).
    #[serde(rename = "E-6")]
    E6,
}

/// Whether dense film areas are scene highlights or scene shadows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    /// Dense = bright scene (C41, B&W).
    Negative,
    /// Dense = dark scene (E6).
    Positive,
}

impl ProcessMode {
    /// All modes in UI order.
    pub const ALL: [ProcessMode; 3] = [ProcessMode::C41, ProcessMode::Bw, ProcessMode::E6];

    /// Polarity of the film stock.
    #[inline]
    pub fn polarity(&self) -> Polarity {
        match self {
            Self::C41 | Self::Bw => Polarity::Negative,
            Self::E6 => Polarity::Positive,
        }
    }

    /// `true` for black & white stock.
    #[inline]
    pub fn is_monochrome(&self) -> bool {
        matches!(self, Self::Bw)
    }

    /// Canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::C41 => "C41",
            Self::Bw => "B&W",
            Self::E6 => "E-6",
        }
    }
}

impl std::fmt::Display for ProcessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProcessMode {
    type Err = Error;

    /// Accepts canonical names and loose spellings (`c41`, `bw`, `e6`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "c41" | "negative" | "color" => Ok(Self::C41),
            "bw" | "mono" | "monochrome" => Ok(Self::Bw),
            "e6" | "slide" | "positive" => Ok(Self::E6),
            _ => Err(Error::parse("process mode", s)),
        }
    }
}
