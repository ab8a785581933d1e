//! PNG reading and writing.
//!
//! Scans are read as linear transmittance. Most scanner software writes
//! linear 16-bit data; 8-bit files are usually sRGB encoded and can be
//! decoded to linear on the way in. Alpha is dropped, gray is expanded to
//! RGB.
//!
//! Prints are written display encoded. A buffer still in linear
//! transmittance is encoded with the sRGB curve first.
//!
//! # Example
//!
//! ```rust,ignore
//! use filmlab_io::png::{self, BitDepth};
//!
//! let scan = png::read("frame_01.png", false)?;
//! png::write("print_01.png", &print, BitDepth::Sixteen)?;
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, trace};

use filmlab_color::srgb;
use filmlab_core::{ColorDomain, ImageBuffer};

use crate::{IoError, IoResult};

/// Output sample depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitDepth {
    /// 8 bits per sample.
    #[default]
    Eight,
    /// 16 bits per sample.
    Sixteen,
}

impl BitDepth {
    /// Bits per sample.
    pub fn bits(&self) -> u8 {
        match self {
            Self::Eight => 8,
            Self::Sixteen => 16,
        }
    }

    fn max_value(&self) -> f32 {
        match self {
            Self::Eight => 255.0,
            Self::Sixteen => 65535.0,
        }
    }
}

impl FromStr for BitDepth {
    type Err = IoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "8" => Ok(Self::Eight),
            "16" => Ok(Self::Sixteen),
            other => Err(IoError::UnsupportedBitDepth(other.to_string())),
        }
    }
}

/// Reads a PNG as linear transmittance.
///
/// With `srgb_input` the samples are decoded with the sRGB transfer
/// function; otherwise they are taken as already linear.
pub fn read<P: AsRef<Path>>(path: P, srgb_input: bool) -> IoResult<ImageBuffer> {
    let file = File::open(path.as_ref())?;
    let decoder = png::Decoder::new(BufReader::new(file));
    let mut reader = decoder
        .read_info()
        .map_err(|e: png::DecodingError| IoError::DecodeError(e.to_string()))?;

    let buf_size = reader
        .output_buffer_size()
        .ok_or_else(|| IoError::DecodeError("cannot determine output buffer size".into()))?;
    let mut buf = vec![0u8; buf_size];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e: png::DecodingError| IoError::DecodeError(e.to_string()))?;
    let bytes = &buf[..info.buffer_size()];

    let channels = match info.color_type {
        png::ColorType::Grayscale => 1,
        png::ColorType::GrayscaleAlpha => 2,
        png::ColorType::Rgb => 3,
        png::ColorType::Rgba => 4,
        other => {
            return Err(IoError::UnsupportedBitDepth(format!("{:?} {:?}", other, info.bit_depth)));
        }
    };
    let samples: Vec<f32> = match info.bit_depth {
        png::BitDepth::Eight => bytes.iter().map(|&b| b as f32 / 255.0).collect(),
        png::BitDepth::Sixteen => bytes
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]) as f32 / 65535.0)
            .collect(),
        other => {
            return Err(IoError::UnsupportedBitDepth(format!("{:?} {:?}", info.color_type, other)));
        }
    };

    let decode = |v: f32| if srgb_input { srgb::eotf(v) } else { v };
    let mut data = Vec::with_capacity(info.width as usize * info.height as usize * 3);
    for px in samples.chunks_exact(channels) {
        match channels {
            1 | 2 => {
                let g = decode(px[0]);
                data.extend_from_slice(&[g, g, g]);
            }
            _ => data.extend_from_slice(&[decode(px[0]), decode(px[1]), decode(px[2])]),
        }
    }
    debug!(
        width = info.width,
        height = info.height,
        channels,
        bits = ?info.bit_depth,
        srgb_input,
        "png read"
    );
    Ok(ImageBuffer::new(
        info.width as usize,
        info.height as usize,
        ColorDomain::LinearTransmittance,
        data,
    )?)
}

/// Writes a print as an RGB PNG.
pub fn write<P: AsRef<Path>>(path: P, image: &ImageBuffer, depth: BitDepth) -> IoResult<()> {
    let encode: fn(f32) -> f32 = match image.domain() {
        ColorDomain::DisplayEncoded => |v| v,
        ColorDomain::LinearTransmittance => srgb::oetf,
        other => {
            return Err(IoError::UnsupportedOperation(format!("cannot write a {other} buffer")));
        }
    };
    trace!(width = image.width(), height = image.height(), bits = depth.bits(), "png write");

    let file = File::create(path.as_ref())?;
    let writer = BufWriter::new(file);
    let mut encoder = png::Encoder::new(writer, image.width() as u32, image.height() as u32);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(match depth {
        BitDepth::Eight => png::BitDepth::Eight,
        BitDepth::Sixteen => png::BitDepth::Sixteen,
    });
    encoder.set_compression(png::Compression::default());
    encoder.set_source_srgb(png::SrgbRenderingIntent::Perceptual);

    let mut png_writer = encoder
        .write_header()
        .map_err(|e| IoError::EncodeError(e.to_string()))?;

    let max = depth.max_value();
    let quantize = |v: f32| (encode(v).clamp(0.0, 1.0) * max).round();
    let bytes: Vec<u8> = match depth {
        BitDepth::Eight => image.data().iter().map(|&v| quantize(v) as u8).collect(),
        BitDepth::Sixteen => image
            .data()
            .iter()
            .flat_map(|&v| (quantize(v) as u16).to_be_bytes())
            .collect(),
    };
    png_writer
        .write_image_data(&bytes)
        .map_err(|e| IoError::EncodeError(e.to_string()))?;
    Ok(())
}
