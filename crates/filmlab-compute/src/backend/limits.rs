//! Memory limits and row-band sizing for parallel dispatch.

/// Fallback when system memory cannot be queried.
const DEFAULT_AVAILABLE_BYTES: u64 = 4 * 1024 * 1024 * 1024;

/// Target bytes of output per parallel work item.
const DEFAULT_BAND_BYTES: usize = 256 * 1024;

/// Source + destination buffers held at once during a dispatch.
const DISPATCH_OVERHEAD: f64 = 2.0;

/// Resource limits of a compute backend.
#[derive(Debug, Clone)]
pub struct ComputeLimits {
    /// Memory the backend may use, in bytes.
    pub available_memory: u64,
    /// Output bytes per work item.
    pub band_bytes: usize,
    /// Whether `available_memory` was detected rather than assumed.
    pub detected: bool,
}

impl Default for ComputeLimits {
    fn default() -> Self {
        Self {
            available_memory: DEFAULT_AVAILABLE_BYTES,
            band_bytes: DEFAULT_BAND_BYTES,
            detected: false,
        }
    }
}

impl ComputeLimits {
    /// Limits from the host's currently available RAM.
    pub fn detect() -> Self {
        match sys_info::mem_info() {
            Ok(m) => Self {
                available_memory: m.avail * 1024,
                detected: true,
                ..Self::default()
            },
            Err(_) => Self::default(),
        }
    }

    /// Bytes needed to dispatch one kernel over an RGB f32 frame.
    pub fn estimate_memory(&self, width: usize, height: usize) -> u64 {
        let image_bytes = (width as u64) * (height as u64) * 3 * 4;
        (image_bytes as f64 * DISPATCH_OVERHEAD) as u64
    }

    /// Check if a frame fits in available memory.
    pub fn fits_memory(&self, width: usize, height: usize) -> bool {
        self.estimate_memory(width, height) <= self.available_memory
    }

    /// Rows per work item so each band is roughly `band_bytes` of output.
    pub fn band_rows(&self, width: usize, height: usize) -> usize {
        let row_bytes = (width * 3 * 4).max(1);
        (self.band_bytes / row_bytes).clamp(1, height.max(1))
    }
}
