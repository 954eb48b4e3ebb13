//! Batch image resizer core: decode -> resize -> encode, isolated
//! per-job, run either on a plain worker pool or across a three-stage
//! decode/resize/encode pipeline for large batches.
//!
//! This crate is the engine; it does not parse CLI arguments beyond
//! the bundled binary, does not enumerate directories (the binary's
//! `walkdir` use does that), and treats JPEG/PNG/WEBP/BMP codecs as
//! library collaborators reached through [`registry`].

pub mod batch;
pub mod cli;
pub mod error;
pub mod geometry;
pub mod kernel;
pub mod pipeline;
pub mod pool;
pub mod registry;
pub mod utils;
pub mod workers;

pub use error::{CoreError, Result};
pub use geometry::ResizeMode;

use std::path::PathBuf;

/// Polyphase reconstruction filter choice for the resize kernel.
/// `Mitchell` is the default; see [`kernel`] for the auto-downgrade
/// rule that substitutes `Box` at steep downscales.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Mitchell,
    CatmullRom,
    Box,
    Triangle,
}

impl Default for Filter {
    fn default() -> Self {
        Filter::Mitchell
    }
}

/// Options governing a single resize+encode job. Read-only once
/// handed to the core; cheap to clone and shared by reference across
/// all jobs in a batch.
#[derive(Debug, Clone)]
pub struct ResizeOptions {
    pub mode: ResizeMode,
    pub target_width: u32,
    pub target_height: u32,
    pub scale_percent: f64,
    pub keep_aspect_ratio: bool,
    pub overwrite_input: bool,
    pub quality: u8,
    pub filter: Filter,
}

impl Default for ResizeOptions {
    fn default() -> Self {
        Self {
            mode: ResizeMode::ScalePercent,
            target_width: 0,
            target_height: 0,
            scale_percent: 1.0,
            keep_aspect_ratio: true,
            overwrite_input: false,
            quality: 85,
            filter: Filter::default(),
        }
    }
}

impl ResizeOptions {
    pub fn validate(&self) -> Result<()> {
        if self.scale_percent <= 0.0 {
            return Err(CoreError::InvalidOptions(
                "scale_percent must be > 0".into(),
            ));
        }
        if self.quality == 0 || self.quality > 100 {
            return Err(CoreError::InvalidOptions(
                "quality must be in 1..=100".into(),
            ));
        }
        match self.mode {
            ResizeMode::FitWidth if self.target_width == 0 => {
                return Err(CoreError::InvalidOptions(
                    "fit-width requires target_width > 0".into(),
                ));
            }
            ResizeMode::FitHeight if self.target_height == 0 => {
                return Err(CoreError::InvalidOptions(
                    "fit-height requires target_height > 0".into(),
                ));
            }
            ResizeMode::ExactSize if self.target_width == 0 && self.target_height == 0 => {
                return Err(CoreError::InvalidOptions(
                    "exact-size requires a target dimension".into(),
                ));
            }
            _ => {}
        }
        Ok(())
    }
}

/// Decoded or probed geometry + format of an image, independent of
/// pixel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub format: String,
}

impl ImageInfo {
    pub fn has_alpha(&self) -> bool {
        self.channels == 4
    }
}

/// Raw, row-major, top-left-origin, tightly-packed 8-bit pixel data.
/// Stride is always `width * channels` bytes; there is no separate
/// stride field because the core never produces padded rows.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize * channels as usize);
        Self { width, height, channels, data }
    }

    pub fn stride(&self) -> usize {
        self.width as usize * self.channels as usize
    }
}

/// One custom-batch work item: an explicit `(input, output, options)`
/// triple, as opposed to pool-mode's basename-under-output-dir
/// convention.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub options: ResizeOptions,
}

/// Batch-wide execution knobs.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub num_threads: usize,
    pub stop_on_error: bool,
    pub max_speed: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            num_threads: 0,
            stop_on_error: false,
            max_speed: false,
        }
    }
}

impl BatchOptions {
    /// Resolve `num_threads == 0` ("auto") to hardware parallelism,
    /// minimum 1.
    pub fn resolved_threads(&self) -> usize {
        if self.num_threads > 0 {
            self.num_threads
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

/// Aggregate outcome of a batch call. `success + failed == total`
/// always holds; `errors.len() == failed` always holds.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl BatchResult {
    pub fn record_ok(&mut self) {
        self.total += 1;
        self.success += 1;
    }

    pub fn record_err(&mut self, message: String) {
        self.total += 1;
        self.failed += 1;
        self.errors.push(message);
    }
}

pub mod prelude {
    pub use crate::batch::{batch_resize, batch_resize_custom};
    pub use crate::error::{CoreError, Result};
    pub use crate::geometry::ResizeMode;
    pub use crate::pipeline::{last_error, process_one};
    pub use crate::{BatchItem, BatchOptions, BatchResult, Filter, ImageInfo, PixelBuffer, ResizeOptions};
}
