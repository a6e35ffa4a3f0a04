//! Mosaic constants and runtime configuration defaults

use crate::io::error::{Result, invalid_parameter};

/// Default edge length of an output tile in pixels
pub const DEFAULT_TILE_SIZE: u32 = 10;

// Clusters holding a smaller share of the sampled pixels are ignored
/// Default minimum cluster share for primary color extraction
pub const DEFAULT_INDEX_THRESHOLD: f64 = 0.01;

/// Default scale factor applied to the source image
pub const DEFAULT_SCALE: f64 = 1.0;

// Color extraction samples at most this many pixels per axis
/// Target edge length for the down-sampled color extraction pass
pub const DOWNSIZE_TO: u32 = 224;

// Squared RGB distance under which two cluster averages merge
/// Distance below which two color clusters are considered the same
pub const SIMILAR_COLOR_DISTANCE: u32 = 48 * 48;

/// File extensions accepted as tile images and output formats
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

// Output settings
/// Suffix inserted before the extension of derived output paths
pub const OUTPUT_SUFFIX: &str = ".mosaic";

/// Status channel slots per worker
pub const STATUS_CHANNEL_DEPTH: usize = 2;

/// Smallest unindexed tail before the k-d tree is rebuilt
pub const MIN_SEARCH_TAIL: usize = 32;

// Progress bar display settings
/// Width of progress bars in characters
pub const PROGRESS_BAR_WIDTH: u16 = 40;
/// Spinner redraw interval in milliseconds
pub const SPINNER_TICK_MS: u64 = 100;

/// Default number of workers, one per logical CPU
pub fn default_workers() -> usize {
    num_cpus::get().max(1)
}

/// Algorithm used to pick the representative color of an image region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ColorMode {
    /// Color of the largest cluster in a bucketed clustering pass
    #[default]
    Primary,
    /// Arithmetic mean of all pixels
    Average,
}

/// Options shared by indexing and generation
#[derive(Debug, Clone, PartialEq)]
pub struct MosaicConfig {
    /// Width of each output tile in pixels
    pub tile_width: u32,
    /// Height of each output tile in pixels
    pub tile_height: u32,
    /// Number of worker threads
    pub workers: usize,
    /// Seed the canvas with the source and alpha-blend tiles onto it
    pub blend: bool,
    /// Factor applied to the source image before tiling
    pub scale: f64,
    /// Minimum cluster share for primary color extraction
    pub index_threshold: f64,
    /// Representative color algorithm
    pub color_mode: ColorMode,
    /// Resize tile images to the tile size before measuring their color
    pub resize_tiles: bool,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            tile_width: DEFAULT_TILE_SIZE,
            tile_height: DEFAULT_TILE_SIZE,
            workers: default_workers(),
            blend: false,
            scale: DEFAULT_SCALE,
            index_threshold: DEFAULT_INDEX_THRESHOLD,
            color_mode: ColorMode::Primary,
            resize_tiles: false,
        }
    }
}

impl MosaicConfig {
    /// Check every parameter against its valid range
    ///
    /// # Errors
    ///
    /// Returns an error naming the first parameter out of range
    pub fn validate(&self) -> Result<()> {
        if self.tile_width == 0 {
            return Err(invalid_parameter(
                "tile_width",
                &self.tile_width,
                &"must be positive",
            ));
        }
        if self.tile_height == 0 {
            return Err(invalid_parameter(
                "tile_height",
                &self.tile_height,
                &"must be positive",
            ));
        }
        if self.workers == 0 {
            return Err(invalid_parameter(
                "workers",
                &self.workers,
                &"must be positive",
            ));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(invalid_parameter(
                "scale",
                &self.scale,
                &"must be a positive number",
            ));
        }
        if !(0.0..1.0).contains(&self.index_threshold) {
            return Err(invalid_parameter(
                "index_threshold",
                &self.index_threshold,
                &"must be in [0, 1)",
            ));
        }
        Ok(())
    }
}
