//! Concurrent mosaic generation from a source image and a color index
//!
//! Workers pull tiles from one shared lazy stream, so a worker that finishes
//! a cheap tile immediately takes the next one. Each tile comes paired with
//! an exclusive region of the output canvas; regions never overlap, which
//! is what allows the canvas to be written concurrently without a lock.

use crate::color::Color;
use crate::color::metric::representative_color;
use crate::index::color_index::ColorIndex;
use crate::io::cancel::CancelToken;
use crate::io::configuration::{MosaicConfig, STATUS_CHANNEL_DEPTH};
use crate::io::error::{MosaicError, Result, invalid_parameter};
use crate::io::image::{FileImageSource, ImageSource, LanczosResizer, Resizer};
use crate::io::progress::StatusSink;
use crate::mosaic::tiler::{Region, Tile, TileGrid};
use image::{DynamicImage, GenericImageView, RgbaImage};
use rand::seq::IndexedRandom;
use rayon::iter::{ParallelBridge, ParallelIterator};
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Instant;

/// Outcome of filling a single output tile
///
/// Tiles complete out of order; `tile.number` gives the raster position.
#[derive(Debug)]
pub struct TileStatus {
    /// Tile that was processed
    pub tile: Tile,
    /// Representative color of the source region
    pub color: Option<Color>,
    /// Tile image composited into the region
    pub path: Option<PathBuf>,
    /// Why the region was left unmodified
    pub error: Option<MosaicError>,
}

impl TileStatus {
    fn failed(
        tile: Tile,
        color: Option<Color>,
        path: Option<PathBuf>,
        error: MosaicError,
    ) -> Self {
        Self {
            tile,
            color,
            path,
            error: Some(error),
        }
    }
}

/// Counts reported by a finished generation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationSummary {
    /// Tiles handed to a worker
    pub tiles: usize,
    /// Tiles replaced by a tile image
    pub replaced: usize,
    /// Tiles without a representative color
    pub skipped: usize,
    /// Tiles whose replacement could not be loaded
    pub failed: usize,
}

/// Builds mosaics from one shared, read-only [`ColorIndex`]
pub struct Generator<'a> {
    config: MosaicConfig,
    index: &'a ColorIndex,
    cancel: CancelToken,
    source: Box<dyn ImageSource>,
    resizer: Box<dyn Resizer>,
    status: Option<StatusSink<TileStatus>>,
    summary: GenerationSummary,
}

#[derive(Clone, Copy)]
struct Matcher<'a> {
    config: &'a MosaicConfig,
    index: &'a ColorIndex,
    source: &'a dyn ImageSource,
    resizer: &'a dyn Resizer,
    image: &'a RgbaImage,
}

impl Matcher<'_> {
    fn fill(self, region: &mut Region<'_>) -> TileStatus {
        let tile = *region.tile();
        let view = self.image.view(tile.x, tile.y, tile.width, tile.height);
        let Some(color) =
            representative_color(&*view, self.config.color_mode, self.config.index_threshold)
        else {
            return TileStatus::failed(tile, None, None, MosaicError::NoRepresentativeColor);
        };

        let Some(path) = self
            .index
            .find_nearest(color)
            .and_then(|(_, paths)| paths.choose(&mut rand::rng()))
        else {
            let error = invalid_parameter("index", &color, &"no candidate tile image");
            return TileStatus::failed(tile, Some(color), None, error);
        };

        let replacement = match self.source.open(path) {
            Ok(image) => image,
            Err(e) => return TileStatus::failed(tile, Some(color), Some(path.clone()), e),
        };
        let replacement = self
            .resizer
            .fill(&replacement, tile.width, tile.height)
            .to_rgba8();

        if self.config.blend {
            region.blend(&replacement);
        } else {
            region.overwrite(&replacement);
        }

        TileStatus {
            tile,
            color: Some(color),
            path: Some(path.clone()),
            error: None,
        }
    }
}

impl<'a> Generator<'a> {
    /// Create a generator reading tile images from the filesystem
    pub fn new(config: MosaicConfig, index: &'a ColorIndex) -> Self {
        Self {
            config,
            index,
            cancel: CancelToken::new(),
            source: Box::new(FileImageSource),
            resizer: Box::new(LanczosResizer),
            status: None,
            summary: GenerationSummary::default(),
        }
    }

    /// Stop handing out tiles once `cancel` fires
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Decode tile images with `source`
    #[must_use]
    pub fn with_source(mut self, source: impl ImageSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    /// Resize source and tile images with `resizer`
    #[must_use]
    pub fn with_resizer(mut self, resizer: impl Resizer + 'static) -> Self {
        self.resizer = Box::new(resizer);
        self
    }

    /// Report every per-tile outcome to `sink`
    ///
    /// Without a sink, outcomes are discarded.
    #[must_use]
    pub fn on_status(mut self, sink: impl FnMut(&TileStatus) + Send + 'static) -> Self {
        self.status = Some(Box::new(sink));
        self
    }

    /// Counts from the most recent run
    pub const fn summary(&self) -> GenerationSummary {
        self.summary
    }

    fn scaled_dimensions(&self, source: &DynamicImage) -> Result<(u32, u32)> {
        if (self.config.scale - 1.0).abs() < f64::EPSILON {
            return Ok(source.dimensions());
        }
        let width = (f64::from(source.width()) * self.config.scale).round() as u32;
        let height = (f64::from(source.height()) * self.config.scale).round() as u32;
        if width == 0 || height == 0 {
            return Err(invalid_parameter(
                "scale",
                &self.config.scale,
                &"scaled source image would be empty",
            ));
        }
        Ok((width, height))
    }

    /// Tile grid that [`Generator::generate`] will use for `source`
    ///
    /// # Errors
    ///
    /// Returns an error if scaling would produce an empty image or a tile
    /// dimension is zero
    pub fn grid_for(&self, source: &DynamicImage) -> Result<TileGrid> {
        let (width, height) = self.scaled_dimensions(source)?;
        TileGrid::new(width, height, self.config.tile_width, self.config.tile_height)
    }

    /// Source image after applying the configured scale factor
    ///
    /// # Errors
    ///
    /// Returns an error if scaling would produce an empty image
    pub fn prepare_source(&self, source: &DynamicImage) -> Result<RgbaImage> {
        let (width, height) = self.scaled_dimensions(source)?;
        if (width, height) == source.dimensions() {
            return Ok(source.to_rgba8());
        }
        Ok(self.resizer.fill(source, width, height).to_rgba8())
    }

    /// Build a mosaic of `source`
    ///
    /// The canvas has the dimensions of the scaled source. Tiles whose
    /// color cannot be extracted or whose replacement fails to load are
    /// left untouched and reported through the status sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the index is
    /// empty, scaling fails, or the worker pool cannot start
    pub fn generate(&mut self, source: &DynamicImage) -> Result<RgbaImage> {
        self.config.validate()?;
        if self.index.is_empty() {
            return Err(invalid_parameter(
                "index",
                &"empty",
                &"must contain at least one tile image",
            ));
        }

        let image = self.prepare_source(source)?;
        let grid = TileGrid::for_image(&image, self.config.tile_width, self.config.tile_height)?;
        let mut canvas = if self.config.blend {
            image.clone()
        } else {
            RgbaImage::new(image.width(), image.height())
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .thread_name(|i| format!("mosaic-worker-{i}"))
            .build()?;

        let start = Instant::now();
        tracing::info!(
            width = image.width(),
            height = image.height(),
            tiles = grid.len(),
            workers = self.config.workers,
            "Generating mosaic"
        );

        let Self {
            config,
            index,
            cancel,
            source,
            resizer,
            status,
            summary,
        } = self;
        *summary = GenerationSummary::default();

        let matcher = Matcher {
            config: &*config,
            index: *index,
            source: &**source,
            resizer: &**resizer,
            image: &image,
        };
        let regions = grid.regions(&mut canvas, &*cancel)?;
        let (tx, rx) = mpsc::sync_channel::<TileStatus>(config.workers * STATUS_CHANNEL_DEPTH);

        pool.in_place_scope(|scope| {
            scope.spawn(move |_| {
                regions.par_bridge().for_each_with(tx, |tx, mut region| {
                    // The receiver outlives every sender
                    let _ = tx.send(matcher.fill(&mut region));
                });
            });

            for tile_status in rx {
                summary.tiles += 1;
                match (&tile_status.error, &tile_status.color) {
                    (None, _) => {
                        tracing::debug!(
                            tile = tile_status.tile.number,
                            color = ?tile_status.color,
                            path = ?tile_status.path,
                            "Tile matched"
                        );
                        summary.replaced += 1;
                    }
                    (Some(_), None) => summary.skipped += 1,
                    (Some(e), Some(_)) => {
                        tracing::debug!(tile = tile_status.tile.number, error = %e, "Tile left unmodified");
                        summary.failed += 1;
                    }
                }
                if let Some(sink) = status.as_mut() {
                    sink(&tile_status);
                }
            }
        });

        tracing::info!(
            replaced = summary.replaced,
            skipped = summary.skipped,
            failed = summary.failed,
            elapsed_ms = start.elapsed().as_millis(),
            cancelled = cancel.is_cancelled(),
            "Generation finished"
        );

        Ok(canvas)
    }
}
