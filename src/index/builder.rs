//! Concurrent indexing of a directory of tile images
//!
//! A directory walk feeds a fixed pool of workers. Each worker decodes one
//! image, optionally resizes it to the tile size, and measures its
//! representative color. Worker output is merged into a single bounded
//! channel drained on the calling thread, which is the only writer of the
//! [`ColorIndex`]. Arrival order across workers is not deterministic, so
//! neither is the tie-break order of colors inserted by the same run.

use crate::color::Color;
use crate::color::metric::representative_color;
use crate::index::color_index::ColorIndex;
use crate::io::cancel::CancelToken;
use crate::io::configuration::{MosaicConfig, STATUS_CHANNEL_DEPTH};
use crate::io::directory::{DirectoryScanner, WalkdirScanner};
use crate::io::error::{MosaicError, Result};
use crate::io::image::{FileImageSource, ImageSource, LanczosResizer, Resizer};
use crate::io::progress::StatusSink;
use rayon::iter::{ParallelBridge, ParallelIterator};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Instant;

/// Stage of an indexing run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildPhase {
    /// No run started yet
    #[default]
    Idle,
    /// Validating and walking the root directory
    Scanning,
    /// Workers are decoding and measuring images
    Processing,
    /// Worker output is being merged into the index
    Merging,
    /// Run finished and at least one image was indexed
    Done,
    /// Run aborted on a fatal error
    Failed,
}

/// Outcome of indexing a single tile image
#[derive(Debug)]
pub struct IndexedImage {
    /// Image that was examined
    pub path: PathBuf,
    /// Measured representative color, or why none was recorded
    pub result: Result<Color>,
}

/// Counts reported by a finished indexing run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    /// Images inserted into the index
    pub indexed: usize,
    /// Images skipped because of a per-item error
    pub failed: usize,
}

/// Builds a [`ColorIndex`] from directories of tile images
pub struct IndexBuilder {
    config: MosaicConfig,
    cancel: CancelToken,
    source: Box<dyn ImageSource>,
    scanner: Box<dyn DirectoryScanner>,
    resizer: Box<dyn Resizer>,
    status: Option<StatusSink<IndexedImage>>,
    phase: BuildPhase,
}

#[derive(Clone, Copy)]
struct Measure<'a> {
    config: &'a MosaicConfig,
    source: &'a dyn ImageSource,
    resizer: &'a dyn Resizer,
}

impl Measure<'_> {
    fn color_of(self, path: &Path) -> Result<Color> {
        let mut image = self.source.open(path)?;
        if self.config.resize_tiles {
            image = self
                .resizer
                .fill(&image, self.config.tile_width, self.config.tile_height);
        }
        representative_color(&image, self.config.color_mode, self.config.index_threshold)
            .ok_or(MosaicError::NoRepresentativeColor)
    }
}

impl IndexBuilder {
    /// Create a builder reading from the filesystem
    pub fn new(config: MosaicConfig) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
            source: Box::new(FileImageSource),
            scanner: Box::new(WalkdirScanner),
            resizer: Box::new(LanczosResizer),
            status: None,
            phase: BuildPhase::Idle,
        }
    }

    /// Stop scanning once `cancel` fires
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

    /// Discover tile images with `scanner`
    #[must_use]
    pub fn with_scanner(mut self, scanner: impl DirectoryScanner + 'static) -> Self {
        self.scanner = Box::new(scanner);
        self
    }

    /// Resize tile images with `resizer`
    #[must_use]
    pub fn with_resizer(mut self, resizer: impl Resizer + 'static) -> Self {
        self.resizer = Box::new(resizer);
        self
    }

    /// Report every per-image outcome to `sink`
    ///
    /// Without a sink, outcomes are discarded.
    #[must_use]
    pub fn on_status(mut self, sink: impl FnMut(&IndexedImage) + Send + 'static) -> Self {
        self.status = Some(Box::new(sink));
        self
    }

    /// Stage reached by the most recent run
    pub const fn phase(&self) -> BuildPhase {
        self.phase
    }

    /// Index every supported image below `root` into `index`
    ///
    /// Per-image failures are reported through the status sink and counted
    /// in the summary; they do not abort the run.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, `root` cannot be
    /// scanned, the worker pool cannot start, or no image was indexed
    pub fn add_path(&mut self, index: &mut ColorIndex, root: &Path) -> Result<BuildSummary> {
        self.phase = BuildPhase::Scanning;
        let result = self.run(index, root);
        self.phase = if result.is_ok() {
            BuildPhase::Done
        } else {
            BuildPhase::Failed
        };
        result
    }

    fn run(&mut self, index: &mut ColorIndex, root: &Path) -> Result<BuildSummary> {
        let Self {
            config,
            cancel,
            source,
            scanner,
            resizer,
            status,
            phase,
        } = self;

        config.validate()?;
        scanner.check_root(root)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("index-worker-{i}"))
            .build()?;

        let start = Instant::now();
        tracing::info!(
            root = %root.display(),
            workers = config.workers,
            "Indexing tile images"
        );

        let measure = Measure {
            config: &*config,
            source: &**source,
            resizer: &**resizer,
        };
        let scanner = &**scanner;
        let cancel = &*cancel;
        let (tx, rx) = mpsc::sync_channel::<IndexedImage>(config.workers * STATUS_CHANNEL_DEPTH);
        let mut summary = BuildSummary::default();

        *phase = BuildPhase::Processing;
        pool.in_place_scope(|scope| {
            scope.spawn(move |_| {
                scanner
                    .scan(root, cancel)
                    .par_bridge()
                    .for_each_with(tx, |tx, entry| {
                        let record = match entry {
                            Ok(path) => {
                                let result = measure.color_of(&path);
                                IndexedImage { path, result }
                            }
                            Err(e) => IndexedImage {
                                path: e.path().unwrap_or(root).to_path_buf(),
                                result: Err(e),
                            },
                        };
                        // The receiver outlives every sender
                        let _ = tx.send(record);
                    });
            });

            *phase = BuildPhase::Merging;
            for record in rx {
                match &record.result {
                    Ok(color) => {
                        index.insert(*color, record.path.clone());
                        summary.indexed += 1;
                    }
                    Err(e) => {
                        tracing::debug!(path = %record.path.display(), error = %e, "Skipped tile image");
                        summary.failed += 1;
                    }
                }
                if let Some(sink) = status.as_mut() {
                    sink(&record);
                }
            }
        });

        tracing::info!(
            indexed = summary.indexed,
            failed = summary.failed,
            colors = index.len(),
            elapsed_ms = start.elapsed().as_millis(),
            cancelled = cancel.is_cancelled(),
            "Indexing finished"
        );

        if summary.indexed == 0 {
            return Err(MosaicError::NoImagesFound {
                path: root.to_path_buf(),
            });
        }
        Ok(summary)
    }
}
