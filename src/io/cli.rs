//! Command-line interface for building a tile index and rendering one mosaic

use crate::index::builder::IndexBuilder;
use crate::index::color_index::ColorIndex;
use crate::index::search::SearchStrategy;
use crate::io::cancel::CancelToken;
use crate::io::configuration::{
    ColorMode, DEFAULT_INDEX_THRESHOLD, DEFAULT_SCALE, DEFAULT_TILE_SIZE, MosaicConfig,
    OUTPUT_SUFFIX, default_workers,
};
use crate::io::error::{Result, WithPath, invalid_parameter};
use crate::io::image::{FileImageSource, ImageSource, check_output_format, save_image};
use crate::io::progress::ProgressManager;
use crate::mosaic::generator::Generator;
use clap::Parser;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "photomosaic")]
#[command(
    author,
    version,
    about = "Rebuild an image from a library of tile images matched by color"
)]
/// Command-line arguments for the mosaic generator
pub struct Cli {
    /// Source image to rebuild
    #[arg(short, long, value_name = "FILE")]
    pub image: PathBuf,

    /// Directory of tile images, searched recursively (repeatable)
    #[arg(short, long, value_name = "DIR", required_unless_present = "index")]
    pub tiles: Vec<PathBuf>,

    /// Output image (defaults to `<image>.mosaic.<ext>` next to the source)
    #[arg(short, long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Edge length of square tiles in pixels
    #[arg(short, long, default_value_t = DEFAULT_TILE_SIZE)]
    pub size: u32,

    /// Tile width in pixels, overriding `--size`
    #[arg(long)]
    pub tile_width: Option<u32>,

    /// Tile height in pixels, overriding `--size`
    #[arg(long)]
    pub tile_height: Option<u32>,

    /// Number of worker threads
    #[arg(short, long, default_value_t = default_workers())]
    pub workers: usize,

    /// Alpha-blend tiles over the source instead of replacing it
    #[arg(short, long)]
    pub blend: bool,

    /// Scale factor applied to the source image before tiling
    #[arg(long, default_value_t = DEFAULT_SCALE)]
    pub scale: f64,

    /// Minimum share of sampled pixels a color cluster needs to count
    #[arg(long, default_value_t = DEFAULT_INDEX_THRESHOLD)]
    pub index_threshold: f64,

    /// How the representative color of an image is chosen
    #[arg(long, value_enum, default_value_t = ColorMode::Primary)]
    pub color_mode: ColorMode,

    /// Nearest-color search structure
    #[arg(long, value_enum, default_value_t = SearchStrategy::KdTree)]
    pub search: SearchStrategy,

    /// Index file to load, or to create after scanning if it does not exist
    #[arg(long, value_name = "FILE")]
    pub index: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Mosaic options selected by the arguments
    pub fn config(&self) -> MosaicConfig {
        MosaicConfig {
            tile_width: self.tile_width.unwrap_or(self.size),
            tile_height: self.tile_height.unwrap_or(self.size),
            workers: self.workers,
            blend: self.blend,
            scale: self.scale,
            index_threshold: self.index_threshold,
            color_mode: self.color_mode,
            resize_tiles: true,
        }
    }

    /// Check if progress should be displayed
    pub const fn should_show_progress(&self) -> bool {
        !self.quiet
    }
}

/// First free `<stem>.mosaic.<ext>` path next to `image`
///
/// When that name is taken, `.mosaic2`, `.mosaic3` and so on are tried.
pub fn derive_output_path(image: &Path) -> PathBuf {
    let stem = image.file_stem().unwrap_or_default().to_string_lossy();
    let extension = image.extension().unwrap_or_default().to_string_lossy();
    let parent = image.parent().unwrap_or_else(|| Path::new(""));

    let candidate = |attempt: usize| {
        let suffix = if attempt == 1 {
            OUTPUT_SUFFIX.to_string()
        } else {
            format!("{OUTPUT_SUFFIX}{attempt}")
        };
        parent.join(format!("{stem}{suffix}.{extension}"))
    };
    (1..usize::MAX)
        .map(candidate)
        .find(|path| !path.exists())
        .unwrap_or_else(|| candidate(1))
}

/// Drives one indexing and generation run with optional progress display
pub struct MosaicRunner {
    cli: Cli,
    cancel: CancelToken,
    progress_manager: Option<ProgressManager>,
}

impl MosaicRunner {
    /// Create a runner for the given arguments
    pub fn new(cli: Cli) -> Self {
        let progress_manager = cli.should_show_progress().then(ProgressManager::new);

        Self {
            cli,
            cancel: CancelToken::new(),
            progress_manager,
        }
    }

    /// Token that stops the run once cancelled
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Cancel the run on Ctrl-C
    ///
    /// Work already handed to a worker finishes; the partial mosaic is
    /// still written.
    pub fn install_interrupt_handler(&self) {
        let cancel = self.cancel.clone();
        if let Err(e) = ctrlc::set_handler(move || cancel.cancel()) {
            tracing::warn!(error = %e, "Could not install the Ctrl-C handler");
        }
    }

    /// Output path chosen for this run
    pub fn output_path(&self) -> PathBuf {
        self.cli
            .out
            .clone()
            .unwrap_or_else(|| derive_output_path(&self.cli.image))
    }

    /// Index the tile directories, render the mosaic and write it out
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments are invalid, no tile image could be
    /// indexed, the source image cannot be decoded, or the output cannot be
    /// written
    pub fn run(&mut self) -> Result<()> {
        let config = self.cli.config();
        config.validate()?;

        let output = self.output_path();
        check_output_format(&output)?;

        let index = self.load_or_build_index(&config)?;
        let source = FileImageSource.open(&self.cli.image)?;

        let mut generator = Generator::new(config, &index).with_cancel(self.cancel.clone());
        if let Some(ref mut pm) = self.progress_manager {
            let grid = generator.grid_for(&source)?;
            generator = generator.on_status(pm.start_generation(grid.len()));
        }

        let start = Instant::now();
        let mosaic = generator.generate(&source)?;
        save_image(&mosaic, &output)?;

        if let Some(ref pm) = self.progress_manager {
            pm.finish();
        }

        let summary = generator.summary();
        tracing::info!(output = %output.display(), "Mosaic written");
        self.report(&format!(
            "Generated {} of {} tiles in {:.2?} -> {}",
            summary.replaced,
            summary.tiles,
            start.elapsed(),
            output.display()
        ));
        if summary.skipped + summary.failed > 0 {
            self.report(&format!(
                "{} tiles without a usable color, {} tile images failed to load",
                summary.skipped, summary.failed
            ));
        }

        Ok(())
    }

    fn load_or_build_index(&mut self, config: &MosaicConfig) -> Result<ColorIndex> {
        let mut index = ColorIndex::with_strategy(self.cli.search);

        if let Some(path) = self.cli.index.clone().filter(|p| p.exists()) {
            let start = Instant::now();
            let file = File::open(&path).with_operation(&path, "open index")?;
            let records = index.load(&mut BufReader::new(file))?;
            self.report(&format!(
                "Loaded {records} tile images ({} colors) from {} in {:.2?}",
                index.len(),
                path.display(),
                start.elapsed()
            ));
            return Ok(index);
        }

        if self.cli.tiles.is_empty() {
            return Err(invalid_parameter(
                "tiles",
                &"none",
                &"at least one tile directory is needed to build an index",
            ));
        }

        let mut builder = IndexBuilder::new(config.clone()).with_cancel(self.cancel.clone());
        let mut indexed = 0;
        let mut failed = 0;
        let start = Instant::now();

        for root in &self.cli.tiles {
            if let Some(ref mut pm) = self.progress_manager {
                builder = builder.on_status(pm.start_indexing(root));
            }
            let summary = builder.add_path(&mut index, root)?;
            indexed += summary.indexed;
            failed += summary.failed;
        }

        self.report(&format!(
            "Loaded {indexed} tile images ({} colors) in {:.2?}",
            index.len(),
            start.elapsed()
        ));
        if failed > 0 {
            self.report(&format!("{failed} tile images could not be indexed"));
        }

        if let Some(path) = &self.cli.index {
            let file = File::create(path).with_operation(path, "create index")?;
            let mut writer = BufWriter::new(file);
            index.write(&mut writer)?;
            writer.flush().with_operation(path, "write index")?;
            tracing::info!(path = %path.display(), colors = index.len(), "Index saved");
        }

        Ok(index)
    }

    fn report(&self, message: &str) {
        if let Some(ref pm) = self.progress_manager {
            pm.println(message);
        }
    }
}
