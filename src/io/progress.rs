//! Terminal progress display for indexing and generation runs

use crate::index::builder::IndexedImage;
use crate::io::configuration::{PROGRESS_BAR_WIDTH, SPINNER_TICK_MS};
use crate::mosaic::generator::TileStatus;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

/// Callback fed one status record per processed item
///
/// Sinks are only ever called from the thread that started the run.
pub type StatusSink<T> = Box<dyn FnMut(&T) + Send>;

static SPINNER_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} [{elapsed_precise}] {prefix}: {pos} images {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
});

static TILE_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template(&format!(
            "[{{elapsed_precise}}] Tiles: [{{bar:{PROGRESS_BAR_WIDTH}.cyan/blue}}] {{pos}}/{{len}} {{msg}}"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ")
});

/// Coordinates the progress displays of one command-line run
///
/// Each `start_*` call adds a display and returns the sink that drives it.
pub struct ProgressManager {
    multi_progress: MultiProgress,
    bars: Vec<ProgressBar>,
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressManager {
    /// Create a manager drawing to stderr
    pub fn new() -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            bars: Vec::new(),
        }
    }

    /// Create a manager that draws nothing
    pub fn hidden() -> Self {
        Self {
            multi_progress: MultiProgress::with_draw_target(
                indicatif::ProgressDrawTarget::hidden(),
            ),
            bars: Vec::new(),
        }
    }

    /// Add a spinner counting images indexed from `root`
    pub fn start_indexing(&mut self, root: &Path) -> StatusSink<IndexedImage> {
        let bar = self.multi_progress.add(ProgressBar::new_spinner());
        bar.set_style(SPINNER_STYLE.clone());
        bar.set_prefix(root.display().to_string());
        bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
        self.bars.push(bar.clone());

        let mut failed = 0_usize;
        Box::new(move |record: &IndexedImage| {
            if record.result.is_err() {
                failed += 1;
                bar.set_message(format!("({failed} skipped)"));
            }
            bar.inc(1);
        })
    }

    /// Add a bar over `tiles` output tiles
    ///
    /// Tiles finish out of order, so the bar shows the highest tile number
    /// reported so far rather than a completion count.
    pub fn start_generation(&mut self, tiles: usize) -> StatusSink<TileStatus> {
        let bar = self.multi_progress.add(ProgressBar::new(tiles as u64));
        bar.set_style(TILE_STYLE.clone());
        self.bars.push(bar.clone());

        let mut failed = 0_usize;
        Box::new(move |status: &TileStatus| {
            if status.error.is_some() {
                failed += 1;
                bar.set_message(format!("({failed} unmatched)"));
            }
            let number = status.tile.number as u64;
            if number > bar.position() {
                bar.set_position(number);
            }
        })
    }

    /// Current position of every display, in creation order
    pub fn positions(&self) -> Vec<u64> {
        self.bars.iter().map(ProgressBar::position).collect()
    }

    /// Print a line above the displays without tearing them
    pub fn println(&self, message: &str) {
        let _ = self.multi_progress.println(message);
    }

    /// Stop every display and clear it from the terminal
    pub fn finish(&self) {
        for bar in &self.bars {
            bar.finish_and_clear();
        }
        let _ = self.multi_progress.clear();
    }
}
