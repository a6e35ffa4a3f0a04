//! Recursive discovery of candidate tile images

use crate::io::cancel::CancelToken;
use crate::io::error::{MosaicError, Result};
use crate::io::image::supported_extension;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Lazy stream of discovered paths or per-entry traversal errors
pub type PathStream<'a> = Box<dyn Iterator<Item = Result<PathBuf>> + Send + 'a>;

/// Enumerates image files below a root directory
pub trait DirectoryScanner: Send + Sync {
    /// Check that the root itself can be scanned
    ///
    /// # Errors
    ///
    /// Returns an error if the root does not exist or cannot be read
    fn check_root(&self, root: &Path) -> Result<()>;

    /// Walk `root` recursively, yielding supported image files
    ///
    /// Stops early without error once `cancel` fires.
    fn scan<'a>(&'a self, root: &'a Path, cancel: &'a CancelToken) -> PathStream<'a>;
}

/// Filesystem scanner backed by `walkdir`
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkdirScanner;

impl DirectoryScanner for WalkdirScanner {
    fn check_root(&self, root: &Path) -> Result<()> {
        std::fs::metadata(root)
            .map(|_| ())
            .map_err(|e| MosaicError::FileSystem {
                path: root.to_path_buf(),
                operation: "scan",
                source: e,
            })
    }

    fn scan<'a>(&'a self, root: &'a Path, cancel: &'a CancelToken) -> PathStream<'a> {
        let entries = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .take_while(move |_| !cancel.is_cancelled())
            .filter_map(move |entry| match entry {
                Ok(entry) => (entry.file_type().is_file()
                    && supported_extension(entry.path()).is_some())
                .then(|| Ok(entry.into_path())),
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    Some(Err(MosaicError::FileSystem {
                        path,
                        operation: "walk directory",
                        source: e.into(),
                    }))
                }
            });
        Box::new(entries)
    }
}
