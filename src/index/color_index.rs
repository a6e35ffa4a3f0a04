//! Mapping from representative color to candidate tile images
//!
//! The index is populated by a single writer during indexing and is then
//! shared read-only between generation workers. Every key of the bucket map
//! has a non-empty path list, and the search structure always holds exactly
//! the key set of the map.

use crate::color::Color;
use crate::index::search::{ColorSearch, SearchStrategy};
use crate::io::error::{MosaicError, Result};
use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// Tile images grouped by color with nearest-color lookup
#[derive(Debug)]
pub struct ColorIndex {
    paths: HashMap<Color, Vec<PathBuf>>,
    // Distinct colors in first-insertion order, used for serialization
    order: Vec<Color>,
    search: Box<dyn ColorSearch>,
}

impl Default for ColorIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorIndex {
    /// Create an empty index backed by the default search strategy
    pub fn new() -> Self {
        Self::with_strategy(SearchStrategy::default())
    }

    /// Create an empty index backed by the given search strategy
    pub fn with_strategy(strategy: SearchStrategy) -> Self {
        Self {
            paths: HashMap::new(),
            order: Vec::new(),
            search: strategy.create(),
        }
    }

    /// Number of distinct colors
    pub const fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing has been indexed
    pub const fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Candidate paths recorded for exactly this color
    pub fn paths(&self, color: Color) -> Option<&[PathBuf]> {
        self.paths.get(&color).map(Vec::as_slice)
    }

    /// Distinct colors in the order they were first inserted
    pub const fn colors(&self) -> &[Color] {
        self.order.as_slice()
    }

    /// Record `path` as a candidate for `color`
    ///
    /// Only a color seen for the first time reaches the search structure;
    /// repeated colors just grow their bucket.
    pub fn insert(&mut self, color: Color, path: PathBuf) {
        if let Some(bucket) = self.paths.get_mut(&color) {
            bucket.push(path);
            return;
        }
        self.paths.insert(color, vec![path]);
        self.order.push(color);
        self.search.insert(color);
    }

    /// Indexed color closest to `query` and all of its candidate paths
    ///
    /// Distance is squared Euclidean over (R, G, B); among equally close
    /// colors the first one inserted wins. Returns `None` on an empty index.
    pub fn find_nearest(&self, query: Color) -> Option<(Color, &[PathBuf])> {
        let color = self.search.nearest(query)?;
        let paths = self.paths.get(&color)?;
        Some((color, paths.as_slice()))
    }

    /// Serialize as `{color: u32 LE, length: u16 LE, path bytes}` records
    ///
    /// Records follow first-insertion order so replaying them reproduces
    /// the same tie-breaking.
    ///
    /// # Errors
    ///
    /// Returns an error if a path is longer than `u16::MAX` bytes, has no
    /// byte form on this platform, or the writer fails
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        for color in &self.order {
            let Some(bucket) = self.paths.get(color) else {
                continue;
            };
            for path in bucket {
                let bytes = path_bytes(path)?;
                let length = u16::try_from(bytes.len())
                    .ok()
                    .ok_or_else(|| MosaicError::PathTooLong {
                        path: path.clone(),
                        length: bytes.len(),
                    })?;

                writer.write_all(&color.to_u32().to_le_bytes())?;
                writer.write_all(&length.to_le_bytes())?;
                writer.write_all(bytes)?;
            }
        }
        Ok(())
    }

    /// Replay serialized records into this index until end of stream
    ///
    /// # Errors
    ///
    /// Returns an error if the reader fails, the stream ends inside a record,
    /// or a stored path cannot be represented on this platform
    pub fn load<R: Read>(&mut self, reader: &mut R) -> Result<usize> {
        let mut records = 0;
        loop {
            let mut color = [0_u8; 4];
            if !read_record_start(reader, &mut color)? {
                break;
            }

            let mut length = [0_u8; 2];
            reader.read_exact(&mut length)?;

            let mut path = vec![0_u8; usize::from(u16::from_le_bytes(length))];
            reader.read_exact(&mut path)?;

            self.insert(
                Color::new(u32::from_le_bytes(color)),
                path_from_bytes(path)?,
            );
            records += 1;
        }
        Ok(records)
    }
}

// Paths are stored as raw OS bytes where the platform exposes them
#[cfg(unix)]
#[allow(clippy::unnecessary_wraps)]
fn path_bytes(path: &Path) -> Result<&[u8]> {
    use std::os::unix::ffi::OsStrExt;
    Ok(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Result<&[u8]> {
    path.to_str()
        .map(str::as_bytes)
        .ok_or_else(|| MosaicError::NonUnicodePath {
            path: path.to_path_buf(),
        })
}

#[cfg(unix)]
#[allow(clippy::unnecessary_wraps)]
fn path_from_bytes(bytes: Vec<u8>) -> Result<PathBuf> {
    use std::os::unix::ffi::OsStringExt;
    Ok(PathBuf::from(std::ffi::OsString::from_vec(bytes)))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: Vec<u8>) -> Result<PathBuf> {
    String::from_utf8(bytes)
        .map(PathBuf::from)
        .map_err(|e| MosaicError::NonUnicodePath {
            path: PathBuf::from(String::from_utf8_lossy(e.as_bytes()).into_owned()),
        })
}

// Clean end of stream only between records; a partial header is truncation
fn read_record_start<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        let Some(rest) = buf.get_mut(filled..) else {
            break;
        };
        match reader.read(rest) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "truncated index record",
                ));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}
