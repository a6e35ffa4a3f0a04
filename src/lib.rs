//! Photomosaic generation from a color-indexed library of tile images
//!
//! A directory of tile images is reduced to one representative color per
//! image and stored in a nearest-color index. A source image is then cut
//! into tiles, and each tile is replaced by an image whose color is closest
//! to its own, with indexing and generation both running on worker pools.

#![forbid(unsafe_code)]

/// Representative color extraction and the color distance metric
pub mod color;
/// Color index, nearest-color search and concurrent index building
pub mod index;
/// Input/output collaborators, configuration and error handling
pub mod io;
/// Source image tiling and concurrent mosaic generation
pub mod mosaic;

pub use io::error::{MosaicError, Result};
