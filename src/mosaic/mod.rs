//! Source image tiling and concurrent mosaic generation

/// Concurrent tile matching and canvas compositing
pub mod generator;
/// Raster-order tiles and disjoint canvas regions
pub mod tiler;

pub use generator::{GenerationSummary, Generator, TileStatus};
pub use tiler::{Region, Regions, Tile, TileGrid, Tiles};
