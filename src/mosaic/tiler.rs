//! Tile grid over the source image and the matching partition of the canvas
//!
//! Tiles are produced lazily in raster order. The right-most column and the
//! bottom row are clipped to the image bounds, so the tiles form a partition:
//! every pixel belongs to exactly one tile. [`Regions`] relies on this to
//! hand each worker an exclusive `&mut` view of its part of the canvas.

use crate::io::cancel::CancelToken;
use crate::io::error::{Result, invalid_parameter};
use image::{GenericImageView, Pixel, Rgba, RgbaImage};

const CHANNELS: usize = 4;

/// Rectangular region of the source image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// 1-based position in raster order
    pub number: usize,
    /// Left edge in pixels
    pub x: u32,
    /// Top edge in pixels
    pub y: u32,
    /// Width in pixels, clipped at the right edge
    pub width: u32,
    /// Height in pixels, clipped at the bottom edge
    pub height: u32,
}

/// Grid of tiles covering an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    width: u32,
    height: u32,
    tile_width: u32,
    tile_height: u32,
}

impl TileGrid {
    /// Create a grid of `tile_width` x `tile_height` tiles over a `width` x `height` image
    ///
    /// # Errors
    ///
    /// Returns an error if either tile dimension is zero
    pub fn new(width: u32, height: u32, tile_width: u32, tile_height: u32) -> Result<Self> {
        if tile_width == 0 {
            return Err(invalid_parameter(
                "tile_width",
                &tile_width,
                &"must be positive",
            ));
        }
        if tile_height == 0 {
            return Err(invalid_parameter(
                "tile_height",
                &tile_height,
                &"must be positive",
            ));
        }
        Ok(Self {
            width,
            height,
            tile_width,
            tile_height,
        })
    }

    /// Create a grid over the bounds of `image`
    ///
    /// # Errors
    ///
    /// Returns an error if either tile dimension is zero
    pub fn for_image<I: GenericImageView>(
        image: &I,
        tile_width: u32,
        tile_height: u32,
    ) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::new(width, height, tile_width, tile_height)
    }

    /// Tiles per row
    pub const fn columns(&self) -> u32 {
        self.width.div_ceil(self.tile_width)
    }

    /// Rows of tiles
    pub const fn rows(&self) -> u32 {
        self.height.div_ceil(self.tile_height)
    }

    /// Total number of tiles
    pub const fn len(&self) -> usize {
        self.columns() as usize * self.rows() as usize
    }

    /// Whether the grid covers an empty image
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tile at the given grid position, clipped to the image bounds
    pub fn tile(&self, column: u32, row: u32) -> Option<Tile> {
        if column >= self.columns() || row >= self.rows() {
            return None;
        }
        let x = column * self.tile_width;
        let y = row * self.tile_height;
        Some(Tile {
            number: 1 + column as usize + row as usize * self.columns() as usize,
            x,
            y,
            width: self.tile_width.min(self.width - x),
            height: self.tile_height.min(self.height - y),
        })
    }

    /// Lazy raster-order sequence of all tiles
    ///
    /// The sequence ends early, without error, once `cancel` fires.
    pub const fn tiles<'a>(&self, cancel: &'a CancelToken) -> Tiles<'a> {
        Tiles {
            grid: *self,
            next: 0,
            cancel,
        }
    }

    /// Split `canvas` into one exclusive region per tile, in raster order
    ///
    /// # Errors
    ///
    /// Returns an error if the canvas does not have the grid's dimensions
    pub fn regions<'a>(
        &self,
        canvas: &'a mut RgbaImage,
        cancel: &'a CancelToken,
    ) -> Result<Regions<'a>> {
        if canvas.dimensions() != (self.width, self.height) {
            let (width, height) = canvas.dimensions();
            return Err(invalid_parameter(
                "canvas",
                &format!("{width}x{height}"),
                &format!("must match the {}x{} grid", self.width, self.height),
            ));
        }
        let pixels: &'a mut [u8] = canvas;
        Ok(Regions {
            tiles: self.tiles(cancel),
            rest: pixels,
            band: Vec::new().into_iter(),
            stride: self.width as usize * CHANNELS,
            segment: self.tile_width as usize * CHANNELS,
            columns: self.columns() as usize,
        })
    }
}

/// Lazy raster-order tile sequence of a [`TileGrid`]
#[derive(Debug, Clone)]
pub struct Tiles<'a> {
    grid: TileGrid,
    next: usize,
    cancel: &'a CancelToken,
}

impl Iterator for Tiles<'_> {
    type Item = Tile;

    fn next(&mut self) -> Option<Tile> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let columns = self.grid.columns() as usize;
        if columns == 0 || self.next >= self.grid.len() {
            return None;
        }
        let column = (self.next % columns) as u32;
        let row = (self.next / columns) as u32;
        self.next += 1;
        self.grid.tile(column, row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.grid.len().saturating_sub(self.next)))
    }
}

/// Tiles of `image` in raster order
///
/// # Errors
///
/// Returns an error if either tile dimension is zero
pub fn tiles<'a, I: GenericImageView>(
    image: &I,
    tile_width: u32,
    tile_height: u32,
    cancel: &'a CancelToken,
) -> Result<Tiles<'a>> {
    Ok(TileGrid::for_image(image, tile_width, tile_height)?.tiles(cancel))
}

/// Exclusive view of the canvas pixels under one tile
#[derive(Debug)]
pub struct Region<'a> {
    tile: Tile,
    rows: Vec<&'a mut [u8]>,
}

impl Region<'_> {
    /// Tile this region belongs to
    pub const fn tile(&self) -> &Tile {
        &self.tile
    }

    /// Replace the region's pixels with `image`, anchored at the top-left
    pub fn overwrite(&mut self, image: &RgbaImage) {
        let stride = image.width() as usize * CHANNELS;
        for (row, source) in self.rows.iter_mut().zip(image.as_raw().chunks_exact(stride)) {
            let len = row.len().min(source.len());
            if let (Some(dst), Some(src)) = (row.get_mut(..len), source.get(..len)) {
                dst.copy_from_slice(src);
            }
        }
    }

    /// Alpha-blend `image` over the region's pixels, anchored at the top-left
    pub fn blend(&mut self, image: &RgbaImage) {
        let stride = image.width() as usize * CHANNELS;
        for (row, source) in self.rows.iter_mut().zip(image.as_raw().chunks_exact(stride)) {
            for (dst, src) in row
                .chunks_exact_mut(CHANNELS)
                .zip(source.chunks_exact(CHANNELS))
            {
                let mut pixel = *Rgba::<u8>::from_slice(dst);
                pixel.blend(Rgba::<u8>::from_slice(src));
                dst.copy_from_slice(&pixel.0);
            }
        }
    }
}

/// Partition of a canvas into per-tile regions, in raster order
///
/// Each band of tile rows is split off the remaining canvas when its first
/// tile is reached, so only one band of row slices exists at a time.
#[derive(Debug)]
pub struct Regions<'a> {
    tiles: Tiles<'a>,
    rest: &'a mut [u8],
    band: std::vec::IntoIter<Vec<&'a mut [u8]>>,
    stride: usize,
    segment: usize,
    columns: usize,
}

impl<'a> Regions<'a> {
    fn split_band(&mut self, height: u32) {
        let len = (height as usize * self.stride).min(self.rest.len());
        let (band, rest) = std::mem::take(&mut self.rest).split_at_mut(len);
        self.rest = rest;

        let mut columns: Vec<Vec<&'a mut [u8]>> = (0..self.columns)
            .map(|_| Vec::with_capacity(height as usize))
            .collect();
        for row in band.chunks_mut(self.stride) {
            for (column, segment) in columns.iter_mut().zip(row.chunks_mut(self.segment)) {
                column.push(segment);
            }
        }
        self.band = columns.into_iter();
    }
}

impl<'a> Iterator for Regions<'a> {
    type Item = Region<'a>;

    fn next(&mut self) -> Option<Region<'a>> {
        let tile = self.tiles.next()?;
        if tile.x == 0 {
            self.split_band(tile.height);
        }
        let rows = self.band.next().unwrap_or_default();
        Some(Region { tile, rows })
    }
}
