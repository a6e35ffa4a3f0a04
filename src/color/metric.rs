//! Packed RGB colors, their distance, and representative colors of image regions
//!
//! Two region summaries are available: the plain channel average, and the
//! primary color, which is the heaviest cluster of a coarse bucketed
//! clustering pass over a down-sampled copy of the region. The primary
//! color is the better key for tile matching because it is a color that
//! actually appears in the region, not a blend.

use crate::io::configuration::{ColorMode, DOWNSIZE_TO, SIMILAR_COLOR_DISTANCE};
use image::{GenericImageView, Rgba};
use std::fmt;

/// 24-bit RGB color packed as `0xRRGGBB`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Color(u32);

impl Color {
    /// Create a color from a packed value, discarding the upper byte
    pub const fn new(packed: u32) -> Self {
        Self(packed & 0x00FF_FFFF)
    }

    /// Create a color from its channels
    pub const fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self(((red as u32) << 16) | ((green as u32) << 8) | blue as u32)
    }

    /// Packed `0xRRGGBB` value
    pub const fn to_u32(self) -> u32 {
        self.0
    }

    /// Red, green and blue channels
    pub const fn channels(self) -> [u8; 3] {
        [(self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8]
    }

    /// Squared Euclidean distance over (R, G, B)
    ///
    /// The square root is never taken since only the ordering matters.
    pub fn distance(self, other: Self) -> u32 {
        self.channels()
            .iter()
            .zip(other.channels().iter())
            .map(|(&a, &b)| {
                let d = u32::from(a.abs_diff(b));
                d * d
            })
            .sum()
    }
}

impl From<Rgba<u8>> for Color {
    fn from(pixel: Rgba<u8>) -> Self {
        let [r, g, b, _] = pixel.0;
        Self::from_rgb(r, g, b)
    }
}

impl From<u32> for Color {
    fn from(packed: u32) -> Self {
        Self::new(packed)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

/// Representative color of a region using the configured algorithm
pub fn representative_color<I>(image: &I, mode: ColorMode, threshold: f64) -> Option<Color>
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    match mode {
        ColorMode::Primary => primary_color(image, threshold),
        ColorMode::Average => average_color(image),
    }
}

/// Arithmetic mean of every pixel's channels
///
/// Returns `None` for an empty region.
pub fn average_color<I>(image: &I) -> Option<Color>
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    let mut sums = [0_u64; 3];
    let mut count = 0_u64;
    for (_, _, Rgba([r, g, b, _])) in image.pixels() {
        for (sum, channel) in sums.iter_mut().zip([r, g, b]) {
            *sum += u64::from(channel);
        }
        count += 1;
    }

    if count == 0 {
        return None;
    }
    let [r, g, b] = sums.map(|sum| (sum / count) as u8);
    Some(Color::from_rgb(r, g, b))
}

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    sums: [f64; 3],
    weight: f64,
}

#[derive(Debug, Clone, Copy)]
struct Cluster {
    color: Color,
    weight: f64,
}

impl Bucket {
    fn add(&mut self, channels: [u8; 3], weight: f64) {
        for (sum, channel) in self.sums.iter_mut().zip(channels) {
            *sum += f64::from(channel) * weight;
        }
        self.weight += weight;
    }

    fn cluster(&self) -> Option<Cluster> {
        (self.weight > 0.0).then(|| {
            let [r, g, b] = self.sums.map(|sum| (sum / self.weight).round() as u8);
            Cluster {
                color: Color::from_rgb(r, g, b),
                weight: self.weight,
            }
        })
    }
}

/// Color of the largest cluster found in a down-sampled copy of the region
///
/// Pixels are split into eight buckets by the high bit of each channel and
/// weighted by alpha. Bucket averages closer than [`SIMILAR_COLOR_DISTANCE`]
/// are merged into the heavier one. Clusters holding no more than
/// `threshold` of the total weight are discarded; ties go to the bucket
/// seen first.
///
/// Returns `None` when the region is empty, fully transparent, or no
/// cluster passes the threshold.
pub fn primary_color<I>(image: &I, threshold: f64) -> Option<Color>
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    let (width, height) = image.dimensions();
    let step_x = (width / DOWNSIZE_TO).max(1) as usize;
    let step_y = (height / DOWNSIZE_TO).max(1) as usize;

    let mut buckets = [Bucket::default(); 8];
    let mut total = 0.0;
    for y in (0..height).step_by(step_y) {
        for x in (0..width).step_by(step_x) {
            let Rgba([r, g, b, a]) = image.get_pixel(x, y);
            let weight = f64::from(a) / 255.0;
            let index =
                (usize::from(r >> 7) << 2) | (usize::from(g >> 7) << 1) | usize::from(b >> 7);
            if let Some(bucket) = buckets.get_mut(index) {
                bucket.add([r, g, b], weight);
            }
            total += weight;
        }
    }

    if total <= 0.0 {
        return None;
    }

    let mut clusters: Vec<Cluster> = buckets.iter().filter_map(Bucket::cluster).collect();
    clusters.sort_by(|a, b| b.weight.total_cmp(&a.weight));

    let mut merged: Vec<Cluster> = Vec::with_capacity(clusters.len());
    for cluster in clusters {
        match merged
            .iter_mut()
            .find(|kept| kept.color.distance(cluster.color) < SIMILAR_COLOR_DISTANCE)
        {
            Some(kept) => kept.weight += cluster.weight,
            None => merged.push(cluster),
        }
    }

    merged
        .into_iter()
        .filter(|cluster| cluster.weight / total > threshold)
        .reduce(|best, cluster| {
            if cluster.weight > best.weight {
                cluster
            } else {
                best
            }
        })
        .map(|cluster| cluster.color)
}
