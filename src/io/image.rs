//! Image decoding, resizing and encoding collaborators

use crate::io::configuration::SUPPORTED_EXTENSIONS;
use crate::io::error::{MosaicError, Result, WithPath};
use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use std::path::Path;

/// Decodes tile and source images
pub trait ImageSource: Send + Sync {
    /// Decode the image stored at `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be read or decoded
    fn open(&self, path: &Path) -> Result<DynamicImage>;
}

/// Decodes JPEG, PNG and GIF files from disk
#[derive(Debug, Clone, Copy, Default)]
pub struct FileImageSource;

impl ImageSource for FileImageSource {
    fn open(&self, path: &Path) -> Result<DynamicImage> {
        image::ImageReader::open(path)
            .with_operation(path, "open image")?
            .with_guessed_format()
            .with_operation(path, "detect image format")?
            .decode()
            .with_path(path)
    }
}

/// Resizes images to an exact size
pub trait Resizer: Send + Sync {
    /// Scale `image` to cover `width` x `height` and crop the overflow evenly
    fn fill(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage;
}

/// Lanczos resampling with center cropping
#[derive(Debug, Clone, Copy, Default)]
pub struct LanczosResizer;

impl Resizer for LanczosResizer {
    fn fill(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        if image.width() == width && image.height() == height {
            return image.clone();
        }
        image.resize_to_fill(width, height, FilterType::Lanczos3)
    }
}

/// Lowercased extension of `path` if it names a supported format
pub fn supported_extension(path: &Path) -> Option<String> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    SUPPORTED_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(extension)
}

/// Reject output paths whose extension has no encoder
///
/// # Errors
///
/// Returns `UnsupportedFormat` for any extension outside the supported set
pub fn check_output_format(path: &Path) -> Result<()> {
    supported_extension(path)
        .map(|_| ())
        .ok_or_else(|| MosaicError::UnsupportedFormat {
            path: path.to_path_buf(),
        })
}

/// Encode `image` to `path`, choosing the format from the extension
///
/// JPEG has no alpha channel, so it is written as RGB.
///
/// # Errors
///
/// Returns an error if the format is unsupported, the parent directory
/// cannot be created, or encoding fails
pub fn save_image(image: &RgbaImage, path: &Path) -> Result<()> {
    let extension = supported_extension(path).ok_or_else(|| MosaicError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| MosaicError::FileSystem {
            path: parent.to_path_buf(),
            operation: "create directory",
            source: e,
        })?;
    }

    let result = match extension.as_str() {
        "jpg" | "jpeg" => DynamicImage::ImageRgba8(image.clone()).to_rgb8().save(path),
        _ => image.save(path),
    };

    result.map_err(|e| MosaicError::ImageExport {
        path: path.to_path_buf(),
        source: e,
    })
}
