//! Error types and context management for indexing and generation

use std::fmt;
use std::path::{Path, PathBuf};

/// Main error type for all mosaic operations
#[derive(Debug)]
pub enum MosaicError {
    /// Failed to open or decode an image
    ImageLoad {
        /// Path to the image file
        path: PathBuf,
        /// Underlying image loading error
        source: image::ImageError,
    },

    /// Failed to encode or write the output image
    ImageExport {
        /// Path where export was attempted
        path: PathBuf,
        /// Underlying image export error
        source: image::ImageError,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Configuration parameter validation failed
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// Indexing finished without a single usable tile image
    NoImagesFound {
        /// Root that was scanned
        path: PathBuf,
    },

    /// No representative color could be extracted from an image region
    ///
    /// Happens for fully transparent regions or when every color cluster
    /// falls below the configured threshold.
    NoRepresentativeColor,

    /// Output extension has no known encoder
    UnsupportedFormat {
        /// Path with the offending extension
        path: PathBuf,
    },

    /// Path does not fit the serialized index record
    PathTooLong {
        /// The path that was too long
        path: PathBuf,
        /// Encoded length in bytes
        length: usize,
    },

    /// Path has no portable byte form on this platform
    NonUnicodePath {
        /// The offending path, lossily rendered when read back
        path: PathBuf,
    },

    /// Worker thread pool could not be started
    WorkerPool {
        /// Underlying pool construction error
        source: rayon::ThreadPoolBuildError,
    },
}

impl fmt::Display for MosaicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageLoad { path, source } => {
                write!(f, "Failed to load image '{}': {source}", path.display())
            }
            Self::ImageExport { path, source } => {
                write!(
                    f,
                    "Failed to export image to '{}': {source}",
                    path.display()
                )
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
            Self::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
            }
            Self::NoImagesFound { path } => {
                write!(f, "No images found in '{}'", path.display())
            }
            Self::NoRepresentativeColor => write!(f, "No representative color found"),
            Self::UnsupportedFormat { path } => {
                write!(f, "Unsupported image format for '{}'", path.display())
            }
            Self::PathTooLong { path, length } => {
                write!(
                    f,
                    "Path '{}' is too long to index ({length} bytes, max {})",
                    path.display(),
                    u16::MAX
                )
            }
            Self::NonUnicodePath { path } => {
                write!(f, "Path '{}' is not valid Unicode", path.display())
            }
            Self::WorkerPool { source } => {
                write!(f, "Failed to start worker pool: {source}")
            }
        }
    }
}

impl std::error::Error for MosaicError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ImageLoad { source, .. } | Self::ImageExport { source, .. } => Some(source),
            Self::FileSystem { source, .. } => Some(source),
            Self::WorkerPool { source } => Some(source),
            _ => None,
        }
    }
}

impl MosaicError {
    /// Path the error refers to, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::ImageLoad { path, .. }
            | Self::ImageExport { path, .. }
            | Self::FileSystem { path, .. }
            | Self::NoImagesFound { path }
            | Self::UnsupportedFormat { path }
            | Self::NonUnicodePath { path }
            | Self::PathTooLong { path, .. } => Some(path.as_path()),
            _ => None,
        }
    }
}

/// Convenience type alias for mosaic results
pub type Result<T> = std::result::Result<T, MosaicError>;

/// Attaches the path and operation an error occurred on
pub trait WithPath<T> {
    /// Replace the placeholder path of a load or file system error
    ///
    /// # Errors
    ///
    /// Propagates the original error with the path applied
    fn with_path(self, path: &Path) -> Result<T>;

    /// Replace the placeholder path and name the failed operation
    ///
    /// # Errors
    ///
    /// Propagates the original error with path and operation applied
    fn with_operation(self, path: &Path, operation: &'static str) -> Result<T>;
}

impl<T, E> WithPath<T> for std::result::Result<T, E>
where
    E: Into<MosaicError>,
{
    fn with_path(self, path: &Path) -> Result<T> {
        self.map_err(|e| {
            let mut error: MosaicError = e.into();
            match &mut error {
                MosaicError::ImageLoad { path: p, .. }
                | MosaicError::ImageExport { path: p, .. }
                | MosaicError::FileSystem { path: p, .. } => *p = path.to_path_buf(),
                _ => {}
            }
            error
        })
    }

    fn with_operation(self, path: &Path, operation: &'static str) -> Result<T> {
        self.with_path(path).map_err(|mut error| {
            if let MosaicError::FileSystem { operation: op, .. } = &mut error {
                *op = operation;
            }
            error
        })
    }
}

impl From<image::ImageError> for MosaicError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageLoad {
            path: PathBuf::from("<unknown>"),
            source: err,
        }
    }
}

impl From<std::io::Error> for MosaicError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

impl From<rayon::ThreadPoolBuildError> for MosaicError {
    fn from(source: rayon::ThreadPoolBuildError) -> Self {
        Self::WorkerPool { source }
    }
}

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> MosaicError {
    MosaicError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
