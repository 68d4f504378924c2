//! Error types and context management for tile pipeline operations

use std::fmt;
use std::path::PathBuf;

/// Main error type for all run-level failures
///
/// Unit-level problems (a skipped seam, a failed oracle call) are reported as
/// values in the run report and never surface through this type.
#[derive(Debug)]
pub enum SeamweaveError {
    /// Tile tree is missing, empty or malformed
    Structural {
        /// Root directory of the offending tree
        path: PathBuf,
        /// Description of what is wrong with the layout
        reason: String,
    },

    /// Failed to decode a tile or image from the filesystem
    ImageLoad {
        /// Path to the image file
        path: PathBuf,
        /// Underlying image loading error
        source: image::ImageError,
    },

    /// Failed to encode or save an image to disk
    ImageExport {
        /// Path where export was attempted
        path: PathBuf,
        /// Underlying image export error
        source: image::ImageError,
    },

    /// Parameter validation failed
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
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

    /// JSON encoding or decoding failed
    Serialization {
        /// Path of the document, when one is involved
        path: PathBuf,
        /// Underlying serde error
        source: serde_json::Error,
    },

    /// Output directory was produced by a run with a different configuration
    ConfigMismatch {
        /// Output directory holding the conflicting manifest
        path: PathBuf,
        /// Hash recorded in the existing manifest
        existing: String,
        /// Hash of the current configuration
        current: String,
    },
}

impl fmt::Display for SeamweaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structural { path, reason } => {
                write!(f, "Invalid tile tree '{}': {reason}", path.display())
            }
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
            Self::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
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
            Self::Serialization { path, source } => {
                write!(f, "JSON error for '{}': {source}", path.display())
            }
            Self::ConfigMismatch {
                path,
                existing,
                current,
            } => {
                write!(
                    f,
                    "Output '{}' was produced with config {existing}, current config is {current} (use --force to overwrite)",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for SeamweaveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ImageLoad { source, .. } | Self::ImageExport { source, .. } => Some(source),
            Self::FileSystem { source, .. } => Some(source),
            Self::Serialization { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for pipeline results
pub type Result<T> = std::result::Result<T, SeamweaveError>;

/// Attaches a path and operation to low-level errors
pub trait WithPath<T> {
    /// Attach the path and operation being performed
    ///
    /// # Errors
    ///
    /// Propagates the original error enriched with the given path
    fn with_path(self, path: impl Into<PathBuf>, operation: &'static str) -> Result<T>;
}

impl<T> WithPath<T> for std::result::Result<T, std::io::Error> {
    fn with_path(self, path: impl Into<PathBuf>, operation: &'static str) -> Result<T> {
        self.map_err(|source| SeamweaveError::FileSystem {
            path: path.into(),
            operation,
            source,
        })
    }
}

impl<T> WithPath<T> for std::result::Result<T, serde_json::Error> {
    fn with_path(self, path: impl Into<PathBuf>, _operation: &'static str) -> Result<T> {
        self.map_err(|source| SeamweaveError::Serialization {
            path: path.into(),
            source,
        })
    }
}

impl From<image::ImageError> for SeamweaveError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageLoad {
            path: PathBuf::from("<unknown>"),
            source: err,
        }
    }
}

impl From<std::io::Error> for SeamweaveError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

impl From<serde_json::Error> for SeamweaveError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            path: PathBuf::from("<unknown>"),
            source: err,
        }
    }
}

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> SeamweaveError {
    SeamweaveError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create a structural error for a tile tree
pub fn structural_error(path: impl Into<PathBuf>, reason: &impl ToString) -> SeamweaveError {
    SeamweaveError::Structural {
        path: path.into(),
        reason: reason.to_string(),
    }
}
