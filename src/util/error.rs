//! Error types for iconmatch.

use thiserror::Error;

/// Result alias for iconmatch operations.
pub type IconMatchResult<T> = std::result::Result<T, IconMatchError>;

/// Errors raised at the edges of the recognizer.
///
/// The per-slot hot path never returns these; it substitutes safe defaults
/// (zero similarity, empty slot) instead.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum IconMatchError {
    /// Width or height is zero or overflows.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is shorter than the row width.
    #[error("stride {stride} is smaller than width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer cannot hold the described image.
    #[error("buffer too small: needed {needed} bytes, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Requested region does not fit inside the image.
    #[error("roi {x},{y} {width}x{height} outside {img_width}x{img_height}")]
    RoiOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// A configuration value is out of its valid range.
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },
    /// Template has no intensity variation after normalization.
    #[error("template `{id}` is degenerate (zero variance)")]
    DegenerateTemplate { id: String },
    /// Template id already present in the library.
    #[error("duplicate template id `{id}`")]
    DuplicateTemplate { id: String },
    /// No template survived library construction.
    #[error("template library is empty")]
    EmptyLibrary,
    /// Image decoding or file access failed.
    #[error("image io: {reason}")]
    ImageIo { reason: String },
}

impl IconMatchError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}
