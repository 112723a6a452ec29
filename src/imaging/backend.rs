//! Image processing backend trait and shared types.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use the recording [`tests::MockBackend`] to count generation
//! attempts without touching pixels.

use super::params::ThumbnailParams;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("No encoder for output {0}")]
    UnsupportedFormat(PathBuf),
}

/// Trait for image processing backends.
///
/// `Sync` so one backend can be shared by every worker of the rayon pool.
pub trait ImageBackend: Sync {
    /// Decode, scale to the target box, encode and persist one thumbnail.
    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError>;
}

impl<T: ImageBackend + ?Sized> ImageBackend for &T {
    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError> {
        (**self).thumbnail(params)
    }
}
