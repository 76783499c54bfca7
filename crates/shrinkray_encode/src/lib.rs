//! Image encoders.
//!
//! The pipeline treats encoding as a black box: source bytes in, encoded
//! bytes of a requested format out. [`CommandEncoder`] delegates to external
//! optimizer programs; [`PassthroughEncoder`] returns its input unchanged.

#![warn(missing_docs)]

pub mod command;
pub mod error;

pub use command::CommandEncoder;
pub use error::EncodeError;

use shrinkray_common::ImageFormat;

/// Transforms source image bytes into an optimized encoding.
///
/// Implementations must be shareable across threads: the pipeline may call
/// `encode` from several workers at once for different files.
pub trait Encoder: Send + Sync {
    /// Encodes `source` into `target` format.
    fn encode(&self, source: &[u8], target: ImageFormat) -> Result<Vec<u8>, EncodeError>;
}

impl<E: Encoder + ?Sized> Encoder for &E {
    fn encode(&self, source: &[u8], target: ImageFormat) -> Result<Vec<u8>, EncodeError> {
        (**self).encode(source, target)
    }
}

/// Encoder that returns the source bytes as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughEncoder;

impl Encoder for PassthroughEncoder {
    fn encode(&self, source: &[u8], _target: ImageFormat) -> Result<Vec<u8>, EncodeError> {
        Ok(source.to_vec())
    }
}
