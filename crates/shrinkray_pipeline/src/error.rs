//! Error types for pipeline runs.

use std::path::PathBuf;

use shrinkray_cache::CacheError;
use shrinkray_encode::EncodeError;

/// Errors that abort a pipeline run.
///
/// None of these are recovered per file: the batch either completes or the
/// run fails without saving the manifest.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Stat, hashing, reading, or writing failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The encoder rejected a source file.
    #[error("failed to encode {path}: {source}")]
    Encode {
        /// The source file being encoded.
        path: PathBuf,
        /// The encoder's error.
        source: EncodeError,
    },

    /// The source tree could not be enumerated.
    #[error("failed to enumerate source files: {0}")]
    Walk(#[from] walkdir::Error),

    /// The worker pool could not be created.
    #[error("failed to start worker pool: {0}")]
    ThreadPool(String),

    /// The run was cancelled before all targets were handled.
    #[error("run cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use shrinkray_common::ImageFormat;

    #[test]
    fn encode_display_names_source() {
        let err = PipelineError::Encode {
            path: PathBuf::from("src/images/hero.jpg"),
            source: EncodeError::Unconfigured {
                format: ImageFormat::Jpeg,
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("hero.jpg"));
        assert!(msg.contains("no encoder configured for jpeg"));
    }

    #[test]
    fn cache_error_is_transparent() {
        let err: PipelineError = CacheError::Serialization {
            reason: "boom".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "serialization error: boom");
    }

    #[test]
    fn cancelled_display() {
        assert_eq!(PipelineError::Cancelled.to_string(), "run cancelled");
    }
}
