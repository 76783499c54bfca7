//! Error types for encoding.

use shrinkray_common::ImageFormat;

/// Errors produced by an [`Encoder`](crate::Encoder).
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// No command is configured for the requested format.
    #[error("no encoder configured for {format}")]
    Unconfigured {
        /// The requested output format.
        format: ImageFormat,
    },

    /// The encoder program could not be started.
    #[error("failed to start {program} for {format}: {source}")]
    Spawn {
        /// Program name.
        program: String,
        /// The requested output format.
        format: ImageFormat,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Communicating with a running encoder failed.
    #[error("I/O error talking to {program}: {source}")]
    Io {
        /// Program name.
        program: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The encoder exited unsuccessfully.
    #[error("{program} failed to encode {format} ({status}): {stderr}")]
    Failed {
        /// Program name.
        program: String,
        /// The requested output format.
        format: ImageFormat,
        /// Exit status description.
        status: String,
        /// Trimmed standard error output.
        stderr: String,
    },

    /// The encoder succeeded but produced nothing.
    #[error("{program} produced no output for {format}")]
    EmptyOutput {
        /// Program name.
        program: String,
        /// The requested output format.
        format: ImageFormat,
    },
}
