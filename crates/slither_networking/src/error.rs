//! # Networking Error Types
//!
//! Decoding has no error type: malformed frames degrade instead of failing.
//! What remains are configuration problems and transport refusals.

use std::path::PathBuf;
use thiserror::Error;

/// Errors loading or validating a [`crate::ClientConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Reasons a transport refused an outbound frame.
///
/// Never surfaced past the session: frames are fire-and-forget.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The connection has not opened yet, or has closed.
    #[error("transport not open")]
    NotOpen,

    /// The outbound queue is full.
    #[error("outbound queue full")]
    Backpressure,

    /// The I/O side has gone away.
    #[error("transport peer disconnected")]
    Disconnected,
}

/// Result type for transport sends.
pub type TransportResult<T> = Result<T, TransportError>;
