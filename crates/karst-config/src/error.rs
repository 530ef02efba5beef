//! Failure modes of config persistence.
//!
//! Every variant names the file involved, so a bad `karst.ron` three
//! directories deep is diagnosable from the error message alone.

use std::path::PathBuf;

/// Raised when a config file cannot be loaded or written back.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file or its directory could not be touched on disk.
    #[error("config {op} failed for {}: {source}", path.display())]
    Io {
        /// What was being attempted ("read", "write").
        op: &'static str,
        /// The file involved.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but its contents do not parse as a config.
    #[error("{} is not a valid config: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    /// The in-memory config could not be rendered as RON.
    #[error("config could not be encoded: {0}")]
    Encode(#[source] ron::Error),
}
