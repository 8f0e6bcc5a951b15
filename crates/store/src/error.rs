//! Typed errors for blueprint persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the store. Per-source failures during repository
/// resolution are logged and swallowed; these reach the caller only from
/// direct file-format and identifier APIs.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid blueprint id {id:?}: {reason}")]
    InvalidId { id: String, reason: &'static str },

    #[error("{path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error(
        "file uses header format version {found}, but this build only supports \
         up to version {supported}"
    )]
    FutureHeaderFormat { found: u32, supported: u32 },

    #[error("document is schema version {found}, but this build only supports up to {supported}")]
    FutureSchema { found: i32, supported: i32 },

    #[error("decoding error: {0}")]
    Decode(#[from] blueprint::DecodeError),

    #[error("encoding error: {0}")]
    Encode(String),
}
