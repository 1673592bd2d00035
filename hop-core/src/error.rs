//! Error types for hop operations

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum HopError {
    #[error("Data file {} is a directory; set HOP_DATA to a file path", .0.display())]
    DataFileIsDirectory(PathBuf),

    #[error("Malformed entry on line {line}: {reason}")]
    MalformedEntry { line: usize, reason: String },

    #[error("Store is locked by another writer")]
    StoreLocked,

    #[error("Unknown owner {0:?} for HOP_OWNER")]
    UnknownOwner(String),

    #[error("No home directory available to place the data file")]
    NoHomeDirectory,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
