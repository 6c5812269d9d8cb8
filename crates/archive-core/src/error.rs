//! Error types for archive-core

use archive_fs::ArchivePath;

/// Result type for archive-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in archive-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File is not present in the repository
    #[error("File not found: {path}")]
    NotFound { path: ArchivePath },

    /// A write or move would replace an existing file
    #[error("Destination already occupied: {path}")]
    DestinationOccupied { path: ArchivePath },

    /// Content written does not hash to the declared checksum
    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: ArchivePath,
        expected: String,
        actual: String,
    },

    /// Repository accepted a file without consuming the whole stream
    #[error("Transfer of {path} ended before the content was fully read")]
    IncompleteTransfer { path: ArchivePath },

    /// A catalog listed the same path twice
    #[error("Duplicate path in catalog: {path}")]
    DuplicatePath { path: ArchivePath },

    /// Two planned suboperations target the same destination path
    #[error("Sync plan targets {path} more than once")]
    DestinationCollision { path: ArchivePath },

    /// A job is already running for the given key
    #[error("A job is already running for {key}")]
    AlreadyRunning { key: String },

    /// Repository refused a write (read-only or injected fault)
    #[error("Write rejected for {path}: {reason}")]
    WriteRejected { path: ArchivePath, reason: String },

    /// Filesystem error from archive-fs
    #[error(transparent)]
    Fs(#[from] archive_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Background task failed to complete
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
