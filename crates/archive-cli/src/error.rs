//! Error types for archive-cli

use archive_core::JobError;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from archive-core
    #[error(transparent)]
    Core(#[from] archive_core::Error),

    /// Error from archive-fs
    #[error(transparent)]
    Fs(#[from] archive_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The relocation policy refused part of the plan
    #[error("{message}")]
    Blocked { message: String },

    /// The sync job did not finish successfully
    #[error(transparent)]
    Job(#[from] JobError),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }

    pub fn blocked(message: impl Into<String>) -> Self {
        Self::Blocked {
            message: message.into(),
        }
    }

    /// Process exit code for this error
    ///
    /// Failed suboperations and cancellation exit with 2, everything else with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Job(JobError::Cancelled | JobError::OperationsFailed { .. }) => 2,
            _ => 1,
        }
    }
}
