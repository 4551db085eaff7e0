//! Errors returned and reported by the logger.

use std::{io, path::PathBuf};

/// Filesystem operations performed by the logger, used to describe [`LoggerError::Filesystem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsOperation {
    /// Creating the log directory.
    CreateDirectory,

    /// Appending to the active log file.
    Append,

    /// Renaming the active log file to its archive name.
    Rename,

    /// Listing the entries of the log directory.
    ReadDirectory,

    /// Reading metadata of a file in the log directory.
    Stat,

    /// Deleting a file in the log directory.
    RemoveFile,

    /// Removing the log directory itself.
    RemoveDirectory,
}

impl std::fmt::Display for FsOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let repr = match self {
            Self::CreateDirectory => "create directory",
            Self::Append => "append to",
            Self::Rename => "rename",
            Self::ReadDirectory => "read directory",
            Self::Stat => "stat",
            Self::RemoveFile => "remove file",
            Self::RemoveDirectory => "remove directory",
        };
        write!(f, "{repr}")
    }
}

/// Errors that can occur within the logger.
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// A logging operation was attempted before the logger was initialized.
    #[error("Logs not initialized. Need to initialize before using")]
    NotInitialized,

    /// The logger was initialized a second time without a teardown in between.
    #[error("Logs already initialized, cannot initialize again")]
    AlreadyInitialized,

    /// Both the file and the console sinks were disabled, so nothing would ever be recorded.
    #[error(
        "Both `write_to_file` and `write_to_console` are set to false. At least one needs to be \
         true to actually write logs"
    )]
    NoSinksEnabled,

    /// Represents an error in configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A filesystem operation failed. The underlying I/O error is kept as the source.
    #[error("Failed to {operation} `{}`: {source}", path.display())]
    Filesystem {
        /// The operation that failed.
        operation: FsOperation,

        /// The path the operation was applied to.
        path: PathBuf,

        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A scheduled rotation failed to rename or reopen the active file.
    ///
    /// This error is only ever reported to the console sink, since no caller waits on the timer.
    #[error("Log rotation failed: {0}")]
    RotationFailure(#[source] Box<LoggerError>),

    /// Writing a record to the console failed.
    #[error("Failed to write to the console: {0}")]
    Console(#[source] io::Error),

    /// The rotation worker thread could not be started.
    #[error("Failed to start the rotation scheduler: {0}")]
    Scheduler(#[source] io::Error),

    /// Represents an error during JSON serialization.
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),
}

impl LoggerError {
    pub(crate) fn filesystem(
        operation: FsOperation,
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        Self::Filesystem {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Returns the underlying I/O error kind, if this is a filesystem error.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Filesystem { source, .. } => Some(source.kind()),
            Self::RotationFailure(inner) => inner.io_kind(),
            _ => None,
        }
    }
}
