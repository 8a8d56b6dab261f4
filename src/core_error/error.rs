// Error taxonomy shared by the path resolver, directories and files.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VfsError {
    #[error("Pathname not allowed: {0}")]
    PathOutsideSandbox(String),

    #[error("User not authenticated")]
    NotAuthenticated,

    #[error("Login rejected: {0}")]
    LoginRejected(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Expected exactly one match for {path}, found {count}")]
    AmbiguousOrNotFound { path: String, count: usize },

    #[error("Wildcards in pathname are not allowed: {0}")]
    WildcardNotSupported(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown digest algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("No file is ready: {0}")]
    FileNotReady(String),

    #[error("End of transfer")]
    EndOfTransfer,

    #[error("No restart marker is set")]
    NotArmed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VfsError {
    /// Normal completion of a read sequence, not a failure.
    pub fn is_end_of_transfer(&self) -> bool {
        matches!(self, VfsError::EndOfTransfer)
    }

    /// I/O failures leave the caller free to resume through a restart marker.
    pub fn is_transient(&self) -> bool {
        matches!(self, VfsError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, VfsError>;
