use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WidePathError>;

/// Coarse classification of a [`WidePathError`], used by the retry layer to
/// decide whether a failed native call is worth repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EmptyPath,
    InvalidPath,
    InvalidSubpath,
    DirectoryNotFound,
    FileNotFound,
    AccessDenied,
    InvalidPattern,
    Io,
    InvalidArgument,
}

/// The primary error type for all operations in the `widepath` crate.
///
/// Every variant that originates from a native call carries the canonical
/// path it was issued against, so failures are diagnosable without tracing.
#[derive(Debug, Error)]
pub enum WidePathError {
    /// The input path string was empty.
    #[error("path is empty")]
    EmptyPath,

    /// The input contains characters or segment patterns the platform
    /// forbids, or resolution of `..` escaped above the root.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// A relative name handed to subdirectory creation resolved outside of
    /// its parent directory.
    #[error("'{child}' is not a subpath of '{parent}'")]
    InvalidSubpath { parent: String, child: String },

    #[error("directory not found: '{path}'")]
    DirectoryNotFound { path: String },

    #[error("file not found: '{path}'")]
    FileNotFound { path: String },

    /// Permission failure, with the native error code when available.
    #[error("access denied: '{path}' (native code {code})")]
    AccessDenied { path: String, code: i32 },

    /// A malformed glob pattern handed to directory enumeration.
    #[error("invalid search pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A generic native failure. The underlying `io::Error` keeps the raw
    /// OS error code.
    #[error("I/O error on '{path}': {source}")]
    Io {
        #[source]
        source: io::Error,
        path: String,
    },

    /// Bad retry configuration, rejected before any attempt is made.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl WidePathError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WidePathError::EmptyPath => ErrorKind::EmptyPath,
            WidePathError::InvalidPath { .. } => ErrorKind::InvalidPath,
            WidePathError::InvalidSubpath { .. } => ErrorKind::InvalidSubpath,
            WidePathError::DirectoryNotFound { .. } => ErrorKind::DirectoryNotFound,
            WidePathError::FileNotFound { .. } => ErrorKind::FileNotFound,
            WidePathError::AccessDenied { .. } => ErrorKind::AccessDenied,
            WidePathError::InvalidPattern { .. } => ErrorKind::InvalidPattern,
            WidePathError::Io { .. } => ErrorKind::Io,
            WidePathError::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }

    /// The raw OS error code, where one exists.
    pub fn native_code(&self) -> Option<i32> {
        match self {
            WidePathError::AccessDenied { code, .. } => Some(*code),
            WidePathError::Io { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }

    pub(crate) fn io(source: io::Error, path: impl Into<String>) -> Self {
        WidePathError::Io { source, path: path.into() }
    }

    /// Map an `io::Error` from an operation targeting a file.
    pub(crate) fn for_file(err: io::Error, path: &str) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => WidePathError::FileNotFound { path: path.to_string() },
            io::ErrorKind::PermissionDenied => WidePathError::AccessDenied {
                path: path.to_string(),
                code: err.raw_os_error().unwrap_or(0),
            },
            _ => WidePathError::io(err, path),
        }
    }

    /// Map an `io::Error` from an operation targeting a directory.
    pub(crate) fn for_dir(err: io::Error, path: &str) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => WidePathError::DirectoryNotFound { path: path.to_string() },
            io::ErrorKind::PermissionDenied => WidePathError::AccessDenied {
                path: path.to_string(),
                code: err.raw_os_error().unwrap_or(0),
            },
            _ => WidePathError::io(err, path),
        }
    }
}
