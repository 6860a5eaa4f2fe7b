//! Error types for the package manager.

use std::path::PathBuf;

use thiserror::Error;

use crate::package::ResolveError;

use super::ownership::OwnershipError;

/// Result alias for manager operations.
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Errors raised while resolving, downloading, installing or inspecting
/// binaries.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// No catalog entry matches the request.
    #[error("'{request}' not found in any of the catalogs")]
    NotFound { request: String },

    /// Downloaded content does not hash to the expected checksum.
    #[error("checksum verification failed for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    /// The operation was cancelled.
    #[error("download of {url} was cancelled")]
    Cancelled { url: String },

    /// HTTP request or transfer failed.
    #[error("HTTP error for {url}: {reason}")]
    HttpError { url: String, reason: String },

    /// HTTP request timed out.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// A catalog could not be fetched from any of its URLs.
    #[error("failed to fetch catalog '{label}' from {url}: {reason}")]
    CatalogFetchFailed {
        label: String,
        url: String,
        reason: String,
    },

    /// A catalog was fetched but could not be parsed.
    #[error("failed to parse catalog '{label}' from {url}: {reason}")]
    CatalogParseFailed {
        label: String,
        url: String,
        reason: String,
    },

    /// Failed to create a directory.
    #[error("failed to create directory {path}: {source}")]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read a file or directory.
    #[error("failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file.
    #[error("failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to move the downloaded file into place.
    #[error("failed to rename {from} to {to}: {source}")]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to make the installed file executable.
    #[error("failed to set executable bit for {path}: {source}")]
    PermissionFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to sanitize a downloaded artifact.
    #[error("failed to sanitize {path}: {source}")]
    SanitizeFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing an ownership tag failed.
    #[error(transparent)]
    Ownership(#[from] OwnershipError),
}

impl From<ResolveError> for ManagerError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::NotFound { request } => ManagerError::NotFound { request },
        }
    }
}

impl ManagerError {
    /// Whether this error came from the network layer.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::HttpError { .. }
                | Self::Timeout { .. }
                | Self::CatalogFetchFailed { .. }
                | Self::CatalogParseFailed { .. }
        )
    }

    /// Whether this error came from the local filesystem.
    pub fn is_filesystem(&self) -> bool {
        matches!(
            self,
            Self::CreateDirFailed { .. }
                | Self::ReadFailed { .. }
                | Self::WriteFailed { .. }
                | Self::RenameFailed { .. }
                | Self::PermissionFailed { .. }
                | Self::SanitizeFailed { .. }
                | Self::Ownership(_)
        )
    }
}
