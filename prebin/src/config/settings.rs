//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::package::CatalogSource;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    /// Install directory and ownership settings
    pub install: InstallSettings,
    /// Download settings
    pub download: DownloadSettings,
    /// Catalog sources and caching
    pub catalogs: CatalogSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Where ownership tags are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OwnershipBackend {
    /// Extended attribute on the installed file.
    #[default]
    Xattr,
    /// One file per binary in a separate directory.
    Sidecar,
}

impl fmt::Display for OwnershipBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xattr => write!(f, "xattr"),
            Self::Sidecar => write!(f, "sidecar"),
        }
    }
}

impl FromStr for OwnershipBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "xattr" => Ok(Self::Xattr),
            "sidecar" => Ok(Self::Sidecar),
            other => Err(format!("unknown ownership backend '{}'", other)),
        }
    }
}

/// Install configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallSettings {
    /// Directory binaries are installed into
    pub directory: PathBuf,
    /// Treat every file as owned under its base name, ignoring tags
    pub retake_ownership: bool,
    /// Ownership tag backend
    pub ownership: OwnershipBackend,
    /// Sidecar directory (only used with the sidecar backend)
    pub sidecar_dir: PathBuf,
}

/// Download configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    /// Timeout in seconds for catalog requests and connection setup.
    pub timeout: u64,
}

/// Catalog configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSettings {
    /// Seconds a fetched catalog is reused within one process.
    pub cache_ttl: u64,
    /// Sources in priority order (ties in rank go to earlier sources).
    pub sources: Vec<CatalogSource>,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}
