//! User configuration for prebin.
//!
//! Configuration is read from an INI file (`~/.prebin/config.ini` by
//! default). A missing file yields defaults; every key is optional.
//!
//! # Example
//!
//! ```
//! use prebin::config::{ConfigFile, OwnershipBackend};
//!
//! let config = ConfigFile::default();
//! assert_eq!(config.install.ownership, OwnershipBackend::Xattr);
//! assert!(!config.install.retake_ownership);
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::{
    arch_label, catalog_sources_for, default_catalog_sources, default_install_dir,
    default_log_file, default_sidecar_dir, host_arch_label, DEFAULT_CATALOG_CACHE_TTL_SECS,
    DEFAULT_DOWNLOAD_TIMEOUT_SECS,
};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use parser::expand_tilde;
pub use settings::{
    CatalogSettings, ConfigFile, DownloadSettings, InstallSettings, LoggingSettings,
    OwnershipBackend,
};
