//! Default values and constants for all configuration settings.
//!
//! Contains all `DEFAULT_*` constants, the built-in catalog sources and
//! the `ConfigFile::default()` implementation.

use std::path::PathBuf;

use super::file::config_directory;
use super::settings::*;
use crate::package::CatalogSource;

// =============================================================================
// Install
// =============================================================================

/// Default install directory, relative to the home directory.
pub const DEFAULT_INSTALL_SUBDIR: &str = ".local/bin";

/// Default sidecar directory name, inside the config directory.
pub const DEFAULT_SIDECAR_SUBDIR: &str = "ownership";

/// Default install directory (~/.local/bin).
pub fn default_install_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_INSTALL_SUBDIR)
}

/// Default sidecar directory (~/.prebin/ownership).
pub fn default_sidecar_dir() -> PathBuf {
    config_directory().join(DEFAULT_SIDECAR_SUBDIR)
}

// =============================================================================
// Download / catalogs
// =============================================================================

/// Default HTTP timeout in seconds.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// Default catalog cache TTL in seconds.
pub const DEFAULT_CATALOG_CACHE_TTL_SECS: u64 = 300;

const TOOLPACKS_MIRROR: &str =
    "https://huggingface.co/datasets/Azathothas/Toolpacks-Snapshots/resolve/main";

/// Catalog architecture label of the running host, if catalogs exist for it.
pub fn host_arch_label() -> Option<&'static str> {
    arch_label(std::env::consts::ARCH, std::env::consts::OS)
}

/// Catalog architecture label for an `(arch, os)` pair as reported by
/// [`std::env::consts`].
pub fn arch_label(arch: &str, os: &str) -> Option<&'static str> {
    match (arch, os) {
        ("x86_64", "linux") => Some("amd64_linux"),
        ("aarch64", "linux") => Some("arm64_linux"),
        ("aarch64", "android") => Some("arm64_android"),
        _ => None,
    }
}

/// Built-in catalog sources for an architecture label, in priority order.
pub fn catalog_sources_for(arch: &str) -> Vec<CatalogSource> {
    vec![
        CatalogSource::new(
            "Toolpacks",
            format!("https://bin.ajam.dev/{}/METADATA.json", arch),
        )
        .with_fallback(format!(
            "{}/{}/METADATA.json?download=true",
            TOOLPACKS_MIRROR, arch
        )),
        CatalogSource::new(
            "Baseutils",
            format!("https://bin.ajam.dev/{}/Baseutils/METADATA.json", arch),
        )
        .with_fallback(format!(
            "{}/Baseutils/METADATA.json?download=true",
            TOOLPACKS_MIRROR
        )),
        CatalogSource::new(
            "Toolpacks-extras",
            format!("https://pkg.ajam.dev/{}/METADATA.json", arch),
        ),
    ]
}

/// Built-in catalog sources for the host. Empty on unsupported hosts.
pub fn default_catalog_sources() -> Vec<CatalogSource> {
    match host_arch_label() {
        Some(arch) => catalog_sources_for(arch),
        None => {
            tracing::warn!(
                arch = std::env::consts::ARCH,
                os = std::env::consts::OS,
                "No built-in catalogs for this platform"
            );
            Vec::new()
        }
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Default log file (~/.prebin/logs/prebin.log).
pub fn default_log_file() -> PathBuf {
    config_directory().join("logs").join("prebin.log")
}

// =============================================================================
// Default implementations
// =============================================================================

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            directory: default_install_dir(),
            retake_ownership: false,
            ownership: OwnershipBackend::default(),
            sidecar_dir: default_sidecar_dir(),
        }
    }
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
        }
    }
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CATALOG_CACHE_TTL_SECS,
            sources: default_catalog_sources(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            file: default_log_file(),
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            install: InstallSettings::default(),
            download: DownloadSettings::default(),
            catalogs: CatalogSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}
