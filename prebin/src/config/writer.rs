//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::fmt::Write;
use std::path::Path;

use super::parser::CATALOG_SECTION_PREFIX;
use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let mut out = format!(
        r#"[install]
; Directory binaries are installed into (should be on PATH)
directory = {}
; Treat every file in the directory as owned under its own name,
; ignoring ownership tags (true/false)
retake_ownership = {}
; Where ownership tags are kept:
;   xattr   - extended attribute user.FullName on each binary (default)
;   sidecar - one small file per binary in sidecar_dir, for filesystems
;             without user extended attributes
ownership = {}
sidecar_dir = {}

[download]
; Timeout in seconds for catalog requests and connection setup
timeout = {}

[catalogs]
; Seconds a fetched catalog is reused within one run
cache_ttl = {}

[logging]
; Log file, truncated at the start of every run
file = {}
"#,
        path_to_string(&config.install.directory),
        config.install.retake_ownership,
        config.install.ownership,
        path_to_string(&config.install.sidecar_dir),
        config.download.timeout,
        config.catalogs.cache_ttl,
        path_to_string(&config.logging.file),
    );

    if !config.catalogs.sources.is_empty() {
        out.push_str(
            "\n; Catalog sources in priority order. Entries of equal rank are taken\n\
             ; from the earliest catalog. fallback_url is tried when url fails.\n",
        );
    }
    for source in &config.catalogs.sources {
        let _ = write!(
            out,
            "\n[{}{}]\nurl = {}\n",
            CATALOG_SECTION_PREFIX, source.label, source.url
        );
        if let Some(fallback) = &source.fallback_url {
            let _ = writeln!(out, "fallback_url = {}", fallback);
        }
    }

    out
}

/// Convert path to string, collapsing home dir to ~.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::super::settings::{ConfigFile, OwnershipBackend};
    use crate::package::CatalogSource;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");

        let mut config = ConfigFile::default();
        config.install.directory = PathBuf::from("/opt/bin");
        config.install.retake_ownership = true;
        config.install.ownership = OwnershipBackend::Sidecar;
        config.download.timeout = 60;
        config.catalogs.sources = vec![
            CatalogSource::new("Primary", "https://example.com/METADATA.json")
                .with_fallback("https://mirror.example.com/METADATA.json?download=true"),
            CatalogSource::new("Extras", "https://extras.example.com/METADATA.json"),
        ];

        config.save_to(&config_path).unwrap();
        let loaded = ConfigFile::load_from(&config_path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_default_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.ini");

        let config = ConfigFile::default();
        config.save_to(&config_path).unwrap();

        assert_eq!(ConfigFile::load_from(&config_path).unwrap(), config);
    }

    #[test]
    fn test_written_file_is_commented() {
        let content = super::to_config_string(&ConfigFile::default());
        assert!(content.contains("; Directory binaries are installed into"));
        assert!(content.contains("[install]"));
        assert!(content.contains("ownership = xattr"));
    }
}
