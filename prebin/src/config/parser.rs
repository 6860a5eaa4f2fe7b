//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::package::CatalogSource;

/// Prefix of per-catalog sections (`[catalog.<label>]`).
pub(super) const CATALOG_SECTION_PREFIX: &str = "catalog.";

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [install] section
    if let Some(section) = ini.section(Some("install")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.install.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("retake_ownership") {
            config.install.retake_ownership = parse_bool(v);
        }
        if let Some(v) = section.get("ownership") {
            config.install.ownership = v.parse().map_err(|_| ConfigFileError::InvalidValue {
                section: "install".to_string(),
                key: "ownership".to_string(),
                value: v.to_string(),
                reason: "must be 'xattr' or 'sidecar'".to_string(),
            })?;
        }
        if let Some(v) = section.get("sidecar_dir") {
            let v = v.trim();
            if !v.is_empty() {
                config.install.sidecar_dir = expand_tilde(v);
            }
        }
    }

    // [download] section
    if let Some(section) = ini.section(Some("download")) {
        if let Some(v) = section.get("timeout") {
            config.download.timeout = parse_positive(v).ok_or_else(|| {
                ConfigFileError::InvalidValue {
                    section: "download".to_string(),
                    key: "timeout".to_string(),
                    value: v.to_string(),
                    reason: "must be a positive integer (seconds)".to_string(),
                }
            })?;
        }
    }

    // [catalogs] section
    if let Some(section) = ini.section(Some("catalogs")) {
        if let Some(v) = section.get("cache_ttl") {
            config.catalogs.cache_ttl =
                v.trim()
                    .parse()
                    .map_err(|_| ConfigFileError::InvalidValue {
                        section: "catalogs".to_string(),
                        key: "cache_ttl".to_string(),
                        value: v.to_string(),
                        reason: "must be a non-negative integer (seconds)".to_string(),
                    })?;
        }
    }

    // [catalog.<label>] sections
    let sources = parse_catalog_sections(ini)?;
    if !sources.is_empty() {
        config.catalogs.sources = sources;
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

/// Collect `[catalog.<label>]` sections in file order.
fn parse_catalog_sections(ini: &Ini) -> Result<Vec<CatalogSource>, ConfigFileError> {
    let mut sources = Vec::new();

    for (name, section) in ini.iter() {
        let Some(label) = name.and_then(|n| n.strip_prefix(CATALOG_SECTION_PREFIX)) else {
            continue;
        };
        let label = label.trim();
        let section_name = format!("{}{}", CATALOG_SECTION_PREFIX, label);

        if label.is_empty() {
            return Err(ConfigFileError::InvalidValue {
                section: section_name,
                key: String::new(),
                value: String::new(),
                reason: "catalog label must not be empty".to_string(),
            });
        }

        let url = section.get("url").map(str::trim).unwrap_or("");
        if url.is_empty() {
            return Err(ConfigFileError::InvalidValue {
                section: section_name,
                key: "url".to_string(),
                value: url.to_string(),
                reason: "a catalog section needs a url".to_string(),
            });
        }

        let mut source = CatalogSource::new(label, url);
        if let Some(fallback) = section.get("fallback_url").map(str::trim) {
            if !fallback.is_empty() {
                source = source.with_fallback(fallback);
            }
        }
        sources.push(source);
    }

    Ok(sources)
}

fn parse_positive(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok().filter(|v| *v > 0)
}

/// Parse a boolean value leniently.
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand ~ to home directory in paths.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
