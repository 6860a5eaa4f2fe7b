//! Typed catalog entries built from loosely-typed JSON records.
//!
//! Catalogs are produced by several scrapers with drifting schemas, so
//! decoding is field-by-field and never fails: a missing or mistyped field
//! takes its zero value and the rest of the record is kept.

use serde_json::{Map, Value};

use super::descriptor::RequestDescriptor;

/// Raw catalog record as it appears in a catalog document.
pub type CatalogRecord = Map<String, Value>;

/// One resolvable artifact from a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Binary name (`pkg`).
    pub name: String,
    /// Human-readable name (`pkg_name`).
    pub pretty_name: String,
    /// Package id (`pkg_id`).
    pub package_id: String,
    pub description: String,
    pub version: String,
    pub download_url: String,
    /// Declared size as published (free-form, e.g. `"4.2 MB"`).
    pub size: String,
    /// BLAKE3 content hash, hex.
    pub bsum: String,
    /// SHA-256 hash, hex. Verified by the install pipeline.
    pub shasum: String,
    pub build_date: String,
    pub build_script: String,
    pub build_log: String,
    pub categories: Vec<String>,
    /// Additional executables shipped under this entry.
    pub provides: Vec<String>,
    /// Container/blob reference.
    pub ghcr_blob: String,
    /// Catalog-assigned priority; higher wins.
    pub rank: u32,
    pub notes: Vec<String>,
    pub src_urls: Vec<String>,
    pub web_urls: Vec<String>,
}

impl CatalogEntry {
    /// Decode a raw record.
    pub fn from_record(record: &CatalogRecord) -> Self {
        Self {
            name: string_field(record, &["pkg", "name"]),
            pretty_name: string_field(record, &["pkg_name"]),
            package_id: string_field(record, &["pkg_id"]),
            description: string_field(record, &["description"]),
            version: string_field(record, &["version"]),
            download_url: string_field(record, &["download_url"]),
            size: size_field(record),
            bsum: string_field(record, &["bsum", "b3sum"]),
            shasum: string_field(record, &["shasum", "sha256sum", "sha256"]),
            build_date: string_field(record, &["build_date"]),
            build_script: string_field(record, &["build_script"]),
            build_log: string_field(record, &["build_log"]),
            categories: list_or_csv_field(record, &["categories", "category"]),
            provides: list_or_csv_field(record, &["provides", "extra_bins"]),
            ghcr_blob: string_field(record, &["ghcr_blob"]),
            rank: rank_of(record),
            notes: list_field(record, &["notes"]),
            src_urls: list_field(record, &["src_urls"]),
            web_urls: list_or_csv_field(record, &["web_urls", "web_url"]),
        }
    }

    /// Decode a raw JSON value. Non-object values yield an empty entry.
    pub fn from_value(value: &Value) -> Self {
        value.as_object().map(Self::from_record).unwrap_or_default()
    }

    /// Checksum verified by the install pipeline (SHA-256 hex).
    pub fn checksum(&self) -> &str {
        &self.shasum
    }

    /// Descriptor identifying exactly this entry.
    pub fn descriptor(&self) -> RequestDescriptor {
        RequestDescriptor::new(self.name.clone())
            .with_package_id(self.package_id.clone())
            .with_version(self.version.clone())
    }

    /// File name this entry installs as. See [`install_name`].
    pub fn install_name(&self) -> &str {
        install_name(&self.name)
    }
}

/// File name a package called `name` installs as.
///
/// Catalog names may carry a path (`Baseutils/coreutils/ls`); only the
/// last segment names the installed file.
pub fn install_name(name: &str) -> &str {
    name.rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or(name)
}

/// Name of a raw record, without decoding the rest of it.
pub fn name_of(record: &CatalogRecord) -> &str {
    str_field(record, &["pkg", "name"]).unwrap_or("")
}

/// Package id of a raw record.
pub fn package_id_of(record: &CatalogRecord) -> &str {
    str_field(record, &["pkg_id"]).unwrap_or("")
}

/// Rank of a raw record. Numbers truncate toward zero, numeric strings are
/// accepted, anything else is 0.
pub fn rank_of(record: &CatalogRecord) -> u32 {
    match record.get("rank") {
        Some(Value::Number(n)) => {
            if let Some(v) = n.as_u64() {
                v.min(u32::MAX as u64) as u32
            } else if let Some(v) = n.as_f64() {
                if v.is_finite() && v > 0.0 {
                    v.min(u32::MAX as f64) as u32
                } else {
                    0
                }
            } else {
                0
            }
        }
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn str_field<'a>(record: &'a CatalogRecord, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| record.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

fn string_field(record: &CatalogRecord, keys: &[&str]) -> String {
    str_field(record, keys).unwrap_or_default().to_string()
}

fn size_field(record: &CatalogRecord) -> String {
    match record.get("size") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn strings_of(value: &Value) -> Option<Vec<String>> {
    value.as_array().map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}

fn list_field(record: &CatalogRecord, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .filter_map(|key| record.get(*key).and_then(strings_of))
        .find(|list| !list.is_empty())
        .unwrap_or_default()
}

fn list_or_csv_field(record: &CatalogRecord, keys: &[&str]) -> Vec<String> {
    for key in keys {
        let list = match record.get(*key) {
            Some(Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
            Some(value) => strings_of(value).unwrap_or_default(),
            None => Vec::new(),
        };
        if !list.is_empty() {
            return list;
        }
    }
    Vec::new()
}
