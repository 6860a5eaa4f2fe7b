//! Catalog documents and the ordered set of catalogs a request is resolved
//! against.

use std::fmt;

use serde_json::Value;

use super::entry::{CatalogEntry, CatalogRecord};

/// Where a catalog is published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSource {
    /// Source label (e.g. `Toolpacks`).
    pub label: String,
    /// Primary URL.
    pub url: String,
    /// Mirror tried when the primary URL fails.
    pub fallback_url: Option<String>,
}

impl CatalogSource {
    /// Create a source without a fallback.
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
            fallback_url: None,
        }
    }

    /// Set the fallback URL.
    pub fn with_fallback(mut self, url: impl Into<String>) -> Self {
        self.fallback_url = Some(url.into());
        self
    }
}

/// Error parsing a catalog document.
#[derive(Debug)]
pub enum CatalogParseError {
    /// The document is not valid JSON.
    Json(serde_json::Error),
    /// The document is JSON but not an array of records.
    NotAnArray,
}

impl fmt::Display for CatalogParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogParseError::Json(e) => write!(f, "invalid JSON: {}", e),
            CatalogParseError::NotAnArray => write!(f, "catalog is not a JSON array"),
        }
    }
}

impl std::error::Error for CatalogParseError {}

/// Records published by one source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    /// Source label.
    pub label: String,
    /// Records in publication order.
    pub records: Vec<CatalogRecord>,
}

impl Catalog {
    /// Create a catalog from already-decoded records.
    pub fn new(label: impl Into<String>, records: Vec<CatalogRecord>) -> Self {
        Self {
            label: label.into(),
            records,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the catalog has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parse a catalog document.
///
/// The document must be a JSON array. Elements that are not objects are
/// dropped; malformed fields inside objects are left for
/// [`CatalogEntry::from_record`] to tolerate.
pub fn parse_catalog(label: &str, content: &str) -> Result<Catalog, CatalogParseError> {
    let value: Value = serde_json::from_str(content).map_err(CatalogParseError::Json)?;
    let Value::Array(items) = value else {
        return Err(CatalogParseError::NotAnArray);
    };

    let records = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect();

    Ok(Catalog::new(label, records))
}

/// Ordered collection of catalogs.
///
/// Order matters: it is the first tie-break when several records share the
/// highest rank.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSet {
    catalogs: Vec<Catalog>,
}

impl CatalogSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a catalog with the lowest precedence so far.
    pub fn push(&mut self, catalog: Catalog) {
        self.catalogs.push(catalog);
    }

    /// Catalogs in precedence order.
    pub fn catalogs(&self) -> &[Catalog] {
        &self.catalogs
    }

    /// Total number of records across all catalogs.
    pub fn record_count(&self) -> usize {
        self.catalogs.iter().map(Catalog::len).sum()
    }

    /// Every record with its catalog index and position.
    pub fn records(&self) -> impl Iterator<Item = (usize, usize, &CatalogRecord)> {
        self.catalogs
            .iter()
            .enumerate()
            .flat_map(|(source_index, catalog)| {
                catalog
                    .records
                    .iter()
                    .enumerate()
                    .map(move |(position, record)| (source_index, position, record))
            })
    }

    /// Every record decoded.
    pub fn entries(&self) -> impl Iterator<Item = CatalogEntry> + '_ {
        self.records()
            .map(|(_, _, record)| CatalogEntry::from_record(record))
    }

    /// Identity strings of every named entry, in catalog order.
    pub fn identities(&self) -> Vec<String> {
        self.entries()
            .filter(|entry| !entry.name.is_empty())
            .map(|entry| entry.descriptor().to_string())
            .collect()
    }
}

impl FromIterator<Catalog> for CatalogSet {
    fn from_iter<I: IntoIterator<Item = Catalog>>(iter: I) -> Self {
        Self {
            catalogs: iter.into_iter().collect(),
        }
    }
}
