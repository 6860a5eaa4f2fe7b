//! Matching requests against catalog records and ranking the candidates.
//!
//! `rank` is the only disambiguation signal between duplicate matches; no
//! version comparison takes place. Among records sharing the highest rank
//! the winner is chosen by a fixed order:
//!
//! 1. the catalog that was added first,
//! 2. then the lexically smallest package id,
//! 3. then the earliest position within that catalog.

use thiserror::Error;

use super::catalog::CatalogSet;
use super::descriptor::RequestDescriptor;
use super::entry::{self, CatalogEntry, CatalogRecord};

/// Error resolving a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No record matches the request.
    #[error("no catalog entry matches '{request}'")]
    NotFound { request: String },
}

/// One record matching a request.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    /// Index of the catalog the record came from.
    pub source_index: usize,
    /// Position of the record within its catalog.
    pub position: usize,
    /// Rank of the record.
    pub rank: u32,
    /// The raw record.
    pub record: &'a CatalogRecord,
}

impl Candidate<'_> {
    fn order_key(&self) -> (usize, &str, usize) {
        (
            self.source_index,
            entry::package_id_of(self.record),
            self.position,
        )
    }
}

/// Records matching a request plus the highest rank among them.
#[derive(Debug, Clone, Default)]
pub struct MatchSet<'a> {
    candidates: Vec<Candidate<'a>>,
    highest_rank: u32,
}

impl<'a> MatchSet<'a> {
    /// Matching candidates in catalog order.
    pub fn candidates(&self) -> &[Candidate<'a>] {
        &self.candidates
    }

    /// Highest rank observed (0 when empty).
    pub fn highest_rank(&self) -> u32 {
        self.highest_rank
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// The winning candidate, if any.
    pub fn best(&self) -> Option<&Candidate<'a>> {
        self.candidates
            .iter()
            .filter(|c| c.rank == self.highest_rank)
            .min_by(|a, b| a.order_key().cmp(&b.order_key()))
    }

    /// The winning candidate decoded.
    pub fn select(&self) -> Option<CatalogEntry> {
        self.best().map(|c| CatalogEntry::from_record(c.record))
    }
}

/// Whether a raw record matches a request.
///
/// Names compare exactly (case-sensitive); the package id is compared only
/// when the request carries a non-empty one.
pub fn matches(request: &RequestDescriptor, record: &CatalogRecord) -> bool {
    if entry::name_of(record) != request.name {
        return false;
    }
    match request.package_id.as_deref() {
        Some(id) if !id.is_empty() => entry::package_id_of(record) == id,
        _ => true,
    }
}

/// Collect every record matching a request.
pub fn find_matches<'a>(request: &RequestDescriptor, catalogs: &'a CatalogSet) -> MatchSet<'a> {
    let candidates: Vec<Candidate<'a>> = catalogs
        .records()
        .filter(|(_, _, record)| matches(request, record))
        .map(|(source_index, position, record)| Candidate {
            source_index,
            position,
            rank: entry::rank_of(record),
            record,
        })
        .collect();

    let highest_rank = candidates.iter().map(|c| c.rank).max().unwrap_or(0);

    MatchSet {
        candidates,
        highest_rank,
    }
}

/// Resolve a request to a single catalog entry.
pub fn resolve(
    request: &RequestDescriptor,
    catalogs: &CatalogSet,
) -> Result<CatalogEntry, ResolveError> {
    let matched = find_matches(request, catalogs);
    tracing::debug!(
        request = %request,
        candidates = matched.len(),
        highest_rank = matched.highest_rank(),
        "Matched catalog records"
    );

    matched.select().ok_or_else(|| ResolveError::NotFound {
        request: request.to_string(),
    })
}
