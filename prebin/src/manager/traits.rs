//! Trait definitions for manager abstractions.
//!
//! These traits enable dependency injection and testing of the manager components.

use std::io::Read;

use crate::package::{Catalog, CatalogSource};

use super::ManagerResult;

/// Client for fetching catalogs.
///
/// This trait abstracts HTTP fetching to enable testing without network access.
pub trait CatalogClient: Send + Sync {
    /// Fetch and parse the catalog published by `source`.
    ///
    /// Implementations apply the source's fallback URL when the primary
    /// URL fails.
    fn fetch_catalog(&self, source: &CatalogSource) -> ManagerResult<Catalog>;
}

/// Progress callback for download operations: `(downloaded, total)`.
///
/// `total` is 0 when the server did not announce a length.
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// An open artifact download.
pub struct ArtifactStream {
    /// Response body.
    pub reader: Box<dyn Read + Send>,
    /// Announced length, if any.
    pub content_length: Option<u64>,
}

impl ArtifactStream {
    /// Wrap a reader.
    pub fn new(reader: impl Read + Send + 'static, content_length: Option<u64>) -> Self {
        Self {
            reader: Box::new(reader),
            content_length,
        }
    }
}

impl std::fmt::Debug for ArtifactStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactStream")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Opens artifact downloads.
///
/// This trait abstracts the transport so the install pipeline can be
/// exercised with in-memory bodies.
pub trait ArtifactFetcher: Send + Sync {
    /// Issue a cache-bypassing GET for `url`.
    fn open(&self, url: &str) -> ManagerResult<ArtifactStream>;
}
