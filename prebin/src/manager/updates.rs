//! Update detection for installed binaries.
//!
//! Catalog versions are free-form strings, so the installed content hash is
//! compared against the catalog's BLAKE3 sum instead of ordering versions.
//! The hash recorded at install time (that of the artifact as downloaded) is
//! preferred over hashing the file, which sanitizing may have rewritten.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::package::{resolve, CatalogEntry, CatalogSet, RequestDescriptor};

use super::ownership::{OwnershipRegistry, OwnershipStore};
use super::{LocalBinaryStore, ManagerError, ManagerResult};

/// Status of an installed binary against the catalogs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinaryStatus {
    /// Content matches the catalog's hash.
    UpToDate,
    /// The catalog publishes different content.
    UpdateAvailable {
        /// Version recorded in the ownership tag.
        installed: Option<String>,
        /// Version currently published.
        available: String,
    },
    /// The catalog entry publishes no hash.
    Unverifiable,
    /// No catalog carries this package any more.
    Orphaned,
    /// The installed content hash could not be determined.
    Unreadable {
        reason: String,
    },
}

impl BinaryStatus {
    /// Returns true if an update is available.
    pub fn has_update(&self) -> bool {
        matches!(self, Self::UpdateAvailable { .. })
    }
}

/// Update status of one installed binary.
#[derive(Debug, Clone)]
pub struct BinaryInfo {
    pub name: String,
    pub path: PathBuf,
    /// Descriptor read from the ownership tag.
    pub installed: RequestDescriptor,
    pub status: BinaryStatus,
    /// Matching catalog entry, if any.
    pub entry: Option<CatalogEntry>,
}

/// Compares managed binaries against the catalogs.
pub struct UpdateChecker<'a, S: OwnershipStore> {
    store: &'a LocalBinaryStore,
    registry: &'a OwnershipRegistry<S>,
}

impl<'a, S: OwnershipStore> UpdateChecker<'a, S> {
    pub fn new(store: &'a LocalBinaryStore, registry: &'a OwnershipRegistry<S>) -> Self {
        Self { store, registry }
    }

    /// Check one installed binary.
    pub fn check_binary(
        &self,
        path: &Path,
        installed: RequestDescriptor,
        catalogs: &CatalogSet,
    ) -> BinaryInfo {
        let mut lookup = RequestDescriptor::new(installed.name.clone());
        if let Some(id) = &installed.package_id {
            lookup = lookup.with_package_id(id.clone());
        }

        let entry = resolve(&lookup, catalogs).ok();
        let status = match &entry {
            None => BinaryStatus::Orphaned,
            Some(entry) if entry.bsum.trim().is_empty() => BinaryStatus::Unverifiable,
            Some(entry) => match self.installed_hash(path) {
                Ok(local) if local.eq_ignore_ascii_case(entry.bsum.trim()) => {
                    BinaryStatus::UpToDate
                }
                Ok(_) => BinaryStatus::UpdateAvailable {
                    installed: installed.version.clone(),
                    available: entry.version.clone(),
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Cannot hash installed binary"
                    );
                    BinaryStatus::Unreadable {
                        reason: e.to_string(),
                    }
                }
            },
        };

        tracing::debug!(path = %path.display(), ?status, "Checked binary");

        BinaryInfo {
            name: installed.name.clone(),
            path: path.to_path_buf(),
            installed,
            status,
            entry,
        }
    }

    /// BLAKE3 of what was installed at `path`: the recorded download hash,
    /// or the file's own hash when none was recorded.
    fn installed_hash(&self, path: &Path) -> ManagerResult<String> {
        if let Some(hash) = self.registry.read_content_hash(path)? {
            return Ok(hash);
        }
        calculate_blake3(path).map_err(|source| ManagerError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check every managed binary. Unmanaged files and symlinks are skipped.
    ///
    /// A binary that cannot be hashed is reported as
    /// [`BinaryStatus::Unreadable`] and the pass continues.
    pub fn check(&self, catalogs: &CatalogSet) -> ManagerResult<Vec<BinaryInfo>> {
        let results = self
            .store
            .list_installed(self.registry)?
            .into_iter()
            .filter_map(|binary| {
                let identity = binary.identity?;
                Some(self.check_binary(&binary.path, identity, catalogs))
            })
            .collect();

        Ok(results)
    }
}

/// Calculate the BLAKE3 hash of a file, lowercase hex.
pub fn calculate_blake3(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}
