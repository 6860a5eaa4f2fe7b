//! The install directory as seen by prebin.

use std::fs;
use std::path::{Path, PathBuf};

use crate::package::{install_name, RequestDescriptor};

use super::ownership::{base_name, OwnershipRegistry, OwnershipStore};
use super::{ManagerError, ManagerResult};

/// A file found in the install directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledBinary {
    pub path: PathBuf,
    /// File name.
    pub name: String,
    /// Decoded ownership tag, `None` for unmanaged files and symlinks.
    pub identity: Option<RequestDescriptor>,
    pub is_symlink: bool,
    /// Any execute bit set (always `true` off Unix).
    pub is_executable: bool,
    /// Size on disk (bytes), of the link itself for symlinks.
    pub size_bytes: u64,
}

impl InstalledBinary {
    /// Whether prebin installed this file.
    pub fn is_managed(&self) -> bool {
        self.identity.is_some()
    }
}

/// Flat directory of installed binaries.
#[derive(Debug, Clone)]
pub struct LocalBinaryStore {
    root: PathBuf,
}

impl LocalBinaryStore {
    /// Create a store over `root`. The directory need not exist yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where a package called `name` is installed.
    ///
    /// Path-qualified catalog names keep only their last segment.
    pub fn install_path(&self, name: &str) -> PathBuf {
        self.root.join(install_name(name))
    }

    /// Every non-directory entry, sorted by file name.
    ///
    /// A missing directory has no entries.
    pub fn list_files(&self) -> ManagerResult<Vec<PathBuf>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.root).map_err(|source| ManagerError::ReadFailed {
            path: self.root.clone(),
            source,
        })?;

        let mut files: Vec<PathBuf> = entries
            .flatten()
            .filter(|entry| entry.file_type().map(|t| !t.is_dir()).unwrap_or(false))
            .map(|entry| entry.path())
            .collect();
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        Ok(files)
    }

    /// Describe every file in the directory.
    pub fn list_installed<S: OwnershipStore>(
        &self,
        registry: &OwnershipRegistry<S>,
    ) -> ManagerResult<Vec<InstalledBinary>> {
        self.list_files()?
            .into_iter()
            .map(|path| describe(&path, registry))
            .collect()
    }

    /// Describe one installed binary, `None` if there is no such file.
    pub fn get<S: OwnershipStore>(
        &self,
        name: &str,
        registry: &OwnershipRegistry<S>,
    ) -> ManagerResult<Option<InstalledBinary>> {
        let path = self.install_path(name);
        if fs::symlink_metadata(&path).is_err() {
            return Ok(None);
        }
        describe(&path, registry).map(Some)
    }
}

fn describe<S: OwnershipStore>(
    path: &Path,
    registry: &OwnershipRegistry<S>,
) -> ManagerResult<InstalledBinary> {
    let meta = fs::symlink_metadata(path).map_err(|source| ManagerError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let is_symlink = meta.file_type().is_symlink();

    Ok(InstalledBinary {
        path: path.to_path_buf(),
        name: base_name(path),
        identity: registry.installed_descriptor(path),
        is_symlink,
        is_executable: is_executable(&meta),
        size_bytes: meta.len(),
    })
}

#[cfg(unix)]
fn is_executable(meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &fs::Metadata) -> bool {
    true
}
