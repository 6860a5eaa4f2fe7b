//! Verified installation of single-file artifacts.
//!
//! [`VerifiedInstaller`] downloads an artifact next to its destination,
//! verifies and sanitizes it, then moves it into place atomically. A file at
//! the destination is therefore always either the previous version or the
//! fully verified new one.
//!
//! [`PackageInstaller`] adds catalog resolution in front and ownership
//! tagging behind.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use crate::package::{resolve, CatalogEntry, CatalogSet, RequestDescriptor};

use super::download::{checksum_matches, stream_to_file};
use super::ownership::{OwnershipRegistry, OwnershipStore, XattrStore};
use super::sanitize::ArtifactSanitizer;
use super::traits::{ArtifactFetcher, ProgressCallback};
use super::{ManagerError, ManagerResult};

/// Mode of installed binaries.
#[cfg(unix)]
const INSTALLED_MODE: u32 = 0o755;

/// Mode of a download in progress, before umask.
#[cfg(unix)]
const TEMP_MODE: u32 = 0o644;

/// An artifact that has been moved into place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledArtifact {
    /// Final path.
    pub path: PathBuf,
    /// Downloaded size.
    pub bytes: u64,
    /// SHA-256 of the downloaded bytes (before sanitizing).
    pub sha256: String,
    /// BLAKE3 of the downloaded bytes (before sanitizing).
    pub blake3: String,
    /// `false` when no checksum was published.
    pub checksum_verified: bool,
    /// Whether sanitizing rewrote the file.
    pub sanitized: bool,
}

/// Removes the temp file unless disarmed.
struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = fs::remove_file(&self.path) {
                tracing::debug!(path = %self.path.display(), error = %e, "Failed to remove temp file");
            }
        }
    }
}

/// Path of the in-progress download for `destination`.
pub fn temp_path(destination: &Path) -> PathBuf {
    let mut name = OsString::from(destination.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Create an empty temp file at `path`, replacing any left over from an
/// earlier run. The new file is never executable.
fn create_temp_file(path: &Path) -> io::Result<File> {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed stale temp file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(TEMP_MODE);
    }
    options.open(path)
}

/// Downloads, verifies and installs one artifact.
#[derive(Debug, Clone)]
pub struct VerifiedInstaller<F: ArtifactFetcher> {
    fetcher: F,
    sanitizer: ArtifactSanitizer,
}

impl<F: ArtifactFetcher> VerifiedInstaller<F> {
    /// Create an installer with the default sanitizer.
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            sanitizer: ArtifactSanitizer::default(),
        }
    }

    /// Replace the sanitizer.
    pub fn with_sanitizer(mut self, sanitizer: ArtifactSanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    /// Download `url` to `destination`.
    ///
    /// An empty `expected_checksum` skips verification with a warning.
    /// On any failure the temp file is removed and `destination` is left as
    /// it was.
    pub fn install(
        &self,
        cancel: &CancellationToken,
        url: &str,
        expected_checksum: &str,
        destination: &Path,
        on_progress: Option<ProgressCallback>,
    ) -> ManagerResult<InstalledArtifact> {
        let stream = self.fetcher.open(url)?;

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ManagerError::CreateDirFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let temp = temp_path(destination);
        let mut file = create_temp_file(&temp).map_err(|source| ManagerError::WriteFailed {
            path: temp.clone(),
            source,
        })?;
        let mut guard = TempFileGuard::new(temp.clone());

        tracing::debug!(url, temp = %temp.display(), "Downloading artifact");
        let streamed = stream_to_file(cancel, url, stream, &mut file, &temp, on_progress.as_ref())?;
        drop(file);

        let checksum_verified = if expected_checksum.trim().is_empty() {
            tracing::warn!(url, "No checksum published, skipping verification");
            false
        } else if checksum_matches(expected_checksum, &streamed.sha256) {
            true
        } else {
            return Err(ManagerError::ChecksumMismatch {
                url: url.to_string(),
                expected: expected_checksum.trim().to_lowercase(),
                actual: streamed.sha256,
            });
        };

        let sanitized = self
            .sanitizer
            .sanitize(&temp)
            .map_err(|source| ManagerError::SanitizeFailed {
                path: temp.clone(),
                source,
            })?;

        fs::rename(&temp, destination).map_err(|source| ManagerError::RenameFailed {
            from: temp.clone(),
            to: destination.to_path_buf(),
            source,
        })?;
        guard.disarm();

        if let Err(source) = make_executable(destination) {
            let _ = fs::remove_file(destination);
            return Err(ManagerError::PermissionFailed {
                path: destination.to_path_buf(),
                source,
            });
        }

        tracing::debug!(
            path = %destination.display(),
            bytes = streamed.bytes,
            checksum_verified,
            sanitized,
            "Artifact installed"
        );

        Ok(InstalledArtifact {
            path: destination.to_path_buf(),
            bytes: streamed.bytes,
            sha256: streamed.sha256,
            blake3: streamed.blake3,
            checksum_verified,
            sanitized,
        })
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(INSTALLED_MODE))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Result of installing a package.
#[derive(Debug, Clone)]
pub struct InstallResult {
    /// The catalog entry that was installed.
    pub entry: CatalogEntry,
    /// The installed file.
    pub artifact: InstalledArtifact,
    /// Identity written to the ownership tag.
    pub identity: String,
}

/// Resolves, installs and tags packages in an install directory.
#[derive(Debug, Clone)]
pub struct PackageInstaller<F: ArtifactFetcher, S: OwnershipStore = XattrStore> {
    installer: VerifiedInstaller<F>,
    registry: OwnershipRegistry<S>,
    install_dir: PathBuf,
}

impl<F: ArtifactFetcher, S: OwnershipStore> PackageInstaller<F, S> {
    /// Create a package installer.
    pub fn new(
        installer: VerifiedInstaller<F>,
        registry: OwnershipRegistry<S>,
        install_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            installer,
            registry,
            install_dir: install_dir.into(),
        }
    }

    /// The install directory.
    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    /// The ownership registry.
    pub fn registry(&self) -> &OwnershipRegistry<S> {
        &self.registry
    }

    /// Resolve `request` against `catalogs` and install the winning entry.
    ///
    /// The file is tagged with the entry's identity and the BLAKE3 of the
    /// downloaded artifact. If tagging fails after the file is in place, the
    /// error is returned and the file stays installed but unmanaged.
    pub fn install(
        &self,
        cancel: &CancellationToken,
        request: &RequestDescriptor,
        catalogs: &CatalogSet,
        on_progress: Option<ProgressCallback>,
    ) -> ManagerResult<InstallResult> {
        let entry = resolve(request, catalogs)?;
        let destination = self.install_dir.join(entry.install_name());

        tracing::debug!(
            request = %request,
            package_id = %entry.package_id,
            url = %entry.download_url,
            "Resolved package"
        );

        let artifact = self.installer.install(
            cancel,
            &entry.download_url,
            entry.checksum(),
            &destination,
            on_progress,
        )?;

        let identity = entry.descriptor().to_string();
        self.registry.write_identity(&artifact.path, &identity)?;
        self.registry.write_content_hash(&artifact.path, &artifact.blake3)?;

        tracing::info!(
            identity = %identity,
            path = %artifact.path.display(),
            "Installed package"
        );

        Ok(InstallResult {
            entry,
            artifact,
            identity,
        })
    }
}
