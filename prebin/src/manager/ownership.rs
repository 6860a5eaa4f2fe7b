//! Ownership tags on installed binaries.
//!
//! Each binary installed by prebin carries an identity string naming the
//! catalog entry it came from (see [`RequestDescriptor`]). The tag is the
//! only persistent install state: there is no separate manifest. A file
//! without a tag is unmanaged (or predates ownership tracking) and callers
//! branch on that explicitly.
//!
//! Next to the identity, the BLAKE3 hash of the artifact as downloaded is
//! recorded. Sanitizing rewrites scripts after verification, so the file on
//! disk no longer hashes to what the catalog publishes.
//!
//! Tags live in extended attributes by default. Filesystems without user
//! attributes can use [`SidecarStore`], which keeps small files per binary
//! in a directory outside the install directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::{InstallSettings, OwnershipBackend};
use crate::package::{DescriptorError, RequestDescriptor};

/// Extended attribute holding the identity string.
pub const IDENTITY_ATTRIBUTE: &str = "user.FullName";

/// Extended attribute holding the downloaded artifact's BLAKE3 hash.
pub const CONTENT_HASH_ATTRIBUTE: &str = "user.prebin.b3sum";

/// Sidecar subdirectory holding content hashes.
const CONTENT_HASH_DIR: &str = ".b3sum";

/// Kinds of tag kept per installed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// Encoded [`RequestDescriptor`] of the catalog entry.
    Identity,
    /// BLAKE3 of the artifact before sanitizing.
    ContentHash,
}

/// Ownership tag errors.
#[derive(Debug, Error)]
pub enum OwnershipError {
    /// The file exists but carries no identity.
    #[error("full name attribute not found for binary: {path}")]
    AttributeNotFound { path: PathBuf },

    /// Reading the identity failed.
    #[error("failed to read ownership tag of {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing the identity failed.
    #[error("failed to set ownership tag for {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Backend that persists tags for files.
pub trait OwnershipStore: Send + Sync {
    /// Read a stored tag, `None` when there is none.
    fn get(&self, path: &Path, tag: Tag) -> io::Result<Option<String>>;

    /// Store a tag, replacing any previous value.
    fn set(&self, path: &Path, tag: Tag, value: &str) -> io::Result<()>;
}

impl<S: OwnershipStore + ?Sized> OwnershipStore for Box<S> {
    fn get(&self, path: &Path, tag: Tag) -> io::Result<Option<String>> {
        (**self).get(path, tag)
    }

    fn set(&self, path: &Path, tag: Tag, value: &str) -> io::Result<()> {
        (**self).set(path, tag, value)
    }
}

/// Tags stored in extended file attributes.
#[derive(Debug, Clone)]
pub struct XattrStore {
    attribute: String,
}

impl Default for XattrStore {
    fn default() -> Self {
        Self::new()
    }
}

impl XattrStore {
    /// Store using [`IDENTITY_ATTRIBUTE`].
    pub fn new() -> Self {
        Self::with_attribute(IDENTITY_ATTRIBUTE)
    }

    /// Store the identity under a custom attribute name.
    pub fn with_attribute(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
        }
    }

    /// The identity attribute name in use.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    fn attribute_for(&self, tag: Tag) -> &str {
        match tag {
            Tag::Identity => &self.attribute,
            Tag::ContentHash => CONTENT_HASH_ATTRIBUTE,
        }
    }
}

impl OwnershipStore for XattrStore {
    fn get(&self, path: &Path, tag: Tag) -> io::Result<Option<String>> {
        let value = xattr::get(path, self.attribute_for(tag))?;
        Ok(value.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn set(&self, path: &Path, tag: Tag, value: &str) -> io::Result<()> {
        xattr::set(path, self.attribute_for(tag), value.as_bytes())
    }
}

/// Tags stored in sidecar files named after the binary.
///
/// Identities sit directly in the directory, content hashes in its
/// `.b3sum` subdirectory.
#[derive(Debug, Clone)]
pub struct SidecarStore {
    dir: PathBuf,
}

impl SidecarStore {
    /// Keep sidecar files in `dir`. It must not be the install directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the sidecar files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn tag_dir(&self, tag: Tag) -> PathBuf {
        match tag {
            Tag::Identity => self.dir.clone(),
            Tag::ContentHash => self.dir.join(CONTENT_HASH_DIR),
        }
    }

    /// File holding `tag` for the binary at `path`.
    pub fn sidecar_path(&self, path: &Path, tag: Tag) -> PathBuf {
        self.tag_dir(tag).join(base_name(path))
    }
}

impl OwnershipStore for SidecarStore {
    fn get(&self, path: &Path, tag: Tag) -> io::Result<Option<String>> {
        match fs::read_to_string(self.sidecar_path(path, tag)) {
            Ok(content) => Ok(Some(content.trim_end_matches('\n').to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&self, path: &Path, tag: Tag, value: &str) -> io::Result<()> {
        fs::create_dir_all(self.tag_dir(tag))?;
        fs::write(self.sidecar_path(path, tag), format!("{}\n", value))
    }
}

/// Reads and writes ownership tags.
#[derive(Debug, Clone, Default)]
pub struct OwnershipRegistry<S: OwnershipStore = XattrStore> {
    store: S,
}

impl OwnershipRegistry<XattrStore> {
    /// Registry backed by extended attributes.
    pub fn xattr() -> Self {
        Self::new(XattrStore::new())
    }
}

impl OwnershipRegistry<SidecarStore> {
    /// Registry backed by sidecar files in `dir`.
    pub fn sidecar(dir: impl Into<PathBuf>) -> Self {
        Self::new(SidecarStore::new(dir))
    }
}

impl<S: OwnershipStore> OwnershipRegistry<S> {
    /// Create a registry over a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read the identity of `path`.
    ///
    /// A path that does not exist yields its base name: it is a bare
    /// reference to something not (yet) installed, not an error.
    pub fn read_identity(&self, path: &Path) -> Result<String, OwnershipError> {
        if !path.exists() {
            return Ok(base_name(path));
        }

        match self.store.get(path, Tag::Identity) {
            Ok(Some(identity)) if !identity.is_empty() => Ok(identity),
            Ok(_) => Err(OwnershipError::AttributeNotFound {
                path: path.to_path_buf(),
            }),
            Err(source) => Err(OwnershipError::ReadFailed {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Tag `path` with `identity`.
    ///
    /// Only call this on a file that is fully in place, never on a
    /// download in progress.
    pub fn write_identity(&self, path: &Path, identity: &str) -> Result<(), OwnershipError> {
        self.store
            .set(path, Tag::Identity, identity)
            .map_err(|source| OwnershipError::WriteFailed {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(path = %path.display(), identity, "Wrote ownership tag");
        Ok(())
    }

    /// Recorded BLAKE3 of the artifact `path` was installed from.
    ///
    /// `None` for files installed without one.
    pub fn read_content_hash(&self, path: &Path) -> Result<Option<String>, OwnershipError> {
        match self.store.get(path, Tag::ContentHash) {
            Ok(hash) => Ok(hash.filter(|hash| !hash.is_empty())),
            Err(source) => Err(OwnershipError::ReadFailed {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Record the BLAKE3 of the artifact installed at `path`.
    pub fn write_content_hash(&self, path: &Path, hash: &str) -> Result<(), OwnershipError> {
        self.store
            .set(path, Tag::ContentHash, hash)
            .map_err(|source| OwnershipError::WriteFailed {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Decode an identity string into a descriptor.
    pub fn decode_as_request(identity: &str) -> Result<RequestDescriptor, DescriptorError> {
        identity.parse()
    }

    /// Descriptor of the binary installed at `path`.
    ///
    /// `None` for missing files, symlinks, untagged files and tags that do
    /// not decode.
    pub fn installed_descriptor(&self, path: &Path) -> Option<RequestDescriptor> {
        if is_symlink(path) || !path.exists() {
            return None;
        }
        let identity = self.read_identity(path).ok()?;
        Self::decode_as_request(&identity).ok()
    }
}

/// Registry over the backend selected in `settings`.
pub fn registry_for(settings: &InstallSettings) -> OwnershipRegistry<Box<dyn OwnershipStore>> {
    let store: Box<dyn OwnershipStore> = match settings.ownership {
        OwnershipBackend::Xattr => Box::new(XattrStore::new()),
        OwnershipBackend::Sidecar => Box::new(SidecarStore::new(settings.sidecar_dir.clone())),
    };
    OwnershipRegistry::new(store)
}

/// Whether `path` itself is a symlink.
///
/// Symlinks alias an owned file elsewhere and are never owned themselves.
pub fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false)
}

/// Final path component as a string.
pub(crate) fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
