//! Installing, inspecting and validating prebuilt binaries.
//!
//! This module builds on the [`package`](crate::package) model: it fetches
//! catalogs, installs the entry a request resolves to, and keeps track of
//! which files in the install directory it owns.
//!
//! # Overview
//!
//! - Fetching catalogs with mirror fallback, optionally cached
//! - Downloading artifacts with streaming SHA-256 verification, progress
//!   reporting and cancellation
//! - Sanitizing build-store paths and moving artifacts into place atomically
//! - Tagging installed files with the identity of their catalog entry and
//!   the hash of the artifact they came from
//! - Validating, describing and update-checking installed binaries
//!
//! # Architecture
//!
//! The manager uses trait-based abstractions for testability:
//!
//! - [`CatalogClient`] - Fetches catalogs
//! - [`ArtifactFetcher`] - Opens artifact downloads
//! - [`OwnershipStore`] - Persists ownership tags (xattr or sidecar files)
//!
//! # Example
//!
//! ```ignore
//! use prebin::manager::{
//!     fetch_catalogs, HttpCatalogClient, OwnershipRegistry, PackageInstaller, VerifiedInstaller,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! let client = HttpCatalogClient::new();
//! let catalogs = fetch_catalogs(&client, &config.catalogs.sources)?;
//! let installer = PackageInstaller::new(
//!     VerifiedInstaller::new(client),
//!     OwnershipRegistry::xattr(),
//!     &config.install.directory,
//! );
//! installer.install(&CancellationToken::new(), &"jq".parse()?, &catalogs, None)?;
//! ```

mod cache;
mod client;
mod download;
mod error;
mod info;
mod installer;
mod local;
mod ownership;
mod sanitize;
mod traits;
mod updates;
mod validate;

pub use cache::{CachedCatalogClient, DEFAULT_TTL_SECS};
pub use client::{fetch_catalogs, HttpCatalogClient, DEFAULT_TIMEOUT_SECS};
pub use download::{checksum_matches, stream_to_file, StreamedArtifact, CHUNK_SIZE};
pub use error::{ManagerError, ManagerResult};
pub use info::{effective_request, get_info};
pub use installer::{
    temp_path, InstallResult, InstalledArtifact, PackageInstaller, VerifiedInstaller,
};
pub use local::{InstalledBinary, LocalBinaryStore};
pub use ownership::{
    is_symlink, registry_for, OwnershipError, OwnershipRegistry, OwnershipStore, SidecarStore, Tag,
    XattrStore, CONTENT_HASH_ATTRIBUTE, IDENTITY_ATTRIBUTE,
};
pub use sanitize::{sanitize, ArtifactSanitizer, DEFAULT_STORE_ROOT};
pub use traits::{ArtifactFetcher, ArtifactStream, CatalogClient, ProgressCallback};
pub use updates::{calculate_blake3, BinaryInfo, BinaryStatus, UpdateChecker};
pub use validate::{validate_programs, Validator};
