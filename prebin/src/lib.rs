//! prebin - installer for prebuilt static binaries
//!
//! This library resolves requests like `jq` or `jq#github.com.jqlang.jq` against
//! published JSON catalogs, installs the winning artifact after verifying its
//! checksum, and tags the installed file with the identity of the entry it
//! came from.
//!
//! # Modules
//!
//! - [`package`] - Catalog model, request descriptors and the matcher
//! - [`manager`] - Fetching, installing, ownership tags, validation
//! - [`config`] - `~/.prebin/config.ini`
//! - [`logging`] - Tracing setup
//!
//! ```ignore
//! use prebin::config::ConfigFile;
//! use prebin::manager::{fetch_catalogs, get_info, HttpCatalogClient, OwnershipRegistry};
//!
//! let config = ConfigFile::load()?;
//! let catalogs = fetch_catalogs(&HttpCatalogClient::new(), &config.catalogs.sources)?;
//! let entry = get_info(&config.install, &OwnershipRegistry::xattr(), &"jq".parse()?, &catalogs)?;
//! println!("{} {}", entry.name, entry.version);
//! ```

pub mod config;
pub mod logging;
pub mod manager;
pub mod package;

/// Version of the prebin library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
