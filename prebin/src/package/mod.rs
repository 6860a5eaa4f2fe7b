//! Package catalogs, request descriptors and resolution.
//!
//! This module holds the data side of prebin: what a request looks like,
//! how catalog records are decoded, and how a request is matched to a single
//! catalog entry.
//!
//! # Overview
//!
//! - **Descriptor**: `name[#package_id][@version]`, used both for user
//!   requests and for the ownership tag on installed files
//! - **Entry**: one artifact from a catalog, decoded tolerantly from JSON
//! - **Catalog**: the records of one source; a [`CatalogSet`] orders sources
//! - **Matcher**: filters records by name/package id and picks the highest
//!   rank with a stable tie-break
//!
//! Nothing in here touches the network or the filesystem; see
//! [`manager`](crate::manager) for that.

mod catalog;
mod descriptor;
mod entry;
mod matcher;

pub use catalog::{parse_catalog, Catalog, CatalogParseError, CatalogSet, CatalogSource};
pub use descriptor::{DescriptorError, RequestDescriptor};
pub use entry::{install_name, rank_of, CatalogEntry, CatalogRecord};
pub use matcher::{find_matches, matches, resolve, Candidate, MatchSet, ResolveError};
