//! Which installed binaries are still published by a catalog.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::InstallSettings;
use crate::package::{CatalogSource, RequestDescriptor};

use super::client::fetch_catalogs;
use super::ownership::{base_name, is_symlink, OwnershipRegistry, OwnershipStore};
use super::traits::CatalogClient;
use super::{LocalBinaryStore, ManagerResult};

/// Checks installed binaries against the remote identity list.
pub struct Validator<'a, S: OwnershipStore> {
    settings: &'a InstallSettings,
    registry: &'a OwnershipRegistry<S>,
}

impl<'a, S: OwnershipStore> Validator<'a, S> {
    pub fn new(settings: &'a InstallSettings, registry: &'a OwnershipRegistry<S>) -> Self {
        Self { settings, registry }
    }

    /// Identities of the requested (or all) installed binaries that denote a
    /// package in `remote_names`.
    ///
    /// Without requested names every non-directory entry of the install
    /// directory is checked in file name order. Requested names are checked
    /// once each, in the order first given. Symlinks never validate, and a
    /// file whose identity cannot be read is skipped.
    pub fn validate(
        &self,
        remote_names: &[String],
        requested: &[String],
    ) -> ManagerResult<Vec<String>> {
        let remote: Vec<RequestDescriptor> = remote_names
            .iter()
            .filter_map(|name| name.parse().ok())
            .collect();

        let store = LocalBinaryStore::new(&self.settings.directory);
        let candidates: Vec<(PathBuf, String)> = if requested.is_empty() {
            store
                .list_files()?
                .into_iter()
                .map(|path| {
                    let name = base_name(&path);
                    (path, name)
                })
                .collect()
        } else {
            dedup(requested)
                .into_iter()
                .map(|name| (store.install_path(name), name.to_string()))
                .collect()
        };

        let valid: Vec<String> = candidates
            .iter()
            .filter_map(|(path, name)| self.resolved_identity(path, name))
            .filter(|identity| is_published(identity, &remote))
            .collect();

        tracing::debug!(
            candidates = candidates.len(),
            valid = valid.len(),
            "Validated installed binaries"
        );
        Ok(valid)
    }

    /// Identity of the binary at `path`, found under `name`.
    ///
    /// A file that is not there, or any file when ownership is retaken, is
    /// known only by `name`.
    fn resolved_identity(&self, path: &Path, name: &str) -> Option<String> {
        if is_symlink(path) {
            return None;
        }

        if self.settings.retake_ownership || !path.exists() {
            return (!name.is_empty()).then(|| name.to_string());
        }

        match self.registry.read_identity(path) {
            Ok(identity) => Some(identity),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Skipping binary without identity");
                None
            }
        }
    }
}

fn is_published(identity: &str, remote: &[RequestDescriptor]) -> bool {
    match identity.parse::<RequestDescriptor>() {
        Ok(installed) => remote.iter().any(|r| r.same_package(&installed)),
        Err(_) => false,
    }
}

/// Drop repeated names, keeping the first occurrence.
fn dedup(names: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(String::as_str)
        .filter(|name| seen.insert(*name))
        .collect()
}

/// Fetch the catalogs, then validate against their identities.
pub fn validate_programs<C, S>(
    client: &C,
    sources: &[CatalogSource],
    settings: &InstallSettings,
    registry: &OwnershipRegistry<S>,
    requested: &[String],
) -> ManagerResult<Vec<String>>
where
    C: CatalogClient + ?Sized,
    S: OwnershipStore,
{
    let remote_names = fetch_catalogs(client, sources)?.identities();
    Validator::new(settings, registry).validate(&remote_names, requested)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OwnershipBackend;
    use crate::manager::ownership::SidecarStore;
    use crate::manager::ManagerError;
    use crate::package::Catalog;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        settings: InstallSettings,
        registry: OwnershipRegistry<SidecarStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let settings = InstallSettings {
                directory: temp.path().join("bin"),
                retake_ownership: false,
                ownership: OwnershipBackend::Sidecar,
                sidecar_dir: temp.path().join("tags"),
            };
            fs::create_dir_all(&settings.directory).unwrap();
            let registry = OwnershipRegistry::sidecar(&settings.sidecar_dir);
            Self {
                _temp: temp,
                settings,
                registry,
            }
        }

        fn install(&self, name: &str, identity: Option<&str>) {
            let path = LocalBinaryStore::new(&self.settings.directory).install_path(name);
            fs::write(&path, b"binary").unwrap();
            if let Some(identity) = identity {
                self.registry.write_identity(&path, identity).unwrap();
            }
        }

        fn validate(&self, remote: &[&str], requested: &[&str]) -> Vec<String> {
            let remote: Vec<String> = remote.iter().map(|s| s.to_string()).collect();
            let requested: Vec<String> = requested.iter().map(|s| s.to_string()).collect();
            Validator::new(&self.settings, &self.registry)
                .validate(&remote, &requested)
                .unwrap()
        }
    }

    #[test]
    fn test_unpublished_package_excluded() {
        let fx = Fixture::new();
        fx.install("legacy", Some("legacy#org.legacy@1.0"));

        assert!(fx.validate(&["jq#org.jq@1.7"], &[]).is_empty());
    }

    #[test]
    fn test_all_files_checked_in_name_order() {
        let fx = Fixture::new();
        fx.install("zstd", Some("zstd#org.zstd@1.5"));
        fx.install("jq", Some("jq#org.jq@1.6"));
        fx.install("unmanaged", None);
        fs::create_dir(fx.settings.directory.join("lib")).unwrap();

        let valid = fx.validate(&["jq#org.jq@1.7", "zstd#org.zstd@1.5", "unmanaged"], &[]);
        assert_eq!(valid, vec!["jq#org.jq@1.6", "zstd#org.zstd@1.5"]);
    }

    #[test]
    fn test_package_id_must_match() {
        let fx = Fixture::new();
        fx.install("jq", Some("jq#org.fork.jq"));

        assert!(fx.validate(&["jq#org.jq"], &[]).is_empty());
        assert_eq!(fx.validate(&["jq"], &[]), vec!["jq#org.fork.jq"]);
    }

    #[test]
    fn test_requested_deduplicated_in_order() {
        let fx = Fixture::new();
        fx.install("jq", Some("jq#org.jq"));
        fx.install("fd", Some("fd#org.fd"));

        let valid = fx.validate(&["jq#org.jq", "fd#org.fd"], &["jq", "fd", "jq"]);
        assert_eq!(valid, vec!["jq#org.jq", "fd#org.fd"]);
    }

    #[test]
    fn test_requested_missing_file_uses_name() {
        let fx = Fixture::new();
        assert_eq!(fx.validate(&["bat#org.bat"], &["bat"]), vec!["bat"]);
        assert!(fx.validate(&["bat#org.bat"], &["nope"]).is_empty());
    }

    #[test]
    fn test_requested_path_qualified_name() {
        let fx = Fixture::new();
        fx.install("Baseutils/coreutils/ls", Some("Baseutils/coreutils/ls#fork"));

        let remote = ["Baseutils/coreutils/ls#upstream", "Baseutils/coreutils/ls#fork"];
        assert_eq!(
            fx.validate(&remote, &["Baseutils/coreutils/ls"]),
            vec!["Baseutils/coreutils/ls#fork"]
        );
        assert_eq!(fx.validate(&remote, &[]), vec!["Baseutils/coreutils/ls#fork"]);
    }

    #[test]
    fn test_requested_missing_path_qualified_name_kept_whole() {
        let fx = Fixture::new();
        assert_eq!(
            fx.validate(&["Baseutils/wrapper#x"], &["Baseutils/wrapper"]),
            vec!["Baseutils/wrapper"]
        );
    }

    #[test]
    fn test_retake_ownership_uses_base_name() {
        let mut fx = Fixture::new();
        fx.install("jq", Some("jq#org.fork.jq"));
        fx.install("fd", None);
        fx.settings.retake_ownership = true;

        let valid = fx.validate(&["jq#org.jq", "fd#org.fd"], &[]);
        assert_eq!(valid, vec!["fd", "jq"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_excluded() {
        let mut fx = Fixture::new();
        fx.install("busybox", Some("busybox#org.busybox"));
        std::os::unix::fs::symlink(
            fx.settings.directory.join("busybox"),
            fx.settings.directory.join("ls"),
        )
        .unwrap();

        let remote = ["busybox#org.busybox", "ls"];
        assert_eq!(fx.validate(&remote, &[]), vec!["busybox#org.busybox"]);

        fx.settings.retake_ownership = true;
        assert_eq!(fx.validate(&remote, &[]), vec!["busybox"]);
    }

    #[test]
    fn test_missing_install_dir_is_empty() {
        let fx = Fixture::new();
        fs::remove_dir_all(&fx.settings.directory).unwrap();
        assert!(fx.validate(&["jq"], &[]).is_empty());
    }

    struct StaticClient(&'static str);

    impl CatalogClient for StaticClient {
        fn fetch_catalog(&self, source: &CatalogSource) -> ManagerResult<Catalog> {
            crate::package::parse_catalog(&source.label, self.0).map_err(|e| {
                ManagerError::CatalogParseFailed {
                    label: source.label.clone(),
                    url: source.url.clone(),
                    reason: e.to_string(),
                }
            })
        }
    }

    #[test]
    fn test_validate_programs_uses_catalog_identities() {
        let fx = Fixture::new();
        fx.install("jq", Some("jq#org.jq@1.6"));
        fx.install("gone", Some("gone#org.gone"));

        let client = StaticClient(r#"[{"pkg": "jq", "pkg_id": "org.jq", "version": "1.7"}]"#);
        let sources = vec![CatalogSource::new("Toolpacks", "mock://catalog")];
        let valid =
            validate_programs(&client, &sources, &fx.settings, &fx.registry, &[]).unwrap();

        assert_eq!(valid, vec!["jq#org.jq@1.6"]);
    }

    #[test]
    fn test_validate_programs_propagates_fetch_failure() {
        let fx = Fixture::new();
        let client = StaticClient("not json");
        let sources = vec![CatalogSource::new("Toolpacks", "mock://catalog")];

        let result = validate_programs(&client, &sources, &fx.settings, &fx.registry, &[]);
        assert!(matches!(result, Err(ManagerError::CatalogParseFailed { .. })));
    }
}
