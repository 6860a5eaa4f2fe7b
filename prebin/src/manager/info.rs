//! Catalog lookup for a single request, preferring what is installed.

use crate::config::InstallSettings;
use crate::package::{resolve, CatalogEntry, CatalogSet, RequestDescriptor};

use super::ownership::{OwnershipRegistry, OwnershipStore};
use super::{LocalBinaryStore, ManagerError, ManagerResult};

/// The descriptor actually looked up for `request`.
///
/// A bare name that is installed from a specific package is narrowed to
/// that package, so `info jq` describes the jq on disk rather than whichever
/// jq ranks highest today.
pub fn effective_request<S: OwnershipStore>(
    settings: &InstallSettings,
    registry: &OwnershipRegistry<S>,
    request: &RequestDescriptor,
) -> RequestDescriptor {
    if request.package_id.is_some() || settings.retake_ownership {
        return request.clone();
    }

    let path = LocalBinaryStore::new(&settings.directory).install_path(&request.name);
    let installed = registry.installed_descriptor(&path);
    match installed {
        Some(installed) if !installed.package_id().is_empty() => {
            tracing::debug!(request = %request, installed = %installed, "Using installed package");
            installed
        }
        _ => request.clone(),
    }
}

/// Look up the catalog entry describing `request`.
///
/// On failure the error names `request` as given, not the narrowed form.
pub fn get_info<S: OwnershipStore>(
    settings: &InstallSettings,
    registry: &OwnershipRegistry<S>,
    request: &RequestDescriptor,
    catalogs: &CatalogSet,
) -> ManagerResult<CatalogEntry> {
    let lookup = effective_request(settings, registry, request);
    resolve(&lookup, catalogs).map_err(|_| ManagerError::NotFound {
        request: request.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OwnershipBackend;
    use crate::manager::ownership::SidecarStore;
    use crate::package::parse_catalog;
    use std::fs;
    use tempfile::TempDir;

    const CATALOG: &str = r#"[
        {"pkg": "jq", "pkg_id": "org.jq", "version": "1.7", "rank": 9, "description": "upstream"},
        {"pkg": "jq", "pkg_id": "org.fork.jq", "version": "1.6", "rank": 2, "description": "fork"},
        {"pkg": "Baseutils/coreutils/ls", "pkg_id": "upstream", "rank": 9},
        {"pkg": "Baseutils/coreutils/ls", "pkg_id": "fork", "rank": 2}
    ]"#;

    fn setup() -> (TempDir, InstallSettings, OwnershipRegistry<SidecarStore>, CatalogSet) {
        let temp = TempDir::new().unwrap();
        let settings = InstallSettings {
            directory: temp.path().join("bin"),
            retake_ownership: false,
            ownership: OwnershipBackend::Sidecar,
            sidecar_dir: temp.path().join("tags"),
        };
        fs::create_dir_all(&settings.directory).unwrap();
        let registry = OwnershipRegistry::sidecar(&settings.sidecar_dir);
        let catalogs = std::iter::once(parse_catalog("Toolpacks", CATALOG).unwrap()).collect();
        (temp, settings, registry, catalogs)
    }

    fn install_fork(settings: &InstallSettings, registry: &OwnershipRegistry<SidecarStore>) {
        let path = settings.directory.join("jq");
        fs::write(&path, b"binary").unwrap();
        registry.write_identity(&path, "jq#org.fork.jq@1.6").unwrap();
    }

    #[test]
    fn test_not_installed_uses_highest_rank() {
        let (_temp, settings, registry, catalogs) = setup();
        let entry = get_info(&settings, &registry, &RequestDescriptor::new("jq"), &catalogs)
            .unwrap();
        assert_eq!(entry.description, "upstream");
    }

    #[test]
    fn test_installed_package_preferred() {
        let (_temp, settings, registry, catalogs) = setup();
        install_fork(&settings, &registry);

        let entry = get_info(&settings, &registry, &RequestDescriptor::new("jq"), &catalogs)
            .unwrap();
        assert_eq!(entry.package_id, "org.fork.jq");
    }

    #[test]
    fn test_installed_path_qualified_package_preferred() {
        let (_temp, settings, registry, catalogs) = setup();
        let path = settings.directory.join("ls");
        fs::write(&path, b"binary").unwrap();
        registry
            .write_identity(&path, "Baseutils/coreutils/ls#fork")
            .unwrap();

        let request = RequestDescriptor::new("Baseutils/coreutils/ls");
        let entry = get_info(&settings, &registry, &request, &catalogs).unwrap();
        assert_eq!(entry.package_id, "fork");
    }

    #[test]
    fn test_explicit_package_id_wins() {
        let (_temp, settings, registry, catalogs) = setup();
        install_fork(&settings, &registry);

        let request = RequestDescriptor::new("jq").with_package_id("org.jq");
        let entry = get_info(&settings, &registry, &request, &catalogs).unwrap();
        assert_eq!(entry.package_id, "org.jq");
    }

    #[test]
    fn test_retake_ignores_installed_tag() {
        let (_temp, mut settings, registry, catalogs) = setup();
        install_fork(&settings, &registry);
        settings.retake_ownership = true;

        let entry = get_info(&settings, &registry, &RequestDescriptor::new("jq"), &catalogs)
            .unwrap();
        assert_eq!(entry.package_id, "org.jq");
    }

    #[test]
    fn test_error_names_original_request() {
        let (_temp, settings, registry, _catalogs) = setup();
        install_fork(&settings, &registry);

        let err = get_info(
            &settings,
            &registry,
            &RequestDescriptor::new("jq"),
            &CatalogSet::new(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "'jq' not found in any of the catalogs");
    }
}
