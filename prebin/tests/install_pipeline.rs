//! End-to-end tests for the install pipeline over a local HTTP server.
//!
//! These tests exercise the complete flow:
//! - Catalog fetch (with mirror fallback) → resolve → download → verify
//! - Sanitize → atomic rename → ownership tag
//! - Validation, info lookup and update checks against the installed result
//!
//! Run with: `cargo test --test install_pipeline`

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use httpmock::prelude::*;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use prebin::config::{InstallSettings, OwnershipBackend};
use prebin::manager::{
    fetch_catalogs, get_info, temp_path, validate_programs, BinaryStatus, HttpCatalogClient,
    LocalBinaryStore, ManagerError, OwnershipRegistry, PackageInstaller, ProgressCallback,
    SidecarStore, UpdateChecker, VerifiedInstaller,
};
use prebin::package::{CatalogSource, RequestDescriptor};

// ============================================================================
// Test Helpers
// ============================================================================

const JQ_BODY: &[u8] = b"\x7fELF-pretend-jq-binary";

fn sha256_hex(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    format!("{:x}", Sha256::digest(data))
}

struct Env {
    _temp: TempDir,
    server: MockServer,
    settings: InstallSettings,
    registry: OwnershipRegistry<SidecarStore>,
}

impl Env {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let settings = InstallSettings {
            directory: temp.path().join("bin"),
            retake_ownership: false,
            ownership: OwnershipBackend::Sidecar,
            sidecar_dir: temp.path().join("ownership"),
        };
        let registry = OwnershipRegistry::sidecar(&settings.sidecar_dir);
        Self {
            _temp: temp,
            server: MockServer::start(),
            settings,
            registry,
        }
    }

    /// Serve a catalog listing jq twice (ranks 1 and 5) plus a script.
    fn serve_catalog(&self, path: &str, jq_checksum: &str) {
        let catalog = format!(
            r#"[
                {{"pkg": "jq", "pkg_id": "old.jq", "rank": 1, "version": "1.5",
                  "download_url": "{old}", "shasum": ""}},
                {{"pkg": "jq", "pkg_id": "github.com.jqlang.jq", "rank": 5, "version": "1.7.1",
                  "download_url": "{jq}", "shasum": "{sum}"}},
                {{"pkg": "Baseutils/wrapper", "pkg_id": "org.wrapper", "rank": "2",
                  "download_url": "{wrapper}"}}
            ]"#,
            old = self.server.url("/bin/old-jq"),
            jq = self.server.url("/bin/jq"),
            sum = jq_checksum,
            wrapper = self.server.url("/bin/wrapper"),
        );
        self.server.mock(|when, then| {
            when.method(GET).path(path.to_string());
            then.status(200).body(catalog);
        });
    }

    fn sources(&self, path: &str) -> Vec<CatalogSource> {
        vec![CatalogSource::new("Toolpacks", self.server.url(path))]
    }

    fn installer(&self) -> PackageInstaller<HttpCatalogClient, SidecarStore> {
        PackageInstaller::new(
            VerifiedInstaller::new(HttpCatalogClient::new()),
            self.registry.clone(),
            &self.settings.directory,
        )
    }

    fn install_path(&self, name: &str) -> std::path::PathBuf {
        self.settings.directory.join(name)
    }
}

fn assert_no_temp(path: &Path) {
    assert!(
        !temp_path(path).exists(),
        "temp file {} should have been removed",
        temp_path(path).display()
    );
}

// ============================================================================
// Install
// ============================================================================

#[test]
fn test_install_highest_rank_and_tag() {
    let env = Env::new();
    env.serve_catalog("/METADATA.json", &sha256_hex(JQ_BODY).to_uppercase());
    let download = env.server.mock(|when, then| {
        when.method(GET)
            .path("/bin/jq")
            .header("cache-control", "no-cache, no-store, must-revalidate");
        then.status(200).body(JQ_BODY);
    });

    let client = HttpCatalogClient::new();
    let catalogs = fetch_catalogs(&client, &env.sources("/METADATA.json")).unwrap();

    let progress = Arc::new(AtomicU64::new(0));
    let progress_clone = progress.clone();
    let on_progress: ProgressCallback = Box::new(move |downloaded, _total| {
        progress_clone.store(downloaded, Ordering::SeqCst);
    });

    let result = env
        .installer()
        .install(
            &CancellationToken::new(),
            &RequestDescriptor::new("jq"),
            &catalogs,
            Some(on_progress),
        )
        .unwrap();

    download.assert();
    let jq = env.install_path("jq");
    assert_eq!(result.artifact.path, jq);
    assert!(result.artifact.checksum_verified);
    assert_eq!(result.artifact.bytes, JQ_BODY.len() as u64);
    assert_eq!(progress.load(Ordering::SeqCst), JQ_BODY.len() as u64);
    assert_eq!(fs::read(&jq).unwrap(), JQ_BODY);
    assert_no_temp(&jq);

    let identity = env.registry.read_identity(&jq).unwrap();
    assert_eq!(identity, "jq#github.com.jqlang.jq@1.7.1");
    assert_eq!(
        env.registry.installed_descriptor(&jq),
        Some(
            RequestDescriptor::new("jq")
                .with_package_id("github.com.jqlang.jq")
                .with_version("1.7.1")
        )
    );

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&jq).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}

#[test]
fn test_checksum_mismatch_leaves_nothing_behind() {
    let env = Env::new();
    env.serve_catalog("/METADATA.json", &sha256_hex(b"something else"));
    env.server.mock(|when, then| {
        when.method(GET).path("/bin/jq");
        then.status(200).body(JQ_BODY);
    });

    let catalogs =
        fetch_catalogs(&HttpCatalogClient::new(), &env.sources("/METADATA.json")).unwrap();
    let result = env.installer().install(
        &CancellationToken::new(),
        &RequestDescriptor::new("jq"),
        &catalogs,
        None,
    );

    match result {
        Err(ManagerError::ChecksumMismatch { actual, .. }) => {
            assert_eq!(actual, sha256_hex(JQ_BODY))
        }
        other => panic!("expected ChecksumMismatch, got {:?}", other),
    }
    let jq = env.install_path("jq");
    assert!(!jq.exists());
    assert_no_temp(&jq);
}

#[test]
fn test_cancelled_install_leaves_nothing_behind() {
    let env = Env::new();
    env.serve_catalog("/METADATA.json", &sha256_hex(JQ_BODY));
    env.server.mock(|when, then| {
        when.method(GET).path("/bin/jq");
        then.status(200).body(vec![0u8; 64 * 1024]);
    });

    let catalogs =
        fetch_catalogs(&HttpCatalogClient::new(), &env.sources("/METADATA.json")).unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let on_progress: ProgressCallback = Box::new(move |_, _| trigger.cancel());

    let result = env.installer().install(
        &cancel,
        &RequestDescriptor::new("jq"),
        &catalogs,
        Some(on_progress),
    );

    assert!(matches!(result, Err(ManagerError::Cancelled { .. })));
    let jq = env.install_path("jq");
    assert!(!jq.exists());
    assert_no_temp(&jq);
}

#[test]
fn test_missing_checksum_installs_unverified() {
    let env = Env::new();
    env.serve_catalog("/METADATA.json", "");
    env.server.mock(|when, then| {
        when.method(GET).path("/bin/old-jq");
        then.status(200).body(JQ_BODY);
    });

    let catalogs =
        fetch_catalogs(&HttpCatalogClient::new(), &env.sources("/METADATA.json")).unwrap();
    let request = RequestDescriptor::new("jq").with_package_id("old.jq");
    let result = env
        .installer()
        .install(&CancellationToken::new(), &request, &catalogs, None)
        .unwrap();

    assert!(!result.artifact.checksum_verified);
    assert_eq!(result.identity, "jq#old.jq@1.5");
}

#[test]
fn test_script_sanitized_and_installed_under_base_name() {
    let env = Env::new();
    env.serve_catalog("/METADATA.json", "");
    env.server.mock(|when, then| {
        when.method(GET).path("/bin/wrapper");
        then.status(200)
            .body("#!/nix/store/abc123xyz-bash/bin/bash\nexec /nix/store/abc123xyz-grep/bin/grep \"$@\"\n");
    });

    let catalogs =
        fetch_catalogs(&HttpCatalogClient::new(), &env.sources("/METADATA.json")).unwrap();
    let result = env
        .installer()
        .install(
            &CancellationToken::new(),
            &RequestDescriptor::new("Baseutils/wrapper"),
            &catalogs,
            None,
        )
        .unwrap();

    let wrapper = env.install_path("wrapper");
    assert_eq!(result.artifact.path, wrapper);
    assert_eq!(
        fs::read_to_string(&wrapper).unwrap(),
        "#!/bin/bash\nexec grep \"$@\"\n"
    );
}

#[test]
fn test_unknown_request_not_found() {
    let env = Env::new();
    env.serve_catalog("/METADATA.json", "");

    let catalogs =
        fetch_catalogs(&HttpCatalogClient::new(), &env.sources("/METADATA.json")).unwrap();
    let err = env
        .installer()
        .install(
            &CancellationToken::new(),
            &RequestDescriptor::new("doesnotexist"),
            &catalogs,
            None,
        )
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "'doesnotexist' not found in any of the catalogs"
    );
}

// ============================================================================
// Catalog fallback
// ============================================================================

#[test]
fn test_catalog_fallback_then_install() {
    let env = Env::new();
    let primary = env.server.mock(|when, then| {
        when.method(GET).path("/primary/METADATA.json");
        then.status(502);
    });
    env.serve_catalog("/mirror/METADATA.json", &sha256_hex(JQ_BODY));
    env.server.mock(|when, then| {
        when.method(GET).path("/bin/jq");
        then.status(200).body(JQ_BODY);
    });

    let sources = vec![
        CatalogSource::new("Toolpacks", env.server.url("/primary/METADATA.json"))
            .with_fallback(env.server.url("/mirror/METADATA.json")),
    ];
    let catalogs = fetch_catalogs(&HttpCatalogClient::new(), &sources).unwrap();
    primary.assert();

    env.installer()
        .install(
            &CancellationToken::new(),
            &RequestDescriptor::new("jq"),
            &catalogs,
            None,
        )
        .unwrap();
    assert!(env.install_path("jq").exists());
}

// ============================================================================
// Validation / info
// ============================================================================

#[test]
fn test_validate_excludes_unpublished_package() {
    let env = Env::new();
    env.serve_catalog("/METADATA.json", "");

    fs::create_dir_all(&env.settings.directory).unwrap();
    let legacy = env.install_path("legacy");
    fs::write(&legacy, b"binary").unwrap();
    env.registry
        .write_identity(&legacy, "legacy#org.legacy@0.1")
        .unwrap();

    let valid = validate_programs(
        &HttpCatalogClient::new(),
        &env.sources("/METADATA.json"),
        &env.settings,
        &env.registry,
        &[],
    )
    .unwrap();
    assert!(valid.is_empty());
}

#[test]
fn test_validate_and_info_after_install() {
    let env = Env::new();
    env.serve_catalog("/METADATA.json", "");
    env.server.mock(|when, then| {
        when.method(GET).path("/bin/old-jq");
        then.status(200).body(JQ_BODY);
    });

    let client = HttpCatalogClient::new();
    let sources = env.sources("/METADATA.json");
    let catalogs = fetch_catalogs(&client, &sources).unwrap();
    env.installer()
        .install(
            &CancellationToken::new(),
            &RequestDescriptor::new("jq").with_package_id("old.jq"),
            &catalogs,
            None,
        )
        .unwrap();

    let valid = validate_programs(&client, &sources, &env.settings, &env.registry, &[]).unwrap();
    assert_eq!(valid, vec!["jq#old.jq@1.5"]);

    // A bare name describes the installed package, not the top-ranked one.
    let entry = get_info(
        &env.settings,
        &env.registry,
        &RequestDescriptor::new("jq"),
        &catalogs,
    )
    .unwrap();
    assert_eq!(entry.package_id, "old.jq");
}

#[test]
fn test_path_qualified_fork_described_validated_and_current() {
    let env = Env::new();
    let script = "#!/nix/store/abc-bash/bin/bash\necho hi\n";
    let catalog = format!(
        r#"[
            {{"pkg": "Baseutils/coreutils/ls", "pkg_id": "upstream", "rank": 9,
              "download_url": "{upstream}"}},
            {{"pkg": "Baseutils/coreutils/ls", "pkg_id": "fork", "rank": 2, "version": "1",
              "download_url": "{fork}", "bsum": "{bsum}"}}
        ]"#,
        upstream = env.server.url("/bin/ls-upstream"),
        fork = env.server.url("/bin/ls-fork"),
        bsum = blake3::hash(script.as_bytes()).to_hex(),
    );
    env.server.mock(|when, then| {
        when.method(GET).path("/METADATA.json");
        then.status(200).body(catalog);
    });
    env.server.mock(|when, then| {
        when.method(GET).path("/bin/ls-fork");
        then.status(200).body(script);
    });

    let client = HttpCatalogClient::new();
    let sources = env.sources("/METADATA.json");
    let catalogs = fetch_catalogs(&client, &sources).unwrap();
    let result = env
        .installer()
        .install(
            &CancellationToken::new(),
            &"Baseutils/coreutils/ls#fork".parse::<RequestDescriptor>().unwrap(),
            &catalogs,
            None,
        )
        .unwrap();
    assert_eq!(result.artifact.path, env.install_path("ls"));
    assert!(result.artifact.sanitized);

    let entry = get_info(
        &env.settings,
        &env.registry,
        &RequestDescriptor::new("Baseutils/coreutils/ls"),
        &catalogs,
    )
    .unwrap();
    assert_eq!(entry.package_id, "fork");

    let valid = validate_programs(
        &client,
        &sources,
        &env.settings,
        &env.registry,
        &["Baseutils/coreutils/ls".to_string()],
    )
    .unwrap();
    assert_eq!(valid, vec!["Baseutils/coreutils/ls#fork@1"]);

    let store = LocalBinaryStore::new(&env.settings.directory);
    let checked = UpdateChecker::new(&store, &env.registry)
        .check(&catalogs)
        .unwrap();
    assert_eq!(checked.len(), 1);
    assert_eq!(checked[0].status, BinaryStatus::UpToDate);
}
