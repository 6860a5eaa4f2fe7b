//! Concrete implementations of the service traits.
//!
//! These implementations wrap the prebin library, adapting it to the trait
//! interfaces used by handlers.

use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use console::{style, Term};
use prebin::config::ConfigFile;
use prebin::manager::{
    fetch_catalogs, get_info, registry_for, validate_programs, BinaryInfo, CachedCatalogClient,
    HttpCatalogClient, InstalledBinary, LocalBinaryStore, ManagerResult, OwnershipRegistry,
    OwnershipStore, PackageInstaller, ProgressCallback, UpdateChecker, VerifiedInstaller,
};
use prebin::package::{CatalogEntry, CatalogSet, CatalogSource, RequestDescriptor};
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::traits::{InstallOutcome, Output, PrebinService};

/// Width of the progress bar in characters.
const BAR_WIDTH: u64 = 30;

/// Bytes between redraws when the total size is unknown.
const UNKNOWN_TOTAL_STEP: u64 = 256 * 1024;

// ============================================================================
// Console Output Implementation
// ============================================================================

/// Standard console output implementation.
///
/// Messages go to stdout; progress bars go to stderr and are only drawn
/// when stderr is a terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleOutput;

impl ConsoleOutput {
    /// Create a new console output.
    pub fn new() -> Self {
        Self
    }
}

impl Output for ConsoleOutput {
    fn println(&self, message: &str) {
        println!("{}", message);
    }

    fn print(&self, message: &str) {
        print!("{}", message);
        io::stdout().flush().ok();
    }

    fn warning(&self, message: &str) {
        println!("{} {}", style("Warning:").yellow().bold(), message);
    }

    fn error(&self, message: &str) {
        println!("{} {}", style("Error:").red().bold(), message);
    }

    fn success(&self, message: &str) {
        println!("{} {}", style("✓").green().bold(), message);
    }

    fn progress_callback(&self, label: &str) -> Option<ProgressCallback> {
        let term = Term::stderr();
        if !term.is_term() {
            return None;
        }

        let label = label.to_string();
        let last_step = AtomicU64::new(u64::MAX);
        Some(Box::new(move |downloaded, total| {
            let step = if total > 0 {
                downloaded * 100 / total
            } else {
                downloaded / UNKNOWN_TOTAL_STEP
            };
            if last_step.swap(step, Ordering::Relaxed) == step {
                return;
            }
            term.clear_line().ok();
            term.write_str(&render_progress(&label, downloaded, total)).ok();
        }))
    }

    fn progress_done(&self) {
        let term = Term::stderr();
        if term.is_term() {
            term.clear_line().ok();
        }
    }
}

/// One line of progress: a bar with a percentage when the total is known,
/// otherwise just the byte count.
pub fn render_progress(label: &str, downloaded: u64, total: u64) -> String {
    if total == 0 {
        return format!("{} {}", label, format_size(downloaded));
    }

    let downloaded = downloaded.min(total);
    let filled = (BAR_WIDTH * downloaded / total) as usize;
    let empty = BAR_WIDTH as usize - filled;
    format!(
        "{} [{}{}] {:>3}% {}/{}",
        label,
        "#".repeat(filled),
        "-".repeat(empty),
        downloaded * 100 / total,
        format_size(downloaded),
        format_size(total)
    )
}

/// Format a byte count for humans.
pub fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;

    let value = bytes as f64;
    if value >= GIB {
        format!("{:.2} GiB", value / GIB)
    } else if value >= MIB {
        format!("{:.1} MiB", value / MIB)
    } else if value >= KIB {
        format!("{:.1} KiB", value / KIB)
    } else {
        format!("{} B", bytes)
    }
}

// ============================================================================
// Default Prebin Service Implementation
// ============================================================================

type Registry = OwnershipRegistry<Box<dyn OwnershipStore>>;

/// Default implementation of the prebin service.
///
/// Must be used from a blocking context: installs are driven through
/// `runtime`, which is entered with `block_on`.
pub struct DefaultPrebinService {
    config: ConfigFile,
    client: CachedCatalogClient<HttpCatalogClient>,
    installer: Arc<PackageInstaller<HttpCatalogClient, Box<dyn OwnershipStore>>>,
    store: LocalBinaryStore,
    cancel: CancellationToken,
    runtime: Handle,
}

impl DefaultPrebinService {
    /// Create a service for `config`.
    ///
    /// `cancel` aborts in-flight downloads.
    pub fn new(config: ConfigFile, cancel: CancellationToken, runtime: Handle) -> Self {
        let http = HttpCatalogClient::with_timeout(Duration::from_secs(config.download.timeout));
        let client = CachedCatalogClient::new(http.clone())
            .with_ttl(Duration::from_secs(config.catalogs.cache_ttl));
        let installer = PackageInstaller::new(
            VerifiedInstaller::new(http),
            registry_for(&config.install),
            &config.install.directory,
        );
        let store = LocalBinaryStore::new(&config.install.directory);

        Self {
            config,
            client,
            installer: Arc::new(installer),
            store,
            cancel,
            runtime,
        }
    }

    fn registry(&self) -> &Registry {
        self.installer.registry()
    }

    fn sources(&self) -> &[CatalogSource] {
        &self.config.catalogs.sources
    }
}

impl PrebinService for DefaultPrebinService {
    fn install_dir(&self) -> &Path {
        &self.config.install.directory
    }

    fn fetch_catalogs(&self) -> ManagerResult<CatalogSet> {
        fetch_catalogs(&self.client, self.sources())
    }

    fn install(
        &self,
        requests: Vec<RequestDescriptor>,
        catalogs: CatalogSet,
        on_progress: Option<ProgressCallback>,
    ) -> Vec<InstallOutcome> {
        let catalogs = Arc::new(catalogs);
        let mut on_progress = on_progress;

        self.runtime.block_on(async {
            let mut tasks = JoinSet::new();
            for (index, request) in requests.into_iter().enumerate() {
                let installer = Arc::clone(&self.installer);
                let catalogs = Arc::clone(&catalogs);
                let cancel = self.cancel.clone();
                let on_progress = on_progress.take();

                tasks.spawn_blocking(move || {
                    let result = installer.install(&cancel, &request, &catalogs, on_progress);
                    (index, InstallOutcome { request, result })
                });
            }

            let mut outcomes = Vec::new();
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(e) => tracing::error!(error = %e, "Install task failed"),
                }
            }
            outcomes.sort_by_key(|(index, _)| *index);
            outcomes.into_iter().map(|(_, outcome)| outcome).collect()
        })
    }

    fn info(
        &self,
        request: &RequestDescriptor,
        catalogs: &CatalogSet,
    ) -> ManagerResult<CatalogEntry> {
        get_info(&self.config.install, self.registry(), request, catalogs)
    }

    fn list_installed(&self) -> ManagerResult<Vec<InstalledBinary>> {
        self.store.list_installed(self.registry())
    }

    fn validate(&self, requested: &[String]) -> ManagerResult<Vec<String>> {
        validate_programs(
            &self.client,
            self.sources(),
            &self.config.install,
            self.registry(),
            requested,
        )
    }

    fn check_updates(&self, catalogs: &CatalogSet) -> ManagerResult<Vec<BinaryInfo>> {
        UpdateChecker::new(&self.store, self.registry()).check(catalogs)
    }
}
