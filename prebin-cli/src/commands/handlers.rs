//! Command handlers for prebin CLI commands.
//!
//! Each handler implements the `CommandHandler` trait and contains the
//! business logic for its respective command.

use prebin::manager::{BinaryStatus, ManagerError};
use prebin::package::CatalogEntry;

use super::args::{CheckArgs, InfoArgs, InstallArgs, ListArgs, ValidateArgs};
use super::services::format_size;
use super::traits::{CommandContext, CommandHandler};
use crate::error::CliError;

// ============================================================================
// Install Handler
// ============================================================================

/// Handler for the `install` command.
pub struct InstallHandler;

impl CommandHandler for InstallHandler {
    type Args = InstallArgs;

    fn execute(args: Self::Args, ctx: &CommandContext<'_>) -> Result<(), CliError> {
        let total = args.requests.len();
        let catalogs = ctx.manager.fetch_catalogs()?;

        // Concurrent bars would overwrite each other.
        let on_progress = match args.requests.as_slice() {
            [only] => ctx.output.progress_callback(&only.name),
            _ => None,
        };

        ctx.output.println(&format!(
            "Installing {} package(s) into {}...",
            total,
            ctx.manager.install_dir().display()
        ));

        let outcomes = ctx.manager.install(args.requests, catalogs, on_progress);
        ctx.output.progress_done();

        let mut failed = 0;
        for outcome in &outcomes {
            match &outcome.result {
                Ok(installed) => {
                    ctx.output.success(&format!(
                        "{} {} -> {}",
                        installed.identity,
                        format_size(installed.artifact.bytes),
                        installed.artifact.path.display()
                    ));
                    if !installed.artifact.checksum_verified {
                        ctx.output.warning(&format!(
                            "{} publishes no checksum; the download was not verified",
                            installed.entry.name
                        ));
                    }
                }
                Err(ManagerError::Cancelled { .. }) => {
                    ctx.output.error(&format!("{}: cancelled", outcome.request));
                    failed += 1;
                }
                Err(e) => {
                    ctx.output.error(&format!("{}: {}", outcome.request, e));
                    failed += 1;
                }
            }
        }

        // A task that panicked has no outcome.
        failed += total.saturating_sub(outcomes.len());

        if failed > 0 {
            return Err(CliError::InstallFailed { failed, total });
        }
        Ok(())
    }
}

// ============================================================================
// Info Handler
// ============================================================================

/// Handler for the `info` command.
pub struct InfoHandler;

impl CommandHandler for InfoHandler {
    type Args = InfoArgs;

    fn execute(args: Self::Args, ctx: &CommandContext<'_>) -> Result<(), CliError> {
        let catalogs = ctx.manager.fetch_catalogs()?;
        let entry = ctx.manager.info(&args.request, &catalogs)?;

        print_entry(&entry, ctx);
        Ok(())
    }
}

fn print_entry(entry: &CatalogEntry, ctx: &CommandContext<'_>) {
    let title = if entry.pretty_name.is_empty() {
        entry.name.as_str()
    } else {
        entry.pretty_name.as_str()
    };
    ctx.output.header(title);

    let fields = [
        ("Name", entry.name.as_str()),
        ("Package ID", entry.package_id.as_str()),
        ("Version", entry.version.as_str()),
        ("Description", entry.description.as_str()),
        ("Size", entry.size.as_str()),
        ("Build date", entry.build_date.as_str()),
        ("Download URL", entry.download_url.as_str()),
        ("SHA-256", entry.shasum.as_str()),
        ("BLAKE3", entry.bsum.as_str()),
        ("Build script", entry.build_script.as_str()),
        ("Build log", entry.build_log.as_str()),
    ];
    for (label, value) in fields {
        if !value.is_empty() {
            ctx.output.println(&format!("{:<14}{}", format!("{}:", label), value));
        }
    }
    ctx.output.println(&format!("{:<14}{}", "Rank:", entry.rank));

    let lists = [
        ("Categories", &entry.categories),
        ("Provides", &entry.provides),
        ("Notes", &entry.notes),
        ("Sources", &entry.src_urls),
        ("Homepage", &entry.web_urls),
    ];
    for (label, values) in lists {
        if values.is_empty() {
            continue;
        }
        ctx.output.println(&format!("{}:", label));
        for value in values {
            ctx.output.indented(value);
        }
    }
}

// ============================================================================
// List Handler
// ============================================================================

/// Handler for the `list` command.
pub struct ListHandler;

impl CommandHandler for ListHandler {
    type Args = ListArgs;

    fn execute(args: Self::Args, ctx: &CommandContext<'_>) -> Result<(), CliError> {
        let binaries = ctx.manager.list_installed()?;

        if binaries.is_empty() {
            ctx.output.println(&format!(
                "No binaries installed in {}.",
                ctx.manager.install_dir().display()
            ));
            ctx.output.newline();
            ctx.output.println("Use 'prebin install <REQUEST>' to install a package.");
            return Ok(());
        }

        ctx.output.header(&format!("Installed Binaries ({})", binaries.len()));
        ctx.output.newline();

        for binary in &binaries {
            let tag = match &binary.identity {
                _ if binary.is_symlink => "symlink".to_string(),
                Some(identity) => identity.to_string(),
                None => "unmanaged".to_string(),
            };

            if args.verbose {
                ctx.output.println(&binary.name);
                ctx.output.indented(&format!("Path: {}", binary.path.display()));
                ctx.output.indented(&format!("Size: {}", format_size(binary.size_bytes)));
                ctx.output.indented(&format!("Owner: {}", tag));
                if !binary.is_executable {
                    ctx.output.indented("Not executable");
                }
                ctx.output.newline();
            } else {
                ctx.output.println(&format!(
                    "  {:<24} {:<40} {}",
                    binary.name,
                    tag,
                    format_size(binary.size_bytes)
                ));
            }
        }

        let managed = binaries.iter().filter(|b| b.is_managed()).count();
        if !args.verbose {
            ctx.output.newline();
        }
        ctx.output.println(&format!(
            "{} managed, {} other.",
            managed,
            binaries.len() - managed
        ));

        Ok(())
    }
}

// ============================================================================
// Validate Handler
// ============================================================================

/// Handler for the `validate` command.
///
/// Prints one program name per line so the output can be piped.
pub struct ValidateHandler;

impl CommandHandler for ValidateHandler {
    type Args = ValidateArgs;

    fn execute(args: Self::Args, ctx: &CommandContext<'_>) -> Result<(), CliError> {
        let valid = ctx.manager.validate(&args.names)?;
        for name in &valid {
            ctx.output.println(name);
        }
        tracing::debug!(count = valid.len(), "Validated programs");
        Ok(())
    }
}

// ============================================================================
// Check Handler
// ============================================================================

/// Handler for the `check` command.
pub struct CheckHandler;

impl CommandHandler for CheckHandler {
    type Args = CheckArgs;

    fn execute(_args: Self::Args, ctx: &CommandContext<'_>) -> Result<(), CliError> {
        ctx.output.println("Checking installed binaries...");
        ctx.output.newline();

        let catalogs = ctx.manager.fetch_catalogs()?;
        let infos = ctx.manager.check_updates(&catalogs)?;

        if infos.is_empty() {
            ctx.output.println("No managed binaries installed.");
            return Ok(());
        }

        let mut updates_available = 0;
        for info in &infos {
            let line = match &info.status {
                BinaryStatus::UpToDate => "Up to date".to_string(),
                BinaryStatus::UpdateAvailable {
                    installed,
                    available,
                } => {
                    updates_available += 1;
                    match installed {
                        Some(installed) if installed != available => {
                            format!("Update available ({} -> {})", installed, available)
                        }
                        _ => format!("Update available ({})", available),
                    }
                }
                BinaryStatus::Unverifiable => "No hash published, cannot compare".to_string(),
                BinaryStatus::Orphaned => "Not in any catalog (orphaned)".to_string(),
                BinaryStatus::Unreadable { reason } => format!("Cannot read ({})", reason),
            };
            ctx.output.println(&format!("  {} ({}) - {}", info.name, info.installed, line));
        }

        ctx.output.newline();
        if updates_available > 0 {
            ctx.output.println(&format!(
                "{} update(s) available. Use 'prebin install <NAME>' to update.",
                updates_available
            ));
        } else {
            ctx.output.println("All binaries are up to date.");
        }

        Ok(())
    }
}
