//! Core traits for the command handler pattern.
//!
//! This module defines the interfaces that handlers depend on, enabling
//! dependency injection and testability.

use std::path::Path;

use prebin::manager::{BinaryInfo, InstallResult, InstalledBinary, ManagerResult, ProgressCallback};
use prebin::package::{CatalogEntry, CatalogSet, RequestDescriptor};

use crate::error::CliError;

// ============================================================================
// Output Trait - Abstracts console output
// ============================================================================

/// Trait for outputting messages to the user.
///
/// This abstraction allows handlers to produce output without depending on
/// `println!` directly, making them testable.
pub trait Output: Send + Sync {
    /// Print a line of text.
    fn println(&self, message: &str);

    /// Print text without a newline.
    #[allow(dead_code)]
    fn print(&self, message: &str);

    /// Print an empty line.
    fn newline(&self) {
        self.println("");
    }

    /// Print a section header.
    fn header(&self, title: &str) {
        self.println(title);
        self.println(&"=".repeat(title.len()));
    }

    /// Print an indented line.
    fn indented(&self, message: &str) {
        self.println(&format!("  {}", message));
    }

    /// Print a warning message.
    fn warning(&self, message: &str) {
        self.println(&format!("Warning: {}", message));
    }

    /// Print an error message.
    fn error(&self, message: &str) {
        self.println(&format!("Error: {}", message));
    }

    /// Print a success message.
    fn success(&self, message: &str) {
        self.println(&format!("Success: {}", message));
    }

    /// Progress reporter for a download labelled `label`.
    ///
    /// `None` when progress cannot be shown (e.g. output is not a terminal).
    fn progress_callback(&self, _label: &str) -> Option<ProgressCallback> {
        None
    }

    /// Finish the current progress display.
    fn progress_done(&self) {}
}

// ============================================================================
// Prebin Service Trait
// ============================================================================

/// Outcome of installing one requested package.
#[derive(Debug)]
pub struct InstallOutcome {
    /// The request as given on the command line.
    pub request: RequestDescriptor,
    pub result: ManagerResult<InstallResult>,
}

/// Trait for installer operations.
///
/// Abstracts the library so handlers can be tested against canned results.
pub trait PrebinService: Send + Sync {
    /// Directory binaries are installed into.
    fn install_dir(&self) -> &Path;

    /// Fetch every configured catalog.
    fn fetch_catalogs(&self) -> ManagerResult<CatalogSet>;

    /// Install each request concurrently.
    ///
    /// Outcomes are returned in request order. `on_progress` is attached to
    /// the first request only.
    fn install(
        &self,
        requests: Vec<RequestDescriptor>,
        catalogs: CatalogSet,
        on_progress: Option<ProgressCallback>,
    ) -> Vec<InstallOutcome>;

    /// Catalog entry describing a request.
    fn info(
        &self,
        request: &RequestDescriptor,
        catalogs: &CatalogSet,
    ) -> ManagerResult<CatalogEntry>;

    /// Every file in the install directory.
    fn list_installed(&self) -> ManagerResult<Vec<InstalledBinary>>;

    /// Names of installed programs that belong to a catalog entry.
    fn validate(&self, requested: &[String]) -> ManagerResult<Vec<String>>;

    /// Update status of each managed binary.
    fn check_updates(&self, catalogs: &CatalogSet) -> ManagerResult<Vec<BinaryInfo>>;
}

// ============================================================================
// Command Context - Bundles dependencies for handlers
// ============================================================================

/// Context providing dependencies to command handlers.
///
/// In production this holds the console and the real service; in tests,
/// mocks.
pub struct CommandContext<'a> {
    /// Output interface for user messages.
    pub output: &'a dyn Output,

    /// Service for installer operations.
    pub manager: &'a dyn PrebinService,
}

impl<'a> CommandContext<'a> {
    /// Create a new command context.
    pub fn new(output: &'a dyn Output, manager: &'a dyn PrebinService) -> Self {
        Self { output, manager }
    }
}

// ============================================================================
// Command Handler Trait
// ============================================================================

/// Trait for command handlers.
///
/// Each subcommand has a handler that implements this trait. Handlers
/// receive their arguments and a context providing dependencies.
pub trait CommandHandler {
    /// The arguments type for this handler.
    type Args;

    /// Execute the command with the given arguments and context.
    fn execute(args: Self::Args, ctx: &CommandContext<'_>) -> Result<(), CliError>;
}
