//! CLI commands for installing and inspecting prebuilt binaries.
//!
//! This module implements the Command Pattern with trait-based dependency
//! injection:
//!
//! - `traits`: Core interfaces (`Output`, `PrebinService`, `CommandHandler`)
//! - `services`: Concrete implementations of the traits
//! - `args`: CLI argument types and parsing (clap-derived)
//! - `handlers`: Command handlers implementing business logic
//!
//! # Architecture
//!
//! Each command handler:
//! - Implements the `CommandHandler` trait
//! - Depends only on trait interfaces via `CommandContext`
//! - Can be tested in isolation with mock implementations

mod args;
mod handlers;
mod services;
mod traits;

pub use args::{Cli, Commands};
pub use handlers::{CheckHandler, InfoHandler, InstallHandler, ListHandler, ValidateHandler};
pub use services::{ConsoleOutput, DefaultPrebinService};
pub use traits::CommandHandler;

use prebin::config::ConfigFile;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use args::{CheckArgs, InfoArgs, InstallArgs, ListArgs, ValidateArgs};
use traits::CommandContext;

use crate::error::CliError;

impl Commands {
    /// Subcommand name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Install { .. } => "install",
            Commands::Info { .. } => "info",
            Commands::List { .. } => "list",
            Commands::Validate { .. } => "validate",
            Commands::Check => "check",
        }
    }
}

/// Run a subcommand.
///
/// Creates the production context and dispatches to the appropriate
/// handler. Must be called from a blocking thread of `runtime`.
pub fn run(
    command: Commands,
    config: ConfigFile,
    cancel: CancellationToken,
    runtime: Handle,
) -> Result<(), CliError> {
    let output = ConsoleOutput::new();
    let manager = DefaultPrebinService::new(config, cancel, runtime);
    let ctx = CommandContext::new(&output, &manager);

    match command {
        Commands::Install { requests } => InstallHandler::execute(InstallArgs { requests }, &ctx),
        Commands::Info { request } => InfoHandler::execute(InfoArgs { request }, &ctx),
        Commands::List { verbose } => ListHandler::execute(ListArgs { verbose }, &ctx),
        Commands::Validate { names } => ValidateHandler::execute(ValidateArgs { names }, &ctx),
        Commands::Check => CheckHandler::execute(CheckArgs, &ctx),
    }
}
