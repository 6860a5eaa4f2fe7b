//! prebin CLI - Command-line interface
//!
//! Installs prebuilt static binaries from published catalogs and keeps
//! track of which files in the install directory it owns.

mod commands;
mod error;
mod runner;

use clap::Parser;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use commands::Cli;
use error::CliError;
use runner::CliRunner;

/// Exit status after a second Ctrl-C (128 + SIGINT).
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    // Library calls block on HTTP and disk, so the command runs on a
    // blocking thread; concurrent installs fan out from there.
    let runtime = Handle::current();
    let result = tokio::task::spawn_blocking(move || run(cli, cancel, runtime))
        .await
        .unwrap_or_else(|e| Err(CliError::Runtime(e.to_string())));

    if let Err(e) = result {
        e.exit();
    }
}

/// First Ctrl-C cancels in-flight downloads; a second one exits at once.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        eprintln!();
        eprintln!("Interrupted, cancelling downloads (press Ctrl-C again to quit)...");
        tracing::warn!("Interrupted by user");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    });
}

fn run(cli: Cli, cancel: CancellationToken, runtime: Handle) -> Result<(), CliError> {
    let runner = CliRunner::new(&cli)?;
    runner.log_startup(cli.command.name());

    commands::run(cli.command, runner.config().clone(), cancel, runtime)
}
