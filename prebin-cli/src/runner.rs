//! CLI runner for common setup.
//!
//! Encapsulates config loading and logging initialization so that every
//! command starts from the same state.

use std::path::Path;

use prebin::config::ConfigFile;
use prebin::logging::{init_logging, LoggingGuard};
use tracing::info;

use crate::commands::Cli;
use crate::error::CliError;

/// Runner that manages CLI lifecycle.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration with command-line overrides applied
    config: ConfigFile,
}

impl CliRunner {
    /// Load config and initialize logging.
    ///
    /// With `--debug`, logging defaults to debug level and is mirrored to
    /// stderr.
    pub fn new(cli: &Cli) -> Result<Self, CliError> {
        let config = load_config(cli)?;

        let log_path = &config.logging.file;
        let log_dir = log_path.parent().unwrap_or_else(|| Path::new("."));
        let log_file = log_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "prebin.log".to_string());

        let logging_guard = init_logging(log_dir, &log_file, cli.debug, cli.debug)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("prebin v{}", prebin::VERSION);
        info!(
            command,
            install_dir = %self.config.install.directory.display(),
            ownership = %self.config.install.ownership,
            retake_ownership = self.config.install.retake_ownership,
            "Starting command"
        );
    }
}

/// Load the config file named on the command line (or the default one) and
/// apply the command-line overrides.
fn load_config(cli: &Cli) -> Result<ConfigFile, CliError> {
    let mut config = match &cli.config {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    apply_overrides(&mut config, cli);
    Ok(config)
}

fn apply_overrides(config: &mut ConfigFile, cli: &Cli) {
    if let Some(dir) = &cli.install_dir {
        config.install.directory = dir.clone();
    }
    if cli.retake_ownership {
        config.install.retake_ownership = true;
    }
}
