//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use prebin::config::ConfigFileError;
use prebin::manager::{ManagerError, OwnershipError};

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(ConfigFileError),
    /// Library operation failed
    Manager(ManagerError),
    /// Some requested packages were not installed
    InstallFailed { failed: usize, total: usize },
    /// The command task could not be run to completion
    Runtime(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Manager(ManagerError::Ownership(OwnershipError::WriteFailed { .. })) => {
                eprintln!();
                eprintln!("If the install directory does not support extended attributes,");
                eprintln!("set 'ownership = sidecar' in the [install] section of");
                eprintln!("~/.prebin/config.ini.");
            }
            CliError::Manager(e) if e.is_network() => {
                eprintln!();
                eprintln!("Check your network connection, or the catalog URLs in the");
                eprintln!("[catalog.<label>] sections of ~/.prebin/config.ini.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Manager(e) => write!(f, "{}", e),
            CliError::InstallFailed { failed, total } => {
                write!(f, "{} of {} package(s) failed to install", failed, total)
            }
            CliError::Runtime(msg) => write!(f, "Command failed to run: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Manager(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<ManagerError> for CliError {
    fn from(e: ManagerError) -> Self {
        CliError::Manager(e)
    }
}
