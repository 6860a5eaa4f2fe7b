//! CLI argument types.
//!
//! Contains clap-derived types for parsing command-line arguments
//! and the argument structs passed to handlers.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use prebin::package::RequestDescriptor;

/// Top-level command line.
#[derive(Debug, Parser)]
#[command(name = "prebin", version)]
#[command(about = "Install prebuilt static binaries from published catalogs", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.prebin/config.ini
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Install directory (overrides the config file)
    #[arg(long, global = true, value_name = "DIR")]
    pub install_dir: Option<PathBuf>,

    /// Treat every file in the install directory as owned, ignoring tags
    #[arg(long, global = true)]
    pub retake_ownership: bool,

    /// Enable debug logging (also mirrored to stderr)
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install one or more packages
    ///
    /// Requests use the form NAME[#PACKAGE_ID][@VERSION]. The highest-ranked
    /// matching entry across all catalogs is installed.
    Install {
        /// Packages to install
        #[arg(required = true, value_name = "REQUEST")]
        requests: Vec<RequestDescriptor>,
    },

    /// Show catalog details for a package
    ///
    /// If the package is installed, the entry it was installed from is shown.
    Info {
        /// Package to describe
        #[arg(value_name = "REQUEST")]
        request: RequestDescriptor,
    },

    /// List files in the install directory
    List {
        /// Show paths, sizes and ownership tags
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print installed programs that belong to a catalog entry
    Validate {
        /// Only consider these programs (default: the whole install directory)
        #[arg(value_name = "NAME")]
        names: Vec<String>,
    },

    /// Compare installed binaries with the catalogs
    Check,
}

// ============================================================================
// Handler Arguments
// ============================================================================

/// Arguments for the install command.
#[derive(Debug, Clone)]
pub struct InstallArgs {
    pub requests: Vec<RequestDescriptor>,
}

/// Arguments for the info command.
#[derive(Debug, Clone)]
pub struct InfoArgs {
    pub request: RequestDescriptor,
}

/// Arguments for the list command.
#[derive(Debug, Clone)]
pub struct ListArgs {
    pub verbose: bool,
}

/// Arguments for the validate command.
#[derive(Debug, Clone)]
pub struct ValidateArgs {
    pub names: Vec<String>,
}

/// Arguments for the check command.
#[derive(Debug, Clone, Default)]
pub struct CheckArgs;

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_install_requests() {
        let cli = Cli::try_parse_from(["prebin", "install", "jq", "curl#net.curl@8.5.0"]).unwrap();
        match cli.command {
            Commands::Install { requests } => {
                assert_eq!(requests.len(), 2);
                assert_eq!(requests[0], RequestDescriptor::new("jq"));
                assert_eq!(requests[1].package_id(), "net.curl");
                assert_eq!(requests[1].version.as_deref(), Some("8.5.0"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_install_requires_a_request() {
        assert!(Cli::try_parse_from(["prebin", "install"]).is_err());
    }

    #[test]
    fn test_malformed_request_rejected() {
        assert!(Cli::try_parse_from(["prebin", "info", "jq#a#b"]).is_err());
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "prebin",
            "validate",
            "--install-dir",
            "/opt/bin",
            "--retake-ownership",
            "jq",
        ])
        .unwrap();

        assert_eq!(cli.install_dir, Some(PathBuf::from("/opt/bin")));
        assert!(cli.retake_ownership);
        assert!(!cli.debug);
        match cli.command {
            Commands::Validate { names } => assert_eq!(names, vec!["jq".to_string()]),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
