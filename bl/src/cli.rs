//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// Beloader - ordered resource loading queue
#[derive(Parser)]
#[command(
    name = "bl",
    about = "Load a manifest of resources with ordered, precedence-aware commits",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Shorthand for --log-level DEBUG
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Effective log level: explicit level wins over --verbose
    pub fn effective_log_level(&self) -> Option<&str> {
        match (&self.log_level, self.verbose) {
            (Some(level), _) => Some(level.as_str()),
            (None, true) => Some("DEBUG"),
            (None, false) => None,
        }
    }
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run every item of a manifest and print the committed document
    Run {
        /// Manifest file (YAML)
        manifest: PathBuf,

        /// Reject on the first failed item
        #[arg(long)]
        fail_fast: bool,

        /// Resolve URLs against this directory instead of the configured root
        #[arg(short, long)]
        root: Option<PathBuf>,
    },

    /// Build the queue from a manifest and report configuration errors
    Check {
        /// Manifest file (YAML)
        manifest: PathBuf,
    },
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("beloader")
        .join("logs")
        .join("beloader.log");
    debug!(?path, "get_log_path: returning path");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::parse_from(["bl", "run", "site.yml"]);
        match cli.command {
            Command::Run {
                manifest,
                fail_fast,
                root,
            } => {
                assert_eq!(manifest, PathBuf::from("site.yml"));
                assert!(!fail_fast);
                assert!(root.is_none());
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_run_fail_fast_with_root() {
        let cli = Cli::parse_from(["bl", "run", "site.yml", "--fail-fast", "--root", "public"]);
        assert!(matches!(
            cli.command,
            Command::Run { fail_fast: true, root: Some(_), .. }
        ));
    }

    #[test]
    fn test_cli_parse_check() {
        let cli = Cli::parse_from(["bl", "check", "site.yml"]);
        assert!(matches!(cli.command, Command::Check { .. }));
    }

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["bl"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["bl", "check", "site.yml", "--config", "custom.yml", "-v"]);
        assert_eq!(cli.config, Some(PathBuf::from("custom.yml")));
        assert_eq!(cli.effective_log_level(), Some("DEBUG"));

        let cli = Cli::parse_from(["bl", "-l", "trace", "-v", "check", "site.yml"]);
        assert_eq!(cli.effective_log_level(), Some("trace"));

        let cli = Cli::parse_from(["bl", "check", "site.yml"]);
        assert_eq!(cli.effective_log_level(), None);
    }

    #[test]
    fn test_get_log_path() {
        let path = get_log_path();
        assert!(path.ends_with("beloader/logs/beloader.log"));
    }
}
