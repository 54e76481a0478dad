//! Command-line interface parsing for rarc
//!
//! This module handles parsing of CLI arguments using clap. Connection
//! settings can also come from the environment or from `~/.arcrc`, see
//! [`crate::config`].

use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};
use thiserror::Error;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The argument does not look like a PHID
    #[error("Invalid PHID: '{0}'. PHIDs look like PHID-DREV-abcdef0123456789")]
    InvalidPhid(String),
}

/// rarc - A command-line client for Phabricator
#[derive(Parser, Debug)]
#[command(name = "rarc")]
#[command(about = "Command-line client for Phabricator")]
#[command(version)]
pub struct Cli {
    /// Print more details and debug logs
    #[arg(
        short,
        long,
        global = true,
        env = "VERBOSE",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Do not read or write the on-disk query cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Phabricator URL, e.g. https://phab.example.com/
    #[arg(long, global = true, env = "PHABRICATOR_URI", value_name = "URL")]
    pub uri: Option<String>,

    /// Conduit API token
    #[arg(long, global = true, env = "PHABRICATOR_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Directory for the query cache
    #[arg(long, global = true, env = "RARC_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Path of the arcanist configuration file [default: ~/.arcrc]
    #[arg(long, global = true, env = "RARC_ARCRC", value_name = "FILE")]
    pub arcrc: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Gives information on the current user
    Whoami,
    /// List open revisions
    Diff(DiffArgs),
    /// Resolve objects by PHID
    Phid {
        #[arg(required = true, value_parser = parse_phid_arg)]
        phids: Vec<String>,
    },
    /// Inspect or clear the query cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Options of the `diff` command
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffArgs {
    /// Only list revisions authored by the current user
    #[arg(short = 'u', long)]
    pub mine_only: bool,
    /// List revisions of every repository, not just the current one
    #[arg(short = 'A', long)]
    pub all_repos: bool,
    /// One entry per revision
    #[arg(short, long)]
    pub summary: bool,
    /// Show the revisions each one depends on and blocks
    #[arg(short = 'S', long)]
    pub stack: bool,
    /// Show comments
    #[arg(short, long)]
    pub comments: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Print where cached queries are stored
    Path,
    /// Remove every cached query
    Clear,
}

/// Parses a PHID argument.
///
/// # Arguments
/// * `s` - The PHID string from CLI
///
/// # Returns
/// * `Ok(String)` if the string has the `PHID-TYPE-id` shape
/// * `Err(CliError::InvalidPhid)` otherwise
pub fn parse_phid_arg(s: &str) -> Result<String, CliError> {
    let mut parts = s.splitn(3, '-');
    let valid = parts.next() == Some("PHID")
        && parts
            .next()
            .is_some_and(|kind| !kind.is_empty() && kind.chars().all(|c| c.is_ascii_uppercase()))
        && parts.next().is_some_and(|id| !id.is_empty());

    if valid {
        Ok(s.to_string())
    } else {
        Err(CliError::InvalidPhid(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_phid_arg_valid() {
        assert_eq!(parse_phid_arg("PHID-DREV-abc123").unwrap(), "PHID-DREV-abc123");
        assert_eq!(parse_phid_arg("PHID-XACT-DREV-xyz").unwrap(), "PHID-XACT-DREV-xyz");
    }

    #[test]
    fn test_parse_phid_arg_invalid() {
        for bad in ["D42", "PHID-", "PHID-DREV-", "PHID-drev-abc", "phid-DREV-abc"] {
            let err = parse_phid_arg(bad).unwrap_err();
            assert!(err.to_string().contains("Invalid PHID"), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_cli_parse_whoami() {
        let cli = Cli::parse_from(["rarc", "whoami"]);
        assert_eq!(cli.command, Command::Whoami);
        assert!(!cli.no_cache);
    }

    #[test]
    fn test_cli_parse_diff_defaults() {
        let cli = Cli::parse_from(["rarc", "diff"]);
        assert_eq!(cli.command, Command::Diff(DiffArgs::default()));
    }

    #[test]
    fn test_cli_parse_diff_short_flags() {
        let cli = Cli::parse_from(["rarc", "diff", "-u", "-A", "-s", "-S", "-c"]);
        assert_eq!(
            cli.command,
            Command::Diff(DiffArgs {
                mine_only: true,
                all_repos: true,
                summary: true,
                stack: true,
                comments: true,
            })
        );
    }

    #[test]
    fn test_cli_parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["rarc", "diff", "--no-cache", "-v", "--no-color"]);
        assert!(cli.no_cache);
        assert!(cli.verbose);
        assert!(cli.no_color);
    }

    #[test]
    fn test_cli_parse_phid() {
        let cli = Cli::parse_from(["rarc", "phid", "PHID-DREV-1", "PHID-USER-2"]);
        assert_eq!(
            cli.command,
            Command::Phid {
                phids: vec!["PHID-DREV-1".to_string(), "PHID-USER-2".to_string()]
            }
        );
    }

    #[test]
    fn test_cli_rejects_bad_phid() {
        assert!(Cli::try_parse_from(["rarc", "phid", "D42"]).is_err());
    }

    #[test]
    fn test_cli_parse_cache_actions() {
        let cli = Cli::parse_from(["rarc", "cache", "clear"]);
        assert_eq!(
            cli.command,
            Command::Cache {
                action: CacheAction::Clear
            }
        );
        assert!(Cli::try_parse_from(["rarc", "cache"]).is_err());
    }
}
