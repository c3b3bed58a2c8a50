//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

/// Keep share links resolved to their current direct-download URLs.
///
/// Sharekeeper stores a list of file-sharing share pages and periodically
/// re-resolves each one, recording whether it still yields a download.
#[derive(Parser, Debug)]
#[command(name = "sharekeeper")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: $XDG_CONFIG_HOME/sharekeeper/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Link database file (overrides `database_path` from config)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add share URLs (arguments, or one per line on stdin)
    Add {
        /// Share-page URLs
        urls: Vec<String>,
    },

    /// Remove a share URL
    Remove {
        /// Share-page URL to remove
        url: String,
    },

    /// List stored links and their status
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Re-check every stored link once and wait for the run to finish
    Run(RunArgs),

    /// Resolve one share URL without storing it
    Resolve {
        /// Share-page URL
        url: String,

        /// Print JSON instead of the bare URL
        #[arg(long)]
        json: bool,
    },

    /// Re-check stored links on a schedule until interrupted
    Serve {
        #[command(flatten)]
        run: RunArgs,

        /// Seconds between scheduled runs (overrides config)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..=604_800))]
        interval_secs: Option<u64>,

        /// Start a run immediately instead of waiting one interval
        #[arg(long)]
        run_now: bool,
    },
}

/// Engine overrides shared by `run` and `serve`.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct RunArgs {
    /// Links resolved concurrently per batch (1-100)
    #[arg(short = 'b', long, value_parser = clap::value_parser!(u16).range(1..=100))]
    pub batch_size: Option<u16>,

    /// Resolve attempts per link (1-10)
    #[arg(short = 'a', long, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_attempts: Option<u32>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_list_parses_successfully() {
        let args = Args::try_parse_from(["sharekeeper", "list"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(matches!(args.command, Command::List { json: false }));
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["sharekeeper", "-v", "list"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["sharekeeper", "list", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["sharekeeper", "--quiet", "run"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["sharekeeper", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["sharekeeper", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_missing_subcommand_is_error() {
        assert!(Args::try_parse_from(["sharekeeper"]).is_err());
    }

    #[test]
    fn test_cli_add_collects_urls() {
        let args = Args::try_parse_from([
            "sharekeeper",
            "add",
            "https://share.example/s/a",
            "https://share.example/s/b",
        ])
        .unwrap();
        match args.command {
            Command::Add { urls } => assert_eq!(urls.len(), 2),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_global_db_and_config_paths() {
        let args = Args::try_parse_from([
            "sharekeeper",
            "remove",
            "https://share.example/s/a",
            "--db",
            "/tmp/l.db",
            "--config",
            "/tmp/c.toml",
        ])
        .unwrap();
        assert_eq!(args.db, Some(PathBuf::from("/tmp/l.db")));
        assert_eq!(args.config, Some(PathBuf::from("/tmp/c.toml")));
    }

    #[test]
    fn test_cli_run_overrides() {
        let args = Args::try_parse_from(["sharekeeper", "run", "-b", "3", "-a", "5"]).unwrap();
        match args.command {
            Command::Run(run) => {
                assert_eq!(run.batch_size, Some(3));
                assert_eq!(run.max_attempts, Some(5));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_batch_size_zero_rejected() {
        let err = Args::try_parse_from(["sharekeeper", "run", "--batch-size", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_serve_flags() {
        let args = Args::try_parse_from([
            "sharekeeper",
            "serve",
            "--interval-secs",
            "60",
            "--run-now",
            "--batch-size",
            "2",
        ])
        .unwrap();
        match args.command {
            Command::Serve {
                run,
                interval_secs,
                run_now,
            } => {
                assert_eq!(interval_secs, Some(60));
                assert!(run_now);
                assert_eq!(run.batch_size, Some(2));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_resolve_json_flag() {
        let args =
            Args::try_parse_from(["sharekeeper", "resolve", "https://share.example/s/a", "--json"])
                .unwrap();
        assert!(matches!(args.command, Command::Resolve { json: true, .. }));
    }
}
