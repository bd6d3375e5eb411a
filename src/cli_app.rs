//! Top-level CLI definition and dispatch.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::control;
use thiserror::Error;

use glsched::logger::ActivityLog;
use glsched::services::gitlab::GitLabClient;
use glsched::services::profiles::TomlProfileStore;
use glsched::tui::theme::Theme;
use glsched::tui::{Services, run};

/// glsched — terminal dashboard for GitLab pipeline schedules.
#[derive(Debug, Parser)]
#[command(
    name = "glsched",
    author,
    version,
    about = "GitLab pipeline schedule dashboard",
    long_about = None
)]
pub struct Cli {
    /// Override the profile store path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Disable the activity log.
    #[arg(long, global = true)]
    no_log: bool,
    /// Subcommand to execute; the dashboard runs when omitted.
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate shell completions on stdout.
    Completions {
        /// Target shell.
        #[arg(value_enum)]
        shell: CompletionShell,
    },
    /// Print the profile store path and exit.
    ConfigPath,
}

/// CLI-level failures wrapping the library error for exit reporting.
#[derive(Debug, Error)]
pub enum CliError {
    /// Application failure surfaced on exit.
    #[error("{0}")]
    App(#[from] glsched::core::errors::GlsError),
}

/// Dispatch the parsed CLI.
pub fn run_cli(args: &Cli) -> Result<(), CliError> {
    if args.no_color {
        control::set_override(false);
    }

    let store = args.config.as_ref().map_or_else(
        TomlProfileStore::default_location,
        TomlProfileStore::at,
    );

    match &args.command {
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            generate(*shell, &mut cmd, "glsched", &mut io::stdout());
            Ok(())
        }
        Some(Command::ConfigPath) => {
            println!("{}", store.path().display());
            Ok(())
        }
        None => {
            let theme = if args.no_color {
                Theme::plain()
            } else {
                Theme::color()
            };
            let log = if args.no_log {
                ActivityLog::disabled()
            } else {
                ActivityLog::default_location()
            };
            let services = Services {
                api: Arc::new(GitLabClient::new()?),
                store: Arc::new(store),
                log,
            };
            run(&services, &theme)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_bare_invocation() {
        let cli = Cli::try_parse_from(["glsched"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.no_color);
    }

    #[test]
    fn cli_parses_completions() {
        let cli = Cli::try_parse_from(["glsched", "completions", "bash"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Completions { .. })));
    }

    #[test]
    fn cli_parses_config_override() {
        let cli =
            Cli::try_parse_from(["glsched", "--config", "/tmp/profiles.toml", "config-path"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/profiles.toml")));
    }
}
