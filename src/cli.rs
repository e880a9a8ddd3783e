//! Command-line interface definitions for the `codegenius` tool.

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use crate::providers::ProviderType;

/// AI-assisted commit messages, code reviews and work history for git
#[derive(Parser, Debug)]
#[command(
    name = "codegenius",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CODEGENIUS_GIT_SHA"), ")"),
    about,
    long_about = None
)]
#[command(
    after_help = "EXAMPLES:\n    codegenius commit\n    codegenius commit --context \"closes #42\"\n    codegenius review --type security\n    codegenius history \"Dec 2024\""
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output as JSON
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// AI provider (overrides config and CODEGENIUS_PROVIDER)
    #[arg(long, short = 'p', value_enum, value_name = "PROVIDER", global = true)]
    pub provider: Option<ProviderType>,

    /// Model identifier (overrides config and CODEGENIUS_MODEL)
    #[arg(long, short = 'm', value_name = "MODEL", global = true)]
    pub model: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate a commit message for staged changes and commit
    Commit {
        /// Extra context passed to the AI (ticket number, motivation, ...)
        #[arg(long, short = 'c', value_name = "TEXT")]
        context: Option<String>,

        /// Commit the first generated message without asking
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Review staged changes
    Review {
        /// Review category (repeatable); prompts when omitted
        #[arg(long = "type", short = 't', value_name = "TYPE")]
        types: Vec<String>,

        /// Run every enabled review category
        #[arg(long, short = 'a', conflicts_with = "types")]
        all: bool,
    },
    /// Show work history, optionally for one month (e.g. "Dec 2024")
    History {
        #[arg(value_name = "MONTH_YEAR")]
        month_year: Option<String>,
    },
    /// Show work history statistics
    Stats,
    /// Write a default .codegenius.toml in the current directory
    Init {
        /// Overwrite an existing config file
        #[arg(long, short = 'f')]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum, value_name = "SHELL")]
        shell: Shell,
    },
}

/// Log filter for the repeated `-v` flag
pub fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_parses_commit() {
        let cli = Cli::parse_from(["codegenius", "commit"]);
        assert!(matches!(
            cli.command,
            Command::Commit {
                context: None,
                yes: false
            }
        ));
        assert!(!cli.json);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_cli_parses_commit_context_and_yes() {
        let cli = Cli::parse_from(["codegenius", "commit", "-c", "closes #42", "--yes"]);
        match cli.command {
            Command::Commit { context, yes } => {
                assert_eq!(context.as_deref(), Some("closes #42"));
                assert!(yes);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parses_repeated_review_types() {
        let cli = Cli::parse_from(["codegenius", "review", "-t", "security", "--type", "style"]);
        match cli.command {
            Command::Review { types, all } => {
                assert_eq!(types, vec!["security", "style"]);
                assert!(!all);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_review_all_conflicts_with_type() {
        let result = Cli::try_parse_from(["codegenius", "review", "--all", "--type", "style"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parses_history_month() {
        let cli = Cli::parse_from(["codegenius", "history", "Dec 2024"]);
        match cli.command {
            Command::History { month_year } => assert_eq!(month_year.as_deref(), Some("Dec 2024")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["codegenius", "stats", "--json", "-vv"]);
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Stats));
    }

    #[test]
    fn test_cli_parses_provider_override() {
        let cli = Cli::parse_from(["codegenius", "--provider", "openai", "commit"]);
        assert_eq!(cli.provider, Some(ProviderType::OpenAI));
    }

    #[test]
    fn test_cli_parses_completions() {
        let cli = Cli::parse_from(["codegenius", "completions", "zsh"]);
        assert!(matches!(
            cli.command,
            Command::Completions { shell: Shell::Zsh }
        ));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["codegenius"]).is_err());
    }

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(0), "warn");
        assert_eq!(log_level(1), "info");
        assert_eq!(log_level(5), "debug");
    }
}
