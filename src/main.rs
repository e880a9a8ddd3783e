use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use colored::Colorize;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use codegenius::assistant::Session;
use codegenius::cli::{log_level, Cli, Command};
use codegenius::commands::{
    self, CommitOutcome, ReviewSelection, TerminalPrompter, WorkflowError,
};
use codegenius::config::{Config, ConfigError, Overrides};
use codegenius::git::{GitError, GitRepository};
use codegenius::history::{HistoryManager, JsonFileStorage};
use codegenius::output::{self, format_error};
use codegenius::providers::ProviderError;
use codegenius::review::{self, Reviewer};

fn setup_logging(verbose: u8) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level(verbose)));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .without_time()
                .with_target(false),
        )
        .init();
}

fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "codegenius", &mut io::stdout());
}

/// A hint for errors the user can fix themselves
fn tip_for(err: &anyhow::Error) -> Option<String> {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<GitError>() {
            if matches!(e, GitError::NotARepository) {
                return Some("Run codegenius inside a git repository.".to_string());
            }
        }
        if let Some(e) = cause.downcast_ref::<ProviderError>() {
            return match e {
                ProviderError::MissingApiKey { env_var, .. } => {
                    Some(format!("export {env_var}=<your key>, or pick another --provider."))
                }
                ProviderError::RateLimited { .. } => {
                    Some("Set [ai] max_retries in .codegenius.toml to retry automatically.".to_string())
                }
                _ => None,
            };
        }
        if let Some(ConfigError::MissingModel) = cause.downcast_ref::<ConfigError>() {
            return Some("Set [ai] model in .codegenius.toml or CODEGENIUS_MODEL.".to_string());
        }
        if let Some(e) = cause.downcast_ref::<WorkflowError>() {
            return Some(match e {
                WorkflowError::NoStagedChanges => {
                    "Stage your changes first with 'git add'.".to_string()
                }
                WorkflowError::ConfigExists { .. } => {
                    "Use 'codegenius init --force' to overwrite it.".to_string()
                }
            });
        }
    }
    None
}

/// Config from disk, then environment, then command-line flags
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load()?;
    config.apply_overrides(&cli_overrides(cli, Overrides::from_env()));
    Ok(config)
}

fn cli_overrides(cli: &Cli, env: Overrides) -> Overrides {
    env.layered_under(Overrides {
        provider: cli.provider,
        model: cli.model.clone(),
        timeout_secs: None,
    })
}

fn open_history(config: &Config) -> Result<HistoryManager<JsonFileStorage>> {
    let mut history = HistoryManager::new(JsonFileStorage::new(&config.history.path));
    history.load()?;
    Ok(history)
}

async fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;

    match cli.command.clone() {
        Command::Completions { shell } => print_completions(shell),

        Command::Init { force } => run_init(&cwd, force)?,

        Command::History { month_year } => {
            let config = load_config(&cli)?;
            let history = open_history(&config)?;
            if cli.json {
                let entries = match month_year.as_deref() {
                    Some(month_year) => history.filter_by_month_year(month_year),
                    None => history.entries().to_vec(),
                };
                output::print_json(&entries)?;
            } else {
                print!("{}", commands::history_view(&history, month_year.as_deref()));
            }
        }

        Command::Stats => {
            let config = load_config(&cli)?;
            let stats = open_history(&config)?.stats();
            if cli.json {
                output::print_json(&stats)?;
            } else {
                print!("{}", output::render_stats(&stats));
            }
        }

        Command::Commit { context, yes } => {
            let config = load_config(&cli)?;
            let repo = GitRepository::new(&cwd);
            let mut session = Session::new(config.clone());
            let mut history = HistoryManager::new(JsonFileStorage::new(&config.history.path));

            // Without a terminal there is nobody to ask
            let auto_accept = yes || cli.json || !io::stdin().is_terminal();
            let outcome = commands::commit_workflow(
                &repo,
                &mut session,
                &mut history,
                &mut TerminalPrompter,
                context.as_deref().unwrap_or(""),
                auto_accept,
            )
            .await?;

            if cli.json {
                output::print_json(&outcome)?;
            } else {
                match outcome {
                    CommitOutcome::Committed(message) => {
                        println!("{} {}", "✓".green(), "Changes committed".green().bold());
                        println!("  {}", message.dimmed());
                    }
                    CommitOutcome::Cancelled => println!("{}", "Commit cancelled.".yellow()),
                }
            }
        }

        Command::Review { types, all } => {
            let config = load_config(&cli)?;
            let repo = GitRepository::new(&cwd);
            let reviewer = Reviewer::new(config.review.clone());
            let selection = match ReviewSelection::from_args(types, all) {
                Some(selection) => selection,
                None if io::stdin().is_terminal() && !cli.json => {
                    commands::prompt_review_selection(&reviewer)?
                }
                None => ReviewSelection::All,
            };
            let mut session = Session::new(config.clone());

            let results =
                commands::review_workflow(&repo, &mut session, &reviewer, selection).await?;

            if cli.json {
                let payload: Vec<_> = results
                    .iter()
                    .map(|(_, result)| {
                        serde_json::json!({
                            "result": result,
                            "stats": review::review_stats(result),
                        })
                    })
                    .collect();
                output::print_json(&payload)?;
            } else if results.is_empty() {
                println!("{}", "No review results to display.".yellow());
            } else {
                for (_, result) in &results {
                    print!("{}", output::render_review(result));
                }
            }
        }
    }

    Ok(())
}

fn run_init(dir: &Path, force: bool) -> Result<()> {
    let path = match commands::init_config(dir, force) {
        Ok(path) => path,
        Err(e) => {
            let existing = match e.downcast_ref::<WorkflowError>() {
                Some(WorkflowError::ConfigExists { path }) => Some(path.clone()),
                _ => None,
            };
            match existing {
                Some(path)
                    if io::stdin().is_terminal() && commands::confirm_overwrite(&path)? =>
                {
                    commands::init_config(dir, true)?
                }
                _ => return Err(e),
            }
        }
    };
    println!(
        "{} Wrote {}",
        "✓".green(),
        path.display().to_string().bold()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let tip = tip_for(&e);
            eprintln!("{}", format_error(&format!("{e:#}"), tip.as_deref()));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegenius::providers::ProviderType;

    #[test]
    fn test_tip_for_missing_api_key() {
        let err: anyhow::Error = ProviderError::MissingApiKey {
            provider: "Gemini".to_string(),
            env_var: "GEMINI_API_KEY".to_string(),
        }
        .into();
        let tip = tip_for(&err).unwrap();
        assert!(tip.contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_tip_for_wrapped_git_error() {
        let err = anyhow::Error::from(GitError::NotARepository).context("commit failed");
        assert!(tip_for(&err).unwrap().contains("git repository"));
    }

    #[test]
    fn test_tip_for_no_staged_changes() {
        let err: anyhow::Error = WorkflowError::NoStagedChanges.into();
        assert!(tip_for(&err).unwrap().contains("git add"));
    }

    #[test]
    fn test_no_tip_for_generic_error() {
        let err = anyhow::anyhow!("something odd");
        assert!(tip_for(&err).is_none());
    }

    #[test]
    fn test_load_config_cli_provider_switches_default_model() {
        let cli = Cli::parse_from(["codegenius", "--provider", "anthropic", "stats"]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.ai.provider, ProviderType::Anthropic);
        assert!(!config.ai.model.is_empty());
    }

    #[test]
    fn test_cli_provider_keeps_env_model() {
        let cli = Cli::parse_from(["codegenius", "--provider", "openai", "stats"]);
        let env = Overrides {
            model: Some("gpt-custom".to_string()),
            ..Default::default()
        };
        let mut config = Config::default();
        config.apply_overrides(&cli_overrides(&cli, env));
        assert_eq!(config.ai.provider, ProviderType::OpenAI);
        assert_eq!(config.ai.model, "gpt-custom");
    }
}
