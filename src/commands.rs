//! Workflows behind each subcommand.
//!
//! Everything here talks to git, the AI and the history file through the
//! [`Vcs`], [`CodeAssistant`] and [`HistoryStorage`] traits, so the binary
//! only wires concrete implementations together and renders results.

use anyhow::{Context, Result};
use dialoguer::{Confirm, Editor, Input, Select};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::assistant::{clean_commit_message, CodeAssistant};
use crate::config::{self, CONFIG_FILE};
use crate::git::{GitError, Vcs};
use crate::history::{HistoryManager, HistoryStorage};
use crate::output;
use crate::review::{ReviewResult, Reviewer};

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("no staged changes to commit")]
    NoStagedChanges,

    #[error("{path} already exists")]
    ConfigExists { path: PathBuf },
}

/// Staged state plus the message generated for it
#[derive(Debug, Clone, Serialize)]
pub struct CommitDraft {
    pub branch: String,
    pub files: Vec<String>,
    #[serde(skip)]
    pub diff: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum CommitOutcome {
    Committed(String),
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitAction {
    Commit,
    Edit,
    Regenerate,
    Cancel,
}

impl CommitAction {
    const ALL: [CommitAction; 4] = [
        CommitAction::Commit,
        CommitAction::Edit,
        CommitAction::Regenerate,
        CommitAction::Cancel,
    ];

    fn label(self) -> &'static str {
        match self {
            CommitAction::Commit => "Commit with this message",
            CommitAction::Edit => "Edit message",
            CommitAction::Regenerate => "Regenerate",
            CommitAction::Cancel => "Cancel",
        }
    }
}

/// Asks the user what to do with a drafted commit message
pub trait CommitPrompter {
    fn choose(&mut self, message: &str) -> Result<CommitAction>;
    /// The edited message, or `None` to keep the current one
    fn edit(&mut self, message: &str) -> Result<Option<String>>;
}

/// Terminal prompts through `dialoguer`
pub struct TerminalPrompter;

impl CommitPrompter for TerminalPrompter {
    fn choose(&mut self, message: &str) -> Result<CommitAction> {
        print!("{}", output::render_commit_message(message));
        let labels: Vec<&str> = CommitAction::ALL.iter().map(|a| a.label()).collect();
        let index = Select::new()
            .with_prompt("What would you like to do?")
            .items(&labels)
            .default(0)
            .interact()
            .context("Failed to read selection")?;
        Ok(CommitAction::ALL[index])
    }

    fn edit(&mut self, message: &str) -> Result<Option<String>> {
        // Multi-line messages go to $EDITOR, subject-only ones are edited inline
        if message.contains('\n') {
            return Editor::new()
                .edit(message)
                .context("Failed to open editor");
        }

        let line: String = Input::new()
            .with_prompt("Commit message")
            .with_initial_text(message)
            .interact_text()
            .context("Failed to read commit message")?;
        Ok(Some(line))
    }
}

/// Read the staged changes and ask the assistant for a message
pub async fn draft_commit(
    vcs: &dyn Vcs,
    assistant: &mut dyn CodeAssistant,
    extra_context: &str,
) -> Result<CommitDraft> {
    if !vcs.has_staged_changes()? {
        return Err(WorkflowError::NoStagedChanges.into());
    }

    let diff = vcs.staged_diff()?;
    let files = vcs.changed_files()?;
    let branch = vcs.current_branch()?;
    info!(files = files.len(), branch = %branch, "drafting commit message");

    let message = assistant
        .generate_commit_message(&diff, &files, &branch, extra_context)
        .await?;

    Ok(CommitDraft {
        branch,
        files,
        diff,
        message,
    })
}

/// Commit and record the message in the work history.
///
/// A failure to update the history only warns: the commit already happened.
pub fn finalize_commit<S: HistoryStorage>(
    vcs: &dyn Vcs,
    history: &mut HistoryManager<S>,
    message: &str,
) -> Result<(), GitError> {
    vcs.commit(message)?;
    info!("changes committed");

    if let Err(e) = history.add_entry(message) {
        warn!(error = %e, "failed to update work history");
    }
    Ok(())
}

/// Draft, let the user decide, and commit.
///
/// With `auto_accept` the first draft is committed without prompting.
pub async fn commit_workflow<S: HistoryStorage>(
    vcs: &dyn Vcs,
    assistant: &mut dyn CodeAssistant,
    history: &mut HistoryManager<S>,
    prompter: &mut dyn CommitPrompter,
    extra_context: &str,
    auto_accept: bool,
) -> Result<CommitOutcome> {
    let mut draft = draft_commit(vcs, assistant, extra_context).await?;

    loop {
        let action = if auto_accept {
            CommitAction::Commit
        } else {
            prompter.choose(&draft.message)?
        };

        match action {
            CommitAction::Commit => {
                finalize_commit(vcs, history, &draft.message)?;
                return Ok(CommitOutcome::Committed(draft.message));
            }
            CommitAction::Edit => {
                if let Some(edited) = prompter.edit(&draft.message)? {
                    let edited = clean_commit_message(&edited);
                    if edited.is_empty() {
                        warn!("edited message is empty, keeping the previous draft");
                    } else {
                        draft.message = edited;
                    }
                }
            }
            CommitAction::Regenerate => {
                assistant.set_feedback(&format!(
                    "User rejected this message and asked for another: {}",
                    draft.message
                ))?;
                draft.message = assistant
                    .generate_commit_message(
                        &draft.diff,
                        &draft.files,
                        &draft.branch,
                        extra_context,
                    )
                    .await?;
            }
            CommitAction::Cancel => return Ok(CommitOutcome::Cancelled),
        }
    }
}

/// Which review categories to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewSelection {
    /// Exactly one category; an unknown name is an error
    Single(String),
    /// Several categories; unknown or failing ones are skipped
    Many(Vec<String>),
    All,
}

impl ReviewSelection {
    pub fn from_args(mut types: Vec<String>, all: bool) -> Option<Self> {
        if all {
            Some(ReviewSelection::All)
        } else if types.len() == 1 {
            types.pop().map(ReviewSelection::Single)
        } else if types.is_empty() {
            None
        } else {
            Some(ReviewSelection::Many(types))
        }
    }
}

/// Let the user pick one of the supported review categories
pub fn prompt_review_selection(reviewer: &Reviewer) -> Result<ReviewSelection> {
    let mut choices = reviewer.supported_types();
    choices.push("all".to_string());
    let index = Select::new()
        .with_prompt("Review type")
        .items(&choices)
        .default(0)
        .interact()
        .context("Failed to read selection")?;

    if index == choices.len() - 1 {
        Ok(ReviewSelection::All)
    } else {
        Ok(ReviewSelection::Single(choices.swap_remove(index)))
    }
}

/// Review the staged diff
pub async fn review_workflow(
    vcs: &dyn Vcs,
    assistant: &mut dyn CodeAssistant,
    reviewer: &Reviewer,
    selection: ReviewSelection,
) -> Result<Vec<(String, ReviewResult)>> {
    let diff = vcs.staged_diff()?;
    if diff.trim().is_empty() && !vcs.status()?.trim().is_empty() {
        warn!("working tree has changes but none are staged");
    }

    let results = match selection {
        ReviewSelection::Single(category) => {
            let result = reviewer.perform_review(assistant, &diff, &category).await?;
            vec![(category, result)]
        }
        ReviewSelection::Many(categories) => {
            reviewer.batch_review(assistant, &diff, &categories).await
        }
        ReviewSelection::All => {
            let categories = reviewer.supported_types();
            reviewer.batch_review(assistant, &diff, &categories).await
        }
    };

    Ok(results)
}

/// Render the history: one month if `month_year` is given, else everything
pub fn history_view<S: HistoryStorage>(
    history: &HistoryManager<S>,
    month_year: Option<&str>,
) -> String {
    match month_year {
        Some(month_year) => {
            output::render_month_view(month_year, &history.filter_by_month_year(month_year))
        }
        None => output::render_all_history(history.entries()),
    }
}

/// Write an initial config for `dir`, refusing to clobber one unless `force`
pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf> {
    let path = dir.join(CONFIG_FILE);
    if path.exists() && !force {
        return Err(WorkflowError::ConfigExists { path }.into());
    }

    let contents = config::render_config(&config::initial_config(dir))?;
    std::fs::write(&path, contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote config");
    Ok(path)
}

/// Ask before overwriting an existing config
pub fn confirm_overwrite(path: &Path) -> Result<bool> {
    Confirm::new()
        .with_prompt(format!("{} exists. Overwrite?", path.display()))
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}
