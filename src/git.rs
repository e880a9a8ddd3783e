//! Git access through the `git` command line.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

/// Added or removed lines shorter than this are not worth quoting
const MIN_CHANGE_LEN: usize = 10;

/// Most key changes quoted from a diff
const MAX_KEY_CHANGES: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("not a git repository (or any of the parent directories)")]
    NotARepository,

    #[error("failed to execute git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("git {command} failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error("commit message cannot be empty")]
    EmptyMessage,
}

/// Version-control operations the tool depends on
pub trait Vcs {
    /// Diff of staged changes
    fn staged_diff(&self) -> Result<String, GitError>;
    /// Paths with staged changes
    fn changed_files(&self) -> Result<Vec<String>, GitError>;
    fn current_branch(&self) -> Result<String, GitError>;
    /// Subjects of the most recent commits, newest first
    fn recent_commits(&self) -> Result<Vec<String>, GitError>;
    fn has_staged_changes(&self) -> Result<bool, GitError>;
    fn commit(&self, message: &str) -> Result<(), GitError>;
    /// Porcelain status output
    fn status(&self) -> Result<String, GitError>;
}

/// A repository driven through the `git` binary
#[derive(Debug, Clone)]
pub struct GitRepository {
    working_dir: PathBuf,
}

impl GitRepository {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.working_dir);
        cmd
    }

    fn output(&self, args: &[&str]) -> Result<Output, GitError> {
        debug!(?args, "running git");
        Ok(self.command(args).output()?)
    }

    fn validate(&self) -> Result<(), GitError> {
        let output = self.output(&["rev-parse", "--git-dir"])?;
        if output.status.success() {
            Ok(())
        } else {
            Err(GitError::NotARepository)
        }
    }

    /// Run a git command inside a validated repository and return stdout
    fn run(&self, args: &[&str]) -> Result<String, GitError> {
        self.validate()?;
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(GitError::Command {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Non-empty trimmed lines of command output
fn split_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

impl Vcs for GitRepository {
    fn staged_diff(&self) -> Result<String, GitError> {
        self.run(&["diff", "--cached"])
    }

    fn changed_files(&self) -> Result<Vec<String>, GitError> {
        Ok(split_lines(&self.run(&["diff", "--cached", "--name-only"])?))
    }

    fn current_branch(&self) -> Result<String, GitError> {
        Ok(self.run(&["branch", "--show-current"])?.trim().to_string())
    }

    fn recent_commits(&self) -> Result<Vec<String>, GitError> {
        Ok(split_lines(
            &self.run(&["log", "-10", "--pretty=format:%s"])?,
        ))
    }

    fn has_staged_changes(&self) -> Result<bool, GitError> {
        self.validate()?;
        let output = self.output(&["diff", "--cached", "--quiet"])?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(GitError::Command {
                command: "diff --cached --quiet".to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    fn commit(&self, message: &str) -> Result<(), GitError> {
        if message.trim().is_empty() {
            return Err(GitError::EmptyMessage);
        }
        self.run(&["commit", "-m", message]).map(|_| ())
    }

    fn status(&self) -> Result<String, GitError> {
        self.run(&["status", "--porcelain"])
    }
}

/// Files and notable lines pulled out of a diff for prompt context
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffContext {
    pub files: Vec<String>,
    pub key_changes: Vec<String>,
}

/// Summarize a unified diff, skipping lines that contain an ignore pattern
pub fn analyze_diff_context(diff: &str, ignore_patterns: &[String]) -> DiffContext {
    let mut context = DiffContext::default();

    for line in diff.lines() {
        let line = line.trim();
        if line.is_empty() || ignore_patterns.iter().any(|p| line.contains(p.as_str())) {
            continue;
        }

        if line.starts_with("diff --git") {
            if let Some(target) = line.split_whitespace().nth(3) {
                let file = target.strip_prefix("b/").unwrap_or(target);
                context.files.push(file.to_string());
            }
            continue;
        }

        if line.len() <= MIN_CHANGE_LEN {
            continue;
        }

        if let Some(added) = line.strip_prefix('+').filter(|_| !line.starts_with("+++")) {
            context.key_changes.push(added.to_string());
        } else if let Some(removed) = line.strip_prefix('-').filter(|_| !line.starts_with("---"))
        {
            context.key_changes.push(format!("REMOVED: {}", removed));
        }
    }

    context.key_changes.truncate(MAX_KEY_CHANGES);
    context
}
