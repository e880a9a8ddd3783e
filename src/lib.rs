//! CodeGenius - AI-assisted git workflow tool
//!
//! This library provides the core functionality for the `codegenius` CLI:
//! classifying free-text AI reviews into structured issues and suggestions,
//! generating commit messages, and keeping a local log of committed work.

pub mod assistant;
pub mod classifier;
pub mod cli;
pub mod commands;
pub mod config;
pub mod git;
pub mod history;
pub mod output;
pub mod prompt;
pub mod providers;
pub mod review;

// Re-export commonly used types
pub use assistant::{CodeAssistant, Session};
pub use classifier::{ItemKind, ReviewItem, Severity};
pub use cli::{Cli, Command};
pub use config::Config;
pub use git::{GitRepository, Vcs};
pub use history::{HistoryEntry, HistoryManager, HistoryStats, HistoryStorage, JsonFileStorage};
pub use review::{ReviewResult, ReviewStats, Reviewer};
