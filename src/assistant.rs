//! The AI collaborator: prompt in, text out, with a small session log.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{AiConfig, Config};
use crate::git::analyze_diff_context;
use crate::prompt::{self, CommitRequest};
use crate::providers::{self, Provider, ProviderError};

/// Interactions quoted back to the model in a contextual prompt
const CONTEXT_INTERACTIONS: usize = 3;

/// Length at which quoted responses are cut
const CONTEXT_RESPONSE_LEN: usize = 100;

/// Base delay between retries, doubled per attempt
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// AI operations used by the commit and review workflows
#[async_trait]
pub trait CodeAssistant: Send {
    /// Free-text analysis of `code` for one review category
    async fn analyze(&mut self, code: &str, category: &str) -> Result<String>;

    /// A commit message for the staged changes
    async fn generate_commit_message(
        &mut self,
        diff: &str,
        files: &[String],
        branch: &str,
        extra_context: &str,
    ) -> Result<String>;

    /// Note why the last response was not used; later prompts may quote it
    fn set_feedback(&mut self, _feedback: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    Commit,
    Analysis,
}

/// One request/response pair in the current session
#[derive(Debug, Clone)]
pub struct Interaction {
    pub kind: InteractionKind,
    pub prompt: String,
    pub response: String,
    pub feedback: String,
    pub timestamp: DateTime<Local>,
}

/// Builds the provider the first time a session needs one
pub type ProviderFactory = fn(&AiConfig) -> Result<Box<dyn Provider>>;

/// Provider-backed assistant that remembers what it was asked this run.
///
/// The provider (and with it the API key lookup) is only built on the first
/// request, so workflows that never reach the AI work without credentials.
pub struct Session {
    provider: Option<Box<dyn Provider>>,
    factory: ProviderFactory,
    config: Config,
    history: Vec<Interaction>,
    /// Quote earlier interactions in the next commit prompt
    use_context: bool,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self::with_factory(config, providers::create_provider)
    }

    pub fn with_factory(config: Config, factory: ProviderFactory) -> Self {
        Self {
            provider: None,
            factory,
            config,
            history: Vec::new(),
            use_context: false,
        }
    }

    /// A session around an already constructed provider
    pub fn with_provider(provider: Box<dyn Provider>, config: Config) -> Self {
        let mut session = Self::new(config);
        session.provider = Some(provider);
        session
    }

    fn provider(&mut self) -> Result<&dyn Provider> {
        if self.provider.is_none() {
            let provider = (self.factory)(&self.config.ai)?;
            info!(
                provider = provider.name(),
                model = provider.model_name(),
                "using AI provider"
            );
            self.provider = Some(provider);
        }
        match self.provider.as_deref() {
            Some(provider) => Ok(provider),
            None => bail!("AI provider is not available"),
        }
    }

    pub fn interactions(&self) -> &[Interaction] {
        &self.history
    }

    fn record(&mut self, kind: InteractionKind, prompt: String, response: String) {
        self.history.push(Interaction {
            kind,
            prompt,
            response,
            feedback: String::new(),
            timestamp: Local::now(),
        });
    }

    /// Prefix `base` with a digest of the last few interactions
    pub fn contextual_prompt(&self, base: &str) -> String {
        if self.history.is_empty() {
            return base.to_string();
        }

        let start = self.history.len().saturating_sub(CONTEXT_INTERACTIONS);
        let mut prompt = String::from("Previous interactions context:\n");
        for interaction in &self.history[start..] {
            let kind = match interaction.kind {
                InteractionKind::Commit => "commit",
                InteractionKind::Analysis => "analysis",
            };
            prompt.push_str(&format!(
                "- {}: {}\n",
                kind,
                truncate(&interaction.response, CONTEXT_RESPONSE_LEN)
            ));
            if !interaction.feedback.is_empty() {
                prompt.push_str(&format!("  feedback: {}\n", interaction.feedback));
            }
        }
        prompt.push_str("\nCurrent request:\n");
        prompt.push_str(base);
        prompt
    }

    /// Call the provider, retrying transient failures up to `max_retries` times
    async fn complete_with_retry(&mut self, prompt: &str) -> Result<String> {
        let max_retries = self.config.ai.max_retries;
        let provider = self.provider()?;
        let mut attempt = 0;

        loop {
            match provider.complete(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    let retryable = e
                        .downcast_ref::<ProviderError>()
                        .is_some_and(ProviderError::is_retryable);
                    if !retryable || attempt >= max_retries {
                        return Err(e);
                    }
                    attempt += 1;
                    let delay = RETRY_BASE_DELAY * 2u32.pow(attempt - 1);
                    warn!(attempt, error = %e, "provider request failed, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Strip whitespace and wrapping quotes/backticks from a generated message
pub fn clean_commit_message(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '`' || c == '"' || c == '\'')
        .trim()
        .to_string()
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[async_trait]
impl CodeAssistant for Session {
    async fn analyze(&mut self, code: &str, category: &str) -> Result<String> {
        self.config.validate()?;

        let prompt = prompt::build_analysis_prompt(code, category, self.config.review.text_only);
        debug!(category, "sending analysis request");
        let response = self.complete_with_retry(&prompt).await?;
        self.record(InteractionKind::Analysis, prompt, response.clone());
        Ok(response)
    }

    async fn generate_commit_message(
        &mut self,
        diff: &str,
        files: &[String],
        branch: &str,
        extra_context: &str,
    ) -> Result<String> {
        self.config.validate()?;

        let files: Vec<String> = files
            .iter()
            .filter(|f| !self.config.should_ignore_file(f))
            .cloned()
            .collect();
        let diff_context = analyze_diff_context(diff, &self.config.project.ignore_files);

        let request = CommitRequest {
            diff,
            files: &files,
            branch,
            extra_context,
            diff_context: Some(&diff_context),
        };
        let mut prompt =
            prompt::build_commit_prompt(&self.config.ai, &self.config.project, &request);
        if self.use_context {
            prompt = self.contextual_prompt(&prompt);
        }

        debug!(files = files.len(), "generating commit message");
        let response = self.complete_with_retry(&prompt).await?;
        let message = clean_commit_message(&response);
        if message.is_empty() {
            bail!("AI generated an empty commit message");
        }

        self.record(InteractionKind::Commit, prompt, message.clone());
        Ok(message)
    }

    /// Attach feedback to the latest interaction and quote the session in the
    /// next commit prompt
    fn set_feedback(&mut self, feedback: &str) -> Result<()> {
        let Some(last) = self.history.last_mut() else {
            bail!("no interactions to provide feedback for");
        };
        last.feedback = feedback.to_string();
        self.use_context = true;
        Ok(())
    }
}
