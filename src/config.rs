//! Configuration system for the `codegenius` tool.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::providers::ProviderType;

/// Project-local config file name
pub const CONFIG_FILE: &str = ".codegenius.toml";

/// Default location of the work history log
pub const DEFAULT_HISTORY_PATH: &str = ".git/work_history.json";

/// Settings supplied outside the config file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub provider: Option<ProviderType>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Overrides {
    /// `CODEGENIUS_PROVIDER`, `CODEGENIUS_MODEL` and `CODEGENIUS_TIMEOUT`
    pub fn from_env() -> Self {
        Self {
            provider: env::var("CODEGENIUS_PROVIDER")
                .ok()
                .and_then(|v| v.parse::<ProviderType>().ok()),
            model: env::var("CODEGENIUS_MODEL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            timeout_secs: env::var("CODEGENIUS_TIMEOUT")
                .ok()
                .and_then(|v| v.parse::<u64>().ok()),
        }
    }

    /// These overrides with `over` taking precedence field by field
    pub fn layered_under(self, over: Overrides) -> Overrides {
        Overrides {
            provider: over.provider.or(self.provider),
            model: over.model.or(self.model),
            timeout_secs: over.timeout_secs.or(self.timeout_secs),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("AI model is not configured")]
    MissingModel,
}

/// Details about the project being committed to
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
    pub language: String,
    pub overview: String,
    /// Conventional commit scopes offered to the model
    pub scopes: Vec<String>,
    pub standards: String,
    /// Changed files containing (or ending with) one of these are left out of prompts
    pub ignore_files: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "My Project".to_string(),
            language: "unknown".to_string(),
            overview: "A project using CodeGenius for intelligent commits and reviews".to_string(),
            scopes: ["core", "api", "docs", "deps", "scripts", "ci", "build"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            standards: String::new(),
            ignore_files: ["Cargo.lock", "go.sum", "*.lock", "node_modules/", ".git/"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// AI provider settings
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AiConfig {
    pub provider: ProviderType,
    pub model: String,
    pub max_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Extra attempts for transient network failures
    pub max_retries: u32,
    /// Endpoint override for self-hosted or proxied APIs. For Gemini this is
    /// the models prefix (`{base_url}/{model}:generateContent` is appended);
    /// for OpenAI and Anthropic it is the full chat/messages endpoint URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Commit prompt preambles keyed by "default", "bugfix" and "feature"
    pub context_templates: BTreeMap<String, String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        let mut context_templates = BTreeMap::new();
        context_templates.insert(
            "default".to_string(),
            "This is a standard commit message generation request.".to_string(),
        );
        context_templates.insert(
            "bugfix".to_string(),
            "Focus on describing the bug that was fixed and its impact.".to_string(),
        );
        context_templates.insert(
            "feature".to_string(),
            "Emphasize the new functionality and its benefits to users.".to_string(),
        );

        Self {
            provider: ProviderType::default(),
            model: ProviderType::default().default_model().to_string(),
            max_tokens: 4000,
            timeout_secs: 30,
            max_retries: 0,
            base_url: None,
            context_templates,
        }
    }
}

/// Code review settings
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ReviewConfig {
    pub enabled_types: Vec<String>,
    /// Ask the model for prose only
    pub text_only: bool,
    /// Regexes flagging hard-coded secrets in added lines during security reviews
    pub security_patterns: Vec<String>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            enabled_types: crate::review::DEFAULT_REVIEW_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            text_only: true,
            security_patterns: vec![
                r#"(?i)(password|secret|key|token)\s*[:=]\s*["'][^"']+["']"#.to_string(),
                r#"(?i)api[_-]?key\s*[:=]\s*["'][^"']+["']"#.to_string(),
                r#"(?i)(auth|bearer)\s*[:=]\s*["'][^"']+["']"#.to_string(),
            ],
        }
    }
}

/// Work history settings
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct HistoryConfig {
    pub path: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_HISTORY_PATH),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub project: ProjectConfig,
    pub ai: AiConfig,
    pub review: ReviewConfig,
    pub history: HistoryConfig,
}

impl Config {
    /// Load the project config, then the user config, then defaults
    pub fn load() -> Result<Self, ConfigError> {
        let candidates = [Some(PathBuf::from(CONFIG_FILE)), Self::user_config_path()];
        for path in candidates.into_iter().flatten() {
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load config from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Get the user config file path (~/.config/codegenius/config.toml)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("codegenius").join("config.toml"))
    }

    /// Write this config as TOML
    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Switch provider and model. A new provider without an explicit model
    /// falls back to that provider's default model.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(provider) = overrides.provider {
            if provider != self.ai.provider && overrides.model.is_none() {
                self.ai.model = provider.default_model().to_string();
            }
            self.ai.provider = provider;
        }
        if let Some(model) = &overrides.model {
            self.ai.model = model.clone();
        }
        if let Some(timeout) = overrides.timeout_secs {
            self.ai.timeout_secs = timeout;
        }
    }

    /// Configuration errors that must stop any AI operation
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ai.model.trim().is_empty() {
            return Err(ConfigError::MissingModel);
        }
        Ok(())
    }

    /// Check if a changed file should be left out of prompts
    pub fn should_ignore_file(&self, filename: &str) -> bool {
        self.project.ignore_files.iter().any(|pattern| {
            filename.contains(pattern.as_str())
                || filename.ends_with(pattern.trim_start_matches('*'))
        })
    }
}

/// Guess the project language from marker files in `dir`
pub fn detect_project_language(dir: &Path) -> &'static str {
    const MARKERS: &[(&str, &str)] = &[
        ("Cargo.toml", "rust"),
        ("go.mod", "go"),
        ("package.json", "javascript"),
        ("requirements.txt", "python"),
        ("pyproject.toml", "python"),
        ("pom.xml", "java"),
        ("Gemfile", "ruby"),
    ];

    MARKERS
        .iter()
        .find(|(marker, _)| dir.join(marker).exists())
        .map(|(_, language)| *language)
        .unwrap_or("unknown")
}

/// Default config for `dir` with the detected language filled in
pub fn initial_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.project.language = detect_project_language(dir).to_string();
    if let Some(name) = dir.file_name().and_then(|n| n.to_str()) {
        config.project.name = name.to_string();
    }
    config
}

/// Generate default config as TOML string
pub fn generate_default_config() -> Result<String, ConfigError> {
    render_config(&Config::default())
}

/// `config` as commented TOML, ready to write to disk
pub fn render_config(config: &Config) -> Result<String, ConfigError> {
    let body = toml::to_string_pretty(config)?;
    Ok(format!(
        "# CodeGenius configuration\n\
         # Place this file at ./{CONFIG_FILE} or ~/.config/codegenius/config.toml\n\
         #\n\
         # Environment variable overrides:\n\
         # CODEGENIUS_PROVIDER - gemini, openai or anthropic\n\
         # CODEGENIUS_MODEL    - model identifier\n\
         # CODEGENIUS_TIMEOUT  - request timeout in seconds\n\n{body}"
    ))
}
