//! Code review: turning free-text AI responses into structured results.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::assistant::CodeAssistant;
use crate::classifier::{self, ItemKind, ReviewItem, Severity, FENCE};
use crate::config::ReviewConfig;

/// Review categories used when none are configured
pub const DEFAULT_REVIEW_TYPES: &[&str] = &["security", "performance", "style", "structure"];

/// Summary used when there is nothing to review
pub const NO_CHANGES_SUMMARY: &str = "No changes to review.";

/// Structured outcome of one review category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewResult {
    pub category: String,
    pub summary: String,
    pub issues: Vec<ReviewItem>,
    pub suggestions: Vec<ReviewItem>,
}

impl ReviewResult {
    pub fn empty(category: &str, summary: &str) -> Self {
        Self {
            category: category.to_string(),
            summary: summary.to_string(),
            issues: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty() && self.suggestions.is_empty()
    }
}

/// Counts derived from a review result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewStats {
    pub category: String,
    pub total_issues: usize,
    pub total_suggestions: usize,
    pub severity_breakdown: BTreeMap<Severity, usize>,
    pub kind_breakdown: BTreeMap<ItemKind, usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("invalid review type: {category} (supported: {supported})")]
    InvalidType { category: String, supported: String },

    #[error("AI analysis failed for {category} review: {source}")]
    Analysis {
        category: String,
        #[source]
        source: anyhow::Error,
    },
}

// ============================================================================
// Response parsing
// ============================================================================

/// Remove fenced blocks and code-looking lines, keeping the prose
pub fn clean_response_text(text: &str) -> String {
    let mut kept = Vec::new();
    let mut in_code_block = false;

    for line in text.lines() {
        if line.trim().starts_with(FENCE) {
            in_code_block = !in_code_block;
            continue;
        }

        if in_code_block || classifier::is_code_like(line) {
            continue;
        }

        kept.push(line);
    }

    kept.join("\n")
}

/// Parse a raw AI response into a review result.
///
/// Every non-blank, non-code line is checked against the issue keywords and
/// then, independently, the suggestion keywords, so one line can land in both
/// lists.
pub fn parse_review_response(response: &str, category: &str) -> ReviewResult {
    if response.trim().is_empty() {
        return ReviewResult::empty(category, "");
    }

    let mut result = ReviewResult::empty(category, &clean_response_text(response));

    for line in response.lines() {
        let line = line.trim();
        if line.is_empty() || classifier::is_code_like(line) {
            continue;
        }

        let class = classifier::classify_line(line);
        if class.is_issue {
            result
                .issues
                .push(classifier::build_item(line, ItemKind::Issue));
        }
        if class.is_suggestion {
            result
                .suggestions
                .push(classifier::build_item(line, ItemKind::Suggestion));
        }
    }

    result
}

pub fn review_stats(result: &ReviewResult) -> ReviewStats {
    let mut severity_breakdown = BTreeMap::new();
    for issue in &result.issues {
        *severity_breakdown.entry(issue.severity).or_insert(0) += 1;
    }

    let mut kind_breakdown = BTreeMap::new();
    for item in result.issues.iter().chain(&result.suggestions) {
        *kind_breakdown.entry(item.kind).or_insert(0) += 1;
    }

    ReviewStats {
        category: result.category.clone(),
        total_issues: result.issues.len(),
        total_suggestions: result.suggestions.len(),
        severity_breakdown,
        kind_breakdown,
    }
}

// ============================================================================
// Reviewer
// ============================================================================

/// Runs reviews against an AI assistant using the configured categories
pub struct Reviewer {
    config: ReviewConfig,
    secret_patterns: Vec<Regex>,
}

impl Reviewer {
    pub fn new(config: ReviewConfig) -> Self {
        let secret_patterns = config
            .security_patterns
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "skipping invalid security pattern");
                    None
                }
            })
            .collect();

        Self {
            config,
            secret_patterns,
        }
    }

    pub fn supported_types(&self) -> Vec<String> {
        if self.config.enabled_types.is_empty() {
            DEFAULT_REVIEW_TYPES.iter().map(|s| s.to_string()).collect()
        } else {
            self.config.enabled_types.clone()
        }
    }

    pub fn is_valid_type(&self, category: &str) -> bool {
        self.supported_types().iter().any(|t| t == category)
    }

    fn validate_type(&self, category: &str) -> Result<(), ReviewError> {
        if self.is_valid_type(category) {
            Ok(())
        } else {
            Err(ReviewError::InvalidType {
                category: category.to_string(),
                supported: self.supported_types().join(", "),
            })
        }
    }

    /// Added lines of the diff that match a configured secret pattern
    pub fn scan_secrets(&self, diff: &str) -> Vec<ReviewItem> {
        if self.secret_patterns.is_empty() {
            return Vec::new();
        }

        diff.lines()
            .filter(|line| line.starts_with('+') && !line.starts_with("+++"))
            .filter(|line| self.secret_patterns.iter().any(|re| re.is_match(line)))
            .map(|line| ReviewItem {
                message: format!(
                    "Possible hard-coded secret: {}",
                    line[1..].trim()
                ),
                severity: Severity::Critical,
                line: None,
                file: None,
                kind: ItemKind::Issue,
            })
            .collect()
    }

    /// Review a diff for one category.
    ///
    /// Unknown categories are rejected and blank diffs short-circuit, both
    /// without contacting the assistant.
    pub async fn perform_review(
        &self,
        assistant: &mut dyn CodeAssistant,
        diff: &str,
        category: &str,
    ) -> Result<ReviewResult, ReviewError> {
        self.validate_type(category)?;

        if diff.trim().is_empty() {
            return Ok(ReviewResult::empty(category, NO_CHANGES_SUMMARY));
        }

        debug!(category, diff_len = diff.len(), "requesting analysis");
        let response =
            assistant
                .analyze(diff, category)
                .await
                .map_err(|source| ReviewError::Analysis {
                    category: category.to_string(),
                    source,
                })?;

        let mut result = parse_review_response(&response, category);

        if category == "security" {
            let mut secrets = self.scan_secrets(diff);
            if !secrets.is_empty() {
                info!(count = secrets.len(), "secret patterns matched in diff");
                secrets.append(&mut result.issues);
                result.issues = secrets;
            }
        }

        Ok(result)
    }

    /// Review several categories, skipping invalid and failing ones
    pub async fn batch_review(
        &self,
        assistant: &mut dyn CodeAssistant,
        diff: &str,
        categories: &[String],
    ) -> Vec<(String, ReviewResult)> {
        let mut results = Vec::new();

        for category in categories {
            if !self.is_valid_type(category) {
                warn!(category = %category, "skipping unsupported review type");
                continue;
            }

            match self.perform_review(assistant, diff, category).await {
                Ok(result) => results.push((category.clone(), result)),
                Err(e) => warn!(category = %category, error = %e, "review failed"),
            }
        }

        results
    }
}
