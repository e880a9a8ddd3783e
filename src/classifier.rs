//! Line classification for free-text review responses.
//!
//! The policy lives in the keyword tables below so it can be tuned without
//! touching the control flow. Everything here is a plain function of its input.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

// ============================================================================
// Policy tables
// ============================================================================

/// Substrings (lowercase) that mark a line as describing an issue
pub const ISSUE_KEYWORDS: &[&str] = &[
    "issue",
    "problem",
    "error",
    "bug",
    "vulnerability",
    "risk",
    "concern",
    "dangerous",
    "unsafe",
    "insecure",
    "critical",
    "warning",
];

/// Substrings (lowercase) that mark a line as a suggestion
pub const SUGGESTION_KEYWORDS: &[&str] = &[
    "suggest",
    "recommend",
    "consider",
    "improve",
    "optimize",
    "better",
    "should",
    "could",
    "might",
    "enhancement",
    "refactor",
];

/// Severity tiers, checked in order. The first tier with a hit wins.
pub const SEVERITY_TIERS: &[(Severity, &[&str])] = &[
    (Severity::Critical, &["critical", "severe"]),
    (Severity::High, &["high", "major"]),
    (Severity::Medium, &["medium", "moderate"]),
    (Severity::Low, &["low", "minor"]),
];

/// Fence marker for code blocks in markdown responses
pub const FENCE: &str = "```";

/// Lowercase tokens that make a line look like source code
const CODE_TOKENS: &[&str] = &[
    "func ", "class ", "def ", "import ", "from ", "package ", "use ", "if (", "for (", "while (",
    "switch (", "try {", "catch (", "=>", "->", "::", "&&", "||", "!=", "===", "!==",
];

// ASCII classes only: non-Latin digits and letters never count
static LINE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i-u)line\s+([0-9]+)").unwrap());

static FILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u)(?:in|file)\s+([A-Za-z0-9_\-./]+\.[A-Za-z0-9]+)").unwrap()
});

// ============================================================================
// Types
// ============================================================================

/// How serious a review item is
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::High => write!(f, "high"),
            Severity::Medium => write!(f, "medium"),
            Severity::Low => write!(f, "low"),
        }
    }
}

/// Which list a review item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Issue,
    Suggestion,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Issue => write!(f, "issue"),
            ItemKind::Suggestion => write!(f, "suggestion"),
        }
    }
}

/// A single classified line from a review response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewItem {
    /// The full (trimmed) line
    pub message: String,
    pub severity: Severity,
    /// Line number mentioned in the text, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// File name mentioned in the text, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub kind: ItemKind,
}

/// Result of classifying one line. Both flags may be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineClass {
    pub is_issue: bool,
    pub is_suggestion: bool,
}

// ============================================================================
// Classification
// ============================================================================

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

pub fn is_issue_line(line: &str) -> bool {
    contains_any(line, ISSUE_KEYWORDS)
}

pub fn is_suggestion_line(line: &str) -> bool {
    contains_any(line, SUGGESTION_KEYWORDS)
}

pub fn classify_line(line: &str) -> LineClass {
    LineClass {
        is_issue: is_issue_line(line),
        is_suggestion: is_suggestion_line(line),
    }
}

/// Severity by keyword, falling back to medium
pub fn extract_severity(text: &str) -> Severity {
    let lower = text.to_lowercase();
    SEVERITY_TIERS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(severity, _)| *severity)
        .unwrap_or_default()
}

/// First number following "line", e.g. "line 42". "line 0" counts as no line.
pub fn extract_line_number(text: &str) -> Option<u32> {
    LINE_NUMBER_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .filter(|n| *n > 0)
}

/// First file name with an extension following "in" or "file"
pub fn extract_file(text: &str) -> Option<String> {
    FILE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Heuristic check for lines that look like source code rather than prose.
///
/// Loose on purpose: a prose line containing "because " matches the
/// `use ` token and is treated as code.
pub fn is_code_like(line: &str) -> bool {
    if line.trim().starts_with(FENCE) {
        return true;
    }

    if contains_any(line, CODE_TOKENS) {
        return true;
    }

    if line.contains('{') && line.contains('}') {
        return true;
    }

    if line.starts_with("    ") || line.starts_with('\t') {
        if line.contains('(') && line.contains(')') {
            return true;
        }
        if line.contains('=') && (line.contains(';') || line.contains('{')) {
            return true;
        }
    }

    false
}

/// Build a review item from a line, extracting severity, line and file
pub fn build_item(line: &str, kind: ItemKind) -> ReviewItem {
    ReviewItem {
        message: line.to_string(),
        severity: extract_severity(line),
        line: extract_line_number(line),
        file: extract_file(line),
        kind,
    }
}
