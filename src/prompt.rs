//! Prompt construction for commit messages and code analysis.

use std::fmt::Write;

use crate::config::{AiConfig, ProjectConfig};
use crate::git::DiffContext;

/// What the model should cover for each review category
const ANALYSIS_FOCUS: &[(&str, &[&str])] = &[
    (
        "security",
        &[
            "Security vulnerabilities and potential risks identified",
            "Authentication and authorization concerns",
            "Data protection and privacy considerations",
            "Input validation and sanitization recommendations",
            "Injection attack prevention measures",
            "Cryptographic and secrets management improvements",
            "Specific actionable security recommendations",
        ],
    ),
    (
        "performance",
        &[
            "Performance bottlenecks and inefficiencies detected",
            "Algorithm complexity and optimization opportunities",
            "Memory usage patterns and potential improvements",
            "Database query optimization suggestions",
            "Network and I/O operation improvements",
            "Caching strategies and resource utilization",
            "Scalability considerations and recommendations",
        ],
    ),
    (
        "style",
        &[
            "Code style and formatting consistency issues",
            "Naming convention improvements",
            "Code organization and structure suggestions",
            "Documentation and comment quality assessment",
            "Language-specific best practices recommendations",
            "Readability and maintainability improvements",
        ],
    ),
    (
        "structure",
        &[
            "Architectural design and modularity assessment",
            "Design pattern usage and recommendations",
            "Separation of concerns evaluation",
            "Dependencies and coupling analysis",
            "Error handling and exception management",
            "Code maintainability and extensibility suggestions",
            "Overall structural improvements",
        ],
    ),
];

/// Focus list for categories without a dedicated entry
const GENERIC_FOCUS: &[&str] = &[
    "Overall code quality assessment",
    "Potential bugs and issues identified",
    "Best practices and improvement recommendations",
    "Maintainability and reliability considerations",
];

const COMMIT_REQUIREMENTS: &[&str] = &[
    "Use conventional commit format if applicable",
    "Be specific about what changed",
    "Keep it under 50 characters for the subject line",
    "Focus on the 'why' and 'what', not the 'how'",
    "Do not include file names unless essential",
];

/// Everything that goes into a commit message prompt
#[derive(Debug, Clone, Copy)]
pub struct CommitRequest<'a> {
    pub diff: &'a str,
    pub files: &'a [String],
    pub branch: &'a str,
    pub extra_context: &'a str,
    pub diff_context: Option<&'a DiffContext>,
}

pub fn analysis_focus(category: &str) -> &'static [&'static str] {
    ANALYSIS_FOCUS
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, focus)| *focus)
        .unwrap_or(GENERIC_FOCUS)
}

/// Pick the context template key from the branch name
pub fn template_key_for_branch(branch: &str) -> &'static str {
    let branch = branch.to_lowercase();
    if branch.contains("bug") || branch.contains("fix") {
        "bugfix"
    } else if branch.contains("feature") || branch.contains("feat") {
        "feature"
    } else {
        "default"
    }
}

fn context_template<'a>(ai: &'a AiConfig, branch: &str) -> &'a str {
    let key = template_key_for_branch(branch);
    ai.context_templates
        .get(key)
        .or_else(|| ai.context_templates.get("default"))
        .map(String::as_str)
        .unwrap_or("")
}

pub fn build_commit_prompt(ai: &AiConfig, project: &ProjectConfig, req: &CommitRequest) -> String {
    let mut prompt = String::new();

    let template = context_template(ai, req.branch);
    if !template.is_empty() {
        let _ = writeln!(prompt, "Context: {}\n", template);
    }
    prompt.push_str(
        "Generate a concise, meaningful Git commit message based on the following changes:\n\n",
    );

    if !project.overview.is_empty() {
        let _ = writeln!(prompt, "Project: {} - {}", project.name, project.overview);
    }
    if !project.scopes.is_empty() {
        let _ = writeln!(prompt, "Allowed scopes: {}", project.scopes.join(", "));
    }
    if !req.branch.is_empty() {
        let _ = writeln!(prompt, "Branch: {}", req.branch);
    }
    if !req.files.is_empty() {
        let _ = writeln!(prompt, "Modified files: {}", req.files.join(", "));
    }
    if let Some(ctx) = req.diff_context.filter(|c| !c.key_changes.is_empty()) {
        let _ = writeln!(prompt, "Key changes: {}", ctx.key_changes.join("; "));
    }
    if !req.extra_context.is_empty() {
        let _ = writeln!(prompt, "Context: {}", req.extra_context);
    }

    prompt.push_str("\nGit diff:\n");
    prompt.push_str(req.diff);
    prompt.push_str("\n\nRequirements:");
    for requirement in COMMIT_REQUIREMENTS {
        let _ = write!(prompt, "\n- {}", requirement);
    }

    prompt
}

pub fn build_analysis_prompt(code: &str, category: &str, text_only: bool) -> String {
    let mut prompt = format!(
        "Perform {} analysis on the following code changes.\n\n",
        category
    );

    if text_only {
        prompt.push_str(
            "IMPORTANT: Provide ONLY text-based analysis and recommendations. \
             Do NOT include any code snippets, code blocks, or code examples in your response. \
             Focus on descriptive explanations, recommendations, and actionable insights.\n\n",
        );
    }

    prompt.push_str("Code changes to analyze:\n");
    prompt.push_str(code);
    prompt.push_str("\n\nPlease provide a comprehensive text-based review covering:");
    for item in analysis_focus(category) {
        let _ = write!(prompt, "\n- {}", item);
    }

    prompt.push_str(
        "\n\nFormat your response as:\
         \n1. Summary: Brief overview of findings\
         \n2. Issues: List specific problems found (if any)\
         \n3. Recommendations: Actionable improvement suggestions\
         \n4. Priority: Indicate which items should be addressed first",
    );
    if text_only {
        prompt.push_str("\n\nRemember: Use descriptive text only, no code snippets or examples.");
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(branch: &'a str, files: &'a [String]) -> CommitRequest<'a> {
        CommitRequest {
            diff: "+fn main() {}",
            files,
            branch,
            extra_context: "",
            diff_context: None,
        }
    }

    #[test]
    fn test_template_key_for_branch() {
        assert_eq!(template_key_for_branch("fix/login"), "bugfix");
        assert_eq!(template_key_for_branch("BUG-123"), "bugfix");
        assert_eq!(template_key_for_branch("feat/search"), "feature");
        assert_eq!(template_key_for_branch("main"), "default");
    }

    #[test]
    fn test_commit_prompt_uses_bugfix_template() {
        let ai = AiConfig::default();
        let prompt = build_commit_prompt(&ai, &ProjectConfig::default(), &request("fix/crash", &[]));
        assert!(prompt.starts_with("Context: Focus on describing the bug"));
        assert!(prompt.contains("Branch: fix/crash"));
        assert!(prompt.contains("Git diff:\n+fn main() {}"));
        assert!(prompt.ends_with("- Do not include file names unless essential"));
    }

    #[test]
    fn test_commit_prompt_falls_back_to_default_template() {
        let mut ai = AiConfig::default();
        ai.context_templates.remove("feature");
        let prompt = build_commit_prompt(&ai, &ProjectConfig::default(), &request("feat/x", &[]));
        assert!(prompt.starts_with("Context: This is a standard commit"));
    }

    #[test]
    fn test_commit_prompt_lists_files_and_key_changes() {
        let files = vec!["src/lib.rs".to_string(), "README.md".to_string()];
        let ctx = DiffContext {
            files: files.clone(),
            key_changes: vec!["added parser".to_string()],
        };
        let mut req = request("", &files);
        req.diff_context = Some(&ctx);
        req.extra_context = "closes #12";
        let prompt = build_commit_prompt(&AiConfig::default(), &ProjectConfig::default(), &req);
        assert!(prompt.contains("Modified files: src/lib.rs, README.md"));
        assert!(prompt.contains("Key changes: added parser"));
        assert!(prompt.contains("Context: closes #12"));
        assert!(!prompt.contains("Branch:"));
    }

    #[test]
    fn test_analysis_prompt_category_focus() {
        let prompt = build_analysis_prompt("+x", "security", true);
        assert!(prompt.starts_with("Perform security analysis"));
        assert!(prompt.contains("Injection attack prevention measures"));
        assert!(prompt.contains("Do NOT include any code snippets"));
    }

    #[test]
    fn test_analysis_prompt_generic_focus() {
        let prompt = build_analysis_prompt("+x", "docs", false);
        assert!(prompt.contains("Potential bugs and issues identified"));
        assert!(!prompt.contains("IMPORTANT"));
    }
}
