//! Terminal rendering of review results, history views and statistics.

use anyhow::Result;
use colored::{ColoredString, Colorize};
use serde::Serialize;
use std::fmt::Write;

use crate::classifier::{ReviewItem, Severity};
use crate::history::{self, HistoryEntry, HistoryStats};
use crate::review::{clean_response_text, ReviewResult};

/// Summaries shown per month in the all-entries view
const MAX_MONTH_ENTRIES: usize = 5;

/// Width of summaries in the all-entries view
const SUMMARY_WIDTH: usize = 60;

/// Upper bound on wrapped output width
const MAX_WIDTH: usize = 100;

pub fn format_error(message: &str, tip: Option<&str>) -> String {
    let mut output = format!("{} {}", "Error:".red().bold(), message);
    if let Some(tip) = tip {
        output.push('\n');
        output.push_str(&format!("{} {}", "Tip:".blue().bold(), tip));
    }
    output
}

/// Process inline markdown: `code`, **bold**, *italic*
pub fn render_inline_markdown(text: &str) -> String {
    let mut result = String::new();
    let mut chars = text.chars().peekable();

    // Collect up to the closing delimiter, consuming it
    fn take_until(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, end: char) -> String {
        let mut taken = String::new();
        for c in chars.by_ref() {
            if c == end {
                break;
            }
            taken.push(c);
        }
        taken
    }

    while let Some(c) = chars.next() {
        match c {
            '`' => result.push_str(&take_until(&mut chars, '`').cyan().to_string()),
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                let bold = take_until(&mut chars, '*');
                if chars.peek() == Some(&'*') {
                    chars.next();
                }
                result.push_str(&bold.bold().to_string());
            }
            '*' => result.push_str(&take_until(&mut chars, '*').italic().to_string()),
            _ => result.push(c),
        }
    }

    result
}

fn severity_label(severity: Severity) -> ColoredString {
    let label = format!("[{}]", severity.to_string().to_uppercase());
    match severity {
        Severity::Critical => label.red().bold(),
        Severity::High => label.red(),
        Severity::Medium => label.yellow(),
        Severity::Low => label.dimmed(),
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn write_item_location(out: &mut String, item: &ReviewItem) {
    if let Some(line) = item.line {
        let _ = writeln!(out, "     {} {}", "Line:".blue(), line);
    }
    if let Some(file) = &item.file {
        let _ = writeln!(out, "     {} {}", "File:".blue(), file);
    }
}

/// Colored report for one review category
pub fn render_review(result: &ReviewResult) -> String {
    let width = textwrap::termwidth().min(MAX_WIDTH);
    let mut out = String::new();

    let _ = writeln!(
        out,
        "\n{} {}",
        "●".cyan(),
        format!("{} Review Results", title_case(&result.category)).bold()
    );
    let _ = writeln!(out, "{}", "=".repeat(50).dimmed());

    if !result.issues.is_empty() {
        let _ = writeln!(
            out,
            "\n{} {}",
            "▸".red(),
            format!("Issues Found ({})", result.issues.len()).red().bold()
        );
        for (i, issue) in result.issues.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {}. {} {}",
                i + 1,
                severity_label(issue.severity),
                render_inline_markdown(&clean_response_text(&issue.message))
            );
            write_item_location(&mut out, issue);
        }
    }

    if !result.suggestions.is_empty() {
        let _ = writeln!(
            out,
            "\n{} {}",
            "▸".green(),
            format!("Suggestions ({})", result.suggestions.len())
                .green()
                .bold()
        );
        for (i, suggestion) in result.suggestions.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {}. {}",
                i + 1,
                render_inline_markdown(&clean_response_text(&suggestion.message))
            );
            write_item_location(&mut out, suggestion);
        }
    }

    if result.is_clean() {
        let _ = writeln!(
            out,
            "\n{} {}",
            "✓".green(),
            "No specific issues or suggestions found.".green()
        );
    }

    let _ = writeln!(out, "\n{} {}", "▸".blue(), "Summary".blue().bold());
    for line in clean_response_text(&result.summary).lines() {
        let processed = render_inline_markdown(line);
        for wrapped in textwrap::wrap(&processed, width.saturating_sub(2)) {
            let _ = writeln!(out, "  {}", wrapped);
        }
    }

    out
}

/// Entries of one month grouped by day, each day numbered from 1
pub fn render_month_view(month_year: &str, entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return format!("No work history found for {}\n", month_year);
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "\n{} {}",
        "●".cyan(),
        format!("Work History for {}", month_year).bold()
    );
    let _ = writeln!(out, "{}", "=".repeat(50).dimmed());

    for (date, day_entries) in history::group_by_date(entries) {
        let _ = writeln!(out, "\n{} {}", "▸".blue(), date.blue().bold());
        for (i, entry) in day_entries.iter().enumerate() {
            let _ = writeln!(out, "   {}. {}", i + 1, entry.summary);
        }
    }

    let _ = writeln!(out, "\n{} {}", "Total commits:".bold(), entries.len());
    out
}

/// Every entry grouped by month, long months cut short
pub fn render_all_history(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "No work history found.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "\n{} {}", "●".cyan(), "Complete Work History".bold());
    let _ = writeln!(out, "{}", "=".repeat(50).dimmed());

    for (month, month_entries) in history::group_by_month(entries) {
        let _ = writeln!(
            out,
            "\n{} {} {}",
            "▸".blue(),
            month.blue().bold(),
            format!("({} commits)", month_entries.len()).dimmed()
        );
        for entry in month_entries.iter().take(MAX_MONTH_ENTRIES) {
            let _ = writeln!(
                out,
                "   • {}",
                history::truncate_summary(&entry.summary, SUMMARY_WIDTH)
            );
        }
        if month_entries.len() > MAX_MONTH_ENTRIES {
            let _ = writeln!(
                out,
                "   {}",
                format!("... and {} more", month_entries.len() - MAX_MONTH_ENTRIES).dimmed()
            );
        }
    }

    let _ = writeln!(out, "\n{} {}", "Total commits:".bold(), entries.len());
    out
}

pub fn render_stats(stats: &HistoryStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{} {}", "●".magenta(), "CodeGenius Statistics".bold());
    let _ = writeln!(out, "{}", "=".repeat(30).dimmed());

    if stats.total_commits == 0 {
        let _ = writeln!(out, "{}", "No commits recorded yet.".dimmed());
        return out;
    }

    let _ = writeln!(out, "{} {}", "Total commits:".blue().bold(), stats.total_commits);
    if !stats.most_active_month.is_empty() {
        let _ = writeln!(
            out,
            "{} {}",
            "Most active month:".blue().bold(),
            stats.most_active_month
        );
    }

    let _ = writeln!(out, "\n{} {}", "▸".magenta(), "Monthly breakdown".magenta().bold());
    let mut months: Vec<(&String, &usize)> = stats.monthly_breakdown.iter().collect();
    months.sort_by(|(a, _), (b, _)| history::compare_month_labels(a, b));
    for (month, count) in months {
        let _ = writeln!(out, "  {}: {} commits", month, count);
    }

    out
}

/// Commit message draft shown before asking what to do with it
pub fn render_commit_message(message: &str) -> String {
    let mut out = format!("\n{} {}\n", "▸".green(), "Generated commit message".green().bold());
    for line in message.lines() {
        let _ = writeln!(out, "  {}", line.bright_white());
    }
    out
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ItemKind;

    fn plain() {
        colored::control::set_override(false);
    }

    fn entry(date: &str, summary: &str) -> HistoryEntry {
        HistoryEntry {
            date: date.to_string(),
            summary: summary.to_string(),
        }
    }

    #[test]
    fn test_format_error_with_tip() {
        plain();
        let msg = format_error("not a git repository", Some("run inside a repo"));
        assert_eq!(msg, "Error: not a git repository\nTip: run inside a repo");
    }

    #[test]
    fn test_format_error_without_tip() {
        plain();
        assert_eq!(format_error("boom", None), "Error: boom");
    }

    #[test]
    fn test_render_inline_markdown_strips_markers() {
        plain();
        assert_eq!(
            render_inline_markdown("use `Vec` for **speed** and *clarity*"),
            "use Vec for speed and clarity"
        );
        assert_eq!(render_inline_markdown("unclosed `tick"), "unclosed tick");
    }

    #[test]
    fn test_render_review_lists_items() {
        plain();
        let result = ReviewResult {
            category: "security".to_string(),
            summary: "One problem found.".to_string(),
            issues: vec![ReviewItem {
                message: "Critical issue: SQL injection in db.go line 42".to_string(),
                severity: Severity::Critical,
                line: Some(42),
                file: Some("db.go".to_string()),
                kind: ItemKind::Issue,
            }],
            suggestions: vec![],
        };
        let out = render_review(&result);
        assert!(out.contains("Security Review Results"));
        assert!(out.contains("Issues Found (1)"));
        assert!(out.contains("1. [CRITICAL] Critical issue: SQL injection"));
        assert!(out.contains("Line: 42"));
        assert!(out.contains("File: db.go"));
        assert!(!out.contains("Suggestions ("));
        assert!(out.contains("One problem found."));
    }

    #[test]
    fn test_render_review_clean_result() {
        plain();
        let out = render_review(&ReviewResult::empty("style", "No changes to review."));
        assert!(out.contains("No specific issues or suggestions found."));
    }

    #[test]
    fn test_render_month_view_numbers_each_day() {
        plain();
        let entries = vec![
            entry("20 Dec 2024", "fix: b"),
            entry("15 Dec 2024", "feat: a"),
            entry("20 Dec 2024", "fix: c"),
        ];
        let out = render_month_view("Dec 2024", &entries);
        let first_day = out.find("15 Dec 2024").unwrap();
        let second_day = out.find("20 Dec 2024").unwrap();
        assert!(first_day < second_day);
        assert!(out.contains("   1. fix: b\n   2. fix: c"));
        assert!(out.contains("Total commits: 3"));
    }

    #[test]
    fn test_render_month_view_empty() {
        plain();
        assert_eq!(
            render_month_view("Jan 2020", &[]),
            "No work history found for Jan 2020\n"
        );
    }

    #[test]
    fn test_render_all_history_caps_month() {
        plain();
        let mut entries: Vec<HistoryEntry> = (1..=7)
            .map(|d| entry(&format!("{d:02} Mar 2024"), &format!("commit {d}")))
            .collect();
        entries.push(entry("01 Apr 2024", &"x".repeat(80)));
        let out = render_all_history(&entries);
        assert!(out.contains("Mar 2024 (7 commits)"));
        assert!(out.contains("• commit 5"));
        assert!(!out.contains("• commit 6"));
        assert!(out.contains("... and 2 more"));
        assert!(out.contains(&format!("• {}...", "x".repeat(57))));
        assert!(out.find("Mar 2024").unwrap() < out.find("Apr 2024").unwrap());
    }

    #[test]
    fn test_render_stats_orders_months_chronologically() {
        plain();
        let mut stats = HistoryStats {
            total_commits: 3,
            most_active_month: "Dec 2024".to_string(),
            ..Default::default()
        };
        stats.monthly_breakdown.insert("Jan 2025".to_string(), 1);
        stats.monthly_breakdown.insert("Dec 2024".to_string(), 2);
        let out = render_stats(&stats);
        assert!(out.contains("Total commits: 3"));
        assert!(out.contains("Most active month: Dec 2024"));
        assert!(out.find("Dec 2024: 2 commits").unwrap() < out.find("Jan 2025: 1 commits").unwrap());
    }

    #[test]
    fn test_render_stats_empty() {
        plain();
        let out = render_stats(&HistoryStats::default());
        assert!(out.contains("No commits recorded yet."));
    }
}
