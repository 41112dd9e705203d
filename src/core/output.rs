//! Terminal rendering for run reports.
//!
//! Text output goes to stdout for humans; `--format json` prints the same
//! report through serde instead.

use crate::core::error::RegistryError;
use crate::core::pipeline::RunReport;
use colored::Colorize;
use serde::Serialize;

const RULE_WIDTH: usize = 80;
const REJECTION_PREVIEW_ITEMS: usize = 3;
const REJECTION_PREVIEW_CHARS: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Collapse newlines/extra whitespace and bound length for terminal display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

/// Render up to `max_items` messages with compact formatting.
pub fn preview_messages(messages: &[String], max_items: usize, max_chars: usize) -> String {
    if messages.is_empty() {
        return String::new();
    }
    let shown = messages
        .iter()
        .take(max_items)
        .map(|m| compact_line(m, max_chars))
        .collect::<Vec<_>>()
        .join(" | ");
    if messages.len() > max_items {
        format!("{} (+{} more)", shown, messages.len() - max_items)
    } else {
        shown
    }
}

pub fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), RegistryError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One-line status for a merged project, e.g. `+3 new, 2 duplicates skipped`.
pub fn project_status(added: usize, duplicates: usize) -> String {
    if duplicates > 0 {
        format!("+{} new, {} duplicates skipped", added, duplicates)
    } else {
        format!("{} scripts", added)
    }
}

/// Short preview of rejected entries for the summary block.
pub fn rejection_preview(report: &RunReport) -> String {
    preview_messages(
        &report.counters.rejections,
        REJECTION_PREVIEW_ITEMS,
        REJECTION_PREVIEW_CHARS,
    )
}

pub fn print_run_report(report: &RunReport, format: OutputFormat) -> Result<(), RegistryError> {
    if format == OutputFormat::Json {
        return print_json(report);
    }

    println!("{}", rule().bright_black());
    println!("{} {}", "Results by project:".bright_white().bold(), report.command.bright_cyan());
    println!("{}", rule().bright_black());
    for project in &report.projects {
        let scripts: usize = project.by_protocol.values().sum();
        println!(
            "\n{} {} ({} scripts) {} {}",
            "###".bright_black(),
            project.project_name.bright_white().bold(),
            scripts,
            "->".bright_black(),
            project.file
        );
        for (pv, count) in &project.by_protocol {
            println!("  Protocol V{}: {} scripts", pv, count);
        }
        match (&project.error, project.written) {
            (Some(err), _) => println!(
                "  {} {} ({})",
                "✗".bright_red(),
                project.file,
                compact_line(err, 120).bright_red()
            ),
            (None, true) => println!(
                "  {} {} ({}) {}",
                "✓".bright_green(),
                project.file,
                project_status(project.added, project.duplicates),
                format!(
                    "hash: {}",
                    project.content_hash.as_deref().map(|h| &h[..8.min(h.len())]).unwrap_or("-")
                )
                .bright_black()
            ),
            (None, false) => println!(
                "  {} {} (unchanged, {} duplicates skipped)",
                "•".bright_black(),
                project.file,
                project.duplicates
            ),
        }
    }

    let c = &report.counters;
    println!("\n{}", rule().bright_black());
    println!("{}", "Summary:".bright_white().bold());
    println!("- Total contracts processed: {}", c.processed);
    println!("- Not found in database: {}", c.not_found);
    println!("- Skipped (non-PLUTUS): {}", c.skipped_non_plutus);
    if c.rejected > 0 {
        println!("- Rejected (malformed input): {}", c.rejected.to_string().bright_yellow());
        println!("  {}", rejection_preview(report).bright_black());
    }
    println!("- Files written: {}", report.files_written);
    if report.write_failures > 0 {
        println!("- Write failures: {}", report.write_failures.to_string().bright_red());
    }
    if report.metadata_saved {
        println!("- Metadata mapping updated");
    }
    if report.is_suspicious() {
        println!(
            "{} {} input entries but nothing was accepted",
            "⚠".bright_yellow(),
            report.inputs
        );
    }
    println!("{}", rule().bright_black());
    Ok(())
}
