//! Human-readable reports
//!
//! Both formats apply the top-N limit per category table. The summary itself
//! always keeps full counts.

use crate::config::TopN;
use crate::stats::{Category, RankedEntry, RunSummary};
use chrono::SecondsFormat;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Formats a plain-text report
///
/// Summaries loaded from a record file carry no per-film runtime data, so
/// their average runtime is reported as unavailable.
pub fn format_text_report(summary: &RunSummary, top: TopN) -> String {
    let mut out = String::new();

    out.push_str(&format!("Census for {}\n", summary.user));
    out.push_str(&format!(
        "Scraped at: {}\n",
        summary.scraped_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    out.push_str(&format!("Films watched: {}\n", summary.items));
    if summary.failed > 0 {
        out.push_str(&format!("Films skipped (fetch failed): {}\n", summary.failed));
    }
    if summary.cancelled {
        out.push_str(&format!(
            "Run cancelled: {} of {} films processed\n",
            summary.items + summary.failed,
            summary.discovered
        ));
    }
    out.push_str(&format!(
        "Total running time: {:.2} hours ({:.2} days)\n",
        summary.hours(),
        summary.days()
    ));
    match summary.average_runtime() {
        Some(average) => out.push_str(&format!("Average runtime: {:.1} min\n", average)),
        None if summary.runtime_minutes > 0 => out.push_str("Average runtime: unavailable\n"),
        None => {}
    }

    let count_width = summary.counters.max_count().to_string().len().max(6);

    for category in Category::ALL {
        let ranked = summary.ranked(category);
        let shown = top.take(ranked.len());

        out.push('\n');
        out.push_str(&format!(
            "{} ({} distinct, showing {})\n",
            category.label(),
            ranked.len(),
            shown
        ));

        let width = ranked
            .iter()
            .take(shown)
            .map(|entry| entry.name.chars().count())
            .max()
            .unwrap_or(0);

        for (rank, entry) in ranked.iter().take(shown).enumerate() {
            out.push_str(&format!(
                "{:>4}. {:<width$}  {:>count_width$}  {:>6.2}%\n",
                rank + 1,
                entry.name,
                entry.count,
                entry.percentage,
                width = width,
                count_width = count_width
            ));
        }
    }

    out
}

/// Prints the plain-text report to stdout
pub fn print_report(summary: &RunSummary, top: TopN) {
    print!("{}", format_text_report(summary, top));
}

/// Formats a markdown report
pub fn format_markdown_report(summary: &RunSummary, top: TopN) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Film Census: {}\n\n", escape(&summary.user)));

    md.push_str("## Overview\n\n");
    md.push_str(&format!(
        "- **Scraped**: {}\n",
        summary.scraped_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    md.push_str(&format!("- **Films**: {}\n", summary.items));
    md.push_str(&format!("- **Hours**: {:.2}\n", summary.hours()));
    md.push_str(&format!("- **Days**: {:.2}\n", summary.days()));
    if summary.failed > 0 {
        md.push_str(&format!("- **Skipped**: {}\n", summary.failed));
    }
    if summary.cancelled {
        md.push_str("- **Status**: cancelled, partial results\n");
    }
    md.push('\n');

    for category in Category::ALL {
        let ranked = summary.ranked(category);
        if ranked.is_empty() {
            continue;
        }
        let shown = top.take(ranked.len());

        md.push_str(&format!("## {}\n\n", category.label()));
        md.push_str(&format!("| # | {} | Films | Share |\n", category.label()));
        md.push_str("|---|---|---|---|\n");
        for (rank, entry) in ranked.iter().take(shown).enumerate() {
            md.push_str(&markdown_row(rank + 1, entry));
        }
        if shown < ranked.len() {
            md.push_str(&format!("\n... and {} more\n", ranked.len() - shown));
        }
        md.push('\n');
    }

    md
}

/// Writes the markdown report to `output_path`
pub fn write_markdown_report(
    summary: &RunSummary,
    top: TopN,
    output_path: &Path,
) -> std::io::Result<()> {
    let markdown = format_markdown_report(summary, top);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

fn markdown_row(rank: usize, entry: &RankedEntry) -> String {
    format!(
        "| {} | {} | {} | {:.2}% |\n",
        rank,
        escape(&entry.name),
        entry.count,
        entry.percentage
    )
}

fn escape(text: &str) -> String {
    text.replace('|', "\\|")
}
