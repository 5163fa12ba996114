//! Markdown review sheet generation
//!
//! This module renders a ledger as a human-readable sheet a curator can
//! review: run metadata, totals, then one table per curation status.

use crate::ledger::{Ledger, LinkStatus};
use crate::output::stats::ledger_statistics;
use crate::storage::write_atomic;
use std::path::Path;

/// Writes the review sheet for a ledger
///
/// # Arguments
///
/// * `ledger` - The ledger to render
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the sheet
/// * `Err(io::Error)` - Failed to write the sheet
pub fn write_review_sheet(ledger: &Ledger, output_path: &Path) -> std::io::Result<()> {
    let markdown = format_review_sheet(ledger);
    write_atomic(output_path, markdown.as_bytes())
}

/// Formats a ledger as a markdown review sheet
pub fn format_review_sheet(ledger: &Ledger) -> String {
    let stats = ledger_statistics(ledger);
    let mut md = String::new();

    md.push_str(&format!("# Link Ledger: {}\n\n", stats.site_id));

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Seed URL**: {}\n", stats.seed_url));
    md.push_str(&format!("- **Discovery Runs**: {}\n", stats.runs));
    md.push_str(&format!("- **First Run**: {}\n", stats.first_run.to_rfc3339()));
    md.push_str(&format!("- **Latest Run**: {}\n", stats.last_run.to_rfc3339()));
    if let Some(termination) = stats.termination {
        md.push_str(&format!("- **Latest Run Ended**: {}\n", termination));
    }
    md.push_str(&format!("- **Pages Scanned**: {}\n", stats.pages_scanned));
    if let Some(hash) = &ledger.metadata.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    md.push_str("## Totals\n\n");
    md.push_str("| Status | Count |\n");
    md.push_str("|--------|-------|\n");
    for status in LinkStatus::all() {
        md.push_str(&format!("| {} | {} |\n", status, stats.status_count(status)));
    }
    md.push_str(&format!("| **total** | {} |\n\n", stats.total_links));

    for status in LinkStatus::all() {
        let entries = ledger.load(&[status]);
        if entries.is_empty() {
            continue;
        }

        md.push_str(&format!("## {} ({})\n\n", title(status), entries.len()));
        md.push_str("| URL | Type | Method | Found On | Notes |\n");
        md.push_str("|-----|------|--------|----------|-------|\n");
        for link in entries {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                escape_cell(link.url.as_str()),
                link.link_type,
                link.discovery_method,
                escape_cell(link.source_page.as_str()),
                escape_cell(&link.notes)
            ));
        }
        md.push('\n');
    }

    if !ledger.failed_pages().is_empty() {
        md.push_str("## Failed Fetches (latest run)\n\n");
        md.push_str("| URL | Outcome | Status | Attempts |\n");
        md.push_str("|-----|---------|--------|----------|\n");
        for failure in ledger.failed_pages() {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                escape_cell(failure.url.as_str()),
                failure.outcome,
                failure
                    .status_code
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                failure.attempts
            ));
        }
        md.push('\n');
    }

    md
}

fn title(status: LinkStatus) -> &'static str {
    match status {
        LinkStatus::Pending => "Pending Review",
        LinkStatus::Keep => "Keep",
        LinkStatus::Skip => "Skip",
    }
}

/// Keeps a value inside one table cell
fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|").replace(['\r', '\n'], " ")
}
