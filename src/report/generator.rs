//! Report rendering.
//!
//! This module renders the aggregate built by the traversal as a
//! human-readable text report or as JSON.

use crate::models::{AggregateReport, AnswerOutcome, ReportMetadata, TemplateSummary};
use anyhow::Result;

/// Generate the complete text report.
pub fn generate_text_report(report: &AggregateReport) -> String {
    let mut output = String::new();

    output.push_str("QTally Report\n");
    output.push_str("=============\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));

    if report.aborted {
        output.push_str("The template list could not be retrieved; no answers were fetched.\n");
        return output;
    }

    if report.entries.is_empty() {
        output.push_str("No templates found.\n");
    } else {
        for entry in &report.entries {
            output.push_str(&generate_entry_line(entry));
        }
    }

    output.push_str(&generate_totals_section(report));

    output
}

/// Generate the metadata header.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str(&format!("Base URL:   {}\n", metadata.base_url));
    section.push_str(&format!("Variant:    {}\n", metadata.variant));
    section.push_str(&format!(
        "Fetched at: {}\n\n",
        metadata.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    section
}

/// Generate the line (plus optional sample line) for one template.
fn generate_entry_line(entry: &TemplateSummary) -> String {
    match &entry.outcome {
        AnswerOutcome::Fetched { count, sample } => {
            let noun = if *count == 1 { "answer" } else { "answers" };
            let mut line = format!("  {} (id {}): {} {}\n", entry.name, entry.id, count, noun);
            if let Some(sample) = sample {
                line.push_str(&format!("    sample: {}\n", sample));
            }
            line
        }
        AnswerOutcome::Failed { reason } => {
            format!(
                "  {} (id {}): fetch failed ({})\n",
                entry.name, entry.id, reason
            )
        }
    }
}

/// Generate the totals footer.
fn generate_totals_section(report: &AggregateReport) -> String {
    let mut section = String::new();

    section.push('\n');
    section.push_str(&format!(
        "Templates:     {} ({} failed, {} skipped)\n",
        report.entries.len(),
        report.failed_count(),
        report.skipped
    ));
    section.push_str(&format!("Total answers: {}\n", report.answer_total()));

    section
}

/// Generate a JSON report.
pub fn generate_json_report(report: &AggregateReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
