//! Report rendering.
//!
//! Turns a [`QueryReport`] into the text shown in the terminal, or into
//! JSON for scripting.

use crate::analysis::{cost_range, format_currency, group_by_file};
use crate::models::{
    AggregationOutcome, CostSummary, ExtractionOutcome, FileFailure, ItemCost, QueryOutcome,
    QueryReport, Record,
};
use anyhow::Result;

/// Generate the human-readable report.
pub fn generate_text_report(report: &QueryReport) -> String {
    let mut output = String::new();

    output.push_str(&generate_header(report));

    match &report.outcome {
        QueryOutcome::Extraction(outcome) => output.push_str(&generate_extraction_section(outcome)),
        QueryOutcome::CostAnalysis(outcome) => {
            output.push_str(&generate_cost_analysis_section(outcome))
        }
        QueryOutcome::Halted { task, message } => {
            output.push_str(&format!("Query halted (task {:?}): {}\n", task, message));
        }
        QueryOutcome::Failed { kind, message } => {
            output.push_str(&format!("Query failed [{}]: {}\n", kind, message));
        }
    }

    output.push_str(&format!(
        "\nAnswered in {:.1}s\n",
        report.duration_seconds
    ));

    output
}

fn generate_header(report: &QueryReport) -> String {
    let mut header = String::new();

    header.push_str(&format!("Query: {}\n", report.query));
    if let Some(ref task) = report.task {
        header.push_str(&format!("Task: {}\n", task));
    }
    header.push_str(&format!(
        "Generated: {}\n\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    header
}

fn generate_extraction_section(outcome: &ExtractionOutcome) -> String {
    match outcome {
        ExtractionOutcome::NoRelatedItems { keyword, file_name } => {
            format!("{} has no directly related items in {}\n", keyword, file_name)
        }
        ExtractionOutcome::NoSubItems { keyword, file_name } => {
            format!("No sub-items found for {} in {}\n", keyword, file_name)
        }
        ExtractionOutcome::Items {
            keyword,
            file_name,
            records,
        } => {
            let mut section = String::new();
            section.push_str(&format!(
                "Sub-items of {} in {} ({} records)\n\n",
                keyword,
                file_name,
                records.len()
            ));
            section.push_str(&generate_record_table(records));
            section
        }
    }
}

/// Render records as an aligned table.
fn generate_record_table(records: &[Record]) -> String {
    const HEADERS: [&str; 4] = ["ID", "NAME", "SPEC", "COST"];

    let rows: Vec<[&str; 4]> = records
        .iter()
        .map(|r| [r.id.as_str(), r.name.as_str(), r.spec.as_str(), r.cost.as_str()])
        .collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut table = String::new();
    table.push_str(&format_row(&HEADERS, &widths));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    table.push_str(&format!("{}\n", rule.join("  ")));
    for row in &rows {
        table.push_str(&format_row(row, &widths));
    }
    table
}

fn format_row(cells: &[&str; 4], widths: &[usize; 4]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths.iter())
        .enumerate()
        .map(|(i, (cell, width))| {
            let pad = width.saturating_sub(cell.chars().count());
            // Right-align the cost column.
            if i == 3 {
                format!("{}{}", " ".repeat(pad), cell)
            } else {
                format!("{}{}", cell, " ".repeat(pad))
            }
        })
        .collect();
    format!("{}\n", padded.join("  ").trim_end())
}

fn generate_cost_analysis_section(outcome: &AggregationOutcome) -> String {
    match outcome {
        AggregationOutcome::NoCostData {
            keyword,
            files_scanned,
            failures,
        } => {
            let mut section = format!(
                "No valid cost data found for {} ({} files scanned)\n",
                keyword, files_scanned
            );
            section.push_str(&generate_failures_section(failures));
            section
        }
        AggregationOutcome::Summary {
            keyword,
            files_scanned,
            files_with_data,
            summary,
            items,
            failures,
        } => {
            let mut section = String::new();
            section.push_str(&format!("Average cost of {}\n\n", keyword));
            section.push_str(&generate_summary_lines(
                summary,
                files_with_data.len(),
                *files_scanned,
            ));
            section.push_str(&generate_items_section(items));
            section.push_str(&generate_failures_section(failures));
            section
        }
    }
}

fn generate_summary_lines(summary: &CostSummary, with_data: usize, scanned: usize) -> String {
    let mut lines = String::new();

    lines.push_str(&format!("  Files with data: {} of {}\n", with_data, scanned));
    lines.push_str(&format!("  Items:           {}\n", summary.item_count));
    lines.push_str(&format!(
        "  Average cost:    {}\n",
        format_currency(summary.average)
    ));
    lines.push_str(&format!(
        "  Total cost:      {}\n",
        format_currency(summary.total)
    ));

    lines
}

fn generate_items_section(items: &[ItemCost]) -> String {
    let mut section = String::new();

    if let Some((min, max)) = cost_range(items) {
        if items.len() > 1 {
            section.push_str(&format!(
                "  Range:           {} ({} {}) to {} ({} {})\n",
                format_currency(min.cost),
                min.file_name,
                min.id,
                format_currency(max.cost),
                max.file_name,
                max.id
            ));
        }
    }

    section.push('\n');
    for (file_name, file_items) in group_by_file(items) {
        section.push_str(&format!("{}\n", file_name));
        for item in file_items {
            section.push_str(&format!(
                "  {:<10} {:<30} {:>15}\n",
                item.id,
                item.name,
                format_currency(item.cost)
            ));
        }
    }

    section
}

fn generate_failures_section(failures: &[FileFailure]) -> String {
    if failures.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str(&format!("\n{} files could not be analysed:\n", failures.len()));
    for failure in failures {
        section.push_str(&format!(
            "  {} [{}]: {}\n",
            failure.file_name, failure.kind, failure.message
        ));
    }
    section
}

/// Generate a JSON report.
pub fn generate_json_report(report: &QueryReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
