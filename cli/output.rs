use anyhow::{Context, Result};
use byte_unit::{Byte, UnitType};
use colored::*;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use serde::Serialize;
use std::error::Error;
use std::io::{self, Write};
use std::path::Path;

use crate::cli_args::FormatOutputOpts;
use code2doc_core::{DocumentReport, FileStat, SelectionResult};

/// Prints `data` as JSON or YAML when a format was requested, otherwise the
/// plain text rendering (or pretty JSON when there is none).
pub fn print_data_or_text<T: Serialize>(
    data: &T,
    plain_text: Option<String>,
    format_opts: &FormatOutputOpts,
) -> Result<()> {
    match (format_opts.format.as_deref(), plain_text) {
        (Some(format), _) => write_to_stdout(&serialize_output(data, format)?),
        (None, Some(text)) => write_to_stdout(&text),
        (None, None) => write_to_stdout(&serialize_output(data, "json")?),
    }
}

fn serialize_output<T: Serialize>(data: &T, format: &str) -> Result<String> {
    match format.to_lowercase().as_str() {
        "yaml" | "yml" => serde_yml::to_string(data).context("Failed to serialize as YAML"),
        _ => serde_json::to_string_pretty(data).context("Failed to serialize as JSON"),
    }
}

pub fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write newline to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

/// Asks before replacing `path`. In quiet mode there is no prompt, so an
/// existing file is an error.
pub fn confirm_overwrite(path: &Path, quiet: bool) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    if quiet {
        anyhow::bail!(
            "Target file '{}' exists. Overwrite prevented in quiet mode.",
            path.display()
        );
    }
    print!(
        "{} File already exists at '{}'. Overwrite? [{}/{}] ",
        "⚠️".yellow(),
        path.display().to_string().cyan(),
        "y".green(),
        "N".red()
    );
    io::stdout().flush().context("Failed to flush stdout")?;
    let mut response = String::new();
    io::stdin()
        .read_line(&mut response)
        .context("Failed to read user input")?;
    Ok(response.trim().eq_ignore_ascii_case("y"))
}

pub fn human_size(bytes: u64) -> String {
    Byte::from_u128(bytes as u128)
        .unwrap_or_default()
        .get_appropriate_unit(UnitType::Binary)
        .to_string()
}

fn stats_table(files: &[FileStat]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Path").fg(Color::Green),
        Cell::new("Code").fg(Color::Green),
        Cell::new("Comment").fg(Color::Green),
        Cell::new("Blank").fg(Color::Green),
    ]);
    for file in files {
        table.add_row(vec![
            Cell::new(&file.path).fg(Color::Cyan),
            Cell::new(file.code).set_alignment(CellAlignment::Right),
            Cell::new(file.comment)
                .set_alignment(CellAlignment::Right)
                .fg(Color::DarkGrey),
            Cell::new(file.blank)
                .set_alignment(CellAlignment::Right)
                .fg(Color::DarkGrey),
        ]);
    }
    table
}

fn print_total(label: &str, value: impl ToString) {
    println!("{:<26} {}", label.green(), value.to_string().cyan());
}

pub fn print_selection_report(selection: &SelectionResult) {
    println!();
    println!("{}", " Selected Files ".green().bold().underline());
    if selection.selected_files.is_empty() {
        println!("{}", "(No files selected)".yellow());
    } else {
        println!("{}", stats_table(&selection.selected_files));
    }
    println!();
    print_total("Files:", selection.file_count());
    print_total("Code lines:", selection.total_code);
    print_total("Comment lines:", selection.total_comment);
    print_total("Blank lines:", selection.total_blank);
    print_total(
        "Estimated document lines:",
        selection.estimated_document_lines(),
    );
    println!();
}

pub fn print_stats_report(stats: &[FileStat]) {
    println!();
    println!("{}", " Counted Files ".green().bold().underline());
    if stats.is_empty() {
        println!("{}", "(No files counted)".yellow());
        return;
    }
    println!("{}", stats_table(stats));
    println!();
    print_total("Files:", stats.len());
    print_total("Code lines:", stats.iter().map(|s| s.code).sum::<u64>());
    print_total("Comment lines:", stats.iter().map(|s| s.comment).sum::<u64>());
    print_total("Blank lines:", stats.iter().map(|s| s.blank).sum::<u64>());
    println!();
}

pub fn print_no_files() {
    println!(
        "{} No countable source files found. Check the directory and the ignore rules.",
        "ℹ️".blue()
    );
}

pub fn print_shortfall(selection: &SelectionResult) {
    println!();
    println!("{} {}", "⚠️".yellow(), "Not enough code lines found".yellow().bold());
    println!("{}", "-".repeat(40).dimmed());
    print_total("Target lines:", selection.target);
    print_total("Available lines:", selection.total_code);
    println!("{}", "-".repeat(40).dimmed());
    println!("Lower --min-lines or check the repository and ignore rules.");
}

/// Joins an error with its sources, like anyhow's `{:#}`.
fn error_chain(err: &dyn Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(&format!(": {}", cause));
        source = cause.source();
    }
    text
}

pub fn print_document_report(report: &DocumentReport) {
    println!();
    println!(
        "{} Document written to: {}",
        "✅".green(),
        report.output_path.display().to_string().blue()
    );
    print_total("Paragraphs:", report.paragraphs);
    print_total("Files included:", report.files_written);
    print_total("Size:", human_size(report.bytes));

    if !report.failures.is_empty() {
        println!();
        println!(
            "{} {} file(s) could not be read and were skipped:",
            "⚠️".yellow(),
            report.failures.len()
        );
        for failure in &report.failures {
            println!("  - {}: {}", failure.path.cyan(), error_chain(&failure.error));
        }
    }
    println!();
    println!(
        "{} Review the document for sensitive data (passwords, keys, IP addresses) before sharing it.",
        "⚠️".yellow()
    );
}
