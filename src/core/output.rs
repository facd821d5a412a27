use std::fs;
use std::path::Path;

use colored::{ColoredString, Colorize};

use crate::core::error::PotcheckError;
use crate::core::outcome::ResultKind;
use crate::core::platform::{AggregateReport, Stats, TestRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jsonl,
    Markdown,
}

fn plain_label(kind: ResultKind) -> &'static str {
    match kind {
        ResultKind::Ok => "OK",
        ResultKind::Warning => "WARNING",
        ResultKind::Unknown => "UNKNOWN",
        ResultKind::NotApplicable => "NOT APPLICABLE",
    }
}

fn colored_label(kind: ResultKind) -> ColoredString {
    match kind {
        ResultKind::Ok => "[OK]".green(),
        ResultKind::Warning => "[WARNING]".red(),
        ResultKind::Unknown => "[UNKNOWN]".yellow(),
        ResultKind::NotApplicable => "[NOT APPLICABLE]".blue(),
    }
}

pub fn print_header() {
    println!("{}", "-".repeat(80));
    println!(
        "{:40} {:25} {:<10}\n",
        "Test Name:".magenta(),
        "  Test Result:".magenta(),
        "KP:".magenta()
    );
}

pub fn print_record(record: &TestRecord, doc_link: &str) {
    println!(
        "{:40} {:^25} {:>+10}",
        record.name,
        colored_label(record.kind),
        record.karma
    );
    println!("\n> {}", record.report);

    if matches!(record.kind, ResultKind::Warning | ResultKind::Unknown) {
        println!(
            ">>> {}\n\t{}",
            "For further details please refer to:".yellow(),
            doc_link
        );
    }

    println!();
}

pub fn print_stats(stats: &Stats) {
    println!(
        "\nStats:\n\t{} -> {}\n\t{} -> {}\n\t{} -> {}\n",
        "OK".green(),
        stats.ok,
        "WARNING".red(),
        stats.warnings,
        "UNKNOWN".yellow(),
        stats.unknown
    );

    let karma = if stats.karma < 0 {
        stats.karma.to_string().red()
    } else {
        stats.karma.to_string().green()
    };
    println!("Total Karma Points -> {}\n", karma);
}

pub fn write_report(
    report: &AggregateReport,
    format: OutputFormat,
    path: &Path,
) -> Result<(), PotcheckError> {
    match format {
        OutputFormat::Jsonl => write_jsonl(report, path),
        OutputFormat::Markdown => write_markdown(report, path),
    }
}

fn write_jsonl(report: &AggregateReport, path: &Path) -> Result<(), PotcheckError> {
    let mut lines = String::new();
    for record in &report.records {
        let json =
            serde_json::to_string(record).map_err(|e| PotcheckError::Config(e.to_string()))?;
        lines.push_str(&json);
        lines.push('\n');
    }
    fs::write(path, lines).map_err(|e| PotcheckError::Config(e.to_string()))
}

fn write_markdown(report: &AggregateReport, path: &Path) -> Result<(), PotcheckError> {
    let stats = report.stats();
    let mut md = String::new();

    md.push_str(&format!("# potcheck report for {}\n\n", report.target));
    md.push_str(&format!(
        "Generated: {}\n\n",
        report.generated_at.to_rfc3339()
    ));
    md.push_str("| Check | Result | Karma | Report |\n");
    md.push_str("|---|---|---|---|\n");
    for record in &report.records {
        md.push_str(&format!(
            "| {} | {} | {:+} | {} |\n",
            record.name,
            plain_label(record.kind),
            record.karma,
            record.report.replace('|', "\\|")
        ));
    }
    md.push_str(&format!(
        "\nOK: {} / WARNING: {} / UNKNOWN: {} / Total karma: {:+}\n",
        stats.ok, stats.warnings, stats.unknown, stats.karma
    ));

    fs::write(path, md).map_err(|e| PotcheckError::Config(e.to_string()))
}
