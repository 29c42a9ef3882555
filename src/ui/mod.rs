//! Terminal output for the CLI: status lines, the screening progress bar and
//! result tables.

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use owo_colors::OwoColorize;
use std::io::IsTerminal;

use crate::models::{Answer, Confidence, PaperRecord, PaperStatus};
use crate::output::Summary;

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
}

/// Status icons for different operations.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
    }
}

/// Print a styled status message.
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    match status {
        Status::Success => println!("{} {}", icon.green().bold(), msg),
        Status::Error => eprintln!("{} {}", icon.red().bold(), msg),
        Status::Warning => println!("{} {}", icon.yellow().bold(), msg),
        Status::Info => println!("{} {}", icon.cyan().bold(), msg),
    }
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

/// Icon for a paper's processing outcome
pub fn paper_status(record: &PaperRecord) -> Status {
    match record.status {
        PaperStatus::Processed if record.flagged => Status::Warning,
        PaperStatus::Processed => Status::Success,
        PaperStatus::SkippedInvalidId | PaperStatus::FetchFailed => Status::Error,
        PaperStatus::Cancelled => Status::Warning,
    }
}

fn confidence_color(confidence: Confidence) -> Color {
    match confidence {
        Confidence::High => Color::Green,
        Confidence::Medium => Color::Yellow,
        Confidence::Low => Color::Red,
    }
}

fn answer_cell(answer: &Answer, confidence: Confidence) -> Cell {
    if !answer.is_applicable() {
        return Cell::new("-");
    }
    Cell::new(format!("{} ({})", answer, confidence)).fg(confidence_color(confidence))
}

/// Table of per-paper answers
pub fn records_table(records: &[PaperRecord]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            ["DOI", "Status", "Type", "Research", "Animals", "Setting", "Species"]
                .into_iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
        );

    for record in records {
        let status = format!("{} {}", status_icon(paper_status(record)), record.status);
        table.add_row(vec![
            Cell::new(truncate_with_ellipsis(record.display_id(), 40)),
            Cell::new(status),
            Cell::new(record.work_type.as_deref().unwrap_or("-")),
            answer_cell(&record.q1.answer, record.q1.confidence),
            answer_cell(&record.q2.answer, record.q2.confidence),
            answer_cell(&record.q3.answer, record.q3.confidence),
            answer_cell(&record.q5.answer, record.q5.confidence),
        ]);
    }
    table
}

/// Evidence lines for a single paper, one per question
pub fn print_evidence(record: &PaperRecord) {
    println!(
        "{} {}",
        status_icon(paper_status(record)).cyan(),
        record.display_id().bold()
    );
    if let Some(title) = &record.title {
        println!("  {}", truncate_with_ellipsis(title, 100).dimmed());
    }
    for result in record.results() {
        if result.answer.is_applicable() {
            println!(
                "  {} {}: {}",
                result.question.to_string().cyan(),
                result.question.description(),
                result.evidence
            );
        }
    }
}

/// The summary sheet as a terminal table
pub fn summary_table(summary: &Summary) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        Cell::new("Category").add_attribute(Attribute::Bold),
        Cell::new("Count").add_attribute(Attribute::Bold),
        Cell::new("Percentage").add_attribute(Attribute::Bold),
    ]);
    for row in summary.rows() {
        table.add_row(vec![
            Cell::new(row.category),
            Cell::new(row.count),
            Cell::new(row.percentage),
        ]);
    }
    table
}

/// Progress bar over the papers of a run. Hidden when stdout is not a
/// terminal.
pub struct ScreeningProgress {
    pb: indicatif::ProgressBar,
}

impl ScreeningProgress {
    pub fn new(len: usize) -> Self {
        let pb = if is_terminal() {
            indicatif::ProgressBar::new(len as u64)
        } else {
            indicatif::ProgressBar::hidden()
        };
        if let Ok(style) =
            indicatif::ProgressStyle::with_template("{msg}: {bar:40.cyan/blue} {pos}/{len} ({percent}%)")
        {
            pb.set_style(style.progress_chars("█▓▒░ "));
        }
        pb.set_message("Screening");
        Self { pb }
    }

    /// Advance by one finished paper
    pub fn record(&self, record: &PaperRecord) {
        self.pb.inc(1);
        self.pb
            .set_message(format!("Screening {}", truncate_with_ellipsis(record.display_id(), 30)));
    }

    pub fn finish(&self, msg: &str) {
        self.pb.finish_with_message(msg.to_string());
    }
}

/// Truncate text to fit within the specified width using unicode-aware truncation.
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if max_width <= 3 {
        return "...".to_string();
    }

    let char_widths: Vec<(char, usize)> = text
        .chars()
        .map(|c| (c, unicode_width::UnicodeWidthChar::width(c).unwrap_or(1)))
        .collect();

    let total_width: usize = char_widths.iter().map(|(_, w)| *w).sum();
    if total_width <= max_width {
        return text.to_string();
    }

    let mut current_width = 0;
    let mut end_idx = 0;
    for (i, (_, w)) in char_widths.iter().enumerate() {
        if current_width + w > max_width - 3 {
            break;
        }
        current_width += w;
        end_idx = i + 1;
    }

    let truncated: String = char_widths[..end_idx].iter().map(|(c, _)| *c).collect();
    format!("{}...", truncated)
}
