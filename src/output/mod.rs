//! Report writer: included/excluded/summary sheets as CSV plus an optional
//! JSON dump of the full records.

mod summary;

pub use summary::{Summary, SummaryRow};

use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::models::{ClassificationResult, PaperRecord};

pub const INCLUDED_FILE: &str = "included.csv";
pub const EXCLUDED_FILE: &str = "excluded.csv";
pub const SUMMARY_FILE: &str = "summary.csv";
pub const RECORDS_FILE: &str = "records.json";

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to write JSON {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One row of the included/excluded sheets
#[derive(Debug, Serialize)]
pub struct ReportRow<'a> {
    pub position: usize,
    pub input: &'a str,
    pub doi: &'a str,
    pub pmid: &'a str,
    pub title: &'a str,
    pub status: &'static str,
    pub work_type: &'a str,
    pub flagged: bool,
    pub q1_original_research: String,
    pub q1_confidence: &'static str,
    pub q1_evidence: &'a str,
    pub q2_animals_used: String,
    pub q2_confidence: &'static str,
    pub q2_evidence: &'a str,
    pub q3_setting: String,
    pub q3_confidence: &'static str,
    pub q3_evidence: &'a str,
    pub q5_species: String,
    pub q5_confidence: &'static str,
    pub q5_evidence: &'a str,
    /// `source: detail` for every source that failed
    pub source_errors: String,
}

impl<'a> ReportRow<'a> {
    pub fn from_record(record: &'a PaperRecord) -> Self {
        let answer = |r: &ClassificationResult| r.answer.label();
        let source_errors = record
            .sources
            .iter()
            .filter_map(|m| {
                m.failure
                    .as_ref()
                    .map(|f| format!("{}: {}", m.source.id(), f.detail))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self {
            position: record.position + 1,
            input: &record.raw_input,
            doi: record.identifier.as_ref().map(|id| id.as_str()).unwrap_or(""),
            pmid: record.pmid.as_deref().unwrap_or(""),
            title: record.title.as_deref().unwrap_or(""),
            status: record.status.as_str(),
            work_type: record.work_type.as_deref().unwrap_or(""),
            flagged: record.flagged,
            q1_original_research: answer(&record.q1),
            q1_confidence: record.q1.confidence.as_str(),
            q1_evidence: &record.q1.evidence,
            q2_animals_used: answer(&record.q2),
            q2_confidence: record.q2.confidence.as_str(),
            q2_evidence: &record.q2.evidence,
            q3_setting: answer(&record.q3),
            q3_confidence: record.q3.confidence.as_str(),
            q3_evidence: &record.q3.evidence,
            q5_species: answer(&record.q5),
            q5_confidence: record.q5.confidence.as_str(),
            q5_evidence: &record.q5.evidence,
            source_errors,
        }
    }
}

/// Write the report sheets into `dir`, creating it if needed. Records are
/// written in the order given.
pub fn write_report(
    records: &[PaperRecord],
    dir: &Path,
    include_json: bool,
) -> Result<Summary, OutputError> {
    fs::create_dir_all(dir).map_err(|source| OutputError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let (included, excluded): (Vec<&PaperRecord>, Vec<&PaperRecord>) =
        records.iter().partition(|r| r.included);
    for (file, sheet) in [(INCLUDED_FILE, included), (EXCLUDED_FILE, excluded)] {
        let rows = sheet.into_iter().map(ReportRow::from_record);
        write_csv(&dir.join(file), REPORT_HEADER, rows)?;
    }

    let summary = Summary::from_records(records);
    write_csv(&dir.join(SUMMARY_FILE), SUMMARY_HEADER, summary.rows())?;

    let path = dir.join(RECORDS_FILE);
    if include_json {
        let file = File::create(&path).map_err(|source| OutputError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::to_writer_pretty(BufWriter::new(file), records)
            .map_err(|source| OutputError::Json { path, source })?;
    } else {
        // A dump from an earlier run in the same directory would not match these sheets
        match fs::remove_file(&path) {
            Ok(()) => info!(path = %path.display(), "Removed stale records dump"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(OutputError::Io { path, source }),
        }
    }

    info!(
        dir = %dir.display(),
        included = summary.included,
        excluded = summary.excluded,
        "Report written"
    );
    Ok(summary)
}

/// Serialize `rows` to `path`; `header` is written on its own when there are
/// no rows
fn write_csv<T, I>(path: &Path, header: &[&str], rows: I) -> Result<(), OutputError>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let csv_err = |source| OutputError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    let mut empty = true;
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
        empty = false;
    }
    if empty {
        writer.write_record(header).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })
}

const SUMMARY_HEADER: &[&str] = &["Category", "Count", "Percentage"];

const REPORT_HEADER: &[&str] = &[
    "position",
    "input",
    "doi",
    "pmid",
    "title",
    "status",
    "work_type",
    "flagged",
    "q1_original_research",
    "q1_confidence",
    "q1_evidence",
    "q2_animals_used",
    "q2_confidence",
    "q2_evidence",
    "q3_setting",
    "q3_confidence",
    "q3_evidence",
    "q5_species",
    "q5_confidence",
    "q5_evidence",
    "source_errors",
];
