//! Reading identifier lists from text and CSV files.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Column read from CSV input when none is given
pub const DEFAULT_COLUMN: &str = "DOI";

/// Errors reading an input list. These are fatal and reported before any
/// paper is processed.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Column {column:?} not found; available columns: {}", available.join(", "))]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    #[error("No identifiers found in {0}")]
    Empty(PathBuf),
}

/// Read raw identifiers from `path`.
///
/// Files ending in `.csv` are read by header, taking the cells of `column`
/// (case-insensitive). Anything else is one identifier per line, with blank
/// lines and `#` comments skipped. Values are returned untrimmed apart from
/// line endings; normalization happens in the pipeline.
pub fn read_identifiers(path: &Path, column: Option<&str>) -> Result<Vec<String>, InputError> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    let ids = if is_csv {
        read_csv(path, column.unwrap_or(DEFAULT_COLUMN))?
    } else {
        let content = fs::read_to_string(path).map_err(|source| InputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        parse_lines(&content)
    };

    if ids.is_empty() {
        return Err(InputError::Empty(path.to_path_buf()));
    }
    debug!(path = %path.display(), count = ids.len(), "Read identifiers");
    Ok(ids)
}

/// One identifier per non-blank, non-comment line
pub fn parse_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .map(|line| line.trim_end().to_string())
        .collect()
}

fn read_csv(path: &Path, column: &str) -> Result<Vec<String>, InputError> {
    let csv_err = |source| InputError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;

    let headers = reader.headers().map_err(csv_err)?.clone();
    let index = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(column))
        .ok_or_else(|| InputError::MissingColumn {
            column: column.to_string(),
            available: headers.iter().map(|h| h.trim().to_string()).collect(),
        })?;

    let mut ids = Vec::new();
    for row in reader.records() {
        let row = row.map_err(csv_err)?;
        if let Some(value) = row.get(index).filter(|v| !v.trim().is_empty()) {
            ids.push(value.to_string());
        }
    }
    Ok(ids)
}
