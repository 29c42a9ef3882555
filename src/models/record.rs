//! Per-paper aggregate records handed to the report writer.

use serde::{Deserialize, Serialize};

use super::classification::{ClassificationResult, Question};
use super::identifier::PaperIdentifier;
use super::metadata::SourceMetadata;

/// Processing outcome of one input identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaperStatus {
    /// Metadata was fetched from at least one source and classified
    Processed,
    /// The input was not a valid DOI; nothing was fetched
    SkippedInvalidId,
    /// Every source failed; Q1 fell back to "unknown"
    FetchFailed,
    /// The run was interrupted while this paper was being fetched
    Cancelled,
}

impl PaperStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaperStatus::Processed => "processed",
            PaperStatus::SkippedInvalidId => "skipped-invalid-id",
            PaperStatus::FetchFailed => "fetch-failed",
            PaperStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for PaperStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final state of one paper after the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Position of the identifier in the input list
    pub position: usize,

    /// Input text as received
    pub raw_input: String,

    /// Canonical DOI; absent when the input was invalid
    pub identifier: Option<PaperIdentifier>,

    pub status: PaperStatus,

    /// Q1 confirmed original research
    pub included: bool,

    /// Included, but Q1 confidence is below the configured threshold
    pub flagged: bool,

    /// Provider work type used in the excluded-type breakdown
    pub work_type: Option<String>,

    /// Title from the first source that had one
    pub title: Option<String>,

    /// PubMed identifier, when resolved
    pub pmid: Option<String>,

    pub sources: Vec<SourceMetadata>,

    pub q1: ClassificationResult,
    pub q2: ClassificationResult,
    pub q3: ClassificationResult,
    pub q5: ClassificationResult,
}

impl PaperRecord {
    /// The result for a given question
    pub fn result(&self, question: Question) -> &ClassificationResult {
        match question {
            Question::Q1 => &self.q1,
            Question::Q2 => &self.q2,
            Question::Q3 => &self.q3,
            Question::Q5 => &self.q5,
        }
    }

    /// All four results in question order
    pub fn results(&self) -> [&ClassificationResult; 4] {
        [&self.q1, &self.q2, &self.q3, &self.q5]
    }

    /// Canonical DOI, or the raw input when invalid
    pub fn display_id(&self) -> &str {
        self.identifier
            .as_ref()
            .map(|id| id.as_str())
            .unwrap_or(&self.raw_input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Answer, Confidence, PaperIdentifier, SourceKind};

    fn record(identifier: Option<PaperIdentifier>, raw: &str) -> PaperRecord {
        let result = |q| ClassificationResult::new(q, Answer::Unknown, Confidence::Low, "");
        PaperRecord {
            position: 0,
            raw_input: raw.to_string(),
            identifier,
            status: PaperStatus::Processed,
            included: false,
            flagged: false,
            work_type: None,
            title: None,
            pmid: None,
            sources: vec![SourceMetadata::new(SourceKind::OpenAlex)],
            q1: result(Question::Q1),
            q2: result(Question::Q2),
            q3: result(Question::Q3),
            q5: result(Question::Q5),
        }
    }

    #[test]
    fn test_status_strings_match_serde() {
        for status in [
            PaperStatus::Processed,
            PaperStatus::SkippedInvalidId,
            PaperStatus::FetchFailed,
            PaperStatus::Cancelled,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
        }
    }

    #[test]
    fn test_display_id_prefers_canonical_doi() {
        let doi = PaperIdentifier::parse("https://doi.org/10.1234/ABC").unwrap();
        assert_eq!(record(Some(doi), " https://doi.org/10.1234/ABC").display_id(), "10.1234/abc");
        assert_eq!(record(None, "not a doi").display_id(), "not a doi");
    }

    #[test]
    fn test_results_in_question_order() {
        let record = record(None, "x");
        let questions: Vec<Question> = record.results().iter().map(|r| r.question).collect();
        assert_eq!(questions, Question::ALL.to_vec());
        assert_eq!(record.result(Question::Q3).question, Question::Q3);
    }

    #[test]
    fn test_record_json_roundtrip_keeps_status() {
        let mut original = record(None, "junk");
        original.status = PaperStatus::SkippedInvalidId;

        let json = serde_json::to_string(&original).unwrap();
        assert!(json.contains("\"skipped-invalid-id\""));
        let parsed: PaperRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.status, PaperStatus::SkippedInvalidId);
        assert_eq!(parsed.raw_input, "junk");
    }
}
