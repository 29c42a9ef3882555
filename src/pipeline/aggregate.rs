//! Merge one paper's metadata and answers into its final record.

use crate::models::{
    Answer, ClassificationResult, Confidence, InvalidIdentifier, PaperIdentifier, PaperRecord,
    PaperStatus, Question, SourceKind, SourceMetadata,
};

/// Build the final record for a fetched and classified paper.
///
/// The paper is included exactly when Q1 confirmed original research, and
/// flagged when included on Q1 confidence below `threshold`.
#[allow(clippy::too_many_arguments)]
pub fn aggregate(
    position: usize,
    raw_input: impl Into<String>,
    identifier: PaperIdentifier,
    sources: Vec<SourceMetadata>,
    q1: ClassificationResult,
    q2: ClassificationResult,
    q3: ClassificationResult,
    q5: ClassificationResult,
    threshold: Confidence,
) -> PaperRecord {
    let status = if sources.iter().any(SourceMetadata::was_cancelled) {
        PaperStatus::Cancelled
    } else if sources.iter().all(|m| !m.succeeded()) {
        PaperStatus::FetchFailed
    } else {
        PaperStatus::Processed
    };

    let included = q1.is_original_research();
    let flagged = included && q1.confidence < threshold;

    let succeeded = || sources.iter().filter(|m| m.succeeded());
    let work_type = succeeded().find_map(|m| m.work_type.clone());
    let title = succeeded().find_map(|m| m.title.clone());
    let pmid = succeeded()
        .find(|m| m.source == SourceKind::PubMed)
        .and_then(|m| m.external_id.clone());

    PaperRecord {
        position,
        raw_input: raw_input.into(),
        identifier: Some(identifier),
        status,
        included,
        flagged,
        work_type,
        title,
        pmid,
        sources,
        q1,
        q2,
        q3,
        q5,
    }
}

/// Record for an input that is not a valid DOI. Nothing is fetched.
pub fn skipped_invalid(
    position: usize,
    raw_input: impl Into<String>,
    error: &InvalidIdentifier,
) -> PaperRecord {
    let reason = error.to_string();

    PaperRecord {
        position,
        raw_input: raw_input.into(),
        identifier: None,
        status: PaperStatus::SkippedInvalidId,
        included: false,
        flagged: false,
        work_type: None,
        title: None,
        pmid: None,
        sources: Vec::new(),
        q1: ClassificationResult::new(Question::Q1, Answer::Unknown, Confidence::Low, &reason),
        q2: ClassificationResult::not_applicable(Question::Q2, &reason),
        q3: ClassificationResult::not_applicable(Question::Q3, &reason),
        q5: ClassificationResult::not_applicable(Question::Q5, reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classifier;
    use crate::models::{normalize, FailureKind};

    fn classify_and_aggregate(sources: Vec<SourceMetadata>, threshold: Confidence) -> PaperRecord {
        let c = Classifier::default().classify(&sources);
        let doi = PaperIdentifier::parse("10.1234/abc").unwrap();
        aggregate(0, "10.1234/abc", doi, sources, c.q1, c.q2, c.q3, c.q5, threshold)
    }

    #[test]
    fn test_all_sources_failed() {
        let sources = vec![
            SourceMetadata::failed(SourceKind::OpenAlex, FailureKind::Timeout, "t"),
            SourceMetadata::failed(SourceKind::Crossref, FailureKind::Network, "n"),
            SourceMetadata::failed(SourceKind::PubMed, FailureKind::NotFound, "no PMID"),
        ];
        let record = classify_and_aggregate(sources, Confidence::Medium);

        assert_eq!(record.status, PaperStatus::FetchFailed);
        assert_eq!(record.q1.answer, Answer::Unknown);
        assert_eq!(record.q1.confidence, Confidence::Low);
        assert!(!record.included);
        assert_eq!(record.sources.len(), 3);
    }

    #[test]
    fn test_cancelled_fetch_marks_record() {
        let sources = vec![
            SourceMetadata::new(SourceKind::OpenAlex).work_type("article"),
            SourceMetadata::failed(SourceKind::PubMed, FailureKind::Cancelled, "cancelled"),
        ];
        let record = classify_and_aggregate(sources, Confidence::Medium);
        assert_eq!(record.status, PaperStatus::Cancelled);
    }

    #[test]
    fn test_included_and_flagged() {
        let high = classify_and_aggregate(
            vec![SourceMetadata::new(SourceKind::OpenAlex).work_type("article").title("T")],
            Confidence::Medium,
        );
        assert_eq!(high.status, PaperStatus::Processed);
        assert!(high.included);
        assert!(!high.flagged);
        assert_eq!(high.work_type.as_deref(), Some("article"));
        assert_eq!(high.title.as_deref(), Some("T"));

        let medium = classify_and_aggregate(
            vec![SourceMetadata::new(SourceKind::Crossref).work_type("journal-article")],
            Confidence::High,
        );
        assert!(medium.included);
        assert!(medium.flagged);
    }

    #[test]
    fn test_pmid_from_pubmed() {
        let record = classify_and_aggregate(
            vec![
                SourceMetadata::new(SourceKind::OpenAlex).external_id("https://openalex.org/W1"),
                SourceMetadata::new(SourceKind::PubMed).external_id("31234567"),
            ],
            Confidence::Medium,
        );
        assert_eq!(record.pmid.as_deref(), Some("31234567"));
    }

    #[test]
    fn test_skipped_invalid() {
        let err = normalize("not a doi").unwrap_err();
        let record = skipped_invalid(4, "not a doi", &err);

        assert_eq!(record.status, PaperStatus::SkippedInvalidId);
        assert_eq!(record.position, 4);
        assert!(record.identifier.is_none());
        assert!(record.sources.is_empty());
        assert!(!record.included);
        assert_eq!(record.display_id(), "not a doi");
        assert!(!record.q2.answer.is_applicable());
    }
}
