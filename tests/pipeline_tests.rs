//! End-to-end screening runs over mock sources.

use biomed_screen::config::PipelineSettings;
use biomed_screen::models::{
    Answer, Confidence, MeshTerm, PaperStatus, SourceKind, SourceMetadata, StudySetting,
};
use biomed_screen::output::{write_report, Summary, EXCLUDED_FILE, INCLUDED_FILE};
use biomed_screen::sources::MockSource;
use biomed_screen::utils::FetchError;
use biomed_screen::{Classifier, Pipeline, SourceSet};
use std::sync::Arc;
use tempfile::TempDir;

const REVIEW_DOI: &str = "10.1016/j.review.2021.001";
const MOUSE_DOI: &str = "10.1038/s41586-020-0001-1";

fn standard_mocks() -> SourceSet {
    let openalex = MockSource::new(SourceKind::OpenAlex)
        .with_record(
            REVIEW_DOI,
            SourceMetadata::new(SourceKind::OpenAlex)
                .work_type("review")
                .title("Gut microbiota and metabolic disease"),
        )
        .with_record(
            MOUSE_DOI,
            SourceMetadata::new(SourceKind::OpenAlex)
                .work_type("article")
                .title("Hepatic lipid accumulation after high-fat feeding"),
        );

    let crossref = MockSource::new(SourceKind::Crossref)
        .with_record(
            REVIEW_DOI,
            SourceMetadata::new(SourceKind::Crossref).work_type("journal-article"),
        )
        .with_record(
            MOUSE_DOI,
            SourceMetadata::new(SourceKind::Crossref).work_type("journal-article"),
        );

    let pubmed = MockSource::new(SourceKind::PubMed).with_record(
        MOUSE_DOI,
        SourceMetadata::new(SourceKind::PubMed)
            .external_id("32000001")
            .publication_types(vec!["Journal Article".to_string()])
            .mesh_terms(vec![
                MeshTerm::new("D051379", "Mice"),
                MeshTerm::new("D004195", "Disease Models, Animal"),
                MeshTerm::new("D008099", "Liver"),
            ]),
    );

    SourceSet::new()
        .with(Arc::new(openalex))
        .with(Arc::new(crossref))
        .with(Arc::new(pubmed))
}

fn pipeline(sources: SourceSet) -> Pipeline {
    Pipeline::new(sources, Classifier::default(), &PipelineSettings::default())
}

fn inputs(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_batch_with_invalid_review_and_animal_study() {
    let records = pipeline(standard_mocks())
        .run(&inputs(&[
            "not-a-doi",
            &format!("https://doi.org/{}", REVIEW_DOI),
            MOUSE_DOI,
        ]))
        .await;

    assert_eq!(records.len(), 3);

    let invalid = &records[0];
    assert_eq!(invalid.status, PaperStatus::SkippedInvalidId);
    assert!(!invalid.included);
    assert!(invalid.sources.is_empty());

    let review = &records[1];
    assert_eq!(review.status, PaperStatus::Processed);
    assert!(!review.included);
    assert_eq!(review.q1.answer, Answer::Boolean(false));
    assert_eq!(review.q1.confidence, Confidence::High);
    assert!(review.q1.evidence.contains("OpenAlex"));
    assert_eq!(review.q2.answer, Answer::NotApplicable);

    let mouse = &records[2];
    assert_eq!(mouse.status, PaperStatus::Processed);
    assert!(mouse.included);
    assert!(!mouse.flagged);
    assert_eq!(mouse.pmid.as_deref(), Some("32000001"));
    assert_eq!(mouse.q2.answer, Answer::Boolean(true));
    assert_eq!(mouse.q2.confidence, Confidence::High);
    assert_eq!(mouse.q3.answer, Answer::Setting(StudySetting::InVivo));
    assert_eq!(mouse.q3.confidence, Confidence::High);
    assert!(mouse
        .q5
        .answer
        .species()
        .is_some_and(|s| s.contains("Mus musculus")));
}

#[tokio::test]
async fn test_all_sources_fail() {
    let doi = "10.5555/unreachable";
    let timeout = || FetchError::Timeout {
        url: "http://mock".to_string(),
    };
    let sources = SourceSet::new()
        .with(Arc::new(MockSource::new(SourceKind::OpenAlex).with_error(doi, timeout())))
        .with(Arc::new(MockSource::new(SourceKind::Crossref).with_error(doi, timeout())))
        .with(Arc::new(MockSource::new(SourceKind::PubMed)));

    let records = pipeline(sources).run(&inputs(&[doi])).await;

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.status, PaperStatus::FetchFailed);
    assert_eq!(record.q1.answer, Answer::Unknown);
    assert_eq!(record.q1.confidence, Confidence::Low);
    assert!(!record.included);
    assert_eq!(record.sources.len(), 3);
    assert!(record.sources.iter().all(|m| !m.succeeded()));

    let summary = Summary::from_records(&records);
    assert_eq!(summary.fetch_failed, 1);
    assert_eq!(summary.excluded, 1);
}

#[tokio::test]
async fn test_report_from_pipeline_run() {
    let records = pipeline(standard_mocks())
        .run(&inputs(&[MOUSE_DOI, REVIEW_DOI, "junk"]))
        .await;

    let dir = TempDir::new().unwrap();
    let summary = write_report(&records, dir.path(), true).unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.included, 1);
    assert_eq!(summary.invalid_ids, 1);
    assert_eq!(summary.animal_studies, 1);
    assert_eq!(summary.excluded_types.get("review"), Some(&1));

    let included = csv::Reader::from_path(dir.path().join(INCLUDED_FILE))
        .unwrap()
        .records()
        .count();
    let excluded = csv::Reader::from_path(dir.path().join(EXCLUDED_FILE))
        .unwrap()
        .records()
        .count();
    assert_eq!((included, excluded), (1, 2));
}
