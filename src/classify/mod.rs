//! Rule-based classification of fetched metadata.
//!
//! - [`classify_q1`]: original research or not, from work types with
//!   OpenAlex → Crossref → text fallback
//! - [`classify_q2`], [`classify_q3`], [`classify_q5`]: animal use, study
//!   setting and species, from MeSH headings and text
//!
//! All functions are pure; their vocabulary comes from [`ClassifierTables`].

mod animal;
mod review;
pub mod tables;

pub use animal::{classify_q2, classify_q3, classify_q5, StudyEvidence, UNSPECIFIED_ANIMAL};
pub use review::classify_q1;
pub use tables::{ClassifierTables, MeshTable, PhraseMatcher, WorkCategory};

use crate::models::{ClassificationResult, SourceKind, SourceMetadata};

/// The four answers for one paper
#[derive(Debug, Clone)]
pub struct Classifications {
    pub q1: ClassificationResult,
    pub q2: ClassificationResult,
    pub q3: ClassificationResult,
    pub q5: ClassificationResult,
}

/// Runs all classifiers over one paper's metadata
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    tables: ClassifierTables,
}

impl Classifier {
    pub fn new(tables: ClassifierTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &ClassifierTables {
        &self.tables
    }

    /// Classify a paper from the records returned by its sources
    pub fn classify(&self, sources: &[SourceMetadata]) -> Classifications {
        let by_kind = |kind: SourceKind| sources.iter().find(|m| m.source == kind);
        let supplementary: Vec<&SourceMetadata> = sources
            .iter()
            .filter(|m| !matches!(m.source, SourceKind::OpenAlex | SourceKind::Crossref))
            .collect();

        let q1 = classify_q1(
            by_kind(SourceKind::OpenAlex),
            by_kind(SourceKind::Crossref),
            &supplementary,
            &self.tables,
        );

        let evidence = StudyEvidence::from_sources(sources);
        let q2 = classify_q2(&q1, &evidence, &self.tables);
        let q3 = classify_q3(&q2, &evidence, &self.tables);
        let q5 = classify_q5(&q2, &evidence, &self.tables);

        Classifications { q1, q2, q3, q5 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Answer, Confidence, FailureKind, MeshTerm, StudySetting};

    #[test]
    fn test_classify_animal_study() {
        let sources = vec![
            SourceMetadata::new(SourceKind::OpenAlex).work_type("article"),
            SourceMetadata::failed(SourceKind::Crossref, FailureKind::Timeout, "timeout"),
            SourceMetadata::new(SourceKind::PubMed).mesh_terms(vec![
                MeshTerm::new("D051379", "Mice"),
                MeshTerm::new("D004195", "Disease Models, Animal"),
            ]),
        ];

        let result = Classifier::default().classify(&sources);
        assert!(result.q1.is_original_research());
        assert_eq!(result.q2.answer, Answer::Boolean(true));
        assert_eq!(result.q2.confidence, Confidence::High);
        assert_eq!(result.q3.answer, Answer::Setting(StudySetting::InVivo));
        assert_eq!(result.q3.confidence, Confidence::High);
        assert_eq!(result.q5.answer.label(), "Mus musculus");
    }

    #[test]
    fn test_classify_review_skips_animal_questions() {
        let sources = vec![
            SourceMetadata::new(SourceKind::OpenAlex).work_type("review"),
            SourceMetadata::new(SourceKind::PubMed).mesh_terms(vec![MeshTerm::new("D051379", "Mice")]),
        ];

        let result = Classifier::default().classify(&sources);
        assert!(!result.q1.is_original_research());
        assert_eq!(result.q2.answer, Answer::NotApplicable);
        assert_eq!(result.q3.answer, Answer::NotApplicable);
        assert_eq!(result.q5.answer, Answer::NotApplicable);
    }
}
