//! Q2 (animal use), Q3 (in vivo / in vitro) and Q5 (species).
//!
//! MeSH headings are controlled vocabulary and give the strongest evidence;
//! title and abstract phrases are the fallback.

use std::collections::BTreeSet;

use crate::classify::tables::ClassifierTables;
use crate::models::{
    Answer, ClassificationResult, Confidence, MeshTerm, Question, SourceMetadata, StudySetting,
};

/// Evidence pooled from every successful source of one paper
#[derive(Debug, Clone, Default)]
pub struct StudyEvidence<'a> {
    pub mesh_terms: Vec<&'a MeshTerm>,
    pub text: String,
}

impl<'a> StudyEvidence<'a> {
    pub fn from_sources<I>(sources: I) -> Self
    where
        I: IntoIterator<Item = &'a SourceMetadata>,
    {
        let mut evidence = Self::default();
        let mut texts = Vec::new();

        for meta in sources.into_iter().filter(|m| m.succeeded()) {
            evidence.mesh_terms.extend(meta.mesh_terms.iter());
            if meta.has_text() {
                texts.push(meta.text());
            }
        }

        evidence.text = texts.join(" ");
        evidence
    }

    /// Matching MeSH terms as `Name (UI)` labels
    fn mesh_labels(&self, matches: impl Fn(&MeshTerm) -> bool) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for &term in &self.mesh_terms {
            let label = term.label();
            if matches(term) && !labels.contains(&label) {
                labels.push(label);
            }
        }
        labels
    }
}

const EXCLUDED_BY_Q1: &str = "excluded by Q1";

/// Q2: were animals used?
pub fn classify_q2(
    q1: &ClassificationResult,
    evidence: &StudyEvidence<'_>,
    tables: &ClassifierTables,
) -> ClassificationResult {
    if !q1.is_original_research() {
        return ClassificationResult::not_applicable(Question::Q2, EXCLUDED_BY_Q1);
    }

    let mesh = evidence.mesh_labels(|t| tables.animal_mesh.contains(t));
    if !mesh.is_empty() {
        return ClassificationResult::new(
            Question::Q2,
            Answer::Boolean(true),
            Confidence::High,
            format!("MeSH: {}", mesh.join(", ")),
        );
    }

    let mut phrases: Vec<String> = tables
        .animal_phrases
        .find_all(&evidence.text)
        .into_iter()
        .map(|m| m.phrase)
        .collect();
    for m in tables.species_phrases.find_all(&evidence.text) {
        if !phrases.contains(&m.phrase) {
            phrases.push(m.phrase);
        }
    }

    if !phrases.is_empty() {
        return ClassificationResult::new(
            Question::Q2,
            Answer::Boolean(true),
            Confidence::Medium,
            format!("Text mentions: {}", phrases.join(", ")),
        );
    }

    ClassificationResult::new(
        Question::Q2,
        Answer::Boolean(false),
        Confidence::Medium,
        "No animal MeSH headings or animal phrases found",
    )
}

/// Q3: in vivo, in vitro, or both. Only meaningful when animals were used.
pub fn classify_q3(
    q2: &ClassificationResult,
    evidence: &StudyEvidence<'_>,
    tables: &ClassifierTables,
) -> ClassificationResult {
    match q2.answer {
        Answer::Boolean(true) => {}
        Answer::NotApplicable => {
            return ClassificationResult::not_applicable(Question::Q3, EXCLUDED_BY_Q1)
        }
        _ => return ClassificationResult::not_applicable(Question::Q3, "no animal use detected"),
    }

    let vivo_mesh = evidence.mesh_labels(|t| tables.in_vivo_mesh.contains(t));
    let vitro_mesh = evidence.mesh_labels(|t| tables.in_vitro_mesh.contains(t));
    let vivo_text = tables.in_vivo_phrases.find_all(&evidence.text);
    let vitro_text = tables.in_vitro_phrases.find_all(&evidence.text);

    let vivo: Vec<String> = vivo_mesh
        .iter()
        .map(|l| format!("MeSH {}", l))
        .chain(vivo_text.iter().map(|m| format!("'{}'", m.phrase)))
        .collect();
    let vitro: Vec<String> = vitro_mesh
        .iter()
        .map(|l| format!("MeSH {}", l))
        .chain(vitro_text.iter().map(|m| format!("'{}'", m.phrase)))
        .collect();

    match (vivo.is_empty(), vitro.is_empty()) {
        (false, false) => ClassificationResult::new(
            Question::Q3,
            Answer::Setting(StudySetting::Mixed),
            Confidence::Medium,
            format!(
                "In vivo: {}; in vitro: {}",
                vivo.join(", "),
                vitro.join(", ")
            ),
        ),
        (false, true) => ClassificationResult::new(
            Question::Q3,
            Answer::Setting(StudySetting::InVivo),
            from_mesh(!vivo_mesh.is_empty()),
            format!("In vivo: {}", vivo.join(", ")),
        ),
        (true, false) => ClassificationResult::new(
            Question::Q3,
            Answer::Setting(StudySetting::InVitro),
            from_mesh(!vitro_mesh.is_empty()),
            format!("In vitro: {}", vitro.join(", ")),
        ),
        (true, true) => ClassificationResult::new(
            Question::Q3,
            Answer::Unknown,
            Confidence::Low,
            "No in vivo or in vitro indicators",
        ),
    }
}

fn from_mesh(mesh: bool) -> Confidence {
    if mesh {
        Confidence::High
    } else {
        Confidence::Medium
    }
}

/// Label used when animals were used but no species could be identified
pub const UNSPECIFIED_ANIMAL: &str = "unspecified animal";

/// Q5: which species were used?
pub fn classify_q5(
    q2: &ClassificationResult,
    evidence: &StudyEvidence<'_>,
    tables: &ClassifierTables,
) -> ClassificationResult {
    match q2.answer {
        Answer::Boolean(true) => {}
        Answer::Boolean(false) => {
            return ClassificationResult::new(
                Question::Q5,
                Answer::Species(BTreeSet::new()),
                q2.confidence,
                "No animal use detected",
            )
        }
        _ => return ClassificationResult::not_applicable(Question::Q5, EXCLUDED_BY_Q1),
    }

    let mut species = BTreeSet::new();
    let mut notes = Vec::new();

    for term in &evidence.mesh_terms {
        if let Some(canonical) = tables.species_mesh.lookup(term) {
            species.insert(canonical.to_string());
            let note = format!("MeSH {}", term.label());
            if !notes.contains(&note) {
                notes.push(note);
            }
        }
    }
    let from_mesh = !species.is_empty();

    for m in tables.species_phrases.find_all(&evidence.text) {
        if species.insert(m.label.to_string()) {
            notes.push(format!("'{}'", m.phrase));
        }
    }

    if species.is_empty() {
        species.insert(UNSPECIFIED_ANIMAL.to_string());
        return ClassificationResult::new(
            Question::Q5,
            Answer::Species(species),
            Confidence::Low,
            "Animals used but no species identified",
        );
    }

    let confidence = if from_mesh {
        Confidence::High
    } else {
        Confidence::Medium
    };
    ClassificationResult::new(
        Question::Q5,
        Answer::Species(species),
        confidence,
        notes.join(", "),
    )
}
