//! Run statistics computed from the final records.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::classify::UNSPECIFIED_ANIMAL;
use crate::models::{Answer, Confidence, PaperRecord, PaperStatus, Question, StudySetting};

/// Work type reported for excluded papers with no type from any source
const UNKNOWN_TYPE: &str = "unknown";
const INVALID_ID_TYPE: &str = "invalid identifier";

/// Aggregate counts over a batch of records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub included: usize,
    pub excluded: usize,
    /// Included on confidence below the threshold
    pub flagged: usize,

    pub invalid_ids: usize,
    pub fetch_failed: usize,
    pub cancelled: usize,

    /// Applicable answers given with low confidence, across all questions
    pub low_confidence: usize,

    /// Answer label counts per question; Q5 counts each species separately
    pub answers: BTreeMap<Question, BTreeMap<String, usize>>,
    pub confidences: BTreeMap<Question, BTreeMap<Confidence, usize>>,

    /// Why excluded papers were excluded, by provider work type
    pub excluded_types: BTreeMap<String, usize>,

    pub animal_studies: usize,
    /// In vivo or mixed
    pub in_vivo: usize,
    /// Animal studies naming at least one species; the unspecified-animal
    /// placeholder does not count
    pub with_species: usize,
}

/// One line of the summary sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Count")]
    pub count: usize,
    #[serde(rename = "Percentage")]
    pub percentage: String,
}

impl Summary {
    pub fn from_records(records: &[PaperRecord]) -> Self {
        let mut summary = Summary {
            total: records.len(),
            ..Default::default()
        };

        for record in records {
            match record.status {
                PaperStatus::SkippedInvalidId => summary.invalid_ids += 1,
                PaperStatus::FetchFailed => summary.fetch_failed += 1,
                PaperStatus::Cancelled => summary.cancelled += 1,
                PaperStatus::Processed => {}
            }

            if record.included {
                summary.included += 1;
                if record.flagged {
                    summary.flagged += 1;
                }
            } else {
                summary.excluded += 1;
                let work_type = match record.status {
                    PaperStatus::SkippedInvalidId => INVALID_ID_TYPE.to_string(),
                    _ => record
                        .work_type
                        .clone()
                        .unwrap_or_else(|| UNKNOWN_TYPE.to_string()),
                };
                *summary.excluded_types.entry(work_type).or_default() += 1;
            }

            for result in record.results() {
                let answers = summary.answers.entry(result.question).or_default();
                match &result.answer {
                    Answer::Species(species) if !species.is_empty() => {
                        for name in species {
                            *answers.entry(name.clone()).or_default() += 1;
                        }
                    }
                    answer => *answers.entry(answer.label()).or_default() += 1,
                }

                if result.answer.is_applicable() {
                    *summary
                        .confidences
                        .entry(result.question)
                        .or_default()
                        .entry(result.confidence)
                        .or_default() += 1;
                    if result.confidence == Confidence::Low {
                        summary.low_confidence += 1;
                    }
                }
            }

            if record.q2.answer == Answer::Boolean(true) {
                summary.animal_studies += 1;
            }
            if matches!(
                record.q3.answer.as_setting(),
                Some(StudySetting::InVivo | StudySetting::Mixed)
            ) {
                summary.in_vivo += 1;
            }
            if record
                .q5
                .answer
                .species()
                .is_some_and(|s| s.iter().any(|name| name != UNSPECIFIED_ANIMAL))
            {
                summary.with_species += 1;
            }
        }

        summary
    }

    /// Count of a given answer label for a question
    pub fn answer_count(&self, question: Question, label: &str) -> usize {
        self.answers
            .get(&question)
            .and_then(|a| a.get(label))
            .copied()
            .unwrap_or(0)
    }

    pub fn confidence_count(&self, question: Question, confidence: Confidence) -> usize {
        self.confidences
            .get(&question)
            .and_then(|c| c.get(&confidence))
            .copied()
            .unwrap_or(0)
    }

    /// Flatten into Category/Count/Percentage rows; percentages are of the
    /// total paper count
    pub fn rows(&self) -> Vec<SummaryRow> {
        let mut rows = Vec::new();
        let mut push = |category: String, count: usize| {
            let percentage = if self.total == 0 {
                "0.0%".to_string()
            } else {
                format!("{:.1}%", count as f64 * 100.0 / self.total as f64)
            };
            rows.push(SummaryRow {
                category,
                count,
                percentage,
            });
        };

        push("Total papers".into(), self.total);
        push("Included (original research)".into(), self.included);
        push("Excluded".into(), self.excluded);
        push("Flagged for review".into(), self.flagged);
        push("Invalid identifiers".into(), self.invalid_ids);
        push("Fetch failures".into(), self.fetch_failed);
        push("Cancelled".into(), self.cancelled);
        push("Low-confidence answers".into(), self.low_confidence);
        push("Animal studies".into(), self.animal_studies);
        push("In vivo (incl. mixed)".into(), self.in_vivo);
        push("Species identified".into(), self.with_species);

        for question in Question::ALL {
            if let Some(answers) = self.answers.get(&question) {
                for (label, count) in answers {
                    push(format!("{} {}: {}", question, question.description(), label), *count);
                }
            }
            for confidence in Confidence::ALL {
                let count = self.confidence_count(question, confidence);
                if count > 0 {
                    push(format!("{} confidence: {}", question, confidence), count);
                }
            }
        }

        for (work_type, count) in &self.excluded_types {
            push(format!("Excluded type: {}", work_type), *count);
        }

        rows
    }
}
