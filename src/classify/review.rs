//! Q1: original research versus review, editorial and other non-research.

use crate::classify::tables::{ClassifierTables, WorkCategory};
use crate::models::{Answer, ClassificationResult, Confidence, Question, SourceMetadata};

/// A Q1 verdict derived from one source's structured metadata
#[derive(Debug, Clone, PartialEq, Eq)]
struct TypeVerdict {
    original_research: bool,
    reason: String,
}

/// Decide Q1 from the available metadata.
///
/// OpenAlex is authoritative (high confidence), Crossref is the fallback
/// (medium), and any other successful source only contributes text and
/// publication types to the last-resort heuristic (low).
pub fn classify_q1(
    openalex: Option<&SourceMetadata>,
    crossref: Option<&SourceMetadata>,
    supplementary: &[&SourceMetadata],
    tables: &ClassifierTables,
) -> ClassificationResult {
    let openalex = openalex.filter(|m| m.succeeded());
    let crossref = crossref.filter(|m| m.succeeded());

    let openalex_verdict = openalex.and_then(|m| type_verdict(m, tables));
    let crossref_verdict = crossref.and_then(|m| type_verdict(m, tables));

    if let Some(verdict) = openalex_verdict {
        let mut evidence = format!("OpenAlex {}", verdict.reason);
        if let Some(other) = crossref_verdict
            .as_ref()
            .filter(|c| c.original_research != verdict.original_research)
        {
            evidence.push_str(&format!("; Crossref disagrees ({})", other.reason));
        }
        return ClassificationResult::new(
            Question::Q1,
            Answer::Boolean(verdict.original_research),
            Confidence::High,
            evidence,
        );
    }

    if let Some(verdict) = crossref_verdict {
        let prefix = if openalex.is_some() {
            "OpenAlex type unusable; Crossref"
        } else {
            "OpenAlex unavailable; Crossref"
        };
        return ClassificationResult::new(
            Question::Q1,
            Answer::Boolean(verdict.original_research),
            Confidence::Medium,
            format!("{} {}", prefix, verdict.reason),
        );
    }

    let available: Vec<&SourceMetadata> = openalex
        .into_iter()
        .chain(crossref)
        .chain(supplementary.iter().copied().filter(|m| m.succeeded()))
        .collect();

    text_heuristic(&available, tables)
}

/// Map one source's types and title to a verdict; `None` when nothing maps
fn type_verdict(meta: &SourceMetadata, tables: &ClassifierTables) -> Option<TypeVerdict> {
    let primary = meta
        .work_type
        .as_deref()
        .and_then(|t| tables.work_category(t).map(|c| (t, c)));

    if let Some((work_type, category)) = primary.filter(|(_, c)| !c.is_research()) {
        return Some(TypeVerdict {
            original_research: false,
            reason: format!("type '{}' ({})", work_type, describe(category)),
        });
    }

    if let Some(secondary) = meta.secondary_type.as_deref() {
        if let Some(category) = tables.work_category(secondary).filter(|c| !c.is_research()) {
            return Some(TypeVerdict {
                original_research: false,
                reason: format!("Crossref type '{}' ({})", secondary, describe(category)),
            });
        }
    }

    if let Some(m) = meta.title.as_deref().and_then(|t| tables.review_title.find(t)) {
        return Some(TypeVerdict {
            original_research: false,
            reason: format!("title matches review pattern '{}'", m.as_str().trim()),
        });
    }

    primary.map(|(work_type, _)| TypeVerdict {
        original_research: true,
        reason: format!("type '{}'", work_type),
    })
}

fn describe(category: WorkCategory) -> &'static str {
    match category {
        WorkCategory::Research => "research",
        WorkCategory::Review => "review",
        WorkCategory::NonResearch => "non-research",
    }
}

/// Rules 3 and 4: keyword signals over whatever text is available
fn text_heuristic(sources: &[&SourceMetadata], tables: &ClassifierTables) -> ClassificationResult {
    if sources.is_empty() {
        return ClassificationResult::new(
            Question::Q1,
            Answer::Unknown,
            Confidence::Low,
            "No source returned metadata; cannot confirm original research",
        );
    }

    for meta in sources {
        if let Some(pub_type) = meta
            .publication_types
            .iter()
            .find(|t| tables.review_publication_types.contains(&t.trim().to_lowercase()))
        {
            return ClassificationResult::new(
                Question::Q1,
                Answer::Boolean(false),
                Confidence::Low,
                format!("{} publication type '{}'", meta.source, pub_type),
            );
        }
    }

    let text = sources
        .iter()
        .filter(|m| m.has_text())
        .map(|m| m.text())
        .collect::<Vec<_>>()
        .join(" ");

    if text.is_empty() {
        return ClassificationResult::new(
            Question::Q1,
            Answer::Unknown,
            Confidence::Low,
            "No usable work type, title or abstract; cannot confirm original research",
        );
    }

    let review = tables.review_phrases.find_all(&text);
    if !review.is_empty() {
        return ClassificationResult::new(
            Question::Q1,
            Answer::Boolean(false),
            Confidence::Low,
            format!("Text mentions review signals: {}", quote_phrases(&review)),
        );
    }

    let method = tables.method_phrases.find_all(&text);
    if !method.is_empty() {
        return ClassificationResult::new(
            Question::Q1,
            Answer::Boolean(true),
            Confidence::Low,
            format!("Text uses methodological language: {}", quote_phrases(&method)),
        );
    }

    ClassificationResult::new(
        Question::Q1,
        Answer::Unknown,
        Confidence::Low,
        "Text has neither review nor methodological signals",
    )
}

fn quote_phrases(matches: &[crate::classify::tables::PhraseMatch<'_>]) -> String {
    matches
        .iter()
        .map(|m| format!("'{}'", m.phrase))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FailureKind, SourceKind};

    fn tables() -> ClassifierTables {
        ClassifierTables::standard()
    }

    fn openalex(work_type: &str) -> SourceMetadata {
        SourceMetadata::new(SourceKind::OpenAlex).work_type(work_type)
    }

    fn crossref(work_type: &str) -> SourceMetadata {
        SourceMetadata::new(SourceKind::Crossref).work_type(work_type)
    }

    fn failed(kind: SourceKind) -> SourceMetadata {
        SourceMetadata::failed(kind, FailureKind::Timeout, "timed out")
    }

    #[test]
    fn test_openalex_review_wins_over_crossref() {
        let tables = tables();
        let oa = openalex("review");

        for cr in [crossref("journal-article"), crossref("review"), failed(SourceKind::Crossref)] {
            let result = classify_q1(Some(&oa), Some(&cr), &[], &tables);
            assert_eq!(result.answer, Answer::Boolean(false));
            assert_eq!(result.confidence, Confidence::High);
            assert!(result.evidence.starts_with("OpenAlex"));
        }
    }

    #[test]
    fn test_disagreement_is_noted() {
        let tables = tables();
        let result = classify_q1(
            Some(&openalex("article")),
            Some(&crossref("editorial")),
            &[],
            &tables,
        );

        assert!(result.is_original_research());
        assert_eq!(result.confidence, Confidence::High);
        assert!(result.evidence.contains("Crossref disagrees"));
    }

    #[test]
    fn test_crossref_fallback_when_openalex_failed() {
        let tables = tables();
        let result = classify_q1(
            Some(&failed(SourceKind::OpenAlex)),
            Some(&crossref("journal-article")),
            &[],
            &tables,
        );

        assert_eq!(result.answer, Answer::Boolean(true));
        assert_eq!(result.confidence, Confidence::Medium);
        assert!(result.evidence.contains("Crossref type 'journal-article'"));
    }

    #[test]
    fn test_unmapped_openalex_type_falls_through() {
        let tables = tables();
        let result = classify_q1(
            Some(&openalex("dataset")),
            Some(&crossref("journal-article")),
            &[],
            &tables,
        );

        assert_eq!(result.confidence, Confidence::Medium);
        assert!(result.is_original_research());
    }

    #[test]
    fn test_both_types_unmapped_use_text() {
        let tables = tables();
        let oa = openalex("dataset").abstract_text("We measured hepatic insulin signalling.");
        let cr = crossref("dissertation");
        let result = classify_q1(Some(&oa), Some(&cr), &[], &tables);

        assert_eq!(result.answer, Answer::Boolean(true));
        assert_eq!(result.confidence, Confidence::Low);
        assert!(result.evidence.contains("'we measured'"));

        let bare = classify_q1(Some(&openalex("dataset")), Some(&cr), &[], &tables);
        assert_eq!(bare.answer, Answer::Unknown);
        assert_eq!(bare.confidence, Confidence::Low);
    }

    #[test]
    fn test_type_crossref_exclusion() {
        let tables = tables();
        let oa = openalex("article").secondary_type("book-chapter");
        let result = classify_q1(Some(&oa), None, &[], &tables);

        assert_eq!(result.answer, Answer::Boolean(false));
        assert_eq!(result.confidence, Confidence::High);
        assert!(result.evidence.contains("book-chapter"));
    }

    #[test]
    fn test_review_title_overrides_article_type() {
        let tables = tables();
        let oa = openalex("article").title("Statins and dementia: a systematic review");
        let result = classify_q1(Some(&oa), None, &[], &tables);

        assert_eq!(result.answer, Answer::Boolean(false));
        assert_eq!(result.confidence, Confidence::High);
        assert!(result.evidence.contains("systematic review"));
    }

    #[test]
    fn test_text_heuristic_review() {
        let tables = tables();
        let pubmed = SourceMetadata::new(SourceKind::PubMed)
            .title("Gut microbiome")
            .abstract_text("We conducted a systematic review and meta-analysis of 40 trials.");
        let result = classify_q1(
            Some(&failed(SourceKind::OpenAlex)),
            Some(&failed(SourceKind::Crossref)),
            &[&pubmed],
            &tables,
        );

        assert_eq!(result.answer, Answer::Boolean(false));
        assert_eq!(result.confidence, Confidence::Low);
    }

    #[test]
    fn test_text_heuristic_methods() {
        let tables = tables();
        let oa = SourceMetadata::new(SourceKind::OpenAlex)
            .abstract_text("Mice were fed a high-fat diet and we measured insulin.");
        let result = classify_q1(Some(&oa), None, &[], &tables);

        assert_eq!(result.answer, Answer::Boolean(true));
        assert_eq!(result.confidence, Confidence::Low);
        assert!(result.evidence.contains("'mice were'"));
    }

    #[test]
    fn test_pubmed_publication_type_signal() {
        let tables = tables();
        let pubmed = SourceMetadata::new(SourceKind::PubMed)
            .publication_types(vec!["Journal Article".into(), "Review".into()]);
        let result = classify_q1(None, None, &[&pubmed], &tables);

        assert_eq!(result.answer, Answer::Boolean(false));
        assert_eq!(result.confidence, Confidence::Low);
        assert!(result.evidence.contains("'Review'"));
    }

    #[test]
    fn test_all_failed_is_unknown() {
        let tables = tables();
        let pubmed = failed(SourceKind::PubMed);
        let result = classify_q1(
            Some(&failed(SourceKind::OpenAlex)),
            Some(&failed(SourceKind::Crossref)),
            &[&pubmed],
            &tables,
        );

        assert_eq!(result.answer, Answer::Unknown);
        assert_eq!(result.confidence, Confidence::Low);
        assert!(!result.is_original_research());
    }

    #[test]
    fn test_text_without_signals_is_unknown() {
        let tables = tables();
        let oa = SourceMetadata::new(SourceKind::OpenAlex).title("Notes on hepatic lipids");
        let result = classify_q1(Some(&oa), None, &[], &tables);

        assert_eq!(result.answer, Answer::Unknown);
        assert_eq!(result.confidence, Confidence::Low);
    }
}
