//! Batch driver: normalize → fetch → classify → aggregate for every input.

use futures_util::stream::{self, StreamExt};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::aggregate::{aggregate, skipped_invalid};
use crate::classify::Classifier;
use crate::config::PipelineSettings;
use crate::models::{
    normalize, Confidence, InvalidIdentifier, PaperIdentifier, PaperRecord, PaperStatus,
};
use crate::sources::SourceSet;

/// One unit of work after normalization and deduplication
#[derive(Debug, Clone)]
enum WorkItem {
    Valid {
        position: usize,
        raw: String,
        identifier: PaperIdentifier,
    },
    Invalid {
        position: usize,
        raw: String,
        error: InvalidIdentifier,
    },
}

/// Runs the screening pipeline over a batch of identifiers
#[derive(Debug)]
pub struct Pipeline {
    sources: SourceSet,
    classifier: Classifier,
    concurrency: usize,
    threshold: Confidence,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(sources: SourceSet, classifier: Classifier, settings: &PipelineSettings) -> Self {
        Self {
            sources,
            classifier,
            concurrency: settings.concurrency.max(1),
            threshold: settings.confidence_threshold,
            cancel: CancellationToken::new(),
        }
    }

    /// Observe a run-level cancellation token, normally the one shared with
    /// the HTTP client
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Process every input and return one record per distinct identifier,
    /// ordered by input position
    pub async fn run(&self, inputs: &[String]) -> Vec<PaperRecord> {
        self.run_with_progress(inputs, |_| {}).await
    }

    /// Like [`Pipeline::run`], calling `on_record` as each paper completes
    pub async fn run_with_progress<F>(&self, inputs: &[String], mut on_record: F) -> Vec<PaperRecord>
    where
        F: FnMut(&PaperRecord),
    {
        let work = plan(inputs);
        info!(
            inputs = inputs.len(),
            papers = work.len(),
            concurrency = self.concurrency,
            "Starting screening run"
        );

        let mut results = stream::iter(work)
            .map(|item| self.process(item))
            .buffer_unordered(self.concurrency);

        let mut records = Vec::new();
        while let Some(outcome) = results.next().await {
            if let Some(record) = outcome {
                on_record(&record);
                records.push(record);
            }
        }
        records.sort_by_key(|r| r.position);

        if self.cancel.is_cancelled() {
            warn!(completed = records.len(), "Run cancelled; keeping completed records");
        }
        info!(
            records = records.len(),
            included = records.iter().filter(|r| r.included).count(),
            "Screening run finished"
        );
        records
    }

    /// `None` when the run was cancelled before this paper was started
    async fn process(&self, item: WorkItem) -> Option<PaperRecord> {
        match item {
            WorkItem::Invalid {
                position,
                raw,
                error,
            } => {
                warn!(position, "Skipping invalid identifier: {}", error);
                Some(skipped_invalid(position, raw, &error))
            }
            WorkItem::Valid {
                position,
                raw,
                identifier,
            } => {
                if self.cancel.is_cancelled() {
                    debug!(%identifier, "Not started: run cancelled");
                    return None;
                }
                Some(self.screen(position, raw, identifier).await)
            }
        }
    }

    /// Fetch, classify and aggregate one valid identifier
    pub async fn screen(
        &self,
        position: usize,
        raw: String,
        identifier: PaperIdentifier,
    ) -> PaperRecord {
        debug!(%identifier, "Fetching metadata");
        let metadata = self.sources.fetch_all(&identifier).await;
        let c = self.classifier.classify(&metadata);

        let record = aggregate(
            position,
            raw,
            identifier,
            metadata,
            c.q1,
            c.q2,
            c.q3,
            c.q5,
            self.threshold,
        );

        match record.status {
            PaperStatus::FetchFailed => warn!(doi = record.display_id(), "All sources failed"),
            _ => debug!(
                doi = record.display_id(),
                status = %record.status,
                included = record.included,
                "Paper screened"
            ),
        }
        record
    }
}

/// Normalize inputs and drop repeats of an identifier, keeping the first
/// occurrence. Invalid inputs are kept once per distinct trimmed string.
fn plan(inputs: &[String]) -> Vec<WorkItem> {
    let mut seen_valid = HashSet::new();
    let mut seen_invalid = HashSet::new();
    let mut work = Vec::new();

    for (position, raw) in inputs.iter().enumerate() {
        match normalize(raw) {
            Ok(identifier) => {
                if seen_valid.insert(identifier.clone()) {
                    work.push(WorkItem::Valid {
                        position,
                        raw: raw.clone(),
                        identifier,
                    });
                } else {
                    debug!(position, %identifier, "Duplicate identifier dropped");
                }
            }
            Err(error) => {
                if seen_invalid.insert(raw.trim().to_string()) {
                    work.push(WorkItem::Invalid {
                        position,
                        raw: raw.clone(),
                        error,
                    });
                }
            }
        }
    }
    work
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SourceKind, SourceMetadata};
    use crate::sources::MockSource;
    use std::sync::Arc;

    fn inputs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_plan_deduplicates_after_normalization() {
        let work = plan(&inputs(&[
            "10.1234/ABC",
            "https://doi.org/10.1234/abc",
            "garbage",
            " garbage ",
            "10.5678/xyz",
        ]));

        let positions: Vec<usize> = work
            .iter()
            .map(|w| match w {
                WorkItem::Valid { position, .. } | WorkItem::Invalid { position, .. } => *position,
            })
            .collect();
        assert_eq!(positions, vec![0, 2, 4]);
    }

    #[tokio::test]
    async fn test_run_orders_by_position() {
        let openalex = MockSource::new(SourceKind::OpenAlex)
            .with_record("10.1000/a", SourceMetadata::new(SourceKind::OpenAlex).work_type("article"))
            .with_record("10.1000/b", SourceMetadata::new(SourceKind::OpenAlex).work_type("review"));
        let sources = SourceSet::new().with(Arc::new(openalex));
        let pipeline = Pipeline::new(sources, Classifier::default(), &PipelineSettings::default());

        let mut seen = 0;
        let records = pipeline
            .run_with_progress(&inputs(&["10.1000/a", "bad", "10.1000/b", "10.1000/A"]), |_| seen += 1)
            .await;

        assert_eq!(seen, 3);
        let ids: Vec<_> = records.iter().map(|r| r.display_id()).collect();
        assert_eq!(ids, vec!["10.1000/a", "bad", "10.1000/b"]);
        assert!(records[0].included);
        assert_eq!(records[1].status, PaperStatus::SkippedInvalidId);
        assert!(!records[2].included);
    }

    #[tokio::test]
    async fn test_cancelled_run_does_not_start_papers() {
        let openalex = Arc::new(MockSource::new(SourceKind::OpenAlex));
        let sources = SourceSet::new().with(openalex.clone());
        let pipeline = Pipeline::new(sources, Classifier::default(), &PipelineSettings::default());
        pipeline.cancellation().cancel();

        let records = pipeline.run(&inputs(&["10.1000/a", "10.1000/b", "nope"])).await;

        assert_eq!(openalex.calls(), 0);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, PaperStatus::SkippedInvalidId);
    }
}
