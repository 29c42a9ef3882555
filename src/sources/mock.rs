//! Mock source for testing purposes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::models::{PaperIdentifier, SourceKind, SourceMetadata};
use crate::sources::{MetadataSource, SourceError};
use crate::utils::FetchError;

#[derive(Debug, Clone)]
enum MockResponse {
    Found(SourceMetadata),
    Fail(FetchError),
}

/// A mock source that returns predefined records per DOI.
///
/// DOIs without a configured response are reported as not found.
#[derive(Debug)]
pub struct MockSource {
    kind: SourceKind,
    responses: Mutex<HashMap<String, MockResponse>>,
    calls: AtomicUsize,
}

impl MockSource {
    /// Create a new mock source impersonating `kind`.
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            responses: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Return `metadata` for `doi`. The record's source is forced to this mock's kind.
    pub fn with_record(self, doi: &str, mut metadata: SourceMetadata) -> Self {
        metadata.source = self.kind;
        self.insert(doi, MockResponse::Found(metadata));
        self
    }

    /// Fail lookups of `doi` with a transport error.
    pub fn with_error(self, doi: &str, error: FetchError) -> Self {
        self.insert(doi, MockResponse::Fail(error));
        self
    }

    /// Number of lookups performed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn insert(&self, doi: &str, response: MockResponse) {
        let key = PaperIdentifier::parse(doi)
            .map(|id| id.as_str().to_string())
            .unwrap_or_else(|_| doi.to_string());
        let mut guard = self.responses.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.insert(key, response);
    }
}

#[async_trait]
impl MetadataSource for MockSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn lookup(&self, doi: &PaperIdentifier) -> Result<SourceMetadata, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let guard = self.responses.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.get(doi.as_str()) {
            Some(MockResponse::Found(metadata)) => Ok(metadata.clone()),
            Some(MockResponse::Fail(error)) => Err(SourceError::Http(error.clone())),
            None => Err(SourceError::NotFound(format!("{} has no record for {}", self.kind, doi))),
        }
    }
}
