//! Metadata source adapters with a uniform, failure-as-data interface.
//!
//! Each provider (OpenAlex, Crossref, PubMed) implements [`MetadataSource`],
//! translating its own response schema into a [`SourceMetadata`]. Adapters
//! only implement [`MetadataSource::lookup`], which may fail; callers use
//! the provided [`MetadataSource::fetch_metadata`], which never fails and
//! instead returns a record whose `failure` field describes what went wrong.
//! That lets the classifiers apply their fallback policy over plain data.
//!
//! All adapters share one [`HttpClient`](crate::utils::HttpClient) so that
//! rate limits and cancellation apply across the whole run.

mod crossref;
mod openalex;
mod pubmed;
mod registry;

pub mod mock;

pub use crossref::CrossrefSource;
pub use mock::MockSource;
pub use openalex::OpenAlexSource;
pub use pubmed::PubMedSource;
pub use registry::SourceSet;

use crate::models::{FailureKind, PaperIdentifier, SourceKind, SourceMetadata};
use crate::utils::FetchError;
use async_trait::async_trait;

/// Interface implemented by every metadata provider
#[async_trait]
pub trait MetadataSource: Send + Sync + std::fmt::Debug {
    /// Which provider this adapter talks to
    fn kind(&self) -> SourceKind;

    /// Unique identifier for this source (e.g., "openalex", "pubmed")
    fn id(&self) -> &str {
        self.kind().id()
    }

    /// Look up a DOI and translate the provider's record
    async fn lookup(&self, doi: &PaperIdentifier) -> Result<SourceMetadata, SourceError>;

    /// Look up a DOI, converting any failure into a failed record
    async fn fetch_metadata(&self, doi: &PaperIdentifier) -> SourceMetadata {
        match self.lookup(doi).await {
            Ok(metadata) => metadata,
            Err(err) => {
                if matches!(err, SourceError::Http(FetchError::Cancelled)) {
                    tracing::debug!(source = self.id(), %doi, "Lookup cancelled");
                } else {
                    tracing::warn!(source = self.id(), %doi, "Lookup failed: {}", err);
                }
                SourceMetadata::failed(self.kind(), err.failure_kind(), err.to_string())
            }
        }
    }
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Transport-level failure after retries
    #[error(transparent)]
    Http(#[from] FetchError),

    /// The provider has no record for this identifier
    #[error("Not found: {0}")]
    NotFound(String),

    /// Parsing error (XML, JSON)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl SourceError {
    /// Category recorded on the failed metadata
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            SourceError::Http(FetchError::Timeout { .. }) => FailureKind::Timeout,
            SourceError::Http(FetchError::HttpStatus { status: 404, .. }) => FailureKind::NotFound,
            SourceError::Http(FetchError::HttpStatus { .. }) => FailureKind::HttpStatus,
            SourceError::Http(FetchError::Network(_)) => FailureKind::Network,
            SourceError::Http(FetchError::Cancelled) => FailureKind::Cancelled,
            SourceError::NotFound(_) => FailureKind::NotFound,
            SourceError::Parse(_) => FailureKind::Parse,
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

impl From<quick_xml::Error> for SourceError {
    fn from(err: quick_xml::Error) -> Self {
        SourceError::Parse(format!("XML: {}", err))
    }
}

/// Append the `mailto` courtesy parameter used by OpenAlex and Crossref
pub(crate) fn with_mailto(mut url: url::Url, email: Option<&str>) -> String {
    if let Some(email) = email {
        url.query_pairs_mut().append_pair("mailto", email);
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kinds() {
        let not_found: SourceError = FetchError::HttpStatus {
            status: 404,
            url: String::new(),
            retry_after: None,
        }
        .into();
        assert_eq!(not_found.failure_kind(), FailureKind::NotFound);

        let timeout: SourceError = FetchError::Timeout { url: String::new() }.into();
        assert_eq!(timeout.failure_kind(), FailureKind::Timeout);

        assert_eq!(
            SourceError::Parse("bad".into()).failure_kind(),
            FailureKind::Parse
        );
    }

    #[tokio::test]
    async fn test_fetch_metadata_turns_errors_into_data() {
        let source = MockSource::new(SourceKind::Crossref);
        let doi = PaperIdentifier::parse("10.1234/missing").unwrap();

        let metadata = source.fetch_metadata(&doi).await;
        assert!(!metadata.succeeded());
        assert_eq!(metadata.source, SourceKind::Crossref);
        assert_eq!(metadata.failure.unwrap().kind, FailureKind::NotFound);
    }

    #[test]
    fn test_with_mailto() {
        let url = url::Url::parse("https://api.crossref.org/works/10.1/x").unwrap();
        assert_eq!(
            with_mailto(url.clone(), Some("me@example.org")),
            "https://api.crossref.org/works/10.1/x?mailto=me%40example.org"
        );
        assert_eq!(with_mailto(url, None), "https://api.crossref.org/works/10.1/x");
    }
}
