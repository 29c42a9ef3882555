//! Ordered set of metadata sources consulted for every paper.

use futures_util::future::join_all;
use std::sync::Arc;

use super::{CrossrefSource, MetadataSource, OpenAlexSource, PubMedSource};
use crate::config::Config;
use crate::models::{PaperIdentifier, SourceKind, SourceMetadata};
use crate::utils::HttpClient;

/// The adapters used for a run, in fallback order
///
/// Order matters only for reporting: [`SourceSet::fetch_all`] queries every
/// adapter concurrently and returns the records in registration order.
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    sources: Vec<Arc<dyn MetadataSource>>,
}

impl SourceSet {
    /// An empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// OpenAlex, Crossref and PubMed sharing one HTTP client
    pub fn standard(client: Arc<HttpClient>, config: &Config) -> Self {
        let email = config.http.contact_email.clone();

        Self::new()
            .with(Arc::new(OpenAlexSource::new(Arc::clone(&client), email.clone())))
            .with(Arc::new(CrossrefSource::new(Arc::clone(&client), email.clone())))
            .with(Arc::new(PubMedSource::new(
                client,
                config.pubmed.tool.clone(),
                email,
                config.pubmed.api_key.clone(),
            )))
    }

    /// Append a source (builder style)
    pub fn with(mut self, source: Arc<dyn MetadataSource>) -> Self {
        self.register(source);
        self
    }

    /// Append a source; a source of the same kind is replaced in place
    pub fn register(&mut self, source: Arc<dyn MetadataSource>) {
        match self.sources.iter().position(|s| s.kind() == source.kind()) {
            Some(index) => self.sources[index] = source,
            None => self.sources.push(source),
        }
    }

    /// Get a source by kind
    pub fn get(&self, kind: SourceKind) -> Option<&Arc<dyn MetadataSource>> {
        self.sources.iter().find(|s| s.kind() == kind)
    }

    /// Get all registered sources in order
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn MetadataSource>> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Query every source concurrently; failures come back as failed records
    pub async fn fetch_all(&self, doi: &PaperIdentifier) -> Vec<SourceMetadata> {
        join_all(self.sources.iter().map(|source| source.fetch_metadata(doi))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockSource;

    #[test]
    fn test_standard_set_order() {
        let client = Arc::new(HttpClient::new(Default::default()).unwrap());
        let set = SourceSet::standard(client, &Config::default());

        let kinds: Vec<_> = set.all().map(|s| s.kind()).collect();
        assert_eq!(
            kinds,
            vec![SourceKind::OpenAlex, SourceKind::Crossref, SourceKind::PubMed]
        );
        assert_eq!(set.get(SourceKind::PubMed).unwrap().id(), "pubmed");
    }

    #[test]
    fn test_register_replaces_same_kind() {
        let mut set = SourceSet::new()
            .with(Arc::new(MockSource::new(SourceKind::OpenAlex)))
            .with(Arc::new(MockSource::new(SourceKind::Crossref)));
        set.register(Arc::new(MockSource::new(SourceKind::OpenAlex)));

        assert_eq!(set.len(), 2);
        assert_eq!(set.all().next().unwrap().kind(), SourceKind::OpenAlex);
    }

    #[tokio::test]
    async fn test_fetch_all_keeps_order_and_failures() {
        let doi = PaperIdentifier::parse("10.1234/abc").unwrap();
        let set = SourceSet::new()
            .with(Arc::new(MockSource::new(SourceKind::OpenAlex)))
            .with(Arc::new(MockSource::new(SourceKind::Crossref).with_record(
                "10.1234/abc",
                SourceMetadata::new(SourceKind::Crossref).work_type("journal-article"),
            )));

        let records = set.fetch_all(&doi).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source, SourceKind::OpenAlex);
        assert!(!records[0].succeeded());
        assert!(records[1].succeeded());
    }
}
