//! OpenAlex metadata source implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{PaperIdentifier, SourceKind, SourceMetadata};
use crate::sources::{with_mailto, MetadataSource, SourceError};
use crate::utils::HttpClient;

const OPENALEX_API_BASE: &str = "https://api.openalex.org";

/// OpenAlex metadata source
///
/// Uses the OpenAlex REST API work-by-DOI lookup. Supplying a contact email
/// puts requests in the "polite pool".
#[derive(Debug, Clone)]
pub struct OpenAlexSource {
    client: Arc<HttpClient>,
    base_url: String,
    email: Option<String>,
}

impl OpenAlexSource {
    /// Create a new OpenAlex source
    pub fn new(client: Arc<HttpClient>, email: Option<String>) -> Self {
        Self {
            client,
            base_url: OPENALEX_API_BASE.to_string(),
            email,
        }
    }

    /// Point the source at another API root (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build the work lookup URL
    fn build_url(&self, doi: &PaperIdentifier) -> Result<String, SourceError> {
        let url = url::Url::parse(&format!("{}/works/doi:{}", self.base_url, doi.as_str()))
            .map_err(|e| SourceError::Parse(format!("Invalid OpenAlex URL: {}", e)))?;
        Ok(with_mailto(url, self.email.as_deref()))
    }

    /// Parse an OpenAlex work into source metadata
    fn parse_work(work: OAWork) -> SourceMetadata {
        let title = work.title.or(work.display_name).unwrap_or_default();
        let abstract_text = work
            .abstract_inverted_index
            .as_ref()
            .map(rebuild_abstract)
            .unwrap_or_default();

        SourceMetadata::new(SourceKind::OpenAlex)
            .external_id(work.id.unwrap_or_default())
            .title(title)
            .abstract_text(abstract_text)
            .work_type(work.r#type.unwrap_or_default())
            .secondary_type(work.type_crossref.unwrap_or_default())
    }
}

#[async_trait]
impl MetadataSource for OpenAlexSource {
    fn kind(&self) -> SourceKind {
        SourceKind::OpenAlex
    }

    async fn lookup(&self, doi: &PaperIdentifier) -> Result<SourceMetadata, SourceError> {
        let url = self.build_url(doi)?;
        let response = self.client.fetch(&url, &[("Accept", "application/json".to_string())], None).await?;

        let work: OAWork = response
            .json()
            .map_err(|e| SourceError::Parse(format!("Failed to parse OpenAlex JSON: {}", e)))?;

        Ok(Self::parse_work(work))
    }
}

/// Rebuild plain-text abstract from OpenAlex's `{word: [positions]}` index
fn rebuild_abstract(index: &HashMap<String, Vec<usize>>) -> String {
    let mut positioned: Vec<(usize, &str)> = index
        .iter()
        .flat_map(|(word, positions)| positions.iter().map(move |p| (*p, word.as_str())))
        .collect();
    positioned.sort_unstable_by_key(|(position, _)| *position);

    positioned
        .into_iter()
        .map(|(_, word)| word)
        .collect::<Vec<_>>()
        .join(" ")
}

// ===== OpenAlex API Types =====

#[derive(Debug, Deserialize)]
struct OAWork {
    id: Option<String>,
    title: Option<String>,
    display_name: Option<String>,
    r#type: Option<String>,
    type_crossref: Option<String>,
    abstract_inverted_index: Option<HashMap<String, Vec<usize>>>,
}
