//! Crossref metadata source implementation.

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, LazyLock};

use crate::models::{PaperIdentifier, SourceKind, SourceMetadata};
use crate::sources::{with_mailto, MetadataSource, SourceError};
use crate::utils::HttpClient;

const CROSSREF_API_BASE: &str = "https://api.crossref.org";

static JATS_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Crossref metadata source
///
/// Uses the Crossref REST API works-by-DOI lookup.
#[derive(Debug, Clone)]
pub struct CrossrefSource {
    client: Arc<HttpClient>,
    base_url: String,
    email: Option<String>,
}

impl CrossrefSource {
    pub fn new(client: Arc<HttpClient>, email: Option<String>) -> Self {
        Self {
            client,
            base_url: CROSSREF_API_BASE.to_string(),
            email,
        }
    }

    /// Point the source at another API root (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_url(&self, doi: &PaperIdentifier) -> Result<String, SourceError> {
        let url = url::Url::parse(&format!("{}/works/{}", self.base_url, doi.as_str()))
            .map_err(|e| SourceError::Parse(format!("Invalid Crossref URL: {}", e)))?;
        Ok(with_mailto(url, self.email.as_deref()))
    }

    fn parse_work(work: CRWork) -> SourceMetadata {
        let abstract_text = work.r#abstract.as_deref().map(strip_jats).unwrap_or_default();

        SourceMetadata::new(SourceKind::Crossref)
            .external_id(work.doi.unwrap_or_default())
            .title(work.title.unwrap_or_default().join(" "))
            .abstract_text(abstract_text)
            .work_type(work.r#type.unwrap_or_default())
    }
}

#[async_trait]
impl MetadataSource for CrossrefSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Crossref
    }

    async fn lookup(&self, doi: &PaperIdentifier) -> Result<SourceMetadata, SourceError> {
        let url = self.build_url(doi)?;
        let response = self.client.fetch(&url, &[("Accept", "application/json".to_string())], None).await?;

        let data: CRResponse = response
            .json()
            .map_err(|e| SourceError::Parse(format!("Failed to parse Crossref JSON: {}", e)))?;

        Ok(Self::parse_work(data.message))
    }
}

/// Strip JATS markup (`<jats:p>`, `<jats:title>`) from a Crossref abstract
fn strip_jats(text: &str) -> String {
    let stripped = JATS_TAG.replace_all(text, " ");
    WHITESPACE.replace_all(stripped.trim(), " ").into_owned()
}

// ===== Crossref API Types =====

#[derive(Debug, Deserialize)]
struct CRResponse {
    message: CRWork,
}

#[derive(Debug, Deserialize)]
struct CRWork {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(default)]
    title: Option<Vec<String>>,
    r#type: Option<String>,
    r#abstract: Option<String>,
}
