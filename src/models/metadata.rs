//! Provider-neutral metadata records produced by the source adapters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The provider a metadata record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    OpenAlex,
    Crossref,
    PubMed,
}

impl SourceKind {
    /// Returns the display name of the source
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::OpenAlex => "OpenAlex",
            SourceKind::Crossref => "Crossref",
            SourceKind::PubMed => "PubMed",
        }
    }

    /// Returns the source identifier
    pub fn id(&self) -> &'static str {
        match self {
            SourceKind::OpenAlex => "openalex",
            SourceKind::Crossref => "crossref",
            SourceKind::PubMed => "pubmed",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A MeSH qualifier (subheading) attached to a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshQualifier {
    pub ui: String,
    pub name: String,
    pub major_topic: bool,
}

/// A MeSH descriptor heading assigned to a PubMed record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshTerm {
    /// Descriptor unique id, e.g. `D051379`
    pub ui: String,

    /// Descriptor name, e.g. `Mice`
    pub name: String,

    /// Whether the descriptor is a major topic of the article
    pub major_topic: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qualifiers: Vec<MeshQualifier>,
}

impl MeshTerm {
    /// Create a descriptor without qualifiers
    pub fn new(ui: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ui: ui.into(),
            name: name.into(),
            major_topic: false,
            qualifiers: Vec::new(),
        }
    }

    /// Label used in evidence strings: `Mice (D051379)`
    pub fn label(&self) -> String {
        if self.ui.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, self.ui)
        }
    }
}

/// Category of a failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    NotFound,
    Timeout,
    HttpStatus,
    Network,
    Parse,
    Cancelled,
}

/// Why a source could not provide metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub kind: FailureKind,
    pub detail: String,
}

/// Metadata from one provider for one identifier.
///
/// A record is either successful (carrying whatever fields the provider
/// returned) or failed (carrying a [`FetchFailure`] and no content).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub source: SourceKind,

    /// Provider-side identifier (OpenAlex work id, PMID)
    pub external_id: Option<String>,

    pub title: Option<String>,

    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,

    /// Primary work type / genre as reported by the provider
    pub work_type: Option<String>,

    /// Secondary type (OpenAlex reports the Crossref type alongside its own)
    pub secondary_type: Option<String>,

    /// PubMed publication types (`Journal Article`, `Review`, ...)
    #[serde(default)]
    pub publication_types: Vec<String>,

    #[serde(default)]
    pub mesh_terms: Vec<MeshTerm>,

    pub fetched_at: DateTime<Utc>,

    pub failure: Option<FetchFailure>,
}

impl SourceMetadata {
    /// An empty successful record, to be filled by the adapter
    pub fn new(source: SourceKind) -> Self {
        Self {
            source,
            external_id: None,
            title: None,
            abstract_text: None,
            work_type: None,
            secondary_type: None,
            publication_types: Vec::new(),
            mesh_terms: Vec::new(),
            fetched_at: Utc::now(),
            failure: None,
        }
    }

    /// A failed record
    pub fn failed(source: SourceKind, kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            failure: Some(FetchFailure {
                kind,
                detail: detail.into(),
            }),
            ..Self::new(source)
        }
    }

    pub fn external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = non_empty(id.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = non_empty(title.into());
        self
    }

    pub fn abstract_text(mut self, text: impl Into<String>) -> Self {
        self.abstract_text = non_empty(text.into());
        self
    }

    pub fn work_type(mut self, work_type: impl Into<String>) -> Self {
        self.work_type = non_empty(work_type.into().trim().to_lowercase());
        self
    }

    pub fn secondary_type(mut self, work_type: impl Into<String>) -> Self {
        self.secondary_type = non_empty(work_type.into().trim().to_lowercase());
        self
    }

    pub fn publication_types(mut self, types: Vec<String>) -> Self {
        self.publication_types = types;
        self
    }

    pub fn mesh_terms(mut self, terms: Vec<MeshTerm>) -> Self {
        self.mesh_terms = terms;
        self
    }

    /// Whether the fetch succeeded
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    /// Whether the fetch was abandoned because the run was cancelled
    pub fn was_cancelled(&self) -> bool {
        matches!(&self.failure, Some(f) if f.kind == FailureKind::Cancelled)
    }

    /// Title and abstract joined for keyword scanning
    pub fn text(&self) -> String {
        [self.title.as_deref(), self.abstract_text.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether there is any title or abstract to scan
    pub fn has_text(&self) -> bool {
        self.title.is_some() || self.abstract_text.is_some()
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_normalizes_fields() {
        let meta = SourceMetadata::new(SourceKind::Crossref)
            .title("  A study  ")
            .abstract_text("")
            .work_type("Journal-Article ");

        assert!(meta.succeeded());
        assert_eq!(meta.title.as_deref(), Some("A study"));
        assert!(meta.abstract_text.is_none());
        assert_eq!(meta.work_type.as_deref(), Some("journal-article"));
        assert_eq!(meta.text(), "A study");
    }

    #[test]
    fn test_failed_record() {
        let meta = SourceMetadata::failed(SourceKind::PubMed, FailureKind::NotFound, "no PMID");
        assert!(!meta.succeeded());
        assert!(!meta.was_cancelled());
        assert!(!meta.has_text());
        assert_eq!(meta.failure.unwrap().detail, "no PMID");
    }

    #[test]
    fn test_mesh_label() {
        assert_eq!(MeshTerm::new("D051379", "Mice").label(), "Mice (D051379)");
        assert_eq!(MeshTerm::new("", "Mice").label(), "Mice");
    }
}
