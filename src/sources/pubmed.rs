//! PubMed metadata source implementation.
//!
//! A DOI is resolved to a PMID through the PMC ID converter, falling back to
//! an E-utilities `esearch` on the `[DOI]` field. The PubMed record is then
//! fetched as XML with `efetch` and parsed for title, abstract, publication
//! types and MeSH headings.

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Deserialize;
use std::sync::Arc;

use crate::models::{MeshQualifier, MeshTerm, PaperIdentifier, SourceKind, SourceMetadata};
use crate::sources::{MetadataSource, SourceError};
use crate::utils::{FetchError, HttpClient};

const IDCONV_API_BASE: &str = "https://www.ncbi.nlm.nih.gov/pmc/utils/idconv/v1.0";
const EUTILS_API_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// PubMed metadata source
#[derive(Debug, Clone)]
pub struct PubMedSource {
    client: Arc<HttpClient>,
    idconv_url: String,
    eutils_url: String,
    tool: String,
    email: Option<String>,
    api_key: Option<String>,
}

impl PubMedSource {
    /// Create a new PubMed source
    ///
    /// `tool` and `email` identify the caller to NCBI; an `api_key` raises
    /// the allowed request rate.
    pub fn new(
        client: Arc<HttpClient>,
        tool: String,
        email: Option<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            idconv_url: IDCONV_API_BASE.to_string(),
            eutils_url: EUTILS_API_BASE.to_string(),
            tool,
            email,
            api_key,
        }
    }

    /// Point the source at other API roots (for testing)
    pub fn with_base_urls(mut self, idconv: impl Into<String>, eutils: impl Into<String>) -> Self {
        self.idconv_url = idconv.into();
        self.eutils_url = eutils.into();
        self
    }

    /// Common NCBI identification parameters
    fn ncbi_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("tool", self.tool.clone())];
        if let Some(email) = &self.email {
            params.push(("email", email.clone()));
        }
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    fn build_url(
        &self,
        base: &str,
        path: &str,
        params: Vec<(&'static str, String)>,
    ) -> Result<String, SourceError> {
        let mut url = url::Url::parse(&format!("{}/{}", base.trim_end_matches('/'), path))
            .map_err(|e| SourceError::Parse(format!("Invalid NCBI URL: {}", e)))?;
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())))
            .extend_pairs(self.ncbi_params().iter().map(|(k, v)| (*k, v.as_str())));
        Ok(url.to_string())
    }

    /// Resolve a DOI to a PMID
    async fn resolve_pmid(&self, doi: &PaperIdentifier) -> Result<String, SourceError> {
        match self.idconv(doi).await {
            Ok(Some(pmid)) => return Ok(pmid),
            Ok(None) => tracing::debug!(%doi, "ID converter has no PMID, trying esearch"),
            Err(SourceError::Http(FetchError::Cancelled)) => {
                return Err(FetchError::Cancelled.into())
            }
            Err(e) => tracing::warn!(%doi, "ID converter failed: {}", e),
        }

        self.esearch(doi)
            .await?
            .ok_or_else(|| SourceError::NotFound(format!("No PMID for DOI {}", doi)))
    }

    async fn idconv(&self, doi: &PaperIdentifier) -> Result<Option<String>, SourceError> {
        let url = self.build_url(
            &self.idconv_url,
            "",
            vec![("ids", doi.as_str().to_string()), ("format", "json".to_string())],
        )?;
        let response = self.client.fetch(&url, &[], None).await?;
        let data: IdConvResponse = response.json()?;

        Ok(data
            .records
            .into_iter()
            .next()
            .and_then(|record| record.pmid)
            .filter(|pmid| !pmid.is_empty()))
    }

    async fn esearch(&self, doi: &PaperIdentifier) -> Result<Option<String>, SourceError> {
        let url = self.build_url(
            &self.eutils_url,
            "esearch.fcgi",
            vec![
                ("db", "pubmed".to_string()),
                ("term", format!("\"{}\"[DOI]", doi)),
                ("retmode", "json".to_string()),
            ],
        )?;
        let response = self.client.fetch(&url, &[], None).await?;
        let data: ESearchResponse = response.json()?;

        Ok(data.esearchresult.idlist.into_iter().next())
    }

    async fn efetch(&self, pmid: &str) -> Result<PubMedArticle, SourceError> {
        let url = self.build_url(
            &self.eutils_url,
            "efetch.fcgi",
            vec![
                ("db", "pubmed".to_string()),
                ("id", pmid.to_string()),
                ("retmode", "xml".to_string()),
            ],
        )?;
        let response = self.client.fetch(&url, &[], None).await?;

        parse_pubmed_xml(&response.body)?
            .ok_or_else(|| SourceError::NotFound(format!("No PubMed article for PMID {}", pmid)))
    }
}

#[async_trait]
impl MetadataSource for PubMedSource {
    fn kind(&self) -> SourceKind {
        SourceKind::PubMed
    }

    async fn lookup(&self, doi: &PaperIdentifier) -> Result<SourceMetadata, SourceError> {
        let pmid = self.resolve_pmid(doi).await?;
        tracing::debug!(%doi, pmid = %pmid, "Resolved PMID");

        let article = self.efetch(&pmid).await?;
        let genre = article.publication_types.first().cloned().unwrap_or_default();

        Ok(SourceMetadata::new(SourceKind::PubMed)
            .external_id(article.pmid.unwrap_or(pmid))
            .title(article.title)
            .abstract_text(article.abstract_sections.join(" "))
            .work_type(genre)
            .publication_types(article.publication_types)
            .mesh_terms(article.mesh_terms))
    }
}

// ===== NCBI API Types =====

#[derive(Debug, Deserialize)]
struct IdConvResponse {
    #[serde(default)]
    records: Vec<IdConvRecord>,
}

#[derive(Debug, Deserialize)]
struct IdConvRecord {
    pmid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: ESearchResult,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

/// Fields extracted from the first `PubmedArticle` of an efetch response
#[derive(Debug, Default, PartialEq)]
struct PubMedArticle {
    pmid: Option<String>,
    title: String,
    abstract_sections: Vec<String>,
    publication_types: Vec<String>,
    mesh_terms: Vec<MeshTerm>,
}

/// Which element's text is currently being collected
#[derive(Debug, Clone, Copy, PartialEq)]
enum Capture {
    None,
    Pmid,
    Title,
    Abstract,
    PublicationType,
    Descriptor,
    Qualifier,
}

/// Parse efetch XML. Returns `None` when the set holds no article.
fn parse_pubmed_xml(xml: &str) -> Result<Option<PubMedArticle>, SourceError> {
    let mut reader = Reader::from_str(xml);

    let mut article: Option<PubMedArticle> = None;
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut capture = Capture::None;
    let mut text = String::new();
    let mut heading: Option<MeshTerm> = None;
    let mut qualifier: Option<MeshQualifier> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let name = e.name().as_ref().to_vec();
                let parent = path.last().map(Vec::as_slice);

                match (name.as_slice(), parent) {
                    (b"PubmedArticle", _) if article.is_none() => {
                        article = Some(PubMedArticle::default());
                    }
                    // Only the citation's own PMID; comments and corrections carry others
                    (b"PMID", Some(b"MedlineCitation")) => capture = Capture::Pmid,
                    (b"ArticleTitle", _) => capture = Capture::Title,
                    (b"AbstractText", _) => capture = Capture::Abstract,
                    (b"PublicationType", _) => capture = Capture::PublicationType,
                    (b"DescriptorName", _) => {
                        let (ui, major) = mesh_attributes(e);
                        heading = Some(MeshTerm {
                            major_topic: major,
                            ..MeshTerm::new(ui, String::new())
                        });
                        capture = Capture::Descriptor;
                    }
                    (b"QualifierName", _) => {
                        let (ui, major) = mesh_attributes(e);
                        qualifier = Some(MeshQualifier {
                            ui,
                            name: String::new(),
                            major_topic: major,
                        });
                        capture = Capture::Qualifier;
                    }
                    _ => {}
                }
                path.push(name);
            }
            Event::Text(ref e) => {
                if capture != Capture::None {
                    text.push_str(&e.unescape()?);
                }
            }
            Event::End(ref e) => {
                path.pop();
                let collected = collapse_whitespace(&text);

                if let Some(current) = article.as_mut() {
                    match (e.name().as_ref(), capture) {
                        (b"PMID", Capture::Pmid) => current.pmid = Some(collected),
                        (b"ArticleTitle", Capture::Title) => current.title = collected,
                        (b"AbstractText", Capture::Abstract) if !collected.is_empty() => {
                            current.abstract_sections.push(collected)
                        }
                        (b"PublicationType", Capture::PublicationType) => {
                            current.publication_types.push(collected)
                        }
                        (b"DescriptorName", Capture::Descriptor) => {
                            if let Some(h) = heading.as_mut() {
                                h.name = collected;
                            }
                        }
                        (b"QualifierName", Capture::Qualifier) => {
                            if let (Some(h), Some(mut q)) = (heading.as_mut(), qualifier.take()) {
                                q.name = collected;
                                h.qualifiers.push(q);
                            }
                        }
                        (b"MeshHeading", _) => {
                            if let Some(h) = heading.take() {
                                current.mesh_terms.push(h);
                            }
                        }
                        (b"PubmedArticle", _) => break,
                        _ => {}
                    }
                }

                if is_capture_end(e.name().as_ref(), capture) {
                    capture = Capture::None;
                    text.clear();
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(article)
}

/// Whether `name` closes the element being captured (inline markup does not)
fn is_capture_end(name: &[u8], capture: Capture) -> bool {
    matches!(
        (name, capture),
        (b"PMID", Capture::Pmid)
            | (b"ArticleTitle", Capture::Title)
            | (b"AbstractText", Capture::Abstract)
            | (b"PublicationType", Capture::PublicationType)
            | (b"DescriptorName", Capture::Descriptor)
            | (b"QualifierName", Capture::Qualifier)
    )
}

/// `UI` and `MajorTopicYN` attributes of a MeSH element
fn mesh_attributes(e: &BytesStart<'_>) -> (String, bool) {
    let mut ui = String::new();
    let mut major = false;
    for attr in e.attributes().flatten() {
        let value = attr.unescape_value().unwrap_or_default();
        match attr.key.as_ref() {
            b"UI" => ui = value.into_owned(),
            b"MajorTopicYN" => major = value == "Y",
            _ => {}
        }
    }
    (ui, major)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
