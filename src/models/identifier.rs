//! DOI identifiers and their canonical form.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Canonical DOI shape: `10.<registrant>/<suffix>`
static DOI_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^10\.\d{4,9}/[-._;()/:a-z0-9]+$").expect("valid DOI regex"));

/// Resolver and scheme prefixes stripped before validation, checked in order
const DOI_PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi.org/",
    "dx.doi.org/",
    "doi:",
];

/// Raised when an input string is not a DOI
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid DOI identifier: {raw:?}")]
pub struct InvalidIdentifier {
    /// The input exactly as received
    pub raw: String,
}

impl InvalidIdentifier {
    fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
        }
    }
}

/// A validated, lowercase, scheme-stripped DOI
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaperIdentifier(String);

impl PaperIdentifier {
    /// Parse and canonicalize a raw DOI string
    pub fn parse(raw: &str) -> Result<Self, InvalidIdentifier> {
        normalize(raw)
    }

    /// The canonical DOI text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The registrant prefix (`10.1038` for `10.1038/nature12345`)
    pub fn registrant(&self) -> &str {
        self.0.split_once('/').map(|(prefix, _)| prefix).unwrap_or(&self.0)
    }

    /// Resolver URL for this DOI
    pub fn url(&self) -> String {
        format!("https://doi.org/{}", self.0)
    }
}

impl fmt::Display for PaperIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PaperIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for PaperIdentifier {
    type Err = InvalidIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize(s)
    }
}

/// Canonicalize a raw DOI string.
///
/// Surrounding whitespace and resolver prefixes (`https://doi.org/`,
/// `dx.doi.org/`, `doi:`) are removed, percent-escapes are decoded and the
/// result is lowercased before being checked against the DOI pattern.
/// No network access is performed.
pub fn normalize(raw: &str) -> Result<PaperIdentifier, InvalidIdentifier> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InvalidIdentifier::new(raw));
    }

    let lowered = trimmed.to_lowercase();
    let mut doi = lowered.as_str();
    for prefix in DOI_PREFIXES {
        if let Some(rest) = doi.strip_prefix(prefix) {
            doi = rest.trim_start();
            break;
        }
    }

    let decoded = urlencoding::decode(doi).map_err(|_| InvalidIdentifier::new(raw))?;
    let doi = decoded.trim().to_lowercase();

    if !DOI_PATTERN.is_match(&doi) {
        return Err(InvalidIdentifier::new(raw));
    }

    Ok(PaperIdentifier(doi))
}
