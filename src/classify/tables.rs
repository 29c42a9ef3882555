//! Lookup tables driving the classifiers.
//!
//! Everything the heuristics match against lives here as data: the work-type
//! table, review patterns, MeSH heading sets, phrase lists and the species
//! lexicon. Classifiers receive a [`ClassifierTables`] by reference and stay
//! pure functions of their inputs.

use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::models::MeshTerm;

/// How a provider work type bears on Q1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkCategory {
    Research,
    Review,
    NonResearch,
}

impl WorkCategory {
    pub fn is_research(&self) -> bool {
        matches!(self, WorkCategory::Research)
    }
}

const RESEARCH_TYPES: &[&str] = &[
    "article",
    "journal-article",
    "preprint",
    "posted-content",
    "research-article",
];

const REVIEW_TYPES: &[&str] = &["review", "review-article"];

const NON_RESEARCH_TYPES: &[&str] = &[
    "editorial",
    "erratum",
    "retraction",
    "paratext",
    "commentary",
    "letter",
    "book-chapter",
    "proceedings-article",
    "reference-entry",
    "component",
    "peer-review",
];

const REVIEW_TITLE_PATTERNS: &[&str] = &[
    r"\bsystematic\s+review\b",
    r"\bmeta-?analys[ie]s\b",
    r"\bliterature\s+review\b",
    r"\breview\s+of\s+the\b",
    r"\bscoping\s+review\b",
    r"\bnarrative\s+review\b",
    r"\bcritical\s+review\b",
    r"\bcomprehensive\s+review\b",
    r":\s*a\s+review\b",
    r"\breview\s*:",
];

/// PubMed publication types that rule out original research
const REVIEW_PUBLICATION_TYPES: &[&str] = &[
    "review",
    "systematic review",
    "meta-analysis",
    "scoping review",
    "editorial",
    "comment",
    "letter",
    "news",
    "published erratum",
    "retraction of publication",
    "practice guideline",
];

const REVIEW_PHRASES: &[&str] = &[
    "systematic review",
    "meta-analysis",
    "meta analysis",
    "literature review",
    "scoping review",
    "narrative review",
    "critical review",
    "comprehensive review",
    "review of the literature",
    ": a review",
    "in this review",
    "this review",
    "we review",
    "we summarize",
];

const METHOD_PHRASES: &[&str] = &[
    "we performed",
    "we measured",
    "we investigated",
    "we examined",
    "we conducted",
    "we assessed",
    "we evaluated",
    "we found",
    "we used",
    "mice were",
    "rats were",
    "animals were",
    "cells were",
    "patients were",
    "participants were",
    "subjects were",
    "were randomized",
    "were randomly assigned",
    "were enrolled",
    "were treated",
    "were injected",
    "were administered",
    "was measured",
    "were measured",
];

/// Generic animal-use headings (UI, descriptor name)
const ANIMAL_MESH: &[(&str, &str)] = &[
    ("D000818", "Animals"),
    ("D023421", "Models, Animal"),
    ("D004195", "Disease Models, Animal"),
    ("D032761", "Animal Experimentation"),
];

/// Species-level headings (UI, descriptor name, canonical species)
const SPECIES_MESH: &[(&str, &str, &str)] = &[
    ("D051379", "Mice", "Mus musculus"),
    ("D008810", "Mice, Inbred C57BL", "Mus musculus"),
    ("D018345", "Mice, Knockout", "Mus musculus"),
    ("D008822", "Mice, Transgenic", "Mus musculus"),
    ("D051381", "Rats", "Rattus norvegicus"),
    ("D017207", "Rats, Sprague-Dawley", "Rattus norvegicus"),
    ("D017208", "Rats, Wistar", "Rattus norvegicus"),
    ("D011817", "Rabbits", "Oryctolagus cuniculus"),
    ("D006168", "Guinea Pigs", "Cavia porcellus"),
    ("D006224", "Cricetinae", "Cricetinae"),
    ("D004285", "Dogs", "Canis familiaris"),
    ("D002415", "Cats", "Felis catus"),
    ("D005289", "Ferrets", "Mustela putorius furo"),
    ("D013552", "Swine", "Sus scrofa"),
    ("D012756", "Sheep", "Ovis aries"),
    ("D002417", "Cattle", "Bos taurus"),
    ("D002645", "Chickens", "Gallus gallus"),
    ("D008253", "Macaca mulatta", "Macaca mulatta"),
    ("D008251", "Macaca fascicularis", "Macaca fascicularis"),
    ("D015027", "Zebrafish", "Danio rerio"),
    ("D014981", "Xenopus laevis", "Xenopus laevis"),
    ("D004331", "Drosophila melanogaster", "Drosophila melanogaster"),
    ("D017173", "Caenorhabditis elegans", "Caenorhabditis elegans"),
];

const IN_VIVO_MESH: &[(&str, &str)] = &[
    ("D032761", "Animal Experimentation"),
    ("D023421", "Models, Animal"),
    ("D004195", "Disease Models, Animal"),
    ("D001522", "Behavior, Animal"),
];

const IN_VITRO_MESH: &[(&str, &str)] = &[
    ("D066298", "In Vitro Techniques"),
    ("D002478", "Cells, Cultured"),
    ("D018929", "Cell Culture Techniques"),
    ("D002460", "Cell Line"),
    ("D045744", "Cell Line, Tumor"),
    ("D019149", "Bioreactors"),
];

/// Animal-model phrases; species common names are matched separately
const ANIMAL_PHRASES: &[&str] = &[
    "animal model",
    "animal models",
    "murine model",
    "rodent model",
    "rodents",
    "in mice",
    "in rats",
    "knockout mice",
    "transgenic mice",
    "wild-type mice",
    "animals were",
    "non-human primates",
    "nonhuman primates",
];

/// Common names mapped to canonical species
const SPECIES_PHRASES: &[(&str, &str)] = &[
    ("mouse", "Mus musculus"),
    ("mice", "Mus musculus"),
    ("murine model", "Mus musculus"),
    ("rat", "Rattus norvegicus"),
    ("rats", "Rattus norvegicus"),
    ("rabbit", "Oryctolagus cuniculus"),
    ("rabbits", "Oryctolagus cuniculus"),
    ("guinea pig", "Cavia porcellus"),
    ("guinea pigs", "Cavia porcellus"),
    ("hamster", "Cricetinae"),
    ("hamsters", "Cricetinae"),
    ("dog", "Canis familiaris"),
    ("dogs", "Canis familiaris"),
    ("beagle", "Canis familiaris"),
    ("beagles", "Canis familiaris"),
    ("cats", "Felis catus"),
    ("ferret", "Mustela putorius furo"),
    ("ferrets", "Mustela putorius furo"),
    ("pig", "Sus scrofa"),
    ("pigs", "Sus scrofa"),
    ("piglets", "Sus scrofa"),
    ("minipigs", "Sus scrofa"),
    ("sheep", "Ovis aries"),
    ("ewes", "Ovis aries"),
    ("cattle", "Bos taurus"),
    ("cows", "Bos taurus"),
    ("chicken", "Gallus gallus"),
    ("chickens", "Gallus gallus"),
    ("rhesus macaque", "Macaca mulatta"),
    ("rhesus macaques", "Macaca mulatta"),
    ("rhesus monkeys", "Macaca mulatta"),
    ("cynomolgus monkeys", "Macaca fascicularis"),
    ("cynomolgus macaques", "Macaca fascicularis"),
    ("zebrafish", "Danio rerio"),
    ("xenopus", "Xenopus laevis"),
    ("drosophila", "Drosophila melanogaster"),
    ("fruit fly", "Drosophila melanogaster"),
    ("fruit flies", "Drosophila melanogaster"),
    ("c. elegans", "Caenorhabditis elegans"),
    ("caenorhabditis elegans", "Caenorhabditis elegans"),
];

const IN_VIVO_PHRASES: &[&str] = &[
    "in vivo",
    "animal model",
    "were injected",
    "intraperitoneal",
    "intraperitoneally",
    "intravenously",
    "subcutaneously",
    "oral gavage",
    "were administered",
    "were dosed",
    "were anesthetized",
    "were anaesthetized",
    "were sacrificed",
    "were euthanized",
    "were implanted",
    "surgically",
    "xenograft",
    "ligation",
];

const IN_VITRO_PHRASES: &[&str] = &[
    "in vitro",
    "cell line",
    "cell lines",
    "cultured cells",
    "cell culture",
    "primary culture",
    "primary cultures",
    "organoids",
];

/// A set of MeSH descriptors matched by UI or, failing that, by name.
///
/// Each entry carries a value: the canonical species for species tables, the
/// descriptor name otherwise.
#[derive(Debug, Clone, Default)]
pub struct MeshTable {
    by_ui: HashMap<String, String>,
    by_name: HashMap<String, String>,
}

impl MeshTable {
    /// Build from `(ui, name, value)` triples
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str, &'a str)>) -> Self {
        let mut table = Self::default();
        for (ui, name, value) in entries {
            if !ui.is_empty() {
                table.by_ui.insert(ui.to_string(), value.to_string());
            }
            table.by_name.insert(name.to_lowercase(), value.to_string());
        }
        table
    }

    /// Build a plain set where each descriptor maps to its own name
    pub fn from_headings<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self::new(entries.into_iter().map(|(ui, name)| (ui, name, name)))
    }

    /// The value for a term, if the term is in the table
    pub fn lookup(&self, term: &MeshTerm) -> Option<&str> {
        self.by_ui
            .get(&term.ui)
            .or_else(|| self.by_name.get(&term.name.trim().to_lowercase()))
            .map(String::as_str)
    }

    pub fn contains(&self, term: &MeshTerm) -> bool {
        self.lookup(term).is_some()
    }
}

/// One phrase found in a text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseMatch<'a> {
    /// The phrase as it appears in the table
    pub phrase: String,
    /// The label the phrase maps to
    pub label: &'a str,
}

/// Case-insensitive whole-word matcher over a fixed phrase list.
///
/// Longer phrases win over their prefixes ("guinea pig" over "pig"), and
/// runs of whitespace in the text match a single space in a phrase.
#[derive(Debug, Clone)]
pub struct PhraseMatcher {
    regex: Option<Regex>,
    labels: HashMap<String, String>,
}

impl PhraseMatcher {
    /// Build from `(phrase, label)` pairs
    pub fn new<P, L>(entries: impl IntoIterator<Item = (P, L)>) -> Result<Self, regex::Error>
    where
        P: AsRef<str>,
        L: Into<String>,
    {
        let mut labels = HashMap::new();
        for (phrase, label) in entries {
            let key = collapse(phrase.as_ref());
            if !key.is_empty() {
                labels.insert(key, label.into());
            }
        }

        let mut phrases: Vec<&String> = labels.keys().collect();
        phrases.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let regex = if phrases.is_empty() {
            None
        } else {
            let alternatives: Vec<String> = phrases.iter().map(|p| phrase_pattern(p)).collect();
            Some(Regex::new(&format!("(?i)(?:{})", alternatives.join("|")))?)
        };

        Ok(Self { regex, labels })
    }

    /// Build a matcher whose labels are the phrases themselves
    pub fn from_phrases<'a>(phrases: impl IntoIterator<Item = &'a str>) -> Result<Self, regex::Error> {
        Self::new(phrases.into_iter().map(|p| (p, p)))
    }

    /// All matches in order of appearance, one per distinct phrase
    pub fn find_all(&self, text: &str) -> Vec<PhraseMatch<'_>> {
        let Some(regex) = &self.regex else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for m in regex.find_iter(text) {
            let key = collapse(m.as_str());
            if let Some(label) = self.labels.get(&key) {
                if seen.insert(key.clone()) {
                    found.push(PhraseMatch {
                        phrase: key,
                        label: label.as_str(),
                    });
                }
            }
        }
        found
    }

    /// Distinct labels matched in `text`, in order of first appearance
    pub fn labels_in(&self, text: &str) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        for m in self.find_all(text) {
            if !labels.contains(&m.label) {
                labels.push(m.label);
            }
        }
        labels
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|r| r.is_match(text))
    }
}

/// Lowercase and collapse whitespace
fn collapse(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Regex for one phrase: words escaped and joined by `\s+`, with word
/// boundaries only where the phrase starts or ends with a word character
fn phrase_pattern(phrase: &str) -> String {
    let body = phrase
        .split(' ')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    let starts_word = phrase.chars().next().is_some_and(|c| c.is_alphanumeric());
    let ends_word = phrase.chars().last().is_some_and(|c| c.is_alphanumeric());

    format!(
        "{}{}{}",
        if starts_word { r"\b" } else { "" },
        body,
        if ends_word { r"\b" } else { "" }
    )
}

/// All lookup tables used by the Q1 and Q2/Q3/Q5 classifiers
#[derive(Debug, Clone)]
pub struct ClassifierTables {
    /// Provider work type (lowercase) to category
    pub work_types: HashMap<String, WorkCategory>,
    /// Title patterns marking a review regardless of work type
    pub review_title: Regex,
    /// PubMed publication types (lowercase) that rule out original research
    pub review_publication_types: HashSet<String>,
    pub review_phrases: PhraseMatcher,
    pub method_phrases: PhraseMatcher,

    pub animal_mesh: MeshTable,
    /// Species headings mapped to canonical species
    pub species_mesh: MeshTable,
    pub in_vivo_mesh: MeshTable,
    pub in_vitro_mesh: MeshTable,

    pub animal_phrases: PhraseMatcher,
    /// Common names mapped to canonical species
    pub species_phrases: PhraseMatcher,
    pub in_vivo_phrases: PhraseMatcher,
    pub in_vitro_phrases: PhraseMatcher,
}

impl ClassifierTables {
    /// The built-in tables
    pub fn standard() -> Self {
        Self::try_standard().expect("built-in classifier tables are valid")
    }

    fn try_standard() -> Result<Self, regex::Error> {
        let mut work_types = HashMap::new();
        for (types, category) in [
            (RESEARCH_TYPES, WorkCategory::Research),
            (REVIEW_TYPES, WorkCategory::Review),
            (NON_RESEARCH_TYPES, WorkCategory::NonResearch),
        ] {
            for t in types {
                work_types.insert(t.to_string(), category);
            }
        }

        Ok(Self {
            work_types,
            review_title: Regex::new(&format!("(?i){}", REVIEW_TITLE_PATTERNS.join("|")))?,
            review_publication_types: REVIEW_PUBLICATION_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            review_phrases: PhraseMatcher::from_phrases(REVIEW_PHRASES.iter().copied())?,
            method_phrases: PhraseMatcher::from_phrases(METHOD_PHRASES.iter().copied())?,
            animal_mesh: MeshTable::from_headings(
                ANIMAL_MESH
                    .iter()
                    .copied()
                    .chain(SPECIES_MESH.iter().map(|(ui, name, _)| (*ui, *name))),
            ),
            species_mesh: MeshTable::new(SPECIES_MESH.iter().copied()),
            in_vivo_mesh: MeshTable::from_headings(IN_VIVO_MESH.iter().copied()),
            in_vitro_mesh: MeshTable::from_headings(IN_VITRO_MESH.iter().copied()),
            animal_phrases: PhraseMatcher::from_phrases(ANIMAL_PHRASES.iter().copied())?,
            species_phrases: PhraseMatcher::new(SPECIES_PHRASES.iter().copied())?,
            in_vivo_phrases: PhraseMatcher::from_phrases(IN_VIVO_PHRASES.iter().copied())?,
            in_vitro_phrases: PhraseMatcher::from_phrases(IN_VITRO_PHRASES.iter().copied())?,
        })
    }

    /// Category of a provider work type, if it is in the type table
    pub fn work_category(&self, work_type: &str) -> Option<WorkCategory> {
        self.work_types.get(&work_type.trim().to_lowercase()).copied()
    }
}

impl Default for ClassifierTables {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_tables_build() {
        let tables = ClassifierTables::standard();
        assert_eq!(tables.work_category("Journal-Article"), Some(WorkCategory::Research));
        assert_eq!(tables.work_category("review"), Some(WorkCategory::Review));
        assert_eq!(tables.work_category("letter"), Some(WorkCategory::NonResearch));
        assert_eq!(tables.work_category("dataset"), None);
    }

    #[test]
    fn test_longest_phrase_wins() {
        let tables = ClassifierTables::standard();
        let found = tables.species_phrases.find_all("Guinea pigs and a pig were used");

        let phrases: Vec<_> = found.iter().map(|m| m.phrase.as_str()).collect();
        assert_eq!(phrases, vec!["guinea pigs", "pig"]);
        assert_eq!(found[0].label, "Cavia porcellus");
    }

    #[test]
    fn test_phrases_need_word_boundaries() {
        let matcher = PhraseMatcher::from_phrases(["rat"]).unwrap();
        assert!(matcher.is_match("the Rat was"));
        assert!(!matcher.is_match("the ratio was"));
        assert!(!matcher.is_match("a pirate"));
    }

    #[test]
    fn test_whitespace_and_punctuation_phrases() {
        let matcher = PhraseMatcher::from_phrases([": a review", "in vitro"]).unwrap();
        let found = matcher.find_all("Liver fibrosis:  a review of in\nvitro models");

        let phrases: Vec<_> = found.iter().map(|m| m.phrase.as_str()).collect();
        assert_eq!(phrases, vec![": a review", "in vitro"]);
    }

    #[test]
    fn test_labels_are_deduplicated() {
        let tables = ClassifierTables::standard();
        let labels = tables.species_phrases.labels_in("A mouse model; mice were fed");
        assert_eq!(labels, vec!["Mus musculus"]);
    }

    #[test]
    fn test_empty_matcher() {
        let matcher = PhraseMatcher::from_phrases(std::iter::empty()).unwrap();
        assert!(!matcher.is_match("anything"));
        assert!(matcher.find_all("anything").is_empty());
    }

    #[test]
    fn test_mesh_lookup_by_ui_or_name() {
        let tables = ClassifierTables::standard();

        assert_eq!(
            tables.species_mesh.lookup(&MeshTerm::new("D051381", "Rats")),
            Some("Rattus norvegicus")
        );
        assert_eq!(
            tables.species_mesh.lookup(&MeshTerm::new("", "mice")),
            Some("Mus musculus")
        );
        assert!(tables.animal_mesh.contains(&MeshTerm::new("D051379", "Mice")));
        assert!(!tables.animal_mesh.contains(&MeshTerm::new("D006801", "Humans")));
        assert!(tables.in_vitro_mesh.contains(&MeshTerm::new("", "Cells, Cultured")));
    }

    #[test]
    fn test_review_title_patterns() {
        let tables = ClassifierTables::standard();
        assert!(tables.review_title.is_match("Gut microbiota and obesity: a review"));
        assert!(tables.review_title.is_match("A Meta-Analysis of statin trials"));
        assert!(!tables.review_title.is_match("Peer reviewed outcomes in mice"));
    }
}
