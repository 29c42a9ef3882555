//! Classification answers with confidence and evidence.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// The screening questions answered for each paper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Question {
    /// Is the paper original research?
    Q1,
    /// Were animals used?
    Q2,
    /// In vivo, in vitro, or both?
    Q3,
    /// Which species were used?
    Q5,
}

impl Question {
    pub const ALL: [Question; 4] = [Question::Q1, Question::Q2, Question::Q3, Question::Q5];

    pub fn description(&self) -> &'static str {
        match self {
            Question::Q1 => "Original research",
            Question::Q2 => "Animals used",
            Question::Q3 => "In vivo / in vitro",
            Question::Q5 => "Species",
        }
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// How strongly the evidence supports an answer. Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub const ALL: [Confidence; 3] = [Confidence::High, Confidence::Medium, Confidence::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Confidence::Low),
            "medium" => Ok(Confidence::Medium),
            "high" => Ok(Confidence::High),
            other => Err(format!("unknown confidence level: {}", other)),
        }
    }
}

/// Where an experiment took place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StudySetting {
    InVivo,
    InVitro,
    Mixed,
}

impl StudySetting {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudySetting::InVivo => "in vivo",
            StudySetting::InVitro => "in vitro",
            StudySetting::Mixed => "mixed",
        }
    }
}

/// The answer to one question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum Answer {
    /// Yes/no questions (Q1, Q2)
    Boolean(bool),
    /// Q3
    Setting(StudySetting),
    /// Q5, canonical species labels
    Species(BTreeSet<String>),
    /// The evidence does not support any answer
    Unknown,
    /// The question does not apply to this paper
    NotApplicable,
}

impl Answer {
    /// The boolean value, if this is a yes/no answer
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Answer::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// The study setting, if this is a Q3 answer
    pub fn as_setting(&self) -> Option<StudySetting> {
        match self {
            Answer::Setting(s) => Some(*s),
            _ => None,
        }
    }

    /// The species set, if this is a Q5 answer
    pub fn species(&self) -> Option<&BTreeSet<String>> {
        match self {
            Answer::Species(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_applicable(&self) -> bool {
        !matches!(self, Answer::NotApplicable)
    }

    /// Short label used in reports and summary counts
    pub fn label(&self) -> String {
        match self {
            Answer::Boolean(true) => "yes".to_string(),
            Answer::Boolean(false) => "no".to_string(),
            Answer::Setting(s) => s.as_str().to_string(),
            Answer::Species(s) if s.is_empty() => "none".to_string(),
            Answer::Species(s) => s.iter().cloned().collect::<Vec<_>>().join("; "),
            Answer::Unknown => "unknown".to_string(),
            Answer::NotApplicable => "not applicable".to_string(),
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// One classifier's verdict on one question for one paper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub question: Question,
    pub answer: Answer,
    pub confidence: Confidence,
    /// Which rule fired and on what evidence
    pub evidence: String,
}

impl ClassificationResult {
    pub fn new(
        question: Question,
        answer: Answer,
        confidence: Confidence,
        evidence: impl Into<String>,
    ) -> Self {
        Self {
            question,
            answer,
            confidence,
            evidence: evidence.into(),
        }
    }

    /// A "does not apply" result
    pub fn not_applicable(question: Question, reason: impl Into<String>) -> Self {
        Self::new(question, Answer::NotApplicable, Confidence::Low, reason)
    }

    /// For Q1: whether the paper was confirmed as original research
    pub fn is_original_research(&self) -> bool {
        self.question == Question::Q1 && self.answer == Answer::Boolean(true)
    }
}
