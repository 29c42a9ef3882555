//! Core data models: identifiers, source metadata, classification results
//! and per-paper records.

mod classification;
mod identifier;
mod metadata;
mod record;

pub use classification::{Answer, ClassificationResult, Confidence, Question, StudySetting};
pub use identifier::{normalize, InvalidIdentifier, PaperIdentifier};
pub use metadata::{
    FailureKind, FetchFailure, MeshQualifier, MeshTerm, SourceKind, SourceMetadata,
};
pub use record::{PaperRecord, PaperStatus};
