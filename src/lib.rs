//! # biomed-screen
//!
//! Batch screening of biomedical papers by DOI. Each paper is looked up in
//! OpenAlex, Crossref and PubMed, then classified on four questions: is it
//! original research (Q1), were animals used (Q2), in vivo or in vitro (Q3),
//! and which species (Q5).
//!
//! ## Architecture
//!
//! - [`models`]: Identifiers, source metadata, classification results and records
//! - [`sources`]: Metadata adapters behind the [`sources::MetadataSource`] trait
//! - [`classify`]: Rule-based classifiers driven by [`classify::ClassifierTables`]
//! - [`pipeline`]: Bounded-concurrency batch driver and result aggregation
//! - [`input`] / [`output`]: Identifier lists in, CSV/JSON reports out
//! - [`utils`]: Rate-limited, retrying HTTP client
//! - [`config`]: Configuration management
//! - [`ui`]: Terminal rendering for the CLI

pub mod classify;
pub mod config;
pub mod input;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use classify::Classifier;
pub use models::{PaperIdentifier, PaperRecord};
pub use pipeline::Pipeline;
pub use sources::{MetadataSource, SourceSet};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
