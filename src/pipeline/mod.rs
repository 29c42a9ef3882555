//! The screening pipeline.
//!
//! Each input identifier is an independent unit of work: normalize, fetch
//! every source, classify, aggregate. Units run with bounded concurrency and
//! all outbound HTTP funnels through the shared client. Results come back
//! sorted by input position.

mod aggregate;
mod runner;

pub use aggregate::{aggregate, skipped_invalid};
pub use runner::Pipeline;
