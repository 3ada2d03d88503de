//! # navloader Loader Crate
//!
//! Loads one fund and its NAV history into a [`database::FundStore`].
//!
//! A run is a sequential phase (fetch, normalize, insert the fund) followed by
//! a bounded fan-out of batch transactions and a join. A failed batch is
//! recorded and reported; it never stops its siblings.

pub mod admin;
pub mod error;
pub mod executor;
pub mod normalizer;
pub mod outcome;
pub mod parent;
pub mod partition;
pub mod pipeline;

pub use admin::{export_document, export_json, reset, to_document};
pub use error::{BatchError, LoadError};
pub use executor::BatchExecutor;
pub use normalizer::{Normalized, Normalizer};
pub use outcome::{BatchOutcome, BatchSummary, CommittedBatch, FailedBatch, OutcomeCollector};
pub use parent::insert_parent;
pub use partition::{partition, partition_ranges, Batch, BatchRange};
pub use pipeline::{LoadPipeline, LoadReport, LoadTimings};
