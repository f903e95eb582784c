//! # ingest-core
//!
//! Foundational types for the analytics-ingest ETL engine: the dynamic
//! record model, the run-scoped `JobState` aggregate, the configuration
//! surface, the endpoint table, and the pipeline operator traits shared by
//! `ingest-tx`, `ingest-vendors`, and `ingest-io`.
//!
//! This crate owns no I/O — it is the vocabulary the other crates share.

pub mod endpoint;
pub mod error;
pub mod hash;
pub mod jobstate;
pub mod record;
pub mod spec;
pub mod traits;

pub use error::{IngestError, Result};
pub use jobstate::{AuthHeader, Counters, JobState, ProgressSnapshot, Summary};
pub use record::{Batch, Directive, Record, RecordKind, RecordShape};
pub use spec::JobConfig;
pub use traits::{
    BatchMessage, BatchRx, BatchTx, Batcher, Message, Operator, RecordRx, RecordTx, Sink, Source,
    Stage,
};
