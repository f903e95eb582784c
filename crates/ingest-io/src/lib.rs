//! # ingest-io
//!
//! The I/O edges of the pipeline: source resolution and format decoding,
//! the memory throttle, the batcher, and the HTTP dispatcher with its
//! retry policy. Built on the record and job-state vocabulary from
//! `ingest-core`, the transform chain from `ingest-tx`, and the vendor
//! adapters from `ingest-vendors`.

pub mod batcher;
pub mod dispatch;
pub mod encode;
pub mod format;
pub mod retry;
pub mod source;
pub mod throttle;
pub mod vendor_map;

pub use batcher::SizeCountBatcher;
pub use dispatch::Dispatcher;
pub use throttle::ThrottleGate;
