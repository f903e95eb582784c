//! # ingest-vendors
//!
//! Schema adapters from five foreign analytics vendors' export formats
//! into this engine's canonical event shape (`spec.md` §4.4). Each
//! adapter is consulted once per record, upstream of the transform chain,
//! when `JobConfig::vendor` is set.

pub mod adapter;
pub mod amplitude;
pub mod common;
pub mod ga4;
pub mod heap;
pub mod mparticle;
pub mod posthog;

pub use adapter::{for_vendor, VendorAdapter};
