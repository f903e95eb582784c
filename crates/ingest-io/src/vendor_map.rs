//! Applies the configured vendor adapter to decoded records before they
//! reach the transform chain — `spec.md` §2 data flow: `C1 → C2 → (C7 if
//! vendor set) → C3`, and §4.4's "adapters run before C3".
//!
//! Resolved once per source, at construction, so an unsupported vendor
//! (`june`) fails the run immediately rather than partway through a file.

use ingest_core::{JobState, Record};
use ingest_vendors::VendorAdapter;
use serde_json::Value;

pub fn resolve(state: &JobState) -> ingest_core::Result<Option<Box<dyn VendorAdapter>>> {
    match state.config.vendor {
        Some(vendor) => ingest_vendors::for_vendor(vendor).map(Some),
        None => Ok(None),
    }
}

/// Maps each record through `adapter`. A record the adapter can't find an
/// identity or event name in is dropped and counted as unparsable, the
/// same bucket a decoder-level parse failure lands in (`spec.md` §4.4:
/// "Returns ... an empty value to skip"). A no-op when no vendor is
/// configured.
pub fn apply(state: &JobState, adapter: Option<&dyn VendorAdapter>, records: Vec<Record>) -> Vec<Record> {
    let Some(adapter) = adapter else {
        return records;
    };
    let mut mapped = Vec::with_capacity(records.len());
    for record in records {
        match adapter.map_event(&Value::Object(record)) {
            Some(record) => mapped.push(record),
            None => {
                // Never reaches the transform chain, so `processed` has to be
                // bumped here too — `chain.rs` only bumps it for records it
                // actually sees (spec.md §8's processed-equals-sum invariant).
                state.counters.incr_processed(1);
                state.counters.incr_unparsable(1);
            }
        }
    }
    mapped
}
