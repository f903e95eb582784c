//! Source resolution (`spec.md` §4.1): turn a `source_uri` into the right
//! concrete `Source` implementation — local filesystem glob, or a remote
//! `gs://`/`s3://` object-store prefix — without the rest of the pipeline
//! caring which one it got.

pub mod local;
pub mod remote;

use std::sync::Arc;

use ingest_core::error::IngestError;
use ingest_core::{JobState, Source};

use crate::throttle::ThrottleGate;

/// Build the `Source` for `uri`. `gs://` and `s3://` prefixes resolve to
/// the object-store-backed source; everything else is treated as a local
/// glob pattern (a bare path is just a one-element glob).
pub fn resolve(
    state: Arc<JobState>,
    uri: &str,
    throttle: Arc<ThrottleGate>,
) -> ingest_core::Result<Box<dyn Source>> {
    if uri.starts_with("gs://") || uri.starts_with("s3://") {
        remote::RemoteSource::try_new(state, uri, throttle)
            .map(|s| Box::new(s) as Box<dyn Source>)
    } else if uri.is_empty() {
        Err(IngestError::Source("empty source uri".to_string()))
    } else {
        local::LocalSource::new(state, uri.to_string(), throttle)
            .map(|s| Box::new(s) as Box<dyn Source>)
    }
}
