//! The `VendorAdapter` trait and the factory that resolves
//! `ingest_core::spec::Vendor` to a concrete adapter (`spec.md` §4.4).

use ingest_core::spec::Vendor;
use ingest_core::{IngestError, Record, Result};
use serde_json::Value;

use crate::{amplitude, ga4, heap, mparticle, posthog};

/// Maps one vendor's native event JSON into this engine's canonical event
/// shape: `{"event": ..., "properties": {"distinct_id": ..., "time": ...,
/// ...}}`. Returns `None` when the raw record carries no usable identity
/// or event name — callers count that as unparsable, the same as a
/// decoder-level parse failure.
pub trait VendorAdapter: Send + Sync {
    fn name(&self) -> &'static str;
    fn map_event(&self, raw: &Value) -> Option<Record>;
}

/// Resolve the configured vendor to its adapter. `Vendor::Mixpanel` (the
/// no-op case: already-native records) and `Vendor::June` (explicitly
/// unsupported — see `DESIGN.md` Open Question) are handled here rather
/// than by a sixth/seventh adapter module.
pub fn for_vendor(vendor: Vendor) -> Result<Box<dyn VendorAdapter>> {
    match vendor {
        Vendor::Amplitude => Ok(Box::new(amplitude::AmplitudeAdapter)),
        Vendor::Heap => Ok(Box::new(heap::HeapAdapter)),
        Vendor::Ga4 => Ok(Box::new(ga4::Ga4Adapter)),
        Vendor::Mparticle => Ok(Box::new(mparticle::MparticleAdapter)),
        Vendor::Posthog => Ok(Box::new(posthog::PosthogAdapter)),
        Vendor::Mixpanel => Ok(Box::new(PassthroughAdapter)),
        Vendor::June => {
            tracing::warn!("vendor \"june\" is not supported, refusing to build an adapter");
            Err(IngestError::UnsupportedVendor("june".to_string()))
        }
    }
}

/// Records already in the native shape pass straight through unmapped.
struct PassthroughAdapter;

impl VendorAdapter for PassthroughAdapter {
    fn name(&self) -> &'static str {
        "mixpanel"
    }

    fn map_event(&self, raw: &Value) -> Option<Record> {
        raw.as_object().cloned()
    }
}
