//! Shared vendor-mapping helpers: identity resolution order and the
//! sentinel "no real identity" values every vendor export seems to emit at
//! least one of (`spec.md` §4.4 glossary "vendor mapping").

/// Values that look like an identity field but mean "none" in practice.
/// Collected from the shapes of the five supported vendor exports, not any
/// one of them in particular.
pub const BAD_IDS: &[&str] = &[
    "",
    "null",
    "nil",
    "none",
    "undefined",
    "unknown",
    "(null)",
    "00000000-0000-0000-0000-000000000000",
];

pub fn is_bad_id(candidate: &str) -> bool {
    BAD_IDS.iter().any(|bad| bad.eq_ignore_ascii_case(candidate))
}

/// Return the first candidate identity that isn't a sentinel "no identity"
/// value, preserving caller-specified priority order (e.g. user id before
/// device id before anonymous id).
pub fn resolve_identity<'a>(candidates: &[Option<&'a str>]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|c| *c)
        .find(|c| !is_bad_id(c))
}

/// Convert a millisecond epoch timestamp to whole seconds, the unit every
/// adapter in this crate converges on before handing records to the
/// transform chain (whose own `time_fix` stage also defends against
/// sub-second units, but vendor timestamps are known-millisecond here).
pub fn millis_to_seconds(millis: i64) -> i64 {
    millis / 1000
}

/// Convert a microsecond epoch timestamp (GA4's `event_timestamp`) to
/// whole seconds.
pub fn micros_to_seconds(micros: i64) -> i64 {
    micros / 1_000_000
}
