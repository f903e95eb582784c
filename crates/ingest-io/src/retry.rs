//! Retry/backoff policy for dispatcher requests (`spec.md` §4.6/§4.8:
//! retry with exponential backoff, classified by status code; `spec.md`
//! §4.3 concrete scenario #6 "retry classification").

use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoffBuilder;

/// `429` and `5xx` are transient — worth a retry. Everything else
/// (`4xx` other than `429`) is the caller's fault and retrying it would
/// just waste a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Retryable,
    Permanent,
}

pub fn classify_status(status: u16) -> Classification {
    match status {
        429 => Classification::Retryable,
        500..=599 => Classification::Retryable,
        _ => Classification::Permanent,
    }
}

/// A transport-level failure (connection reset, timeout) is always
/// retryable — there was no response to classify.
pub fn classify_transport_error() -> Classification {
    Classification::Retryable
}

/// Build a fresh exponential backoff for one batch's retry sequence. We
/// bound retries by count in the dispatcher rather than by elapsed time,
/// so `max_elapsed_time` is left unbounded here.
pub fn new_backoff() -> backoff::ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(500))
        .with_max_interval(Duration::from_secs(30))
        .with_multiplier(2.0)
        .with_max_elapsed_time(None)
        .build()
}
