//! `JobState` — the single run-scoped aggregate (`spec.md` §3/§4.8). Owned
//! by the run driver, mutated by every pipeline stage via atomic counters
//! and short-critical-section-guarded buffers, frozen at summary time.
//!
//! Mirrors the teacher's own insistence on a freshly constructed, non-global
//! aggregate per run (the teacher builds one `PipelineSpec`/channel set per
//! CLI invocation; we do the same for `JobState`).

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

use crate::error::{IngestError, Result};
use crate::record::RecordKind;
use crate::spec::{Credentials, JobConfig, Region};

/// Monotonically non-decreasing run counters (`spec.md` §8).
#[derive(Default)]
pub struct Counters {
    pub processed: AtomicU64,
    pub success: AtomicU64,
    pub failed: AtomicU64,
    pub retries: AtomicU64,
    pub batches: AtomicU64,
    pub requests: AtomicU64,
    pub rate_limited: AtomicU64,
    pub server_errors: AtomicU64,
    pub client_errors: AtomicU64,
    pub empty: AtomicU64,
    pub duplicates: AtomicU64,
    pub out_of_bounds: AtomicU64,
    pub whitelist_skipped: AtomicU64,
    pub blacklist_skipped: AtomicU64,
    pub unparsable: AtomicU64,
    pub bytes: AtomicU64,
    pub oversize_dropped: AtomicU64,
}

macro_rules! counter_accessors {
    ($($field:ident => $incr:ident, $get:ident;)*) => {
        impl Counters {
            $(
                pub fn $incr(&self, n: u64) {
                    self.$field.fetch_add(n, Ordering::Relaxed);
                }
                pub fn $get(&self) -> u64 {
                    self.$field.load(Ordering::Relaxed)
                }
            )*
        }
    };
}

counter_accessors! {
    processed => incr_processed, processed;
    success => incr_success, success;
    failed => incr_failed, failed;
    retries => incr_retries, retries;
    batches => incr_batches, batches;
    requests => incr_requests, requests;
    rate_limited => incr_rate_limited, rate_limited;
    server_errors => incr_server_errors, server_errors;
    client_errors => incr_client_errors, client_errors;
    empty => incr_empty, empty;
    duplicates => incr_duplicates, duplicates;
    out_of_bounds => incr_out_of_bounds, out_of_bounds;
    whitelist_skipped => incr_whitelist_skipped, whitelist_skipped;
    blacklist_skipped => incr_blacklist_skipped, blacklist_skipped;
    unparsable => incr_unparsable, unparsable;
    bytes => incr_bytes, bytes;
    oversize_dropped => incr_oversize_dropped, oversize_dropped;
}

impl Counters {
    /// `spec.md` §8: processed = success + failed + empty + duplicates +
    /// outOfBounds + whiteListSkipped + blackListSkipped + unparsable.
    pub fn accounted_for(&self) -> u64 {
        self.success()
            + self.failed()
            + self.empty()
            + self.duplicates()
            + self.out_of_bounds()
            + self.whitelist_skipped()
            + self.blacklist_skipped()
            + self.unparsable()
    }
}

/// One HTTP response outcome, recorded verbatim in verbose mode.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseRecord {
    pub status: u16,
    pub message: String,
    pub batch_len: usize,
}

/// Bounded collection of per-request outcomes (`spec.md` §3). In verbose
/// mode it is a capped FIFO list of full responses; in abridged mode,
/// outcomes are aggregated by message string with a small record-sample tail
/// per message, each independently capped.
pub enum ResponsesBuffer {
    Verbose {
        cap: usize,
        entries: VecDeque<ResponseRecord>,
    },
    Abridged {
        max_messages: usize,
        max_samples_per_message: usize,
        order: VecDeque<String>,
        by_message: HashMap<String, AbridgedEntry>,
    },
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct AbridgedEntry {
    pub count: u64,
    pub samples: Vec<String>,
}

impl ResponsesBuffer {
    pub fn new(abridged: bool, max_messages: usize, max_samples_per_message: usize) -> Self {
        if abridged {
            ResponsesBuffer::Abridged {
                max_messages,
                max_samples_per_message,
                order: VecDeque::new(),
                by_message: HashMap::new(),
            }
        } else {
            ResponsesBuffer::Verbose {
                cap: max_messages.max(1) * max_samples_per_message.max(1),
                entries: VecDeque::new(),
            }
        }
    }

    pub fn record(&mut self, status: u16, message: &str, batch_len: usize, sample_id: &str) {
        match self {
            ResponsesBuffer::Verbose { cap, entries } => {
                if entries.len() >= *cap {
                    entries.pop_front();
                }
                entries.push_back(ResponseRecord {
                    status,
                    message: message.to_string(),
                    batch_len,
                });
            }
            ResponsesBuffer::Abridged {
                max_messages,
                max_samples_per_message,
                order,
                by_message,
            } => {
                if !by_message.contains_key(message) {
                    if order.len() >= *max_messages {
                        if let Some(evicted) = order.pop_front() {
                            by_message.remove(&evicted);
                        }
                    }
                    order.push_back(message.to_string());
                }
                let entry = by_message.entry(message.to_string()).or_default();
                entry.count += 1;
                if entry.samples.len() < *max_samples_per_message {
                    entry.samples.push(sample_id.to_string());
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ResponsesBuffer::Verbose { entries, .. } => entries.len(),
            ResponsesBuffer::Abridged { by_message, .. } => by_message.len(),
        }
    }
}

/// Snapshot delivered to the caller's progress callback, at most once per
/// batch (`spec.md` §6).
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
    pub kind: RecordKind,
    pub processed: u64,
    pub requests: u64,
    pub events_per_second: f64,
    pub memory_bytes: u64,
    pub bytes_processed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub processed: u64,
    pub success: u64,
    pub failed: u64,
    pub duplicates: u64,
    pub unparsable: u64,
    pub retries: u64,
    pub batches: u64,
    pub requests: u64,
    pub bytes: u64,
    pub duration_ms: u64,
    pub events_per_second: f64,
    pub requests_per_second: f64,
    pub mib_per_second: f64,
    pub average_batch_len: f64,
    pub partial: bool,
    pub finished_at: chrono::DateTime<chrono::Utc>,
    pub config_snapshot: ConfigSnapshot,
}

/// A small audit-oriented subset of the run's configuration, carried on the
/// summary (supplemented ambient behavior — see `SPEC_FULL.md` §3).
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSnapshot {
    pub region: Region,
    pub record_kind: RecordKind,
    pub workers: usize,
    pub compress: bool,
}

/// Precomputed `Authorization` header value, resolved once at job
/// construction (`spec.md` §4.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthHeader {
    Basic(String),
    Bearer(String),
    None,
}

fn basic_header(user: &str, pass: &str) -> String {
    use std::io::Write;
    let mut buf = Vec::new();
    write!(buf, "{user}:{pass}").unwrap();
    format!("Basic {}", base64_encode(&buf))
}

/// Minimal, dependency-free base64 (standard alphabet, padded) for the
/// auth header — every corpus repo that needs this either already pulls in
/// a base64 crate for unrelated reasons or hand-rolls this exact helper; we
/// avoid adding a new dependency for four lines of encoding.
fn base64_encode(input: &[u8]) -> String {
    const ALPHABET: &[u8; 64] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut out = String::with_capacity((input.len() + 2) / 3 * 4);
    for chunk in input.chunks(3) {
        let b0 = chunk[0];
        let b1 = *chunk.get(1).unwrap_or(&0);
        let b2 = *chunk.get(2).unwrap_or(&0);
        let n = ((b0 as u32) << 16) | ((b1 as u32) << 8) | (b2 as u32);
        out.push(ALPHABET[((n >> 18) & 0x3f) as usize] as char);
        out.push(ALPHABET[((n >> 12) & 0x3f) as usize] as char);
        out.push(if chunk.len() > 1 {
            ALPHABET[((n >> 6) & 0x3f) as usize] as char
        } else {
            '='
        });
        out.push(if chunk.len() > 2 {
            ALPHABET[(n & 0x3f) as usize] as char
        } else {
            '='
        });
    }
    out
}

/// Resolve the strict authentication precedence from `spec.md` §4.8:
/// the first of {basic(acct:pass), basic(secret:""), basic(token:""),
/// bearer(token)} whose inputs are all non-empty wins; otherwise empty auth
/// is allowed only for profile-only runs, else the run fails at init.
pub fn resolve_auth(creds: &Credentials, kind: RecordKind) -> Result<AuthHeader> {
    let non_empty = |s: &Option<String>| s.as_deref().map(|v| !v.is_empty()).unwrap_or(false);

    if non_empty(&creds.service_account) && non_empty(&creds.service_account_password) {
        return Ok(AuthHeader::Basic(basic_header(
            creds.service_account.as_deref().unwrap(),
            creds.service_account_password.as_deref().unwrap(),
        )));
    }
    if non_empty(&creds.secret) {
        return Ok(AuthHeader::Basic(basic_header(
            creds.secret.as_deref().unwrap(),
            "",
        )));
    }
    if non_empty(&creds.token) {
        return Ok(AuthHeader::Basic(basic_header(
            creds.token.as_deref().unwrap(),
            "",
        )));
    }
    if non_empty(&creds.bearer) {
        return Ok(AuthHeader::Bearer(creds.bearer.clone().unwrap()));
    }

    let profile_only = matches!(
        kind,
        RecordKind::User | RecordKind::Group | RecordKind::ProfileExport
    );
    if profile_only {
        return Ok(AuthHeader::None);
    }
    Err(IngestError::MissingCredentials {
        region: "n/a".to_string(),
        kind: format!("{kind:?}"),
    })
}

/// The run-scoped aggregate. Construct exactly one per run.
pub struct JobState {
    pub config: JobConfig,
    pub auth: AuthHeader,
    pub counters: Counters,
    pub responses: Mutex<ResponsesBuffer>,
    pub bad_records: Mutex<BadRecordMap>,
    pub batch_len_samples: Mutex<VecDeque<usize>>,
    pub memory_samples: Mutex<VecDeque<u64>>,
    pub dedupe_set: Mutex<std::collections::HashSet<String>>,
    started_at: Instant,
    ended_at: Mutex<Option<Instant>>,
    cancelled: std::sync::atomic::AtomicBool,
    progress_cb: Mutex<Option<Arc<dyn Fn(ProgressSnapshot) + Send + Sync>>>,
    last_progress_at: Mutex<Option<Instant>>,
}

/// Capped bad-record map: at most `max_messages` distinct messages, at most
/// `max_records_per_message` samples each, FIFO eviction (`spec.md` §3).
pub struct BadRecordMap {
    max_messages: usize,
    max_records_per_message: usize,
    order: VecDeque<String>,
    entries: HashMap<String, Vec<String>>,
}

impl BadRecordMap {
    pub fn new(max_messages: usize, max_records_per_message: usize) -> Self {
        Self {
            max_messages,
            max_records_per_message,
            order: VecDeque::new(),
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, message: &str, record_sample: String) {
        if !self.entries.contains_key(message) {
            if self.order.len() >= self.max_messages {
                if let Some(evicted) = self.order.pop_front() {
                    self.entries.remove(&evicted);
                }
            }
            self.order.push_back(message.to_string());
        }
        let samples = self.entries.entry(message.to_string()).or_default();
        if samples.len() < self.max_records_per_message {
            samples.push(record_sample);
        }
    }

    pub fn messages(&self) -> usize {
        self.entries.len()
    }
}

const RING_CAP: usize = 200;

impl JobState {
    pub fn new(config: JobConfig) -> Result<Arc<JobState>> {
        let auth = resolve_auth(&config.credentials, config.record_type)?;
        if config.workers > 30 {
            tracing::warn!(
                workers = config.workers,
                "worker count exceeds 30 under the default HTTP transport; \
                 the shared connection pool may become a bottleneck"
            );
        }
        let abridged = config.abridged;
        let max_messages = config.max_bad_record_messages.unwrap_or(50);
        let max_samples = config.max_bad_records_per_message.unwrap_or(5);
        Ok(Arc::new(JobState {
            responses: Mutex::new(ResponsesBuffer::new(abridged, max_messages, max_samples)),
            bad_records: Mutex::new(BadRecordMap::new(max_messages, max_samples)),
            batch_len_samples: Mutex::new(VecDeque::with_capacity(RING_CAP)),
            memory_samples: Mutex::new(VecDeque::with_capacity(RING_CAP)),
            dedupe_set: Mutex::new(std::collections::HashSet::new()),
            started_at: Instant::now(),
            ended_at: Mutex::new(None),
            cancelled: std::sync::atomic::AtomicBool::new(false),
            progress_cb: Mutex::new(None),
            last_progress_at: Mutex::new(None),
            config,
            auth,
        }))
    }

    pub fn set_progress_callback(&self, cb: Arc<dyn Fn(ProgressSnapshot) + Send + Sync>) {
        *self.progress_cb.lock() = Some(cb);
    }

    pub fn mark_cancelled(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn record_batch_len(&self, len: usize) {
        let mut ring = self.batch_len_samples.lock();
        if ring.len() >= RING_CAP {
            ring.pop_front();
        }
        ring.push_back(len);
    }

    pub fn record_memory_sample(&self, bytes: u64) {
        let mut ring = self.memory_samples.lock();
        if ring.len() >= RING_CAP {
            ring.pop_front();
        }
        ring.push_back(bytes);
    }

    /// Accept a dispatcher outcome (`spec.md` §4.8 `store(response, success)`).
    pub fn store_response(&self, status: u16, message: &str, batch_len: usize, sample_id: &str) {
        self.responses
            .lock()
            .record(status, message, batch_len, sample_id);
    }

    /// Fan out progress to the caller, never more than once per batch, and
    /// never awaited by the engine (`spec.md` §6).
    pub fn maybe_emit_progress(&self, min_interval: Duration) {
        let cb = { self.progress_cb.lock().clone() };
        let Some(cb) = cb else { return };
        let mut last = self.last_progress_at.lock();
        let now = Instant::now();
        if let Some(prev) = *last {
            if now.duration_since(prev) < min_interval {
                return;
            }
        }
        *last = Some(now);
        drop(last);

        let elapsed = now.duration_since(self.started_at).as_secs_f64().max(1e-6);
        let processed = self.counters.processed();
        let mem = self.memory_samples.lock().back().copied().unwrap_or(0);
        cb(ProgressSnapshot {
            kind: self.config.record_type,
            processed,
            requests: self.counters.requests(),
            events_per_second: processed as f64 / elapsed,
            memory_bytes: mem,
            bytes_processed: self.counters.bytes(),
        });
    }

    pub fn finish(&self) -> Summary {
        let end = Instant::now();
        *self.ended_at.lock() = Some(end);
        let duration = end.duration_since(self.started_at);
        self.summary(duration, self.is_cancelled())
    }

    fn summary(&self, duration: Duration, partial: bool) -> Summary {
        let secs = duration.as_secs_f64().max(1e-6);
        let processed = self.counters.processed();
        let requests = self.counters.requests();
        let bytes = self.counters.bytes();
        let batches = self.counters.batches();
        let avg_batch_len = {
            let ring = self.batch_len_samples.lock();
            if ring.is_empty() {
                0.0
            } else {
                ring.iter().sum::<usize>() as f64 / ring.len() as f64
            }
        };
        Summary {
            processed,
            success: self.counters.success(),
            failed: self.counters.failed(),
            duplicates: self.counters.duplicates(),
            unparsable: self.counters.unparsable(),
            retries: self.counters.retries(),
            batches,
            requests,
            bytes,
            duration_ms: duration.as_millis() as u64,
            events_per_second: processed as f64 / secs,
            requests_per_second: requests as f64 / secs,
            mib_per_second: (bytes as f64 / (1024.0 * 1024.0)) / secs,
            average_batch_len: avg_batch_len,
            partial,
            finished_at: chrono::Utc::now(),
            config_snapshot: ConfigSnapshot {
                region: self.config.region,
                record_kind: self.config.record_type,
                workers: self.config.workers,
                compress: self.config.compress,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_precedence_basic_over_bearer() {
        let creds = Credentials {
            service_account: Some("acct".into()),
            service_account_password: Some("pw".into()),
            bearer: Some("tok".into()),
            ..Default::default()
        };
        let auth = resolve_auth(&creds, RecordKind::Event).unwrap();
        assert!(matches!(auth, AuthHeader::Basic(_)));
    }

    #[test]
    fn auth_bearer_when_only_bearer_present() {
        let creds = Credentials {
            bearer: Some("tok".into()),
            ..Default::default()
        };
        let auth = resolve_auth(&creds, RecordKind::Event).unwrap();
        assert_eq!(auth, AuthHeader::Bearer("tok".into()));
    }

    #[test]
    fn empty_auth_allowed_for_profile_runs() {
        let creds = Credentials::default();
        let auth = resolve_auth(&creds, RecordKind::User).unwrap();
        assert_eq!(auth, AuthHeader::None);
    }

    #[test]
    fn missing_auth_fails_for_event_runs() {
        let creds = Credentials::default();
        assert!(resolve_auth(&creds, RecordKind::Event).is_err());
    }

    #[test]
    fn abridged_responses_aggregate_by_message() {
        let mut buf = ResponsesBuffer::new(true, 2, 3);
        buf.record(500, "boom", 10, "r1");
        buf.record(500, "boom", 10, "r2");
        buf.record(400, "bad request", 1, "r3");
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn bad_record_map_evicts_fifo_past_cap() {
        let mut map = BadRecordMap::new(2, 2);
        map.insert("a", "r1".into());
        map.insert("b", "r2".into());
        map.insert("c", "r3".into());
        assert_eq!(map.messages(), 2);
    }
}
