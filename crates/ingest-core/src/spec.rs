//! `JobConfig` — the run-scoped options surface (`spec.md` §6), generalized
//! from the teacher's YAML `PipelineSpec` (one pipeline of operators) to one
//! job's options (one source, one record kind, one destination).

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::record::{Record, RecordKind};

fn default_true() -> bool {
    true
}

fn default_records_per_batch() -> usize {
    2000
}

fn default_bytes_per_batch() -> usize {
    10 * 1024 * 1024
}

fn default_workers() -> usize {
    10
}

fn default_max_retries() -> u32 {
    10
}

fn default_compression_level() -> u32 {
    6
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Us,
    Eu,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamFormat {
    Jsonl,
    Json,
    Csv,
    Tsv,
    Parquet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Amplitude,
    Heap,
    Ga4,
    Mparticle,
    Posthog,
    June,
    Mixpanel,
}

/// Allow/deny list rules over event name, property key, property value, and
/// key+value composites (`spec.md` §4.3 stage 9, glossary).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterLists {
    #[serde(default)]
    pub event_whitelist: Vec<String>,
    #[serde(default)]
    pub event_blacklist: Vec<String>,
    #[serde(default)]
    pub prop_key_whitelist: Vec<String>,
    #[serde(default)]
    pub prop_key_blacklist: Vec<String>,
    #[serde(default)]
    pub prop_val_whitelist: Vec<String>,
    #[serde(default)]
    pub prop_val_blacklist: Vec<String>,
    /// Composite key+value rules: `(property key, allowed/denied value)`.
    #[serde(default)]
    pub combo_whitelist: Vec<(String, String)>,
    #[serde(default)]
    pub combo_blacklist: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThrottleConfig {
    pub throttle_pause_mb: Option<u64>,
    pub throttle_resume_mb: Option<u64>,
    pub throttle_max_buffer_mb: Option<u64>,
}

impl ThrottleConfig {
    pub fn enabled(&self) -> bool {
        self.throttle_pause_mb.is_some() && self.throttle_resume_mb.is_some()
    }
}

/// Authentication inputs; precedence resolved by `JobState::resolve_auth`
/// (`spec.md` §4.8).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub service_account: Option<String>,
    pub service_account_password: Option<String>,
    pub project_id: Option<String>,
    pub secret: Option<String>,
    pub token: Option<String>,
    pub bearer: Option<String>,
}

/// The full configuration surface for one ingest run (`spec.md` §6,
/// abbreviated list — every named option is present here).
#[derive(Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub record_type: RecordKind,
    pub region: Region,
    pub stream_format: Option<StreamFormat>,
    pub force_gzip: bool,

    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_records_per_batch")]
    pub records_per_batch: usize,
    #[serde(default = "default_bytes_per_batch")]
    pub bytes_per_batch: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
    #[serde(default)]
    pub high_water: Option<usize>,

    #[serde(default)]
    pub compress: bool,
    #[serde(default)]
    pub strict: bool,
    #[serde(default = "default_true")]
    pub fix_data: bool,
    #[serde(default = "default_true")]
    pub fix_time: bool,
    #[serde(default)]
    pub fix_json: bool,
    #[serde(default)]
    pub remove_nulls: bool,
    #[serde(default)]
    pub flatten_data: bool,
    #[serde(default)]
    pub dedupe: bool,
    #[serde(default)]
    pub add_token: bool,
    #[serde(default)]
    pub force_stream: bool,
    #[serde(default)]
    pub abridged: bool,
    #[serde(default)]
    pub v2_compat: bool,
    #[serde(default)]
    pub keep_bad_records: bool,

    pub epoch_start: Option<i64>,
    pub epoch_end: Option<i64>,
    #[serde(default)]
    pub time_offset: i64,

    #[serde(default)]
    pub tags: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    #[serde(default)]
    pub vendor: Option<Vendor>,
    #[serde(default)]
    pub vendor_opts: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub scrub_props: Vec<String>,
    #[serde(default)]
    pub drop_columns: Vec<String>,
    #[serde(default)]
    pub insert_id_tuple: Vec<String>,

    #[serde(default)]
    pub filters: FilterLists,
    #[serde(default)]
    pub throttle: ThrottleConfig,
    #[serde(default)]
    pub credentials: Credentials,

    pub token: Option<String>,
    pub table_id: Option<String>,

    pub max_bad_record_messages: Option<usize>,
    pub max_bad_records_per_message: Option<usize>,

    /// Caller-supplied per-record callable inserted immediately before
    /// batching (`spec.md` §9). Not (de)serializable; constructed
    /// programmatically.
    #[serde(skip)]
    pub transform_func: Option<Arc<dyn Fn(Record) -> Option<Record> + Send + Sync>>,
}

impl std::fmt::Debug for JobConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobConfig")
            .field("record_type", &self.record_type)
            .field("region", &self.region)
            .field("workers", &self.workers)
            .field("records_per_batch", &self.records_per_batch)
            .field("bytes_per_batch", &self.bytes_per_batch)
            .field("dedupe", &self.dedupe)
            .field("vendor", &self.vendor)
            .field("has_transform_func", &self.transform_func.is_some())
            .finish()
    }
}

impl JobConfig {
    /// `recordsPerBatch` must never exceed 2000 for event/user/group kinds
    /// (`spec.md` §4.5).
    pub fn effective_records_per_batch(&self) -> usize {
        use RecordKind::*;
        match self.record_type {
            Event | User | Group | ExportImportEvents | ExportImportProfiles => {
                self.records_per_batch.min(2000)
            }
            _ => self.records_per_batch,
        }
    }

    /// `min(workers * 5, 100)` unless explicitly overridden (`spec.md` §4.6).
    pub fn effective_high_water(&self) -> usize {
        self.high_water.unwrap_or_else(|| (self.workers * 5).min(100))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        r#"
record_type: event
region: us
stream_format: jsonl
force_gzip: false
"#
    }

    #[test]
    fn loads_with_defaults() {
        let cfg: JobConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        assert_eq!(cfg.workers, 10);
        assert_eq!(cfg.records_per_batch, 2000);
        assert_eq!(cfg.bytes_per_batch, 10 * 1024 * 1024);
        assert_eq!(cfg.max_retries, 10);
        assert!(cfg.fix_data);
    }

    #[test]
    fn batch_cap_enforced_for_events() {
        let mut cfg: JobConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        cfg.records_per_batch = 50_000;
        assert_eq!(cfg.effective_records_per_batch(), 2000);
    }

    #[test]
    fn high_water_default_formula() {
        let mut cfg: JobConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        cfg.workers = 10;
        assert_eq!(cfg.effective_high_water(), 50);
        cfg.workers = 30;
        assert_eq!(cfg.effective_high_water(), 100);
    }
}
