//! Test-only helper for building a minimal valid `JobConfig`, shared across
//! the per-stage unit tests.

use ingest_core::record::RecordKind;
use ingest_core::spec::{JobConfig, Region};

pub fn minimal_config() -> JobConfig {
    serde_yaml::from_str(
        r#"
record_type: event
region: us
stream_format: jsonl
force_gzip: false
credentials:
  token: test-token
"#,
    )
    .unwrap()
}

pub fn config_for(kind: RecordKind) -> JobConfig {
    let mut cfg = minimal_config();
    cfg.record_type = kind;
    cfg
}

#[allow(dead_code)]
pub fn region(cfg: &JobConfig) -> Region {
    cfg.region
}
