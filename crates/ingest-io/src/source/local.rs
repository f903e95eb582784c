//! Local filesystem source: a glob pattern over one or more files, each
//! decoded and streamed record-by-record (`spec.md` §4.1/§4.2). Grounded
//! in the teacher's own `glob`-driven CSV source, generalized across
//! formats and gzip.
//!
//! A pattern matching zero files (an empty directory scan) yields an
//! empty sequence rather than failing the run; a matched file whose
//! extension doesn't map to a known format is skipped with a warning
//! rather than aborting the whole source. When `config.vendor` is set,
//! each decoded record is run through that vendor's adapter before it
//! reaches the transform chain.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use glob::glob;
use ingest_core::traits::{Message, Operator, RecordTx};
use ingest_core::{JobState, Source};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::format::{decode, infer_format, open_reader};
use crate::throttle::ThrottleGate;
use crate::vendor_map;
use ingest_vendors::VendorAdapter;

pub struct LocalSource {
    state: Arc<JobState>,
    pattern: String,
    throttle: Arc<ThrottleGate>,
    vendor_adapter: Option<Box<dyn VendorAdapter>>,
    name: String,
}

impl LocalSource {
    pub fn new(
        state: Arc<JobState>,
        pattern: String,
        throttle: Arc<ThrottleGate>,
    ) -> ingest_core::Result<Self> {
        let vendor_adapter = vendor_map::resolve(&state)?;
        Ok(LocalSource {
            state,
            pattern,
            throttle,
            vendor_adapter,
            name: "local-source".to_string(),
        })
    }
}

#[async_trait]
impl Operator for LocalSource {
    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Source for LocalSource {
    async fn run(&mut self, tx: RecordTx, cancel: CancellationToken) -> anyhow::Result<()> {
        let mut paths = Vec::new();
        for entry in glob(&self.pattern).context("invalid source glob pattern")? {
            paths.push(entry.context("glob entry error")?);
        }
        if paths.is_empty() {
            info!(pattern = %self.pattern, "no files matched source pattern, yielding empty sequence");
        }

        for path in &paths {
            if cancel.is_cancelled() {
                break;
            }
            self.throttle.wait_while_paused(&cancel).await;

            let display = path.display().to_string();
            let format = match infer_format(&display, self.state.config.stream_format) {
                Ok(f) => f,
                Err(e) => {
                    warn!(file = %display, error = %e, "unsupported file extension, skipping");
                    continue;
                }
            };
            let file = std::fs::File::open(path).with_context(|| format!("open {display}"))?;
            let mut reader = match open_reader(file, self.state.config.force_gzip) {
                Ok(reader) => reader,
                Err(e) => {
                    warn!(file = %display, error = %e, "source read error, skipping file");
                    continue;
                }
            };

            let records = match decode(format, self.state.config.record_type, reader.as_mut(), &self.state) {
                Ok(records) => records,
                Err(e) => {
                    warn!(file = %display, error = %e, "source decode error, skipping file");
                    continue;
                }
            };
            let records = vendor_map::apply(&self.state, self.vendor_adapter.as_deref(), records);
            info!(file = %display, count = records.len(), "decoded file");

            for record in records {
                if cancel.is_cancelled() {
                    break;
                }
                self.throttle.wait_while_paused(&cancel).await;
                if tx.send(Message::Record(record)).await.is_err() {
                    return Ok(());
                }
            }
        }

        let _ = tx.send(Message::Eos).await;
        Ok(())
    }
}
