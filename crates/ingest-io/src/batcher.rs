//! The batcher: groups records into batches bounded by both count and
//! encoded byte size (`spec.md` §4.5, concrete scenarios #3 "batcher
//! split" and #4 "oversize drop"). Single-stream by construction — one
//! `Batcher::run` loop, no internal concurrency — matching the transform
//! chain's ordering requirement (`spec.md` §5).

use std::sync::Arc;

use async_trait::async_trait;
use ingest_core::record::{Batch, RecordKind};
use ingest_core::traits::{BatchMessage, BatchTx, Message, Operator, RecordRx};
use ingest_core::{Batcher as BatcherTrait, JobState};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

/// A record's own encoded size, used both to decide when a batch is full
/// and to reject a record that could never fit in any batch.
fn encoded_len(record: &ingest_core::Record) -> usize {
    serde_json::to_vec(record).map(|v| v.len()).unwrap_or(0) + 1 // +1 for the list separator
}

pub struct SizeCountBatcher {
    state: Arc<JobState>,
    kind: RecordKind,
    name: String,
}

impl SizeCountBatcher {
    pub fn new(state: Arc<JobState>) -> Self {
        let kind = state.config.record_type;
        SizeCountBatcher {
            state,
            kind,
            name: "batcher".to_string(),
        }
    }
}

#[async_trait]
impl Operator for SizeCountBatcher {
    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl BatcherTrait for SizeCountBatcher {
    async fn run(
        &mut self,
        mut rx: RecordRx,
        tx: BatchTx,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        let records_cap = self.state.config.effective_records_per_batch();
        let bytes_cap = self.state.config.bytes_per_batch;
        let mut current = Batch::new(self.kind);

        loop {
            let msg = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                msg = rx.recv() => msg,
            };
            let Some(msg) = msg else { break };
            match msg {
                Message::Eos => {
                    self.flush(&tx, &mut current).await;
                    let _ = tx.send(BatchMessage::Eos).await;
                    break;
                }
                Message::Record(record) => {
                    let len = encoded_len(&record);
                    if len > bytes_cap {
                        warn!(len, bytes_cap, "dropping record larger than bytes_per_batch");
                        self.state.counters.incr_oversize_dropped(1);
                        continue;
                    }
                    if current.len() >= records_cap || current.encoded_len + len > bytes_cap {
                        self.flush(&tx, &mut current).await;
                    }
                    current.encoded_len += len;
                    current.records.push(record);
                }
            }
        }
        Ok(())
    }
}

impl SizeCountBatcher {
    async fn flush(&self, tx: &BatchTx, batch: &mut Batch) {
        if batch.is_empty() {
            return;
        }
        let len = batch.len();
        let flushed = std::mem::replace(batch, Batch::new(self.kind));
        self.state.counters.incr_batches(1);
        self.state.record_batch_len(len);
        trace!(len, "flushing batch");
        let _ = tx.send(BatchMessage::Batch(flushed)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_core::record::RecordKind;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn state(records_per_batch: usize, bytes_per_batch: usize) -> Arc<JobState> {
        let mut cfg: ingest_core::spec::JobConfig = serde_yaml::from_str(
            "record_type: event\nregion: us\nstream_format: jsonl\nforce_gzip: false\ncredentials:\n  token: test-token\n",
        )
        .unwrap();
        cfg.records_per_batch = records_per_batch;
        cfg.bytes_per_batch = bytes_per_batch;
        JobState::new(cfg).unwrap()
    }

    #[tokio::test]
    async fn splits_on_record_count() {
        let state = state(2, 10 * 1024 * 1024);
        let (rtx, rrx) = mpsc::channel(16);
        let (btx, mut brx) = mpsc::channel(16);
        let mut batcher = SizeCountBatcher::new(state);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(async move { batcher.run(rrx, btx, cancel).await });

        for i in 0..5 {
            let record: ingest_core::Record =
                serde_json::from_value(json!({"event": "click", "i": i})).unwrap();
            rtx.send(Message::Record(record)).await.unwrap();
        }
        rtx.send(Message::Eos).await.unwrap();
        drop(rtx);

        let mut batch_lens = Vec::new();
        while let Some(msg) = brx.recv().await {
            match msg {
                BatchMessage::Batch(b) => batch_lens.push(b.len()),
                BatchMessage::Eos => break,
            }
        }
        handle.await.unwrap().unwrap();
        assert_eq!(batch_lens, vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn oversize_record_is_dropped_not_batched() {
        let state = state(10, 16);
        let (rtx, rrx) = mpsc::channel(16);
        let (btx, mut brx) = mpsc::channel(16);
        let mut batcher = SizeCountBatcher::new(state.clone());
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(async move { batcher.run(rrx, btx, cancel).await });

        let huge: ingest_core::Record = serde_json::from_value(
            json!({"event": "x".repeat(100), "properties": {"a": "b".repeat(100)}}),
        )
        .unwrap();
        rtx.send(Message::Record(huge)).await.unwrap();
        rtx.send(Message::Eos).await.unwrap();
        drop(rtx);

        let mut saw_batch = false;
        while let Some(msg) = brx.recv().await {
            match msg {
                BatchMessage::Batch(_) => saw_batch = true,
                BatchMessage::Eos => break,
            }
        }
        handle.await.unwrap().unwrap();
        assert!(!saw_batch);
        assert_eq!(state.counters.oversize_dropped(), 1);
    }
}
