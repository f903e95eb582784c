//! Pipeline operator traits, generalized from the teacher's
//! `Operator`/`Source`/`Transform`/`Sink` trio (built around Arrow
//! `RecordBatch`) to this engine's `Record`-at-a-time transform chain and
//! `Batch`-at-a-time dispatcher.
//!
//! Two channel granularities cross the pipeline (`spec.md` §2's data flow):
//! individual `Record`s flow from the source through the decoder and the
//! transform chain, and `Batch`es flow from the batcher through the
//! dispatcher. `spec.md` §5 requires the transform chain and batcher to be
//! single-stream (to preserve filter-counter ordering) while the dispatcher
//! is a worker pool — splitting `Stage` (record-level) from `Batcher`
//! (record-to-batch) from `Sink` (batch-level) mirrors that directly,
//! rather than forcing one shared `Transform` trait across a granularity
//! change the way the teacher's Arrow-batch pipeline never had to.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::record::{Batch, Record};

/// Record-level message: source -> transform chain -> batcher.
#[derive(Debug, Clone)]
pub enum Message {
    Record(Record),
    Eos,
}

/// Batch-level message: batcher -> dispatcher.
#[derive(Debug, Clone)]
pub enum BatchMessage {
    Batch(Batch),
    Eos,
}

pub type RecordTx = mpsc::Sender<Message>;
pub type RecordRx = mpsc::Receiver<Message>;
pub type BatchTx = mpsc::Sender<BatchMessage>;
pub type BatchRx = mpsc::Receiver<BatchMessage>;

#[async_trait]
pub trait Operator: Send + Sync {
    fn name(&self) -> &str;
}

/// Entry point of the pipeline: reads from a source-agnostic origin and
/// produces decoded records (`spec.md` §4.1/§4.2).
#[async_trait]
pub trait Source: Operator {
    async fn run(&mut self, tx: RecordTx, cancel: CancellationToken) -> anyhow::Result<()>;
}

/// A single-stream, record-at-a-time processing stage: the transform chain
/// (`spec.md` §4.3).
#[async_trait]
pub trait Stage: Operator {
    async fn run(
        &mut self,
        rx: RecordRx,
        tx: RecordTx,
        cancel: CancellationToken,
    ) -> anyhow::Result<()>;
}

/// Groups records into size-and-count-bounded batches (`spec.md` §4.5).
#[async_trait]
pub trait Batcher: Operator {
    async fn run(
        &mut self,
        rx: RecordRx,
        tx: BatchTx,
        cancel: CancellationToken,
    ) -> anyhow::Result<()>;
}

/// Exit point of the pipeline: the HTTP dispatcher (`spec.md` §4.6), or a
/// local/"write output elsewhere" sink (`spec.md` §6 persisted-state note).
#[async_trait]
pub trait Sink: Operator {
    async fn run(&mut self, rx: BatchRx, cancel: CancellationToken) -> anyhow::Result<()>;
}
