//! Assembles the enabled stages into one ordered chain and wires it up as
//! a single `ingest_core::Stage` operator (`spec.md` §5: the transform
//! chain is single-stream, to preserve filter-counter ordering — so it
//! runs as one `Stage::run` loop over a plain `Vec` of stage functions,
//! not as several separately spawned operators the way the teacher chains
//! its `Transform` stages).

use std::sync::Arc;

use async_trait::async_trait;
use ingest_core::traits::{Message, Operator, RecordRx, RecordTx, Stage};
use ingest_core::{JobState, Record};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::outcome::{DropReason, StageOutcome};
use crate::stages;

type StageFn = fn(&JobState, Record) -> StageOutcome;

/// The ordered, enabled-only list of stage functions for one job
/// (`spec.md` §4.3 canonical order).
pub struct TransformChain {
    state: Arc<JobState>,
    stages: Vec<StageFn>,
}

impl TransformChain {
    /// Build the chain from `state.config`, including only the stages
    /// whose gating option is set. Stages with no gating option (alias,
    /// scd-transform, shape-fix, dedupe, filters, insert-id) always run;
    /// they are either no-ops or required normalization for the
    /// configured record kind.
    pub fn build(state: Arc<JobState>) -> Self {
        let cfg = &state.config;
        let mut stages: Vec<StageFn> = Vec::with_capacity(17);

        stages.push(stages::alias::apply);
        stages.push(stages::scd::apply);
        stages.push(stages::shape::apply);
        stages.push(stages::dedupe::apply);
        if cfg.v2_compat {
            stages.push(stages::v2_compat::apply);
        }
        if cfg.remove_nulls {
            stages.push(stages::nulls::apply);
        }
        if cfg.time_offset != 0 {
            stages.push(stages::utc_offset::apply);
        }
        if !cfg.tags.is_empty() {
            stages.push(stages::tags::apply);
        }
        stages.push(stages::filters::apply);
        if cfg.epoch_start.is_some() || cfg.epoch_end.is_some() {
            stages.push(stages::epoch::apply);
        }
        if !cfg.scrub_props.is_empty() {
            stages.push(stages::scrub::apply);
        }
        if !cfg.drop_columns.is_empty() {
            stages.push(stages::drop_columns::apply);
        }
        if cfg.flatten_data {
            stages.push(stages::flatten::apply);
        }
        if cfg.fix_json {
            stages.push(stages::json_fix::apply);
        }
        stages.push(stages::insert_id::apply);
        if cfg.add_token {
            stages.push(stages::token::apply);
        }
        if cfg.fix_time {
            stages.push(stages::time_fix::apply);
        }

        TransformChain { state, stages }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Run one record through every enabled stage, short-circuiting on the
    /// first drop.
    pub fn apply(&self, mut record: Record) -> StageOutcome {
        for stage in &self.stages {
            match stage(&self.state, record) {
                StageOutcome::Keep(out) => record = out,
                drop @ StageOutcome::Drop(_) => return drop,
            }
        }
        StageOutcome::Keep(record)
    }
}

fn bump_counter(state: &JobState, reason: DropReason) {
    match reason {
        DropReason::WhitelistSkipped => state.counters.incr_whitelist_skipped(1),
        DropReason::BlacklistSkipped => state.counters.incr_blacklist_skipped(1),
        DropReason::OutOfBounds => state.counters.incr_out_of_bounds(1),
        DropReason::Duplicate => state.counters.incr_duplicates(1),
        DropReason::Unparsable => state.counters.incr_unparsable(1),
        DropReason::Empty => state.counters.incr_empty(1),
    }
}

/// The `Stage` operator that drives a `TransformChain` over the pipeline's
/// record channel.
pub struct ChainStage {
    chain: TransformChain,
    name: String,
}

impl ChainStage {
    pub fn new(state: Arc<JobState>) -> Self {
        let chain = TransformChain::build(state);
        ChainStage {
            chain,
            name: "transform-chain".to_string(),
        }
    }
}

#[async_trait]
impl Operator for ChainStage {
    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Stage for ChainStage {
    async fn run(
        &mut self,
        mut rx: RecordRx,
        tx: RecordTx,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        loop {
            let msg = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                msg = rx.recv() => msg,
            };
            let Some(msg) = msg else { break };
            match msg {
                Message::Eos => {
                    let _ = tx.send(Message::Eos).await;
                    break;
                }
                Message::Record(record) => {
                    self.chain.state.counters.incr_processed(1);
                    match self.chain.apply(record) {
                        StageOutcome::Keep(out) => {
                            if tx.send(Message::Record(out)).await.is_err() {
                                trace!("transform chain: downstream receiver dropped");
                                break;
                            }
                        }
                        StageOutcome::Drop(reason) => {
                            bump_counter(&self.chain.state, reason);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_core::record::RecordKind;
    use serde_json::json;

    #[test]
    fn only_enabled_stages_are_included() {
        let cfg = crate::tests_support::config_for(RecordKind::Event);
        let state = JobState::new(cfg).unwrap();
        let chain = TransformChain::build(state);
        // alias, scd, shape, dedupe, filters, insert-id, time-transform
        // (fix_time defaults true) are always/default-on.
        assert_eq!(chain.len(), 7);
    }

    #[test]
    fn disabled_fix_time_shrinks_the_chain() {
        let mut cfg = crate::tests_support::config_for(RecordKind::Event);
        cfg.fix_time = false;
        let state = JobState::new(cfg).unwrap();
        let chain = TransformChain::build(state);
        assert_eq!(chain.len(), 6);
    }

    #[test]
    fn end_to_end_through_the_chain() {
        let mut cfg = crate::tests_support::config_for(RecordKind::Event);
        cfg.remove_nulls = true;
        cfg.flatten_data = true;
        let state = JobState::new(cfg).unwrap();
        let chain = TransformChain::build(state);
        let record: Record = serde_json::from_value(json!({
            "event": "click",
            "distinct_id": "u1",
            "nested": {"a": null, "b": 1}
        }))
        .unwrap();
        match chain.apply(record) {
            StageOutcome::Keep(r) => {
                assert_eq!(r["event"], json!("click"));
                assert_eq!(r["properties"]["nested.b"], json!(1));
                assert!(r["properties"].get("nested.a").is_none());
                assert!(r["properties"].get("$insert_id").is_some());
            }
            other => panic!("expected keep, got {other:?}"),
        }
    }
}
