//! Stage 10: epoch-filter — drop records whose `time` falls outside
//! `[config.epoch_start, config.epoch_end]` when either bound is set
//! (`spec.md` §6 `epoch_start`/`epoch_end`).

use ingest_core::{JobState, Record};
use serde_json::Value;

use crate::outcome::{DropReason, StageOutcome};
use crate::util::property_bag;

pub fn apply(state: &JobState, record: Record) -> StageOutcome {
    if state.config.epoch_start.is_none() && state.config.epoch_end.is_none() {
        return StageOutcome::Keep(record);
    }
    let shape = state.config.record_type.shape();
    let bag = property_bag(&record, shape);
    let time = match bag.get("time") {
        Some(Value::Number(n)) => n.as_i64(),
        _ => None,
    };
    let Some(time) = time else {
        return StageOutcome::Keep(record);
    };
    if let Some(start) = state.config.epoch_start {
        if time < start {
            return StageOutcome::Drop(DropReason::OutOfBounds);
        }
    }
    if let Some(end) = state.config.epoch_end {
        if time > end {
            return StageOutcome::Drop(DropReason::OutOfBounds);
        }
    }
    StageOutcome::Keep(record)
}
