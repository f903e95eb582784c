//! Stage 11: property-scrub — unconditionally strip `config.scrub_props`
//! keys from the property bag, regardless of `remove_nulls` (`spec.md` §6
//! `scrub_props`: privacy-motivated removal, always on when configured).

use ingest_core::{JobState, Record};

use crate::outcome::StageOutcome;
use crate::util::property_bag_mut;

pub fn apply(state: &JobState, mut record: Record) -> StageOutcome {
    if state.config.scrub_props.is_empty() {
        return StageOutcome::Keep(record);
    }
    let shape = state.config.record_type.shape();
    let bag = property_bag_mut(&mut record, shape);
    for key in &state.config.scrub_props {
        bag.remove(key);
    }
    StageOutcome::Keep(record)
}
