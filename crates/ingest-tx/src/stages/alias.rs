//! Stage 1: alias-apply — rename top-level or `properties` keys per
//! `config.aliases` (`spec.md` §4.3, §6 `aliases`). Runs before shape-fix,
//! so there's no guarantee a `"properties"` object exists yet; keys are
//! renamed wherever they're found — at the top level and, if already
//! present, inside `properties` — rather than only after normalization.

use ingest_core::{JobState, Record};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::outcome::StageOutcome;

pub fn apply(state: &JobState, mut record: Record) -> StageOutcome {
    let aliases = &state.config.aliases;
    if aliases.is_empty() {
        return StageOutcome::Keep(record);
    }
    rename_keys(aliases, &mut record);
    if let Some(Value::Object(properties)) = record.get_mut("properties") {
        rename_keys(aliases, properties);
    }
    StageOutcome::Keep(record)
}

/// Renames `from -> to` in place. Leaves `from` untouched if `to` is
/// already present — an explicit target key wins over an aliased source.
fn rename_keys(aliases: &HashMap<String, String>, map: &mut Map<String, Value>) {
    for (from, to) in aliases {
        if map.contains_key(to) {
            continue;
        }
        if let Some(value) = map.remove(from) {
            map.insert(to.clone(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn state(aliases: HashMap<String, String>) -> Arc<JobState> {
        let mut cfg = crate::tests_support::minimal_config();
        cfg.aliases = aliases;
        JobState::new(cfg).unwrap()
    }

    #[test]
    fn renames_a_top_level_key() {
        let mut aliases = HashMap::new();
        aliases.insert("old_name".to_string(), "new_name".to_string());
        let st = state(aliases);
        let record: Record =
            serde_json::from_value(json!({"event": "click", "old_name": "u1"})).unwrap();
        match apply(&st, record) {
            StageOutcome::Keep(r) => {
                assert_eq!(r["new_name"], json!("u1"));
                assert!(r.get("old_name").is_none());
            }
            _ => panic!("expected keep"),
        }
    }

    #[test]
    fn renames_a_properties_key_when_already_nested() {
        let mut aliases = HashMap::new();
        aliases.insert("uid".to_string(), "distinct_id".to_string());
        let st = state(aliases);
        let record: Record =
            serde_json::from_value(json!({"event": "click", "properties": {"uid": "u1"}}))
                .unwrap();
        match apply(&st, record) {
            StageOutcome::Keep(r) => {
                assert_eq!(r["properties"]["distinct_id"], json!("u1"));
                assert!(r["properties"].get("uid").is_none());
            }
            _ => panic!("expected keep"),
        }
    }

    #[test]
    fn existing_target_key_wins_over_the_alias_source() {
        let mut aliases = HashMap::new();
        aliases.insert("old_name".to_string(), "new_name".to_string());
        let st = state(aliases);
        let record: Record = serde_json::from_value(
            json!({"event": "click", "old_name": "stale", "new_name": "fresh"}),
        )
        .unwrap();
        match apply(&st, record) {
            StageOutcome::Keep(r) => {
                assert_eq!(r["new_name"], json!("fresh"));
                assert_eq!(r["old_name"], json!("stale"));
            }
            _ => panic!("expected keep"),
        }
    }

    #[test]
    fn no_aliases_configured_leaves_record_untouched() {
        let st = state(HashMap::new());
        let record: Record = serde_json::from_value(json!({"event": "untouched"})).unwrap();
        match apply(&st, record) {
            StageOutcome::Keep(r) => assert_eq!(r["event"], json!("untouched")),
            _ => panic!("expected keep"),
        }
    }
}
