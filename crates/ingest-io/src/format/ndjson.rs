//! Newline-delimited JSON decoding, streamed line-by-line through a
//! `BufRead`. A blank line is skipped rather than treated as a malformed
//! record; a line that fails to parse as a JSON object is counted
//! `unparsable` and skipped, not treated as a failure of the whole file
//! (`spec.md` §4.2).

use std::io::BufRead;

use ingest_core::error::IngestError;
use ingest_core::{JobState, Record};

pub fn decode(reader: &mut dyn BufRead, state: &JobState) -> ingest_core::Result<Vec<Record>> {
    let mut records = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        let n = reader
            .read_line(&mut line)
            .map_err(|e| IngestError::Source(format!("jsonl read error: {e}")))?;
        if n == 0 {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(serde_json::Value::Object(map)) => records.push(map),
            _ => {
                // Never reaches the transform chain, so `processed` has to be
                // bumped here too (spec.md §8's processed-equals-sum invariant).
                state.counters.incr_processed(1);
                state.counters.incr_unparsable(1);
            }
        }
    }
    Ok(records)
}
