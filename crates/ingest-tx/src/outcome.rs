//! The per-stage result type. A stage either keeps (possibly rewritten)
//! the record, or drops it with a reason that maps onto one of
//! `JobState`'s counters — mirroring the teacher's `FilterOutcome`-style
//! enums rather than a bare `Option<Record>`, so that every drop is
//! accounted for (`spec.md` §8's processed-accounting invariant).

use ingest_core::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    WhitelistSkipped,
    BlacklistSkipped,
    OutOfBounds,
    Duplicate,
    Unparsable,
    Empty,
}

#[derive(Debug)]
pub enum StageOutcome {
    Keep(Record),
    Drop(DropReason),
}

impl StageOutcome {
    pub fn is_keep(&self) -> bool {
        matches!(self, StageOutcome::Keep(_))
    }
}
