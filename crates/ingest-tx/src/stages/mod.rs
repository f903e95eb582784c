//! The individual transform-chain stages, one module per stage, numbered
//! to match their position in the canonical chain order (`spec.md` §4.3).
//! Stage 4 (dedupe) fills a gap the upstream numbering otherwise leaves
//! unused — see `dedupe`'s module doc.

pub mod alias;
pub mod dedupe;
pub mod drop_columns;
pub mod epoch;
pub mod filters;
pub mod flatten;
pub mod insert_id;
pub mod json_fix;
pub mod nulls;
pub mod scd;
pub mod scrub;
pub mod shape;
pub mod tags;
pub mod time_fix;
pub mod token;
pub mod utc_offset;
pub mod v2_compat;
