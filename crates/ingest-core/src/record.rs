//! The dynamic record model.
//!
//! Records are conceptually `mapping<string, Value>` (see `spec.md` design
//! notes); we represent that directly with `serde_json::Map` rather than a
//! hand-rolled tagged sum, since every stage in the transform chain already
//! operates on JSON-shaped data and the wire format for events/profiles is a
//! JSON array to begin with.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single record flowing through the pipeline: an event, a profile
/// directive, a lookup row, or a passthrough export/SCD row.
pub type Record = Map<String, Value>;

/// The run-level record type. One job processes exactly one `RecordKind`;
/// it drives transform-chain assembly, batching limits, and endpoint
/// selection. This is richer than the four data-shape variants in the data
/// model (`spec.md` §3) because it also distinguishes export/profile-export
/// and the two streaming-export variants used for re-ingestion pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordKind {
    Event,
    User,
    Group,
    Table,
    Export,
    ProfileExport,
    Scd,
    ExportImportEvents,
    ExportImportProfiles,
}

impl RecordKind {
    /// The coarse data-shape this record kind maps to for transform-chain
    /// purposes (`spec.md` §3's four shape variants, plus Scd/Export kept
    /// distinct since they skip most of the chain).
    pub fn shape(self) -> RecordShape {
        use RecordKind::*;
        match self {
            Event | ExportImportEvents => RecordShape::Event,
            User | Group | ProfileExport | ExportImportProfiles => RecordShape::Profile,
            Table => RecordShape::LookupRow,
            Scd => RecordShape::ScdRow,
            Export => RecordShape::ExportRow,
        }
    }

    /// Whether this kind carries profile directives and thus needs a
    /// `group_key` alongside `distinct_id`/`group_id`.
    pub fn is_group(self) -> bool {
        matches!(self, RecordKind::Group)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordShape {
    Event,
    Profile,
    LookupRow,
    ScdRow,
    ExportRow,
}

/// One of the seven profile update directives (`spec.md` glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Directive {
    Set,
    SetOnce,
    Add,
    Union,
    Append,
    Remove,
    Unset,
}

impl Directive {
    /// The directive's top-level key in the wire payload, e.g. `$set`.
    pub fn key(self) -> &'static str {
        match self {
            Directive::Set => "$set",
            Directive::SetOnce => "$set_once",
            Directive::Add => "$add",
            Directive::Union => "$union",
            Directive::Append => "$append",
            Directive::Remove => "$remove",
            Directive::Unset => "$unset",
        }
    }

    pub fn all() -> [Directive; 7] {
        [
            Directive::Set,
            Directive::SetOnce,
            Directive::Add,
            Directive::Union,
            Directive::Append,
            Directive::Remove,
            Directive::Unset,
        ]
    }

    pub fn from_key(key: &str) -> Option<Directive> {
        Self::all().into_iter().find(|d| d.key() == key)
    }
}

/// An ordered, non-empty sequence of records of one kind, bounded by both
/// count and encoded byte size (`spec.md` §3/§4.5).
#[derive(Debug, Clone)]
pub struct Batch {
    pub kind: RecordKind,
    pub records: Vec<Record>,
    /// The encoded (JSON or CSV) byte size this batch will occupy on the
    /// wire, computed incrementally as records are appended.
    pub encoded_len: usize,
}

impl Batch {
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            records: Vec::new(),
            encoded_len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
