//! Structured error taxonomy (`spec.md` §7). Configuration and global I/O
//! errors are terminal for the run; everything else is surfaced through
//! `JobState` counters instead of propagating here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("no credentials resolved for region {region:?} record kind {kind:?}")]
    MissingCredentials { region: String, kind: String },

    #[error("unrecognized region: {0}")]
    UnrecognizedRegion(String),

    #[error("unsupported vendor: {0}")]
    UnsupportedVendor(String),

    #[error("unsupported stream format: {0}")]
    UnsupportedFormat(String),

    #[error("source unreadable: {0}")]
    Source(String),

    #[error("object store error: {0}")]
    ObjectStore(#[from] anyhow::Error),

    #[error("run was cancelled")]
    Cancelled,

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),
}

pub type Result<T> = std::result::Result<T, IngestError>;
