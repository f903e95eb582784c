//! Wire-encode a `Batch` for dispatch: a JSON array for every record kind
//! except `Table` lookup rows, which go out as CSV (`spec.md` §6 endpoint
//! table — lookup-table imports are CSV over PUT).

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use ingest_core::endpoint::ContentType;
use ingest_core::error::IngestError;
use ingest_core::record::Batch;

pub fn encode(batch: &Batch, content_type: ContentType) -> ingest_core::Result<Vec<u8>> {
    match content_type {
        ContentType::Json => serde_json::to_vec(&batch.records)
            .map_err(|e| IngestError::Source(format!("batch json encode error: {e}"))),
        ContentType::Csv => encode_csv(batch),
    }
}

fn encode_csv(batch: &Batch) -> ingest_core::Result<Vec<u8>> {
    let mut headers: Vec<String> = Vec::new();
    for record in &batch.records {
        for key in record.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record(&headers)
        .map_err(|e| IngestError::Source(format!("csv header write error: {e}")))?;
    for record in &batch.records {
        let row: Vec<String> = headers
            .iter()
            .map(|h| record.get(h).map(value_to_cell).unwrap_or_default())
            .collect();
        writer
            .write_record(&row)
            .map_err(|e| IngestError::Source(format!("csv row write error: {e}")))?;
    }
    writer
        .into_inner()
        .map_err(|e| IngestError::Source(format!("csv flush error: {e}")))
}

fn value_to_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Compress a request body, honoring `config.compress` (`spec.md` §6
/// `compress`). Compression level matches `config.compression_level`
/// (1-9, flate2's scale).
pub fn maybe_compress(bytes: Vec<u8>, compress: bool, level: u32) -> ingest_core::Result<Vec<u8>> {
    if !compress {
        return Ok(bytes);
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(level));
    encoder
        .write_all(&bytes)
        .map_err(|e| IngestError::Source(format!("gzip write error: {e}")))?;
    encoder
        .finish()
        .map_err(|e| IngestError::Source(format!("gzip finish error: {e}")))
}
