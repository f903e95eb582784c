//! Parquet decoding. Each row group is read as an Arrow `RecordBatch` and
//! converted to JSON rows via `arrow::json`, giving back exactly our
//! `Record` type with no intermediate representation.

use ingest_core::error::IngestError;
use ingest_core::record::RecordKind;
use ingest_core::Record;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

pub fn decode(bytes: &[u8], _kind: RecordKind) -> ingest_core::Result<Vec<Record>> {
    let buf = bytes::Bytes::copy_from_slice(bytes);
    let builder = ParquetRecordBatchReaderBuilder::try_new(buf)
        .map_err(|e| IngestError::Source(format!("parquet open error: {e}")))?;
    let reader = builder
        .build()
        .map_err(|e| IngestError::Source(format!("parquet reader build error: {e}")))?;

    let mut records = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| IngestError::Source(format!("parquet read error: {e}")))?;
        let rows = arrow::json::writer::record_batches_to_json_rows(&[&batch])
            .map_err(|e| IngestError::Source(format!("parquet -> json error: {e}")))?;
        records.extend(rows);
    }
    Ok(records)
}
