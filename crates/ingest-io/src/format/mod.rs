//! Stream format decoders (`spec.md` §4.2). NDJSON, CSV, and TSV read their
//! source row-by-row through a shared `BufRead`, never materializing the
//! whole input; a JSON array has to be parsed whole (no incremental
//! top-level-array parser is worth pulling in for this one format), and
//! Parquet's footer-based layout needs random access to the complete
//! buffer, so those two read their source fully before decoding. A
//! malformed individual line/row/element is skipped and counted
//! `unparsable` rather than failing the whole file — only an outright I/O
//! error on the stream itself is a hard failure.

pub mod csvlike;
pub mod json_array;
pub mod ndjson;
pub mod parquet;

use std::io::{BufRead, BufReader, Read};

use ingest_core::error::IngestError;
use ingest_core::record::RecordKind;
use ingest_core::spec::StreamFormat;
use ingest_core::{JobState, Record};

/// Decode one buffered stream (after any gzip unwrap) into records,
/// dispatching on the configured format. Parquet ignores `kind`/delimiter
/// choices; CSV/TSV use `kind` only implicitly (header-to-column mapping
/// always applies here). Bad individual records are skipped and counted
/// on `state`, not surfaced as an `Err` — see the module doc for which
/// formats can do this incrementally versus needing the whole stream read
/// first.
pub fn decode(
    format: StreamFormat,
    kind: RecordKind,
    reader: &mut dyn BufRead,
    state: &JobState,
) -> ingest_core::Result<Vec<Record>> {
    match format {
        StreamFormat::Jsonl => ndjson::decode(reader, state),
        StreamFormat::Json => json_array::decode(reader, state),
        StreamFormat::Csv => csvlike::decode(reader, b',', state),
        StreamFormat::Tsv => csvlike::decode(reader, b'\t', state),
        StreamFormat::Parquet => {
            let mut buf = Vec::new();
            reader
                .read_to_end(&mut buf)
                .map_err(|e| IngestError::Source(format!("parquet read error: {e}")))?;
            parquet::decode(&buf, kind)
        }
    }
}

/// Resolve the format to decode with: the configured format wins, else
/// infer from the file extension (stripping a trailing `.gz`).
pub fn infer_format(path: &str, configured: Option<StreamFormat>) -> ingest_core::Result<StreamFormat> {
    if let Some(f) = configured {
        return Ok(f);
    }
    let stripped = path.strip_suffix(".gz").unwrap_or(path);
    let ext = stripped.rsplit('.').next().unwrap_or_default().to_lowercase();
    match ext.as_str() {
        "jsonl" | "ndjson" => Ok(StreamFormat::Jsonl),
        "json" => Ok(StreamFormat::Json),
        "csv" => Ok(StreamFormat::Csv),
        "tsv" => Ok(StreamFormat::Tsv),
        "parquet" => Ok(StreamFormat::Parquet),
        other => Err(IngestError::UnsupportedFormat(other.to_string())),
    }
}

/// Wrap a raw byte source in a `BufRead`, transparently unwrapping gzip when
/// the stream looks gzip-encoded (magic bytes `1f 8b`, sniffed via
/// `fill_buf` without consuming them) or when the job forces it
/// (`config.force_gzip`). Streams rather than eagerly decompressing to a
/// `Vec` up front.
pub fn open_reader(
    raw: impl Read + Send + 'static,
    force: bool,
) -> ingest_core::Result<Box<dyn BufRead + Send>> {
    let mut buffered = BufReader::new(raw);
    let looks_gzipped = {
        let peek = buffered
            .fill_buf()
            .map_err(|e| IngestError::Source(format!("read error: {e}")))?;
        peek.len() >= 2 && peek[0] == 0x1f && peek[1] == 0x8b
    };
    if looks_gzipped || force {
        Ok(Box::new(BufReader::new(flate2::read::GzDecoder::new(buffered))))
    } else {
        Ok(Box::new(buffered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_jsonl_from_extension_ignoring_gz_suffix() {
        assert_eq!(
            infer_format("events.jsonl.gz", None).unwrap(),
            StreamFormat::Jsonl
        );
    }

    #[test]
    fn configured_format_overrides_extension() {
        assert_eq!(
            infer_format("events.csv", Some(StreamFormat::Json)).unwrap(),
            StreamFormat::Json
        );
    }

    #[test]
    fn unknown_extension_is_an_error() {
        assert!(infer_format("events.weird", None).is_err());
    }

    #[test]
    fn open_reader_passes_through_plain_bytes_unchanged() {
        let input = b"{\"a\":1}\n".to_vec();
        let mut reader = open_reader(std::io::Cursor::new(input.clone()), false).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn open_reader_transparently_unwraps_gzip_magic_bytes() {
        use std::io::Write;
        let plain = b"{\"a\":1}\n";
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
        encoder.write_all(plain).unwrap();
        let gzipped = encoder.finish().unwrap();

        let mut reader = open_reader(std::io::Cursor::new(gzipped), false).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, plain);
    }

    #[test]
    fn open_reader_forces_gunzip_even_without_magic_bytes_when_forced() {
        // `force` is for cases where the input genuinely is gzip but some
        // proxy strips/alters the magic bytes; here we just confirm `force`
        // doesn't error out on a gzip stream that *does* have magic bytes.
        use std::io::Write;
        let plain = b"forced\n";
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
        encoder.write_all(plain).unwrap();
        let gzipped = encoder.finish().unwrap();

        let mut reader = open_reader(std::io::Cursor::new(gzipped), true).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, plain);
    }
}
