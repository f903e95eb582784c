//! Deterministic, non-cryptographic hashing used for insert-id synthesis and
//! dedupe-set keys (`spec.md` §3/§4.3).
//!
//! The hash must be stable across runs and processes: it does not use
//! `RandomState`, it sorts object keys before serializing, and it encodes
//! values consistently regardless of how `serde_json` happened to order a
//! `Map` internally.

use serde_json::Value;

/// FNV-1a, 32-bit. Simple, dependency-free, and deterministic — the same
/// property every corpus hash used for this purpose needs, without pulling
/// in a cryptographic hasher for a value that is never security-sensitive.
pub fn fnv1a32(bytes: &[u8]) -> u32 {
    const FNV_OFFSET: u32 = 0x811c_9dc5;
    const FNV_PRIME: u32 = 0x0100_0193;
    let mut hash = FNV_OFFSET;
    for b in bytes {
        hash ^= *b as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Render a JSON value into a canonical string: object keys sorted
/// recursively, arrays left in order (order is meaningful), numbers/strings
/// rendered via `serde_json`'s own (stable) scalar formatting.
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key).unwrap_or_default());
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

/// The stable 32-bit hash of a record's canonical serialization, as a
/// lowercase hex string — used both as a fallback insert-id and as the
/// dedupe-set key.
pub fn stable_hash_hex(value: &Value) -> String {
    format!("{:08x}", fnv1a32(canonicalize(value).as_bytes()))
}
