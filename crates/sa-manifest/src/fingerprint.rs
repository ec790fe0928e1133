//! Content fingerprints over a canonical row serialization.
//!
//! Canonical form: a header line carrying the artifact schema version, then
//! one compact JSON object per row with keys sorted at every depth, rows in
//! artifact order, each terminated by `\n`. The fingerprint is the SHA-256 of
//! that byte stream, hex encoded. The encoding is independent of the
//! columnar file layout, so the same rows always hash the same.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Compute SHA-256 hex digest.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Render a JSON value with object keys sorted at every depth.
pub fn canonical_json(value: &Value) -> String {
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
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
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
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Streaming fingerprint builder.
pub struct Fingerprinter {
    hasher: Sha256,
    rows: u64,
}

impl Fingerprinter {
    pub fn new(schema_version: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(schema_version.as_bytes());
        hasher.update(b"\n");
        Self { hasher, rows: 0 }
    }

    /// Feed one row.
    pub fn push<T: Serialize>(&mut self, row: &T) -> serde_json::Result<()> {
        let value = serde_json::to_value(row)?;
        self.hasher.update(canonical_json(&value).as_bytes());
        self.hasher.update(b"\n");
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

/// Fingerprint a full table in one call.
pub fn fingerprint_rows<T: Serialize>(schema_version: &str, rows: &[T]) -> serde_json::Result<String> {
    let mut fp = Fingerprinter::new(schema_version);
    for row in rows {
        fp.push(row)?;
    }
    Ok(fp.finish())
}

/// Whether `hash` looks like a SHA-256 hex digest.
pub fn is_sha256_hex(hash: &str) -> bool {
    hash.len() == 64 && hash.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
