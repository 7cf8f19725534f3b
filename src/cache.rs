//! Content-addressed cache for LLM results.
//!
//! One file per entry under `<root>/<namespace>/<first-two-hex>/<rest>`.
//! Keys are SHA-256 digests over a canonical byte sequence enumerating every
//! input that can affect the payload: namespace, prompt version, model
//! identifier, and the canonicalized structured input. Entries are never
//! expired by time; a change to any key contributor simply derives a
//! different key.
//!
//! Writes go through a temp file and an atomic rename, so concurrent readers
//! either see a whole valid entry or none. Payloads are wrapped in a
//! checksummed envelope; an envelope that fails validation reads as a miss.

use crate::errors::{ChronicleError, Result};
use crate::log_debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Artifact kind a cache entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheNamespace {
    Commit,
    Daily,
    WeeklyNarrative,
    WeeklyChangelog,
}

impl CacheNamespace {
    pub const ALL: &'static [CacheNamespace] = &[
        Self::Commit,
        Self::Daily,
        Self::WeeklyNarrative,
        Self::WeeklyChangelog,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Daily => "daily",
            Self::WeeklyNarrative => "weekly-narrative",
            Self::WeeklyChangelog => "weekly-changelog",
        }
    }
}

impl fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derived content key (hex-encoded SHA-256)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive a key from every contributor that can affect the payload.
    pub fn derive(
        namespace: CacheNamespace,
        prompt_version: &str,
        model: &str,
        structured_input: &Value,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(namespace.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(prompt_version.as_bytes());
        hasher.update([0u8]);
        hasher.update(model.as_bytes());
        hasher.update([0u8]);
        hasher.update(canonical_json(structured_input).as_bytes());
        let digest = hasher.finalize();
        let mut hex = String::with_capacity(64);
        for byte in digest {
            let _ = fmt::Write::write_fmt(&mut hex, format_args!("{byte:02x}"));
        }
        Self(hex)
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

/// Canonical JSON encoding: mapping keys sorted recursively, output limited
/// to ASCII with non-ASCII characters escaped. Stable across runs and across
/// map insertion orders.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_canonical_string(s, out),
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
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical_string(key, out);
                out.push(':');
                if let Some(v) = map.get(*key) {
                    write_canonical(v, out);
                }
            }
            out.push('}');
        }
    }
}

fn write_canonical_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || !c.is_ascii() => {
                let mut buf = [0u16; 2];
                for unit in c.encode_utf16(&mut buf) {
                    let _ = fmt::Write::write_fmt(out, format_args!("\\u{unit:04x}"));
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Self-validating on-disk envelope
#[derive(Serialize, Deserialize)]
struct CacheEnvelope {
    /// SHA-256 hex of the payload bytes
    checksum: String,
    /// Write timestamp (RFC 3339); informational, never used for expiry
    #[serde(default)]
    written_at: String,
    payload: String,
}

fn payload_checksum(payload: &str) -> String {
    let digest = Sha256::digest(payload.as_bytes());
    digest.iter().fold(String::with_capacity(64), |mut acc, b| {
        let _ = fmt::Write::write_fmt(&mut acc, format_args!("{b:02x}"));
        acc
    })
}

/// Filesystem-backed content-addressed store
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, namespace: CacheNamespace, key: &CacheKey) -> PathBuf {
        let hex = key.as_hex();
        let (prefix, rest) = hex.split_at(2);
        self.root.join(namespace.as_str()).join(prefix).join(rest)
    }

    /// Read an entry. Missing, corrupt, or mid-write entries all read as
    /// `None`; only unexpected I/O failures surface as errors so the caller
    /// can log and degrade to a miss.
    pub fn get(&self, namespace: CacheNamespace, key: &CacheKey) -> Result<Option<String>> {
        let path = self.entry_path(namespace, key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ChronicleError::CacheIo {
                    operation: "read",
                    source: e,
                });
            }
        };

        let Ok(envelope) = serde_json::from_slice::<CacheEnvelope>(&bytes) else {
            log_debug!("Cache entry {} failed envelope parse, treating as miss", key.as_hex());
            return Ok(None);
        };
        if payload_checksum(&envelope.payload) != envelope.checksum {
            log_debug!("Cache entry {} failed checksum, treating as miss", key.as_hex());
            return Ok(None);
        }
        Ok(Some(envelope.payload))
    }

    /// Write an entry atomically (temp file + rename). Concurrent writers of
    /// the same key are equivalent because the key covers every input.
    pub fn put(&self, namespace: CacheNamespace, key: &CacheKey, payload: &str) -> Result<()> {
        let path = self.entry_path(namespace, key);
        let dir = path.parent().ok_or_else(|| ChronicleError::CacheIo {
            operation: "write",
            source: std::io::Error::other("cache entry path has no parent"),
        })?;
        let io = |operation: &'static str| {
            move |source: std::io::Error| ChronicleError::CacheIo { operation, source }
        };
        fs::create_dir_all(dir).map_err(io("create-dir"))?;

        let envelope = CacheEnvelope {
            checksum: payload_checksum(payload),
            written_at: chrono::Utc::now().to_rfc3339(),
            payload: payload.to_string(),
        };
        let bytes = serde_json::to_vec(&envelope).map_err(|e| ChronicleError::CacheIo {
            operation: "serialize",
            source: std::io::Error::other(e),
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io("temp-create"))?;
        tmp.write_all(&bytes).map_err(io("temp-write"))?;
        tmp.persist(&path).map_err(|e| ChronicleError::CacheIo {
            operation: "rename",
            source: e.error,
        })?;
        log_debug!("Cached {} bytes under {}/{}", payload.len(), namespace, key.as_hex());
        Ok(())
    }

    /// Remove one namespace, or the whole store. Returns the number of
    /// entries removed.
    pub fn clear(&self, namespace: Option<CacheNamespace>) -> Result<usize> {
        let namespaces: Vec<CacheNamespace> = match namespace {
            Some(ns) => vec![ns],
            None => CacheNamespace::ALL.to_vec(),
        };
        let mut removed = 0;
        for ns in namespaces {
            let dir = self.root.join(ns.as_str());
            if !dir.exists() {
                continue;
            }
            removed += count_entries(&dir);
            fs::remove_dir_all(&dir).map_err(|source| ChronicleError::CacheIo {
                operation: "clear",
                source,
            })?;
        }
        Ok(removed)
    }
}

fn count_entries(dir: &Path) -> usize {
    let mut count = 0;
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            count += count_entries(&path);
        } else {
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_key_invariant_under_map_reordering() {
        let a = json!({"subject": "feat", "body": null, "diff": "+x"});
        let b = json!({"diff": "+x", "subject": "feat", "body": null});
        let key_a = CacheKey::derive(CacheNamespace::Commit, "v1", "fast-model", &a);
        let key_b = CacheKey::derive(CacheNamespace::Commit, "v1", "fast-model", &b);
        assert_eq!(key_a, key_b);
    }

    #[test]
    fn test_key_sensitive_to_every_contributor() {
        let input = json!({"diff": "+x"});
        let base = CacheKey::derive(CacheNamespace::Commit, "v1", "m", &input);
        assert_ne!(
            base,
            CacheKey::derive(CacheNamespace::Daily, "v1", "m", &input)
        );
        assert_ne!(
            base,
            CacheKey::derive(CacheNamespace::Commit, "v2", "m", &input)
        );
        assert_ne!(
            base,
            CacheKey::derive(CacheNamespace::Commit, "v1", "m2", &input)
        );
        assert_ne!(
            base,
            CacheKey::derive(CacheNamespace::Commit, "v1", "m", &json!({"diff": "+y"}))
        );
    }

    #[test]
    fn test_canonical_json_round_trips() {
        let value = json!({
            "changes": [{"summary": "add x", "category": "Added"}],
            "trivial": false,
        });
        let reparsed = crate::decoder::decode(&canonical_json(&value)).expect("decode");
        assert_eq!(reparsed, value);
    }

    #[test]
    fn test_canonical_json_is_ascii_and_sorted() {
        let value = json!({"zeta": "Ünïcode", "alpha": [1, 2]});
        let canonical = canonical_json(&value);
        assert!(canonical.is_ascii());
        assert!(canonical.find("alpha").expect("alpha") < canonical.find("zeta").expect("zeta"));
        assert!(canonical.contains("\\u00dc"));
    }

    #[test]
    fn test_roundtrip_and_layout() {
        let dir = TempDir::new().expect("tempdir");
        let store = CacheStore::new(dir.path());
        let key = CacheKey::derive(CacheNamespace::Commit, "v1", "m", &json!({"k": 1}));

        assert!(store.get(CacheNamespace::Commit, &key).expect("get").is_none());
        store
            .put(CacheNamespace::Commit, &key, "{\"trivial\":false}")
            .expect("put");
        assert_eq!(
            store.get(CacheNamespace::Commit, &key).expect("get").as_deref(),
            Some("{\"trivial\":false}")
        );

        let (prefix, rest) = key.as_hex().split_at(2);
        assert!(dir.path().join("commit").join(prefix).join(rest).exists());
    }

    #[test]
    fn test_corrupt_entry_reads_as_miss() {
        let dir = TempDir::new().expect("tempdir");
        let store = CacheStore::new(dir.path());
        let key = CacheKey::derive(CacheNamespace::Daily, "v1", "m", &json!({"k": 1}));
        store.put(CacheNamespace::Daily, &key, "payload").expect("put");

        let (prefix, rest) = key.as_hex().split_at(2);
        let path = dir.path().join("daily").join(prefix).join(rest);
        fs::write(&path, b"{ not an envelope").expect("corrupt");
        assert!(store.get(CacheNamespace::Daily, &key).expect("get").is_none());

        // Valid envelope, wrong checksum
        fs::write(&path, br#"{"checksum":"0000","payload":"payload"}"#).expect("tamper");
        assert!(store.get(CacheNamespace::Daily, &key).expect("get").is_none());
    }

    #[test]
    fn test_clear_by_namespace() {
        let dir = TempDir::new().expect("tempdir");
        let store = CacheStore::new(dir.path());
        let key = CacheKey::derive(CacheNamespace::Commit, "v1", "m", &json!(1));
        store.put(CacheNamespace::Commit, &key, "a").expect("put");
        store.put(CacheNamespace::Daily, &key, "b").expect("put");

        assert_eq!(store.clear(Some(CacheNamespace::Commit)).expect("clear"), 1);
        assert!(store.get(CacheNamespace::Commit, &key).expect("get").is_none());
        assert!(store.get(CacheNamespace::Daily, &key).expect("get").is_some());

        assert_eq!(store.clear(None).expect("clear all"), 1);
    }
}
