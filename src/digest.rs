//! Digest / fingerprint primitive (C3).
//!
//! A thin, stable wrapper around SHA-1 content hashing plus its base-64 serialization, used by
//! both the incremental cache (C10) and archive scratch-path partitioning (C5/C8).

use sha1::{Digest as _, Sha1};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    algorithm: &'static str,
    bytes: Vec<u8>,
}

impl Digest {
    pub const SHA1: &'static str = "sha1";

    pub fn sha1(content: impl AsRef<[u8]>) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(content.as_ref());
        Self { algorithm: Self::SHA1, bytes: hasher.finalize().to_vec() }
    }

    pub fn algorithm(&self) -> &'static str {
        self.algorithm
    }

    /// The stable, URL-safe, unpadded base-64 string form used both in cache files and in
    /// scratch-directory naming.
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&self.bytes)
    }

    pub fn from_base64(algorithm: &'static str, encoded: &str) -> Result<Self, String> {
        use base64::Engine;
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| format!("invalid base64 digest: {e}"))?;
        Ok(Self { algorithm, bytes })
    }

    /// `<algorithm>:<base64>`, the record form used in one line of the incremental cache file.
    pub fn to_record(&self) -> String {
        format!("{}:{}", self.algorithm, self.to_base64())
    }

    pub fn from_record(record: &str) -> Result<Self, String> {
        let (algorithm, encoded) =
            record.split_once(':').ok_or_else(|| format!("malformed digest record: {record}"))?;
        match algorithm {
            Self::SHA1 => Self::from_base64(Self::SHA1, encoded),
            other => Err(format!("unsupported digest algorithm: {other}")),
        }
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_record())
    }
}

/// Digests a file's content directly. Used by the incremental cache for source/descriptor/plugin
/// binary fingerprinting.
pub fn digest_file(path: &std::path::Path) -> crate::error::Result<Digest> {
    let content = std::fs::read(path).map_err(|e| crate::error::Error::io(e, path.to_path_buf()))?;
    Ok(Digest::sha1(content))
}

/// Digests an arbitrary string (e.g. a canonical archive URI), used to partition scratch
/// extraction directories per archive.
pub fn digest_str(value: &str) -> Digest {
    Digest::sha1(value.as_bytes())
}
