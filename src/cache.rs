//! Incremental fingerprint cache (C10).
//!
//! A line-oriented text file, one fingerprinted key per line: `<key>\t<algorithm>:<base64>`. Keys
//! are usually absolute source/descriptor paths, but the protoc binary and each resolved plugin
//! binary also get a synthetic key (see [`protoc_key`], [`plugin_key`]) so a binary upgrade is
//! just another fingerprint change rather than a special case threaded through every call site.
//!
//! Structured the same way any side-car build cache is: `read`/`write`/`entries` around a file that
//! sits next to the output directory, but using the plain text record format this crate's digests
//! already serialize to ([`crate::digest::Digest::to_record`]) instead of a JSON document.

use crate::{
    digest::Digest,
    error::{Error, Result},
    report,
};
use std::{
    collections::BTreeMap,
    io::Write as _,
    path::{Path, PathBuf},
};

/// The synthetic fingerprint key for the resolved `protoc` binary itself.
pub fn protoc_key() -> String {
    "protoc-binary".to_string()
}

/// The synthetic fingerprint key for one resolved plugin binary.
pub fn plugin_key(id: &str) -> String {
    format!("plugin-binary:{id}")
}

/// The full set of fingerprints from one run: every source/descriptor path plus the binary keys.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Fingerprints(pub BTreeMap<String, Digest>);

impl Fingerprints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, digest: Digest) {
        self.0.insert(key.into(), digest);
    }
}

/// The on-disk incremental cache: the fingerprints observed on the previous successful run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IncrementalCache {
    entries: BTreeMap<String, Digest>,
}

impl IncrementalCache {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Reads the cache file at `path`. A missing file is treated as an empty cache (first, cold
    /// build), not an error. Malformed lines are logged and skipped rather than failing the read
    /// outright — a half-written or hand-edited cache file shouldn't permanently wedge
    /// incremental builds into failure; worst case is a conservative full rebuild.
    pub fn read(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::empty()),
            Err(e) => return Err(Error::io(e, path.to_path_buf())),
        };

        let mut entries = BTreeMap::new();
        for (line_no, line) in contents.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            match parse_line(line) {
                Some((key, digest)) => {
                    entries.insert(key, digest);
                }
                None => report::cache_corrupt(path, &format!("malformed line {}", line_no + 1)),
            }
        }
        Ok(Self { entries })
    }

    /// Writes the cache atomically: content goes to `<path>.next`, then renamed over `path`. This
    /// avoids ever leaving a torn cache file behind if the process is killed mid-write.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(e, parent.to_path_buf()))?;
        }
        let next_path = path.with_extension("next");
        {
            let mut file =
                std::fs::File::create(&next_path).map_err(|e| Error::io(e, next_path.clone()))?;
            for (key, digest) in &self.entries {
                writeln!(file, "{key}\t{}", digest.to_record()).map_err(|e| Error::io(e, next_path.clone()))?;
            }
        }
        std::fs::rename(&next_path, path).map_err(|e| Error::io(e, path.to_path_buf()))?;
        report::cache_rotated(path, &next_path);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Digest> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Fingerprints> for IncrementalCache {
    fn from(fingerprints: Fingerprints) -> Self {
        Self { entries: fingerprints.0 }
    }
}

fn parse_line(line: &str) -> Option<(String, Digest)> {
    let (key, record) = line.split_once('\t')?;
    let digest = Digest::from_record(record).ok()?;
    Some((key.to_string(), digest))
}

/// The set of per-key changes between a previous cache and the current fingerprints.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Delta {
    pub added: Vec<String>,
    pub changed: Vec<String>,
    pub removed: Vec<String>,
    pub unchanged: Vec<String>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

/// Computes the delta between `previous` and `current`, ignoring `protoc_key`/`plugin_key`
/// entries — those are consulted separately by [`requires_full_rebuild`], since a binary change
/// has crate-wide consequences rather than being "one more changed source".
pub fn compute_delta(previous: &IncrementalCache, current: &Fingerprints) -> Delta {
    let mut delta = Delta::default();
    for (key, digest) in &current.0 {
        if is_binary_key(key) {
            continue;
        }
        match previous.get(key) {
            None => delta.added.push(key.clone()),
            Some(prev_digest) if prev_digest != digest => delta.changed.push(key.clone()),
            Some(_) => delta.unchanged.push(key.clone()),
        }
    }
    for key in previous.entries.keys() {
        if is_binary_key(key) {
            continue;
        }
        if !current.0.contains_key(key) {
            delta.removed.push(key.clone());
        }
    }
    delta.added.sort();
    delta.changed.sort();
    delta.removed.sort();
    delta.unchanged.sort();
    delta
}

fn is_binary_key(key: &str) -> bool {
    key == protoc_key() || key.starts_with("plugin-binary:")
}

/// Whether the `protoc` binary or any resolved plugin binary changed since the previous run. Any
/// binary change forces a full rebuild: a cached "unchanged" source was only unchanged relative
/// to the binary that last compiled it, and that guarantee no longer holds.
pub fn requires_full_rebuild(previous: &IncrementalCache, current: &Fingerprints) -> bool {
    for (key, digest) in &current.0 {
        if !is_binary_key(key) {
            continue;
        }
        match previous.get(key) {
            None => return true,
            Some(prev) if prev != digest => return true,
            Some(_) => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(pairs: &[(&str, &[u8])]) -> Fingerprints {
        let mut fingerprints = Fingerprints::new();
        for (key, content) in pairs {
            fingerprints.insert(*key, Digest::sha1(content));
        }
        fingerprints
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.txt");
        let cache: IncrementalCache = fp(&[("/a.proto", b"one"), ("/b.proto", b"two")]).into();
        cache.write(&path).unwrap();
        let reread = IncrementalCache::read(&path).unwrap();
        assert_eq!(reread.len(), 2);
        assert_eq!(reread.get("/a.proto"), cache.get("/a.proto"));
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IncrementalCache::read(&dir.path().join("missing.txt")).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn delta_classifies_added_changed_removed_unchanged() {
        let previous: IncrementalCache = fp(&[("/a.proto", b"one"), ("/removed.proto", b"x")]).into();
        let current = fp(&[("/a.proto", b"one"), ("/new.proto", b"z")]);
        let delta = compute_delta(&previous, &current);
        assert_eq!(delta.unchanged, vec!["/a.proto".to_string()]);
        assert_eq!(delta.added, vec!["/new.proto".to_string()]);
        assert_eq!(delta.removed, vec!["/removed.proto".to_string()]);
        assert!(delta.changed.is_empty());
    }

    #[test]
    fn binary_change_forces_full_rebuild() {
        let mut previous_fp = Fingerprints::new();
        previous_fp.insert(protoc_key(), Digest::sha1(b"protoc-v1"));
        let previous: IncrementalCache = previous_fp.into();

        let mut current = Fingerprints::new();
        current.insert(protoc_key(), Digest::sha1(b"protoc-v2"));
        assert!(requires_full_rebuild(&previous, &current));

        let mut unchanged_current = Fingerprints::new();
        unchanged_current.insert(protoc_key(), Digest::sha1(b"protoc-v1"));
        assert!(!requires_full_rebuild(&previous, &unchanged_current));
    }

    #[test]
    fn binary_keys_excluded_from_source_delta() {
        let mut previous_fp = Fingerprints::new();
        previous_fp.insert(protoc_key(), Digest::sha1(b"protoc-v1"));
        let previous: IncrementalCache = previous_fp.into();

        let mut current = Fingerprints::new();
        current.insert(protoc_key(), Digest::sha1(b"protoc-v2"));
        let delta = compute_delta(&previous, &current);
        assert!(delta.is_empty());
    }
}
