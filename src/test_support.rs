//! In-memory test doubles for the external collaborator traits (C16).
//!
//! Gated behind the `project-util` feature (same as this crate's own tests), giving callers —
//! inside this crate's tests and, downstream, crates exercising this one — a way to exercise the
//! resolver and orchestrator without a real Maven repository or network.

use crate::{
    digest::Digest,
    error::{Error, Result},
    external::{ArtifactResolver, UriFetcher},
    model::{Coordinate, DependencyDepth, DependencyScope},
};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Mutex,
};

/// An [`ArtifactResolver`] backed by a fixed coordinate-to-path map, with optional transitive
/// edges for dependency-resolution tests.
#[derive(Default)]
pub struct InMemoryArtifactResolver {
    artifacts: HashMap<String, PathBuf>,
    transitive_edges: HashMap<String, Vec<Coordinate>>,
}

impl InMemoryArtifactResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_artifact(mut self, coordinate: Coordinate, path: impl Into<PathBuf>) -> Self {
        self.artifacts.insert(coordinate.to_string(), path.into());
        self
    }

    /// Declares that `coordinate` transitively depends on `dependencies` (used only when a test
    /// resolves with [`DependencyDepth::Transitive`]).
    pub fn with_transitive_edges(mut self, coordinate: Coordinate, dependencies: Vec<Coordinate>) -> Self {
        self.transitive_edges.insert(coordinate.to_string(), dependencies);
        self
    }
}

impl ArtifactResolver for InMemoryArtifactResolver {
    fn resolve_artifact(&self, coordinate: &Coordinate) -> Result<PathBuf> {
        self.artifacts
            .get(&coordinate.to_string())
            .cloned()
            .ok_or_else(|| Error::resolution(coordinate.to_string(), "no artifact registered in test double"))
    }

    fn resolve_dependencies(
        &self,
        coordinates: &[Coordinate],
        depth: DependencyDepth,
        _scopes: &[DependencyScope],
        _include_project_dependencies: bool,
        fail_on_invalid: bool,
    ) -> Result<Vec<PathBuf>> {
        let mut seen = std::collections::HashSet::new();
        let mut queue: Vec<Coordinate> = coordinates.to_vec();
        let mut resolved = Vec::new();

        while let Some(coordinate) = queue.pop() {
            if !seen.insert(coordinate.to_string()) {
                continue;
            }
            match self.resolve_artifact(&coordinate) {
                Ok(path) => resolved.push(path),
                Err(err) if fail_on_invalid => return Err(err),
                Err(_) => continue,
            }
            if matches!(depth, DependencyDepth::Transitive) {
                if let Some(deps) = self.transitive_edges.get(&coordinate.to_string()) {
                    queue.extend(deps.iter().cloned());
                }
            }
        }
        resolved.sort();
        Ok(resolved)
    }
}

/// A [`UriFetcher`] backed by a fixed URI-to-bytes map, materializing fetched content under a
/// scratch directory so callers get real, readable paths back.
pub struct InMemoryUriFetcher {
    content: HashMap<String, Vec<u8>>,
    scratch_root: PathBuf,
    fetch_count: Mutex<usize>,
}

impl InMemoryUriFetcher {
    pub fn new(scratch_root: impl Into<PathBuf>) -> Self {
        Self { content: HashMap::new(), scratch_root: scratch_root.into(), fetch_count: Mutex::new(0) }
    }

    pub fn with_content(mut self, uri: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.content.insert(uri.into(), bytes.into());
        self
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetch_count.lock().unwrap()
    }
}

impl UriFetcher for InMemoryUriFetcher {
    fn fetch(&self, uri: &str, extension_hint: &str, expected_digest: Option<&Digest>) -> Result<Option<PathBuf>> {
        *self.fetch_count.lock().unwrap() += 1;
        let Some(bytes) = self.content.get(uri) else {
            return Ok(None);
        };
        if let Some(expected) = expected_digest {
            if &Digest::sha1(bytes) != expected {
                return Ok(None);
            }
        }
        std::fs::create_dir_all(&self.scratch_root).map_err(|e| Error::io(e, self.scratch_root.clone()))?;
        let file_name = format!("{}.{extension_hint}", Digest::sha1(uri.as_bytes()).to_base64());
        let path = self.scratch_root.join(file_name);
        std::fs::write(&path, bytes).map_err(|e| Error::io(e, path.clone()))?;
        Ok(Some(path))
    }
}

/// Writes a minimal `.proto` file under `root`, creating parent directories as needed. Used by
/// integration tests to build a small source tree without shipping fixture files.
pub fn write_proto(root: &Path, relative_path: &str, contents: &str) -> PathBuf {
    let path = root.join(relative_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_resolver_resolves_registered_artifact() {
        let coordinate = Coordinate::new("com.example", "widget", "1.0.0");
        let resolver =
            InMemoryArtifactResolver::new().with_artifact(coordinate.clone(), "/cache/widget.jar");
        assert_eq!(resolver.resolve_artifact(&coordinate).unwrap(), PathBuf::from("/cache/widget.jar"));
    }

    #[test]
    fn in_memory_resolver_follows_transitive_edges() {
        let root = Coordinate::new("com.example", "root", "1.0.0");
        let dep = Coordinate::new("com.example", "dep", "1.0.0");
        let resolver = InMemoryArtifactResolver::new()
            .with_artifact(root.clone(), "/cache/root.jar")
            .with_artifact(dep.clone(), "/cache/dep.jar")
            .with_transitive_edges(root.clone(), vec![dep.clone()]);

        let direct =
            resolver.resolve_dependencies(&[root.clone()], DependencyDepth::Direct, &[], false, true).unwrap();
        assert_eq!(direct, vec![PathBuf::from("/cache/root.jar")]);

        let transitive = resolver
            .resolve_dependencies(&[root], DependencyDepth::Transitive, &[], false, true)
            .unwrap();
        assert_eq!(transitive.len(), 2);
    }

    #[test]
    fn in_memory_fetcher_rejects_digest_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = InMemoryUriFetcher::new(dir.path()).with_content("https://example/plugin", b"hello".to_vec());
        let wrong_digest = Digest::sha1(b"not hello");
        assert_eq!(fetcher.fetch("https://example/plugin", "bin", Some(&wrong_digest)).unwrap(), None);
        assert!(fetcher.fetch("https://example/plugin", "bin", None).unwrap().is_some());
        assert_eq!(fetcher.fetch_count(), 2);
    }
}
