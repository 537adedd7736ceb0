//! Source and descriptor resolution (C8).
//!
//! Walks configured source roots and resolved dependency artifacts, applies the configured
//! [`FileFilter`], descends into archives as a virtual filesystem, and parses descriptor-set
//! inputs into their contained proto names. Directory walks follow symlinks.

use crate::{
    digest,
    error::{Error, Result},
    executor::Executor,
    filter::FileFilter,
    fs_utils,
    model::{DescriptorListing, SourceListing},
    report,
};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Resolves source and descriptor inputs into ordered listings, fanning archive extraction and
/// descriptor parsing out across an [`Executor`].
pub struct SourceResolver<'a> {
    filter: &'a dyn FileFilter,
    executor: &'a Executor,
    scratch_root: PathBuf,
}

impl<'a> SourceResolver<'a> {
    pub fn new(filter: &'a dyn FileFilter, executor: &'a Executor, scratch_root: impl Into<PathBuf>) -> Self {
        Self { filter, executor, scratch_root: scratch_root.into() }
    }

    /// Walks each of `roots` in order, collecting every filter-accepted file beneath it. Roots
    /// that don't exist on disk are reported and skipped rather than failing the whole call,
    /// matching the "missing source root" edge case in §4.2.
    pub fn resolve_sources(&self, roots: &[PathBuf]) -> Result<Vec<SourceListing>> {
        let mut listings = Vec::with_capacity(roots.len());
        for root in roots {
            if !root.exists() {
                report::source_ignored(root, "source root does not exist");
                continue;
            }
            let files = walk_accepted(root, self.filter);
            listings.push(SourceListing { source_root: root.clone(), files });
        }
        Ok(listings)
    }

    /// Resolves sources contributed by already-resolved dependency artifacts: a plain directory
    /// is walked directly, an archive (`.jar`/`.zip`) is extracted into a per-archive scratch
    /// directory (partitioned by the digest of its canonical path, so repeated runs reuse the
    /// same scratch location) and then walked. Each artifact is handled as an independent task on
    /// the executor.
    pub fn resolve_dependency_sources(&self, artifacts: &[PathBuf]) -> Result<Vec<SourceListing>> {
        let tasks: Vec<_> = artifacts
            .iter()
            .cloned()
            .map(|artifact| {
                let filter = self.filter;
                let scratch_root = self.scratch_root.clone();
                move |_: &crate::executor::CancellationToken| -> Result<SourceListing> {
                    resolve_one_dependency(&artifact, filter, &scratch_root)
                }
            })
            .collect();
        self.executor.await_all(tasks)
    }

    /// Parses each descriptor-set path (a serialized `FileDescriptorSet`) into the ordered list
    /// of proto names it declares.
    pub fn resolve_descriptors(&self, paths: &[PathBuf]) -> Result<Vec<DescriptorListing>> {
        let tasks: Vec<_> = paths
            .iter()
            .cloned()
            .map(|path| {
                move |_: &crate::executor::CancellationToken| -> Result<DescriptorListing> {
                    parse_descriptor_set(&path)
                }
            })
            .collect();
        self.executor.await_all(tasks)
    }
}

fn resolve_one_dependency(
    artifact: &Path,
    filter: &dyn FileFilter,
    scratch_root: &Path,
) -> Result<SourceListing> {
    if artifact.is_dir() {
        return Ok(SourceListing { source_root: artifact.to_path_buf(), files: walk_accepted(artifact, filter) });
    }

    if fs_utils::is_archive(artifact) {
        let canonical = fs_utils::normalize_lenient(artifact);
        let basename = artifact.file_stem().and_then(|s| s.to_str()).unwrap_or("archive");
        let digest = digest::digest_str(&canonical.to_string_lossy()).to_base64();
        let extraction_dir = scratch_root.join("archives").join(format!("{basename}-{digest}"));
        let entries = fs_utils::read_archive_entries(artifact)?;
        std::fs::create_dir_all(&extraction_dir).map_err(|e| Error::io(e, extraction_dir.clone()))?;

        let mut accepted = Vec::new();
        for (name, contents) in entries {
            let relative = PathBuf::from(&name);
            if fs_utils::is_silently_ignored(&relative) {
                continue;
            }
            if !filter.is_match(&relative) {
                continue;
            }
            let out_path = extraction_dir.join(&relative);
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| Error::io(e, parent.to_path_buf()))?;
            }
            std::fs::write(&out_path, &contents).map_err(|e| Error::io(e, out_path.clone()))?;
            accepted.push(out_path);
        }
        report::archive_extracted(artifact, &extraction_dir, accepted.len());
        return Ok(SourceListing { source_root: extraction_dir, files: accepted });
    }

    Err(Error::resolution(artifact.display().to_string(), "artifact is neither a directory nor a known archive"))
}

fn walk_accepted(root: &Path, filter: &dyn FileFilter) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                report::path_entry_dropped(&root.display().to_string(), &err.to_string());
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.path().to_path_buf())
        .filter(|path| filter.is_match(path))
        .collect();
    files.sort();
    files
}

fn parse_descriptor_set(path: &Path) -> Result<DescriptorListing> {
    let bytes = std::fs::read(path).map_err(|e| Error::io(e, path.to_path_buf()))?;
    let descriptor_set = <prost_types::FileDescriptorSet as prost::Message>::decode(bytes.as_slice())
        .map_err(|e| Error::DescriptorParse { path: path.to_path_buf(), reason: e.to_string() })?;
    let proto_names = descriptor_set.file.into_iter().filter_map(|f| f.name).collect();
    Ok(DescriptorListing { descriptor_file: path.to_path_buf(), proto_names })
}

/// Removes files already present under an earlier listing (by canonical path), preserving
/// overall listing and per-listing file order. Sources always take priority over dependencies of
/// the same file, since callers pass the compilable listings before the dependency listings.
pub fn dedup_preserving_first_occurrence(listings: Vec<SourceListing>) -> Vec<SourceListing> {
    let mut seen = std::collections::HashSet::new();
    listings
        .into_iter()
        .map(|listing| {
            let files = dedup_first_occurrence(listing.files, &mut seen);
            SourceListing { files, ..listing }
        })
        .collect()
}

/// Removes paths already seen earlier in `paths` (by canonical path), keeping the first
/// occurrence of each and preserving order — the same encounter-order dedup rule as
/// [`dedup_preserving_first_occurrence`], applied to a flat list rather than a list of listings
/// (e.g. `protoc` import roots, which have no per-root file set to thread through).
pub fn dedup_paths_preserving_first_occurrence(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = std::collections::HashSet::new();
    dedup_first_occurrence(paths, &mut seen)
}

fn dedup_first_occurrence(
    paths: Vec<PathBuf>,
    seen: &mut std::collections::HashSet<PathBuf>,
) -> Vec<PathBuf> {
    paths.into_iter().filter(|path| seen.insert(fs_utils::normalize_lenient(path))).collect()
}
