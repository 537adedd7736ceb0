//! Centralized, user-facing log call sites.
//!
//! Rather than scattering `info!`/`warn!` calls with ad hoc wording across the orchestrator and
//! its collaborators, the handful of events a host build actually wants to surface are named
//! here once.

use display_path::DisplayPath;
use std::path::Path;

/// Helper so log statements can `{}`-format a [`Path`] without pulling in `path.display()` at
/// every call site.
mod display_path {
    use std::{fmt, path::Path};

    pub struct DisplayPath<'a>(pub &'a Path);

    impl fmt::Display for DisplayPath<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0.display())
        }
    }
}

fn p(path: &Path) -> DisplayPath<'_> {
    DisplayPath(path)
}

pub fn protoc_invocation_start(protoc: &Path, argfile: &Path) {
    debug!(protoc = %p(protoc), argfile = %p(argfile), "invoking protoc");
}

pub fn protoc_invocation_success(protoc: &Path) {
    info!(protoc = %p(protoc), "protoc exited successfully");
}

pub fn protoc_invocation_failure(protoc: &Path, status: Option<i32>) {
    error!(protoc = %p(protoc), status = ?status, "protoc exited with failure");
}

pub fn cache_rotated(previous: &Path, next: &Path) {
    debug!(previous = %p(previous), next = %p(next), "rotated incremental cache");
}

pub fn cache_corrupt(path: &Path, reason: &str) {
    warn!(path = %p(path), reason, "incremental cache is corrupt, falling back to full rebuild");
}

pub fn path_entry_dropped(entry: &str, reason: &str) {
    warn!(entry, reason, "dropped invalid PATH entry");
}

pub fn source_ignored(path: &Path, reason: &str) {
    debug!(path = %p(path), reason, "ignoring source input");
}

pub fn archive_extracted(archive: &Path, scratch_root: &Path, file_count: usize) {
    debug!(archive = %p(archive), scratch_root = %p(scratch_root), file_count, "extracted archive");
}

pub fn plugin_resolved(id: &str, local_path: &Path) {
    debug!(id, local_path = %p(local_path), "resolved code-generator plugin");
}
