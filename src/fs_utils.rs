//! Filesystem utilities (C5).
//!
//! Path normalization, extension extraction, archive-as-virtual-filesystem traversal, tree copy,
//! and the POSIX executable bit — the small set of filesystem primitives every other resolution
//! component builds on.

use crate::error::{Error, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Canonicalizes `path` to an absolute, normalized form. On Windows this strips the `\\?\` UNC
/// prefix `std::fs::canonicalize` would otherwise add, via `dunce`, so downstream string
/// comparisons and `protoc` argument files stay stable.
pub fn normalize(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    dunce::canonicalize(path).map_err(|e| Error::io(e, path.to_path_buf()))
}

/// Best-effort normalization for paths that may not exist yet (e.g. a configured output
/// directory before it's created). Falls back to lexical absolutization against the current
/// working directory when canonicalization fails.
pub fn normalize_lenient(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if let Ok(canon) = dunce::canonicalize(path) {
        return canon;
    }
    if path.is_absolute() {
        lexically_normalize(path)
    } else {
        let cwd = std::env::current_dir().unwrap_or_default();
        lexically_normalize(&cwd.join(path))
    }
}

fn lexically_normalize(path: &Path) -> PathBuf {
    use std::path::Component;
    let mut stack: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(stack.last(), Some(Component::Normal(_))) {
                    stack.pop();
                } else {
                    stack.push(component);
                }
            }
            other => stack.push(other),
        }
    }
    stack.iter().collect()
}

/// Lower-cased file extension without the leading dot, if any.
pub fn extension_lower(path: &Path) -> Option<String> {
    path.extension().map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

/// Whether `path`'s (case-sensitive) extension names an archive this crate can descend into.
pub fn is_archive(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("jar") | Some("zip"))
}

/// Whether `path`'s extension names a file this crate silently ignores during source resolution
/// (Maven POMs, arbitrary XML metadata shipped alongside proto sources in a dependency jar).
pub fn is_silently_ignored(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("pom") | Some("xml"))
}

/// Recursively copies `source` into `destination`, creating `destination` if needed. Used both
/// for tree-copy-to-scratch (archive extraction) and for `embed-sources-in-output`.
pub fn copy_tree(source: &Path, destination: &Path) -> Result<()> {
    fs::create_dir_all(destination).map_err(|e| Error::io(e, destination.to_path_buf()))?;
    let options = fs_extra::dir::CopyOptions::new().overwrite(true).content_only(true);
    fs_extra::dir::copy(source, destination, &options)
        .map_err(|e| Error::io(std::io::Error::new(std::io::ErrorKind::Other, e), source.to_path_buf()))?;
    Ok(())
}

/// Opens `archive_path` as a read-only virtual filesystem and returns the list of its regular
/// file entries (name plus contents), in archive order.
pub fn read_archive_entries(archive_path: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    let file = fs::File::open(archive_path).map_err(|e| Error::io(e, archive_path.to_path_buf()))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| {
        Error::io(std::io::Error::new(std::io::ErrorKind::InvalidData, e), archive_path.to_path_buf())
    })?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| {
            Error::io(
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
                archive_path.to_path_buf(),
            )
        })?;
        if !entry.is_file() {
            continue;
        }
        let name = entry.name().replace('\\', "/");
        let mut contents = Vec::with_capacity(entry.size() as usize);
        std::io::Read::read_to_end(&mut entry, &mut contents)
            .map_err(|e| Error::io(e, archive_path.to_path_buf()))?;
        entries.push((name, contents));
    }
    Ok(entries)
}

/// Sets the POSIX executable bit (`u+x,g+x,o+x`) on `path`. A no-op on non-Unix platforms, where
/// executability is determined by file extension instead (see [`crate::platform`]).
#[cfg(unix)]
pub fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path).map_err(|e| Error::io(e, path.to_path_buf()))?.permissions();
    let mode = perms.mode();
    perms.set_mode(mode | 0o111);
    fs::set_permissions(path, perms).map_err(|e| Error::io(e, path.to_path_buf()))
}

#[cfg(not(unix))]
pub fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_archive_extensions_case_sensitively() {
        assert!(is_archive(Path::new("lib.jar")));
        assert!(is_archive(Path::new("lib.zip")));
        assert!(!is_archive(Path::new("lib.JAR")));
        assert!(!is_archive(Path::new("readme.txt")));
    }

    #[test]
    fn detects_silently_ignored_metadata() {
        assert!(is_silently_ignored(Path::new("pom.xml")));
        assert!(is_silently_ignored(Path::new("manifest.pom")));
        assert!(!is_silently_ignored(Path::new("schema.proto")));
    }

    #[test]
    fn lexical_normalize_collapses_parent_dirs() {
        let normalized = lexically_normalize(Path::new("/a/b/../c/./d"));
        assert_eq!(normalized, PathBuf::from("/a/c/d"));
    }

    #[test]
    fn extension_lower_is_case_insensitive() {
        assert_eq!(extension_lower(Path::new("A.PROTO")).as_deref(), Some("proto"));
    }
}
