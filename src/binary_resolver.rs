//! Path binary resolver (C2).
//!
//! Locates a named executable by walking [`HostPlatform::path`] in declared order, applying
//! OS-specific matching rules. Never descends into subdirectories. Matching is done against our
//! own [`HostPlatform`] snapshot (not the live process `PATH`) so per-directory access errors can
//! be warned-and-skipped rather than aborting the whole search, which off-the-shelf `PATH`
//! lookup crates don't expose control over.

use crate::{error::Result, platform::HostPlatform, report};
use std::path::{Path, PathBuf};

/// Resolves executables against a [`HostPlatform`] snapshot rather than the live process `PATH`,
/// so the same platform probe used everywhere else in the crate also governs binary lookup.
pub struct PathBinaryResolver<'a> {
    platform: &'a HostPlatform,
}

impl<'a> PathBinaryResolver<'a> {
    pub fn new(platform: &'a HostPlatform) -> Self {
        Self { platform }
    }

    /// Returns the first matching executable on `PATH`, or `None` if none match. Per-directory
    /// access-denied errors are warned and skipped rather than aborting the whole search; any
    /// other I/O error is fatal.
    pub fn resolve(&self, name: &str) -> Result<Option<PathBuf>> {
        for dir in self.platform.path() {
            match self.scan_dir(dir, name) {
                Ok(Some(found)) => return Ok(Some(found)),
                Ok(None) => continue,
                Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
                    report::path_entry_dropped(
                        &dir.display().to_string(),
                        "permission denied while scanning for binary",
                    );
                    continue;
                }
                Err(err) => return Err(crate::error::Error::io(err, dir.clone())),
            }
        }
        Ok(None)
    }

    fn scan_dir(&self, dir: &Path, name: &str) -> std::io::Result<Option<PathBuf>> {
        if self.platform.is_windows() {
            self.scan_dir_windows(dir, name)
        } else {
            self.scan_dir_posix(dir, name)
        }
    }

    fn scan_dir_posix(&self, dir: &Path, name: &str) -> std::io::Result<Option<PathBuf>> {
        let candidate = dir.join(name);
        if !candidate.is_file() {
            return Ok(None);
        }
        if is_executable(&candidate) {
            Ok(Some(candidate))
        } else {
            Ok(None)
        }
    }

    fn scan_dir_windows(&self, dir: &Path, name: &str) -> std::io::Result<Option<PathBuf>> {
        let target_stem = name.to_ascii_lowercase();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some((stem, ext)) = split_ext(file_name) else {
                continue;
            };
            let ext_with_dot = format!(".{ext}").to_ascii_uppercase();
            if stem.eq_ignore_ascii_case(&target_stem)
                && self.platform.path_extensions().iter().any(|e| e == &ext_with_dot)
            {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }
}

fn split_ext(file_name: &str) -> Option<(&str, &str)> {
    let dot = file_name.rfind('.')?;
    if dot == 0 {
        return None;
    }
    Some((&file_name[..dot], &file_name[dot + 1..]))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).map(|meta| meta.permissions().mode() & 0o111 != 0).unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{HostEnvironment, HostPlatform, OsFamily};
    use std::collections::HashMap;

    struct FakeEnv {
        vars: HashMap<&'static str, String>,
        os_family: OsFamily,
    }

    impl HostEnvironment for FakeEnv {
        fn var(&self, key: &str) -> Option<String> {
            self.vars.get(key).cloned()
        }
        fn home_dir(&self) -> Option<PathBuf> {
            None
        }
        fn os_family(&self) -> OsFamily {
            self.os_family
        }
    }

    #[cfg(unix)]
    #[test]
    fn resolves_first_match_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        let bin_name = "my-tool";
        let bin_path = dir.path().join(bin_name);
        std::fs::write(&bin_path, "#!/bin/sh\necho hi\n").unwrap();
        let mut perms = std::fs::metadata(&bin_path).unwrap().permissions();
        use std::os::unix::fs::PermissionsExt;
        perms.set_mode(0o755);
        std::fs::set_permissions(&bin_path, perms).unwrap();

        let env = FakeEnv {
            vars: HashMap::from([("PATH", dir.path().display().to_string())]),
            os_family: OsFamily::Linux,
        };
        let platform = HostPlatform::probe(&env);
        let resolver = PathBinaryResolver::new(&platform);
        let resolved = resolver.resolve(bin_name).unwrap();
        assert_eq!(resolved, Some(bin_path));
    }

    #[test]
    fn returns_none_when_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let env = FakeEnv {
            vars: HashMap::from([("PATH", dir.path().display().to_string())]),
            os_family: OsFamily::Linux,
        };
        let platform = HostPlatform::probe(&env);
        let resolver = PathBinaryResolver::new(&platform);
        assert_eq!(resolver.resolve("nonexistent-binary-xyz").unwrap(), None);
    }
}
