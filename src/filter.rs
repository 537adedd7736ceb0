//! Source inclusion filtering (C8 helper).
//!
//! A single `is_match` predicate, blanket-implemented for any `Fn(&Path) -> bool`, so callers can
//! pass a closure or a full [`SourceGlobFilter`] wherever a filter is expected.

use std::path::Path;

/// A predicate that determines whether a file should be treated as a source to compile.
pub trait FileFilter {
    fn is_match(&self, file: &Path) -> bool;
}

impl<F: Fn(&Path) -> bool> FileFilter for F {
    fn is_match(&self, file: &Path) -> bool {
        (self)(file)
    }
}

/// The default and user-overridable source selection rule: match by extension, then narrow by
/// include globs, then drop anything matching an exclude glob.
///
/// Extension matching happens first because it's cheap and rejects the overwhelming majority of
/// files in a typical dependency archive (`.class`, `.txt`, `.md`, ...) before any glob is
/// evaluated.
pub struct SourceGlobFilter {
    extensions: Vec<String>,
    include: Vec<glob::Pattern>,
    exclude: Vec<glob::Pattern>,
}

impl Default for SourceGlobFilter {
    fn default() -> Self {
        Self { extensions: vec!["proto".to_string()], include: Vec::new(), exclude: Vec::new() }
    }
}

impl SourceGlobFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the default `{.proto}` extension set.
    pub fn with_extensions(mut self, extensions: impl IntoIterator<Item = String>) -> Self {
        self.extensions = extensions.into_iter().collect();
        self
    }

    /// Adds include glob patterns. When any include pattern is configured, a file must match at
    /// least one of them in addition to the extension check.
    pub fn with_include_patterns(mut self, patterns: &[String]) -> Result<Self, String> {
        for pattern in patterns {
            self.include.push(compile_pattern(pattern)?);
        }
        Ok(self)
    }

    /// Adds exclude glob patterns. A file matching any exclude pattern is always rejected,
    /// regardless of include matches.
    pub fn with_exclude_patterns(mut self, patterns: &[String]) -> Result<Self, String> {
        for pattern in patterns {
            self.exclude.push(compile_pattern(pattern)?);
        }
        Ok(self)
    }

    fn matches_extension(&self, file: &Path) -> bool {
        let Some(ext) = crate::fs_utils::extension_lower(file) else {
            return false;
        };
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
    }
}

impl FileFilter for SourceGlobFilter {
    fn is_match(&self, file: &Path) -> bool {
        if !self.matches_extension(file) {
            return false;
        }
        if self.exclude.iter().any(|p| p.matches_path(file)) {
            return false;
        }
        if self.include.is_empty() {
            return true;
        }
        self.include.iter().any(|p| p.matches_path(file))
    }
}

fn compile_pattern(pattern: &str) -> Result<glob::Pattern, String> {
    glob::Pattern::new(pattern).map_err(|e| format!("invalid glob pattern {pattern:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn default_filter_matches_only_proto_extension() {
        let filter = SourceGlobFilter::new();
        assert!(filter.is_match(&PathBuf::from("a/b/schema.proto")));
        assert!(!filter.is_match(&PathBuf::from("a/b/readme.txt")));
    }

    #[test]
    fn exclude_pattern_wins_over_include() {
        let filter = SourceGlobFilter::new()
            .with_include_patterns(&["**/*.proto".to_string()])
            .unwrap()
            .with_exclude_patterns(&["**/internal/**".to_string()])
            .unwrap();
        assert!(filter.is_match(&PathBuf::from("pkg/schema.proto")));
        assert!(!filter.is_match(&PathBuf::from("pkg/internal/schema.proto")));
    }

    #[test]
    fn closures_implement_file_filter() {
        let filter = |file: &Path| file.ends_with("keep.proto");
        assert!(filter.is_match(&PathBuf::from("keep.proto")));
        assert!(!FileFilter::is_match(&filter, &PathBuf::from("skip.proto")));
    }
}
