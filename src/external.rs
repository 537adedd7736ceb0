//! External collaborator interfaces (C6, C7).
//!
//! The crate never resolves a Maven coordinate or fetches a URI itself — a host build system
//! supplies concrete implementations of these two traits, and everything downstream (plugin
//! resolution, `protoc` distribution resolution, dependency sourcing) is written against the
//! trait, never a concrete resolver. Test doubles live in [`crate::test_support`].

use crate::{
    digest::Digest,
    error::Result,
    model::{Coordinate, DependencyDepth, DependencyScope},
};
use std::path::PathBuf;

/// Resolves Maven-style artifact coordinates to local files (C6).
pub trait ArtifactResolver: Send + Sync {
    /// Resolves a single coordinate to an absolute local path.
    fn resolve_artifact(&self, coordinate: &Coordinate) -> Result<PathBuf>;

    /// Resolves a set of coordinates and, depending on `depth`, their transitive dependencies,
    /// filtered to the given scopes. `include_project_dependencies` additionally pulls in the
    /// host project's own declared dependencies (not just `coordinates`); `fail_on_invalid`
    /// controls whether an unresolvable coordinate aborts the whole call or is silently dropped.
    ///
    /// The returned sequence is in resolver-determined but stable order; callers that need a
    /// particular order (e.g. classpath-style precedence) must not rely on input order being
    /// preserved.
    fn resolve_dependencies(
        &self,
        coordinates: &[Coordinate],
        depth: DependencyDepth,
        scopes: &[DependencyScope],
        include_project_dependencies: bool,
        fail_on_invalid: bool,
    ) -> Result<Vec<PathBuf>>;
}

/// Fetches an arbitrary URI resource to a local cache (C7).
pub trait UriFetcher: Send + Sync {
    /// Fetches `uri` into local storage, returning the path it was stored at. `extension_hint`
    /// governs the stored file's extension when the URI itself carries none useful (e.g. a
    /// redirect-heavy download endpoint). When `expected_digest` is given and the fetched
    /// content's digest does not match, implementations should return `Ok(None)` rather than an
    /// error — a digest mismatch is a resolution failure, not a transport failure, and callers
    /// turn it into [`crate::error::Error::resolution`] with the coordinate/URI context attached.
    fn fetch(&self, uri: &str, extension_hint: &str, expected_digest: Option<&Digest>) -> Result<Option<PathBuf>>;
}

/// Registers a directory as a source root with the host build system's compilation-root
/// mechanism (e.g. `add-source` in a Maven plugin). Invoked when
/// `register_as_compilation_root` is set on the request or on an individual plugin.
pub trait SourceRootRegistrar: Send + Sync {
    fn register_compilation_root(&self, directory: &std::path::Path) -> Result<()>;
}

/// Attaches a generated `FileDescriptorSet` to the host build as a build artifact, when
/// [`crate::model::OutputDescriptorConfig::attach`] is set.
pub trait DescriptorAttachmentRegistrar: Send + Sync {
    fn attach_descriptor(&self, path: &std::path::Path) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct StaticResolver {
        artifacts: HashMap<String, PathBuf>,
    }

    impl ArtifactResolver for StaticResolver {
        fn resolve_artifact(&self, coordinate: &Coordinate) -> Result<PathBuf> {
            self.artifacts
                .get(&coordinate.to_string())
                .cloned()
                .ok_or_else(|| crate::error::Error::resolution(coordinate.to_string(), "not found"))
        }

        fn resolve_dependencies(
            &self,
            coordinates: &[Coordinate],
            _depth: DependencyDepth,
            _scopes: &[DependencyScope],
            _include_project_dependencies: bool,
            _fail_on_invalid: bool,
        ) -> Result<Vec<PathBuf>> {
            coordinates.iter().map(|c| self.resolve_artifact(c)).collect()
        }
    }

    #[test]
    fn resolver_trait_object_is_usable_through_a_box() {
        let resolver: Box<dyn ArtifactResolver> = Box::new(StaticResolver {
            artifacts: HashMap::from([(
                "com.example:widget:1.0.0".to_string(),
                PathBuf::from("/cache/widget-1.0.0.jar"),
            )]),
        });
        let coord = Coordinate::new("com.example", "widget", "1.0.0");
        assert_eq!(resolver.resolve_artifact(&coord).unwrap(), PathBuf::from("/cache/widget-1.0.0.jar"));
        assert!(resolver.resolve_artifact(&Coordinate::new("com.example", "missing", "1.0.0")).is_err());
    }
}
