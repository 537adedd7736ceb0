//! The data model (§3): the immutable request shape and the value types that flow between
//! components. Plain structured records rather than a builder that mutates toward completion,
//! per the "interface with many implementations" redesign note in §9 — construct a
//! [`GenerationRequest`] once, never mutate it afterward.

use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

/// One of the output languages `protoc` can emit directly (as opposed to through a
/// code-generator plugin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Cpp,
    CSharp,
    Java,
    Kotlin,
    Objc,
    Php,
    Python,
    Pyi,
    Ruby,
    Rust,
}

impl Language {
    /// The `protoc` flag stem, e.g. `java` for `--java_out`.
    pub fn flag_stem(&self) -> &'static str {
        match self {
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::Objc => "objc",
            Language::Php => "php",
            Language::Python => "python",
            Language::Pyi => "pyi",
            Language::Ruby => "ruby",
            Language::Rust => "rust",
        }
    }

    /// Whether `protoc` understands a `lite:` output-dir prefix for this language.
    pub fn supports_lite(&self) -> bool {
        matches!(self, Language::Cpp | Language::Java | Language::CSharp | Language::Python)
    }
}

/// A dependency scope, mirroring the Maven scopes a host build system partitions dependencies
/// into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyScope {
    Compile,
    Provided,
    System,
    Runtime,
    Test,
}

/// Whether dependency resolution should follow transitive edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyDepth {
    Direct,
    Transitive,
}

/// A Maven-style artifact coordinate: `groupId:artifactId:version[:classifier]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
}

impl Coordinate {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self { group_id: group_id.into(), artifact_id: artifact_id.into(), version: version.into(), classifier: None }
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        Ok(())
    }
}

/// How the `protoc` binary itself should be located.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocDistribution {
    /// Resolve via the artifact resolver (C6).
    Coordinate(Coordinate),
    /// Fetch via the URI fetcher (C7), with an optional expected digest for integrity checking.
    Uri { uri: String, expected_digest: Option<String> },
    /// Use a `protoc` already present at a fixed path on the host.
    SystemPath(PathBuf),
}

/// How a single code-generator plugin should be located, before resolution (C9).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginSource {
    /// A native binary plugin resolved via artifact coordinate.
    MavenBinary(Coordinate),
    /// A JVM-hosted plugin: a jar coordinate plus a generated bootstrap script that invokes
    /// [`crate::platform::HostPlatform::java_executable_path`].
    MavenJvm(Coordinate),
    /// A native binary plugin fetched from an arbitrary URI.
    UriBinary { uri: String, expected_digest: Option<String> },
    /// A native binary plugin already present on the host's `PATH` or at a fixed path.
    PathBinary(String),
}

/// An unresolved plugin descriptor, as supplied in a [`GenerationRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub id: String,
    pub source: PluginSource,
    pub options: Option<String>,
    pub output_directory: Option<PathBuf>,
    pub order: i32,
    pub register_as_compilation_root: bool,
    pub skip: bool,
}

/// A plugin after resolution (C9): `localPath` points at a runnable executable (or, for
/// `MavenJvm`, a generated bootstrap script).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProtocPlugin {
    pub id: String,
    pub local_path: PathBuf,
    pub options: Option<String>,
    pub output_directory: Option<PathBuf>,
    pub order: i32,
    pub register_as_compilation_root: bool,
    pub skip: bool,
}

impl ResolvedProtocPlugin {
    /// The stable sort key from §3: ascending by `order`, ties broken by `id` then `local_path`.
    fn sort_key(&self) -> (i32, &str, &Path) {
        (self.order, self.id.as_str(), self.local_path.as_path())
    }
}

/// Sorts plugins per the stable ordering rule in §3/§8 ("Sort stability").
pub fn sort_plugins(plugins: &mut [ResolvedProtocPlugin]) {
    plugins.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

/// Configuration for emitting a `FileDescriptorSet` alongside (or instead of) language outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDescriptorConfig {
    pub path: PathBuf,
    pub include_imports: bool,
    pub include_source_info: bool,
    pub retain_options: bool,
    /// Whether to register the produced descriptor with the host's attachment registrar.
    pub attach: bool,
}

/// The boolean switches from §3, grouped so [`GenerationRequest`] doesn't carry a dozen loose
/// `bool` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationFlags {
    pub lite: bool,
    pub fatal_warnings: bool,
    pub register_as_compilation_root: bool,
    pub embed_sources_in_output: bool,
    pub incremental_compilation_enabled: bool,
    pub clean_output_directories: bool,
    pub fail_on_missing_sources: bool,
    pub fail_on_missing_targets: bool,
    pub fail_on_invalid_dependencies: bool,
    pub ignore_project_dependencies: bool,
    pub offline: bool,
}

impl Default for GenerationFlags {
    fn default() -> Self {
        Self {
            lite: false,
            fatal_warnings: false,
            register_as_compilation_root: true,
            embed_sources_in_output: false,
            incremental_compilation_enabled: true,
            clean_output_directories: false,
            fail_on_missing_sources: true,
            fail_on_missing_targets: true,
            fail_on_invalid_dependencies: true,
            ignore_project_dependencies: false,
            offline: false,
        }
    }
}

/// The full, immutable generation request (§3). Once constructed, values never mutate; the
/// orchestrator only ever reads through it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub source_roots: Vec<PathBuf>,
    pub import_roots: Vec<PathBuf>,
    pub source_dependency_coordinates: Vec<Coordinate>,
    pub import_dependency_coordinates: Vec<Coordinate>,
    pub descriptor_source_paths: Vec<PathBuf>,
    pub descriptor_dependency_coordinates: Vec<Coordinate>,
    pub enabled_languages: BTreeSet<Language>,
    pub plugins: Vec<PluginDescriptor>,
    pub protoc_distribution: ProtocDistribution,
    pub enabled_scopes: BTreeSet<DependencyScope>,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub flags: GenerationFlags,
    pub output_descriptor: Option<OutputDescriptorConfig>,
    pub environment: BTreeMap<String, String>,
    pub extra_arguments: Vec<String>,
    pub output_directory: PathBuf,
    /// An extra directory `protoc` is allowed to see on its synthetic `PATH`, alongside the
    /// plugin-local paths — e.g. a host-sanctioned directory of trusted helper executables.
    pub sanctioned_executable_directory: Option<PathBuf>,
}

impl GenerationRequest {
    /// True when no source, dependency, or descriptor input is configured at all — the very
    /// first short-circuit check in the orchestrator (§4.6 step 1).
    pub fn has_no_configured_inputs(&self) -> bool {
        self.source_roots.is_empty()
            && self.source_dependency_coordinates.is_empty()
            && self.descriptor_source_paths.is_empty()
            && self.descriptor_dependency_coordinates.is_empty()
    }

    /// Incremental compilation is only eligible when requested *and* no descriptor output is
    /// configured (§4.4 step 1): the descriptor format doesn't support partial updates.
    pub fn incremental_eligible(&self) -> bool {
        self.flags.incremental_compilation_enabled && self.output_descriptor.is_none()
    }
}

/// `(sourceRoot, orderedSequence<Path>)`: every accepted file under one resolved root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceListing {
    pub source_root: PathBuf,
    pub files: Vec<PathBuf>,
}

/// `(descriptorFilePath, orderedSequence<String>)`: virtual proto names parsed out of one
/// `FileDescriptorSet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorListing {
    pub descriptor_file: PathBuf,
    pub proto_names: Vec<String>,
}

/// The four ordered listing sequences produced by the source resolver (C8).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectInputListing {
    pub compilable_sources: Vec<SourceListing>,
    pub dependency_sources: Vec<SourceListing>,
    pub compilable_descriptors: Vec<DescriptorListing>,
    pub dependency_descriptors: Vec<DescriptorListing>,
}

impl ProjectInputListing {
    pub fn has_compilable_input(&self) -> bool {
        !self.compilable_sources.is_empty() || !self.compilable_descriptors.is_empty()
    }
}

/// The subset of sources/descriptor names actually passed to `protoc` for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilesToCompile {
    pub sources: Vec<PathBuf>,
    pub descriptor_names: Vec<String>,
}

impl FilesToCompile {
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.descriptor_names.is_empty()
    }
}

/// The outcome of one `generate` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationResult {
    ProtocSucceeded,
    ProtocFailed,
    NothingToDo,
    NoSources,
    NoTargets,
}

impl GenerationResult {
    /// `ok = {ProtocSucceeded, NothingToDo}` per §3.
    pub fn is_ok(&self) -> bool {
        matches!(self, GenerationResult::ProtocSucceeded | GenerationResult::NothingToDo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_sort_orders_by_order_then_id_then_path() {
        let mut plugins = vec![
            ResolvedProtocPlugin {
                id: "zzz".into(),
                local_path: PathBuf::from("/a"),
                options: None,
                output_directory: None,
                order: 1,
                register_as_compilation_root: false,
                skip: false,
            },
            ResolvedProtocPlugin {
                id: "aaa".into(),
                local_path: PathBuf::from("/b"),
                options: None,
                output_directory: None,
                order: 1,
                register_as_compilation_root: false,
                skip: false,
            },
            ResolvedProtocPlugin {
                id: "mmm".into(),
                local_path: PathBuf::from("/c"),
                options: None,
                output_directory: None,
                order: 0,
                register_as_compilation_root: false,
                skip: false,
            },
        ];
        sort_plugins(&mut plugins);
        let ids: Vec<_> = plugins.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["mmm", "aaa", "zzz"]);
    }

    #[test]
    fn generation_result_ok_classification() {
        assert!(GenerationResult::ProtocSucceeded.is_ok());
        assert!(GenerationResult::NothingToDo.is_ok());
        assert!(!GenerationResult::ProtocFailed.is_ok());
        assert!(!GenerationResult::NoSources.is_ok());
        assert!(!GenerationResult::NoTargets.is_ok());
    }

    #[test]
    fn coordinate_display_includes_classifier_when_present() {
        let coord = Coordinate::new("io.grpc", "protoc-gen-grpc-java", "1.60.0").with_classifier("linux-x86_64");
        assert_eq!(coord.to_string(), "io.grpc:protoc-gen-grpc-java:1.60.0:linux-x86_64");
    }
}
