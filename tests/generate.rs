//! End-to-end scenarios for [`protoc_compilers::orchestrator::Orchestrator::generate`], run
//! against a stand-in `protoc` executable (a shell script that just logs an invocation) so the
//! tests don't depend on a real `protoc` binary being installed.

use protoc_compilers::{
    config::RuntimeConfig,
    executor::Executor,
    filter::SourceGlobFilter,
    model::{GenerationFlags, GenerationRequest, Language, ProtocDistribution},
    orchestrator::Orchestrator,
    platform::{HostPlatform, ProcessEnvironment},
    test_support::{write_proto, InMemoryArtifactResolver, InMemoryUriFetcher},
    GenerationResult,
};
use std::{collections::BTreeSet, path::Path};
use tempfile::tempdir;

#[cfg(unix)]
fn write_fake_protoc(dir: &Path, run_log: &Path) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("protoc");
    let script = format!("#!/bin/sh\necho ran >> \"{}\"\nexit 0\n", run_log.display());
    std::fs::write(&path, script).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn base_request(source_root: std::path::PathBuf, output_directory: std::path::PathBuf) -> GenerationRequest {
    GenerationRequest {
        source_roots: vec![source_root],
        import_roots: vec![],
        source_dependency_coordinates: vec![],
        import_dependency_coordinates: vec![],
        descriptor_source_paths: vec![],
        descriptor_dependency_coordinates: vec![],
        enabled_languages: BTreeSet::from([Language::Java]),
        plugins: vec![],
        protoc_distribution: ProtocDistribution::SystemPath(std::path::PathBuf::new()),
        enabled_scopes: BTreeSet::new(),
        include_patterns: vec![],
        exclude_patterns: vec![],
        flags: GenerationFlags::default(),
        output_descriptor: None,
        environment: Default::default(),
        extra_arguments: vec![],
        output_directory,
        sanctioned_executable_directory: None,
    }
}

#[cfg(unix)]
#[test]
fn cold_build_invokes_protoc_and_writes_incremental_cache() {
    let workspace = tempdir().unwrap();
    let run_log = workspace.path().join("protoc.log");
    let protoc = write_fake_protoc(workspace.path(), &run_log);

    let source_root = workspace.path().join("proto");
    write_proto(&source_root, "pkg/schema.proto", "syntax = \"proto3\";\n");

    let env = ProcessEnvironment;
    let platform = HostPlatform::probe(&env);
    let config = RuntimeConfig::from_environment(&env);
    let executor = Executor::new(config.executor_threads);
    let artifact_resolver = InMemoryArtifactResolver::new();
    let uri_fetcher = InMemoryUriFetcher::new(workspace.path().join("fetch-cache"));
    let filter = SourceGlobFilter::new();

    let orchestrator = Orchestrator {
        artifact_resolver: &artifact_resolver,
        uri_fetcher: &uri_fetcher,
        platform: &platform,
        executor: &executor,
        source_filter: &filter,
        source_root_registrar: None,
        descriptor_attachment_registrar: None,
        cache_path: workspace.path().join("cache.txt"),
        scratch_root: workspace.path().join("scratch"),
        argfile_path: workspace.path().join("argfile"),
        config,
    };

    let mut request = base_request(source_root, workspace.path().join("out"));
    request.protoc_distribution = ProtocDistribution::SystemPath(protoc);

    let result = orchestrator.generate(&request).unwrap();
    assert_eq!(result, GenerationResult::ProtocSucceeded);
    assert_eq!(std::fs::read_to_string(&run_log).unwrap().lines().count(), 1);
    assert!(workspace.path().join("cache.txt").exists());
}

#[cfg(unix)]
#[test]
fn unchanged_sources_skip_the_second_protoc_invocation() {
    let workspace = tempdir().unwrap();
    let run_log = workspace.path().join("protoc.log");
    let protoc = write_fake_protoc(workspace.path(), &run_log);

    let source_root = workspace.path().join("proto");
    write_proto(&source_root, "pkg/schema.proto", "syntax = \"proto3\";\n");

    let env = ProcessEnvironment;
    let platform = HostPlatform::probe(&env);
    let config = RuntimeConfig::from_environment(&env);
    let executor = Executor::new(config.executor_threads);
    let artifact_resolver = InMemoryArtifactResolver::new();
    let uri_fetcher = InMemoryUriFetcher::new(workspace.path().join("fetch-cache"));
    let filter = SourceGlobFilter::new();

    let orchestrator = Orchestrator {
        artifact_resolver: &artifact_resolver,
        uri_fetcher: &uri_fetcher,
        platform: &platform,
        executor: &executor,
        source_filter: &filter,
        source_root_registrar: None,
        descriptor_attachment_registrar: None,
        cache_path: workspace.path().join("cache.txt"),
        scratch_root: workspace.path().join("scratch"),
        argfile_path: workspace.path().join("argfile"),
        config,
    };

    let mut request = base_request(source_root, workspace.path().join("out"));
    request.protoc_distribution = ProtocDistribution::SystemPath(protoc);

    assert_eq!(orchestrator.generate(&request).unwrap(), GenerationResult::ProtocSucceeded);
    assert_eq!(orchestrator.generate(&request).unwrap(), GenerationResult::NothingToDo);
    assert_eq!(std::fs::read_to_string(&run_log).unwrap().lines().count(), 1);
}

#[cfg(unix)]
#[test]
fn a_changed_source_triggers_recompilation() {
    let workspace = tempdir().unwrap();
    let run_log = workspace.path().join("protoc.log");
    let protoc = write_fake_protoc(workspace.path(), &run_log);

    let source_root = workspace.path().join("proto");
    let schema = write_proto(&source_root, "pkg/schema.proto", "syntax = \"proto3\";\n");

    let env = ProcessEnvironment;
    let platform = HostPlatform::probe(&env);
    let config = RuntimeConfig::from_environment(&env);
    let executor = Executor::new(config.executor_threads);
    let artifact_resolver = InMemoryArtifactResolver::new();
    let uri_fetcher = InMemoryUriFetcher::new(workspace.path().join("fetch-cache"));
    let filter = SourceGlobFilter::new();

    let orchestrator = Orchestrator {
        artifact_resolver: &artifact_resolver,
        uri_fetcher: &uri_fetcher,
        platform: &platform,
        executor: &executor,
        source_filter: &filter,
        source_root_registrar: None,
        descriptor_attachment_registrar: None,
        cache_path: workspace.path().join("cache.txt"),
        scratch_root: workspace.path().join("scratch"),
        argfile_path: workspace.path().join("argfile"),
        config,
    };

    let mut request = base_request(source_root, workspace.path().join("out"));
    request.protoc_distribution = ProtocDistribution::SystemPath(protoc);

    assert_eq!(orchestrator.generate(&request).unwrap(), GenerationResult::ProtocSucceeded);
    std::fs::write(&schema, "syntax = \"proto3\";\nmessage Changed {}\n").unwrap();
    assert_eq!(orchestrator.generate(&request).unwrap(), GenerationResult::ProtocSucceeded);
    assert_eq!(std::fs::read_to_string(&run_log).unwrap().lines().count(), 2);
}

fn write_placeholder_protoc(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("protoc");
    std::fs::write(&path, b"placeholder").unwrap();
    path
}

#[test]
fn missing_source_root_without_fail_flag_reports_no_sources() {
    let workspace = tempdir().unwrap();
    let protoc = write_placeholder_protoc(workspace.path());

    let env = ProcessEnvironment;
    let platform = HostPlatform::probe(&env);
    let config = RuntimeConfig::from_environment(&env);
    let executor = Executor::new(config.executor_threads);
    let artifact_resolver = InMemoryArtifactResolver::new();
    let uri_fetcher = InMemoryUriFetcher::new(workspace.path().join("fetch-cache"));
    let filter = SourceGlobFilter::new();

    let orchestrator = Orchestrator {
        artifact_resolver: &artifact_resolver,
        uri_fetcher: &uri_fetcher,
        platform: &platform,
        executor: &executor,
        source_filter: &filter,
        source_root_registrar: None,
        descriptor_attachment_registrar: None,
        cache_path: workspace.path().join("cache.txt"),
        scratch_root: workspace.path().join("scratch"),
        argfile_path: workspace.path().join("argfile"),
        config,
    };

    let mut request = base_request(workspace.path().join("does-not-exist"), workspace.path().join("out"));
    request.protoc_distribution = ProtocDistribution::SystemPath(protoc);
    request.flags.fail_on_missing_sources = false;

    assert_eq!(orchestrator.generate(&request).unwrap(), GenerationResult::NoSources);
}

#[test]
fn no_output_targets_without_fail_flag_reports_no_targets() {
    let workspace = tempdir().unwrap();
    let protoc = write_placeholder_protoc(workspace.path());
    let source_root = workspace.path().join("proto");
    write_proto(&source_root, "pkg/schema.proto", "syntax = \"proto3\";\n");

    let env = ProcessEnvironment;
    let platform = HostPlatform::probe(&env);
    let config = RuntimeConfig::from_environment(&env);
    let executor = Executor::new(config.executor_threads);
    let artifact_resolver = InMemoryArtifactResolver::new();
    let uri_fetcher = InMemoryUriFetcher::new(workspace.path().join("fetch-cache"));
    let filter = SourceGlobFilter::new();

    let orchestrator = Orchestrator {
        artifact_resolver: &artifact_resolver,
        uri_fetcher: &uri_fetcher,
        platform: &platform,
        executor: &executor,
        source_filter: &filter,
        source_root_registrar: None,
        descriptor_attachment_registrar: None,
        cache_path: workspace.path().join("cache.txt"),
        scratch_root: workspace.path().join("scratch"),
        argfile_path: workspace.path().join("argfile"),
        config,
    };

    let mut request = base_request(source_root, workspace.path().join("out"));
    request.protoc_distribution = ProtocDistribution::SystemPath(protoc);
    request.enabled_languages = BTreeSet::new();
    request.flags.fail_on_missing_targets = false;

    assert_eq!(orchestrator.generate(&request).unwrap(), GenerationResult::NoTargets);
}
