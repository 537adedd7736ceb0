//! The build orchestrator (C12): `generate(request) -> GenerationResult`.
//!
//! Wires every other component into the end-to-end flow: resolve the `protoc` distribution and
//! plugins, resolve sources and descriptors, consult the incremental cache, assemble the argument
//! file, and run `protoc` — a sequence of short-circuiting steps, each one logged, ending in a
//! single process spawn.

use crate::{
    cache::{self, Fingerprints, IncrementalCache},
    config::RuntimeConfig,
    digest::{self, Digest},
    error::{Error, Result},
    executor::Executor,
    external::{ArtifactResolver, DescriptorAttachmentRegistrar, SourceRootRegistrar, UriFetcher},
    filter::FileFilter,
    fs_utils,
    invocation::{sort_targets, ProtocInvocation, ProtocTarget},
    model::{
        FilesToCompile, GenerationRequest, GenerationResult, ProjectInputListing, ProtocDistribution,
    },
    platform::HostPlatform,
    resolver::{
        plugins::PluginResolver,
        sources::{dedup_paths_preserving_first_occurrence, SourceResolver},
    },
};
use std::path::PathBuf;

pub struct Orchestrator<'a> {
    pub artifact_resolver: &'a dyn ArtifactResolver,
    pub uri_fetcher: &'a dyn UriFetcher,
    pub platform: &'a HostPlatform,
    pub executor: &'a Executor,
    pub source_filter: &'a dyn FileFilter,
    pub source_root_registrar: Option<&'a dyn SourceRootRegistrar>,
    pub descriptor_attachment_registrar: Option<&'a dyn DescriptorAttachmentRegistrar>,
    pub cache_path: PathBuf,
    pub scratch_root: PathBuf,
    pub argfile_path: PathBuf,
    /// Read once at construction (§10.3): sizes [`Executor`] at the caller's construction site
    /// and is consulted here to reject a request whose `offline` flag disagrees with
    /// `PROTOC_PLUGIN_OFFLINE`.
    pub config: RuntimeConfig,
}

impl<'a> Orchestrator<'a> {
    #[instrument(skip_all)]
    pub fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        self.config.check_offline_consistency(request.flags.offline)?;

        if request.has_no_configured_inputs() {
            return self.no_sources_outcome(request);
        }

        let protoc_path = self.resolve_protoc(&request.protoc_distribution)?;
        let protoc_digest = digest::digest_file(&protoc_path)?;

        let source_resolver = SourceResolver::new(self.source_filter, self.executor, self.scratch_root.clone());
        let plugin_resolver = PluginResolver::new(
            self.artifact_resolver,
            self.uri_fetcher,
            self.platform,
            self.executor,
            self.scratch_root.clone(),
        );

        let mut plugins = plugin_resolver.resolve_all(&request.plugins)?;
        plugins.retain(|plugin| !plugin.skip);

        let listing = self.resolve_project_inputs(request, &source_resolver)?;
        if !listing.has_compilable_input() {
            return self.no_sources_outcome(request);
        }

        if request.flags.register_as_compilation_root {
            self.register_compilation_roots(&listing)?;
        }

        let targets = self.build_targets(request, &plugins);
        if targets.is_empty() {
            return if request.flags.fail_on_missing_targets {
                Err(Error::configuration("no protoc output targets configured (no languages, plugins, or descriptor output)"))
            } else {
                debug!("no output targets configured, nothing for protoc to produce");
                Ok(GenerationResult::NoTargets)
            };
        }

        let mut fingerprints = Fingerprints::new();
        fingerprints.insert(cache::protoc_key(), protoc_digest.clone());
        for plugin in &plugins {
            fingerprints.insert(cache::plugin_key(&plugin.id), digest::digest_file(&plugin.local_path)?);
        }
        for listing in listing.compilable_sources.iter().chain(&listing.dependency_sources) {
            for file in &listing.files {
                fingerprints.insert(file.display().to_string(), digest::digest_file(file)?);
            }
        }
        for descriptor in listing.compilable_descriptors.iter().chain(&listing.dependency_descriptors) {
            fingerprints
                .insert(descriptor.descriptor_file.display().to_string(), digest::digest_file(&descriptor.descriptor_file)?);
        }

        let previous_cache = IncrementalCache::read(&self.cache_path)?;
        let files_to_compile = self.plan_compilation(request, &previous_cache, &fingerprints, &listing);

        if files_to_compile.is_empty() {
            debug!("incremental delta is empty, nothing to recompile");
            if request.incremental_eligible() {
                let cache: IncrementalCache = fingerprints.into();
                cache.write(&self.cache_path)?;
            }
            return Ok(GenerationResult::NothingToDo);
        }

        if request.flags.clean_output_directories && !request.incremental_eligible() {
            self.clean_output_directories(request, &plugins)?;
        }

        let import_roots = self.collect_import_roots(request, &listing);
        let invocation = ProtocInvocation {
            protoc_path,
            import_roots,
            targets,
            sources: files_to_compile.sources.clone(),
            fatal_warnings: request.flags.fatal_warnings,
            extra_arguments: self.extra_arguments(request, &files_to_compile),
            environment: request.environment.clone(),
            plugin_directories: self.plugin_directories(&plugins),
            sanctioned_executable_directory: request.sanctioned_executable_directory.clone(),
            path_separator: self.platform.path_separator(),
        };

        let output = invocation.run(&self.argfile_path)?;
        if !output.status.success() {
            return Ok(GenerationResult::ProtocFailed);
        }

        if request.flags.embed_sources_in_output {
            self.embed_sources(request, &listing)?;
        }

        if let Some(descriptor) = &request.output_descriptor {
            if descriptor.attach {
                if let Some(registrar) = self.descriptor_attachment_registrar {
                    registrar.attach_descriptor(&descriptor.path)?;
                }
            }
        }

        if request.incremental_eligible() {
            let cache: IncrementalCache = fingerprints.into();
            cache.write(&self.cache_path)?;
        }

        Ok(GenerationResult::ProtocSucceeded)
    }

    fn no_sources_outcome(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        if request.flags.fail_on_missing_sources {
            Err(Error::resolution("sources", "no source roots, dependency coordinates, or descriptors resolved to any input"))
        } else {
            debug!("no compilable sources or descriptors resolved");
            Ok(GenerationResult::NoSources)
        }
    }

    fn resolve_protoc(&self, distribution: &ProtocDistribution) -> Result<PathBuf> {
        let path = match distribution {
            ProtocDistribution::Coordinate(coordinate) => self.artifact_resolver.resolve_artifact(coordinate)?,
            ProtocDistribution::Uri { uri, expected_digest } => {
                let expected = expected_digest
                    .as_deref()
                    .map(Digest::from_record)
                    .transpose()
                    .map_err(|reason| Error::resolution(uri.clone(), reason))?;
                self.uri_fetcher
                    .fetch(uri, extension_for_platform(self.platform), expected.as_ref())?
                    .ok_or_else(|| Error::resolution(uri.clone(), "fetch returned no content or digest mismatch"))?
            }
            ProtocDistribution::SystemPath(path) => path.clone(),
        };
        if !path.is_file() {
            return Err(Error::resolution(path.display().to_string(), "resolved protoc path is not a file"));
        }
        fs_utils::set_executable(&path)?;
        Ok(path)
    }

    fn resolve_project_inputs(
        &self,
        request: &GenerationRequest,
        resolver: &SourceResolver<'_>,
    ) -> Result<ProjectInputListing> {
        let compilable_sources = resolver.resolve_sources(&request.source_roots)?;

        let mut dependency_artifacts = self.artifact_resolver.resolve_dependencies(
            &request.source_dependency_coordinates,
            crate::model::DependencyDepth::Transitive,
            &request.enabled_scopes.iter().copied().collect::<Vec<_>>(),
            !request.flags.ignore_project_dependencies,
            request.flags.fail_on_invalid_dependencies,
        )?;
        dependency_artifacts.extend(self.artifact_resolver.resolve_dependencies(
            &request.import_dependency_coordinates,
            crate::model::DependencyDepth::Transitive,
            &request.enabled_scopes.iter().copied().collect::<Vec<_>>(),
            false,
            request.flags.fail_on_invalid_dependencies,
        )?);
        let dependency_sources = resolver.resolve_dependency_sources(&dependency_artifacts)?;

        let compilable_descriptors = resolver.resolve_descriptors(&request.descriptor_source_paths)?;
        let descriptor_artifacts = self.artifact_resolver.resolve_dependencies(
            &request.descriptor_dependency_coordinates,
            crate::model::DependencyDepth::Direct,
            &request.enabled_scopes.iter().copied().collect::<Vec<_>>(),
            false,
            request.flags.fail_on_invalid_dependencies,
        )?;
        let dependency_descriptors = resolver.resolve_descriptors(&descriptor_artifacts)?;

        Ok(ProjectInputListing {
            compilable_sources,
            dependency_sources,
            compilable_descriptors,
            dependency_descriptors,
        })
    }

    fn register_compilation_roots(&self, listing: &ProjectInputListing) -> Result<()> {
        let Some(registrar) = self.source_root_registrar else { return Ok(()) };
        for source in &listing.compilable_sources {
            registrar.register_compilation_root(&source.source_root)?;
        }
        Ok(())
    }

    fn build_targets(
        &self,
        request: &GenerationRequest,
        plugins: &[crate::model::ResolvedProtocPlugin],
    ) -> Vec<ProtocTarget> {
        let mut targets = Vec::new();
        for language in &request.enabled_languages {
            targets.push(ProtocTarget::Language {
                language: *language,
                output_directory: request.output_directory.clone(),
                lite: request.flags.lite,
                options: Vec::new(),
            });
        }
        for plugin in plugins {
            targets.push(ProtocTarget::Plugin { plugin: plugin.clone() });
        }
        if let Some(descriptor) = &request.output_descriptor {
            targets.push(ProtocTarget::Descriptor { config: descriptor.clone() });
        }
        sort_targets(&mut targets);
        targets
    }

    fn plan_compilation(
        &self,
        request: &GenerationRequest,
        previous_cache: &IncrementalCache,
        fingerprints: &Fingerprints,
        listing: &ProjectInputListing,
    ) -> FilesToCompile {
        let all_sources: Vec<PathBuf> = listing
            .compilable_sources
            .iter()
            .chain(&listing.dependency_sources)
            .flat_map(|l| l.files.clone())
            .collect();
        let all_descriptor_names: Vec<String> = listing
            .compilable_descriptors
            .iter()
            .chain(&listing.dependency_descriptors)
            .flat_map(|d| d.proto_names.clone())
            .collect();

        let full = FilesToCompile { sources: all_sources.clone(), descriptor_names: all_descriptor_names.clone() };

        if !request.incremental_eligible()
            || previous_cache.is_empty()
            || cache::requires_full_rebuild(previous_cache, fingerprints)
        {
            return full;
        }

        let delta = cache::compute_delta(previous_cache, fingerprints);
        if delta.is_empty() {
            return FilesToCompile::default();
        }

        let changed_keys: std::collections::HashSet<String> =
            delta.added.into_iter().chain(delta.changed).collect();
        let sources = all_sources
            .into_iter()
            .filter(|path| changed_keys.contains(&path.display().to_string()))
            .collect();
        FilesToCompile { sources, descriptor_names: all_descriptor_names }
    }

    /// Collects `--proto_path` roots in encounter order: the project's own source roots, then
    /// dependency source roots, then explicit import roots, with duplicates removed keeping the
    /// first occurrence (§4.2) — never sorted, since later occurrences are meant to be shadowed,
    /// not reordered.
    fn collect_import_roots(&self, request: &GenerationRequest, listing: &ProjectInputListing) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = request.source_roots.clone();
        roots.extend(listing.dependency_sources.iter().map(|l| l.source_root.clone()));
        roots.extend(request.import_roots.clone());
        dedup_paths_preserving_first_occurrence(roots)
    }

    /// Directories holding resolved plugin binaries, for the synthetic `PATH` the spawned
    /// `protoc` process sees, deduped in encounter order.
    fn plugin_directories(&self, plugins: &[crate::model::ResolvedProtocPlugin]) -> Vec<PathBuf> {
        let dirs = plugins
            .iter()
            .filter_map(|plugin| plugin.local_path.parent().map(|p| p.to_path_buf()))
            .collect();
        dedup_paths_preserving_first_occurrence(dirs)
    }

    fn extra_arguments(&self, request: &GenerationRequest, files: &FilesToCompile) -> Vec<String> {
        let mut args = request.extra_arguments.clone();
        if !files.descriptor_names.is_empty() {
            args.push(format!("--descriptor_set_in={}", files.descriptor_names.join(
                if self.platform.is_windows() { ";" } else { ":" }
            )));
        }
        args
    }

    fn clean_output_directories(
        &self,
        request: &GenerationRequest,
        plugins: &[crate::model::ResolvedProtocPlugin],
    ) -> Result<()> {
        let mut dirs = vec![request.output_directory.clone()];
        dirs.extend(plugins.iter().filter_map(|p| p.output_directory.clone()));
        for dir in dirs {
            if dir.exists() {
                std::fs::remove_dir_all(&dir).map_err(|e| Error::io(e, dir.clone()))?;
            }
            std::fs::create_dir_all(&dir).map_err(|e| Error::io(e, dir.clone()))?;
        }
        Ok(())
    }

    fn embed_sources(&self, request: &GenerationRequest, listing: &ProjectInputListing) -> Result<()> {
        let destination = request.output_directory.join("_sources");
        for source_listing in &listing.compilable_sources {
            fs_utils::copy_tree(&source_listing.source_root, &destination)?;
        }
        Ok(())
    }
}

fn extension_for_platform(platform: &HostPlatform) -> &'static str {
    if platform.is_windows() {
        "exe"
    } else {
        "bin"
    }
}
