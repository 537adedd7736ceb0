//! Plugin resolution (C9).
//!
//! Turns each unresolved [`PluginDescriptor`] into a [`ResolvedProtocPlugin`] pointing at a
//! runnable local executable, dispatching on [`PluginSource`] to the artifact resolver (C6), the
//! URI fetcher (C7), or a plain `PATH` lookup. JVM-hosted plugins additionally get a generated
//! bootstrap script, since `protoc` can only invoke a plugin as a bare executable and has no
//! notion of "run this jar with `java -jar`".

use crate::{
    binary_resolver::PathBinaryResolver,
    digest::Digest,
    error::{Error, Result},
    executor::Executor,
    external::{ArtifactResolver, UriFetcher},
    fs_utils,
    model::{sort_plugins, PluginDescriptor, PluginSource, ResolvedProtocPlugin},
    platform::HostPlatform,
    report,
};
use std::path::{Path, PathBuf};

pub struct PluginResolver<'a> {
    artifact_resolver: &'a dyn ArtifactResolver,
    uri_fetcher: &'a dyn UriFetcher,
    platform: &'a HostPlatform,
    executor: &'a Executor,
    scratch_root: PathBuf,
}

impl<'a> PluginResolver<'a> {
    pub fn new(
        artifact_resolver: &'a dyn ArtifactResolver,
        uri_fetcher: &'a dyn UriFetcher,
        platform: &'a HostPlatform,
        executor: &'a Executor,
        scratch_root: impl Into<PathBuf>,
    ) -> Self {
        Self { artifact_resolver, uri_fetcher, platform, executor, scratch_root: scratch_root.into() }
    }

    /// Resolves every descriptor, then sorts the result per the stable ordering rule
    /// (`(order, id, localPath)`, ascending). Skipped plugins are resolved to a placeholder
    /// (empty path) rather than going through artifact/URI resolution at all — there is nothing
    /// useful to resolve for a plugin that will never run, and a host that toggled `skip` off
    /// mid-build shouldn't pay for or fail on an unreachable coordinate.
    pub fn resolve_all(&self, descriptors: &[PluginDescriptor]) -> Result<Vec<ResolvedProtocPlugin>> {
        let tasks: Vec<_> = descriptors
            .iter()
            .cloned()
            .map(|descriptor| {
                move |_: &crate::executor::CancellationToken| -> Result<ResolvedProtocPlugin> {
                    self.resolve_one(descriptor)
                }
            })
            .collect();
        let mut resolved = self.executor.await_all(tasks)?;
        sort_plugins(&mut resolved);
        Ok(resolved)
    }

    fn resolve_one(&self, descriptor: PluginDescriptor) -> Result<ResolvedProtocPlugin> {
        if descriptor.skip {
            return Ok(placeholder(descriptor));
        }

        let local_path = match &descriptor.source {
            PluginSource::MavenBinary(coordinate) => {
                let path = self.artifact_resolver.resolve_artifact(coordinate)?;
                fs_utils::set_executable(&path)?;
                path
            }
            PluginSource::MavenJvm(coordinate) => {
                let jar = self.artifact_resolver.resolve_artifact(coordinate)?;
                self.bootstrap_jvm_plugin(&descriptor.id, &jar)?
            }
            PluginSource::UriBinary { uri, expected_digest } => {
                let expected = expected_digest
                    .as_deref()
                    .map(Digest::from_record)
                    .transpose()
                    .map_err(|reason| Error::resolution(uri.clone(), reason))?;
                let fetched = self
                    .uri_fetcher
                    .fetch(uri, extension_hint_for(self.platform), expected.as_ref())?
                    .ok_or_else(|| Error::resolution(uri.clone(), "fetch returned no content or digest mismatch"))?;
                fs_utils::set_executable(&fetched)?;
                fetched
            }
            PluginSource::PathBinary(name) => PathBinaryResolver::new(self.platform)
                .resolve(name)?
                .ok_or_else(|| Error::resolution(name.clone(), "not found on PATH"))?,
        };

        report::plugin_resolved(&descriptor.id, &local_path);
        Ok(ResolvedProtocPlugin {
            id: descriptor.id,
            local_path,
            options: descriptor.options,
            output_directory: descriptor.output_directory,
            order: descriptor.order,
            register_as_compilation_root: descriptor.register_as_compilation_root,
            skip: false,
        })
    }

    fn bootstrap_jvm_plugin(&self, id: &str, jar: &Path) -> Result<PathBuf> {
        let java = self.platform.java_executable_path().ok_or_else(|| {
            Error::resolution(id.to_string(), "no java executable available to host a JVM plugin")
        })?;
        let script_dir = self.scratch_root.join("plugins").join(id);
        std::fs::create_dir_all(&script_dir).map_err(|e| Error::io(e, script_dir.clone()))?;

        let (script_path, contents) = if self.platform.is_windows() {
            (script_dir.join(format!("{id}.cmd")), windows_bootstrap_script(&java, jar))
        } else {
            (script_dir.join(id), unix_bootstrap_script(&java, jar))
        };
        std::fs::write(&script_path, contents).map_err(|e| Error::io(e, script_path.clone()))?;
        fs_utils::set_executable(&script_path)?;
        Ok(script_path)
    }
}

fn placeholder(descriptor: PluginDescriptor) -> ResolvedProtocPlugin {
    ResolvedProtocPlugin {
        id: descriptor.id,
        local_path: PathBuf::new(),
        options: descriptor.options,
        output_directory: descriptor.output_directory,
        order: descriptor.order,
        register_as_compilation_root: descriptor.register_as_compilation_root,
        skip: true,
    }
}

fn extension_hint_for(platform: &HostPlatform) -> &'static str {
    if platform.is_windows() {
        "exe"
    } else {
        "bin"
    }
}

fn unix_bootstrap_script(java: &Path, jar: &Path) -> String {
    format!("#!/bin/sh\nexec \"{}\" -jar \"{}\" \"$@\"\n", java.display(), jar.display())
}

fn windows_bootstrap_script(java: &Path, jar: &Path) -> String {
    format!("@echo off\r\n\"{}\" -jar \"{}\" %*\r\n", java.display(), jar.display())
}
