//! Argument-file assembly and `protoc` invocation (C11).
//!
//! `protoc` reads an `@argfile` one argument per line, so every flag this crate emits goes
//! through [`ProtocInvocation::to_argfile_contents`] rather than being joined onto a single
//! shell-quoted string. Assembly: build a `Command`, pipe all three standard streams, log the
//! assembled command before running it.

use crate::{
    error::{Error, Result},
    model::{Language, OutputDescriptorConfig, ResolvedProtocPlugin},
    report,
};
use std::{
    collections::BTreeMap,
    io::Write as _,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

/// One `--xxx_out=...` or `--xxx_opt=...` target `protoc` should produce, tagged by kind so
/// ordering and option composition stay a closed match rather than a pile of optional fields on
/// one struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocTarget {
    Language { language: Language, output_directory: PathBuf, lite: bool, options: Vec<String> },
    Plugin { plugin: ResolvedProtocPlugin },
    Descriptor { config: OutputDescriptorConfig },
}

impl ProtocTarget {
    /// The stable sort key from §4.7: ordered by kind first (languages, then plugins in their
    /// own resolved order, then the descriptor output last), tie-broken by a stable string so two
    /// targets of the same kind never depend on construction order.
    fn sort_key(&self) -> (u8, i32, String) {
        match self {
            ProtocTarget::Language { language, .. } => (0, 0, language.flag_stem().to_string()),
            ProtocTarget::Plugin { plugin } => (1, plugin.order, plugin.id.clone()),
            ProtocTarget::Descriptor { config } => (2, 0, config.path.display().to_string()),
        }
    }

    fn write_args(&self, out: &mut Vec<String>) {
        match self {
            ProtocTarget::Language { language, output_directory, lite, options } => {
                let prefix = if *lite && language.supports_lite() { "lite:" } else { "" };
                let mut out_value = format!("{prefix}{}", output_directory.display());
                if !options.is_empty() {
                    out_value = format!("{}:{}", options.join(","), out_value);
                }
                out.push(format!("--{}_out={out_value}", language.flag_stem()));
            }
            ProtocTarget::Plugin { plugin } => {
                out.push(format!("--plugin=protoc-gen-{}={}", plugin.id, plugin.local_path.display()));
                let output_directory =
                    plugin.output_directory.clone().unwrap_or_else(|| PathBuf::from("."));
                let mut out_value = output_directory.display().to_string();
                if let Some(options) = &plugin.options {
                    out_value = format!("{options}:{out_value}");
                }
                out.push(format!("--{}_out={out_value}", plugin.id));
            }
            ProtocTarget::Descriptor { config } => {
                out.push(format!("--descriptor_set_out={}", config.path.display()));
                if config.include_imports {
                    out.push("--include_imports".to_string());
                }
                if config.include_source_info {
                    out.push("--include_source_info".to_string());
                }
                if config.retain_options {
                    out.push("--retain_options".to_string());
                }
            }
        }
    }
}

/// Sorts targets per the stable ordering rule.
pub fn sort_targets(targets: &mut [ProtocTarget]) {
    targets.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

/// An immutable, fully-assembled invocation: every `--proto_path` root, every target, every
/// compiled file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocInvocation {
    pub protoc_path: PathBuf,
    pub import_roots: Vec<PathBuf>,
    pub targets: Vec<ProtocTarget>,
    pub sources: Vec<PathBuf>,
    pub fatal_warnings: bool,
    pub extra_arguments: Vec<String>,
    /// Passed to the spawned `protoc` process verbatim (§4.7 step 13); the process otherwise
    /// inherits nothing from the host environment.
    pub environment: BTreeMap<String, String>,
    /// Directories holding resolved plugin binaries, forming the synthetic `PATH` `protoc` sees
    /// so it can find `protoc-gen-*` plugins without picking up unrelated host tools.
    pub plugin_directories: Vec<PathBuf>,
    /// An optional extra directory appended to the synthetic `PATH`, per the `sanctionedExecutablePath`
    /// field of the value type this is built from.
    pub sanctioned_executable_directory: Option<PathBuf>,
    pub path_separator: char,
}

impl ProtocInvocation {
    /// Renders the full argument list in the order §4.7 mandates: `--fatal_warnings`, targets
    /// (already sorted), the source file list, trailing extra arguments, then `--proto_path` for
    /// each import root.
    pub fn to_arguments(&self) -> Result<Vec<String>> {
        let mut args = Vec::new();
        if self.fatal_warnings {
            args.push("--fatal_warnings".to_string());
        }
        for target in &self.targets {
            target.write_args(&mut args);
        }
        for source in &self.sources {
            args.push(quote_argfile_value(source)?);
        }
        args.extend(self.extra_arguments.iter().cloned());
        for root in &self.import_roots {
            args.push(format!("--proto_path={}", quote_argfile_value(root)?));
        }
        Ok(args)
    }

    /// Renders the argument file contents: one argument per line, as `protoc` expects for
    /// `@argfile` invocation. Keeping arguments one-per-line (rather than shell-joined) sidesteps
    /// platform argv length limits on large dependency trees.
    pub fn to_argfile_contents(&self) -> Result<String> {
        let args = self.to_arguments()?;
        Ok(args.join("\n") + "\n")
    }

    /// Writes the argument file to `path` and returns the `Command` ready to run (`protoc
    /// @path`). Kept as two steps so callers can log or hash the argfile contents before
    /// spawning.
    pub fn write_argfile(&self, path: &Path) -> Result<()> {
        let contents = self.to_argfile_contents()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(e, parent.to_path_buf()))?;
        }
        let mut file = std::fs::File::create(path).map_err(|e| Error::io(e, path.to_path_buf()))?;
        file.write_all(contents.as_bytes()).map_err(|e| Error::io(e, path.to_path_buf()))
    }

    /// Builds the `protoc @argfile` command, piping all three standard streams so the
    /// orchestrator can capture diagnostics instead of letting them leak to the host's console.
    /// The child's environment is cleared and replaced with exactly `self.environment` plus a
    /// synthetic `PATH` containing only the plugin directories and the optional sanctioned
    /// executable directory — `protoc` never inherits the host's ambient environment or PATH.
    pub fn configure_command(&self, argfile: &Path) -> Command {
        let mut cmd = Command::new(&self.protoc_path);
        cmd.arg(format!("@{}", argfile.display()));
        cmd.stdin(Stdio::piped()).stderr(Stdio::piped()).stdout(Stdio::piped());
        cmd.env_clear();
        cmd.envs(&self.environment);
        cmd.env("PATH", self.synthetic_path());
        cmd
    }

    fn synthetic_path(&self) -> String {
        let separator = self.path_separator.to_string();
        let mut directories: Vec<String> =
            self.plugin_directories.iter().map(|dir| dir.display().to_string()).collect();
        if let Some(sanctioned) = &self.sanctioned_executable_directory {
            directories.push(sanctioned.display().to_string());
        }
        directories.join(&separator)
    }

    /// Writes the argument file, logs the assembled command, and runs it to completion.
    pub fn run(&self, argfile: &Path) -> Result<std::process::Output> {
        self.write_argfile(argfile)?;
        let mut cmd = self.configure_command(argfile);
        report::protoc_invocation_start(&self.protoc_path, argfile);
        let output = cmd.output().map_err(|e| Error::io(e, self.protoc_path.clone()))?;
        if output.status.success() {
            report::protoc_invocation_success(&self.protoc_path);
        } else {
            report::protoc_invocation_failure(&self.protoc_path, output.status.code());
        }
        Ok(output)
    }
}

/// Quotes a path for the `protoc` argument-file grammar: each line is one argument verbatim, so
/// the only unsafe character is an embedded newline, which can't be represented on one line at
/// all.
fn quote_argfile_value(path: &Path) -> Result<String> {
    let value = path.to_string_lossy();
    if value.contains('\n') {
        return Err(Error::UnrepresentablePath {
            path: path.to_path_buf(),
            reason: "path contains a newline, which the argument-file grammar cannot represent".to_string(),
        });
    }
    Ok(value.into_owned())
}
