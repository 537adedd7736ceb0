//! The crate's error taxonomy.
//!
//! Every fallible public operation returns [`Result`], whose error variants map 1:1 onto the
//! semantic error kinds a host build system needs to distinguish (resolution failure, I/O
//! failure, aggregate fan-out failure, configuration mistake). `protoc` process failures are
//! *not* represented here: a non-zero exit is a normal [`crate::model::GenerationResult`]
//! value, not an exception.

use std::{fmt, path::PathBuf};

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to locate a binary, artifact, or URI resource.
    #[error("failed to resolve {what}: {reason}")]
    Resolution { what: String, reason: String },

    /// Unexpected filesystem failure.
    #[error("I/O error at {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },

    /// Aggregate of every failure observed during one `awaitAll` fan-out.
    #[error("{} task(s) failed, primary: {primary}", 1 + suppressed.len())]
    MultipleFailures { primary: Box<Error>, suppressed: Vec<Error> },

    /// A descriptor-set (`FileDescriptorSet`) failed to parse.
    #[error("failed to parse descriptor set {path}: {reason}")]
    DescriptorParse { path: PathBuf, reason: String },

    /// A request-level configuration mistake detected before any work begins.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A path contains a character sequence the argument-file grammar cannot represent safely.
    #[error("path {path} cannot be safely quoted for a protoc argument file: {reason}")]
    UnrepresentablePath { path: PathBuf, reason: String },
}

impl Error {
    pub fn resolution(what: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Resolution { what: what.into(), reason: reason.to_string() }
    }

    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Aggregates a non-empty vector of failures into one [`Error::MultipleFailures`], keeping
    /// the first as primary and the remainder (in original order) as suppressed causes. Panics
    /// if `errors` is empty — callers must only invoke this when at least one task failed.
    pub fn aggregate(mut errors: Vec<Error>) -> Self {
        assert!(!errors.is_empty(), "aggregate called with no failures");
        let primary = Box::new(errors.remove(0));
        if errors.is_empty() {
            return *primary;
        }
        Self::MultipleFailures { primary, suppressed: errors }
    }
}
