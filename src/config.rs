//! Process-wide runtime configuration (C15).
//!
//! A handful of environment overrides read once through [`crate::platform::HostEnvironment`]
//! rather than scattered `std::env::var` calls, so tests can supply a fake environment and so the
//! crate has one place to document what it reads from its host process.

use crate::{error::Result, executor, platform::HostEnvironment};

const EXECUTOR_THREADS_VAR: &str = "PROTOC_PLUGIN_EXECUTOR_THREADS";
const OFFLINE_VAR: &str = "PROTOC_PLUGIN_OFFLINE";

/// Resolved runtime knobs for one generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Worker count for the [`crate::executor::Executor`]. Defaults to
    /// [`executor::default_pool_size`] when unset or unparsable.
    pub executor_threads: usize,
    /// When set, the artifact resolver and URI fetcher are expected to only serve already-cached
    /// content; network-backed implementations should treat this as a hard requirement, not a
    /// hint. This crate itself never touches the network, so it only threads the flag through.
    pub offline: bool,
}

impl RuntimeConfig {
    /// Reads configuration from `env`, falling back to defaults for anything unset or
    /// unparsable. Never fails: a malformed `PROTOC_PLUGIN_EXECUTOR_THREADS` just falls back to
    /// the computed default rather than aborting the whole run over a typo'd env var.
    pub fn from_environment(env: &dyn HostEnvironment) -> Self {
        let executor_threads = env
            .var(EXECUTOR_THREADS_VAR)
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or_else(executor::default_pool_size);

        let offline = env
            .var(OFFLINE_VAR)
            .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self { executor_threads, offline }
    }

    /// Validates that a caller-supplied request's `offline` flag doesn't silently diverge from
    /// process-wide configuration; an explicit `false` on the request while the process is
    /// configured offline is a configuration mistake, not something to quietly override.
    pub fn check_offline_consistency(&self, request_offline: bool) -> Result<()> {
        if self.offline && !request_offline {
            return Err(crate::error::Error::configuration(format!(
                "{OFFLINE_VAR} is set but the generation request did not request offline mode"
            )));
        }
        Ok(())
    }
}
