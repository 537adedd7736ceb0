//! Host-platform probe (C1).
//!
//! A read-only snapshot of the bits of the operating environment the rest of the crate needs to
//! make cross-platform decisions: which OS family we're on, how `PATH` is structured, and where
//! a `java` executable might live. Constructed once per orchestrator invocation and threaded
//! through by reference, rather than read ambiently from global process state at every call site.

use crate::report;
use std::path::{Path, PathBuf};

/// Indirection over where environment state comes from, so tests can supply a fully synthetic
/// environment instead of reading the real process environment.
pub trait HostEnvironment {
    fn var(&self, key: &str) -> Option<String>;
    fn home_dir(&self) -> Option<PathBuf>;
    fn os_family(&self) -> OsFamily;
}

/// The real process environment, used in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl HostEnvironment for ProcessEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }

    fn os_family(&self) -> OsFamily {
        OsFamily::current()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Windows,
    MacOs,
    Linux,
    Termux,
    Other,
}

impl OsFamily {
    fn current() -> Self {
        if cfg!(target_os = "windows") {
            OsFamily::Windows
        } else if cfg!(target_os = "macos") {
            OsFamily::MacOs
        } else if cfg!(target_os = "android") || std::env::var_os("PREFIX").map_or(false, |p| {
            p.to_string_lossy().contains("com.termux")
        }) {
            OsFamily::Termux
        } else if cfg!(target_os = "linux") {
            OsFamily::Linux
        } else {
            OsFamily::Other
        }
    }
}

/// Snapshot of everything the rest of the crate needs to know about the host.
#[derive(Debug, Clone)]
pub struct HostPlatform {
    os_family: OsFamily,
    cpu_architecture: String,
    path_separator: char,
    path: Vec<PathBuf>,
    path_extensions: Vec<String>,
    java_executable_path: Option<PathBuf>,
}

impl HostPlatform {
    /// Builds a probe from the given environment provider. `PATH` entries that don't exist or
    /// aren't syntactically valid directories are dropped with a warning, never fatal.
    pub fn probe(env: &dyn HostEnvironment) -> Self {
        let os_family = env.os_family();
        let path_separator = if os_family == OsFamily::Windows { ';' } else { ':' };

        let raw_path = env.var("PATH").unwrap_or_default();
        let mut path = Vec::new();
        for entry in raw_path.split(path_separator) {
            if entry.is_empty() {
                continue;
            }
            let candidate = PathBuf::from(entry);
            if candidate.is_dir() {
                path.push(candidate);
            } else {
                report::path_entry_dropped(entry, "not an existing directory");
            }
        }

        let path_extensions = if os_family == OsFamily::Windows {
            env.var("PATHEXT")
                .unwrap_or_else(|| ".COM;.EXE;.BAT;.CMD".to_string())
                .split(';')
                .filter(|s| !s.is_empty())
                .map(|s| s.to_ascii_uppercase())
                .collect()
        } else {
            Vec::new()
        };

        let java_executable_path = Self::find_java(env, &path, os_family);

        Self {
            os_family,
            cpu_architecture: std::env::consts::ARCH.to_string(),
            path_separator,
            path,
            path_extensions,
            java_executable_path,
        }
    }

    fn find_java(
        env: &dyn HostEnvironment,
        path: &[PathBuf],
        os_family: OsFamily,
    ) -> Option<PathBuf> {
        let exe_name = if os_family == OsFamily::Windows { "java.exe" } else { "java" };
        if let Some(java_home) = env.var("JAVA_HOME") {
            let candidate = PathBuf::from(java_home).join("bin").join(exe_name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        path.iter().map(|dir| dir.join(exe_name)).find(|p| p.is_file())
    }

    pub fn os_name(&self) -> &'static str {
        match self.os_family {
            OsFamily::Windows => "windows",
            OsFamily::MacOs => "macos",
            OsFamily::Linux => "linux",
            OsFamily::Termux => "termux",
            OsFamily::Other => "unknown",
        }
    }

    pub fn cpu_architecture(&self) -> &str {
        &self.cpu_architecture
    }

    pub fn path_separator(&self) -> char {
        self.path_separator
    }

    pub fn path(&self) -> &[PathBuf] {
        &self.path
    }

    pub fn path_extensions(&self) -> &[String] {
        &self.path_extensions
    }

    pub fn java_executable_path(&self) -> Option<&Path> {
        self.java_executable_path.as_deref()
    }

    pub fn is_windows(&self) -> bool {
        self.os_family == OsFamily::Windows
    }

    pub fn is_macos(&self) -> bool {
        self.os_family == OsFamily::MacOs
    }

    pub fn is_linux(&self) -> bool {
        self.os_family == OsFamily::Linux
    }

    pub fn is_termux(&self) -> bool {
        self.os_family == OsFamily::Termux
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    #[test]
    fn drops_nonexistent_path_entries() {
        let existing = std::env::temp_dir();
        let raw = format!("{}:/definitely/does/not/exist", existing.display());
        let env = FakeEnv {
            vars: HashMap::from([("PATH", raw)]),
            os_family: OsFamily::Linux,
        };
        let platform = HostPlatform::probe(&env);
        assert_eq!(platform.path(), &[existing]);
    }

    #[test]
    fn windows_uses_pathext_case_insensitively() {
        let env = FakeEnv {
            vars: HashMap::from([
                ("PATH", String::new()),
                ("PATHEXT", ".exe;.bat;.CMD".to_string()),
            ]),
            os_family: OsFamily::Windows,
        };
        let platform = HostPlatform::probe(&env);
        assert_eq!(platform.path_extensions(), &[".EXE", ".BAT", ".CMD"]);
    }

    #[test]
    fn non_windows_has_no_path_extensions() {
        let env = FakeEnv { vars: HashMap::new(), os_family: OsFamily::Linux };
        let platform = HostPlatform::probe(&env);
        assert!(platform.path_extensions().is_empty());
    }
}
