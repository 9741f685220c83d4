// SPDX-License-Identifier: MIT OR Apache-2.0
//! Contract types shared by the rsession-proxy adapters.
//!
//! An adapter describes *how to launch* a server behind the notebook host's
//! reverse proxy: the argv to spawn for a given port, environment variable
//! overrides, and the metadata shown in the host's launcher UI. The host owns
//! everything else (port allocation, spawning, proxying, supervision); the
//! types here are plain data handed across that boundary.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced by an adapter while building a launch specification.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// No server executable could be located by any discovery strategy.
    ///
    /// Fatal at this layer; the host decides what to show the user.
    #[error("can not find {name} in PATH (also tried {searched:?})")]
    ExecutableNotFound {
        /// Executable name that was looked up.
        name: String,
        /// Fallback locations probed after the PATH lookup failed.
        searched: Vec<PathBuf>,
    },

    /// Filesystem error while writing a rendered server configuration.
    #[error("failed to write server config: {0}")]
    Io(#[from] std::io::Error),

    /// The ambient process state needed to build a [`RunContext`] is missing.
    #[error("run context unavailable: {reason}")]
    Context {
        /// What could not be resolved.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// LaunchSpec
// ---------------------------------------------------------------------------

/// Everything the host needs to spawn one server process.
///
/// Arguments are discrete list elements; the host spawns without a shell, so
/// no quoting or escaping happens here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    /// Executable to run — a bare name resolved by the host's PATH, or an
    /// absolute path when discovery already pinned one down.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Environment overrides applied on top of the host's environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl LaunchSpec {
    /// Create a spec with the given program and default (empty) args/env.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    /// Append an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set an environment override.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// The full argv (program followed by arguments), as the host passes it
    /// to its process-spawning mechanism.
    pub fn argv(&self) -> Vec<String> {
        let mut v = Vec::with_capacity(self.args.len() + 1);
        v.push(self.program.clone());
        v.extend(self.args.iter().cloned());
        v
    }
}

// ---------------------------------------------------------------------------
// LauncherEntry
// ---------------------------------------------------------------------------

/// Metadata for one entry in the host's launcher UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LauncherEntry {
    /// Display title, e.g. `"RStudio"`. Never empty.
    pub title: String,
    /// Path to an icon file shipped with the adapter crate.
    pub icon_path: PathBuf,
}

impl LauncherEntry {
    /// Create an entry from a title and icon path.
    pub fn new(title: impl Into<String>, icon_path: impl Into<PathBuf>) -> Self {
        Self {
            title: title.into(),
            icon_path: icon_path.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// RunContext
// ---------------------------------------------------------------------------

/// Environment variables consulted for the invoking user, in order.
const USER_VARS: &[&str] = &["LOGNAME", "USER", "LNAME", "USERNAME"];

/// Snapshot of the ambient process state an adapter is allowed to see.
///
/// Adapters never read `std::env` themselves; the host (or a test) builds a
/// context once and passes it in, which keeps the dependencies visible and
/// the adapters deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Name of the invoking OS user.
    pub user: String,
    /// Raw value of the `USER` variable, `None` when unset or empty.
    ///
    /// Kept separate from [`user`](Self::user): rserver authenticates against
    /// `USER` specifically, so the adapter must know whether the variable is
    /// actually present, not just who the user is.
    pub ambient_user: Option<String>,
    /// Working directory the servers treat as their site root.
    pub cwd: PathBuf,
}

impl RunContext {
    /// Build a context with an explicit user and working directory.
    ///
    /// `ambient_user` starts out mirroring `user`; clear it with
    /// [`without_ambient_user`](Self::without_ambient_user) to model an
    /// environment where `USER` is unset.
    pub fn new(user: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        let user = user.into();
        Self {
            ambient_user: Some(user.clone()),
            user,
            cwd: cwd.into(),
        }
    }

    /// Drop the recorded `USER` variable from the snapshot.
    #[must_use]
    pub fn without_ambient_user(mut self) -> Self {
        self.ambient_user = None;
        self
    }

    /// Snapshot the real process environment.
    ///
    /// The user is the first non-empty of `LOGNAME`, `USER`, `LNAME`,
    /// `USERNAME`; the working directory comes from the process cwd. This is
    /// the only place in the workspace that reads ambient user state.
    pub fn from_env() -> Result<Self, AdapterError> {
        let user = USER_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
            .ok_or_else(|| AdapterError::Context {
                reason: format!("none of {USER_VARS:?} are set"),
            })?;
        let ambient_user = std::env::var("USER").ok().filter(|v| !v.is_empty());
        let cwd = std::env::current_dir()?;
        Ok(Self {
            user,
            ambient_user,
            cwd,
        })
    }
}

// ---------------------------------------------------------------------------
// ConfigFileGuard
// ---------------------------------------------------------------------------

/// Scoped on-disk file referenced by a launch spec's argv.
///
/// Dropping the guard deletes the file. The host holds it for the lifetime of
/// the spawned process and drops it once the process has exited, so rendered
/// configs never accumulate in the temp directory.
#[derive(Debug)]
pub struct ConfigFileGuard {
    path: tempfile::TempPath,
}

impl ConfigFileGuard {
    /// Path of the guarded file, valid while the guard is alive.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the file from the guard, leaving it on disk permanently.
    pub fn keep(self) -> Result<PathBuf, std::io::Error> {
        self.path.keep().map_err(|e| e.error)
    }
}

impl From<tempfile::TempPath> for ConfigFileGuard {
    fn from(path: tempfile::TempPath) -> Self {
        Self { path }
    }
}

// ---------------------------------------------------------------------------
// Launch
// ---------------------------------------------------------------------------

/// A complete launch: the spec to spawn plus any scoped files it references.
#[derive(Debug)]
pub struct Launch {
    /// Spec handed to the host's process spawner.
    pub spec: LaunchSpec,
    /// Rendered config file backing the spec, if the adapter produced one.
    /// Must outlive the spawned process.
    pub config_file: Option<ConfigFileGuard>,
}

impl Launch {
    /// A launch with no scoped files.
    pub fn new(spec: LaunchSpec) -> Self {
        Self {
            spec,
            config_file: None,
        }
    }

    /// Attach a scoped config file.
    #[must_use]
    pub fn with_config_file(mut self, guard: ConfigFileGuard) -> Self {
        self.config_file = Some(guard);
        self
    }

    /// Split into the spec and the optional guard.
    pub fn into_parts(self) -> (LaunchSpec, Option<ConfigFileGuard>) {
        (self.spec, self.config_file)
    }
}

// ---------------------------------------------------------------------------
// ServerAdapter
// ---------------------------------------------------------------------------

/// The contract the notebook host consumes.
///
/// Implementations are stateless single-shot factories: every call builds a
/// fresh [`Launch`] from the context and port, retains nothing, and caches
/// nothing.
pub trait ServerAdapter {
    /// Stable machine name, e.g. `"rstudio"`.
    fn name(&self) -> &str;

    /// Launcher UI metadata for this server.
    fn launcher_entry(&self) -> LauncherEntry;

    /// Build the launch specification for the given port.
    ///
    /// The host supplies a free, valid TCP port; adapters do not validate it
    /// beyond what the `u16` type already guarantees.
    fn launch(&self, ctx: &RunContext, port: u16) -> Result<Launch, AdapterError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_spec_builder_chain() {
        let spec = LaunchSpec::new("rserver")
            .arg("--www-port=8787")
            .env("USER", "alice");
        assert_eq!(spec.program, "rserver");
        assert_eq!(spec.args, vec!["--www-port=8787"]);
        assert_eq!(spec.env["USER"], "alice");
    }

    #[test]
    fn argv_starts_with_program() {
        let spec = LaunchSpec::new("shiny-server-launcher").arg("/tmp/conf");
        assert_eq!(spec.argv(), vec!["shiny-server-launcher", "/tmp/conf"]);
    }

    #[test]
    fn launch_spec_serializes_env_as_map() {
        let spec = LaunchSpec::new("rserver").env("USER", "bob");
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["program"], "rserver");
        assert_eq!(json["env"]["USER"], "bob");
    }

    #[test]
    fn launch_spec_deserializes_without_env() {
        let spec: LaunchSpec =
            serde_json::from_str(r#"{"program": "R", "args": ["--vanilla"]}"#).unwrap();
        assert!(spec.env.is_empty());
        assert_eq!(spec.args, vec!["--vanilla"]);
    }

    #[test]
    fn run_context_new_mirrors_user_into_ambient() {
        let ctx = RunContext::new("carol", "/srv/site");
        assert_eq!(ctx.ambient_user.as_deref(), Some("carol"));
        assert_eq!(ctx.cwd, PathBuf::from("/srv/site"));
    }

    #[test]
    fn without_ambient_user_clears_only_the_snapshot() {
        let ctx = RunContext::new("carol", "/srv/site").without_ambient_user();
        assert_eq!(ctx.user, "carol");
        assert!(ctx.ambient_user.is_none());
    }

    #[test]
    fn config_file_guard_deletes_on_drop() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();
        let guard = ConfigFileGuard::from(file.into_temp_path());
        assert!(guard.path().exists());
        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn config_file_guard_keep_persists() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let guard = ConfigFileGuard::from(file.into_temp_path());
        let kept = guard.keep().unwrap();
        assert!(kept.exists());
        std::fs::remove_file(kept).unwrap();
    }

    #[test]
    fn launch_into_parts_round_trips() {
        let launch = Launch::new(LaunchSpec::new("rserver"));
        let (spec, guard) = launch.into_parts();
        assert_eq!(spec.program, "rserver");
        assert!(guard.is_none());
    }

    #[test]
    fn executable_not_found_display_lists_searched_paths() {
        let err = AdapterError::ExecutableNotFound {
            name: "rserver".into(),
            searched: vec![PathBuf::from("/usr/lib/rstudio-server/bin/rserver")],
        };
        let msg = err.to_string();
        assert!(msg.contains("can not find rserver in PATH"));
        assert!(msg.contains("/usr/lib/rstudio-server/bin/rserver"));
    }
}
