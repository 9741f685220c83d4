// SPDX-License-Identifier: MIT OR Apache-2.0
//! RStudio Server launch-spec adapter.
//!
//! Three concerns meet here: finding an `rserver` binary (PATH, then the
//! packaged-install fallback — a miss is fatal), deciding which R interpreter
//! `rsession` should run (best effort via the configured kernel's conda
//! environment, degrading to `R` on the ambient PATH), and making sure the
//! spawned server sees a `USER` variable (it authenticates against it and
//! throws up a login page otherwise).

#![deny(unsafe_code)]
#![warn(missing_docs)]

use rsp_config::{ProxyConfig, RStudioSection};
use rsp_core::{AdapterError, Launch, LaunchSpec, LauncherEntry, RunContext, ServerAdapter};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Executable name looked up on PATH.
pub const RSERVER_BIN: &str = "rserver";

/// Launcher UI title.
pub const TITLE: &str = "RStudio";

/// Interpreter handed to `--rsession-which-r` when resolution degrades;
/// resolved from the session's PATH by rsession itself.
pub const FALLBACK_R: &str = "R";

/// Locations probed after the PATH lookup misses.
///
/// Currently just the rstudio-server deb layout; package-version-specific,
/// not a stable contract.
pub const RSERVER_FALLBACKS: &[&str] = &["/usr/lib/rstudio-server/bin/rserver"];

// ---------------------------------------------------------------------------
// R interpreter resolution
// ---------------------------------------------------------------------------

/// Outcome of the best-effort R interpreter lookup.
///
/// `Fallback` is a normal result, not an error: the reason is logged once at
/// the adapter boundary and the launch proceeds with [`FALLBACK_R`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RResolution {
    /// A concrete interpreter derived from the kernel's conda environment.
    Resolved(PathBuf),
    /// No interpreter could be derived; `R` from the ambient PATH is used.
    Fallback {
        /// Why resolution did not produce a path.
        reason: String,
    },
}

impl RResolution {
    /// The value passed to `--rsession-which-r`.
    pub fn interpreter(&self) -> String {
        match self {
            RResolution::Resolved(path) => path.display().to_string(),
            RResolution::Fallback { .. } => FALLBACK_R.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Builds launch specifications for RStudio Server.
#[derive(Debug, Clone)]
pub struct RStudioAdapter {
    rserver_path: Option<PathBuf>,
    rsession_path: String,
    default_kernel: String,
}

impl Default for RStudioAdapter {
    fn default() -> Self {
        Self::from_section(&RStudioSection::default())
    }
}

impl RStudioAdapter {
    /// Adapter with default settings (full discovery, stock paths).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapter honoring the `[rstudio]` section of a [`ProxyConfig`].
    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::from_section(&config.rstudio)
    }

    fn from_section(section: &RStudioSection) -> Self {
        Self {
            rserver_path: section.rserver_path.as_ref().map(PathBuf::from),
            rsession_path: section.rsession_path.clone(),
            default_kernel: section.default_kernel.clone(),
        }
    }

    /// Environment overrides for the spawned server.
    ///
    /// Returns `USER` when the context recorded none; otherwise empty. The
    /// override travels in the launch spec — nothing here mutates the
    /// process environment.
    pub fn environment(&self, ctx: &RunContext) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        if ctx.ambient_user.is_none() {
            env.insert("USER".to_string(), ctx.user.clone());
        }
        env
    }

    /// Locate the `rserver` binary.
    ///
    /// A configured override is taken at face value; otherwise PATH first,
    /// then [`RSERVER_FALLBACKS`] in order. A miss everywhere is fatal and
    /// propagates — no retry, no alternate strategy.
    pub fn locate_rserver(&self) -> Result<PathBuf, AdapterError> {
        if let Some(path) = &self.rserver_path {
            return Ok(path.clone());
        }
        let fallbacks: Vec<&Path> = RSERVER_FALLBACKS.iter().map(Path::new).collect();
        rsp_which::resolve(RSERVER_BIN, &fallbacks).map_err(|e| {
            AdapterError::ExecutableNotFound {
                name: e.name,
                searched: e.searched,
            }
        })
    }

    /// Resolve the R interpreter from the configured kernel's conda
    /// environment, searching the process's Jupyter data directories.
    pub fn resolve_r(&self) -> RResolution {
        self.resolve_r_in(&rsp_kernelspec::data_dirs())
    }

    /// [`resolve_r`](Self::resolve_r) against explicit data directories.
    pub fn resolve_r_in(&self, dirs: &[PathBuf]) -> RResolution {
        let spec = match rsp_kernelspec::find_in(dirs, &self.default_kernel) {
            Ok(spec) => spec,
            Err(e) => {
                return RResolution::Fallback {
                    reason: e.to_string(),
                };
            }
        };
        match rsp_kernelspec::conda_prefix(&spec) {
            Some(prefix) => RResolution::Resolved(prefix.join("bin").join("R")),
            None => RResolution::Fallback {
                reason: format!(
                    "kernel '{}' does not embed a conda environment prefix",
                    self.default_kernel
                ),
            },
        }
    }
}

impl ServerAdapter for RStudioAdapter {
    fn name(&self) -> &str {
        "rstudio"
    }

    fn launcher_entry(&self) -> LauncherEntry {
        LauncherEntry::new(TITLE, icon_dir().join("rstudio.svg"))
    }

    fn launch(&self, ctx: &RunContext, port: u16) -> Result<Launch, AdapterError> {
        let rserver = self.locate_rserver()?;

        let which_r = match self.resolve_r() {
            RResolution::Resolved(path) => path.display().to_string(),
            RResolution::Fallback { reason } => {
                warn!(
                    target: "rsp.rstudio",
                    "no R interpreter resolved, using '{FALLBACK_R}' from PATH: {reason}"
                );
                FALLBACK_R.to_string()
            }
        };

        let mut spec = LaunchSpec::new(rserver.display().to_string())
            .arg(format!("--www-port={port}"))
            .arg(format!("--rsession-which-r={which_r}"))
            .arg(format!("--rsession-path={}", self.rsession_path));
        spec.env = self.environment(ctx);

        Ok(Launch::new(spec))
    }
}

/// Icon directory shipped with this crate.
fn icon_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("icons")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
