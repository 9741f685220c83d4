// SPDX-License-Identifier: MIT OR Apache-2.0
//! Executable discovery for the proxy adapters.
//!
//! Two layers: [`which`] answers "is this on `PATH`?" the way a shell would,
//! and [`resolve`] adds the ordered hard-coded fallback locations that
//! packaged server installs use (e.g. the rstudio-server deb puts `rserver`
//! outside `PATH`). A miss on every strategy is a hard error carrying the
//! full list of locations tried.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error returned when an executable cannot be located anywhere.
#[derive(Debug, Error)]
#[error("can not find {name} in PATH (also tried {searched:?})")]
pub struct NotFound {
    /// Executable name that was looked up.
    pub name: String,
    /// Fallback paths probed after the PATH lookup failed.
    pub searched: Vec<PathBuf>,
}

/// Locate an executable by name on the ambient `PATH`.
///
/// Names containing a path separator are treated as direct paths and only
/// checked for existence.
pub fn which(bin: &str) -> Option<PathBuf> {
    which_in(bin, std::env::var_os("PATH").as_deref())
}

/// [`which`] against an explicit `PATH` value instead of the ambient one.
pub fn which_in(bin: &str, path: Option<&OsStr>) -> Option<PathBuf> {
    let candidate = Path::new(bin);
    if candidate.components().count() > 1 {
        return candidate.exists().then(|| candidate.to_path_buf());
    }

    let path = path?;
    std::env::split_paths(path).find_map(|dir| probe_dir(&dir, bin))
}

/// Return `true` when `command` resolves via [`which`].
pub fn command_exists(command: &str) -> bool {
    which(command).is_some()
}

/// Resolve `bin` via `PATH`, then via the given fallback paths in order.
///
/// The PATH hit is returned as the bare name (the host's spawner re-resolves
/// it); a fallback hit is returned as the absolute path that exists. When
/// everything misses, the error lists every fallback that was probed — there
/// is no retry and no further strategy.
pub fn resolve(bin: &str, fallbacks: &[&Path]) -> Result<PathBuf, NotFound> {
    resolve_in(bin, std::env::var_os("PATH").as_deref(), fallbacks)
}

/// [`resolve`] against an explicit `PATH` value instead of the ambient one.
pub fn resolve_in(
    bin: &str,
    path: Option<&OsStr>,
    fallbacks: &[&Path],
) -> Result<PathBuf, NotFound> {
    if which_in(bin, path).is_some() {
        return Ok(PathBuf::from(bin));
    }
    for fallback in fallbacks {
        if fallback.exists() {
            return Ok(fallback.to_path_buf());
        }
    }
    Err(NotFound {
        name: bin.to_string(),
        searched: fallbacks.iter().map(|p| p.to_path_buf()).collect(),
    })
}

fn probe_dir(dir: &Path, command: &str) -> Option<PathBuf> {
    let direct = dir.join(command);
    if direct.exists() {
        return Some(direct);
    }

    if !cfg!(windows) {
        return None;
    }

    // Windows resolves extensions from PATHEXT; probe the common ones.
    [".exe", ".cmd", ".bat", ".com"]
        .into_iter()
        .map(|ext| dir.join(format!("{command}{ext}")))
        .find(|candidate| candidate.exists())
}
