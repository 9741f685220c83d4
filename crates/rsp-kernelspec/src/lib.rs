// SPDX-License-Identifier: MIT OR Apache-2.0
//! Read-side Jupyter kernelspec discovery.
//!
//! Kernelspecs are `kernel.json` files under `<data dir>/kernels/<name>/` in
//! a small set of well-known directories. This crate walks those directories,
//! parses the spec, and knows how to pull a conda environment prefix out of
//! the argv shape that the `nb_conda_kernels` launcher writes. It never
//! talks to a running notebook server and never writes anything.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from kernelspec lookup and parsing.
#[derive(Debug, Error)]
pub enum KernelSpecError {
    /// No `kernel.json` for the requested kernel in any search directory.
    #[error("kernel '{name}' not found under {searched:?}")]
    NotFound {
        /// Kernel name that was requested.
        name: String,
        /// Data directories that were searched.
        searched: Vec<PathBuf>,
    },

    /// The spec file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path of the unreadable file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The spec file exists but is not valid kernelspec JSON.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Path of the malformed file.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// KernelSpec
// ---------------------------------------------------------------------------

/// The subset of a `kernel.json` the adapters care about.
///
/// Unknown fields are ignored; all known fields default to empty so a sparse
/// spec still parses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KernelSpec {
    /// Command line the kernel is launched with.
    #[serde(default)]
    pub argv: Vec<String>,
    /// Human-readable kernel name.
    #[serde(default)]
    pub display_name: String,
    /// Implementation language, e.g. `"R"`.
    #[serde(default)]
    pub language: String,
}

/// Position of the environment prefix in an `nb_conda_kernels` launcher argv.
///
/// Environment-specific convention of that launcher's generated specs, not a
/// stable contract; [`conda_prefix`] guards the extracted value accordingly.
pub const CONDA_PREFIX_ARGV_INDEX: usize = 4;

/// Extract the conda environment prefix from a spec's argv, if present.
///
/// Returns `None` unless the argument at the conventional index exists and is
/// an absolute path.
pub fn conda_prefix(spec: &KernelSpec) -> Option<PathBuf> {
    let arg = spec.argv.get(CONDA_PREFIX_ARGV_INDEX)?;
    let path = Path::new(arg);
    path.is_absolute().then(|| path.to_path_buf())
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Ordered Jupyter data directories for the current process.
///
/// `JUPYTER_PATH` entries first, then the user data dir (`JUPYTER_DATA_DIR`,
/// else `$HOME/.local/share/jupyter`), then the system-wide locations.
pub fn data_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    if let Some(path) = std::env::var_os("JUPYTER_PATH") {
        dirs.extend(std::env::split_paths(&path).filter(|p| !p.as_os_str().is_empty()));
    }

    match std::env::var_os("JUPYTER_DATA_DIR") {
        Some(dir) if !dir.is_empty() => dirs.push(PathBuf::from(dir)),
        _ => {
            if let Some(home) = std::env::var_os("HOME") {
                dirs.push(PathBuf::from(home).join(".local/share/jupyter"));
            }
        }
    }

    dirs.push(PathBuf::from("/usr/local/share/jupyter"));
    dirs.push(PathBuf::from("/usr/share/jupyter"));
    dirs
}

/// Find a kernel by name in the process's [`data_dirs`].
pub fn find(name: &str) -> Result<KernelSpec, KernelSpecError> {
    find_in(&data_dirs(), name)
}

/// Find a kernel by name in an explicit list of data directories.
///
/// The first directory containing `kernels/<name>/kernel.json` wins; a file
/// that exists but fails to read or parse is a hard error rather than a
/// reason to keep searching.
pub fn find_in(dirs: &[PathBuf], name: &str) -> Result<KernelSpec, KernelSpecError> {
    for dir in dirs {
        let path = dir.join("kernels").join(name).join("kernel.json");
        if !path.exists() {
            debug!(target: "rsp.kernelspec", "no kernelspec at {}", path.display());
            continue;
        }
        let content = std::fs::read_to_string(&path).map_err(|source| KernelSpecError::Read {
            path: path.clone(),
            source,
        })?;
        let spec = serde_json::from_str(&content)
            .map_err(|source| KernelSpecError::Parse { path, source })?;
        return Ok(spec);
    }
    Err(KernelSpecError::NotFound {
        name: name.to_string(),
        searched: dirs.to_vec(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_kernel(root: &Path, name: &str, json: &str) {
        let dir = root.join("kernels").join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("kernel.json"), json).unwrap();
    }

    #[test]
    fn find_in_parses_a_minimal_spec() {
        let tmp = tempfile::tempdir().unwrap();
        write_kernel(
            tmp.path(),
            "ir",
            r#"{"argv": ["R", "--slave"], "display_name": "R", "language": "R"}"#,
        );
        let spec = find_in(&[tmp.path().to_path_buf()], "ir").unwrap();
        assert_eq!(spec.argv, vec!["R", "--slave"]);
        assert_eq!(spec.language, "R");
    }

    #[test]
    fn find_in_ignores_unknown_fields() {
        let tmp = tempfile::tempdir().unwrap();
        write_kernel(
            tmp.path(),
            "ir",
            r#"{"argv": ["R"], "display_name": "R", "language": "R", "metadata": {"debugger": true}}"#,
        );
        assert!(find_in(&[tmp.path().to_path_buf()], "ir").is_ok());
    }

    #[test]
    fn find_in_earlier_directory_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write_kernel(first.path(), "ir", r#"{"display_name": "first"}"#);
        write_kernel(second.path(), "ir", r#"{"display_name": "second"}"#);
        let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        let spec = find_in(&dirs, "ir").unwrap();
        assert_eq!(spec.display_name, "first");
    }

    #[test]
    fn find_in_reports_missing_kernel_with_searched_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let err = find_in(&[tmp.path().to_path_buf()], "ir").unwrap_err();
        match err {
            KernelSpecError::NotFound { name, searched } => {
                assert_eq!(name, "ir");
                assert_eq!(searched, vec![tmp.path().to_path_buf()]);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn find_in_malformed_json_is_a_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        write_kernel(tmp.path(), "ir", "{not json");
        let err = find_in(&[tmp.path().to_path_buf()], "ir").unwrap_err();
        assert!(matches!(err, KernelSpecError::Parse { .. }));
    }

    #[test]
    fn find_in_wrong_shape_is_a_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        write_kernel(tmp.path(), "ir", r#"{"argv": "not-a-list"}"#);
        let err = find_in(&[tmp.path().to_path_buf()], "ir").unwrap_err();
        assert!(matches!(err, KernelSpecError::Parse { .. }));
    }

    #[test]
    fn conda_prefix_extracts_absolute_path_at_index_four() {
        let spec = KernelSpec {
            argv: [
                "python",
                "-m",
                "nb_conda_kernels.runner",
                "/opt/conda",
                "/opt/conda/envs/r-env",
                "-f",
                "{connection_file}",
            ]
            .map(String::from)
            .to_vec(),
            display_name: "R [conda env:r-env]".into(),
            language: "R".into(),
        };
        assert_eq!(
            conda_prefix(&spec),
            Some(PathBuf::from("/opt/conda/envs/r-env"))
        );
    }

    #[test]
    fn conda_prefix_rejects_relative_argument() {
        let spec = KernelSpec {
            argv: ["a", "b", "c", "d", "not-a-path"].map(String::from).to_vec(),
            display_name: String::new(),
            language: String::new(),
        };
        assert_eq!(conda_prefix(&spec), None);
    }

    #[test]
    fn conda_prefix_rejects_short_argv() {
        let spec = KernelSpec {
            argv: vec!["R".into()],
            display_name: String::new(),
            language: String::new(),
        };
        assert_eq!(conda_prefix(&spec), None);
    }
}
