// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration loading, validation, and merging for rsession-proxy.
//!
//! This crate provides [`ProxyConfig`] — the settings both adapters consume —
//! together with helpers for loading from TOML files, applying `RSP_*`
//! environment overrides, merging overlays, and producing advisory
//! [`ConfigWarning`]s. Adapters take a config value instead of consulting
//! ambient process state at call time.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },

    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Advisory-level issues that do not prevent operation but deserve attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A recommended optional field is missing.
    MissingOptionalField {
        /// Name of the missing field.
        field: String,
        /// Why it matters.
        hint: String,
    },
    /// A path-valued field holds a relative path.
    RelativePath {
        /// Name of the field.
        field: String,
        /// The configured value.
        value: String,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::MissingOptionalField { field, hint } => {
                write!(f, "missing optional field '{field}': {hint}")
            }
            ConfigWarning::RelativePath { field, value } => {
                write!(f, "'{field}' is a relative path ({value})")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Top-level configuration for both proxy adapters.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Log level override (e.g. `"debug"`, `"info"`, `"warn"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// RStudio Server adapter settings.
    #[serde(default)]
    pub rstudio: RStudioSection,

    /// Shiny Server adapter settings.
    #[serde(default)]
    pub shiny: ShinySection,
}

/// Settings consumed by the RStudio adapter.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct RStudioSection {
    /// Explicit `rserver` location, skipping PATH/fallback discovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rserver_path: Option<String>,

    /// Session launcher script passed as `--rsession-path`.
    #[serde(default = "default_rsession_path")]
    pub rsession_path: String,

    /// Kernel whose conda environment supplies the R interpreter.
    #[serde(default = "default_kernel")]
    pub default_kernel: String,
}

impl Default for RStudioSection {
    fn default() -> Self {
        Self {
            rserver_path: None,
            rsession_path: default_rsession_path(),
            default_kernel: default_kernel(),
        }
    }
}

/// Settings consumed by the Shiny adapter.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct ShinySection {
    /// Site root served by Shiny Server; defaults to the launch context's
    /// working directory when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default `--rsession-path` value; not verified to exist at this layer.
pub const DEFAULT_RSESSION_PATH: &str = "/usr/local/bin/rsession-launcher";

/// Default kernel consulted for an R interpreter (IRkernel's registered name).
pub const DEFAULT_KERNEL: &str = "ir";

/// Recognised log levels.
const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

fn default_rsession_path() -> String {
    DEFAULT_RSESSION_PATH.to_string()
}

fn default_kernel() -> String {
    DEFAULT_KERNEL.to_string()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a [`ProxyConfig`] from an optional TOML file path.
///
/// * If `path` is `Some`, reads and parses the file.
/// * If `path` is `None`, returns [`ProxyConfig::default()`].
///
/// Environment variable overrides are applied on top in both cases.
pub fn load_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|_| ConfigError::FileNotFound {
                path: p.display().to_string(),
            })?;
            parse_toml(&content)?
        }
        None => ProxyConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Parse a TOML string into a [`ProxyConfig`].
pub fn parse_toml(content: &str) -> Result<ProxyConfig, ConfigError> {
    toml::from_str::<ProxyConfig>(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Env overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides.
///
/// Recognised variables:
/// - `RSP_LOG_LEVEL`
/// - `RSP_RSERVER_PATH`
/// - `RSP_RSESSION_PATH`
/// - `RSP_DEFAULT_KERNEL`
/// - `RSP_SHINY_SITE_DIR`
pub fn apply_env_overrides(config: &mut ProxyConfig) {
    if let Ok(val) = std::env::var("RSP_LOG_LEVEL") {
        config.log_level = Some(val);
    }
    if let Ok(val) = std::env::var("RSP_RSERVER_PATH") {
        config.rstudio.rserver_path = Some(val);
    }
    if let Ok(val) = std::env::var("RSP_RSESSION_PATH") {
        config.rstudio.rsession_path = val;
    }
    if let Ok(val) = std::env::var("RSP_DEFAULT_KERNEL") {
        config.rstudio.default_kernel = val;
    }
    if let Ok(val) = std::env::var("RSP_SHINY_SITE_DIR") {
        config.shiny.site_dir = Some(val);
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a parsed configuration, returning advisory warnings.
///
/// Hard errors (unknown log level, empty overrides) come back as a
/// [`ConfigError::ValidationError`]; soft issues come back as warnings.
pub fn validate_config(config: &ProxyConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<ConfigWarning> = Vec::new();

    if let Some(ref level) = config.log_level
        && !VALID_LOG_LEVELS.contains(&level.as_str())
    {
        errors.push(format!("invalid log_level '{level}'"));
    }

    if let Some(ref path) = config.rstudio.rserver_path {
        if path.trim().is_empty() {
            errors.push("rstudio.rserver_path must not be empty when set".into());
        } else if !Path::new(path).is_absolute() {
            warnings.push(ConfigWarning::RelativePath {
                field: "rstudio.rserver_path".into(),
                value: path.clone(),
            });
        }
    }

    if config.rstudio.rsession_path.trim().is_empty() {
        errors.push("rstudio.rsession_path must not be empty".into());
    } else if !Path::new(&config.rstudio.rsession_path).is_absolute() {
        warnings.push(ConfigWarning::RelativePath {
            field: "rstudio.rsession_path".into(),
            value: config.rstudio.rsession_path.clone(),
        });
    }

    if config.rstudio.default_kernel.trim().is_empty() {
        errors.push("rstudio.default_kernel must not be empty".into());
    }

    if config.shiny.site_dir.is_none() {
        warnings.push(ConfigWarning::MissingOptionalField {
            field: "shiny.site_dir".into(),
            hint: "the working directory of the launching process is served".into(),
        });
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::ValidationError { reasons: errors })
    }
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

/// Merge two configurations. Values in `overlay` take precedence over `base`.
///
/// Optional fields fall back to the base value; required fields (which always
/// carry a default) take the overlay value as-is.
pub fn merge_configs(base: ProxyConfig, overlay: ProxyConfig) -> ProxyConfig {
    ProxyConfig {
        log_level: overlay.log_level.or(base.log_level),
        rstudio: RStudioSection {
            rserver_path: overlay.rstudio.rserver_path.or(base.rstudio.rserver_path),
            rsession_path: overlay.rstudio.rsession_path,
            default_kernel: overlay.rstudio.default_kernel,
        },
        shiny: ShinySection {
            site_dir: overlay.shiny.site_dir.or(base.shiny.site_dir),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
