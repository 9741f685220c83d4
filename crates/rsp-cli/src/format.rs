// SPDX-License-Identifier: MIT OR Apache-2.0
//! Output formatting for the `rsp` CLI.

use anyhow::Result;
use serde::Serialize;
use std::fmt;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable multi-line text.
    Text,
    /// Compact JSON (single line).
    Json,
    /// Pretty-printed JSON.
    JsonPretty,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::JsonPretty => "json-pretty",
        };
        f.write_str(s)
    }
}

impl OutputFormat {
    /// Serialize `value` according to the JSON flavor of this format.
    ///
    /// Callers handle [`OutputFormat::Text`] themselves; asking for JSON from
    /// the text format is a bug, so this returns compact JSON in that case
    /// too rather than panicking.
    pub fn to_json<T: Serialize>(self, value: &T) -> Result<String> {
        let s = match self {
            Self::JsonPretty => serde_json::to_string_pretty(value)?,
            _ => serde_json::to_string(value)?,
        };
        Ok(s)
    }

    /// `true` for the JSON flavors.
    pub fn is_json(self) -> bool {
        !matches!(self, Self::Text)
    }
}
