// File: src/config.rs
// Purpose: Recognizer configuration, optionally loaded from TOML

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Engine-wide configuration, fixed at construction
///
/// Two recognizers with different configurations can coexist; nothing here is
/// process-global.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognizerConfig {
    /// Percent-encode dynamic segments when generating and decode them when
    /// recognizing (default: true)
    ///
    /// When disabled, incoming paths are only URI-decoded (reserved escapes kept)
    /// and generated values are emitted verbatim.
    #[serde(default = "default_true")]
    pub encode_and_decode_path_segments: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            encode_and_decode_path_segments: default_true(),
        }
    }
}

impl RecognizerConfig {
    /// Configuration with segment encoding toggled
    pub fn with_encoding(encode_and_decode_path_segments: bool) -> Self {
        Self {
            encode_and_decode_path_segments,
        }
    }

    /// Load configuration from a TOML file
    ///
    /// A missing or empty file yields the default configuration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read recognizer config: {:?}", path))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse recognizer config: {:?}", path))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: RecognizerConfig = toml::from_str(content)?;
        Ok(config)
    }
}
