//! Form configuration
//!
//! URL roots used to address the design resource and the pages the form
//! navigates to after a save.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Form configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Prefix of every API resource path, with trailing slash
    pub api_root: String,
    /// Prefix of every page URL, with trailing slash
    pub site_root: String,
    /// Page segment for "save and continue"
    pub next_step_segment: String,
}

impl FormConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With API root
    #[must_use]
    pub fn with_api_root(mut self, root: impl Into<String>) -> Self {
        self.api_root = with_trailing_slash(root.into());
        self
    }

    /// With site root
    #[must_use]
    pub fn with_site_root(mut self, root: impl Into<String>) -> Self {
        self.site_root = with_trailing_slash(root.into());
        self
    }

    /// With next-step page segment
    #[inline]
    #[must_use]
    pub fn with_next_step_segment(mut self, segment: impl Into<String>) -> Self {
        self.next_step_segment = segment.into();
        self
    }

    /// Parse from TOML text; missing keys take their defaults
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for invalid TOML
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        Ok(Self {
            api_root: with_trailing_slash(config.api_root),
            site_root: with_trailing_slash(config.site_root),
            ..config
        })
    }

    /// Read a TOML config file
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Parse`] for invalid TOML
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            api_root: "/api/v1/".to_string(),
            site_root: "/".to_string(),
            next_step_segment: "edit-objectives".to_string(),
        }
    }
}

fn with_trailing_slash(mut root: String) -> String {
    if !root.ends_with('/') {
        root.push('/');
    }
    root
}
