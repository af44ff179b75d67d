//! Shared configuration loader for the trig toolchain.
//!
//! `defaults/trig.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer user-specific files on top
//! of those defaults via [`Loader`] before deserializing into [`TrigConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/trig.default.toml");

/// Top-level configuration consumed by trig applications.
#[derive(Debug, Clone, Deserialize)]
pub struct TrigConfig {
    pub output: OutputConfig,
    pub cache: CacheConfig,
    #[serde(default)]
    pub strings: StringsConfig,
}

/// Where the compiled tree and both string tables are written.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub directory: String,
    pub tree: String,
    pub label_strings: String,
    pub value_strings: String,
    pub xml_declaration: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub extension: String,
}

impl CacheConfig {
    /// The cache extension when caching is on.
    pub fn extension(&self) -> Option<&str> {
        self.enabled.then_some(self.extension.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StringsConfig {
    #[serde(default)]
    pub value_preamble: Vec<StringRow>,
}

/// One fixed `key=value` row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StringRow {
    pub key: String,
    pub value: String,
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<TrigConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<TrigConfig, ConfigError> {
    Loader::new().build()
}
