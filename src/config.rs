//! Configuration loading
//!
//! `defaults/algorithmic.default.toml` is embedded into the binary so that documentation and
//! runtime behavior stay in sync. Callers layer user files and command-line overrides on top
//! of those defaults via [`Loader`] before deserializing into [`AlgorithmicConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/algorithmic.default.toml");

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AlgorithmicConfig {
    pub render: RenderConfig,
    #[serde(default)]
    pub rules: RulesConfig,
}

/// Document wrapper and diagnostics switches
#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    pub preamble: bool,
    pub new_style: bool,
    pub prologue: bool,
    pub dump_unhandled: bool,
}

/// Rule set extensions applied to every rendering session
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulesConfig {
    #[serde(default)]
    pub globals: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<PatternConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PatternConfig {
    pub pattern: String,
    pub template: String,
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

    /// Apply a single key/value override, e.g. `render.preamble` from a CLI flag.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<AlgorithmicConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<AlgorithmicConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_default_config() {
        let config = load_defaults().expect("defaults to deserialize");
        assert!(!config.render.preamble);
        assert!(!config.render.new_style);
        assert!(config.render.prologue);
        assert!(config.rules.globals.is_empty());
        assert!(config.rules.patterns.is_empty());
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("render.preamble", true)
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert!(config.render.preamble);
    }

    #[test]
    fn layers_rule_tables_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        file.write_all(
            br#"
[render]
new_style = true

[rules]
globals = ["sorted"]

[[rules.patterns]]
pattern = "sorted(a)"
template = '\text{sort $#a$}'
"#,
        )
        .expect("write config");

        let config = Loader::new().with_file(file.path()).build().expect("config to build");
        assert!(config.render.new_style);
        assert!(config.render.prologue);
        assert_eq!(config.rules.globals, vec!["sorted".to_string()]);
        assert_eq!(
            config.rules.patterns,
            vec![PatternConfig {
                pattern: "sorted(a)".to_string(),
                template: r"\text{sort $#a$}".to_string(),
            }]
        );
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let result = Loader::new().with_file("/nonexistent/algorithmic.toml").build();
        assert!(result.is_err());
    }
}
