//! Settings for building and baseline-testing the grammars
//!
//! Three layers, later ones winning: the `defaults/fglg.default.toml` compiled
//! into the crate, a project `fglg.toml` (explicit or picked up from the working
//! directory), then per-key overrides from command-line flags. [`Loader`] stacks
//! them and deserializes the result into [`Settings`].

use crate::grammar::{GrammarKind, GrammarLoader, OutputFormat};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const DEFAULT_TOML: &str = include_str!("../defaults/fglg.default.toml");

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub build: BuildSettings,
    pub grammars: GrammarsSettings,
    pub baselines: BaselineSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildSettings {
    /// Directory the built grammars are written to
    pub output_dir: PathBuf,
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GrammarsSettings {
    pub source: GrammarSettings,
    pub form: GrammarSettings,
}

impl GrammarsSettings {
    pub fn get(&self, kind: GrammarKind) -> &GrammarSettings {
        match kind {
            GrammarKind::Source => &self.source,
            GrammarKind::Form => &self.form,
        }
    }
}

/// Where one grammar is read from and written to
#[derive(Debug, Clone, Deserialize)]
pub struct GrammarSettings {
    /// YAML grammar document
    pub source: PathBuf,
    /// Output file name, relative to `build.output_dir`
    pub output: PathBuf,
    /// Variable overrides applied before resolution
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

impl GrammarSettings {
    /// Loader carrying this grammar's variable overrides
    pub fn loader(&self) -> GrammarLoader {
        GrammarLoader::new().with_overrides(self.variables.clone())
    }

    /// File name shown in baseline banners
    pub fn display_name(&self) -> String {
        self.output
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.output.display().to_string())
    }
}

/// Folder layout of the baseline suite
#[derive(Debug, Clone, Deserialize)]
pub struct BaselineSettings {
    pub cases: PathBuf,
    pub baselines: PathBuf,
    pub generated: PathBuf,
}

impl Settings {
    /// Path a grammar kind is built to
    pub fn output_path(&self, kind: GrammarKind) -> PathBuf {
        self.build.output_dir.join(&self.grammars.get(kind).output)
    }
}

/// Stacks the settings layers, starting from the compiled-in defaults
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a project file the user asked for; `build` fails if it is missing.
    pub fn with_file(self, path: impl AsRef<Path>) -> Self {
        self.layer(path.as_ref(), true)
    }

    /// Layer a project file only if it exists, e.g. `./fglg.toml`.
    pub fn with_optional_file(self, path: impl AsRef<Path>) -> Self {
        self.layer(path.as_ref(), false)
    }

    fn layer(mut self, path: &Path, required: bool) -> Self {
        let source = File::from(path).format(FileFormat::Toml).required(required);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Override one dotted key, such as `build.format` from `--format`.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<Settings, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Settings with no project file and no overrides
pub fn load_defaults() -> Result<Settings, ConfigError> {
    Loader::new().build()
}
