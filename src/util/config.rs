//! Configuration file support.
//!
//! Two optional files are read:
//! - Global: `<config dir>/stagehand/config.toml` - machine-wide tool paths
//! - Project: `<root>/stagehand.toml` - project overrides
//!
//! Project config takes precedence over global config, and command-line
//! flags take precedence over both. The merged result is resolved once into
//! [`ToolLocations`] and [`BuildSettings`], which never change afterwards.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::settings::{DEFAULT_BOOTSTRAP_SCRIPT, DEFAULT_INSTRUMENTATION_ARTIFACT};
use crate::core::{BuildSettings, BuildVariant, ToolLocations};

/// File name of the project configuration.
pub const PROJECT_CONFIG_FILE: &str = "stagehand.toml";

/// Stagehand configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External tool paths
    pub tools: ToolsConfig,

    /// Build parameters
    pub build: BuildConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Environment bootstrap script (vcvarsall.bat)
    pub bootstrap_script: Option<PathBuf>,

    /// Sanitizer runtime copied next to the build output
    pub instrumentation_artifact: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Architecture tag for the bootstrap script (e.g. "x64")
    pub arch: Option<String>,

    /// CMake build type
    pub variant: Option<BuildVariant>,

    /// Build with AddressSanitizer
    pub sanitizer: Option<bool>,
}

/// Command-line values that override the config files.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bootstrap_script: Option<PathBuf>,
    pub arch: Option<String>,
    pub release: bool,
    pub sanitizer: bool,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.tools.bootstrap_script.is_some() {
            self.tools.bootstrap_script = other.tools.bootstrap_script;
        }
        if other.tools.instrumentation_artifact.is_some() {
            self.tools.instrumentation_artifact = other.tools.instrumentation_artifact;
        }
        if other.build.arch.is_some() {
            self.build.arch = other.build.arch;
        }
        if other.build.variant.is_some() {
            self.build.variant = other.build.variant;
        }
        if other.build.sanitizer.is_some() {
            self.build.sanitizer = other.build.sanitizer;
        }
    }

    /// Resolve tool locations, applying defaults and command-line overrides.
    ///
    /// Relative paths from config files are taken relative to the project root.
    pub fn tool_locations(&self, root: &Path, overrides: &Overrides) -> ToolLocations {
        let bootstrap = overrides
            .bootstrap_script
            .clone()
            .or_else(|| self.tools.bootstrap_script.as_ref().map(|p| root.join(p)))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BOOTSTRAP_SCRIPT));
        let artifact = self
            .tools
            .instrumentation_artifact
            .as_ref()
            .map(|p| root.join(p))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INSTRUMENTATION_ARTIFACT));

        ToolLocations::new(bootstrap).with_instrumentation_artifact(artifact)
    }

    /// Resolve build settings, applying defaults and command-line overrides.
    pub fn build_settings(&self, overrides: &Overrides) -> BuildSettings {
        let defaults = BuildSettings::default();
        let variant = if overrides.release {
            BuildVariant::Release
        } else {
            self.build.variant.unwrap_or(defaults.variant)
        };

        BuildSettings {
            arch: overrides
                .arch
                .clone()
                .or_else(|| self.build.arch.clone())
                .unwrap_or(defaults.arch),
            variant,
            sanitizer: overrides.sanitizer || self.build.sanitizer.unwrap_or(defaults.sanitizer),
        }
    }
}

/// Load and merge global and project configuration.
///
/// Missing files are skipped; a file that exists but does not parse is an error.
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_path.filter(|p| p.exists()) {
        tracing::debug!("loading global config from {}", global_path.display());
        config.merge(Config::load(global_path)?);
    }

    if project_path.exists() {
        tracing::debug!("loading project config from {}", project_path.display());
        config.merge(Config::load(project_path)?);
    }

    Ok(config)
}
