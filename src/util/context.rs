//! Global context: working directory, project root and config locations.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use crate::core::ProjectPaths;
use crate::util::config::PROJECT_CONFIG_FILE;
use crate::util::fs::normalize_path;

/// Files that mark a project root, checked in order.
const ROOT_MARKERS: &[&str] = &[PROJECT_CONFIG_FILE, "conanfile.py"];

static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("", "", "stagehand"));

/// Global context containing paths resolved at startup.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    cwd: PathBuf,
    root: PathBuf,
}

impl GlobalContext {
    /// Create a context, using `root` if given or discovering it from the current directory.
    pub fn new(root: Option<PathBuf>) -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        let root = match root {
            Some(root) => normalize_path(&cwd.join(root)),
            None => find_project_root(&cwd).unwrap_or_else(|| cwd.clone()),
        };
        tracing::debug!("project root: {}", root.display());
        Ok(GlobalContext { cwd, root })
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project_paths(&self) -> ProjectPaths {
        ProjectPaths::from_root(&self.root)
    }

    /// Path of the project configuration file.
    pub fn project_config_path(&self) -> PathBuf {
        self.root.join(PROJECT_CONFIG_FILE)
    }

    /// Path of the global configuration file, if the platform has a config directory.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        PROJECT_DIRS
            .as_ref()
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Walk up from `start` to the first directory containing a root marker.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| ROOT_MARKERS.iter().any(|marker| dir.join(marker).is_file()))
        .map(Path::to_path_buf)
}
