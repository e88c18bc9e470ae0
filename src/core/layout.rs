//! Filesystem layout derived from the project root.

use std::path::{Path, PathBuf};

/// Name of the build directory under the project root.
pub const BUILD_DIR: &str = "build";

/// Ninja project directory under the build directory.
pub const NINJA_DIR: &str = "ninja";

/// IDE project directory under the build directory.
pub const IDE_PROJECT_DIR: &str = "project";

/// Directories the pipeline works in.
///
/// Nothing here is created on construction; stages ensure the directories
/// they need when they run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    root: PathBuf,
    build_dir: PathBuf,
    ninja_dir: PathBuf,
    ide_project_dir: PathBuf,
}

impl ProjectPaths {
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let build_dir = root.join(BUILD_DIR);
        ProjectPaths {
            ninja_dir: build_dir.join(NINJA_DIR),
            ide_project_dir: build_dir.join(IDE_PROJECT_DIR),
            build_dir,
            root,
        }
    }

    /// Source root containing `conanfile.py` and `CMakeLists.txt`.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Intermediate project consumed by `ninja`.
    pub fn ninja_dir(&self) -> &Path {
        &self.ninja_dir
    }

    /// Secondary project for the IDE.
    pub fn ide_project_dir(&self) -> &Path {
        &self.ide_project_dir
    }
}
