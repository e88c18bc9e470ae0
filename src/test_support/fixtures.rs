//! Test fixtures: throwaway project trees.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use crate::core::{BuildSettings, ProjectPaths, ToolLocations};
use crate::ops::StageContext;
use crate::util::process::ProcessRunner;
use crate::util::shell::{ColorChoice, Shell, Verbosity};

/// A temporary project root with a bootstrap script in place.
pub struct ProjectFixture {
    _dir: TempDir,
    pub paths: ProjectPaths,
    pub tools: ToolLocations,
    pub settings: BuildSettings,
}

impl ProjectFixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("conanfile.py"), "").unwrap();
        let bootstrap = dir.path().join("vcvarsall.bat");
        fs::write(&bootstrap, "@echo off\n").unwrap();

        ProjectFixture {
            paths: ProjectPaths::from_root(dir.path()),
            tools: ToolLocations::new(bootstrap)
                .with_instrumentation_artifact(dir.path().join("asan_runtime.dll")),
            settings: BuildSettings::default(),
            _dir: dir,
        }
    }

    /// Fixture whose bootstrap script does not exist.
    pub fn without_bootstrap() -> Self {
        let fixture = ProjectFixture::new();
        fs::remove_file(fixture.tools.bootstrap_script()).unwrap();
        fixture
    }

    /// Create the Ninja directory, as a previous successful generate would.
    pub fn mark_generated(&self) {
        fs::create_dir_all(self.paths.ninja_dir()).unwrap();
    }

    /// Stage context over this fixture.
    pub fn context<'a>(
        &'a self,
        runner: &'a dyn ProcessRunner,
        shell: &'a Arc<Shell>,
    ) -> StageContext<'a> {
        StageContext {
            paths: &self.paths,
            tools: &self.tools,
            settings: &self.settings,
            runner,
            shell,
        }
    }

    /// Put the sanitizer runtime at its configured location.
    pub fn add_instrumentation_artifact(&self) -> PathBuf {
        let path = self.tools.instrumentation_artifact().unwrap().to_path_buf();
        fs::write(&path, b"runtime").unwrap();
        path
    }
}

/// A shell that prints only errors and warnings.
pub fn quiet_shell() -> Arc<Shell> {
    Arc::new(Shell::new(Verbosity::Quiet, ColorChoice::Never))
}
