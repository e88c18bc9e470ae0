//! Tool locations and build parameters.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default `vcvarsall.bat` of a Visual Studio 2022 Community install.
pub const DEFAULT_BOOTSTRAP_SCRIPT: &str =
    r"C:\Program Files\Microsoft Visual Studio\2022\Community\VC\Auxiliary\Build\vcvarsall.bat";

/// Default x64 AddressSanitizer runtime shipped with MSVC.
pub const DEFAULT_INSTRUMENTATION_ARTIFACT: &str = r"C:\Program Files\Microsoft Visual Studio\2022\Community\VC\Tools\MSVC\14.44.35207\bin\Hostx64\x64\clang_rt.asan_dynamic-x86_64.dll";

/// Default architecture tag passed to the bootstrap script.
pub const DEFAULT_ARCH: &str = "x64";

/// External tools the pipeline depends on by path rather than by `PATH` lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolLocations {
    bootstrap_script: PathBuf,
    instrumentation_artifact: Option<PathBuf>,
}

impl ToolLocations {
    pub fn new(bootstrap_script: impl Into<PathBuf>) -> Self {
        ToolLocations {
            bootstrap_script: bootstrap_script.into(),
            instrumentation_artifact: None,
        }
    }

    /// Runtime library copied next to the build output when it exists.
    pub fn with_instrumentation_artifact(mut self, path: impl Into<PathBuf>) -> Self {
        self.instrumentation_artifact = Some(path.into());
        self
    }

    /// Script that initializes the compiler environment for an architecture.
    pub fn bootstrap_script(&self) -> &Path {
        &self.bootstrap_script
    }

    pub fn instrumentation_artifact(&self) -> Option<&Path> {
        self.instrumentation_artifact.as_deref()
    }
}

/// CMake build type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BuildVariant {
    #[default]
    Debug,
    Release,
    RelWithDebInfo,
    MinSizeRel,
}

impl BuildVariant {
    /// Spelling shared by conan's `build_type` setting and `CMAKE_BUILD_TYPE`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildVariant::Debug => "Debug",
            BuildVariant::Release => "Release",
            BuildVariant::RelWithDebInfo => "RelWithDebInfo",
            BuildVariant::MinSizeRel => "MinSizeRel",
        }
    }
}

impl fmt::Display for BuildVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters that determine every external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    pub arch: String,
    pub variant: BuildVariant,
    pub sanitizer: bool,
}

impl BuildSettings {
    /// Value of the `USE_ASAN` CMake option.
    pub fn sanitizer_flag(&self) -> &'static str {
        if self.sanitizer {
            "ON"
        } else {
            "OFF"
        }
    }
}

impl Default for BuildSettings {
    fn default() -> Self {
        BuildSettings {
            arch: DEFAULT_ARCH.to_string(),
            variant: BuildVariant::Debug,
            sanitizer: false,
        }
    }
}
