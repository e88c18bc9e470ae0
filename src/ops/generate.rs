//! Project generation: conan install, then the IDE and Ninja CMake projects.

use crate::core::{BuildSettings, CommandLine, ProjectPaths};
use crate::ops::{StageContext, StageFailure};
use crate::util::diagnostic::BestEffort;
use crate::util::fs::{ensure_dir, remove_dir_all_if_exists};
use crate::util::shell::Status;

/// CMake generator for the IDE project.
pub const IDE_GENERATOR: &str = "Visual Studio 17 2022";

/// CMake generator for the project the build runner consumes.
pub const NINJA_GENERATOR: &str = "Ninja";

/// `conan install <root> --build=missing --settings build_type=<variant>`
pub fn conan_install_command(paths: &ProjectPaths, settings: &BuildSettings) -> CommandLine {
    CommandLine::new("conan")
        .arg("install")
        .arg(paths.root())
        .arg("--build=missing")
        .arg("--settings")
        .arg(format!("build_type={}", settings.variant))
}

/// CMake invocation producing the IDE project.
pub fn ide_project_command(paths: &ProjectPaths) -> CommandLine {
    CommandLine::new("cmake")
        .args(["-G", IDE_GENERATOR])
        .arg("-S")
        .arg(paths.root())
        .arg("-B")
        .arg(paths.ide_project_dir())
}

/// CMake invocation producing the Ninja project. Runs inside the bootstrapped environment.
pub fn ninja_project_command(paths: &ProjectPaths, settings: &BuildSettings) -> CommandLine {
    CommandLine::new("cmake")
        .args(["-G", NINJA_GENERATOR])
        .arg("-S")
        .arg(paths.root())
        .arg("-B")
        .arg(paths.ninja_dir())
        .arg(format!("-DCMAKE_BUILD_TYPE={}", settings.variant))
        .arg(format!("-DUSE_ASAN={}", settings.sanitizer_flag()))
}

/// Install dependencies and generate both CMake projects.
///
/// Each step runs only if the previous one succeeded. Files left behind by a
/// failed step are kept for inspection.
pub fn generate(ctx: &StageContext<'_>) -> Result<(), StageFailure> {
    let span = ctx.shell.span(
        Status::Generating,
        format!("{} project ({})", ctx.settings.variant, ctx.settings.arch),
    );
    let build_dir = ctx.paths.build_dir();
    ensure_dir(build_dir)?;

    ctx.run_step(
        "conan install",
        conan_install_command(ctx.paths, ctx.settings),
        build_dir,
    )?;

    // Stale generator state must not leak into the new Ninja project
    let ninja_dir = ctx.paths.ninja_dir();
    let cleanup = if ninja_dir.exists() {
        BestEffort::attempt(|| remove_dir_all_if_exists(ninja_dir))
    } else {
        BestEffort::Skipped
    };
    cleanup.report(ctx.shell, Status::Removed, ninja_dir.display());

    ctx.run_step(
        "IDE project generation",
        ide_project_command(ctx.paths),
        build_dir,
    )?;

    ctx.run_bootstrapped_step(
        "Ninja project generation",
        ninja_project_command(ctx.paths, ctx.settings),
        build_dir,
    )?;

    span.finish();
    Ok(())
}
