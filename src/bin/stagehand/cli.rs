//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use stagehand::util::shell::ColorChoice;
use stagehand::Mode;

/// Stagehand - generate and build a conan/CMake project with Ninja
#[derive(Parser)]
#[command(name = "stagehand")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// What to run: generate the projects, build, or both
    #[arg(short, long, value_enum)]
    pub action: Action,

    /// Never wait or pause before exiting (for CI)
    #[arg(long)]
    pub no_wait: bool,

    /// Project root (defaults to the nearest directory with stagehand.toml or conanfile.py)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Environment bootstrap script, e.g. vcvarsall.bat
    #[arg(long)]
    pub bootstrap_script: Option<PathBuf>,

    /// Architecture tag passed to the bootstrap script
    #[arg(long)]
    pub arch: Option<String>,

    /// Build in release mode
    #[arg(short, long)]
    pub release: bool,

    /// Build with AddressSanitizer
    #[arg(long)]
    pub asan: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print errors and warnings
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// When to use colors: auto, always, never
    #[arg(long, default_value = "auto")]
    pub color: ColorChoice,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Action {
    /// Install dependencies and generate the CMake projects
    Gen,
    /// Build the generated Ninja project
    Build,
    /// Generate, then build
    All,
}

impl From<Action> for Mode {
    fn from(action: Action) -> Self {
        match action {
            Action::Gen => Mode::Generate,
            Action::Build => Mode::Compile,
            Action::All => Mode::GenerateThenCompile,
        }
    }
}
