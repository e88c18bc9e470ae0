//! Stagehand CLI

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Cli;
use stagehand::util::config::{load_config, Overrides};
use stagehand::util::{GlobalContext, Shell, SystemRunner};
use stagehand::{ops, SessionFinalizer, StageContext, StatusCode};

fn main() {
    let cli = Cli::parse();
    let shell = Arc::new(Shell::from_flags(cli.quiet, cli.verbose, cli.color));

    let filter = if shell.is_verbose() {
        EnvFilter::new("stagehand=debug")
    } else {
        EnvFilter::new("stagehand=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let finalizer = SessionFinalizer::new(Arc::clone(&shell), cli.no_wait);

    let status = match run(&cli, &shell, &finalizer) {
        Ok(status) => status,
        Err(e) => {
            shell.error(format!("{:#}", e));
            finalizer.finalize(StatusCode::LAUNCH_FAILED)
        }
    };
    std::process::exit(status.code());
}

fn run(cli: &Cli, shell: &Arc<Shell>, finalizer: &SessionFinalizer) -> Result<StatusCode> {
    let ctx = GlobalContext::new(cli.root.clone())?;
    let config = load_config(
        ctx.global_config_path().as_deref(),
        &ctx.project_config_path(),
    )?;

    let overrides = Overrides {
        bootstrap_script: cli.bootstrap_script.as_ref().map(|p| ctx.cwd().join(p)),
        arch: cli.arch.clone(),
        release: cli.release,
        sanitizer: cli.asan,
    };
    let paths = ctx.project_paths();
    let tools = config.tool_locations(ctx.root(), &overrides);
    let settings = config.build_settings(&overrides);
    let runner = SystemRunner::new(Arc::clone(shell));

    let stages = StageContext {
        paths: &paths,
        tools: &tools,
        settings: &settings,
        runner: &runner,
        shell,
    };
    Ok(ops::run(&stages, cli.action.into(), finalizer))
}
